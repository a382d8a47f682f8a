// registry.rs - Side-table of registered entity classes
//
// Classes are keyed by Rust type identity and by classname. Registration
// resolves the descriptor once (FGD inference, schema validation, network
// name); the engine factory is told about the class elsewhere.

use crate::{
    EntityClass, EntityClassDescriptor, EntityFields, FieldSchema, SchemaError,
};
use once_cell::sync::Lazy;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegistrationError {
    #[error("'{classname}' is not a valid entity classname")]
    InvalidClassname { classname: String },

    #[error("entity class '{classname}' has an invalid field schema: {source}")]
    Schema {
        classname: String,
        #[source]
        source: SchemaError,
    },
}

/// Handle assigned to each registered class.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassHandle(u32);

impl ClassHandle {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A class as the registry holds it after registration.
#[derive(Debug)]
pub struct RegisteredClass {
    handle: ClassHandle,
    type_id: TypeId,
    type_name: &'static str,
    descriptor: EntityClassDescriptor,
    schema: Arc<FieldSchema>,
    network_name: Option<String>,
    initialized_for: Option<String>,
    init_count: u32,
}

impl RegisteredClass {
    pub fn handle(&self) -> ClassHandle {
        self.handle
    }

    pub fn classname(&self) -> &str {
        self.descriptor.classname()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Descriptor with the FGD class type and base list resolved.
    pub fn descriptor(&self) -> &EntityClassDescriptor {
        &self.descriptor
    }

    pub fn schema(&self) -> &Arc<FieldSchema> {
        &self.schema
    }

    /// `<module>.__<Type>` for networked classes.
    pub fn network_name(&self) -> Option<&str> {
        self.network_name.as_deref()
    }

    /// Map the class was last initialized for.
    pub fn initialized_for(&self) -> Option<&str> {
        self.initialized_for.as_deref()
    }

    pub fn init_count(&self) -> u32 {
        self.init_count
    }

    /// Fresh field storage for a newly spawned entity of this class.
    pub fn create_fields(&self) -> EntityFields {
        EntityFields::new(Arc::clone(&self.schema))
    }
}

pub struct EntityClassRegistry {
    classes: Vec<Option<RegisteredClass>>,
    by_type: HashMap<TypeId, ClassHandle>,
    by_name: HashMap<String, ClassHandle>,
}

impl EntityClassRegistry {
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
            by_type: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register `T` as an entity class.
    ///
    /// Registering the same type again replaces its entry under the same
    /// handle. Registering a different type under an existing classname
    /// replaces the previous class.
    pub fn register<T: EntityClass>(&mut self) -> Result<ClassHandle, RegistrationError> {
        self.register_descriptor(TypeId::of::<T>(), type_name::<T>(), T::describe())
    }

    pub fn register_descriptor(
        &mut self,
        type_id: TypeId,
        type_name: &'static str,
        mut descriptor: EntityClassDescriptor,
    ) -> Result<ClassHandle, RegistrationError> {
        let classname = descriptor.classname().to_string();
        if classname.is_empty() || classname.chars().any(char::is_whitespace) {
            return Err(RegistrationError::InvalidClassname { classname });
        }

        descriptor
            .field_schema()
            .validate()
            .map_err(|source| RegistrationError::Schema {
                classname: classname.clone(),
                source,
            })?;
        descriptor.resolve_fgd();
        let schema = Arc::new(descriptor.field_schema().clone());

        let network_name = descriptor
            .is_networked()
            .then(|| network_name_of(type_name));

        let by_type = self.by_type.get(&type_id).copied();
        let by_name = self.by_name.get(&classname).copied();

        let handle = match (by_type, by_name) {
            (Some(handle), other) => {
                if let Some(other) = other.filter(|other| *other != handle) {
                    self.retire(other);
                }
                if let Some(previous) = self.slot(handle) {
                    if previous.classname() != classname {
                        let old_name = previous.classname().to_string();
                        self.by_name.remove(&old_name);
                    }
                }
                handle
            }
            (None, Some(handle)) => {
                if let Some(previous) = self.slot(handle) {
                    tracing::warn!(
                        classname = %classname,
                        previous = previous.type_name(),
                        replacement = type_name,
                        "entity class replaced by a different type"
                    );
                    let previous_type = previous.type_id;
                    self.by_type.remove(&previous_type);
                }
                handle
            }
            (None, None) => {
                let handle = ClassHandle(self.classes.len() as u32);
                self.classes.push(None);
                handle
            }
        };

        self.by_type.insert(type_id, handle);
        self.by_name.insert(classname.clone(), handle);
        self.classes[handle.0 as usize] = Some(RegisteredClass {
            handle,
            type_id,
            type_name,
            descriptor,
            schema,
            network_name,
            initialized_for: None,
            init_count: 0,
        });

        tracing::debug!(%classname, %handle, type_name, "entity class registered");
        Ok(handle)
    }

    pub fn get(&self, handle: ClassHandle) -> Option<&RegisteredClass> {
        self.slot(handle)
    }

    pub fn by_classname(&self, classname: &str) -> Option<&RegisteredClass> {
        self.by_name
            .get(classname)
            .and_then(|handle| self.slot(*handle))
    }

    pub fn handle_of<T: EntityClass>(&self) -> Option<ClassHandle> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredClass> {
        self.classes.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-map class initialization, run at level init before entities spawn.
    pub fn init_classes(&mut self, map: &str) -> usize {
        let mut count = 0;
        for class in self.classes.iter_mut().flatten() {
            class.initialized_for = Some(map.to_string());
            class.init_count += 1;
            count += 1;
        }
        tracing::debug!(map, classes = count, "entity classes initialized");
        count
    }

    fn slot(&self, handle: ClassHandle) -> Option<&RegisteredClass> {
        self.classes
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
    }

    fn retire(&mut self, handle: ClassHandle) {
        if let Some(class) = self
            .classes
            .get_mut(handle.0 as usize)
            .and_then(Option::take)
        {
            self.by_type.remove(&class.type_id);
            self.by_name.remove(class.classname());
            tracing::warn!(
                classname = class.classname(),
                previous = class.type_name,
                "entity class replaced by a different type"
            );
        }
    }
}

impl Default for EntityClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn network_name_of(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    match base.rsplit_once("::") {
        Some((module, name)) => format!("{module}.__{name}"),
        None => format!("__{base}"),
    }
}

/// Process-wide registry used by the runtime.
static REGISTRY: Lazy<RwLock<EntityClassRegistry>> =
    Lazy::new(|| RwLock::new(EntityClassRegistry::new()));

pub fn registry() -> RwLockReadGuard<'static, EntityClassRegistry> {
    REGISTRY.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn registry_mut() -> RwLockWriteGuard<'static, EntityClassRegistry> {
    REGISTRY.write().unwrap_or_else(PoisonError::into_inner)
}

/// Register `T` with the process-wide registry.
pub fn register_entity_class<T: EntityClass>() -> Result<ClassHandle, RegistrationError> {
    registry_mut().register::<T>()
}
