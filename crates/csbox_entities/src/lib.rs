//! csbox Entity Classes
//!
//! Script-side description of entity classes handed to the engine factory:
//! - [`EntityClassDescriptor`]: classname, native base, networking, editor metadata
//! - [`FieldSchema`]: typed fields and named inputs, validated once at registration
//! - [`EntityClassRegistry`]: side-table keyed by type identity and classname
//! - [`EntityFields`]: per-entity values, keyvalue wiring and output connections
//!
//! Spawning, transport and FGD text generation stay with the engine.

mod class;
mod field;
mod fields;
pub mod keyvalue;
mod registry;
mod schema;

pub use class::{ClassType, EntityClass, EntityClassDescriptor, NativeClass};
pub use field::{Color, FieldKind, FieldMeta, FieldValue};
pub use fields::{EntityFields, FieldError};
pub use keyvalue::{KeyValueError, OutputConnection};
pub use registry::{
    register_entity_class, registry, registry_mut, ClassHandle, EntityClassRegistry,
    RegisteredClass, RegistrationError,
};
pub use schema::{FieldSchema, InputMeta, SchemaError};

pub use glam;
