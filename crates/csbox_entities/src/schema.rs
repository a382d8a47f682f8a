use crate::{FieldKind, FieldMeta};
use thiserror::Error;

/// Errors detected when a schema is resolved at class registration.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("field '{name}' is declared twice")]
    DuplicateField { name: String },

    #[error("keyname '{keyname}' is used by both '{first}' and '{second}'")]
    DuplicateKeyname {
        keyname: String,
        first: String,
        second: String,
    },

    #[error("input '{name}' is declared twice")]
    DuplicateInput { name: String },

    #[error("field '{field}' is a {expected} field but its default is a {found}")]
    DefaultKindMismatch {
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    #[error("output field '{field}' cannot be networked")]
    NetworkedOutput { field: String },

    #[error("field '{field}' has a change callback but is not networked")]
    CallbackWithoutNetworking { field: String },
}

/// A named entity input (`Tick`, `Toggle`) and the method that handles it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputMeta {
    name: String,
    handler: String,
}

impl InputMeta {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }
}

/// Ordered field and input declarations of one entity class.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSchema {
    fields: Vec<FieldMeta>,
    inputs: Vec<InputMeta>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }

    pub fn input(mut self, name: impl Into<String>, handler: impl Into<String>) -> Self {
        self.inputs.push(InputMeta {
            name: name.into(),
            handler: handler.into(),
        });
        self
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn inputs(&self) -> &[InputMeta] {
        &self.inputs
    }

    pub fn get(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name() == name)
    }

    /// Keyvalues are matched case-insensitively, like the engine does.
    pub(crate) fn index_of_keyname(&self, keyname: &str) -> Option<usize> {
        self.fields.iter().position(|field| {
            field
                .keyname_str()
                .is_some_and(|key| key.eq_ignore_ascii_case(keyname))
        })
    }

    pub fn resolve_input(&self, name: &str) -> Option<&InputMeta> {
        self.inputs
            .iter()
            .find(|input| input.name.eq_ignore_ascii_case(name))
    }

    pub fn networked_fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter().filter(|field| field.is_networked())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.inputs.is_empty()
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        for (index, field) in self.fields.iter().enumerate() {
            let earlier = &self.fields[..index];

            if earlier.iter().any(|other| other.name() == field.name()) {
                return Err(SchemaError::DuplicateField {
                    name: field.name().to_string(),
                });
            }

            if let Some(keyname) = field.keyname_str() {
                let clash = earlier.iter().find(|other| {
                    other
                        .keyname_str()
                        .is_some_and(|key| key.eq_ignore_ascii_case(keyname))
                });
                if let Some(other) = clash {
                    return Err(SchemaError::DuplicateKeyname {
                        keyname: keyname.to_string(),
                        first: other.name().to_string(),
                        second: field.name().to_string(),
                    });
                }
            }

            let found = field.default_value().kind();
            if found != field.kind() {
                return Err(SchemaError::DefaultKindMismatch {
                    field: field.name().to_string(),
                    expected: field.kind(),
                    found,
                });
            }

            if field.kind() == FieldKind::Output && field.is_networked() {
                return Err(SchemaError::NetworkedOutput {
                    field: field.name().to_string(),
                });
            }

            if field.change_callback().is_some() && !field.is_networked() {
                return Err(SchemaError::CallbackWithoutNetworking {
                    field: field.name().to_string(),
                });
            }
        }

        for (index, input) in self.inputs.iter().enumerate() {
            if self.inputs[..index]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&input.name))
            {
                return Err(SchemaError::DuplicateInput {
                    name: input.name.clone(),
                });
            }
        }

        Ok(())
    }
}
