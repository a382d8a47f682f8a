// fields.rs - Per-entity field values
//
// Values are stored in schema order, seeded from the declared defaults.

use crate::keyvalue::{parse_field, KeyValueError, OutputConnection};
use crate::{FieldKind, FieldSchema, FieldValue};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("entity has no field named '{name}'")]
    UnknownField { name: String },

    #[error("field '{field}' expects a {expected} value, got {found}")]
    KindMismatch {
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    #[error("output '{field}' is wired through keyvalues, not assigned")]
    OutputNotAssignable { field: String },

    #[error("field '{field}' is not an output")]
    NotAnOutput { field: String },

    #[error("keyvalue '{key}' rejected: {source}")]
    KeyValue {
        key: String,
        #[source]
        source: KeyValueError,
    },
}

/// Field storage for one entity instance.
#[derive(Debug, Clone)]
pub struct EntityFields {
    schema: Arc<FieldSchema>,
    values: Vec<FieldValue>,
}

impl EntityFields {
    pub fn new(schema: Arc<FieldSchema>) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|field| field.default_value().clone())
            .collect();
        Self { schema, values }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema.index_of(name).map(|index| &self.values[index])
    }

    /// Assign a field.
    ///
    /// Returns the change callback to run when a networked field actually
    /// changed value.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<Option<&str>, FieldError> {
        let value = value.into();
        let index = self.index(name)?;
        let field = &self.schema.fields()[index];

        if field.kind() == FieldKind::Output {
            return Err(FieldError::OutputNotAssignable {
                field: name.to_string(),
            });
        }
        if value.kind() != field.kind() {
            return Err(FieldError::KindMismatch {
                field: name.to_string(),
                expected: field.kind(),
                found: value.kind(),
            });
        }

        let changed = self.values[index] != value;
        self.values[index] = value;

        let field = &self.schema.fields()[index];
        Ok(if changed && field.is_networked() {
            field.change_callback()
        } else {
            None
        })
    }

    /// Apply a map keyvalue. Returns `false` when no field uses `key`, leaving
    /// it to the engine's own keyvalue handling.
    pub fn apply_keyvalue(&mut self, key: &str, raw: &str) -> Result<bool, FieldError> {
        let Some(index) = self.schema.index_of_keyname(key) else {
            return Ok(false);
        };
        let kind = self.schema.fields()[index].kind();
        let parsed = parse_field(kind, raw).map_err(|source| FieldError::KeyValue {
            key: key.to_string(),
            source,
        })?;

        match (&mut self.values[index], parsed) {
            (FieldValue::Output(connections), FieldValue::Output(mut added)) => {
                connections.append(&mut added)
            }
            (slot, parsed) => *slot = parsed,
        }
        Ok(true)
    }

    pub fn connections(&self, output: &str) -> Result<&[OutputConnection], FieldError> {
        let index = self.index(output)?;
        match &self.values[index] {
            FieldValue::Output(connections) => Ok(connections),
            _ => Err(FieldError::NotAnOutput {
                field: output.to_string(),
            }),
        }
    }

    /// Fire an output: returns the connections to deliver, in wiring order,
    /// and drops the ones that have used up their fire count.
    pub fn fire_output(&mut self, output: &str) -> Result<Vec<OutputConnection>, FieldError> {
        let index = self.index(output)?;
        let FieldValue::Output(connections) = &mut self.values[index] else {
            return Err(FieldError::NotAnOutput {
                field: output.to_string(),
            });
        };

        let fired = connections.clone();
        connections.retain_mut(|connection| {
            if connection.fires_forever() {
                return true;
            }
            connection.times_to_fire -= 1;
            connection.times_to_fire > 0
        });
        Ok(fired)
    }

    fn index(&self, name: &str) -> Result<usize, FieldError> {
        self.schema.index_of(name).ok_or_else(|| FieldError::UnknownField {
            name: name.to_string(),
        })
    }
}
