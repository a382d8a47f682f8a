// field.rs - Typed entity field descriptors
//
// A field is declared once per entity class with its kind and default; the
// per-entity values live in `EntityFields`.

use crate::OutputConnection;
use glam::Vec3;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Boolean,
    Float,
    String,
    Vector,
    Angle,
    Color,
    Dict,
    /// Entity I/O output; holds connections rather than a value.
    Output,
}

impl FieldKind {
    pub fn default_value(self) -> FieldValue {
        match self {
            FieldKind::Integer => FieldValue::Integer(0),
            FieldKind::Boolean => FieldValue::Boolean(false),
            FieldKind::Float => FieldValue::Float(0.0),
            FieldKind::String => FieldValue::String(String::new()),
            FieldKind::Vector => FieldValue::Vector(Vec3::ZERO),
            FieldKind::Angle => FieldValue::Angle(Vec3::ZERO),
            FieldKind::Color => FieldValue::Color(Color::WHITE),
            FieldKind::Dict => FieldValue::Dict(Map::new()),
            FieldKind::Output => FieldValue::Output(Vec::new()),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Float => "float",
            FieldKind::String => "string",
            FieldKind::Vector => "vector",
            FieldKind::Angle => "angle",
            FieldKind::Color => "color",
            FieldKind::Dict => "dict",
            FieldKind::Output => "output",
        };
        f.write_str(name)
    }
}

/// RGBA color, 0-255 per channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Boolean(bool),
    Float(f32),
    String(String),
    Vector(Vec3),
    Angle(Vec3),
    Color(Color),
    Dict(Map<String, Value>),
    Output(Vec<OutputConnection>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Boolean(_) => FieldKind::Boolean,
            FieldValue::Float(_) => FieldKind::Float,
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Vector(_) => FieldKind::Vector,
            FieldValue::Angle(_) => FieldKind::Angle,
            FieldValue::Color(_) => FieldKind::Color,
            FieldValue::Dict(_) => FieldKind::Dict,
            FieldValue::Output(_) => FieldKind::Output,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            FieldValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<Color> for FieldValue {
    fn from(value: Color) -> Self {
        FieldValue::Color(value)
    }
}

impl From<Map<String, Value>> for FieldValue {
    fn from(value: Map<String, Value>) -> Self {
        FieldValue::Dict(value)
    }
}

/// Declaration of one entity field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMeta {
    name: String,
    kind: FieldKind,
    default: FieldValue,
    keyname: Option<String>,
    networked: bool,
    change_callback: Option<String>,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: kind.default_value(),
            keyname: None,
            networked: false,
            change_callback: None,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn vector(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Vector)
    }

    pub fn angle(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Angle)
    }

    pub fn color(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Color)
    }

    pub fn dict(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Dict)
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Output)
    }

    /// Initial value for new entities. Checked against the kind at registration.
    pub fn default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = value.into();
        self
    }

    /// Map keyvalue that sets this field when the entity is spawned from a map.
    pub fn keyname(mut self, keyname: impl Into<String>) -> Self {
        self.keyname = Some(keyname.into());
        self
    }

    pub fn networked(mut self) -> Self {
        self.networked = true;
        self
    }

    /// Name of the method invoked on the client when the networked value changes.
    pub fn on_change(mut self, callback: impl Into<String>) -> Self {
        self.change_callback = Some(callback.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn default_value(&self) -> &FieldValue {
        &self.default
    }

    pub fn keyname_str(&self) -> Option<&str> {
        self.keyname.as_deref()
    }

    pub fn is_networked(&self) -> bool {
        self.networked
    }

    pub fn change_callback(&self) -> Option<&str> {
        self.change_callback.as_deref()
    }
}
