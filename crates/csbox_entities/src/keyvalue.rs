//! Parsing of map keyvalues into typed field values.
//!
//! Vectors, angles and colors are space separated. Output connections use the
//! Source I/O layout `target,input,parameter,delay,times`, with either commas
//! or ESC (0x1B) between the parts.

use crate::{Color, FieldKind, FieldValue};
use glam::Vec3;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

const ESC: char = '\u{1b}';

#[derive(Debug, Error, PartialEq)]
pub enum KeyValueError {
    #[error("value '{value}' is not a {expected}")]
    Malformed { value: String, expected: &'static str },

    #[error("output connection '{value}' needs at least a target and an input")]
    IncompleteConnection { value: String },
}

fn malformed(value: &str, expected: &'static str) -> KeyValueError {
    KeyValueError::Malformed {
        value: value.to_string(),
        expected,
    }
}

fn parse_floats(value: &str, expected: &'static str) -> Result<Vec<f32>, KeyValueError> {
    value
        .split_whitespace()
        .map(|part| part.parse::<f32>().map_err(|_| malformed(value, expected)))
        .collect()
}

fn parse_triple(value: &str, expected: &'static str) -> Result<Vec3, KeyValueError> {
    match parse_floats(value, expected)?.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(malformed(value, expected)),
    }
}

pub fn parse_vector(value: &str) -> Result<Vec3, KeyValueError> {
    parse_triple(value, "Vector")
}

/// Pitch, yaw, roll in degrees.
pub fn parse_angle(value: &str) -> Result<Vec3, KeyValueError> {
    parse_triple(value, "QAngle")
}

/// Three or four components; alpha defaults to 255.
pub fn parse_color(value: &str) -> Result<Color, KeyValueError> {
    let channel = |c: f32| c.clamp(0.0, 255.0) as u8;
    match parse_floats(value, "Color")?.as_slice() {
        [r, g, b] => Ok(Color::rgba(channel(*r), channel(*g), channel(*b), 255)),
        [r, g, b, a] => Ok(Color::rgba(channel(*r), channel(*g), channel(*b), channel(*a))),
        _ => Err(malformed(value, "Color")),
    }
}

pub fn parse_integer(value: &str) -> Result<i64, KeyValueError> {
    let trimmed = value.trim();
    trimmed
        .parse::<i64>()
        // Hammer writes some integer keys as floats ("5.000").
        .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
        .map_err(|_| malformed(value, "integer"))
}

pub fn parse_float(value: &str) -> Result<f32, KeyValueError> {
    value
        .trim()
        .parse::<f32>()
        .map_err(|_| malformed(value, "float"))
}

/// `0`/`1` as written by Hammer, plus `true`/`false`.
pub fn parse_boolean(value: &str) -> Result<bool, KeyValueError> {
    match value.trim() {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" | "" => Ok(false),
        _ => Err(malformed(value, "boolean")),
    }
}

/// One entity I/O connection attached to an output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConnection {
    pub target: String,
    pub input: String,
    pub parameter: String,
    pub delay: f32,
    /// `-1` fires forever.
    pub times_to_fire: i32,
}

impl OutputConnection {
    pub fn parse(value: &str) -> Result<Self, KeyValueError> {
        let separator = if value.contains(ESC) { ESC } else { ',' };
        let mut parts = value.split(separator).map(str::trim);

        let target = parts.next().unwrap_or_default();
        let input = parts.next().unwrap_or_default();
        if target.is_empty() || input.is_empty() {
            return Err(KeyValueError::IncompleteConnection {
                value: value.to_string(),
            });
        }

        let parameter = parts.next().unwrap_or_default().to_string();
        let delay = match parts.next() {
            Some(delay) if !delay.is_empty() => parse_float(delay)?,
            _ => 0.0,
        };
        let times_to_fire = match parts.next() {
            Some(times) if !times.is_empty() => {
                times.parse::<i32>().map_err(|_| malformed(value, "output connection"))?
            }
            _ => -1,
        };

        Ok(Self {
            target: target.to_string(),
            input: input.to_string(),
            parameter,
            delay,
            times_to_fire,
        })
    }

    pub fn fires_forever(&self) -> bool {
        self.times_to_fire < 0
    }
}

impl fmt::Display for OutputConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.target, self.input, self.parameter, self.delay, self.times_to_fire
        )
    }
}

/// Parse `value` as a field of `kind`.
pub fn parse_field(kind: FieldKind, value: &str) -> Result<FieldValue, KeyValueError> {
    Ok(match kind {
        FieldKind::Integer => FieldValue::Integer(parse_integer(value)?),
        FieldKind::Boolean => FieldValue::Boolean(parse_boolean(value)?),
        FieldKind::Float => FieldValue::Float(parse_float(value)?),
        FieldKind::String => FieldValue::String(value.to_string()),
        FieldKind::Vector => FieldValue::Vector(parse_vector(value)?),
        FieldKind::Angle => FieldValue::Angle(parse_angle(value)?),
        FieldKind::Color => FieldValue::Color(parse_color(value)?),
        FieldKind::Dict => match serde_json::from_str::<Value>(value) {
            Ok(Value::Object(map)) => FieldValue::Dict(map),
            _ => return Err(malformed(value, "dict")),
        },
        FieldKind::Output => FieldValue::Output(vec![OutputConnection::parse(value)?]),
    })
}
