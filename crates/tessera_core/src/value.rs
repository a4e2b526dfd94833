//! Property values carried across listeners and execution contexts
//!
//! Engine properties are strongly typed on each side of the hub, but the
//! dispatch relay needs one serializable payload type. [`PropertyValue`] is
//! that union; typed listeners convert in and out with `From`/`TryFrom`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 32-bit ARGB color as stored by the engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(u32);

impl Color {
    /// Create from a packed `0xAARRGGBB` value
    pub const fn from_argb(argb: u32) -> Self {
        Self(argb)
    }

    /// Create from individual channels
    pub const fn from_components(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Packed `0xAARRGGBB` value
    pub const fn argb(self) -> u32 {
        self.0
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }
}

/// A value observed on, or written to, an engine property
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    /// Emission without a payload (triggers, lists, images)
    Unit,
    Number(f64),
    Boolean(bool),
    String(String),
    /// Selected enum case, by name
    Enum(String),
    Color(Color),
}

impl PropertyValue {
    /// Variant name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Unit => "Unit",
            PropertyValue::Number(_) => "Number",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::String(_) => "String",
            PropertyValue::Enum(_) => "Enum",
            PropertyValue::Color(_) => "Color",
        }
    }
}

/// A [`PropertyValue`] did not hold the expected variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Type mismatch: expected {expected}, got {actual}")]
pub struct ValueMismatch {
    pub expected: &'static str,
    pub actual: &'static str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────────────────────────────────────

impl From<()> for PropertyValue {
    fn from(_: ()) -> Self {
        PropertyValue::Unit
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<Color> for PropertyValue {
    fn from(value: Color) -> Self {
        PropertyValue::Color(value)
    }
}

impl TryFrom<PropertyValue> for () {
    type Error = ValueMismatch;

    fn try_from(_: PropertyValue) -> Result<Self, Self::Error> {
        // Void listeners accept any emission
        Ok(())
    }
}

impl TryFrom<PropertyValue> for f64 {
    type Error = ValueMismatch;

    fn try_from(value: PropertyValue) -> Result<Self, Self::Error> {
        match value {
            PropertyValue::Number(v) => Ok(v),
            other => Err(ValueMismatch {
                expected: "Number",
                actual: other.type_name(),
            }),
        }
    }
}

impl TryFrom<PropertyValue> for bool {
    type Error = ValueMismatch;

    fn try_from(value: PropertyValue) -> Result<Self, Self::Error> {
        match value {
            PropertyValue::Boolean(v) => Ok(v),
            other => Err(ValueMismatch {
                expected: "Boolean",
                actual: other.type_name(),
            }),
        }
    }
}

impl TryFrom<PropertyValue> for String {
    type Error = ValueMismatch;

    fn try_from(value: PropertyValue) -> Result<Self, Self::Error> {
        match value {
            PropertyValue::String(v) | PropertyValue::Enum(v) => Ok(v),
            other => Err(ValueMismatch {
                expected: "String",
                actual: other.type_name(),
            }),
        }
    }
}

impl TryFrom<PropertyValue> for Color {
    type Error = ValueMismatch;

    fn try_from(value: PropertyValue) -> Result<Self, Self::Error> {
        match value {
            PropertyValue::Color(v) => Ok(v),
            other => Err(ValueMismatch {
                expected: "Color",
                actual: other.type_name(),
            }),
        }
    }
}
