//! Converters for null, primitives and enums

use super::{unexpected_value, Converter, SingleValueConverter};
use crate::context::{MarshallingContext, UnmarshallingContext};
use crate::error::{ErrorKind, Result};
use crate::types::{TypeKey, TypeKind, TypeRegistry};
use crate::value::{EnumValue, Value};

fn invalid(registry: &TypeRegistry, ty: TypeKey, text: &str) -> crate::error::ConversionError {
    ErrorKind::InvalidValue {
        type_name: registry.name(ty).to_string(),
        value: text.to_string(),
    }
    .into()
}

/// Writes null as an empty node.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConverter;

impl Converter for NullConverter {
    fn can_convert(&self, ty: TypeKey, _registry: &TypeRegistry) -> bool {
        ty == TypeKey::NULL
    }

    fn marshal(&self, _value: &Value, _ctx: &mut MarshallingContext<'_>) -> Result<()> {
        Ok(())
    }

    fn unmarshal(&self, _ctx: &mut UnmarshallingContext<'_>) -> Result<Value> {
        Ok(Value::Null)
    }
}

/// `true` / `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConverter;

impl SingleValueConverter for BoolConverter {
    fn can_convert(&self, ty: TypeKey, _registry: &TypeRegistry) -> bool {
        ty == TypeKey::BOOL
    }

    fn to_text(&self, value: &Value) -> Result<String> {
        match value {
            Value::Bool(flag) => Ok(flag.to_string()),
            other => Err(unexpected_value("a boolean", other)),
        }
    }

    fn from_text(&self, text: &str, ty: TypeKey, registry: &TypeRegistry) -> Result<Value> {
        text.trim()
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| invalid(registry, ty, text))
    }
}

/// Decimal integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntConverter;

impl SingleValueConverter for IntConverter {
    fn can_convert(&self, ty: TypeKey, _registry: &TypeRegistry) -> bool {
        ty == TypeKey::INT
    }

    fn to_text(&self, value: &Value) -> Result<String> {
        match value {
            Value::Int(number) => Ok(number.to_string()),
            other => Err(unexpected_value("an integer", other)),
        }
    }

    fn from_text(&self, text: &str, ty: TypeKey, registry: &TypeRegistry) -> Result<Value> {
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| invalid(registry, ty, text))
    }
}

/// Shortest text that parses back to the same float; `NaN`, `inf` and `-inf`
/// for the special values.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatConverter;

impl SingleValueConverter for FloatConverter {
    fn can_convert(&self, ty: TypeKey, _registry: &TypeRegistry) -> bool {
        ty == TypeKey::FLOAT
    }

    fn to_text(&self, value: &Value) -> Result<String> {
        match value {
            Value::Float(number) => Ok(number.to_string()),
            other => Err(unexpected_value("a float", other)),
        }
    }

    fn from_text(&self, text: &str, ty: TypeKey, registry: &TypeRegistry) -> Result<Value> {
        text.trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid(registry, ty, text))
    }
}

/// A single character.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharConverter;

impl SingleValueConverter for CharConverter {
    fn can_convert(&self, ty: TypeKey, _registry: &TypeRegistry) -> bool {
        ty == TypeKey::CHAR
    }

    fn to_text(&self, value: &Value) -> Result<String> {
        match value {
            Value::Char(c) => Ok(c.to_string()),
            other => Err(unexpected_value("a character", other)),
        }
    }

    fn from_text(&self, text: &str, ty: TypeKey, registry: &TypeRegistry) -> Result<Value> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Value::Char(c)),
            _ => Err(invalid(registry, ty, text)),
        }
    }
}

/// Text, written verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl SingleValueConverter for StringConverter {
    fn can_convert(&self, ty: TypeKey, _registry: &TypeRegistry) -> bool {
        ty == TypeKey::STRING
    }

    fn to_text(&self, value: &Value) -> Result<String> {
        match value {
            Value::Str(text) => Ok(text.clone()),
            other => Err(unexpected_value("a string", other)),
        }
    }

    fn from_text(&self, text: &str, _ty: TypeKey, _registry: &TypeRegistry) -> Result<Value> {
        Ok(Value::Str(text.to_string()))
    }
}

/// Enum variants by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumConverter;

impl SingleValueConverter for EnumConverter {
    fn can_convert(&self, ty: TypeKey, registry: &TypeRegistry) -> bool {
        matches!(registry.get(ty).kind(), TypeKind::Enum { .. })
    }

    fn to_text(&self, value: &Value) -> Result<String> {
        match value {
            Value::Enum(value) => Ok(value.variant.clone()),
            other => Err(unexpected_value("an enum variant", other)),
        }
    }

    fn from_text(&self, text: &str, ty: TypeKey, registry: &TypeRegistry) -> Result<Value> {
        let variant = text.trim();
        match registry.get(ty).kind() {
            TypeKind::Enum { variants } if variants.iter().any(|known| known == variant) => {
                Ok(Value::Enum(EnumValue {
                    ty,
                    variant: variant.to_string(),
                }))
            }
            _ => Err(invalid(registry, ty, text)),
        }
    }
}
