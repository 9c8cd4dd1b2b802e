//! Built-in codecs (spec.md §4.4): integer, float, text, boolean,
//! date, datetime, UUID, JSON, binary.
//!
//! Each is a zero-sized struct implementing [`Codec`], the same "one
//! unit struct per concern" shape the teacher uses for dialects
//! (`dialect::generic::GenericDialect`), applied here to value coercion
//! instead of SQL emission.

use super::{Codec, Registry, WireValue};
use crate::error::DecodeError;

struct IntCodec;
struct FloatCodec;
struct TextCodec;
/// SQLite has no native boolean; it round-trips as integer 0/1.
struct BoolCodec;
struct DateCodec;
struct DatetimeCodec;
/// PostgreSQL has a native UUID type; other dialects carry it as
/// canonical text. Either way this codec normalizes to/from text.
struct UuidCodec;
/// MySQL/PostgreSQL JSON columns decode to text on the wire; structured
/// map/list access is the caller's responsibility once decoded.
struct JsonCodec;
struct BlobCodec;

impl Codec for IntCodec {
    fn type_tag(&self) -> &'static str {
        "int"
    }

    fn decode(&self, value: &WireValue) -> Result<WireValue, DecodeError> {
        match value {
            WireValue::Int(_) | WireValue::Null => Ok(value.clone()),
            other => Err(type_mismatch(self.type_tag(), other)),
        }
    }
}

impl Codec for FloatCodec {
    fn type_tag(&self) -> &'static str {
        "float"
    }

    fn decode(&self, value: &WireValue) -> Result<WireValue, DecodeError> {
        match value {
            WireValue::Float(_) | WireValue::Null => Ok(value.clone()),
            WireValue::Int(n) => Ok(WireValue::Float(*n as f64)),
            other => Err(type_mismatch(self.type_tag(), other)),
        }
    }
}

impl Codec for TextCodec {
    fn type_tag(&self) -> &'static str {
        "text"
    }

    fn decode(&self, value: &WireValue) -> Result<WireValue, DecodeError> {
        match value {
            WireValue::Text(_) | WireValue::Null => Ok(value.clone()),
            other => Err(type_mismatch(self.type_tag(), other)),
        }
    }
}

impl Codec for BoolCodec {
    fn type_tag(&self) -> &'static str {
        "bool"
    }

    fn decode(&self, value: &WireValue) -> Result<WireValue, DecodeError> {
        match value {
            WireValue::Bool(_) | WireValue::Null => Ok(value.clone()),
            WireValue::Int(0) => Ok(WireValue::Bool(false)),
            WireValue::Int(_) => Ok(WireValue::Bool(true)),
            other => Err(type_mismatch(self.type_tag(), other)),
        }
    }
}

impl Codec for DateCodec {
    fn type_tag(&self) -> &'static str {
        "date"
    }

    fn decode(&self, value: &WireValue) -> Result<WireValue, DecodeError> {
        match value {
            WireValue::Text(_) | WireValue::Null => Ok(value.clone()),
            other => Err(type_mismatch(self.type_tag(), other)),
        }
    }
}

impl Codec for DatetimeCodec {
    fn type_tag(&self) -> &'static str {
        "datetime"
    }

    fn decode(&self, value: &WireValue) -> Result<WireValue, DecodeError> {
        match value {
            WireValue::Text(_) | WireValue::Null => Ok(value.clone()),
            other => Err(type_mismatch(self.type_tag(), other)),
        }
    }
}

impl Codec for UuidCodec {
    fn type_tag(&self) -> &'static str {
        "uuid"
    }

    fn decode(&self, value: &WireValue) -> Result<WireValue, DecodeError> {
        match value {
            WireValue::Text(_) | WireValue::Null => Ok(value.clone()),
            other => Err(type_mismatch(self.type_tag(), other)),
        }
    }
}

impl Codec for JsonCodec {
    fn type_tag(&self) -> &'static str {
        "json"
    }

    fn decode(&self, value: &WireValue) -> Result<WireValue, DecodeError> {
        match value {
            WireValue::Text(_) | WireValue::Null => Ok(value.clone()),
            other => Err(type_mismatch(self.type_tag(), other)),
        }
    }
}

impl Codec for BlobCodec {
    fn type_tag(&self) -> &'static str {
        "blob"
    }

    fn decode(&self, value: &WireValue) -> Result<WireValue, DecodeError> {
        match value {
            WireValue::Blob(_) | WireValue::Null => Ok(value.clone()),
            other => Err(type_mismatch(self.type_tag(), other)),
        }
    }
}

fn type_mismatch(type_tag: &str, got: &WireValue) -> DecodeError {
    DecodeError::DecodeFailed {
        type_tag: type_tag.to_string(),
        reason: format!("unexpected wire value {got:?}"),
    }
}

/// Registers every built-in codec.
pub fn register_builtins(registry: &mut Registry) {
    registry.register(Box::new(IntCodec));
    registry.register(Box::new(FloatCodec));
    registry.register(Box::new(TextCodec));
    registry.register(Box::new(BoolCodec));
    registry.register(Box::new(DateCodec));
    registry.register(Box::new(DatetimeCodec));
    registry.register(Box::new(UuidCodec));
    registry.register(Box::new(JsonCodec));
    registry.register(Box::new(BlobCodec));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_codec_decodes_sqlite_integer() {
        let registry = Registry::with_builtins();
        assert_eq!(
            registry.decode("bool", &WireValue::Int(1)).unwrap(),
            WireValue::Bool(true)
        );
        assert_eq!(
            registry.decode("bool", &WireValue::Int(0)).unwrap(),
            WireValue::Bool(false)
        );
    }

    #[test]
    fn test_float_codec_widens_int() {
        let registry = Registry::with_builtins();
        assert_eq!(
            registry.decode("float", &WireValue::Int(3)).unwrap(),
            WireValue::Float(3.0)
        );
    }

    #[test]
    fn test_null_passes_through_every_builtin() {
        let registry = Registry::with_builtins();
        for tag in ["int", "float", "text", "bool", "date", "datetime", "uuid", "json", "blob"] {
            assert_eq!(registry.decode(tag, &WireValue::Null).unwrap(), WireValue::Null);
        }
    }

    #[test]
    fn test_text_codec_rejects_wrong_shape() {
        let registry = Registry::with_builtins();
        let err = registry.decode("text", &WireValue::Int(5)).unwrap_err();
        assert!(matches!(err, DecodeError::DecodeFailed { .. }));
    }
}
