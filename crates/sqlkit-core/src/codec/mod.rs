//! Codec registry & row mapping (spec.md §4.4).
//!
//! A [`Codec`] knows how to encode a Rust value into a [`WireValue`] and
//! decode a [`WireValue`] back, keyed by a type tag in a [`Registry`].
//! `WireValue` generalizes the teacher's fixed `SqlValue` enum
//! (`builder::value::SqlValue`) into an open, registry-dispatched value
//! carrier, since spec.md §3.4/§4.4 wants extensible registration rather
//! than one hardcoded enum of driver-bound types.

mod builtin;

pub use builtin::register_builtins;

use std::collections::HashMap;

use crate::error::DecodeError;

/// A value crossing the driver boundary: either a `NULL`/missing
/// sentinel or one of the scalar shapes a codec can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// `NULL` or "column absent".
    Null,
    /// Signed integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Text.
    Text(String),
    /// Binary.
    Blob(Vec<u8>),
}

/// Encodes/decodes a single Rust-side value type against [`WireValue`].
pub trait Codec: Send + Sync {
    /// The type tag this codec is registered under, used in error
    /// messages.
    fn type_tag(&self) -> &'static str;

    /// Encodes a value, passing `WireValue::Null` through unchanged
    /// (spec.md §4.4 "null/missing sentinel").
    fn encode(&self, value: &WireValue) -> WireValue {
        value.clone()
    }

    /// Decodes a wire value, passing `WireValue::Null` through
    /// unchanged unless the caller rejects it separately (see
    /// [`map_row`]'s `NullNotAllowed` check).
    fn decode(&self, value: &WireValue) -> Result<WireValue, DecodeError>;
}

/// A mapping from value-type tag to registered [`Codec`] (spec.md §3.4).
#[derive(Default)]
pub struct Registry {
    codecs: HashMap<&'static str, Box<dyn Codec>>,
}

impl Registry {
    /// Builds an empty registry with no codecs registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Builds a registry pre-populated with the built-in codecs (spec.md
    /// §4.4: integer, float, text, boolean, date, datetime, UUID, JSON,
    /// binary).
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Registers a codec under its own type tag, replacing any previous
    /// registration for that tag.
    pub fn register(&mut self, codec: Box<dyn Codec>) {
        self.codecs.insert(codec.type_tag(), codec);
    }

    /// Looks up a codec by type tag.
    #[must_use]
    pub fn get_codec(&self, type_tag: &str) -> Option<&dyn Codec> {
        self.codecs.get(type_tag).map(AsRef::as_ref)
    }

    /// Encodes a value through the codec registered for `type_tag`.
    pub fn encode(&self, type_tag: &str, value: &WireValue) -> Result<WireValue, DecodeError> {
        let codec = self.get_codec(type_tag).ok_or_else(|| DecodeError::NoCodec {
            type_tag: type_tag.to_string(),
        })?;
        Ok(codec.encode(value))
    }

    /// Decodes a value through the codec registered for `type_tag`.
    pub fn decode(&self, type_tag: &str, value: &WireValue) -> Result<WireValue, DecodeError> {
        let codec = self.get_codec(type_tag).ok_or_else(|| DecodeError::NoCodec {
            type_tag: type_tag.to_string(),
        })?;
        codec.decode(value)
    }
}

/// A single raw driver row: named column access, with no column-order
/// guarantee (spec.md §6.1 "iterable of named rows").
pub trait RawRow {
    /// Column names present on this row, in driver-reported order.
    fn columns(&self) -> Vec<String>;

    /// Looks up a column's wire value by name; `None` if the row has no
    /// such column at all (distinct from the column being present but
    /// `NULL`, which is `Some(WireValue::Null)`).
    fn get(&self, column: &str) -> Option<WireValue>;
}

/// Maps a single raw row into the shape requested by `items`
/// (spec.md §4.4).
///
/// The anonymous-record case is a pass-through handled by callers that
/// keep the raw row itself; this function exists for the named-struct
/// case, where `field_names` gives the struct's declared fields in
/// order and `decode_field` is supplied by the generated `Row` impl
/// (via `sqlkit-derive`) to construct the final value from the
/// positionally-decoded column values.
pub fn decode_named_row<R: RawRow>(
    row: &R,
    registry: &Registry,
    field_names: &[&'static str],
    field_type_tags: &[&'static str],
    field_nullable: &[bool],
) -> Result<Vec<WireValue>, DecodeError> {
    let mut values = Vec::with_capacity(field_names.len());
    for ((name, type_tag), nullable) in field_names.iter().zip(field_type_tags).zip(field_nullable) {
        let raw = row.get(name).ok_or_else(|| DecodeError::MissingColumn { field: (*name).to_string() })?;
        if matches!(raw, WireValue::Null) && !nullable {
            return Err(DecodeError::NullNotAllowed { field: (*name).to_string() });
        }
        let decoded = if matches!(raw, WireValue::Null) {
            WireValue::Null
        } else {
            registry.decode(type_tag, &raw)?
        };
        values.push(decoded);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRow {
        columns: HashMap<String, WireValue>,
    }

    impl RawRow for FakeRow {
        fn columns(&self) -> Vec<String> {
            self.columns.keys().cloned().collect()
        }

        fn get(&self, column: &str) -> Option<WireValue> {
            self.columns.get(column).cloned()
        }
    }

    #[test]
    fn test_registry_reports_missing_codec() {
        let registry = Registry::new();
        let err = registry.decode("uuid", &WireValue::Text("x".into())).unwrap_err();
        assert!(matches!(err, DecodeError::NoCodec { .. }));
    }

    #[test]
    fn test_decode_named_row_missing_column_errors() {
        let row = FakeRow { columns: HashMap::new() };
        let registry = Registry::with_builtins();
        let err = decode_named_row(&row, &registry, &["id"], &["int"], &[false]).unwrap_err();
        assert!(matches!(err, DecodeError::MissingColumn { field } if field == "id"));
    }

    #[test]
    fn test_decode_named_row_null_not_allowed() {
        let mut columns = HashMap::new();
        columns.insert("id".to_string(), WireValue::Null);
        let row = FakeRow { columns };
        let registry = Registry::with_builtins();
        let err = decode_named_row(&row, &registry, &["id"], &["int"], &[false]).unwrap_err();
        assert!(matches!(err, DecodeError::NullNotAllowed { field } if field == "id"));
    }

    #[test]
    fn test_decode_named_row_null_allowed_when_nullable() {
        let mut columns = HashMap::new();
        columns.insert("nickname".to_string(), WireValue::Null);
        let row = FakeRow { columns };
        let registry = Registry::with_builtins();
        let values = decode_named_row(&row, &registry, &["nickname"], &["text"], &[true]).unwrap();
        assert_eq!(values, vec![WireValue::Null]);
    }
}
