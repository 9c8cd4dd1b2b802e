//! The `Row` trait (spec.md §9, SPEC_FULL.md §1.1): the named-struct
//! side of a `Query<OutShape>`'s output shape.
//!
//! Implemented by `#[derive(Row)]` (`sqlkit-derive`). This is the
//! teacher's `Table`/`Column`/`Selectable` trio (`schema::Table`,
//! `schema::Column`) narrowed to exactly what row mapping needs — field
//! names in declaration order and a positional constructor — since
//! column-accessor codegen and compile-time-checked column selection are
//! ORM concerns spec.md §1 puts out of scope.

use crate::codec::WireValue;
use crate::error::DecodeError;

/// A Rust type that a query's decoded rows can be mapped into.
pub trait Row: Sized {
    /// Field names, in declaration order, used to look up columns by
    /// name in the raw row.
    const FIELD_NAMES: &'static [&'static str];

    /// Each field's codec type tag, in the same order as
    /// `FIELD_NAMES` (spec.md §4.4 "obtain the codec for the field
    /// type").
    const FIELD_TYPE_TAGS: &'static [&'static str];

    /// Whether each field accepts a `NULL` column value, in the same
    /// order as `FIELD_NAMES`.
    const FIELD_NULLABLE: &'static [bool];

    /// Builds `Self` from decoded column values, supplied positionally
    /// in `FIELD_NAMES` order.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ConstructorRejected`] if `values` has the
    /// wrong arity or a value's runtime shape doesn't match the field
    /// it's assigned to.
    fn from_positional(values: Vec<WireValue>) -> Result<Self, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Account {
        id: i64,
        email: String,
    }

    impl Row for Account {
        const FIELD_NAMES: &'static [&'static str] = &["id", "email"];
        const FIELD_TYPE_TAGS: &'static [&'static str] = &["int", "text"];
        const FIELD_NULLABLE: &'static [bool] = &[false, false];

        fn from_positional(values: Vec<WireValue>) -> Result<Self, DecodeError> {
            let mut it = values.into_iter();
            let id = match it.next() {
                Some(WireValue::Int(v)) => v,
                _ => {
                    return Err(DecodeError::ConstructorRejected {
                        reason: "id must be an integer".to_string(),
                    })
                }
            };
            let email = match it.next() {
                Some(WireValue::Text(v)) => v,
                _ => {
                    return Err(DecodeError::ConstructorRejected {
                        reason: "email must be text".to_string(),
                    })
                }
            };
            Ok(Self { id, email })
        }
    }

    #[test]
    fn test_from_positional_builds_struct() {
        let account = Account::from_positional(vec![WireValue::Int(1), WireValue::Text("a@example.com".into())]).unwrap();
        assert_eq!(account.id, 1);
        assert_eq!(account.email, "a@example.com");
    }

    #[test]
    fn test_from_positional_rejects_wrong_shape() {
        let err = Account::from_positional(vec![WireValue::Text("nope".into()), WireValue::Text("x".into())]).unwrap_err();
        assert!(matches!(err, DecodeError::ConstructorRejected { .. }));
    }

    #[test]
    fn test_field_metadata_matches_declaration_order() {
        assert_eq!(Account::FIELD_NAMES, &["id", "email"]);
        assert_eq!(Account::FIELD_TYPE_TAGS, &["int", "text"]);
        assert_eq!(Account::FIELD_NULLABLE, &[false, false]);
    }
}
