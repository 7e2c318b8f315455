use thiserror::Error;

use crate::wire::{WireType, WireValue};

/// A single value failed to convert to or from its wire representation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Expected {expected} attribute, found {found}")]
    UnexpectedType { expected: WireType, found: WireType },

    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("Number {0} has no decimal representation")]
    NonFinite(String),

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Duplicate set element: {0}")]
    DuplicateSetElement(String),

    #[error("Unknown label {label:?}, expected one of: {expected}")]
    UnknownLabel { label: String, expected: String },

    #[error("Timestamp {0} is out of range")]
    DateOutOfRange(i64),

    #[error("Value is not a {expected}")]
    TypeMismatch { expected: &'static str },

    #[error("Missing required field")]
    MissingField,

    #[error("Field has no codec")]
    Unmapped,

    #[error("Element {index}: {source}")]
    Element {
        index: usize,
        source: Box<CodecError>,
    },

    #[error("Nested record: {0}")]
    Nested(Box<SerializationError>),
}

impl CodecError {
    pub(crate) fn unexpected(expected: WireType, found: &WireValue) -> Self {
        CodecError::UnexpectedType {
            expected,
            found: found.wire_type(),
        }
    }
}

/// A record field failed to serialize or deserialize.
///
/// Carries the offending field name so callers can tell which part of the
/// schema disagrees with the stored data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Field '{field}': {source}")]
pub struct SerializationError {
    pub field: String,
    pub source: CodecError,
}

impl SerializationError {
    pub fn new(field: impl Into<String>, source: CodecError) -> Self {
        Self {
            field: field.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_type_display() {
        let error = CodecError::unexpected(WireType::Number, &WireValue::String("x".into()));
        assert_eq!(error.to_string(), "Expected N attribute, found S");
    }

    #[test]
    fn test_serialization_error_carries_field() {
        let error = SerializationError::new("price", CodecError::InvalidNumber("abc".into()));
        assert_eq!(error.field, "price");
        assert_eq!(error.to_string(), "Field 'price': Invalid number: \"abc\"");
    }

    #[test]
    fn test_serialization_error_exposes_source() {
        use std::error::Error as _;

        let error = SerializationError::new("code", CodecError::MissingField);
        let source = error.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Missing required field"));
    }

    #[test]
    fn test_element_error_display() {
        let error = CodecError::Element {
            index: 2,
            source: Box::new(CodecError::InvalidNumber("x".into())),
        };
        assert_eq!(error.to_string(), "Element 2: Invalid number: \"x\"");
    }
}
