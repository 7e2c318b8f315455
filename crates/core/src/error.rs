use thiserror::Error;

use crate::wire::WireType;

/// Errors raised while assembling codecs, key specifications and indexes.
///
/// These are configuration mistakes and surface when a codec or DAO is
/// constructed, never while records flow through it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Field '{0}' is registered more than once")]
    DuplicateField(String),

    #[error("Field '{0}' is not part of the record codec")]
    UnknownField(String),

    #[error("Key field '{field}' must be coded as S or N, found {found}")]
    UnsupportedKeyType { field: String, found: WireType },

    #[error("Partition and sort key both use field '{0}'")]
    SameKeyFields(String),

    #[error("Local index '{index}' must use the table partition key '{expected}', found '{found}'")]
    LocalIndexPartition {
        index: String,
        expected: String,
        found: String,
    },

    #[error("Local index '{0}' needs a sort key on both the index and the table")]
    LocalIndexSortKey(String),

    #[error("Index '{0}' is declared more than once")]
    DuplicateIndex(String),

    #[error("Index '{0}' is not declared on this table")]
    UnknownIndex(String),

    #[error("Sort condition given, but the key on '{0}' has no sort key")]
    MissingSortKey(String),

    #[error("Key on '{0}' requires a sort key value")]
    IncompleteKey(String),

    #[error("begins_with requires a string sort key, found {0}")]
    BeginsWithRequiresString(WireType),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_field_display() {
        let error = SchemaError::DuplicateField("price".to_string());
        assert_eq!(error.to_string(), "Field 'price' is registered more than once");
    }

    #[test]
    fn test_unsupported_key_type_display() {
        let error = SchemaError::UnsupportedKeyType {
            field: "active".to_string(),
            found: WireType::Boolean,
        };
        assert_eq!(
            error.to_string(),
            "Key field 'active' must be coded as S or N, found BOOL"
        );
    }

    #[test]
    fn test_local_index_partition_display() {
        let error = SchemaError::LocalIndexPartition {
            index: "byPrice".to_string(),
            expected: "type".to_string(),
            found: "code".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Local index 'byPrice' must use the table partition key 'type', found 'code'"
        );
    }
}
