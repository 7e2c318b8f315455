use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::wire::WireType;

/// Resolves a field name to the wire type its codec produces.
///
/// Returns `None` for fields that are unknown or not coded.
pub trait FieldTypes {
    fn type_of(&self, field: &str) -> Option<WireType>;
}

/// A partition key field, optionally paired with a sort key field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    partition: String,
    sort: Option<String>,
}

impl KeySpec {
    /// A key made of a partition field only.
    pub fn partition(field: impl Into<String>) -> Self {
        Self {
            partition: field.into(),
            sort: None,
        }
    }

    /// A key made of a partition field and a sort field.
    pub fn composite(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: Some(sort.into()),
        }
    }

    pub fn partition_key(&self) -> &str {
        &self.partition
    }

    pub fn sort_key(&self) -> Option<&str> {
        self.sort.as_deref()
    }

    /// The key fields, partition first.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition.as_str()).chain(self.sort.as_deref())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields().any(|f| f == field)
    }

    /// Checks that both fields are distinct, known to `fields`, and coded as
    /// `S` or `N`.
    pub fn validate(&self, fields: &impl FieldTypes) -> Result<(), SchemaError> {
        if self.sort.as_deref() == Some(self.partition.as_str()) {
            return Err(SchemaError::SameKeyFields(self.partition.clone()));
        }
        for field in self.fields() {
            let found = fields
                .type_of(field)
                .ok_or_else(|| SchemaError::UnknownField(field.to_string()))?;
            if !found.is_key_type() {
                return Err(SchemaError::UnsupportedKeyType {
                    field: field.to_string(),
                    found,
                });
            }
        }
        Ok(())
    }
}
