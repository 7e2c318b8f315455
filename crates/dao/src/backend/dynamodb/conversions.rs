//! DynamoDB attribute and schema conversion functions.
//!
//! Pure functions for converting between SDK types and the wire model.
//! These are testable in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{
    self as sdk, AttributeValue, GlobalSecondaryIndex, LocalSecondaryIndex, Projection,
    ProjectionType, ProvisionedThroughput, ScalarAttributeType,
};

use dynadao_core::key::{
    AttributeDefinition, IndexDeclaration, KeySchemaElement, KeyType, ProjectionDeclaration,
    Throughput,
};
use dynadao_core::wire::{Item, WireType, WireValue};

use crate::backend::{BackendError, IndexStatus, TableStatus};

// ============================================================================
// Attribute values
// ============================================================================

pub fn to_attribute_value(value: WireValue) -> AttributeValue {
    match value {
        WireValue::String(s) => AttributeValue::S(s),
        WireValue::Number(n) => AttributeValue::N(n),
        WireValue::Boolean(b) => AttributeValue::Bool(b),
        WireValue::Null => AttributeValue::Null(true),
        WireValue::Binary(b) => AttributeValue::B(Blob::new(b)),
        WireValue::List(values) => {
            AttributeValue::L(values.into_iter().map(to_attribute_value).collect())
        }
        WireValue::Map(item) => AttributeValue::M(to_item(item)),
        WireValue::StringSet(values) => AttributeValue::Ss(values),
        WireValue::NumberSet(values) => AttributeValue::Ns(values),
        WireValue::BinarySet(values) => {
            AttributeValue::Bs(values.into_iter().map(Blob::new).collect())
        }
    }
}

pub fn from_attribute_value(value: AttributeValue) -> Result<WireValue, BackendError> {
    Ok(match value {
        AttributeValue::S(s) => WireValue::String(s),
        AttributeValue::N(n) => WireValue::Number(n),
        AttributeValue::Bool(b) => WireValue::Boolean(b),
        AttributeValue::Null(_) => WireValue::Null,
        AttributeValue::B(b) => WireValue::Binary(b.into_inner()),
        AttributeValue::L(values) => WireValue::List(
            values
                .into_iter()
                .map(from_attribute_value)
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(item) => WireValue::Map(from_item(item)?),
        AttributeValue::Ss(values) => WireValue::StringSet(values),
        AttributeValue::Ns(values) => WireValue::NumberSet(values),
        AttributeValue::Bs(values) => {
            WireValue::BinarySet(values.into_iter().map(Blob::into_inner).collect())
        }
        other => {
            return Err(BackendError::InvalidRequest(format!(
                "Unsupported attribute value: {:?}",
                other
            )))
        }
    })
}

pub fn to_item(item: Item) -> HashMap<String, AttributeValue> {
    item.into_iter()
        .map(|(name, value)| (name, to_attribute_value(value)))
        .collect()
}

pub fn from_item(item: HashMap<String, AttributeValue>) -> Result<Item, BackendError> {
    item.into_iter()
        .map(|(name, value)| Ok((name, from_attribute_value(value)?)))
        .collect()
}

/// Converts an optional map, leaving empty maps out of the request.
pub fn to_optional_item(item: Item) -> Option<HashMap<String, AttributeValue>> {
    (!item.is_empty()).then(|| to_item(item))
}

// ============================================================================
// Table declarations
// ============================================================================

fn build_error(e: impl std::fmt::Display) -> BackendError {
    BackendError::InvalidRequest(e.to_string())
}

fn to_scalar_type(attribute_type: WireType) -> Result<ScalarAttributeType, BackendError> {
    match attribute_type {
        WireType::String => Ok(ScalarAttributeType::S),
        WireType::Number => Ok(ScalarAttributeType::N),
        WireType::Binary => Ok(ScalarAttributeType::B),
        other => Err(BackendError::InvalidRequest(format!(
            "{other} cannot be used as a key attribute type"
        ))),
    }
}

pub fn to_attribute_definitions(
    definitions: &[AttributeDefinition],
) -> Result<Vec<sdk::AttributeDefinition>, BackendError> {
    definitions
        .iter()
        .map(|definition| {
            sdk::AttributeDefinition::builder()
                .attribute_name(&definition.attribute_name)
                .attribute_type(to_scalar_type(definition.attribute_type)?)
                .build()
                .map_err(build_error)
        })
        .collect()
}

pub fn to_key_schema(
    elements: &[KeySchemaElement],
) -> Result<Vec<sdk::KeySchemaElement>, BackendError> {
    elements
        .iter()
        .map(|element| {
            sdk::KeySchemaElement::builder()
                .attribute_name(&element.attribute_name)
                .key_type(match element.key_type {
                    KeyType::Hash => sdk::KeyType::Hash,
                    KeyType::Range => sdk::KeyType::Range,
                })
                .build()
                .map_err(build_error)
        })
        .collect()
}

pub fn to_projection(projection: &ProjectionDeclaration) -> Projection {
    match projection {
        ProjectionDeclaration::All => Projection::builder()
            .projection_type(ProjectionType::All)
            .build(),
        ProjectionDeclaration::KeysOnly => Projection::builder()
            .projection_type(ProjectionType::KeysOnly)
            .build(),
        ProjectionDeclaration::Include(fields) => Projection::builder()
            .projection_type(ProjectionType::Include)
            .set_non_key_attributes(Some(fields.clone()))
            .build(),
    }
}

pub fn to_throughput(throughput: Throughput) -> Result<ProvisionedThroughput, BackendError> {
    ProvisionedThroughput::builder()
        .read_capacity_units(throughput.read_capacity_units)
        .write_capacity_units(throughput.write_capacity_units)
        .build()
        .map_err(build_error)
}

pub fn to_local_index(index: &IndexDeclaration) -> Result<LocalSecondaryIndex, BackendError> {
    LocalSecondaryIndex::builder()
        .index_name(&index.index_name)
        .set_key_schema(Some(to_key_schema(&index.key_schema)?))
        .projection(to_projection(&index.projection))
        .build()
        .map_err(build_error)
}

pub fn to_global_index(index: &IndexDeclaration) -> Result<GlobalSecondaryIndex, BackendError> {
    let throughput = index
        .provisioned_throughput
        .map(to_throughput)
        .transpose()?;
    GlobalSecondaryIndex::builder()
        .index_name(&index.index_name)
        .set_key_schema(Some(to_key_schema(&index.key_schema)?))
        .projection(to_projection(&index.projection))
        .set_provisioned_throughput(throughput)
        .build()
        .map_err(build_error)
}

// ============================================================================
// Table status
// ============================================================================

pub fn from_table_status(status: Option<&sdk::TableStatus>) -> TableStatus {
    match status {
        Some(sdk::TableStatus::Active) => TableStatus::Active,
        Some(sdk::TableStatus::Creating) => TableStatus::Creating,
        Some(sdk::TableStatus::Updating) => TableStatus::Updating,
        Some(sdk::TableStatus::Deleting) => TableStatus::Deleting,
        Some(sdk::TableStatus::Archiving) => TableStatus::Archiving,
        Some(sdk::TableStatus::Archived) => TableStatus::Archived,
        Some(sdk::TableStatus::InaccessibleEncryptionCredentials) => {
            TableStatus::InaccessibleEncryptionCredentials
        }
        _ => TableStatus::Unknown,
    }
}

pub fn from_index_status(status: Option<&sdk::IndexStatus>) -> IndexStatus {
    match status {
        Some(sdk::IndexStatus::Active) => IndexStatus::Active,
        Some(sdk::IndexStatus::Creating) => IndexStatus::Creating,
        Some(sdk::IndexStatus::Updating) => IndexStatus::Updating,
        Some(sdk::IndexStatus::Deleting) => IndexStatus::Deleting,
        _ => IndexStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_wire_variant_survives_conversion() {
        let values = vec![
            WireValue::String("book".to_string()),
            WireValue::Number("12.5".to_string()),
            WireValue::Boolean(true),
            WireValue::Null,
            WireValue::Binary(vec![0, 1, 255]),
            WireValue::List(vec![WireValue::Number("1".to_string()), WireValue::Null]),
            WireValue::Map(Item::from([(
                "inner".to_string(),
                WireValue::String("x".to_string()),
            )])),
            WireValue::StringSet(vec!["a".to_string(), "b".to_string()]),
            WireValue::NumberSet(vec!["1".to_string(), "2".to_string()]),
            WireValue::BinarySet(vec![vec![1], vec![2, 3]]),
        ];
        for value in values {
            let converted = from_attribute_value(to_attribute_value(value.clone())).unwrap();
            assert_eq!(converted, value);
        }
    }

    #[test]
    fn test_null_is_sent_as_true() {
        assert_eq!(to_attribute_value(WireValue::Null), AttributeValue::Null(true));
    }

    #[test]
    fn test_empty_maps_are_omitted() {
        assert!(to_optional_item(Item::new()).is_none());
        let item = Item::from([(":pk".to_string(), WireValue::String("a".to_string()))]);
        assert_eq!(
            to_optional_item(item).unwrap()[":pk"],
            AttributeValue::S("a".to_string())
        );
    }

    #[test]
    fn test_key_attribute_types() {
        let definitions = to_attribute_definitions(&[
            AttributeDefinition {
                attribute_name: "type".to_string(),
                attribute_type: WireType::String,
            },
            AttributeDefinition {
                attribute_name: "code".to_string(),
                attribute_type: WireType::Number,
            },
        ])
        .unwrap();
        assert_eq!(definitions[0].attribute_type(), &ScalarAttributeType::S);
        assert_eq!(definitions[1].attribute_type(), &ScalarAttributeType::N);

        let invalid = to_attribute_definitions(&[AttributeDefinition {
            attribute_name: "tags".to_string(),
            attribute_type: WireType::List,
        }]);
        assert!(invalid.is_err());
    }

    #[test]
    fn test_include_projection_lists_non_key_attributes() {
        let projection = to_projection(&ProjectionDeclaration::Include(vec!["name".to_string()]));
        assert_eq!(projection.projection_type(), Some(&ProjectionType::Include));
        assert_eq!(projection.non_key_attributes(), ["name".to_string()]);
    }

    #[test]
    fn test_global_index_carries_throughput() {
        let index = IndexDeclaration {
            index_name: "byName".to_string(),
            key_schema: vec![KeySchemaElement {
                attribute_name: "name".to_string(),
                key_type: KeyType::Hash,
            }],
            projection: ProjectionDeclaration::All,
            provisioned_throughput: Some(Throughput {
                read_capacity_units: 4,
                write_capacity_units: 2,
            }),
        };
        let index = to_global_index(&index).unwrap();
        let throughput = index.provisioned_throughput().unwrap();
        assert_eq!(throughput.read_capacity_units(), 4);
        assert_eq!(throughput.write_capacity_units(), 2);
    }

    #[test]
    fn test_unknown_statuses_default_to_active() {
        assert_eq!(from_table_status(None), TableStatus::Active);
        assert_eq!(
            from_table_status(Some(&sdk::TableStatus::Creating)),
            TableStatus::Creating
        );
        assert_eq!(
            from_index_status(Some(&sdk::IndexStatus::Updating)),
            IndexStatus::Updating
        );
    }

    #[test]
    fn test_table_status_mapping() {
        let cases = [
            (Some(sdk::TableStatus::Active), TableStatus::Active),
            (Some(sdk::TableStatus::Creating), TableStatus::Creating),
            (Some(sdk::TableStatus::Updating), TableStatus::Updating),
            (Some(sdk::TableStatus::Deleting), TableStatus::Deleting),
            (Some(sdk::TableStatus::Archiving), TableStatus::Archiving),
            (Some(sdk::TableStatus::Archived), TableStatus::Archived),
            (
                Some(sdk::TableStatus::InaccessibleEncryptionCredentials),
                TableStatus::InaccessibleEncryptionCredentials,
            ),
            (Some(sdk::TableStatus::from("REPLICATING")), TableStatus::Unknown),
            (None, TableStatus::Unknown),
        ];
        for (status, expected) in cases {
            assert_eq!(from_table_status(status.as_ref()), expected, "{status:?}");
        }
    }

    #[test]
    fn test_index_status_mapping() {
        let cases = [
            (Some(sdk::IndexStatus::Active), IndexStatus::Active),
            (Some(sdk::IndexStatus::Creating), IndexStatus::Creating),
            (Some(sdk::IndexStatus::Updating), IndexStatus::Updating),
            (Some(sdk::IndexStatus::Deleting), IndexStatus::Deleting),
            (Some(sdk::IndexStatus::from("BACKFILLING")), IndexStatus::Unknown),
            (None, IndexStatus::Unknown),
        ];
        for (status, expected) in cases {
            assert_eq!(from_index_status(status.as_ref()), expected, "{status:?}");
        }
    }
}
