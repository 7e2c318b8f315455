use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{FieldTypes, Index, IndexKind, KeySpec, ProjectionDeclaration};
use crate::error::SchemaError;
use crate::wire::WireType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    Hash,
    Range,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Hash => "HASH",
            KeyType::Range => "RANGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: WireType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: KeyType,
}

impl KeySchemaElement {
    /// The key schema of `key`: its partition field as `HASH`, then its sort
    /// field as `RANGE`.
    pub fn for_key(key: &KeySpec) -> Vec<KeySchemaElement> {
        let mut schema = vec![KeySchemaElement {
            attribute_name: key.partition_key().to_string(),
            key_type: KeyType::Hash,
        }];
        if let Some(sort) = key.sort_key() {
            schema.push(KeySchemaElement {
                attribute_name: sort.to_string(),
                key_type: KeyType::Range,
            });
        }
        schema
    }
}

/// Provisioned read and write capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    pub read_capacity_units: i64,
    pub write_capacity_units: i64,
}

impl Default for Throughput {
    fn default() -> Self {
        Self {
            read_capacity_units: 1,
            write_capacity_units: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDeclaration {
    pub index_name: String,
    pub key_schema: Vec<KeySchemaElement>,
    pub projection: ProjectionDeclaration,
    /// Set for global indexes only.
    pub provisioned_throughput: Option<Throughput>,
}

/// Everything needed to create a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDeclaration {
    pub table_name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeySchemaElement>,
    pub local_secondary_indexes: Vec<IndexDeclaration>,
    pub global_secondary_indexes: Vec<IndexDeclaration>,
    pub provisioned_throughput: Throughput,
}

/// A validated table key together with its secondary indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    key: KeySpec,
    indexes: Vec<Index>,
    attributes: Vec<AttributeDefinition>,
}

impl TableSchema {
    /// Validates the table key and every index against `fields`.
    ///
    /// Local indexes must keep the table partition key and add a sort key to
    /// a table that has one. Index names must be unique and projected fields
    /// must be known.
    pub fn new(
        key: KeySpec,
        indexes: Vec<Index>,
        fields: &impl FieldTypes,
    ) -> Result<Self, SchemaError> {
        key.validate(fields)?;

        let mut names = HashSet::new();
        for index in &indexes {
            if !names.insert(index.name()) {
                return Err(SchemaError::DuplicateIndex(index.name().to_string()));
            }
            index.key().validate(fields)?;
            if index.kind() == IndexKind::Local {
                if index.key().partition_key() != key.partition_key() {
                    return Err(SchemaError::LocalIndexPartition {
                        index: index.name().to_string(),
                        expected: key.partition_key().to_string(),
                        found: index.key().partition_key().to_string(),
                    });
                }
                if key.sort_key().is_none() || index.key().sort_key().is_none() {
                    return Err(SchemaError::LocalIndexSortKey(index.name().to_string()));
                }
            }
            for field in index.projection().unwrap_or_default() {
                if fields.type_of(field).is_none() {
                    return Err(SchemaError::UnknownField(field.clone()));
                }
            }
        }

        let mut attributes: Vec<AttributeDefinition> = Vec::new();
        let key_fields = key
            .fields()
            .chain(indexes.iter().flat_map(|index| index.key().fields()));
        for field in key_fields {
            if attributes.iter().any(|a| a.attribute_name == field) {
                continue;
            }
            let attribute_type = fields
                .type_of(field)
                .ok_or_else(|| SchemaError::UnknownField(field.to_string()))?;
            attributes.push(AttributeDefinition {
                attribute_name: field.to_string(),
                attribute_type,
            });
        }

        Ok(Self {
            key,
            indexes,
            attributes,
        })
    }

    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn index(&self, name: &str) -> Result<&Index, SchemaError> {
        self.indexes
            .iter()
            .find(|index| index.name() == name)
            .ok_or_else(|| SchemaError::UnknownIndex(name.to_string()))
    }

    /// Union of the table and index key fields, deduplicated in first-seen
    /// order.
    pub fn attribute_definitions(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    pub fn declaration(&self, table_name: &str, throughput: Throughput) -> TableDeclaration {
        let declare = |index: &Index| IndexDeclaration {
            index_name: index.name().to_string(),
            key_schema: KeySchemaElement::for_key(index.key()),
            projection: index.projection_declaration(&self.key),
            provisioned_throughput: match index.kind() {
                IndexKind::Global => Some(throughput),
                IndexKind::Local => None,
            },
        };
        let of_kind = |kind: IndexKind| {
            self.indexes
                .iter()
                .filter(|index| index.kind() == kind)
                .map(&declare)
                .collect::<Vec<_>>()
        };

        TableDeclaration {
            table_name: table_name.to_string(),
            attribute_definitions: self.attributes.clone(),
            key_schema: KeySchemaElement::for_key(&self.key),
            local_secondary_indexes: of_kind(IndexKind::Local),
            global_secondary_indexes: of_kind(IndexKind::Global),
            provisioned_throughput: throughput,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct Types(HashMap<&'static str, WireType>);

    impl FieldTypes for Types {
        fn type_of(&self, field: &str) -> Option<WireType> {
            self.0.get(field).copied()
        }
    }

    fn types() -> Types {
        Types(HashMap::from([
            ("type", WireType::String),
            ("code", WireType::Number),
            ("price", WireType::Number),
            ("name", WireType::String),
            ("tags", WireType::List),
        ]))
    }

    fn schema() -> TableSchema {
        TableSchema::new(
            KeySpec::composite("type", "code"),
            vec![
                Index::local("byPrice", KeySpec::composite("type", "price"))
                    .with_projection(["price", "name"]),
                Index::global("byName", KeySpec::composite("name", "code")),
            ],
            &types(),
        )
        .unwrap()
    }

    #[test]
    fn test_attribute_definitions_are_deduplicated_in_order() {
        let schema = schema();
        let names: Vec<_> = schema
            .attribute_definitions()
            .iter()
            .map(|a| (a.attribute_name.as_str(), a.attribute_type))
            .collect();
        assert_eq!(
            names,
            vec![
                ("type", WireType::String),
                ("code", WireType::Number),
                ("price", WireType::Number),
                ("name", WireType::String),
            ]
        );
    }

    #[test]
    fn test_declaration() {
        let throughput = Throughput {
            read_capacity_units: 5,
            write_capacity_units: 3,
        };
        let declaration = schema().declaration("products", throughput);

        assert_eq!(declaration.table_name, "products");
        assert_eq!(declaration.provisioned_throughput, throughput);
        assert_eq!(
            declaration.key_schema,
            vec![
                KeySchemaElement {
                    attribute_name: "type".to_string(),
                    key_type: KeyType::Hash,
                },
                KeySchemaElement {
                    attribute_name: "code".to_string(),
                    key_type: KeyType::Range,
                },
            ]
        );

        let [local] = declaration.local_secondary_indexes.as_slice() else {
            panic!("expected one local index");
        };
        assert_eq!(local.index_name, "byPrice");
        assert_eq!(
            local.projection,
            ProjectionDeclaration::Include(vec!["name".to_string()])
        );
        assert_eq!(local.provisioned_throughput, None);

        let [global] = declaration.global_secondary_indexes.as_slice() else {
            panic!("expected one global index");
        };
        assert_eq!(global.index_name, "byName");
        assert_eq!(global.projection, ProjectionDeclaration::All);
        assert_eq!(global.provisioned_throughput, Some(throughput));
    }

    #[test]
    fn test_local_index_must_share_partition() {
        let result = TableSchema::new(
            KeySpec::composite("type", "code"),
            vec![Index::local("byName", KeySpec::composite("name", "price"))],
            &types(),
        );
        assert_eq!(
            result.unwrap_err(),
            SchemaError::LocalIndexPartition {
                index: "byName".to_string(),
                expected: "type".to_string(),
                found: "name".to_string(),
            }
        );
    }

    #[test]
    fn test_local_index_needs_its_own_sort_key() {
        let result = TableSchema::new(
            KeySpec::composite("type", "code"),
            vec![Index::local("byType", KeySpec::partition("type"))],
            &types(),
        );
        assert_eq!(
            result.unwrap_err(),
            SchemaError::LocalIndexSortKey("byType".to_string())
        );
    }

    #[test]
    fn test_local_index_needs_sorted_table() {
        let result = TableSchema::new(
            KeySpec::partition("type"),
            vec![Index::local("byPrice", KeySpec::composite("type", "price"))],
            &types(),
        );
        assert_eq!(
            result.unwrap_err(),
            SchemaError::LocalIndexSortKey("byPrice".to_string())
        );
    }

    #[test]
    fn test_rejects_duplicate_index_names() {
        let result = TableSchema::new(
            KeySpec::partition("type"),
            vec![
                Index::global("byName", KeySpec::partition("name")),
                Index::global("byName", KeySpec::partition("code")),
            ],
            &types(),
        );
        assert_eq!(
            result.unwrap_err(),
            SchemaError::DuplicateIndex("byName".to_string())
        );
    }

    #[test]
    fn test_rejects_unknown_projected_field() {
        let result = TableSchema::new(
            KeySpec::partition("type"),
            vec![Index::global("byName", KeySpec::partition("name")).with_projection(["colour"])],
            &types(),
        );
        assert_eq!(
            result.unwrap_err(),
            SchemaError::UnknownField("colour".to_string())
        );
    }

    #[test]
    fn test_rejects_index_key_of_wrong_type() {
        let result = TableSchema::new(
            KeySpec::partition("type"),
            vec![Index::global("byTags", KeySpec::partition("tags"))],
            &types(),
        );
        assert!(matches!(
            result,
            Err(SchemaError::UnsupportedKeyType { .. })
        ));
    }

    #[test]
    fn test_unknown_index() {
        assert_eq!(
            schema().index("byColour").unwrap_err(),
            SchemaError::UnknownIndex("byColour".to_string())
        );
        assert_eq!(schema().index("byName").unwrap().kind(), IndexKind::Global);
    }
}
