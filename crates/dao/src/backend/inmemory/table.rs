//! A single emulated table: items keyed by primary key, plus the index
//! definitions needed to answer queries and scans.

use std::collections::{BTreeMap, HashSet};

use dynadao_core::key::{
    IndexDeclaration, KeySchemaElement, KeyType, ProjectionDeclaration, TableDeclaration,
};
use dynadao_core::wire::{Item, WireValue};

use super::condition::{parse_key_condition, KeyConditionExpr, KeyPart};
use crate::backend::{BackendError, IndexStatus, PageResponse, QueryRequest, ScanRequest};
use crate::backend::{TableDescription, TableStatus};

/// The attribute names of a key schema, partition first.
#[derive(Debug, Clone)]
struct KeyNames {
    partition: String,
    sort: Option<String>,
}

impl KeyNames {
    fn from_schema(schema: &[KeySchemaElement]) -> Result<Self, BackendError> {
        let attribute = |key_type: KeyType| {
            schema
                .iter()
                .find(|element| element.key_type == key_type)
                .map(|element| element.attribute_name.clone())
        };
        let partition = attribute(KeyType::Hash)
            .ok_or_else(|| BackendError::InvalidRequest("Key schema has no HASH key".into()))?;
        Ok(Self {
            partition,
            sort: attribute(KeyType::Range),
        })
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition.as_str()).chain(self.sort.as_deref())
    }

    /// The key values of `item`, or `None` when an attribute is missing.
    fn parts(&self, item: &Item) -> Result<Option<Vec<KeyPart>>, BackendError> {
        let mut parts = Vec::with_capacity(2);
        for name in self.names() {
            match item.get(name) {
                Some(value) => parts.push(KeyPart::from_wire(value)?),
                None => return Ok(None),
            }
        }
        Ok(Some(parts))
    }
}

#[derive(Debug, Clone)]
struct IndexDef {
    name: String,
    key: KeyNames,
    projection: ProjectionDeclaration,
}

impl IndexDef {
    fn from_declaration(declaration: &IndexDeclaration) -> Result<Self, BackendError> {
        Ok(Self {
            name: declaration.index_name.clone(),
            key: KeyNames::from_schema(&declaration.key_schema)?,
            projection: declaration.projection.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub(super) struct Table {
    name: String,
    key: KeyNames,
    local_indexes: usize,
    indexes: Vec<IndexDef>,
    items: BTreeMap<Vec<KeyPart>, Item>,
    /// Describe calls left before the table reports itself active.
    pending_polls: u32,
    forced_status: Option<TableStatus>,
}

/// Which key orders a read, and which attributes it returns.
struct Target<'a> {
    key: &'a KeyNames,
    index: Option<&'a IndexDef>,
}

impl Table {
    pub(super) fn new(
        declaration: &TableDeclaration,
        pending_polls: u32,
    ) -> Result<Self, BackendError> {
        let indexes = declaration
            .local_secondary_indexes
            .iter()
            .chain(&declaration.global_secondary_indexes)
            .map(IndexDef::from_declaration)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: declaration.table_name.clone(),
            key: KeyNames::from_schema(&declaration.key_schema)?,
            local_indexes: declaration.local_secondary_indexes.len(),
            indexes,
            items: BTreeMap::new(),
            pending_polls,
            forced_status: None,
        })
    }

    pub(super) fn set_status(&mut self, status: TableStatus) {
        self.forced_status = Some(status);
    }

    pub(super) fn describe(&mut self) -> TableDescription {
        let (status, index_status) = if let Some(status) = self.forced_status {
            (status, IndexStatus::Active)
        } else if self.pending_polls > 0 {
            self.pending_polls -= 1;
            (TableStatus::Creating, IndexStatus::Creating)
        } else {
            (TableStatus::Active, IndexStatus::Active)
        };
        TableDescription {
            table_name: self.name.clone(),
            status,
            index_statuses: self.indexes[self.local_indexes..]
                .iter()
                .map(|index| (index.name.clone(), index_status))
                .collect(),
        }
    }

    pub(super) fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    fn primary_key(&self, item: &Item) -> Result<Vec<KeyPart>, BackendError> {
        self.key.parts(item)?.ok_or_else(|| {
            BackendError::InvalidRequest(
                "One of the required keys was not given a value".to_string(),
            )
        })
    }

    /// The exact key of a get or delete: the key attributes and nothing else.
    fn exact_key(&self, key: &Item) -> Result<Vec<KeyPart>, BackendError> {
        if key.len() != self.key.names().count() {
            return Err(BackendError::InvalidRequest(
                "The provided key element does not match the schema".to_string(),
            ));
        }
        self.primary_key(key)
    }

    pub(super) fn put(&mut self, item: Item) -> Result<(), BackendError> {
        let key = self.primary_key(&item)?;
        for index in &self.indexes {
            for name in index.key.names() {
                if let Some(value) = item.get(name) {
                    KeyPart::from_wire(value).map_err(|_| {
                        BackendError::InvalidRequest(format!(
                            "Type mismatch for Index Key {name} in index {}",
                            index.name
                        ))
                    })?;
                }
            }
        }
        for value in item.values() {
            check_sets(value)?;
        }
        self.items.insert(key, item);
        Ok(())
    }

    pub(super) fn get(&self, key: &Item) -> Result<Option<Item>, BackendError> {
        let key = self.exact_key(key)?;
        Ok(self.items.get(&key).cloned())
    }

    pub(super) fn delete(&mut self, key: &Item) -> Result<(), BackendError> {
        let key = self.exact_key(key)?;
        self.items.remove(&key);
        Ok(())
    }

    fn target(&self, index_name: Option<&str>) -> Result<Target<'_>, BackendError> {
        let Some(name) = index_name else {
            return Ok(Target {
                key: &self.key,
                index: None,
            });
        };
        let index = self
            .indexes
            .iter()
            .find(|index| index.name == name)
            .ok_or_else(|| {
                BackendError::InvalidRequest(format!(
                    "Table '{}' has no index named '{name}'",
                    self.name
                ))
            })?;
        Ok(Target {
            key: &index.key,
            index: Some(index),
        })
    }

    /// Items visible through `target`, ordered by its key and then by the
    /// table key. Each comes with its position, used for continuation.
    fn ordered<'a>(
        &'a self,
        target: &Target<'_>,
        condition: Option<&KeyConditionExpr>,
    ) -> Result<Vec<(Vec<KeyPart>, &'a Item)>, BackendError> {
        let mut rows = Vec::new();
        for (primary, item) in &self.items {
            // Items without the index key attributes are not in the index.
            let Some(mut position) = target.key.parts(item)? else {
                continue;
            };
            if let Some(condition) = condition {
                if position[0] != condition.partition || !condition.matches_sort(item) {
                    continue;
                }
            }
            if target.index.is_some() {
                position.extend(primary.iter().cloned());
            }
            rows.push((position, item));
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }

    /// The position of a continuation key under `target`.
    fn start_position(
        &self,
        target: &Target<'_>,
        start: &Item,
    ) -> Result<Vec<KeyPart>, BackendError> {
        let invalid = || BackendError::InvalidRequest("The provided starting key is invalid".into());
        let mut position = target.key.parts(start)?.ok_or_else(invalid)?;
        if target.index.is_some() {
            position.extend(self.key.parts(start)?.ok_or_else(invalid)?);
        }
        Ok(position)
    }

    /// The attributes of a continuation key: the target's key plus, for
    /// indexes, the table key.
    fn continuation_key(&self, target: &Target<'_>, item: &Item) -> Item {
        let names: Vec<&str> = match target.index {
            Some(_) => target.key.names().chain(self.key.names()).collect(),
            None => self.key.names().collect(),
        };
        names
            .into_iter()
            .filter_map(|name| item.get(name).map(|value| (name.to_string(), value.clone())))
            .collect()
    }

    fn project(&self, target: &Target<'_>, item: &Item) -> Item {
        let Some(index) = target.index else {
            return item.clone();
        };
        let included = match &index.projection {
            ProjectionDeclaration::All => return item.clone(),
            ProjectionDeclaration::KeysOnly => &[][..],
            ProjectionDeclaration::Include(fields) => fields.as_slice(),
        };
        item.iter()
            .filter(|(name, _)| {
                index.key.names().any(|key| key == name.as_str())
                    || self.key.names().any(|key| key == name.as_str())
                    || included.iter().any(|field| field == *name)
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn page(
        &self,
        target: &Target<'_>,
        rows: Vec<(Vec<KeyPart>, &Item)>,
        start: Option<&Item>,
        forward: bool,
        limit: Option<usize>,
    ) -> Result<PageResponse, BackendError> {
        let start = start
            .map(|start| self.start_position(target, start))
            .transpose()?;
        let mut rows = rows;
        if !forward {
            rows.reverse();
        }
        if let Some(start) = start {
            rows.retain(|(position, _)| {
                if forward {
                    *position > start
                } else {
                    *position < start
                }
            });
        }

        let take = limit.unwrap_or(usize::MAX).min(rows.len());
        let last_evaluated_key = match rows.get(take) {
            Some(_) if take > 0 => Some(self.continuation_key(target, rows[take - 1].1)),
            _ => None,
        };
        let items = rows[..take]
            .iter()
            .map(|(_, item)| self.project(target, item))
            .collect();

        Ok(PageResponse {
            items,
            last_evaluated_key,
        })
    }

    pub(super) fn query(
        &self,
        request: &QueryRequest,
        page_size: Option<usize>,
    ) -> Result<PageResponse, BackendError> {
        let target = self.target(request.index_name.as_deref())?;
        let condition = parse_key_condition(
            &request.key_condition_expression,
            &request.expression_attribute_names,
            &request.expression_attribute_values,
        )?;

        let key_matches = condition.partition_name == target.key.partition
            && condition
                .sort
                .as_ref()
                .map_or(true, |(name, _)| Some(name) == target.key.sort.as_ref());
        if !key_matches {
            return Err(BackendError::InvalidRequest(
                "Query condition missed key schema element".to_string(),
            ));
        }

        let rows = self.ordered(&target, Some(&condition))?;
        self.page(
            &target,
            rows,
            request.exclusive_start_key.as_ref(),
            request.scan_index_forward.unwrap_or(true),
            page_limit(request.limit, page_size)?,
        )
    }

    pub(super) fn scan(
        &self,
        request: &ScanRequest,
        page_size: Option<usize>,
    ) -> Result<PageResponse, BackendError> {
        let target = self.target(request.index_name.as_deref())?;
        let rows = self.ordered(&target, None)?;
        self.page(
            &target,
            rows,
            request.exclusive_start_key.as_ref(),
            true,
            page_limit(request.limit, page_size)?,
        )
    }
}

/// Combines the request limit with the backend's own page size.
/// Sets must be non-empty and hold no duplicates, at any depth.
fn check_sets(value: &WireValue) -> Result<(), BackendError> {
    fn unique<T: std::hash::Hash + Eq>(values: &[T]) -> bool {
        let mut seen = HashSet::new();
        !values.is_empty() && values.iter().all(|v| seen.insert(v))
    }

    let valid = match value {
        WireValue::StringSet(values) | WireValue::NumberSet(values) => unique(values),
        WireValue::BinarySet(values) => unique(values),
        WireValue::List(values) => return values.iter().try_for_each(check_sets),
        WireValue::Map(values) => return values.values().try_for_each(check_sets),
        _ => true,
    };
    if !valid {
        return Err(BackendError::InvalidRequest(format!(
            "An {} set may not be empty or contain duplicates",
            value.wire_type()
        )));
    }
    Ok(())
}

fn page_limit(limit: Option<i32>, page_size: Option<usize>) -> Result<Option<usize>, BackendError> {
    let limit = match limit {
        Some(limit) if limit < 1 => {
            return Err(BackendError::InvalidRequest(
                "Limit must be greater than or equal to 1".to_string(),
            ))
        }
        Some(limit) => Some(limit as usize),
        None => None,
    };
    Ok(match (limit, page_size) {
        (Some(limit), Some(size)) => Some(limit.min(size)),
        (limit, size) => limit.or(size),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynadao_core::key::{Index, KeySpec, TableSchema, Throughput};
    use dynadao_core::wire::{WireType, WireValue};

    use super::*;

    struct Types;

    impl dynadao_core::key::FieldTypes for Types {
        fn type_of(&self, field: &str) -> Option<WireType> {
            match field {
                "type" | "name" => Some(WireType::String),
                "code" | "price" => Some(WireType::Number),
                _ => None,
            }
        }
    }

    fn table() -> Table {
        let schema = TableSchema::new(
            KeySpec::composite("type", "code"),
            vec![
                Index::local("byPrice", KeySpec::composite("type", "price"))
                    .with_projection(Vec::<String>::new()),
                Index::global("byName", KeySpec::partition("name")),
            ],
            &Types,
        )
        .unwrap();
        let declaration = schema.declaration("products", Throughput::default());
        let mut table = Table::new(&declaration, 0).unwrap();
        let rows = [("book", 3, 30), ("book", 1, 10), ("book", 2, 5), ("pen", 1, 1)];
        for (kind, code, price) in rows {
            table.put(product(kind, code, price)).unwrap();
        }
        table
    }

    fn product(kind: &str, code: i64, price: i64) -> Item {
        Item::from([
            ("type".to_string(), WireValue::String(kind.to_string())),
            ("code".to_string(), WireValue::Number(code.to_string())),
            ("price".to_string(), WireValue::Number(price.to_string())),
        ])
    }

    fn codes(page: &PageResponse) -> Vec<&str> {
        page.items
            .iter()
            .map(|item| item["code"].as_number().unwrap_or_default())
            .collect()
    }

    fn query(expression: &str, values: &[(&str, WireValue)]) -> QueryRequest {
        QueryRequest {
            table_name: "products".to_string(),
            key_condition_expression: expression.to_string(),
            expression_attribute_names: HashMap::from([
                ("#pk".to_string(), "type".to_string()),
                ("#sk".to_string(), "code".to_string()),
            ]),
            expression_attribute_values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            ..Default::default()
        }
    }

    fn book() -> (&'static str, WireValue) {
        (":pk", WireValue::String("book".to_string()))
    }

    #[test]
    fn test_query_orders_by_sort_key() {
        let page = table().query(&query("#pk = :pk", &[book()]), None).unwrap();
        assert_eq!(codes(&page), vec!["1", "2", "3"]);
        assert_eq!(page.last_evaluated_key, None);
    }

    #[test]
    fn test_query_backwards() {
        let mut request = query("#pk = :pk", &[book()]);
        request.scan_index_forward = Some(false);
        let page = table().query(&request, None).unwrap();
        assert_eq!(codes(&page), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_query_sort_condition() {
        let request = query(
            "#pk = :pk and #sk >= :value",
            &[book(), (":value", WireValue::Number("2".into()))],
        );
        let page = table().query(&request, None).unwrap();
        assert_eq!(codes(&page), vec!["2", "3"]);
    }

    #[test]
    fn test_query_pages_with_limit_and_start_key() {
        let table = table();
        let mut request = query("#pk = :pk", &[book()]);
        request.limit = Some(2);

        let first = table.query(&request, None).unwrap();
        assert_eq!(codes(&first), vec!["1", "2"]);
        let marker = first.last_evaluated_key.clone().unwrap();
        assert_eq!(marker.len(), 2);

        request.exclusive_start_key = Some(marker);
        let second = table.query(&request, None).unwrap();
        assert_eq!(codes(&second), vec!["3"]);
        assert_eq!(second.last_evaluated_key, None);
    }

    #[test]
    fn test_page_size_caps_limit() {
        let page = table().query(&query("#pk = :pk", &[book()]), Some(1)).unwrap();
        assert_eq!(codes(&page), vec!["1"]);
        assert!(page.last_evaluated_key.is_some());
    }

    #[test]
    fn test_rejects_zero_limit() {
        let mut request = query("#pk = :pk", &[book()]);
        request.limit = Some(0);
        assert!(table().query(&request, None).is_err());
    }

    #[test]
    fn test_local_index_orders_and_projects_keys() {
        let mut request = query("#pk = :pk", &[book()]);
        request.index_name = Some("byPrice".to_string());
        let page = table().query(&request, None).unwrap();
        assert_eq!(codes(&page), vec!["2", "1", "3"]);
        assert!(page.items.iter().all(|item| item.len() == 3));
    }

    #[test]
    fn test_index_continuation_key_carries_table_key() {
        let mut request = query("#pk = :pk", &[book()]);
        request.index_name = Some("byPrice".to_string());
        request.limit = Some(1);
        let page = table().query(&request, None).unwrap();
        let marker = page.last_evaluated_key.unwrap();
        let mut names: Vec<_> = marker.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["code", "price", "type"]);
    }

    #[test]
    fn test_sparse_global_index() {
        let mut table = table();
        let mut named = product("book", 9, 90);
        named.insert("name".to_string(), WireValue::String("atlas".to_string()));
        table.put(named).unwrap();

        let request = ScanRequest {
            table_name: "products".to_string(),
            index_name: Some("byName".to_string()),
            ..Default::default()
        };
        let page = table.scan(&request, None).unwrap();
        assert_eq!(codes(&page), vec!["9"]);
    }

    #[test]
    fn test_put_rejects_null_index_key() {
        let mut table = table();
        let mut item = product("book", 9, 90);
        item.insert("name".to_string(), WireValue::Null);
        assert!(matches!(
            table.put(item),
            Err(BackendError::InvalidRequest(message)) if message.contains("byName")
        ));
        assert_eq!(table.items().count(), 4);
    }

    #[test]
    fn test_put_rejects_empty_and_duplicate_sets() {
        let mut table = table();
        let with = |value: WireValue| {
            let mut item = product("book", 9, 90);
            item.insert("labels".to_string(), value);
            item
        };

        assert!(table.put(with(WireValue::StringSet(vec![]))).is_err());
        assert!(table
            .put(with(WireValue::NumberSet(vec!["1".into(), "1".into()])))
            .is_err());
        assert!(table
            .put(with(WireValue::List(vec![WireValue::BinarySet(vec![])])))
            .is_err());
        assert_eq!(table.items().count(), 4);

        table
            .put(with(WireValue::StringSet(vec!["a".into(), "b".into()])))
            .unwrap();
        assert_eq!(table.items().count(), 5);
    }

    #[test]
    fn test_query_must_use_target_key() {
        let mut request = query("#pk = :pk", &[book()]);
        request.expression_attribute_names.insert("#pk".to_string(), "price".to_string());
        assert!(table().query(&request, None).is_err());
    }

    #[test]
    fn test_get_and_delete_need_exact_key() {
        let mut table = table();
        let key = Item::from([
            ("type".to_string(), WireValue::String("book".to_string())),
            ("code".to_string(), WireValue::Number("2".to_string())),
        ]);
        assert!(table.get(&key).unwrap().is_some());
        assert!(table.get(&product("book", 2, 5)).is_err());

        table.delete(&key).unwrap();
        assert!(table.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_describe_counts_down_pending_polls() {
        let schema = TableSchema::new(
            KeySpec::partition("type"),
            vec![Index::global("byName", KeySpec::partition("name"))],
            &Types,
        )
        .unwrap();
        let declaration = schema.declaration("products", Throughput::default());
        let mut table = Table::new(&declaration, 1).unwrap();

        let first = table.describe();
        assert_eq!(first.status, TableStatus::Creating);
        assert_eq!(
            first.index_statuses,
            vec![("byName".to_string(), IndexStatus::Creating)]
        );
        assert!(table.describe().is_ready());
    }
}
