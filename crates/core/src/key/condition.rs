use std::collections::HashMap;

use super::KeySpec;
use crate::error::SchemaError;
use crate::wire::{Item, WireType, WireValue};

pub const PARTITION_NAME: &str = "#pk";
pub const SORT_NAME: &str = "#sk";
pub const PARTITION_VALUE: &str = ":pk";
pub const SORT_VALUE: &str = ":value";
pub const RANGE_FROM: &str = ":from";
pub const RANGE_TO: &str = ":to";

/// Placeholders used by rendered key conditions.
///
/// Request hooks that add filter expressions must pick other names, or they
/// will overwrite the key condition's bindings.
pub const RESERVED_PLACEHOLDERS: [&str; 6] = [
    PARTITION_NAME,
    SORT_NAME,
    PARTITION_VALUE,
    SORT_VALUE,
    RANGE_FROM,
    RANGE_TO,
];

/// A condition on the sort key of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SortCondition<V> {
    Eq(V),
    Lt(V),
    Le(V),
    Gt(V),
    Ge(V),
    /// Inclusive on both ends.
    Between(V, V),
    /// String sort keys only.
    BeginsWith(V),
}

impl<V> SortCondition<V> {
    /// Converts the bound values, keeping the comparison.
    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(V) -> Result<U, E>,
    ) -> Result<SortCondition<U>, E> {
        Ok(match self {
            SortCondition::Eq(v) => SortCondition::Eq(f(v)?),
            SortCondition::Lt(v) => SortCondition::Lt(f(v)?),
            SortCondition::Le(v) => SortCondition::Le(f(v)?),
            SortCondition::Gt(v) => SortCondition::Gt(f(v)?),
            SortCondition::Ge(v) => SortCondition::Ge(f(v)?),
            SortCondition::Between(from, to) => SortCondition::Between(f(from)?, f(to)?),
            SortCondition::BeginsWith(v) => SortCondition::BeginsWith(f(v)?),
        })
    }
}

/// A rendered `KeyConditionExpression` with its name and value bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: Item,
}

/// Renders the key condition for `key`, with the partition bound to
/// `partition` and an optional sort condition.
pub fn render_key_condition(
    key: &KeySpec,
    partition: WireValue,
    sort: Option<SortCondition<WireValue>>,
) -> Result<KeyCondition, SchemaError> {
    let mut expression = format!("{PARTITION_NAME} = {PARTITION_VALUE}");
    let mut names = HashMap::from([(
        PARTITION_NAME.to_string(),
        key.partition_key().to_string(),
    )]);
    let mut values = Item::from([(PARTITION_VALUE.to_string(), partition)]);

    let Some(condition) = sort else {
        return Ok(KeyCondition {
            expression,
            names,
            values,
        });
    };

    let sort_key = key
        .sort_key()
        .ok_or_else(|| SchemaError::MissingSortKey(key.partition_key().to_string()))?;
    names.insert(SORT_NAME.to_string(), sort_key.to_string());

    let clause = match condition {
        SortCondition::Eq(v) => compare("=", v, &mut values),
        SortCondition::Lt(v) => compare("<", v, &mut values),
        SortCondition::Le(v) => compare("<=", v, &mut values),
        SortCondition::Gt(v) => compare(">", v, &mut values),
        SortCondition::Ge(v) => compare(">=", v, &mut values),
        SortCondition::Between(from, to) => {
            values.insert(RANGE_FROM.to_string(), from);
            values.insert(RANGE_TO.to_string(), to);
            format!("{SORT_NAME} between {RANGE_FROM} and {RANGE_TO}")
        }
        SortCondition::BeginsWith(v) => {
            let found = v.wire_type();
            if found != WireType::String {
                return Err(SchemaError::BeginsWithRequiresString(found));
            }
            values.insert(SORT_VALUE.to_string(), v);
            format!("begins_with({SORT_NAME}, {SORT_VALUE})")
        }
    };
    expression.push_str(" and ");
    expression.push_str(&clause);

    Ok(KeyCondition {
        expression,
        names,
        values,
    })
}

fn compare(operator: &str, value: WireValue, values: &mut Item) -> String {
    values.insert(SORT_VALUE.to_string(), value);
    format!("{SORT_NAME} {operator} {SORT_VALUE}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(text: &str) -> WireValue {
        WireValue::Number(text.to_string())
    }

    fn s(text: &str) -> WireValue {
        WireValue::String(text.to_string())
    }

    #[test]
    fn test_partition_only() {
        let key = KeySpec::composite("type", "code");
        let condition = render_key_condition(&key, s("book"), None).unwrap();
        assert_eq!(condition.expression, "#pk = :pk");
        assert_eq!(
            condition.names,
            HashMap::from([("#pk".to_string(), "type".to_string())])
        );
        assert_eq!(condition.values, Item::from([(":pk".to_string(), s("book"))]));
    }

    #[test]
    fn test_less_than() {
        let key = KeySpec::composite("type", "code");
        let condition =
            render_key_condition(&key, s("book"), Some(SortCondition::Lt(n("0")))).unwrap();
        assert_eq!(condition.expression, "#pk = :pk and #sk < :value");
        assert_eq!(condition.names["#sk"], "code");
        assert_eq!(condition.values[":value"], n("0"));
    }

    #[test]
    fn test_every_comparison_operator() {
        let key = KeySpec::composite("type", "code");
        let cases = [
            (SortCondition::Eq(n("1")), "#pk = :pk and #sk = :value"),
            (SortCondition::Le(n("1")), "#pk = :pk and #sk <= :value"),
            (SortCondition::Gt(n("1")), "#pk = :pk and #sk > :value"),
            (SortCondition::Ge(n("1")), "#pk = :pk and #sk >= :value"),
        ];
        for (sort, expected) in cases {
            let condition = render_key_condition(&key, s("a"), Some(sort)).unwrap();
            assert_eq!(condition.expression, expected);
        }
    }

    #[test]
    fn test_between() {
        let key = KeySpec::composite("type", "price");
        let condition = render_key_condition(
            &key,
            s("book"),
            Some(SortCondition::Between(n("5"), n("10"))),
        )
        .unwrap();
        assert_eq!(condition.expression, "#pk = :pk and #sk between :from and :to");
        assert_eq!(condition.names["#sk"], "price");
        assert_eq!(condition.values[":from"], n("5"));
        assert_eq!(condition.values[":to"], n("10"));
        assert!(!condition.values.contains_key(":value"));
    }

    #[test]
    fn test_begins_with() {
        let key = KeySpec::composite("type", "name");
        let condition =
            render_key_condition(&key, s("book"), Some(SortCondition::BeginsWith(s("The"))))
                .unwrap();
        assert_eq!(
            condition.expression,
            "#pk = :pk and begins_with(#sk, :value)"
        );
    }

    #[test]
    fn test_begins_with_rejects_numbers() {
        let key = KeySpec::composite("type", "code");
        let err = render_key_condition(&key, s("book"), Some(SortCondition::BeginsWith(n("1"))))
            .unwrap_err();
        assert_eq!(err, SchemaError::BeginsWithRequiresString(WireType::Number));
    }

    #[test]
    fn test_sort_condition_without_sort_key() {
        let key = KeySpec::partition("type");
        let err =
            render_key_condition(&key, s("book"), Some(SortCondition::Eq(n("1")))).unwrap_err();
        assert_eq!(err, SchemaError::MissingSortKey("type".to_string()));
    }

    #[test]
    fn test_try_map_keeps_comparison() {
        let mapped: Result<_, ()> = SortCondition::Between(5, 10).try_map(|v| Ok(v * 2));
        assert_eq!(mapped, Ok(SortCondition::Between(10, 20)));

        let failed: Result<SortCondition<i32>, &str> =
            SortCondition::Lt(1).try_map(|_| Err("nope"));
        assert_eq!(failed, Err("nope"));
    }

    #[test]
    fn test_reserved_placeholders_cover_rendered_names() {
        let key = KeySpec::composite("type", "price");
        let condition = render_key_condition(
            &key,
            s("book"),
            Some(SortCondition::Between(n("5"), n("10"))),
        )
        .unwrap();
        for name in condition.names.keys().chain(condition.values.keys()) {
            assert!(RESERVED_PLACEHOLDERS.contains(&name.as_str()));
        }
    }
}
