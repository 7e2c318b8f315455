//! Key values and key-condition evaluation for the in-memory backend.

use std::cmp::Ordering;
use std::collections::HashMap;

use dynadao_core::key::SortCondition;
use dynadao_core::wire::{Item, WireValue};

use crate::backend::BackendError;

/// A key attribute value with the store's ordering: numbers numerically,
/// strings and binaries byte-wise.
#[derive(Debug, Clone)]
pub(super) enum KeyPart {
    Number(String),
    String(String),
    Binary(Vec<u8>),
}

impl KeyPart {
    pub(super) fn from_wire(value: &WireValue) -> Result<Self, BackendError> {
        match value {
            WireValue::String(s) => Ok(KeyPart::String(s.clone())),
            WireValue::Binary(b) => Ok(KeyPart::Binary(b.clone())),
            WireValue::Number(n) => {
                if n.parse::<f64>().map_or(true, |f| !f.is_finite()) {
                    return Err(BackendError::InvalidRequest(format!(
                        "Invalid number in key: {n}"
                    )));
                }
                Ok(KeyPart::Number(n.clone()))
            }
            other => Err(BackendError::InvalidRequest(format!(
                "Key attributes must be S, N or B, found {}",
                other.wire_type()
            ))),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            KeyPart::Number(_) => 0,
            KeyPart::String(_) => 1,
            KeyPart::Binary(_) => 2,
        }
    }

    fn starts_with(&self, prefix: &KeyPart) -> bool {
        match (self, prefix) {
            (KeyPart::String(s), KeyPart::String(p)) => s.starts_with(p.as_str()),
            (KeyPart::Binary(b), KeyPart::Binary(p)) => b.starts_with(p),
            _ => false,
        }
    }
}

/// Integers compare exactly; anything else falls back to `f64`.
fn compare_numbers(a: &str, b: &str) -> Ordering {
    if let (Ok(a), Ok(b)) = (a.parse::<i128>(), b.parse::<i128>()) {
        return a.cmp(&b);
    }
    let a = a.parse::<f64>().unwrap_or(f64::NAN);
    let b = b.parse::<f64>().unwrap_or(f64::NAN);
    a.total_cmp(&b)
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Number(a), KeyPart::Number(b)) => compare_numbers(a, b),
            (KeyPart::String(a), KeyPart::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (KeyPart::Binary(a), KeyPart::Binary(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for KeyPart {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyPart {}

/// A parsed `KeyConditionExpression`.
#[derive(Debug, Clone)]
pub(super) struct KeyConditionExpr {
    pub partition_name: String,
    pub partition: KeyPart,
    pub sort: Option<(String, SortCondition<KeyPart>)>,
}

impl KeyConditionExpr {
    /// Whether `item` satisfies the sort condition. The partition is matched
    /// by the caller.
    pub(super) fn matches_sort(&self, item: &Item) -> bool {
        let Some((name, condition)) = &self.sort else {
            return true;
        };
        let Some(value) = item.get(name).and_then(|v| KeyPart::from_wire(v).ok()) else {
            return false;
        };
        match condition {
            SortCondition::Eq(v) => value == *v,
            SortCondition::Lt(v) => value < *v,
            SortCondition::Le(v) => value <= *v,
            SortCondition::Gt(v) => value > *v,
            SortCondition::Ge(v) => value >= *v,
            SortCondition::Between(from, to) => *from <= value && value <= *to,
            SortCondition::BeginsWith(prefix) => value.starts_with(prefix),
        }
    }
}

fn invalid(message: impl Into<String>) -> BackendError {
    BackendError::InvalidRequest(message.into())
}

struct Parser<'a> {
    tokens: Vec<&'a str>,
    position: usize,
    names: &'a HashMap<String, String>,
    values: &'a Item,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Result<&'a str, BackendError> {
        let token = self
            .tokens
            .get(self.position)
            .copied()
            .ok_or_else(|| invalid("Unexpected end of key condition"))?;
        self.position += 1;
        Ok(token)
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), BackendError> {
        let token = self.next()?;
        if token.eq_ignore_ascii_case(keyword) {
            Ok(())
        } else {
            Err(invalid(format!("Expected '{keyword}', found '{token}'")))
        }
    }

    fn is_done(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn name(&self, token: &str) -> Result<String, BackendError> {
        if token.starts_with('#') {
            self.names
                .get(token)
                .cloned()
                .ok_or_else(|| invalid(format!("Unbound attribute name {token}")))
        } else {
            Ok(token.to_string())
        }
    }

    fn value(&self, token: &str) -> Result<KeyPart, BackendError> {
        let value = self
            .values
            .get(token)
            .ok_or_else(|| invalid(format!("Unbound attribute value {token}")))?;
        KeyPart::from_wire(value)
    }

    /// `name op value`, `name between a and b` or `begins_with(name, value)`.
    fn clause(&mut self) -> Result<(String, SortCondition<KeyPart>), BackendError> {
        let first = self.next()?;
        if let Some(rest) = first.strip_prefix("begins_with(") {
            let name = self.name(rest.trim_end_matches(','))?;
            let value = self.next()?.trim_end_matches(')');
            return Ok((name, SortCondition::BeginsWith(self.value(value)?)));
        }

        let name = self.name(first)?;
        let operator = self.next()?;
        if operator.eq_ignore_ascii_case("between") {
            let from = self.next()?;
            self.expect_keyword("and")?;
            let to = self.next()?;
            let range = SortCondition::Between(self.value(from)?, self.value(to)?);
            return Ok((name, range));
        }

        let value = self.next()?;
        let value = self.value(value)?;
        let condition = match operator {
            "=" => SortCondition::Eq(value),
            "<" => SortCondition::Lt(value),
            "<=" => SortCondition::Le(value),
            ">" => SortCondition::Gt(value),
            ">=" => SortCondition::Ge(value),
            other => return Err(invalid(format!("Unsupported operator '{other}'"))),
        };
        Ok((name, condition))
    }
}

/// Parses the key-condition grammar: a partition equality, optionally
/// followed by `and` and one sort-key clause.
pub(super) fn parse_key_condition(
    expression: &str,
    names: &HashMap<String, String>,
    values: &Item,
) -> Result<KeyConditionExpr, BackendError> {
    let mut parser = Parser {
        tokens: expression.split_whitespace().collect(),
        position: 0,
        names,
        values,
    };

    let (partition_name, partition) = match parser.clause()? {
        (name, SortCondition::Eq(value)) => (name, value),
        _ => return Err(invalid("Partition key condition must be an equality")),
    };

    let sort = if parser.is_done() {
        None
    } else {
        parser.expect_keyword("and")?;
        Some(parser.clause()?)
    };

    if !parser.is_done() {
        return Err(invalid("Key condition has trailing tokens"));
    }

    Ok(KeyConditionExpr {
        partition_name,
        partition,
        sort,
    })
}
