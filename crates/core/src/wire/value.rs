use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The entries of a map-variant wire value. Every stored record is one `Item`.
pub type Item = HashMap<String, WireValue>;

/// A single value as transmitted to and from the backend.
///
/// Numbers travel as decimal text so no precision is lost between the
/// application and the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireValue {
    #[serde(rename = "S")]
    String(String),
    #[serde(rename = "N")]
    Number(String),
    #[serde(rename = "BOOL")]
    Boolean(bool),
    #[serde(rename = "NULL")]
    Null,
    #[serde(rename = "B")]
    Binary(Vec<u8>),
    #[serde(rename = "L")]
    List(Vec<WireValue>),
    #[serde(rename = "M")]
    Map(Item),
    #[serde(rename = "SS")]
    StringSet(Vec<String>),
    #[serde(rename = "NS")]
    NumberSet(Vec<String>),
    #[serde(rename = "BS")]
    BinarySet(Vec<Vec<u8>>),
}

/// The variant tag of a [`WireValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    String,
    Number,
    Boolean,
    Null,
    Binary,
    List,
    Map,
    StringSet,
    NumberSet,
    BinarySet,
}

impl WireType {
    /// The backend's short name for this variant (`S`, `N`, `BOOL`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            WireType::String => "S",
            WireType::Number => "N",
            WireType::Boolean => "BOOL",
            WireType::Null => "NULL",
            WireType::Binary => "B",
            WireType::List => "L",
            WireType::Map => "M",
            WireType::StringSet => "SS",
            WireType::NumberSet => "NS",
            WireType::BinarySet => "BS",
        }
    }

    /// Whether values of this type can be used as a partition or sort key.
    pub fn is_key_type(&self) -> bool {
        matches!(self, WireType::String | WireType::Number)
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WireValue {
    pub fn wire_type(&self) -> WireType {
        match self {
            WireValue::String(_) => WireType::String,
            WireValue::Number(_) => WireType::Number,
            WireValue::Boolean(_) => WireType::Boolean,
            WireValue::Null => WireType::Null,
            WireValue::Binary(_) => WireType::Binary,
            WireValue::List(_) => WireType::List,
            WireValue::Map(_) => WireType::Map,
            WireValue::StringSet(_) => WireType::StringSet,
            WireValue::NumberSet(_) => WireType::NumberSet,
            WireValue::BinarySet(_) => WireType::BinarySet,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            WireValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the decimal text of a number value.
    pub fn as_number(&self) -> Option<&str> {
        match self {
            WireValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Item> {
        match self {
            WireValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_type_of_each_variant() {
        assert_eq!(WireValue::String("a".into()).wire_type(), WireType::String);
        assert_eq!(WireValue::Number("1".into()).wire_type(), WireType::Number);
        assert_eq!(WireValue::Boolean(true).wire_type(), WireType::Boolean);
        assert_eq!(WireValue::Null.wire_type(), WireType::Null);
        assert_eq!(WireValue::Binary(vec![1]).wire_type(), WireType::Binary);
        assert_eq!(WireValue::List(vec![]).wire_type(), WireType::List);
        assert_eq!(WireValue::Map(Item::new()).wire_type(), WireType::Map);
        assert_eq!(WireValue::StringSet(vec![]).wire_type(), WireType::StringSet);
        assert_eq!(WireValue::NumberSet(vec![]).wire_type(), WireType::NumberSet);
        assert_eq!(WireValue::BinarySet(vec![]).wire_type(), WireType::BinarySet);
    }

    #[test]
    fn test_only_string_and_number_are_key_types() {
        assert!(WireType::String.is_key_type());
        assert!(WireType::Number.is_key_type());
        assert!(!WireType::Binary.is_key_type());
        assert!(!WireType::Boolean.is_key_type());
        assert!(!WireType::Map.is_key_type());
    }

    #[test]
    fn test_display_uses_backend_names() {
        assert_eq!(WireType::String.to_string(), "S");
        assert_eq!(WireType::Boolean.to_string(), "BOOL");
        assert_eq!(WireType::NumberSet.to_string(), "NS");
    }

    #[test]
    fn test_serde_uses_backend_tags() {
        let value = WireValue::Number("42".to_string());
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"N":"42"}"#);

        let parsed: WireValue = serde_json::from_str(r#"{"S":"hello"}"#).unwrap();
        assert_eq!(parsed, WireValue::String("hello".to_string()));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(WireValue::String("x".into()).as_string(), Some("x"));
        assert_eq!(WireValue::Number("1.5".into()).as_number(), Some("1.5"));
        assert!(WireValue::Number("1".into()).as_string().is_none());
        assert!(WireValue::Null.is_null());
        assert!(WireValue::Map(Item::new()).as_map().is_some());
    }
}
