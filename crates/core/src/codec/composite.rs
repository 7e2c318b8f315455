use std::collections::BTreeSet;
use std::marker::PhantomData;

use super::field::{format_number, parse_number};
use super::{CodecError, FieldCodec, Numeric};
use crate::wire::{WireType, WireValue};

/// Element-wise list of values coded by an inner codec, stored as `L`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListCodec<C>(C);

impl<C: FieldCodec> ListCodec<C> {
    pub fn new(inner: C) -> Self {
        Self(inner)
    }
}

impl<C: FieldCodec> FieldCodec for ListCodec<C> {
    type Value = Vec<C::Value>;

    fn wire_type(&self) -> WireType {
        WireType::List
    }

    fn serialize(&self, value: &Self::Value) -> Result<WireValue, CodecError> {
        value
            .iter()
            .enumerate()
            .map(|(index, element)| {
                self.0.serialize(element).map_err(|e| CodecError::Element {
                    index,
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(WireValue::List)
    }

    fn deserialize(&self, wire: &WireValue) -> Result<Self::Value, CodecError> {
        let WireValue::List(elements) = wire else {
            return Err(CodecError::unexpected(WireType::List, wire));
        };
        elements
            .iter()
            .enumerate()
            .map(|(index, element)| {
                self.0.deserialize(element).map_err(|e| CodecError::Element {
                    index,
                    source: Box::new(e),
                })
            })
            .collect()
    }
}

/// Wraps an inner codec so that `None` is stored as the `NULL` variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalCodec<C>(C);

impl<C: FieldCodec> OptionalCodec<C> {
    pub fn new(inner: C) -> Self {
        Self(inner)
    }
}

impl<C: FieldCodec> FieldCodec for OptionalCodec<C> {
    type Value = Option<C::Value>;

    fn wire_type(&self) -> WireType {
        self.0.wire_type()
    }

    fn serialize(&self, value: &Self::Value) -> Result<WireValue, CodecError> {
        match value {
            Some(inner) => self.0.serialize(inner),
            None => Ok(WireValue::Null),
        }
    }

    fn deserialize(&self, wire: &WireValue) -> Result<Self::Value, CodecError> {
        match wire {
            WireValue::Null => Ok(None),
            other => self.0.deserialize(other).map(Some),
        }
    }
}

/// A set of unique strings, stored as `SS`.
///
/// The store has no empty sets, so an empty set is written as `NULL` and
/// `NULL` reads back as an empty set.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSetCodec;

impl FieldCodec for StringSetCodec {
    type Value = BTreeSet<String>;

    fn wire_type(&self) -> WireType {
        WireType::StringSet
    }

    fn serialize(&self, value: &Self::Value) -> Result<WireValue, CodecError> {
        if value.is_empty() {
            return Ok(WireValue::Null);
        }
        Ok(WireValue::StringSet(value.iter().cloned().collect()))
    }

    fn deserialize(&self, wire: &WireValue) -> Result<Self::Value, CodecError> {
        match wire {
            WireValue::Null => Ok(BTreeSet::new()),
            WireValue::StringSet(values) => Ok(values.iter().cloned().collect()),
            other => Err(CodecError::unexpected(WireType::StringSet, other)),
        }
    }
}

/// A set of numbers, stored as `NS`. Order is preserved as given.
///
/// Numbers that format to the same text are duplicates and fail to
/// serialize. An empty set is written as `NULL`.
#[derive(Debug, Clone, Copy)]
pub struct NumberSetCodec<N>(PhantomData<fn() -> N>);

impl<N: Numeric> NumberSetCodec<N> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<N: Numeric> Default for NumberSetCodec<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Numeric> FieldCodec for NumberSetCodec<N> {
    type Value = Vec<N>;

    fn wire_type(&self) -> WireType {
        WireType::NumberSet
    }

    fn serialize(&self, value: &Self::Value) -> Result<WireValue, CodecError> {
        if value.is_empty() {
            return Ok(WireValue::Null);
        }
        let mut seen = BTreeSet::new();
        let mut texts = Vec::with_capacity(value.len());
        for n in value {
            let text = format_number(*n)?;
            if !seen.insert(text.clone()) {
                return Err(CodecError::DuplicateSetElement(text));
            }
            texts.push(text);
        }
        Ok(WireValue::NumberSet(texts))
    }

    fn deserialize(&self, wire: &WireValue) -> Result<Self::Value, CodecError> {
        match wire {
            WireValue::Null => Ok(Vec::new()),
            WireValue::NumberSet(values) => values.iter().map(|text| parse_number(text)).collect(),
            other => Err(CodecError::unexpected(WireType::NumberSet, other)),
        }
    }
}
