use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use super::CodecError;
use crate::wire::{WireType, WireValue};

/// Converts one typed value to and from one wire variant.
///
/// Implementations are pure. `deserialize` must be the left inverse of
/// `serialize`: `deserialize(serialize(v)) == v` for every `v` in the
/// codec's domain.
pub trait FieldCodec: Send + Sync + 'static {
    type Value: Send + 'static;

    /// The wire variant this codec produces.
    fn wire_type(&self) -> WireType;

    fn serialize(&self, value: &Self::Value) -> Result<WireValue, CodecError>;

    fn deserialize(&self, wire: &WireValue) -> Result<Self::Value, CodecError>;
}

/// Plain strings, stored as the `S` variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl FieldCodec for StringCodec {
    type Value = String;

    fn wire_type(&self) -> WireType {
        WireType::String
    }

    fn serialize(&self, value: &String) -> Result<WireValue, CodecError> {
        Ok(WireValue::String(value.clone()))
    }

    fn deserialize(&self, wire: &WireValue) -> Result<String, CodecError> {
        match wire {
            WireValue::String(s) => Ok(s.clone()),
            other => Err(CodecError::unexpected(WireType::String, other)),
        }
    }
}

/// Numeric types that round-trip through decimal text.
pub trait Numeric: Copy + Display + FromStr + Send + Sync + 'static {
    /// `false` for values without a decimal representation (NaN, infinities).
    fn is_finite(&self) -> bool {
        true
    }
}

macro_rules! impl_numeric {
    ($($t:ty),*) => {
        $(impl Numeric for $t {})*
    };
}

impl_numeric!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Numeric for f32 {
    fn is_finite(&self) -> bool {
        f32::is_finite(*self)
    }
}

impl Numeric for f64 {
    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

/// Parses decimal text into `N`, rejecting anything that is not a finite number.
pub(crate) fn parse_number<N: Numeric>(text: &str) -> Result<N, CodecError> {
    let value: N = text
        .parse()
        .map_err(|_| CodecError::InvalidNumber(text.to_string()))?;
    // `f64::from_str` accepts "NaN" and "inf", the backend does not.
    if !value.is_finite() {
        return Err(CodecError::InvalidNumber(text.to_string()));
    }
    Ok(value)
}

pub(crate) fn format_number<N: Numeric>(value: N) -> Result<String, CodecError> {
    if !value.is_finite() {
        return Err(CodecError::NonFinite(value.to_string()));
    }
    Ok(value.to_string())
}

/// Numbers, stored as the `N` variant holding decimal text.
#[derive(Debug, Clone, Copy)]
pub struct NumberCodec<N>(PhantomData<fn() -> N>);

impl<N: Numeric> NumberCodec<N> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<N: Numeric> Default for NumberCodec<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Numeric> FieldCodec for NumberCodec<N> {
    type Value = N;

    fn wire_type(&self) -> WireType {
        WireType::Number
    }

    fn serialize(&self, value: &N) -> Result<WireValue, CodecError> {
        format_number(*value).map(WireValue::Number)
    }

    fn deserialize(&self, wire: &WireValue) -> Result<N, CodecError> {
        match wire {
            WireValue::Number(text) => parse_number(text),
            other => Err(CodecError::unexpected(WireType::Number, other)),
        }
    }
}

/// Booleans, stored as the `BOOL` variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl FieldCodec for BoolCodec {
    type Value = bool;

    fn wire_type(&self) -> WireType {
        WireType::Boolean
    }

    fn serialize(&self, value: &bool) -> Result<WireValue, CodecError> {
        Ok(WireValue::Boolean(*value))
    }

    fn deserialize(&self, wire: &WireValue) -> Result<bool, CodecError> {
        match wire {
            WireValue::Boolean(b) => Ok(*b),
            other => Err(CodecError::unexpected(WireType::Boolean, other)),
        }
    }
}

/// Raw bytes, stored as an `S` value of lowercase hex digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl FieldCodec for BinaryCodec {
    type Value = Vec<u8>;

    fn wire_type(&self) -> WireType {
        WireType::String
    }

    fn serialize(&self, value: &Vec<u8>) -> Result<WireValue, CodecError> {
        Ok(WireValue::String(hex::encode(value)))
    }

    fn deserialize(&self, wire: &WireValue) -> Result<Vec<u8>, CodecError> {
        match wire {
            WireValue::String(s) => {
                hex::decode(s).map_err(|_| CodecError::InvalidHex(s.clone()))
            }
            other => Err(CodecError::unexpected(WireType::String, other)),
        }
    }
}
