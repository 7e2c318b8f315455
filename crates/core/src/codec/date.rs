use chrono::{DateTime, Utc};

use super::field::parse_number;
use super::{CodecError, FieldCodec};
use crate::wire::{WireType, WireValue};

/// Timestamps, stored as the `N` variant holding epoch milliseconds.
///
/// Sub-millisecond precision is not preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCodec;

impl FieldCodec for DateCodec {
    type Value = DateTime<Utc>;

    fn wire_type(&self) -> WireType {
        WireType::Number
    }

    fn serialize(&self, value: &DateTime<Utc>) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(value.timestamp_millis().to_string()))
    }

    fn deserialize(&self, wire: &WireValue) -> Result<DateTime<Utc>, CodecError> {
        let WireValue::Number(text) = wire else {
            return Err(CodecError::unexpected(WireType::Number, wire));
        };
        let millis: i64 = parse_number(text)?;
        DateTime::from_timestamp_millis(millis).ok_or(CodecError::DateOutOfRange(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_round_trip() {
        let date = DateTime::parse_from_rfc3339("2024-01-15T10:30:00.250Z")
            .unwrap()
            .with_timezone(&Utc);
        let wire = DateCodec.serialize(&date).unwrap();
        assert_eq!(DateCodec.deserialize(&wire).unwrap(), date);
    }

    #[test]
    fn test_date_is_epoch_millis() {
        let date = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(
            DateCodec.serialize(&date).unwrap(),
            WireValue::Number("1700000000123".to_string())
        );
    }

    #[test]
    fn test_dates_before_epoch() {
        let date = DateTime::from_timestamp_millis(-86_400_000).unwrap();
        let wire = DateCodec.serialize(&date).unwrap();
        assert_eq!(DateCodec.deserialize(&wire).unwrap(), date);
    }

    #[test]
    fn test_rejects_non_numeric_text() {
        assert!(matches!(
            DateCodec.deserialize(&WireValue::Number("yesterday".into())),
            Err(CodecError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let wire = WireValue::Number(i64::MAX.to_string());
        assert_eq!(
            DateCodec.deserialize(&wire).unwrap_err(),
            CodecError::DateOutOfRange(i64::MAX)
        );
    }
}
