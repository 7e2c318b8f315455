use std::marker::PhantomData;

use super::{CodecError, FieldCodec};
use crate::wire::{WireType, WireValue};

/// A closed set of labelled values.
///
/// ```
/// use dynadao_core::codec::Enumerated;
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum Role {
///     Owner,
///     Reader,
/// }
///
/// impl Enumerated for Role {
///     fn variants() -> &'static [Self] {
///         &[Role::Owner, Role::Reader]
///     }
///
///     fn label(&self) -> &'static str {
///         match self {
///             Role::Owner => "owner",
///             Role::Reader => "reader",
///         }
///     }
/// }
/// ```
pub trait Enumerated: Sized + Clone + Send + Sync + 'static {
    fn variants() -> &'static [Self];

    fn label(&self) -> &'static str;
}

/// Enumerated values, stored as their label in the `S` variant.
#[derive(Debug, Clone, Copy)]
pub struct EnumCodec<E>(PhantomData<fn() -> E>);

impl<E: Enumerated> EnumCodec<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E: Enumerated> Default for EnumCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Enumerated> FieldCodec for EnumCodec<E> {
    type Value = E;

    fn wire_type(&self) -> WireType {
        WireType::String
    }

    fn serialize(&self, value: &E) -> Result<WireValue, CodecError> {
        Ok(WireValue::String(value.label().to_string()))
    }

    fn deserialize(&self, wire: &WireValue) -> Result<E, CodecError> {
        let WireValue::String(label) = wire else {
            return Err(CodecError::unexpected(WireType::String, wire));
        };
        E::variants()
            .iter()
            .find(|variant| variant.label() == label)
            .cloned()
            .ok_or_else(|| CodecError::UnknownLabel {
                label: label.clone(),
                expected: E::variants()
                    .iter()
                    .map(Enumerated::label)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Role {
        Owner,
        Writer,
        Reader,
    }

    impl Enumerated for Role {
        fn variants() -> &'static [Self] {
            &[Role::Owner, Role::Writer, Role::Reader]
        }

        fn label(&self) -> &'static str {
            match self {
                Role::Owner => "owner",
                Role::Writer => "writer",
                Role::Reader => "reader",
            }
        }
    }

    #[test]
    fn test_every_variant_round_trips() {
        let codec = EnumCodec::<Role>::new();
        for role in Role::variants() {
            let wire = codec.serialize(role).unwrap();
            assert_eq!(&codec.deserialize(&wire).unwrap(), role);
        }
    }

    #[test]
    fn test_stores_label() {
        let codec = EnumCodec::<Role>::new();
        assert_eq!(
            codec.serialize(&Role::Writer).unwrap(),
            WireValue::String("writer".to_string())
        );
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let codec = EnumCodec::<Role>::new();
        let err = codec
            .deserialize(&WireValue::String("admin".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownLabel {
                label: "admin".to_string(),
                expected: "owner, writer, reader".to_string(),
            }
        );
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        let codec = EnumCodec::<Role>::new();
        assert!(codec.deserialize(&WireValue::String("OWNER".into())).is_err());
    }
}
