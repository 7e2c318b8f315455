use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::{CodecError, FieldCodec, SerializationError};
use crate::error::SchemaError;
use crate::key::FieldTypes;
use crate::wire::{Item, WireType, WireValue};

// ============================================================================
// Type-erased field codecs
// ============================================================================

/// A field codec with its value type erased, so codecs for different value
/// types can live in one ordered registry and be shared with projections.
trait ErasedCodec: Send + Sync {
    fn wire_type(&self) -> WireType;

    fn decode(&self, wire: &WireValue) -> Result<Box<dyn Any + Send>, CodecError>;

    fn encode_any(&self, value: &dyn Any) -> Result<WireValue, CodecError>;
}

impl<C: FieldCodec> ErasedCodec for C {
    fn wire_type(&self) -> WireType {
        FieldCodec::wire_type(self)
    }

    fn decode(&self, wire: &WireValue) -> Result<Box<dyn Any + Send>, CodecError> {
        let value = self.deserialize(wire)?;
        Ok(Box::new(value))
    }

    fn encode_any(&self, value: &dyn Any) -> Result<WireValue, CodecError> {
        let value = value
            .downcast_ref::<C::Value>()
            .ok_or(CodecError::TypeMismatch {
                expected: type_name::<C::Value>(),
            })?;
        self.serialize(value)
    }
}

type Getter<T> = dyn Fn(&T) -> Result<WireValue, CodecError> + Send + Sync;
type Construct<T> = dyn Fn(&mut DecodedFields) -> Result<T, SerializationError> + Send + Sync;

struct Slot<T> {
    name: String,
    codec: Option<Arc<dyn ErasedCodec>>,
    encode: Option<Box<Getter<T>>>,
}

/// Decodes every coded field present in `item` into a [`DecodedFields`] bag.
///
/// Entries of `item` without a codec are ignored; coded fields missing from
/// `item` are left out of the bag.
fn decode_fields<'a>(
    fields: impl Iterator<Item = (&'a str, &'a Arc<dyn ErasedCodec>)>,
    item: &Item,
) -> Result<DecodedFields, SerializationError> {
    let mut decoded = DecodedFields::default();
    for (name, codec) in fields {
        let Some(wire) = item.get(name) else {
            continue;
        };
        let value = codec
            .decode(wire)
            .map_err(|source| SerializationError::new(name, source))?;
        decoded.values.insert(name.to_string(), value);
    }
    Ok(decoded)
}

// ============================================================================
// Decoded field bag
// ============================================================================

/// Decoded field values handed to a record's construction function.
///
/// Values are taken out by name; the requested type must match the value
/// type of the field's codec.
#[derive(Default)]
pub struct DecodedFields {
    values: HashMap<String, Box<dyn Any + Send>>,
}

impl DecodedFields {
    /// Takes a field that must be present.
    pub fn required<V: 'static>(&mut self, name: &str) -> Result<V, SerializationError> {
        self.optional(name)?
            .ok_or_else(|| SerializationError::new(name, CodecError::MissingField))
    }

    /// Takes a field that may be absent from the stored item.
    pub fn optional<V: 'static>(&mut self, name: &str) -> Result<Option<V>, SerializationError> {
        let Some(value) = self.values.remove(name) else {
            return Ok(None);
        };
        value.downcast::<V>().map(|v| Some(*v)).map_err(|_| {
            SerializationError::new(
                name,
                CodecError::TypeMismatch {
                    expected: type_name::<V>(),
                },
            )
        })
    }

    /// Takes a field coded by an [`OptionalCodec`], treating absence and
    /// `NULL` alike.
    ///
    /// [`OptionalCodec`]: super::OptionalCodec
    pub fn nullable<V: 'static>(&mut self, name: &str) -> Result<Option<V>, SerializationError> {
        Ok(self.optional::<Option<V>>(name)?.flatten())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Names of the fields that were decoded and not yet taken.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for DecodedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("DecodedFields")
            .field("names", &names)
            .finish()
    }
}

// ============================================================================
// Decoding and encoding seams
// ============================================================================

/// Anything that can turn a stored item into a typed record.
pub trait RecordDecoder<T>: Send + Sync {
    fn decode_item(&self, item: &Item) -> Result<T, SerializationError>;
}

/// Encodes standalone field values (keys, sort-key bounds) through the
/// codec registered for that field.
pub trait ValueEncoder: FieldTypes + Send + Sync {
    fn encode_value(&self, field: &str, value: &dyn Any) -> Result<WireValue, SerializationError>;
}

// ============================================================================
// Record codec
// ============================================================================

struct Inner<T> {
    slots: Vec<Slot<T>>,
    construct: Box<Construct<T>>,
}

/// An ordered, immutable mapping from field name to field codec for `T`.
///
/// Cloning is cheap and clones share the same registry.
///
/// ```
/// use dynadao_core::codec::{NumberCodec, RecordCodec, StringCodec};
///
/// #[derive(Debug, PartialEq)]
/// struct Product {
///     kind: String,
///     code: i64,
/// }
///
/// let codec = RecordCodec::builder()
///     .field("type", StringCodec, |p: &Product| p.kind.clone())
///     .field("code", NumberCodec::<i64>::new(), |p: &Product| p.code)
///     .build(|f| {
///         Ok(Product {
///             kind: f.required("type")?,
///             code: f.required("code")?,
///         })
///     })
///     .unwrap();
///
/// let product = Product { kind: "book".into(), code: 7 };
/// let item = codec.serialize(&product).unwrap();
/// assert_eq!(codec.deserialize(&item).unwrap(), product);
/// ```
pub struct RecordCodec<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for RecordCodec<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for RecordCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCodec")
            .field("fields", &self.field_names().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: 'static> RecordCodec<T> {
    pub fn builder() -> RecordCodecBuilder<T> {
        RecordCodecBuilder { slots: Vec::new() }
    }

    /// Serializes every coded field of `record`. Unmapped fields are omitted.
    pub fn serialize(&self, record: &T) -> Result<Item, SerializationError> {
        let mut item = Item::with_capacity(self.inner.slots.len());
        for slot in &self.inner.slots {
            let Some(encode) = &slot.encode else {
                continue;
            };
            let value =
                encode(record).map_err(|source| SerializationError::new(&slot.name, source))?;
            item.insert(slot.name.clone(), value);
        }
        Ok(item)
    }

    /// Serializes `record` as a map-variant wire value.
    pub fn to_wire(&self, record: &T) -> Result<WireValue, SerializationError> {
        self.serialize(record).map(WireValue::Map)
    }

    pub fn deserialize(&self, item: &Item) -> Result<T, SerializationError> {
        let mut fields = decode_fields(self.coded_fields(), item)?;
        (self.inner.construct)(&mut fields)
    }

    /// Deserializes a map-variant wire value.
    pub fn from_wire(&self, wire: &WireValue) -> Result<T, SerializationError> {
        match wire {
            WireValue::Map(item) => self.deserialize(item),
            other => Err(SerializationError::new(
                "",
                CodecError::unexpected(WireType::Map, other),
            )),
        }
    }

    /// Derives a decode view restricted to `names`.
    ///
    /// The view reuses this codec's field codecs; `construct` assembles the
    /// narrowed record type from the decoded subset. Unmapped names are
    /// accepted and contribute nothing.
    pub fn project<P, F>(&self, names: &[&str], construct: F) -> Result<RecordView<P>, SchemaError>
    where
        F: Fn(&mut DecodedFields) -> Result<P, SerializationError> + Send + Sync + 'static,
    {
        let mut fields = Vec::with_capacity(names.len());
        let mut seen = HashSet::new();
        for name in names {
            let slot = self
                .slot(name)
                .ok_or_else(|| SchemaError::UnknownField(name.to_string()))?;
            if !seen.insert(*name) {
                continue;
            }
            if let Some(codec) = &slot.codec {
                fields.push((slot.name.clone(), Arc::clone(codec)));
            }
        }
        Ok(RecordView {
            inner: Arc::new(ViewInner {
                fields,
                construct: Box::new(construct),
            }),
        })
    }
}

impl<T> RecordCodec<T> {
    /// All registered field names in registration order, unmapped ones included.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.inner.slots.iter().map(|slot| slot.name.as_str())
    }

    /// The wire type of a coded field, or `None` when the field is unknown
    /// or unmapped.
    pub fn type_of(&self, name: &str) -> Option<WireType> {
        self.slot(name)?.codec.as_ref().map(|codec| codec.wire_type())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    fn slot(&self, name: &str) -> Option<&Slot<T>> {
        self.inner.slots.iter().find(|slot| slot.name == name)
    }

    fn coded_fields(&self) -> impl Iterator<Item = (&str, &Arc<dyn ErasedCodec>)> {
        self.inner
            .slots
            .iter()
            .filter_map(|slot| slot.codec.as_ref().map(|codec| (slot.name.as_str(), codec)))
    }
}

impl<T> FieldTypes for RecordCodec<T> {
    fn type_of(&self, field: &str) -> Option<WireType> {
        RecordCodec::type_of(self, field)
    }
}

impl<T> ValueEncoder for RecordCodec<T> {
    fn encode_value(&self, field: &str, value: &dyn Any) -> Result<WireValue, SerializationError> {
        let codec = self
            .slot(field)
            .and_then(|slot| slot.codec.as_ref())
            .ok_or_else(|| SerializationError::new(field, CodecError::Unmapped))?;
        codec
            .encode_any(value)
            .map_err(|source| SerializationError::new(field, source))
    }
}

impl<T: 'static> RecordDecoder<T> for RecordCodec<T> {
    fn decode_item(&self, item: &Item) -> Result<T, SerializationError> {
        self.deserialize(item)
    }
}

/// A record codec nests as a field codec, storing the record as `M`.
impl<T: Send + 'static> FieldCodec for RecordCodec<T> {
    type Value = T;

    fn wire_type(&self) -> WireType {
        WireType::Map
    }

    fn serialize(&self, value: &T) -> Result<WireValue, CodecError> {
        self.to_wire(value)
            .map_err(|e| CodecError::Nested(Box::new(e)))
    }

    fn deserialize(&self, wire: &WireValue) -> Result<T, CodecError> {
        let WireValue::Map(item) = wire else {
            return Err(CodecError::unexpected(WireType::Map, wire));
        };
        RecordCodec::deserialize(self, item).map_err(|e| CodecError::Nested(Box::new(e)))
    }
}

/// Registers fields for a [`RecordCodec`].
pub struct RecordCodecBuilder<T> {
    slots: Vec<Slot<T>>,
}

impl<T: 'static> RecordCodecBuilder<T> {
    /// Registers a coded field. The getter's return type must match the
    /// codec's value type.
    pub fn field<C, G>(mut self, name: impl Into<String>, codec: C, get: G) -> Self
    where
        C: FieldCodec,
        G: Fn(&T) -> C::Value + Send + Sync + 'static,
    {
        let codec = Arc::new(codec);
        let encoder = Arc::clone(&codec);
        self.slots.push(Slot {
            name: name.into(),
            codec: Some(codec),
            encode: Some(Box::new(move |record: &T| encoder.serialize(&get(record)))),
        });
        self
    }

    /// Registers a field that is intentionally not stored. It is dropped on
    /// serialize and absent on deserialize.
    pub fn unmapped(mut self, name: impl Into<String>) -> Self {
        self.slots.push(Slot {
            name: name.into(),
            codec: None,
            encode: None,
        });
        self
    }

    /// Finishes the codec. `construct` assembles `T` from the decoded fields
    /// and is the place for validation and derived values.
    pub fn build<F>(self, construct: F) -> Result<RecordCodec<T>, SchemaError>
    where
        F: Fn(&mut DecodedFields) -> Result<T, SerializationError> + Send + Sync + 'static,
    {
        let mut seen = HashSet::new();
        for slot in &self.slots {
            if !seen.insert(slot.name.as_str()) {
                return Err(SchemaError::DuplicateField(slot.name.clone()));
            }
        }
        Ok(RecordCodec {
            inner: Arc::new(Inner {
                slots: self.slots,
                construct: Box::new(construct),
            }),
        })
    }
}

// ============================================================================
// Projection view
// ============================================================================

struct ViewInner<P> {
    fields: Vec<(String, Arc<dyn ErasedCodec>)>,
    construct: Box<Construct<P>>,
}

/// A decode-only view over a subset of a [`RecordCodec`]'s fields.
///
/// Built by [`RecordCodec::project`]; used for secondary indexes that only
/// carry some attributes.
pub struct RecordView<P> {
    inner: Arc<ViewInner<P>>,
}

impl<P> Clone for RecordView<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> fmt::Debug for RecordView<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordView")
            .field("fields", &self.field_names().collect::<Vec<_>>())
            .finish()
    }
}

impl<P> RecordView<P> {
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.inner.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn type_of(&self, name: &str) -> Option<WireType> {
        self.inner
            .fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, codec)| codec.wire_type())
    }

    pub fn deserialize(&self, item: &Item) -> Result<P, SerializationError> {
        let fields = self
            .inner
            .fields
            .iter()
            .map(|(name, codec)| (name.as_str(), codec));
        let mut decoded = decode_fields(fields, item)?;
        (self.inner.construct)(&mut decoded)
    }
}

impl<P> RecordDecoder<P> for RecordView<P> {
    fn decode_item(&self, item: &Item) -> Result<P, SerializationError> {
        self.deserialize(item)
    }
}
