//! Bidirectional converters between typed values and [`WireValue`]s.
//!
//! A [`FieldCodec`] owns exactly one wire variant and converts one typed
//! value. A [`RecordCodec`] is an ordered, immutable collection of field
//! codecs for a structured type and converts whole records to and from
//! map-variant items.
//!
//! [`WireValue`]: crate::wire::WireValue

mod composite;
mod date;
mod enumerated;
mod error;
mod field;
mod record;

pub use composite::{ListCodec, NumberSetCodec, OptionalCodec, StringSetCodec};
pub use date::DateCodec;
pub use enumerated::{EnumCodec, Enumerated};
pub use error::{CodecError, SerializationError};
pub use field::{BinaryCodec, BoolCodec, FieldCodec, NumberCodec, Numeric, StringCodec};
pub use record::{
    DecodedFields, RecordCodec, RecordCodecBuilder, RecordDecoder, RecordView, ValueEncoder,
};
