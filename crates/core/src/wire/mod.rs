//! Tagged wire values exchanged with the storage backend.

mod value;

pub use value::{Item, WireType, WireValue};
