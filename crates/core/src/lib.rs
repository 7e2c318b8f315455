//! Functional core of the dynadao data-access layer.
//!
//! Everything in this crate is pure: wire values, field and record codecs,
//! key/index models and continuation tokens. Nothing here talks to a backend.

pub mod codec;
pub mod error;
pub mod key;
pub mod token;
pub mod wire;

pub use error::SchemaError;
