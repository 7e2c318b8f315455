//! Typed DynamoDB data access.
//!
//! Records are mapped to items through a [`RecordCodec`](codec::RecordCodec)
//! and read or written through a [`Dao`]: lazily paginated scans and
//! queries, chunked batch writes, point reads and deletes, and table
//! provisioning from the declared key and indexes.
//!
//! The pure building blocks live in `dynadao_core` and are re-exported here
//! as [`codec`], [`key`], [`token`] and [`wire`].
//!
//! # Feature Flags
//!
//! - `inmemory` (default): [`MemoryBackend`]
//! - `dynamodb`: [`DynamoDbBackend`]

pub mod backend;
pub mod config;
mod dao;
pub mod error;

#[cfg(all(test, feature = "inmemory"))]
mod test_support;

pub use dynadao_core::{codec, key, token, wire};

pub use backend::{Backend, BackendError};
pub use config::Config;
pub use dao::{
    Dao, DaoBuilder, Key, QueryHook, QueryOptions, ReadOptions, Reader, RecordStream,
    RequestHook, ScanHook, ScanOptions, BATCH_WRITE_LIMIT,
};
pub use error::{DaoError, Result};

#[cfg(feature = "dynamodb")]
pub use backend::DynamoDbBackend;

#[cfg(feature = "inmemory")]
pub use backend::MemoryBackend;
