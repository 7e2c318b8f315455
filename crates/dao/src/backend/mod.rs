//! Storage backends.
//!
//! The [`Backend`] trait is the whole contract between the DAO engines and a
//! store. Request and response types mirror the DynamoDB wire protocol,
//! field for field, so a backend is a thin mapping onto its client.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): [`MemoryBackend`], a local emulation for tests
//!   and development
//! - `dynamodb`: [`DynamoDbBackend`], backed by `aws-sdk-dynamodb`

use std::collections::HashMap;

use async_trait::async_trait;

use dynadao_core::key::TableDeclaration;
use dynadao_core::wire::Item;

mod error;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "inmemory")]
pub mod inmemory;

pub use error::BackendError;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbBackend;

#[cfg(feature = "inmemory")]
pub use inmemory::MemoryBackend;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub table_name: String,
    pub index_name: Option<String>,
    pub key_condition_expression: String,
    pub filter_expression: Option<String>,
    pub expression_attribute_names: HashMap<String, String>,
    pub expression_attribute_values: Item,
    pub exclusive_start_key: Option<Item>,
    pub limit: Option<i32>,
    pub scan_index_forward: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanRequest {
    pub table_name: String,
    pub index_name: Option<String>,
    pub filter_expression: Option<String>,
    pub expression_attribute_names: HashMap<String, String>,
    pub expression_attribute_values: Item,
    pub exclusive_start_key: Option<Item>,
    pub limit: Option<i32>,
}

/// One page of a query or scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResponse {
    pub items: Vec<Item>,
    /// Present when the read stopped before exhausting its range.
    pub last_evaluated_key: Option<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PutRequest {
    pub item: Item,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteRequest {
    pub request_items: HashMap<String, Vec<PutRequest>>,
}

impl BatchWriteRequest {
    /// A batch of puts against a single table.
    pub fn put(table_name: impl Into<String>, items: Vec<Item>) -> Self {
        let puts = items.into_iter().map(|item| PutRequest { item }).collect();
        Self {
            request_items: HashMap::from([(table_name.into(), puts)]),
        }
    }

    pub fn len(&self) -> usize {
        self.request_items.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteResponse {
    pub unprocessed: HashMap<String, Vec<PutRequest>>,
}

impl BatchWriteResponse {
    pub fn unprocessed_count(&self) -> usize {
        self.unprocessed.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetItemRequest {
    pub table_name: String,
    pub key: Item,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteItemRequest {
    pub table_name: String,
    pub key: Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Updating,
    Deleting,
    Active,
    Archiving,
    Archived,
    InaccessibleEncryptionCredentials,
    /// Missing, or a status this crate does not know.
    Unknown,
}

impl TableStatus {
    /// `true` for states a table does not leave without operator action.
    pub fn is_unusable(&self) -> bool {
        matches!(
            self,
            TableStatus::Archiving
                | TableStatus::Archived
                | TableStatus::InaccessibleEncryptionCredentials
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Creating,
    Updating,
    Deleting,
    Active,
    /// Missing, or a status this crate does not know.
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDescription {
    pub table_name: String,
    pub status: TableStatus,
    /// Status of each global index. Local indexes share the table's status.
    pub index_statuses: Vec<(String, IndexStatus)>,
}

impl TableDescription {
    /// `true` once the table and all of its indexes are active.
    pub fn is_ready(&self) -> bool {
        self.status == TableStatus::Active
            && self
                .index_statuses
                .iter()
                .all(|(_, status)| *status == IndexStatus::Active)
    }
}

/// A store speaking the DynamoDB wire contract.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Reads one page of items matching a key condition.
    async fn query(&self, request: QueryRequest) -> Result<PageResponse, BackendError>;

    /// Reads one page of a full table or index scan.
    async fn scan(&self, request: ScanRequest) -> Result<PageResponse, BackendError>;

    /// Writes up to 25 items. Items the store could not accept are returned
    /// in the response rather than failing the call.
    async fn batch_write(
        &self,
        request: BatchWriteRequest,
    ) -> Result<BatchWriteResponse, BackendError>;

    /// Returns `None` when no item has the given key.
    async fn get_item(&self, request: GetItemRequest) -> Result<Option<Item>, BackendError>;

    async fn delete_item(&self, request: DeleteItemRequest) -> Result<(), BackendError>;

    /// Fails with [`BackendError::ResourceNotFound`] when the table does not exist.
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, BackendError>;

    async fn create_table(&self, declaration: &TableDeclaration) -> Result<(), BackendError>;
}
