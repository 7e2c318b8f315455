//! In-memory backend implementation.
//!
//! Emulates the parts of the DynamoDB contract the DAO relies on: key
//! schemas, sort-key ordering, key conditions, `Limit` and continuation
//! keys, local and global index projections, and the 25-item batch limit.
//! Filter expressions are not evaluated.

mod condition;
mod table;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use dynadao_core::key::TableDeclaration;
use dynadao_core::wire::Item;

use super::{
    Backend, BackendError, BatchWriteRequest, BatchWriteResponse, DeleteItemRequest,
    GetItemRequest, PageResponse, QueryRequest, ScanRequest, TableDescription, TableStatus,
};
use table::Table;

/// Maximum number of puts in one batch write.
const MAX_BATCH_ITEMS: usize = 25;

/// A request received by a [`MemoryBackend`], kept for inspection in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Query(QueryRequest),
    Scan(ScanRequest),
    BatchWrite(BatchWriteRequest),
    GetItem(GetItemRequest),
    DeleteItem(DeleteItemRequest),
    DescribeTable(String),
    CreateTable(String),
}

/// In-memory storage backend for testing.
///
/// Uses maps wrapped in `Arc<RwLock<_>>` for thread-safe access; clones
/// share the same tables. Data is not persisted and will be lost when the
/// last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    operations: Arc<RwLock<Vec<Operation>>>,
    batches: Arc<AtomicUsize>,
    page_size: Option<usize>,
    activation_polls: u32,
    failing_batch: Option<usize>,
    throttled_batch: Option<usize>,
}

impl MemoryBackend {
    /// Creates a new backend without tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps every page at `size` items, regardless of the request's `Limit`.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Created tables report `CREATING` for this many describe calls.
    pub fn with_activation_delay(mut self, polls: u32) -> Self {
        self.activation_polls = polls;
        self
    }

    /// The `n`th batch write (1-based) fails with a service error.
    pub fn with_failing_batch(mut self, n: usize) -> Self {
        self.failing_batch = Some(n);
        self
    }

    /// The `n`th batch write (1-based) returns all of its items unprocessed.
    pub fn with_throttled_batch(mut self, n: usize) -> Self {
        self.throttled_batch = Some(n);
        self
    }

    /// Forces the status `table` reports from now on. Does nothing when the
    /// table does not exist.
    pub async fn set_table_status(&self, table: &str, status: TableStatus) {
        if let Some(table) = self.tables.write().await.get_mut(table) {
            table.set_status(status);
        }
    }

    /// Every request received so far, in order.
    pub async fn operations(&self) -> Vec<Operation> {
        self.operations.read().await.clone()
    }

    /// The stored items of `table`, in key order.
    pub async fn table_items(&self, table: &str) -> Vec<Item> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|table| table.items().cloned().collect())
            .unwrap_or_default()
    }

    async fn record(&self, operation: Operation) {
        self.operations.write().await.push(operation);
    }
}

fn not_found(table: &str) -> BackendError {
    BackendError::ResourceNotFound(format!("Requested resource not found: Table: {table}"))
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn query(&self, request: QueryRequest) -> Result<PageResponse, BackendError> {
        self.record(Operation::Query(request.clone())).await;
        if request.filter_expression.is_some() {
            return Err(BackendError::InvalidRequest(
                "Filter expressions are not supported by the in-memory backend".to_string(),
            ));
        }
        let tables = self.tables.read().await;
        let table = tables
            .get(&request.table_name)
            .ok_or_else(|| not_found(&request.table_name))?;
        table.query(&request, self.page_size)
    }

    async fn scan(&self, request: ScanRequest) -> Result<PageResponse, BackendError> {
        self.record(Operation::Scan(request.clone())).await;
        if request.filter_expression.is_some() {
            return Err(BackendError::InvalidRequest(
                "Filter expressions are not supported by the in-memory backend".to_string(),
            ));
        }
        let tables = self.tables.read().await;
        let table = tables
            .get(&request.table_name)
            .ok_or_else(|| not_found(&request.table_name))?;
        table.scan(&request, self.page_size)
    }

    async fn batch_write(
        &self,
        request: BatchWriteRequest,
    ) -> Result<BatchWriteResponse, BackendError> {
        self.record(Operation::BatchWrite(request.clone())).await;
        if request.len() > MAX_BATCH_ITEMS {
            return Err(BackendError::InvalidRequest(format!(
                "Too many items requested for the BatchWriteItem call: {}",
                request.len()
            )));
        }

        let batch = self.batches.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_batch == Some(batch) {
            return Err(BackendError::Service {
                operation: "BatchWriteItem",
                message: format!("Injected failure for batch {batch}"),
            });
        }
        if self.throttled_batch == Some(batch) {
            return Ok(BatchWriteResponse {
                unprocessed: request.request_items,
            });
        }

        let mut tables = self.tables.write().await;
        for table_name in request.request_items.keys() {
            if !tables.contains_key(table_name) {
                return Err(not_found(table_name));
            }
        }
        for (table_name, puts) in request.request_items {
            if let Some(table) = tables.get_mut(&table_name) {
                for put in puts {
                    table.put(put.item)?;
                }
            }
        }
        Ok(BatchWriteResponse::default())
    }

    async fn get_item(&self, request: GetItemRequest) -> Result<Option<Item>, BackendError> {
        self.record(Operation::GetItem(request.clone())).await;
        let tables = self.tables.read().await;
        let table = tables
            .get(&request.table_name)
            .ok_or_else(|| not_found(&request.table_name))?;
        table.get(&request.key)
    }

    async fn delete_item(&self, request: DeleteItemRequest) -> Result<(), BackendError> {
        self.record(Operation::DeleteItem(request.clone())).await;
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&request.table_name)
            .ok_or_else(|| not_found(&request.table_name))?;
        table.delete(&request.key)
    }

    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, BackendError> {
        self.record(Operation::DescribeTable(table_name.to_string()))
            .await;
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| not_found(table_name))?;
        Ok(table.describe())
    }

    async fn create_table(&self, declaration: &TableDeclaration) -> Result<(), BackendError> {
        self.record(Operation::CreateTable(declaration.table_name.clone()))
            .await;
        let mut tables = self.tables.write().await;
        if tables.contains_key(&declaration.table_name) {
            return Err(BackendError::Service {
                operation: "CreateTable",
                message: format!("Table already exists: {}", declaration.table_name),
            });
        }
        let table = Table::new(declaration, self.activation_polls)?;
        tables.insert(declaration.table_name.clone(), table);
        Ok(())
    }
}
