//! Batched puts, point reads and deletes.

use std::borrow::Borrow;
use std::pin::pin;

use futures_util::{Stream, StreamExt};

use dynadao_core::codec::{CodecError, SerializationError};
use dynadao_core::wire::Item;

use super::{Dao, Key};
use crate::backend::{BackendError, BatchWriteRequest, DeleteItemRequest, GetItemRequest};
use crate::error::Result;

/// Maximum number of puts in one batch write.
pub const BATCH_WRITE_LIMIT: usize = 25;

impl<T: Send + 'static> Dao<T> {
    /// Writes `records` in batches of at most [`BATCH_WRITE_LIMIT`].
    ///
    /// Batches are sent one after another. The first failure aborts the
    /// write; batches sent before it stay applied. Items the backend leaves
    /// unprocessed fail their batch. Returns the number of records written.
    pub async fn persist<I>(&self, records: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        self.persist_stream(tokio_stream::iter(records)).await
    }

    /// Like [`Dao::persist`], pulling records from a stream.
    pub async fn persist_stream<S>(&self, records: S) -> Result<usize>
    where
        S: Stream,
        S::Item: Borrow<T>,
    {
        let mut chunks = pin!(records.chunks(BATCH_WRITE_LIMIT));
        let mut written = 0;

        while let Some(chunk) = chunks.next().await {
            let items = chunk
                .iter()
                .map(|record| self.to_item(record.borrow()))
                .collect::<Result<Vec<_>>>()?;
            self.write_chunk(items).await?;
            written += chunk.len();
        }

        tracing::debug!(table = %self.table_name, records = written, "Persisted records");
        Ok(written)
    }

    async fn write_chunk(&self, items: Vec<Item>) -> Result<()> {
        let count = items.len();
        tracing::debug!(table = %self.table_name, items = count, "Writing batch");

        let response = self
            .backend
            .batch_write(BatchWriteRequest::put(&self.table_name, items))
            .await?;

        let unprocessed = response.unprocessed_count();
        if unprocessed > 0 {
            tracing::warn!(
                table = %self.table_name,
                unprocessed,
                items = count,
                "Batch write left items unprocessed"
            );
            return Err(BackendError::Unprocessed {
                table: self.table_name.clone(),
                count: unprocessed,
            }
            .into());
        }
        Ok(())
    }

    /// Reads one record by primary key. `Ok(None)` when no item has the key.
    pub async fn get(&self, key: Key) -> Result<Option<T>> {
        let key = self.encode_key(&key)?;
        let item = self
            .backend
            .get_item(GetItemRequest {
                table_name: self.table_name.clone(),
                key,
            })
            .await?;

        match item {
            Some(item) => Ok(Some(self.codec.deserialize(&item)?)),
            None => Ok(None),
        }
    }

    /// Deletes the item with the given primary key. Deleting an absent key
    /// succeeds.
    pub async fn delete(&self, key: Key) -> Result<()> {
        let key = self.encode_key(&key)?;
        self.delete_item(key).await
    }

    /// Deletes the item stored for `record`, keyed by its own key fields.
    pub async fn delete_record(&self, record: &T) -> Result<()> {
        let mut item = self.to_item(record)?;
        let mut key = Item::new();
        for field in self.schema.key().fields() {
            let value = item
                .remove(field)
                .ok_or_else(|| SerializationError::new(field, CodecError::MissingField))?;
            key.insert(field.to_string(), value);
        }
        self.delete_item(key).await
    }

    async fn delete_item(&self, key: Item) -> Result<()> {
        tracing::debug!(table = %self.table_name, "Deleting item");
        self.backend
            .delete_item(DeleteItemRequest {
                table_name: self.table_name.clone(),
                key,
            })
            .await?;
        Ok(())
    }
}
