//! Typed data access over one table.
//!
//! A [`Dao`] couples a [`RecordCodec`] with a validated [`TableSchema`] and a
//! [`Backend`]. Reads are delegated to [`Reader`]s, writes are chunked into
//! batch requests, and [`Dao::create_table_if_needed`] provisions the table.
//!
//! # Module Structure
//!
//! - `query`: paginated reads and read options
//! - `write`: batched puts, point reads and deletes
//! - `provision`: table creation and activation polling

mod provision;
mod query;
mod write;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dynadao_core::codec::{
    CodecError, DecodedFields, RecordCodec, SerializationError, ValueEncoder,
};
use dynadao_core::key::{Index, KeySpec, SortCondition, TableSchema};
use dynadao_core::wire::{Item, WireValue};
use dynadao_core::SchemaError;

use crate::backend::Backend;
use crate::config::Config;
use crate::error::Result;

pub use query::{
    QueryHook, QueryOptions, ReadOptions, Reader, RecordStream, RequestHook, ScanHook,
    ScanOptions,
};
pub use write::BATCH_WRITE_LIMIT;

/// The primary key of one item.
///
/// Values must have the value type of the key field's codec, e.g. `String`
/// for a [`StringCodec`](dynadao_core::codec::StringCodec) field.
pub struct Key {
    partition: Box<dyn Any + Send + Sync>,
    sort: Option<Box<dyn Any + Send + Sync>>,
}

impl Key {
    pub fn new(partition: impl Any + Send + Sync) -> Self {
        Self {
            partition: Box::new(partition),
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: impl Any + Send + Sync) -> Self {
        self.sort = Some(Box::new(sort));
        self
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("sort", &self.sort.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dao`].
pub struct DaoBuilder<T> {
    table_name: String,
    codec: RecordCodec<T>,
    key: KeySpec,
    indexes: Vec<Index>,
    config: Option<Config>,
}

impl<T: Send + 'static> DaoBuilder<T> {
    /// Declares a secondary index.
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Overrides the configuration otherwise read from the environment.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Validates the key and indexes against the codec.
    pub fn build(self, backend: impl Backend + 'static) -> Result<Dao<T>> {
        let schema = TableSchema::new(self.key, self.indexes, &self.codec)?;
        let backend: Arc<dyn Backend> = Arc::new(backend);
        let schema = Arc::new(schema);
        let reader = Reader::new(
            self.table_name.clone(),
            None,
            schema.key().clone(),
            schema.key(),
            Arc::new(self.codec.clone()),
            Arc::new(self.codec.clone()),
            Arc::clone(&backend),
        );

        tracing::debug!(
            table = %self.table_name,
            indexes = schema.indexes().len(),
            "Built DAO"
        );

        Ok(Dao {
            table_name: self.table_name,
            codec: self.codec,
            schema,
            backend,
            config: self.config.unwrap_or_default(),
            reader,
        })
    }
}

/// Typed reads and writes of `T` records in one table.
pub struct Dao<T> {
    table_name: String,
    codec: RecordCodec<T>,
    schema: Arc<TableSchema>,
    backend: Arc<dyn Backend>,
    config: Config,
    reader: Reader<T>,
}

impl<T> Clone for Dao<T> {
    fn clone(&self) -> Self {
        Self {
            table_name: self.table_name.clone(),
            codec: self.codec.clone(),
            schema: Arc::clone(&self.schema),
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            reader: self.reader.clone(),
        }
    }
}

impl<T> fmt::Debug for Dao<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dao")
            .field("table_name", &self.table_name)
            .field("codec", &self.codec)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Dao<T> {
    /// Starts a DAO for `table_name`, keyed by `key`.
    ///
    /// ```
    /// use dynadao::codec::{NumberCodec, RecordCodec, StringCodec};
    /// use dynadao::key::KeySpec;
    /// use dynadao::{Dao, MemoryBackend};
    ///
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
    /// let dao = Dao::builder("products", codec, KeySpec::composite("type", "code"))
    ///     .build(MemoryBackend::new())
    ///     .unwrap();
    /// assert_eq!(dao.table_name(), "products");
    /// ```
    pub fn builder(
        table_name: impl Into<String>,
        codec: RecordCodec<T>,
        key: KeySpec,
    ) -> DaoBuilder<T> {
        DaoBuilder {
            table_name: table_name.into(),
            codec,
            key,
            indexes: Vec::new(),
            config: None,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn codec(&self) -> &RecordCodec<T> {
        &self.codec
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scans the whole table.
    pub fn list(&self, options: ScanOptions) -> RecordStream<T> {
        self.reader.list(options)
    }

    /// Reads every record with the given partition key value.
    pub fn lookup<P: Any>(&self, partition: P, options: QueryOptions) -> Result<RecordStream<T>> {
        self.reader.lookup(partition, options)
    }

    /// Reads the records of a partition whose sort key satisfies `condition`.
    pub fn lookup_where<P: Any, S: Any>(
        &self,
        partition: P,
        condition: SortCondition<S>,
        options: QueryOptions,
    ) -> Result<RecordStream<T>> {
        self.reader.lookup_where(partition, condition, options)
    }

    /// A reader over a secondary index, decoding full records.
    pub fn index(&self, name: &str) -> Result<Reader<T>> {
        let index = self.schema.index(name)?;
        Ok(Reader::new(
            self.table_name.clone(),
            Some(index.name().to_string()),
            index.key().clone(),
            self.schema.key(),
            Arc::new(self.codec.clone()),
            Arc::new(self.codec.clone()),
            Arc::clone(&self.backend),
        ))
    }

    /// A reader over a secondary index that decodes only the fields the index
    /// carries: its projection plus the table and index key fields.
    pub fn index_view<P, F>(&self, name: &str, construct: F) -> Result<Reader<P>>
    where
        P: Send + 'static,
        F: Fn(&mut DecodedFields) -> std::result::Result<P, SerializationError>
            + Send
            + Sync
            + 'static,
    {
        let index = self.schema.index(name)?;
        let fields = index
            .readable_fields(self.schema.key())
            .unwrap_or_else(|| self.codec.field_names().map(String::from).collect());
        let names: Vec<&str> = fields.iter().map(String::as_str).collect();
        let view = self.codec.project(&names, construct)?;

        tracing::debug!(
            table = %self.table_name,
            index = %name,
            fields = ?names,
            "Built index view"
        );

        Ok(Reader::new(
            self.table_name.clone(),
            Some(index.name().to_string()),
            index.key().clone(),
            self.schema.key(),
            Arc::new(view),
            Arc::new(self.codec.clone()),
            Arc::clone(&self.backend),
        ))
    }

    /// Serializes `record` for a put.
    ///
    /// Table key fields must hold a value. A `NULL` index key field is left
    /// out of the item, so the record is not part of that index.
    fn to_item(&self, record: &T) -> Result<Item> {
        let mut item = self.codec.serialize(record)?;
        for field in self.schema.key().fields() {
            if item.get(field).map_or(true, WireValue::is_null) {
                return Err(SerializationError::new(field, CodecError::MissingField).into());
            }
        }
        for index in self.schema.indexes() {
            for field in index.key().fields() {
                if item.get(field).is_some_and(WireValue::is_null) {
                    item.remove(field);
                }
            }
        }
        Ok(item)
    }

    /// Encodes a primary key through the key fields' codecs.
    fn encode_key(&self, key: &Key) -> Result<Item> {
        let spec = self.schema.key();
        let partition = spec.partition_key();
        let mut item = Item::new();
        item.insert(
            partition.to_string(),
            self.codec.encode_value(partition, key.partition.as_ref())?,
        );

        match (spec.sort_key(), &key.sort) {
            (Some(sort), Some(value)) => {
                item.insert(
                    sort.to_string(),
                    self.codec.encode_value(sort, value.as_ref())?,
                );
            }
            (Some(_), None) => return Err(SchemaError::IncompleteKey(partition.to_string()).into()),
            (None, Some(_)) => {
                return Err(SchemaError::MissingSortKey(partition.to_string()).into())
            }
            (None, None) => {}
        }
        Ok(item)
    }
}
