//! Paginated reads.
//!
//! A [`Reader`] turns one logical query or scan into a lazy stream of
//! records, following continuation keys page by page until the backend runs
//! out of items or the caller's limit is met.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;

use dynadao_core::codec::{RecordDecoder, ValueEncoder};
use dynadao_core::key::{render_key_condition, KeySpec, SortCondition};
use dynadao_core::token::ContinuationToken;
use dynadao_core::wire::{Item, WireValue};
use dynadao_core::SchemaError;

use crate::backend::{Backend, BackendError, PageResponse, QueryRequest, ScanRequest};
use crate::error::{DaoError, Result};

/// A lazy, forward-only stream of decoded records.
pub type RecordStream<R> = BoxStream<'static, std::result::Result<R, DaoError>>;

/// Rewrites each page request just before it is sent.
pub type RequestHook<Req> = Box<dyn Fn(Req) -> Req + Send + Sync>;
pub type QueryHook = RequestHook<QueryRequest>;
pub type ScanHook = RequestHook<ScanRequest>;

type OnMore = Box<dyn FnOnce(ContinuationToken) + Send>;

/// Options for one read.
///
/// ```
/// use dynadao::QueryOptions;
///
/// let options = QueryOptions::new().limit(10).hook(|mut request| {
///     request.scan_index_forward = Some(false);
///     request
/// });
/// assert_eq!(options.limit, Some(10));
/// ```
pub struct ReadOptions<Req> {
    /// Upper bound on the number of records yielded.
    pub limit: Option<usize>,
    /// Resume after this key, as reported by an earlier read.
    pub start: Option<ContinuationToken>,
    on_more: Option<OnMore>,
    hook: Option<RequestHook<Req>>,
}

pub type QueryOptions = ReadOptions<QueryRequest>;
pub type ScanOptions = ReadOptions<ScanRequest>;

impl<Req> ReadOptions<Req> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start(mut self, token: ContinuationToken) -> Self {
        self.start = Some(token);
        self
    }

    /// Called once with the continuation key when the limit is reached
    /// before the backend ran out of items.
    pub fn on_more(mut self, callback: impl FnOnce(ContinuationToken) + Send + 'static) -> Self {
        self.on_more = Some(Box::new(callback));
        self
    }

    /// Applied to every page request. The result is sent as is; hooks must
    /// not reuse the reserved placeholder names.
    pub fn hook(mut self, hook: impl Fn(Req) -> Req + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }
}

impl<Req> Default for ReadOptions<Req> {
    fn default() -> Self {
        Self {
            limit: None,
            start: None,
            on_more: None,
            hook: None,
        }
    }
}

impl<Req> fmt::Debug for ReadOptions<Req> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("limit", &self.limit)
            .field("start", &self.start)
            .field("on_more", &self.on_more.is_some())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

// ============================================================================
// Page requests
// ============================================================================

type PageFuture<'a> = BoxFuture<'a, std::result::Result<PageResponse, BackendError>>;

/// A request that can be sent one page at a time.
trait PageRequest: Clone + Send + Sync + 'static {
    const OPERATION: &'static str;

    fn table_name(&self) -> &str;

    fn set_page(&mut self, start: Option<Item>, limit: Option<i32>);

    fn send(self, backend: &dyn Backend) -> PageFuture<'_>;
}

impl PageRequest for QueryRequest {
    const OPERATION: &'static str = "Query";

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn set_page(&mut self, start: Option<Item>, limit: Option<i32>) {
        self.exclusive_start_key = start;
        self.limit = limit;
    }

    fn send(self, backend: &dyn Backend) -> PageFuture<'_> {
        backend.query(self)
    }
}

impl PageRequest for ScanRequest {
    const OPERATION: &'static str = "Scan";

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn set_page(&mut self, start: Option<Item>, limit: Option<i32>) {
        self.exclusive_start_key = start;
        self.limit = limit;
    }

    fn send(self, backend: &dyn Backend) -> PageFuture<'_> {
        backend.scan(self)
    }
}

/// Streams every page of `request`, decoding items as they arrive.
///
/// Nothing is sent before the first poll. Each page asks for the number of
/// records still owed; once the limit is met with more items pending,
/// `on_more` receives the continuation key instead of another request.
/// A page holding more items than owed is cut short, and the continuation
/// key is built from `marker_fields` of the last item yielded.
fn paginate<Req, R>(
    backend: Arc<dyn Backend>,
    request: Req,
    decoder: Arc<dyn RecordDecoder<R>>,
    marker_fields: Vec<String>,
    options: ReadOptions<Req>,
) -> RecordStream<R>
where
    Req: PageRequest,
    R: Send + 'static,
{
    let ReadOptions {
        limit,
        start,
        on_more,
        hook,
    } = options;

    let stream = async_stream::stream! {
        let mut remaining = limit;
        let mut continuation = start.map(ContinuationToken::into_item);
        let mut on_more = on_more;

        'pages: while remaining != Some(0) {
            let mut page = request.clone();
            page.set_page(
                continuation.take(),
                remaining.map(|n| i32::try_from(n).unwrap_or(i32::MAX)),
            );
            if let Some(hook) = &hook {
                page = hook(page);
            }

            tracing::debug!(
                table = %page.table_name(),
                operation = Req::OPERATION,
                remaining = ?remaining,
                "Requesting page"
            );

            let response = match page.send(backend.as_ref()).await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(DaoError::from(e));
                    break;
                }
            };

            tracing::trace!(
                items = response.items.len(),
                more = response.last_evaluated_key.is_some(),
                "Received page"
            );

            let owed = remaining.map_or(response.items.len(), |n| n.min(response.items.len()));
            for item in &response.items[..owed] {
                match decoder.decode_item(item) {
                    Ok(record) => yield Ok(record),
                    Err(e) => {
                        yield Err(DaoError::from(e));
                        break 'pages;
                    }
                }
            }

            remaining = remaining.map(|n| n - owed);

            let marker = match owed.checked_sub(1) {
                Some(last) if owed < response.items.len() => {
                    Some(key_of(&response.items[last], &marker_fields))
                }
                _ => response.last_evaluated_key,
            };
            match marker {
                None => break,
                Some(marker) if remaining == Some(0) => {
                    if let Some(callback) = on_more.take() {
                        callback(ContinuationToken::new(marker));
                    }
                    break;
                }
                Some(marker) => continuation = Some(marker),
            }
        }
    };

    Box::pin(stream)
}

/// The continuation key of `item`: its values for `fields`.
fn key_of(item: &Item, fields: &[String]) -> Item {
    fields
        .iter()
        .filter_map(|field| Some((field.clone(), item.get(field)?.clone())))
        .collect()
}

// ============================================================================
// Reader
// ============================================================================

/// Reads records of type `R` from a table or one of its indexes.
pub struct Reader<R> {
    table_name: String,
    index_name: Option<String>,
    key: KeySpec,
    /// Table key fields, then the read key's own.
    marker_fields: Vec<String>,
    decoder: Arc<dyn RecordDecoder<R>>,
    encoder: Arc<dyn ValueEncoder>,
    backend: Arc<dyn Backend>,
}

impl<R> Clone for Reader<R> {
    fn clone(&self) -> Self {
        Self {
            table_name: self.table_name.clone(),
            index_name: self.index_name.clone(),
            key: self.key.clone(),
            marker_fields: self.marker_fields.clone(),
            decoder: Arc::clone(&self.decoder),
            encoder: Arc::clone(&self.encoder),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<R> fmt::Debug for Reader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("table_name", &self.table_name)
            .field("index_name", &self.index_name)
            .field("key", &self.key)
            .finish()
    }
}

impl<R: Send + 'static> Reader<R> {
    pub(crate) fn new(
        table_name: String,
        index_name: Option<String>,
        key: KeySpec,
        table_key: &KeySpec,
        decoder: Arc<dyn RecordDecoder<R>>,
        encoder: Arc<dyn ValueEncoder>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        let mut marker_fields: Vec<String> = table_key.fields().map(String::from).collect();
        for field in key.fields() {
            if !table_key.contains(field) {
                marker_fields.push(field.to_string());
            }
        }
        Self {
            table_name,
            index_name,
            key,
            marker_fields,
            decoder,
            encoder,
            backend,
        }
    }

    /// The index read by this reader, `None` for the table itself.
    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    /// The key conditions are rendered against.
    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    /// Scans every item.
    pub fn list(&self, options: ScanOptions) -> RecordStream<R> {
        let request = ScanRequest {
            table_name: self.table_name.clone(),
            index_name: self.index_name.clone(),
            ..Default::default()
        };
        paginate(
            Arc::clone(&self.backend),
            request,
            Arc::clone(&self.decoder),
            self.marker_fields.clone(),
            options,
        )
    }

    /// Reads every item sharing a partition key value.
    ///
    /// `partition` must have the value type of the partition field's codec.
    pub fn lookup<P: Any>(&self, partition: P, options: QueryOptions) -> Result<RecordStream<R>> {
        let partition = self.encode(self.key.partition_key(), &partition)?;
        self.query(partition, None, options)
    }

    /// Reads the items of a partition whose sort key satisfies `condition`.
    pub fn lookup_where<P: Any, S: Any>(
        &self,
        partition: P,
        condition: SortCondition<S>,
        options: QueryOptions,
    ) -> Result<RecordStream<R>> {
        let partition = self.encode(self.key.partition_key(), &partition)?;
        let sort_key = self
            .key
            .sort_key()
            .ok_or_else(|| SchemaError::MissingSortKey(self.key.partition_key().to_string()))?;
        let condition = condition.try_map(|value| self.encode(sort_key, &value))?;
        self.query(partition, Some(condition), options)
    }

    fn encode(&self, field: &str, value: &dyn Any) -> Result<WireValue> {
        Ok(self.encoder.encode_value(field, value)?)
    }

    fn query(
        &self,
        partition: WireValue,
        condition: Option<SortCondition<WireValue>>,
        options: QueryOptions,
    ) -> Result<RecordStream<R>> {
        let condition = render_key_condition(&self.key, partition, condition)?;
        let request = QueryRequest {
            table_name: self.table_name.clone(),
            index_name: self.index_name.clone(),
            key_condition_expression: condition.expression,
            expression_attribute_names: condition.names,
            expression_attribute_values: condition.values,
            ..Default::default()
        };
        Ok(paginate(
            Arc::clone(&self.backend),
            request,
            Arc::clone(&self.decoder),
            self.marker_fields.clone(),
            options,
        ))
    }
}
