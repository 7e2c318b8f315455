//! DynamoDB backend implementation.
//!
//! Maps the [`Backend`] contract onto `aws-sdk-dynamodb` calls.
//!
//! # Module Structure
//!
//! - `conversions`: wire values, declarations and statuses to and from SDK types
//! - `error`: SDK error to [`BackendError`] mapping

mod conversions;
mod error;

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{PutRequest as SdkPutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;

use dynadao_core::key::TableDeclaration;
use dynadao_core::wire::Item;

use super::{
    Backend, BackendError, BatchWriteRequest, BatchWriteResponse, DeleteItemRequest,
    GetItemRequest, PageResponse, PutRequest, QueryRequest, ScanRequest, TableDescription,
};
use crate::config::Config;
use conversions::{
    from_index_status, from_item, from_table_status, to_attribute_definitions, to_global_index,
    to_item, to_key_schema, to_local_index, to_optional_item, to_throughput,
};
use error::{
    map_batch_write_error, map_create_table_error, map_delete_item_error,
    map_describe_table_error, map_get_item_error, map_query_error, map_scan_error,
};

/// DynamoDB-backed [`Backend`].
#[derive(Debug, Clone)]
pub struct DynamoDbBackend {
    client: Client,
}

impl DynamoDbBackend {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a client for the configured region and endpoint.
    ///
    /// Credentials come from the AWS SDK default chain.
    pub async fn from_config(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        tracing::debug!(endpoint = %config.target_display(), "Created DynamoDB client");
        Self::new(Client::new(&sdk_config))
    }

    /// Get the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn collect_items(
    items: Option<Vec<HashMap<String, aws_sdk_dynamodb::types::AttributeValue>>>,
) -> Result<Vec<Item>, BackendError> {
    items.unwrap_or_default().into_iter().map(from_item).collect()
}

fn to_write_request(put: PutRequest) -> Result<WriteRequest, BackendError> {
    let put = SdkPutRequest::builder()
        .set_item(Some(to_item(put.item)))
        .build()
        .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;
    Ok(WriteRequest::builder().put_request(put).build())
}

fn optional_list<T>(values: Vec<T>) -> Option<Vec<T>> {
    (!values.is_empty()).then_some(values)
}

fn optional_names(names: HashMap<String, String>) -> Option<HashMap<String, String>> {
    (!names.is_empty()).then_some(names)
}

#[async_trait]
impl Backend for DynamoDbBackend {
    async fn query(&self, request: QueryRequest) -> Result<PageResponse, BackendError> {
        tracing::debug!(table = %request.table_name, index = ?request.index_name, "Query");
        let output = self
            .client
            .query()
            .table_name(&request.table_name)
            .set_index_name(request.index_name)
            .key_condition_expression(request.key_condition_expression)
            .set_filter_expression(request.filter_expression)
            .set_expression_attribute_names(optional_names(request.expression_attribute_names))
            .set_expression_attribute_values(to_optional_item(request.expression_attribute_values))
            .set_exclusive_start_key(request.exclusive_start_key.map(to_item))
            .set_limit(request.limit)
            .set_scan_index_forward(request.scan_index_forward)
            .send()
            .await
            .map_err(|e| map_query_error(e, &request.table_name))?;

        Ok(PageResponse {
            items: collect_items(output.items)?,
            last_evaluated_key: output.last_evaluated_key.map(from_item).transpose()?,
        })
    }

    async fn scan(&self, request: ScanRequest) -> Result<PageResponse, BackendError> {
        tracing::debug!(table = %request.table_name, index = ?request.index_name, "Scan");
        let output = self
            .client
            .scan()
            .table_name(&request.table_name)
            .set_index_name(request.index_name)
            .set_filter_expression(request.filter_expression)
            .set_expression_attribute_names(optional_names(request.expression_attribute_names))
            .set_expression_attribute_values(to_optional_item(request.expression_attribute_values))
            .set_exclusive_start_key(request.exclusive_start_key.map(to_item))
            .set_limit(request.limit)
            .send()
            .await
            .map_err(|e| map_scan_error(e, &request.table_name))?;

        Ok(PageResponse {
            items: collect_items(output.items)?,
            last_evaluated_key: output.last_evaluated_key.map(from_item).transpose()?,
        })
    }

    async fn batch_write(
        &self,
        request: BatchWriteRequest,
    ) -> Result<BatchWriteResponse, BackendError> {
        tracing::debug!(items = request.len(), "BatchWriteItem");
        let request_items = request
            .request_items
            .into_iter()
            .map(|(table, puts)| {
                let writes = puts
                    .into_iter()
                    .map(to_write_request)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((table, writes))
            })
            .collect::<Result<HashMap<_, _>, BackendError>>()?;

        let output = self
            .client
            .batch_write_item()
            .set_request_items(Some(request_items))
            .send()
            .await
            .map_err(map_batch_write_error)?;

        let mut unprocessed = HashMap::new();
        for (table, writes) in output.unprocessed_items.unwrap_or_default() {
            let puts = writes
                .iter()
                .filter_map(|w| w.put_request())
                .map(|p| Ok(PutRequest { item: from_item(p.item().clone())? }))
                .collect::<Result<Vec<_>, BackendError>>()?;
            if !puts.is_empty() {
                unprocessed.insert(table, puts);
            }
        }
        Ok(BatchWriteResponse { unprocessed })
    }

    async fn get_item(&self, request: GetItemRequest) -> Result<Option<Item>, BackendError> {
        let output = self
            .client
            .get_item()
            .table_name(&request.table_name)
            .set_key(Some(to_item(request.key)))
            .send()
            .await
            .map_err(|e| map_get_item_error(e, &request.table_name))?;

        output.item.map(from_item).transpose()
    }

    async fn delete_item(&self, request: DeleteItemRequest) -> Result<(), BackendError> {
        self.client
            .delete_item()
            .table_name(&request.table_name)
            .set_key(Some(to_item(request.key)))
            .send()
            .await
            .map_err(|e| map_delete_item_error(e, &request.table_name))?;
        Ok(())
    }

    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, BackendError> {
        let response = self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| map_describe_table_error(e, table_name))?;

        let table = response.table().ok_or_else(|| BackendError::Service {
            operation: "DescribeTable",
            message: format!("No table description returned for {table_name}"),
        })?;

        let index_statuses = table
            .global_secondary_indexes()
            .iter()
            .map(|gsi| {
                (
                    gsi.index_name().unwrap_or_default().to_string(),
                    from_index_status(gsi.index_status()),
                )
            })
            .collect();

        Ok(TableDescription {
            table_name: table_name.to_string(),
            status: from_table_status(table.table_status()),
            index_statuses,
        })
    }

    async fn create_table(&self, declaration: &TableDeclaration) -> Result<(), BackendError> {
        tracing::info!(table = %declaration.table_name, "Creating table");
        let local_indexes = declaration
            .local_secondary_indexes
            .iter()
            .map(to_local_index)
            .collect::<Result<Vec<_>, _>>()?;
        let global_indexes = declaration
            .global_secondary_indexes
            .iter()
            .map(to_global_index)
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .create_table()
            .table_name(&declaration.table_name)
            .set_attribute_definitions(Some(to_attribute_definitions(
                &declaration.attribute_definitions,
            )?))
            .set_key_schema(Some(to_key_schema(&declaration.key_schema)?))
            .set_local_secondary_indexes(optional_list(local_indexes))
            .set_global_secondary_indexes(optional_list(global_indexes))
            .provisioned_throughput(to_throughput(declaration.provisioned_throughput)?)
            .send()
            .await
            .map_err(|e| map_create_table_error(e, &declaration.table_name))?;
        Ok(())
    }
}
