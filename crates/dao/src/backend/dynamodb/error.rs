//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to [`BackendError`].

use std::fmt::Debug;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;

use crate::backend::BackendError;

fn service(operation: &'static str, message: impl Into<String>) -> BackendError {
    BackendError::Service {
        operation,
        message: message.into(),
    }
}

/// Errors raised before the request reached DynamoDB.
fn transport_error<E, R>(err: &SdkError<E, R>) -> Option<BackendError> {
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            Some(BackendError::ConnectionFailed(format!("{:?}", err)))
        }
        _ => None,
    }
}

/// Map a Query SDK error to BackendError.
pub fn map_query_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<QueryError, R>,
    table: &str,
) -> BackendError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        QueryError::ResourceNotFoundException(_) => BackendError::ResourceNotFound(table.into()),
        QueryError::ProvisionedThroughputExceededException(_) => {
            service("Query", "Throughput exceeded, please retry")
        }
        QueryError::RequestLimitExceeded(_) => service("Query", "Request limit exceeded, please retry"),
        QueryError::InternalServerError(_) => service("Query", "DynamoDB internal server error"),
        err => service("Query", format!("{:?}", err)),
    }
}

/// Map a Scan SDK error to BackendError.
pub fn map_scan_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<ScanError, R>,
    table: &str,
) -> BackendError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        ScanError::ResourceNotFoundException(_) => BackendError::ResourceNotFound(table.into()),
        ScanError::ProvisionedThroughputExceededException(_) => {
            service("Scan", "Throughput exceeded, please retry")
        }
        ScanError::RequestLimitExceeded(_) => service("Scan", "Request limit exceeded, please retry"),
        ScanError::InternalServerError(_) => service("Scan", "DynamoDB internal server error"),
        err => service("Scan", format!("{:?}", err)),
    }
}

/// Map a BatchWriteItem SDK error to BackendError.
pub fn map_batch_write_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<BatchWriteItemError, R>,
) -> BackendError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        BatchWriteItemError::ResourceNotFoundException(e) => {
            BackendError::ResourceNotFound(e.message().unwrap_or("table").to_string())
        }
        BatchWriteItemError::ProvisionedThroughputExceededException(_) => {
            service("BatchWriteItem", "Throughput exceeded, please retry")
        }
        BatchWriteItemError::RequestLimitExceeded(_) => {
            service("BatchWriteItem", "Request limit exceeded, please retry")
        }
        BatchWriteItemError::ItemCollectionSizeLimitExceededException(_) => {
            service("BatchWriteItem", "Item collection size limit exceeded")
        }
        BatchWriteItemError::InternalServerError(_) => {
            service("BatchWriteItem", "DynamoDB internal server error")
        }
        err => service("BatchWriteItem", format!("{:?}", err)),
    }
}

/// Map a GetItem SDK error to BackendError.
pub fn map_get_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<GetItemError, R>,
    table: &str,
) -> BackendError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        GetItemError::ResourceNotFoundException(_) => BackendError::ResourceNotFound(table.into()),
        GetItemError::ProvisionedThroughputExceededException(_) => {
            service("GetItem", "Throughput exceeded, please retry")
        }
        GetItemError::RequestLimitExceeded(_) => {
            service("GetItem", "Request limit exceeded, please retry")
        }
        GetItemError::InternalServerError(_) => service("GetItem", "DynamoDB internal server error"),
        err => service("GetItem", format!("{:?}", err)),
    }
}

/// Map a DeleteItem SDK error to BackendError.
pub fn map_delete_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DeleteItemError, R>,
    table: &str,
) -> BackendError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        DeleteItemError::ResourceNotFoundException(_) => {
            BackendError::ResourceNotFound(table.into())
        }
        DeleteItemError::ProvisionedThroughputExceededException(_) => {
            service("DeleteItem", "Throughput exceeded, please retry")
        }
        DeleteItemError::RequestLimitExceeded(_) => {
            service("DeleteItem", "Request limit exceeded, please retry")
        }
        DeleteItemError::TransactionConflictException(_) => {
            service("DeleteItem", "Transaction conflict, please retry")
        }
        DeleteItemError::InternalServerError(_) => {
            service("DeleteItem", "DynamoDB internal server error")
        }
        err => service("DeleteItem", format!("{:?}", err)),
    }
}

/// Map a DescribeTable SDK error to BackendError.
pub fn map_describe_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DescribeTableError, R>,
    table: &str,
) -> BackendError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        DescribeTableError::ResourceNotFoundException(_) => {
            BackendError::ResourceNotFound(table.into())
        }
        DescribeTableError::InternalServerError(_) => {
            service("DescribeTable", "DynamoDB internal server error")
        }
        err => service("DescribeTable", format!("{:?}", err)),
    }
}

/// Map a CreateTable SDK error to BackendError.
pub fn map_create_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<CreateTableError, R>,
    table: &str,
) -> BackendError {
    if let Some(err) = transport_error(&err) {
        return err;
    }
    match err.into_service_error() {
        CreateTableError::ResourceInUseException(_) => {
            service("CreateTable", format!("Table already exists: {table}"))
        }
        CreateTableError::LimitExceededException(_) => {
            service("CreateTable", "Table limit exceeded")
        }
        CreateTableError::InternalServerError(_) => {
            service("CreateTable", "DynamoDB internal server error")
        }
        err => service("CreateTable", format!("{:?}", err)),
    }
}
