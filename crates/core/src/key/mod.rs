//! Key specifications, secondary indexes and the declarations derived from
//! them: key-condition expressions, attribute definitions and table schemas.

mod condition;
mod index;
mod schema;
mod spec;

pub use condition::{
    render_key_condition, KeyCondition, SortCondition, PARTITION_NAME, PARTITION_VALUE,
    RANGE_FROM, RANGE_TO, RESERVED_PLACEHOLDERS, SORT_NAME, SORT_VALUE,
};
pub use index::{Index, IndexKind, ProjectionDeclaration};
pub use schema::{
    AttributeDefinition, IndexDeclaration, KeySchemaElement, KeyType, TableDeclaration,
    TableSchema, Throughput,
};
pub use spec::{FieldTypes, KeySpec};
