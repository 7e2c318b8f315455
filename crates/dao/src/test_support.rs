//! Shared fixtures for unit tests.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dynadao_core::codec::{NumberCodec, RecordCodec, StringCodec};
use dynadao_core::key::{Index, KeySpec};

use crate::backend::MemoryBackend;
use crate::config::Config;
use crate::Dao;

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub kind: String,
    pub code: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

/// `n` books with codes and stock `0..n`.
pub fn products(n: i64) -> Vec<Product> {
    (0..n)
        .map(|i| Product {
            kind: "book".to_string(),
            code: i,
            name: format!("Product {i:02}"),
            price: 9.5 + i as f64,
            stock: i,
        })
        .collect()
}

pub fn product_codec() -> RecordCodec<Product> {
    RecordCodec::builder()
        .field("type", StringCodec, |p: &Product| p.kind.clone())
        .field("code", NumberCodec::<i64>::new(), |p: &Product| p.code)
        .field("name", StringCodec, |p: &Product| p.name.clone())
        .field("price", NumberCodec::<f64>::new(), |p: &Product| p.price)
        .field("stock", NumberCodec::<i64>::new(), |p: &Product| p.stock)
        .build(|f| {
            Ok(Product {
                kind: f.required("type")?,
                code: f.required("code")?,
                name: f.required("name")?,
                price: f.required("price")?,
                stock: f.required("stock")?,
            })
        })
        .unwrap()
}

pub fn test_config() -> Config {
    Config {
        endpoint_url: None,
        region: "us-east-1".to_string(),
        read_capacity_units: 1,
        write_capacity_units: 1,
        table_wait_attempts: 10,
        table_wait_interval_ms: 1,
    }
}

/// A DAO over `products`, keyed by `(type, code)`, whose table has not been
/// created yet.
pub fn product_dao_unprovisioned(backend: &MemoryBackend) -> Dao<Product> {
    Dao::builder(
        "products",
        product_codec(),
        KeySpec::composite("type", "code"),
    )
    .index(Index::local("byName", KeySpec::composite("type", "name")).with_projection(["price"]))
    .index(Index::local("byStock", KeySpec::composite("type", "stock")))
    .config(test_config())
    .build(backend.clone())
    .unwrap()
}

/// Like [`product_dao_unprovisioned`], with the table created.
pub async fn product_dao(backend: &MemoryBackend) -> Dao<Product> {
    let dao = product_dao_unprovisioned(backend);
    dao.create_table_if_needed().await.unwrap();
    dao
}

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynadao=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
