use std::{env, time::Duration};

use dynadao_core::key::Throughput;

/// DAO configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Custom endpoint URL, e.g. for DynamoDB Local (default: none)
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1")
    pub region: String,
    /// Read capacity for created tables and global indexes (default: 1)
    pub read_capacity_units: i64,
    /// Write capacity for created tables and global indexes (default: 1)
    pub write_capacity_units: i64,
    /// How many times to poll a table while waiting for it to become active (default: 60)
    pub table_wait_attempts: u32,
    /// Delay between those polls in milliseconds (default: 2,000)
    pub table_wait_interval_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DYNAMODB_ENDPOINT_URL` or `AWS_ENDPOINT_URL` - Custom endpoint (default: none)
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    /// - `DYNAMODB_READ_CAPACITY` - Provisioned read capacity (default: 1)
    /// - `DYNAMODB_WRITE_CAPACITY` - Provisioned write capacity (default: 1)
    /// - `DYNAMODB_TABLE_WAIT_ATTEMPTS` - Activation polls (default: 60)
    /// - `DYNAMODB_TABLE_WAIT_INTERVAL_MS` - Delay between polls (default: 2,000)
    pub fn from_env() -> Self {
        Self {
            endpoint_url: env::var("DYNAMODB_ENDPOINT_URL")
                .or_else(|_| env::var("AWS_ENDPOINT_URL"))
                .ok(),
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            read_capacity_units: parse_var("DYNAMODB_READ_CAPACITY").unwrap_or(1),
            write_capacity_units: parse_var("DYNAMODB_WRITE_CAPACITY").unwrap_or(1),
            table_wait_attempts: parse_var("DYNAMODB_TABLE_WAIT_ATTEMPTS").unwrap_or(60),
            table_wait_interval_ms: parse_var("DYNAMODB_TABLE_WAIT_INTERVAL_MS").unwrap_or(2_000),
        }
    }

    /// Throughput declared for created tables and their global indexes.
    pub fn throughput(&self) -> Throughput {
        Throughput {
            read_capacity_units: self.read_capacity_units,
            write_capacity_units: self.write_capacity_units,
        }
    }

    pub fn table_wait_interval(&self) -> Duration {
        Duration::from_millis(self.table_wait_interval_ms)
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
