//! Table provisioning.

use super::Dao;
use crate::backend::TableDescription;
use crate::error::{DaoError, Result};

impl<T: Send + 'static> Dao<T> {
    /// Creates the table from its schema unless it already exists, then
    /// waits until the table and all of its indexes are active.
    pub async fn create_table_if_needed(&self) -> Result<()> {
        match self.backend.describe_table(&self.table_name).await {
            Ok(description) if description.is_ready() => {
                tracing::debug!(table = %self.table_name, "Table already active");
                Ok(())
            }
            Ok(description) => {
                self.ensure_usable(&description)?;
                tracing::info!(
                    table = %self.table_name,
                    status = ?description.status,
                    "Table exists but is not active, waiting"
                );
                self.wait_for_table_active().await
            }
            Err(e) if e.is_not_found() => {
                let declaration = self
                    .schema
                    .declaration(&self.table_name, self.config.throughput());
                tracing::info!(
                    table = %self.table_name,
                    local_indexes = declaration.local_secondary_indexes.len(),
                    global_indexes = declaration.global_secondary_indexes.len(),
                    "Creating table"
                );
                self.backend.create_table(&declaration).await?;
                self.wait_for_table_active().await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn wait_for_table_active(&self) -> Result<()> {
        let attempts = self.config.table_wait_attempts;
        let delay = self.config.table_wait_interval();

        for attempt in 1..=attempts {
            match self.backend.describe_table(&self.table_name).await {
                Ok(description) if description.is_ready() => {
                    tracing::info!(table = %self.table_name, attempt, "Table is active");
                    return Ok(());
                }
                Ok(description) => self.ensure_usable(&description)?,
                // Newly created tables may not be visible yet.
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
            tracing::trace!(table = %self.table_name, attempt, "Table not active yet");
            tokio::time::sleep(delay).await;
        }

        Err(DaoError::TableActivationTimeout {
            table: self.table_name.clone(),
            attempts,
        })
    }

    fn ensure_usable(&self, description: &TableDescription) -> Result<()> {
        if description.status.is_unusable() {
            tracing::warn!(
                table = %self.table_name,
                status = ?description.status,
                "Table is unusable"
            );
            return Err(DaoError::TableUnusable {
                table: self.table_name.clone(),
                status: description.status,
            });
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use crate::backend::inmemory::Operation;
    use crate::backend::{Backend, MemoryBackend, TableStatus};
    use crate::test_support::{init_tracing, product_dao_unprovisioned};

    async fn describes(backend: &MemoryBackend) -> usize {
        backend
            .operations()
            .await
            .iter()
            .filter(|op| matches!(op, Operation::DescribeTable(_)))
            .count()
    }

    #[tokio::test]
    async fn test_creates_missing_table() {
        init_tracing();
        let backend = MemoryBackend::new();
        let dao = product_dao_unprovisioned(&backend);

        dao.create_table_if_needed().await.unwrap();

        let operations = backend.operations().await;
        assert_eq!(
            operations,
            vec![
                Operation::DescribeTable("products".to_string()),
                Operation::CreateTable("products".to_string()),
                Operation::DescribeTable("products".to_string()),
            ]
        );
        assert!(backend.describe_table("products").await.unwrap().is_ready());
    }

    #[tokio::test]
    async fn test_active_table_is_left_alone() {
        let backend = MemoryBackend::new();
        let dao = product_dao_unprovisioned(&backend);
        dao.create_table_if_needed().await.unwrap();
        let before = backend.operations().await.len();

        dao.create_table_if_needed().await.unwrap();

        let operations = backend.operations().await;
        assert_eq!(operations.len(), before + 1);
        assert!(matches!(operations[before], Operation::DescribeTable(_)));
    }

    #[tokio::test]
    async fn test_waits_for_activation() {
        let backend = MemoryBackend::new().with_activation_delay(3);
        let dao = product_dao_unprovisioned(&backend);

        dao.create_table_if_needed().await.unwrap();

        // The initial check plus three polls while creating and one when active.
        assert_eq!(describes(&backend).await, 5);
    }

    #[tokio::test]
    async fn test_waits_for_existing_table() {
        let backend = MemoryBackend::new().with_activation_delay(2);
        let creator = product_dao_unprovisioned(&backend);
        let declaration = creator
            .schema()
            .declaration("products", creator.config().throughput());
        backend.create_table(&declaration).await.unwrap();

        creator.create_table_if_needed().await.unwrap();

        let creates = backend
            .operations()
            .await
            .iter()
            .filter(|op| matches!(op, Operation::CreateTable(_)))
            .count();
        assert_eq!(creates, 1);
        assert_eq!(describes(&backend).await, 3);
    }

    #[tokio::test]
    async fn test_activation_timeout() {
        let backend = MemoryBackend::new().with_activation_delay(100);
        let dao = product_dao_unprovisioned(&backend);

        let err = dao.create_table_if_needed().await.unwrap_err();
        assert_eq!(
            err,
            DaoError::TableActivationTimeout {
                table: "products".to_string(),
                attempts: dao.config().table_wait_attempts,
            }
        );
    }

    #[tokio::test]
    async fn test_archived_table_fails_without_waiting() {
        let backend = MemoryBackend::new();
        let dao = product_dao_unprovisioned(&backend);
        dao.create_table_if_needed().await.unwrap();
        backend.set_table_status("products", TableStatus::Archived).await;
        let before = describes(&backend).await;

        let err = dao.create_table_if_needed().await.unwrap_err();
        assert_eq!(
            err,
            DaoError::TableUnusable {
                table: "products".to_string(),
                status: TableStatus::Archived,
            }
        );
        assert_eq!(describes(&backend).await, before + 1);
    }

    #[tokio::test]
    async fn test_unknown_status_is_waited_on() {
        let backend = MemoryBackend::new();
        let dao = product_dao_unprovisioned(&backend);
        dao.create_table_if_needed().await.unwrap();
        backend.set_table_status("products", TableStatus::Unknown).await;

        let err = dao.create_table_if_needed().await.unwrap_err();
        assert!(matches!(err, DaoError::TableActivationTimeout { .. }));
    }
}
