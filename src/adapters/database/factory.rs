//! Row source factory
//!
//! This module provides the factory function that builds the row source for
//! the configured database engine.

use crate::adapters::database::traits::RowSource;
use crate::adapters::mysql::client::MySqlClient;
use crate::adapters::mysql::source::MySqlRowSource;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::source::PostgreSQLRowSource;
use crate::config::schema::{DatabaseConfig, DatabaseEngine};
use crate::domain::Result;
use std::sync::Arc;

/// Create the row source for the configured database
///
/// This factory function examines `database.engine` and builds the matching
/// implementation. No connection is opened here; the first page (or
/// [`RowSource::test_connection`]) connects.
///
/// # Errors
///
/// Returns an error if the driver settings are invalid or the connection
/// pool cannot be built.
pub async fn create_row_source(config: &DatabaseConfig) -> Result<Arc<dyn RowSource>> {
    match config.engine {
        DatabaseEngine::PostgreSQL => {
            tracing::info!(endpoint = %config.endpoint(), "Creating PostgreSQL row source");
            let client = PostgreSQLClient::new(config).await?;
            let source = PostgreSQLRowSource::new(client, &config.table, &config.id_column);

            Ok(Arc::new(source) as Arc<dyn RowSource>)
        }
        DatabaseEngine::MySQL => {
            tracing::info!(endpoint = %config.endpoint(), "Creating MySQL row source");
            let client = MySqlClient::new(config).await?;
            let source = MySqlRowSource::new(client, &config.table, &config.id_column);

            Ok(Arc::new(source) as Arc<dyn RowSource>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_config(engine: DatabaseEngine) -> DatabaseConfig {
        DatabaseConfig {
            engine,
            host: "db.internal".to_string(),
            username: "exporter".to_string(),
            database_name: "crm".to_string(),
            table: "timeline".to_string(),
            ssl_mode: "disable".to_string(),
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn test_factory_selects_engine() {
        let source = create_row_source(&db_config(DatabaseEngine::PostgreSQL))
            .await
            .unwrap();
        assert_eq!(source.describe(), "postgresql://db.internal:5432/crm/timeline");

        let source = create_row_source(&db_config(DatabaseEngine::MySQL))
            .await
            .unwrap();
        assert_eq!(source.describe(), "mysql://db.internal:3306/crm/timeline");
    }
}
