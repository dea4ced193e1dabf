//! MySQL client implementation
//!
//! This module provides the pooled connection handling for a MySQL or
//! MariaDB source database.

use crate::config::schema::DatabaseConfig;
use crate::domain::{DataSourceError, Result, RowshipError};
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use sqlx::Executor;
use std::time::Duration;

/// MySQL client for rowship
///
/// Like the PostgreSQL client the pool holds one connection, pinged before
/// every checkout. Building the client does not connect.
pub struct MySqlClient {
    /// Connection pool
    pool: MySqlPool,

    /// Endpoint description without credentials
    endpoint: String,
}

impl MySqlClient {
    /// Create a new MySQL client
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS mode is not supported.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let options = build_connect_options(config)?;
        let statement_timeout_seconds = config.statement_timeout_seconds;

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if statement_timeout_seconds == 0 {
                        return Ok(());
                    }

                    let sql = format!(
                        "SET SESSION max_execution_time = {}",
                        statement_timeout_seconds.saturating_mul(1000)
                    );
                    if let Err(e) = (&mut *conn).execute(sql.as_str()).await {
                        // MariaDB spells it max_statement_time, in seconds
                        tracing::debug!(error = %e, "Falling back to max_statement_time");
                        let sql =
                            format!("SET SESSION max_statement_time = {statement_timeout_seconds}");
                        conn.execute(sql.as_str()).await?;
                    }
                    Ok(())
                })
            })
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            endpoint: config.endpoint(),
        })
    }

    /// Test the connection to MySQL
    pub async fn test_connection(&self) -> Result<()> {
        sqlx::raw_sql("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DataSourceError::QueryFailed(format!("Connection test failed: {e}")))?;

        tracing::info!(endpoint = %self.endpoint, "MySQL connection test successful");
        Ok(())
    }

    /// The connection pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Close the pool, waiting for the checked-out connection to return
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!(endpoint = %self.endpoint, "MySQL pool closed");
    }

    /// Get the endpoint description (without credentials)
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Build the driver options from rowship settings
///
/// A configured `socket_path` replaces `host` and `port`. The session
/// character set is always utf8mb4.
fn build_connect_options(config: &DatabaseConfig) -> Result<MySqlConnectOptions> {
    let mut options = MySqlConnectOptions::new()
        .username(&config.username)
        .database(&config.database_name)
        .charset("utf8mb4");

    options = match config.socket() {
        Some(path) => options.socket(path),
        None => options.host(&config.host).port(config.port()),
    };

    if let Some(password) = &config.password {
        let password: &str = password.expose_secret().as_ref();
        options = options.password(password);
    }

    let ssl_mode = match config.ssl_mode.as_str() {
        "disable" => MySqlSslMode::Disabled,
        "prefer" => MySqlSslMode::Preferred,
        "require" => MySqlSslMode::Required,
        other => {
            return Err(RowshipError::Configuration(format!(
                "Unsupported database.ssl_mode '{other}'"
            )))
        }
    };

    Ok(options.ssl_mode(ssl_mode))
}
