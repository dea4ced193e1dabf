//! PostgreSQL client implementation
//!
//! This module provides the pooled connection handling for the source
//! database.

use crate::config::schema::DatabaseConfig;
use crate::domain::{DataSourceError, Result, RowshipError};
use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::NoTls;

/// PostgreSQL client for rowship
///
/// A run reads pages strictly one after another, so the pool holds a single
/// connection. Each checkout is verified with a round trip before use, which
/// also keeps the session alive between pages.
pub struct PostgreSQLClient {
    /// Connection pool
    pool: Pool,

    /// Endpoint description without credentials
    endpoint: String,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// # Arguments
    ///
    /// * `config` - Database configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS connector or the pool cannot be created.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pg_config = build_pg_config(config)?;
        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Verified,
        };

        // Create manager
        let manager = match config.ssl_mode.as_str() {
            "disable" => Manager::from_config(pg_config, NoTls, manager_config),
            _ => {
                let connector = native_tls::TlsConnector::builder().build().map_err(|e| {
                    RowshipError::Configuration(format!("Failed to build TLS connector: {e}"))
                })?;
                Manager::from_config(pg_config, MakeTlsConnector::new(connector), manager_config)
            }
        };

        let timeout = Duration::from_secs(config.connection_timeout_seconds);

        // Create pool
        let pool = Pool::builder(manager)
            .max_size(1)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| {
                DataSourceError::ConnectionFailed(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self {
            pool,
            endpoint: config.endpoint(),
        })
    }

    /// Test the connection to PostgreSQL
    ///
    /// Attempts to get a connection from the pool and execute a simple query.
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| DataSourceError::QueryFailed(format!("Connection test failed: {e}")))?;

        tracing::info!(endpoint = %self.endpoint, "PostgreSQL connection test successful");
        Ok(())
    }

    /// Get a connection from the pool
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be obtained.
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| classify_pool_error(e).into())
    }

    /// Close the pool, dropping idle connections
    pub fn close(&self) {
        self.pool.close();
        tracing::debug!(endpoint = %self.endpoint, "PostgreSQL pool closed");
    }

    /// Get the endpoint description (without credentials)
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Build the driver configuration from rowship settings
///
/// A configured `socket_dir` replaces `host`; tokio-postgres treats a host
/// starting with `/` as a Unix socket directory.
fn build_pg_config(config: &DatabaseConfig) -> Result<tokio_postgres::Config> {
    let mut pg = tokio_postgres::Config::new();

    match config.socket() {
        Some(dir) => pg.host(dir),
        None => pg.host(&config.host),
    };

    pg.port(config.port())
        .user(&config.username)
        .dbname(&config.database_name)
        .application_name("rowship")
        .connect_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .keepalives(true)
        .keepalives_idle(Duration::from_secs(config.keepalive_idle_seconds.max(1)));

    if let Some(password) = &config.password {
        let password: &str = password.expose_secret().as_ref();
        pg.password(password);
    }

    if config.statement_timeout_seconds > 0 {
        pg.options(&format!(
            "-c statement_timeout={}",
            config.statement_timeout_seconds.saturating_mul(1000)
        ));
    }

    let ssl_mode = match config.ssl_mode.as_str() {
        "disable" => SslMode::Disable,
        "require" => SslMode::Require,
        "prefer" => SslMode::Prefer,
        other => {
            return Err(RowshipError::Configuration(format!(
                "Unsupported database.ssl_mode '{other}'"
            )))
        }
    };
    pg.ssl_mode(ssl_mode);

    Ok(pg)
}

fn classify_pool_error(err: PoolError) -> DataSourceError {
    match err {
        PoolError::Timeout(kind) => {
            DataSourceError::Timeout(format!("Timed out acquiring a connection ({kind:?})"))
        }
        other => {
            DataSourceError::ConnectionFailed(format!("Failed to get connection from pool: {other}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn db_config() -> DatabaseConfig {
        DatabaseConfig {
            host: "db.internal".to_string(),
            username: "exporter".to_string(),
            password: Some(secret_string("password".to_string())),
            database_name: "crm".to_string(),
            table: "timeline".to_string(),
            ..DatabaseConfig::default()
        }
    }

    #[test]
    fn test_build_pg_config_tcp() {
        let pg = build_pg_config(&db_config()).unwrap();

        assert_eq!(pg.get_user(), Some("exporter"));
        assert_eq!(pg.get_dbname(), Some("crm"));
        assert_eq!(pg.get_ports(), &[5432]);
        assert_eq!(
            pg.get_hosts(),
            &[tokio_postgres::config::Host::Tcp("db.internal".to_string())]
        );
        assert_eq!(pg.get_options(), Some("-c statement_timeout=60000"));
        assert_eq!(pg.get_connect_timeout(), Some(&Duration::from_secs(30)));
        assert!(pg.get_keepalives());
        assert_eq!(pg.get_ssl_mode(), SslMode::Prefer);
    }

    #[test]
    fn test_build_pg_config_huge_statement_timeout_saturates() {
        let mut config = db_config();
        config.statement_timeout_seconds = u64::MAX;

        let pg = build_pg_config(&config).unwrap();
        assert_eq!(
            pg.get_options(),
            Some(format!("-c statement_timeout={}", u64::MAX).as_str())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_build_pg_config_socket() {
        let mut config = db_config();
        config.socket_dir = Some("/var/run/postgresql".to_string());

        let pg = build_pg_config(&config).unwrap();
        assert!(matches!(
            pg.get_hosts().first(),
            Some(tokio_postgres::config::Host::Unix(_))
        ));
    }

    #[test]
    fn test_build_pg_config_rejects_unknown_ssl_mode() {
        let mut config = db_config();
        config.ssl_mode = "verify-full".to_string();
        assert!(matches!(
            build_pg_config(&config),
            Err(RowshipError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_endpoint_has_no_credentials() {
        let mut config = db_config();
        config.ssl_mode = "disable".to_string();

        // Building the pool does not connect
        let client = PostgreSQLClient::new(&config).await.unwrap();
        assert_eq!(client.endpoint(), "db.internal:5432/crm");
        assert!(!client.endpoint().contains("password"));
    }
}
