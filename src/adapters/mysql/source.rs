//! MySQL row source
//!
//! Pages are read with the text protocol, so every column arrives as its
//! textual rendering whatever its SQL type, the same shape the PostgreSQL
//! source produces.

use crate::adapters::database::traits::RowSource;
use crate::adapters::mysql::client::MySqlClient;
use crate::domain::{DataSourceError, Field, Page, Result, Row, RowId};
use async_trait::async_trait;
use sqlx::mysql::{MySqlDatabaseError, MySqlRow};
use sqlx::{Column as _, Row as _};

/// Server error numbers that mean the statement ran out of time
const TIMEOUT_ERRORS: &[u16] = &[
    1317, // ER_QUERY_INTERRUPTED
    1969, // ER_STATEMENT_TIMEOUT (MariaDB)
    3024, // ER_QUERY_TIMEOUT
];

/// Keyset paginator over one MySQL table
pub struct MySqlRowSource {
    client: MySqlClient,
    table: String,
    id_column: String,
    quoted_table: String,
    quoted_id: String,
}

impl MySqlRowSource {
    /// Create a row source for `table` (optionally `database.table`) keyed by
    /// `id_column`
    pub fn new(client: MySqlClient, table: &str, id_column: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            id_column: id_column.to_string(),
            quoted_table: quote_qualified(table),
            quoted_id: quote_identifier(id_column),
        }
    }

    /// SQL for the page after `lower_bound`
    fn page_query(&self, lower_bound: RowId, limit: usize) -> String {
        format!(
            "SELECT * FROM {table} WHERE {id} > {lower} ORDER BY {id} ASC LIMIT {limit}",
            table = self.quoted_table,
            id = self.quoted_id,
            lower = lower_bound.value(),
            limit = limit,
        )
    }
}

#[async_trait]
impl RowSource for MySqlRowSource {
    async fn next_page(&self, lower_bound: RowId, limit: usize) -> Result<Page> {
        let sql = self.page_query(lower_bound, limit);

        let fetched = sqlx::raw_sql(&sql)
            .fetch_all(self.client.pool())
            .await
            .map_err(classify_query_error)?;

        let mut rows = Vec::with_capacity(fetched.len());
        for row in &fetched {
            rows.push(Row::from_fields(&self.id_column, row_fields(row)?)?);
        }

        tracing::debug!(
            table = %self.table,
            lower_bound = %lower_bound,
            limit = limit,
            fetched = rows.len(),
            "Fetched page"
        );

        Ok(Page::new(rows))
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    fn describe(&self) -> String {
        format!("mysql://{}/{}", self.client.endpoint(), self.table)
    }

    async fn close(&self) {
        self.client.close().await;
    }
}

/// Columns of a text-protocol row as fields
fn row_fields(row: &MySqlRow) -> Result<Vec<Field>> {
    row.columns()
        .iter()
        .map(|column| {
            let raw: Option<Vec<u8>> = row.try_get_unchecked(column.ordinal()).map_err(|e| {
                DataSourceError::QueryFailed(format!("Column '{}': {e}", column.name()))
            })?;
            Ok(Field::new(column.name(), raw.map(text_value)))
        })
        .collect()
}

/// Text rendering of a column value
///
/// Binary columns that are not valid UTF-8 are exported lossily.
fn text_value(raw: Vec<u8>) -> String {
    match String::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

fn classify_query_error(err: sqlx::Error) -> DataSourceError {
    match err {
        sqlx::Error::PoolTimedOut => {
            DataSourceError::Timeout("Timed out acquiring a connection".to_string())
        }
        sqlx::Error::Io(e) => DataSourceError::ConnectionFailed(format!("Connection lost: {e}")),
        sqlx::Error::Tls(e) => DataSourceError::ConnectionFailed(format!("TLS failure: {e}")),
        sqlx::Error::PoolClosed => DataSourceError::ConnectionFailed("Pool closed".to_string()),
        sqlx::Error::Database(db) => {
            let number = db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlDatabaseError::number);
            match number {
                Some(n) if TIMEOUT_ERRORS.contains(&n) => {
                    DataSourceError::Timeout(format!("Statement cancelled: {}", db.message()))
                }
                _ => DataSourceError::QueryFailed(db.message().to_string()),
            }
        }
        other => DataSourceError::QueryFailed(other.to_string()),
    }
}

/// Quote a single MySQL identifier
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a possibly database-qualified table name part by part
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{DatabaseConfig, DatabaseEngine};

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("id"), "`id`");
        assert_eq!(quote_identifier("odd`name"), "`odd``name`");
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(quote_qualified("b_crm_timeline"), "`b_crm_timeline`");
        assert_eq!(quote_qualified("crm.b_crm_timeline"), "`crm`.`b_crm_timeline`");
    }

    #[tokio::test]
    async fn test_page_query() {
        let config = DatabaseConfig {
            engine: DatabaseEngine::MySQL,
            socket_path: Some("/var/lib/mysql/mysql.sock".to_string()),
            username: "exporter".to_string(),
            database_name: "crm".to_string(),
            table: "b_crm_timeline".to_string(),
            ..Default::default()
        };
        let client = MySqlClient::new(&config).await.unwrap();
        let source = MySqlRowSource::new(client, &config.table, "ID");

        assert_eq!(
            source.page_query(RowId::ZERO, 5000),
            "SELECT * FROM `b_crm_timeline` WHERE `ID` > 0 ORDER BY `ID` ASC LIMIT 5000"
        );
        assert_eq!(
            source.page_query(RowId::new(10000), 2500),
            "SELECT * FROM `b_crm_timeline` WHERE `ID` > 10000 ORDER BY `ID` ASC LIMIT 2500"
        );
        assert_eq!(
            source.describe(),
            "mysql://unix:/var/lib/mysql/mysql.sock/crm/b_crm_timeline"
        );
    }

    #[test]
    fn test_text_value() {
        assert_eq!(text_value(b"2025-01-01 00:00:00".to_vec()), "2025-01-01 00:00:00");
        assert_eq!(text_value("naïve".as_bytes().to_vec()), "naïve");
        assert_eq!(text_value(vec![b'a', 0xff, b'b']), "a\u{fffd}b");
    }

    #[test]
    fn test_classify_query_error() {
        assert!(matches!(
            classify_query_error(sqlx::Error::PoolTimedOut),
            DataSourceError::Timeout(_)
        ));

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(matches!(
            classify_query_error(sqlx::Error::Io(io)),
            DataSourceError::ConnectionFailed(_)
        ));

        assert!(matches!(
            classify_query_error(sqlx::Error::RowNotFound),
            DataSourceError::QueryFailed(_)
        ));
    }
}
