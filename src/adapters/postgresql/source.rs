//! PostgreSQL row source
//!
//! Pages are read with a keyset query over the identifier column using the
//! simple-query protocol, which returns every column as text whatever its
//! SQL type. That keeps the exporter schema-agnostic.

use crate::adapters::database::traits::RowSource;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::domain::{DataSourceError, Field, Page, Result, Row, RowId};
use async_trait::async_trait;
use tokio_postgres::error::SqlState;
use tokio_postgres::SimpleQueryMessage;

/// Keyset paginator over one PostgreSQL table
pub struct PostgreSQLRowSource {
    client: PostgreSQLClient,
    table: String,
    id_column: String,
    quoted_table: String,
    quoted_id: String,
}

impl PostgreSQLRowSource {
    /// Create a row source for `table` (optionally `schema.table`) keyed by
    /// `id_column`
    pub fn new(client: PostgreSQLClient, table: &str, id_column: &str) -> Self {
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
impl RowSource for PostgreSQLRowSource {
    async fn next_page(&self, lower_bound: RowId, limit: usize) -> Result<Page> {
        let sql = self.page_query(lower_bound, limit);
        let conn = self.client.get_connection().await?;

        let messages = conn
            .simple_query(&sql)
            .await
            .map_err(classify_query_error)?;

        let mut rows = Vec::with_capacity(limit.min(messages.len()));
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let fields = row
                    .columns()
                    .iter()
                    .enumerate()
                    .map(|(i, column)| Field::new(column.name(), row.get(i).map(str::to_string)))
                    .collect();
                rows.push(Row::from_fields(&self.id_column, fields)?);
            }
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
        format!("postgresql://{}/{}", self.client.endpoint(), self.table)
    }

    async fn close(&self) {
        self.client.close();
    }
}

fn classify_query_error(err: tokio_postgres::Error) -> DataSourceError {
    if err.is_closed() {
        return DataSourceError::ConnectionFailed(format!("Connection closed: {err}"));
    }

    if err.code() == Some(&SqlState::QUERY_CANCELED) {
        return DataSourceError::Timeout(format!("Statement cancelled: {err}"));
    }

    let message = err
        .as_db_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| err.to_string());
    DataSourceError::QueryFailed(message)
}

/// Quote a single SQL identifier
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified table name part by part
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("id"), "\"id\"");
        assert_eq!(quote_identifier("Weird\"Name"), "\"Weird\"\"Name\"");
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(quote_qualified("timeline"), "\"timeline\"");
        assert_eq!(quote_qualified("crm.timeline"), "\"crm\".\"timeline\"");
    }

    #[tokio::test]
    async fn test_page_query() {
        let config = crate::config::DatabaseConfig {
            host: "db.internal".to_string(),
            username: "exporter".to_string(),
            database_name: "crm".to_string(),
            table: "crm.timeline".to_string(),
            ssl_mode: "disable".to_string(),
            ..Default::default()
        };
        let client = PostgreSQLClient::new(&config).await.unwrap();
        let source = PostgreSQLRowSource::new(client, &config.table, "id");

        assert_eq!(
            source.page_query(RowId::new(5000), 5000),
            "SELECT * FROM \"crm\".\"timeline\" WHERE \"id\" > 5000 ORDER BY \"id\" ASC LIMIT 5000"
        );
        assert_eq!(source.describe(), "postgresql://db.internal:5432/crm/crm.timeline");
    }
}
