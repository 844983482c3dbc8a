use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::config::is_safe_identifier;
use crate::join::ResultTable;
use crate::pipeline::ImportError;

/// Output table name; the downstream model command reads `results`.
const TABLE: &str = "results";
const STAGING: &str = "results_staging";
/// Timestamp column name, matching the schema the model command expects.
const TIMESTAMP_COLUMN: &str = "Date";
/// SQLite's conservative bind-parameter limit per statement.
const MAX_BIND_PARAMS: usize = 999;

fn persistence(e: sqlx::Error) -> ImportError {
    ImportError::Persistence {
        detail: e.to_string(),
        source: Some(e),
    }
}

fn invalid(detail: impl Into<String>) -> ImportError {
    ImportError::Persistence {
        detail: detail.into(),
        source: None,
    }
}

/// Open (creating if needed) the destination SQLite database.
pub async fn connect(db_path: &str) -> Result<SqlitePool, ImportError> {
    let uri = format!("sqlite://{db_path}?mode=rwc");
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&uri)
        .await
        .map_err(persistence)
}

/// Writes the joined table into SQLite with replace semantics.
///
/// The whole write happens in one transaction against a staging table that
/// is renamed over the previous `results` at the end, so a failure at any
/// point leaves the prior contents untouched and a rerun on unchanged
/// input produces an identical table.
pub struct SqliteSink {
    pool: SqlitePool,
    batch_rows: usize,
}

impl SqliteSink {
    pub fn new(pool: SqlitePool, batch_rows: usize) -> Self {
        Self { pool, batch_rows }
    }

    pub async fn write(&self, table: &ResultTable) -> Result<(), ImportError> {
        for column in table.load_columns.iter().chain(&table.weather_columns) {
            if !is_safe_identifier(column) {
                return Err(invalid(format!("unsafe output column name '{column}'")));
            }
        }
        let width = table.load_columns.len() + table.weather_columns.len();
        for row in &table.rows {
            if row.loads.len() != table.load_columns.len()
                || row.temperatures.len() != table.weather_columns.len()
            {
                return Err(invalid(format!(
                    "row at {} has wrong width for the declared columns",
                    row.timestamp
                )));
            }
        }

        let mut tx = self.pool.begin().await.map_err(persistence)?;

        sqlx::query(&format!(r#"DROP TABLE IF EXISTS "{STAGING}""#))
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;
        sqlx::query(&self.create_staging_sql(table))
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;

        // Rows per INSERT, bounded by the statement bind limit.
        let binds_per_row = 1 + width;
        let chunk = self
            .batch_rows
            .max(1)
            .min((MAX_BIND_PARAMS / binds_per_row).max(1));

        for batch in table.rows.chunks(chunk) {
            let mut builder = QueryBuilder::<Sqlite>::new(self.insert_prefix(table));
            builder.push_values(batch, |mut b, row| {
                b.push_bind(&row.timestamp);
                for value in &row.loads {
                    b.push_bind(*value);
                }
                for temperature in &row.temperatures {
                    b.push_bind(*temperature);
                }
            });
            builder.build().execute(&mut *tx).await.map_err(persistence)?;
        }

        sqlx::query(&format!(r#"DROP TABLE IF EXISTS "{TABLE}""#))
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;
        sqlx::query(&format!(r#"ALTER TABLE "{STAGING}" RENAME TO "{TABLE}""#))
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;

        tx.commit().await.map_err(persistence)?;

        tracing::info!(rows = table.rows.len(), table = TABLE, "joined table written");
        Ok(())
    }

    fn create_staging_sql(&self, table: &ResultTable) -> String {
        let mut columns = vec![format!(r#""{TIMESTAMP_COLUMN}" TEXT NOT NULL PRIMARY KEY"#)];
        for region in &table.load_columns {
            columns.push(format!(r#""{region}" REAL NOT NULL"#));
        }
        for station in &table.weather_columns {
            columns.push(format!(r#""{station}" REAL"#));
        }
        format!(r#"CREATE TABLE "{STAGING}" ({})"#, columns.join(", "))
    }

    fn insert_prefix(&self, table: &ResultTable) -> String {
        let mut columns = vec![format!(r#""{TIMESTAMP_COLUMN}""#)];
        for column in table.load_columns.iter().chain(&table.weather_columns) {
            columns.push(format!(r#""{column}""#));
        }
        format!(r#"INSERT INTO "{STAGING}" ({}) "#, columns.join(", "))
    }
}
