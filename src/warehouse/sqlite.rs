use anyhow::Context;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode};
use serde_json::Value;

use super::{SchemaField, Warehouse, WarehouseError};
use crate::normalize::COLUMNS;

/// Local stand-in for the cloud warehouse. Nested records and the image list
/// are stored as JSON text.
pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    #[cfg(test)]
    pub fn count(&self, table_id: &str) -> anyhow::Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table_name(table_id));
        Ok(self.conn.query_row(&sql, [], |r| r.get(0))?)
    }
}

/// "deimox-dw.pruebas.ventas" -> "deimox_dw_pruebas_ventas"
fn table_name(table_id: &str) -> String {
    table_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn column_type(field: &SchemaField) -> &'static str {
    match field.kind {
        "FLOAT" => "REAL",
        _ => "TEXT",
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Number(n) => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        other => SqlValue::Text(other.to_string()),
    }
}

fn classify(e: rusqlite::Error) -> WarehouseError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            WarehouseError::Unavailable(e.to_string())
        }
        Some(ErrorCode::PermissionDenied) | Some(ErrorCode::ReadOnly) => {
            WarehouseError::Forbidden(e.to_string())
        }
        _ => WarehouseError::Other(e.into()),
    }
}

impl Warehouse for SqliteWarehouse {
    async fn create_table(&self, table_id: &str, schema: &[SchemaField]) -> Result<(), WarehouseError> {
        let columns: Vec<String> = schema
            .iter()
            .map(|f| format!("{} {}", f.name, column_type(f)))
            .collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                id        INTEGER PRIMARY KEY,
                {},
                loaded_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            table_name(table_id),
            columns.join(",\n                ")
        );
        self.conn.execute_batch(&sql).map_err(classify)
    }

    async fn insert_rows(&self, table_id: &str, rows: &[Value]) -> Result<(), WarehouseError> {
        let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            table_name(table_id),
            COLUMNS.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.unchecked_transaction().map_err(classify)?;
        {
            let mut stmt = tx.prepare(&sql).map_err(classify)?;
            for row in rows {
                let values = COLUMNS.iter().map(|c| to_sql(&row[*c]));
                stmt.execute(rusqlite::params_from_iter(values)).map_err(classify)?;
            }
        }
        tx.commit().map_err(classify)
    }
}
