pub mod bigquery;
pub mod sqlite;

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::Amenities;
use crate::normalize::{Row, Table};

#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Transient; worth retrying.
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("permission denied: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Destination for normalized tables. Constructed by the caller and passed in.
#[allow(async_fn_in_trait)]
pub trait Warehouse {
    /// Create `table_id` with `schema`; succeeds if it already exists.
    async fn create_table(&self, table_id: &str, schema: &[SchemaField]) -> Result<(), WarehouseError>;
    async fn insert_rows(&self, table_id: &str, rows: &[Value]) -> Result<(), WarehouseError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SchemaField>,
}

impl SchemaField {
    fn new(name: &'static str, kind: &'static str) -> Self {
        Self { name, kind, fields: Vec::new() }
    }
}

/// Schema shared by the rentals and sales tables.
pub fn schema() -> Vec<SchemaField> {
    let string = |name| SchemaField::new(name, "STRING");
    let float = |name| SchemaField::new(name, "FLOAT");
    vec![
        string("LINK"),
        string("TIPO_INMUEBLE"),
        string("TIPO_NEGOCIO"),
        string("HABITACIONES"),
        string("BANIOS"),
        float("PRECIO"),
        float("AREA"),
        string("CONTACTO"),
        string("DIRECCION"),
        string("CIUDAD"),
        string("BARRIO"),
        string("SECTOR"),
        string("DEPARTAMENTO"),
        SchemaField {
            name: "OTRAS_CARACTERISTICAS",
            kind: "RECORD",
            fields: vec![string("ESTRATO"), string("CLOSET"), string("GARAJE")],
        },
        string("IMAGENES"),
    ]
}

/// Wire shape of a row: column name -> value, images as a JSON string.
pub fn row_json(row: &Row) -> Value {
    let characteristics = match &row.amenities {
        Amenities::Structured(c) => serde_json::to_value(c).unwrap_or(Value::Null),
        Amenities::Text(_) => {
            warn!("Unparsed OTRAS_CARACTERISTICAS for {} loaded as null", row.link);
            Value::Null
        }
    };
    json!({
        "LINK": row.link,
        "TIPO_INMUEBLE": row.property_type,
        "TIPO_NEGOCIO": row.business_type.label(),
        "HABITACIONES": row.rooms,
        "BANIOS": row.bathrooms,
        "PRECIO": row.price,
        "AREA": row.area,
        "CONTACTO": row.contact,
        "DIRECCION": row.address,
        "CIUDAD": row.city,
        "BARRIO": row.neighborhood,
        "SECTOR": row.sector,
        "DEPARTAMENTO": row.department,
        "OTRAS_CARACTERISTICAS": characteristics,
        "IMAGENES": serde_json::to_string(&row.images).unwrap_or_default(),
    })
}

/// Bounded exponential backoff for transient upload failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_millis(2000) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub table_id: String,
    pub chunks: usize,
    pub loaded_chunks: usize,
    pub rows_loaded: usize,
    /// Logged failure that stopped the load, if any.
    pub failed: Option<String>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none() && self.loaded_chunks == self.chunks
    }
}

pub async fn load(
    warehouse: &impl Warehouse,
    table: &Table,
    table_id: &str,
    chunk_size: usize,
) -> Result<LoadReport, WarehouseError> {
    load_with(warehouse, table, table_id, chunk_size, RetryPolicy::default()).await
}

/// Create the table, then upload `chunk_size` rows at a time, each chunk
/// awaited before the next. Service and permission failures are logged and
/// reported; anything else propagates.
pub async fn load_with(
    warehouse: &impl Warehouse,
    table: &Table,
    table_id: &str,
    chunk_size: usize,
    policy: RetryPolicy,
) -> Result<LoadReport, WarehouseError> {
    let chunk_size = chunk_size.max(1);
    let mut report = LoadReport {
        table_id: table_id.to_string(),
        chunks: table.len().div_ceil(chunk_size),
        loaded_chunks: 0,
        rows_loaded: 0,
        failed: None,
    };
    info!("Loading {} rows into {}", table.len(), table_id);

    if let Err(e) = warehouse.create_table(table_id, &schema()).await {
        return give_up(report, e);
    }
    info!("Table {} created or already exists", table_id);

    for (i, chunk) in table.rows.chunks(chunk_size).enumerate() {
        let start = i * chunk_size;
        info!(
            "Loading batch {} of {}, rows {} to {}",
            i + 1,
            report.chunks,
            start,
            start + chunk.len()
        );
        let rows: Vec<Value> = chunk.iter().map(row_json).collect();
        if let Err(e) = insert_with_retry(warehouse, table_id, &rows, policy).await {
            return give_up(report, e);
        }
        report.loaded_chunks += 1;
        report.rows_loaded += chunk.len();
        info!("Batch {} loaded", i + 1);
    }

    Ok(report)
}

async fn insert_with_retry(
    warehouse: &impl Warehouse,
    table_id: &str,
    rows: &[Value],
    policy: RetryPolicy,
) -> Result<(), WarehouseError> {
    let mut attempt = 0;
    loop {
        match warehouse.insert_rows(table_id, rows).await {
            Err(WarehouseError::Unavailable(msg)) if attempt < policy.max_retries => {
                let backoff = policy.base_delay * 2u32.pow(attempt);
                attempt += 1;
                warn!(
                    "Service error loading {} ({}), retry {}/{} in {:.1}s",
                    table_id,
                    msg,
                    attempt,
                    policy.max_retries,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
            }
            result => return result,
        }
    }
}

fn give_up(mut report: LoadReport, e: WarehouseError) -> Result<LoadReport, WarehouseError> {
    match e {
        WarehouseError::Unavailable(_) => {
            error!("Service error loading {}: {}", report.table_id, e);
        }
        WarehouseError::Forbidden(_) => {
            error!("Permission error on {}: {}. Check the project permissions", report.table_id, e);
        }
        WarehouseError::Other(_) => return Err(e),
    }
    report.failed = Some(e.to_string());
    Ok(report)
}
