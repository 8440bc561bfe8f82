use anyhow::anyhow;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{SchemaField, Warehouse, WarehouseError};
use crate::config::TIMEOUT;

const API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// BigQuery over its REST API, authenticated with an OAuth bearer token.
pub struct BigQuery {
    client: Client,
    token: String,
}

impl BigQuery {
    pub fn new(token: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self { client, token: token.into() })
    }
}

#[derive(Debug, PartialEq)]
struct TableRef<'a> {
    project: &'a str,
    dataset: &'a str,
    table: &'a str,
}

/// "project.dataset.table"
fn table_ref(table_id: &str) -> Result<TableRef<'_>, WarehouseError> {
    let parts: Vec<&str> = table_id.split('.').collect();
    match parts.as_slice() {
        [project, dataset, table] if parts.iter().all(|p| !p.is_empty()) => Ok(TableRef {
            project,
            dataset,
            table,
        }),
        _ => Err(anyhow!("table id {:?} is not project.dataset.table", table_id).into()),
    }
}

fn from_reqwest(e: reqwest::Error) -> WarehouseError {
    if e.is_timeout() || e.is_connect() {
        WarehouseError::Unavailable(e.to_string())
    } else {
        WarehouseError::Other(e.into())
    }
}

fn classify_status(status: StatusCode, body: String) -> WarehouseError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => WarehouseError::Forbidden(body),
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => WarehouseError::Unavailable(format!("{}: {}", status, body)),
        _ => WarehouseError::Other(anyhow!("{}: {}", status, body)),
    }
}

async fn check(res: Response) -> Result<Response, WarehouseError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(classify_status(status, body))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<Value>,
}

impl Warehouse for BigQuery {
    async fn create_table(&self, table_id: &str, schema: &[SchemaField]) -> Result<(), WarehouseError> {
        let t = table_ref(table_id)?;
        let url = format!("{}/projects/{}/datasets/{}/tables", API_URL, t.project, t.dataset);
        let body = json!({
            "tableReference": {
                "projectId": t.project,
                "datasetId": t.dataset,
                "tableId": t.table,
            },
            "schema": { "fields": schema },
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        if res.status() == StatusCode::CONFLICT {
            debug!("Table {} already exists", table_id);
            return Ok(());
        }
        check(res).await.map(|_| ())
    }

    async fn insert_rows(&self, table_id: &str, rows: &[Value]) -> Result<(), WarehouseError> {
        let t = table_ref(table_id)?;
        let url = format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            API_URL, t.project, t.dataset, t.table
        );
        let rows: Vec<Value> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let link = row["LINK"].as_str().unwrap_or_default();
                json!({ "insertId": format!("{}#{}", link, i), "json": row })
            })
            .collect();

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "rows": rows }))
            .send()
            .await
            .map_err(from_reqwest)?;

        let parsed: InsertAllResponse = check(res).await?.json().await.map_err(from_reqwest)?;
        if !parsed.insert_errors.is_empty() {
            return Err(anyhow!(
                "{} rows rejected by {}: {}",
                parsed.insert_errors.len(),
                table_id,
                Value::Array(parsed.insert_errors)
            )
            .into());
        }
        Ok(())
    }
}
