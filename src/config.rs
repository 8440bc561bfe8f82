use std::time::Duration;

use anyhow::{Context, Result};
use ::config::Environment;
use serde::Deserialize;

pub const BASE_URL: &str = "https://www.arrendamientossantafe.com";
pub const PAGES_PATH: &str = "/propiedades/?page=";
pub const START_PAGE: u32 = 1;
pub const MAX_PAGE: u32 = 10;
pub const TABLE_RENTALS: &str = "deimox-dw.pruebas.arriendos";
pub const TABLE_SALES: &str = "deimox-dw.pruebas.ventas";
pub const CHUNK_SIZE: usize = 1000;

pub const COURTESY_PAUSE: Duration = Duration::from_secs(1);
pub const TIMEOUT: Duration = Duration::from_secs(50);
pub const FETCH_RETRIES: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

const ENV_PREFIX: &str = "SANTAFE";

/// Run settings. Defaults are the constants above; `SANTAFE_*` env vars override.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub pages_path: String,
    pub start_page: u32,
    pub max_page: u32,
    pub table_rentals: String,
    pub table_sales: String,
    pub chunk_size: usize,
    #[serde(default)]
    pub bigquery_token: Option<String>,
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: Environment) -> Result<Self> {
        ::config::Config::builder()
            .set_default("base_url", BASE_URL)?
            .set_default("pages_path", PAGES_PATH)?
            .set_default("start_page", START_PAGE as i64)?
            .set_default("max_page", MAX_PAGE as i64)?
            .set_default("table_rentals", TABLE_RENTALS)?
            .set_default("table_sales", TABLE_SALES)?
            .set_default("chunk_size", CHUNK_SIZE as i64)?
            .add_source(env.try_parsing(true))
            .build()
            .context("Failed to build settings")?
            .try_deserialize()
            .context("Invalid settings")
    }
}
