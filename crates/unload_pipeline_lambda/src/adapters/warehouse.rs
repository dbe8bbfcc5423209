use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Executor, Row};

use crate::error::WarehouseError;

/// One result column; the value is kept only when it decodes as text.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResultCell {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ResultRow {
    pub cells: Vec<ResultCell>,
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>, WarehouseError>;
}

/// Redshift over the Postgres wire protocol. Every call opens its own
/// connection and closes it before returning.
#[derive(Debug, Clone)]
pub struct PgWarehouse {
    options: PgConnectOptions,
}

impl PgWarehouse {
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }

    /// From a connection URL when given, otherwise from the libpq `PG*`
    /// environment variables.
    pub fn from_url_or_env(url: Option<&str>) -> Result<Self, WarehouseError> {
        let options = match url {
            Some(url) => PgConnectOptions::from_str(url).map_err(WarehouseError::Configuration)?,
            None => PgConnectOptions::new(),
        };
        Ok(Self::new(options))
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>, WarehouseError> {
        let mut connection = PgConnection::connect_with(&self.options)
            .await
            .map_err(WarehouseError::Connect)?;

        // UNLOAD goes through the simple query protocol; Redshift does not
        // prepare it.
        let outcome = connection.fetch_all(sqlx::raw_sql(sql)).await;

        if let Err(error) = connection.close().await {
            tracing::warn!(
                component = "warehouse",
                event = "connection_close_failed",
                error = %error,
            );
        }

        let rows = outcome.map_err(WarehouseError::Execute)?;
        Ok(rows.iter().map(result_row).collect())
    }
}

fn result_row(row: &PgRow) -> ResultRow {
    ResultRow {
        cells: row
            .columns()
            .iter()
            .map(|column| ResultCell {
                name: column.name().to_string(),
                value: row
                    .try_get::<Option<String>, _>(column.ordinal())
                    .ok()
                    .flatten(),
            })
            .collect(),
    }
}
