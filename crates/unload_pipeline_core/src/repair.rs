use rand::Rng;
use serde::Serialize;

use crate::dataset::ANALYTICS_BUCKET;

pub const DEFAULT_CATALOG_DATABASE: &str = "farenet_s3";
pub const DEFAULT_WORK_GROUP: &str = "primary";

/// A `MSCK REPAIR TABLE` submission for the managed query service.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RepairRequest {
    pub table: String,
    pub query_string: String,
    pub client_request_token: String,
    pub database: String,
    pub output_location: String,
    pub work_group: String,
}

impl RepairRequest {
    /// Request against the default catalog database and work-group, with
    /// results written under the invoking function's scratch prefix.
    pub fn new(table: &str, function_name: &str, client_request_token: String) -> Self {
        Self {
            table: table.to_string(),
            query_string: format!("MSCK REPAIR TABLE {table};"),
            client_request_token,
            database: DEFAULT_CATALOG_DATABASE.to_string(),
            output_location: repair_output_location(function_name, table),
            work_group: DEFAULT_WORK_GROUP.to_string(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_work_group(mut self, work_group: impl Into<String>) -> Self {
        self.work_group = work_group.into();
        self
    }
}

pub fn repair_output_location(function_name: &str, table: &str) -> String {
    format!(
        "{ANALYTICS_BUCKET}/athena-temp-outputs/{function_name}/add-partition/{table}/results/"
    )
}

/// `<table>-<random>`; distinct per submission so retried invocations are
/// not deduplicated against each other.
pub fn idempotency_token(table: &str, rng: &mut impl Rng) -> String {
    format!("{table}-{:016x}", rng.gen::<u64>())
}
