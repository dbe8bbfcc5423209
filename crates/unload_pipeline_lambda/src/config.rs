use std::str::FromStr;
use std::time::Duration;

use unload_pipeline_core::dataset::DatasetKind;
use unload_pipeline_core::poll::{PollPolicy, DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS};
use unload_pipeline_core::repair::{DEFAULT_CATALOG_DATABASE, DEFAULT_WORK_GROUP};

use crate::error::ConfigError;

pub const FUNCTION_NAME_VAR: &str = "AWS_LAMBDA_FUNCTION_NAME";
pub const DATASET_VAR: &str = "PIPELINE_DATASET";
pub const CATALOG_DATABASE_VAR: &str = "CATALOG_DATABASE";
pub const WORK_GROUP_VAR: &str = "ATHENA_WORK_GROUP";
pub const POLL_MAX_ATTEMPTS_VAR: &str = "REPAIR_POLL_MAX_ATTEMPTS";
pub const POLL_INTERVAL_MS_VAR: &str = "REPAIR_POLL_INTERVAL_MS";
pub const POLL_TIMEOUT_MS_VAR: &str = "REPAIR_POLL_TIMEOUT_MS";
pub const REPAIR_POLICY_VAR: &str = "REPAIR_POLICY";
pub const FAIL_ON_ERROR_VAR: &str = "FAIL_ON_ERROR";
pub const WAREHOUSE_URL_VAR: &str = "WAREHOUSE_URL";

/// Whether partition repair depends on the UNLOAD outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepairPolicy {
    /// Repair after every invocation, even when the UNLOAD failed.
    #[default]
    Always,
    OnUnloadSuccess,
}

impl FromStr for RepairPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "on_unload_success" | "on-unload-success" => Ok(Self::OnUnloadSuccess),
            _ => Err("expected 'always' or 'on_unload_success'".to_string()),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct PipelineConfig {
    pub function_name: String,
    pub dataset: DatasetKind,
    pub catalog_database: String,
    pub work_group: String,
    pub poll_policy: PollPolicy,
    pub repair_policy: RepairPolicy,
    pub fail_on_error: bool,
    pub warehouse_url: Option<String>,
}

// Hand-written so the warehouse URL, which may embed a password, never
// reaches the logs.
impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("function_name", &self.function_name)
            .field("dataset", &self.dataset)
            .field("catalog_database", &self.catalog_database)
            .field("work_group", &self.work_group)
            .field("poll_policy", &self.poll_policy)
            .field("repair_policy", &self.repair_policy)
            .field("fail_on_error", &self.fail_on_error)
            .field("warehouse_url", &self.warehouse_url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let function_name = get(FUNCTION_NAME_VAR).ok_or(ConfigError::Missing(FUNCTION_NAME_VAR))?;
        let dataset = parse_or(get(DATASET_VAR), DATASET_VAR, DatasetKind::Search)?;

        let max_attempts = parse_or(
            get(POLL_MAX_ATTEMPTS_VAR),
            POLL_MAX_ATTEMPTS_VAR,
            DEFAULT_MAX_ATTEMPTS,
        )?;
        let interval_ms = parse_or(
            get(POLL_INTERVAL_MS_VAR),
            POLL_INTERVAL_MS_VAR,
            DEFAULT_INTERVAL.as_millis() as u64,
        )?;
        let timeout_ms = get(POLL_TIMEOUT_MS_VAR)
            .map(|value| parse_value::<u64>(&value, POLL_TIMEOUT_MS_VAR))
            .transpose()?;
        let poll_policy = PollPolicy::new(
            max_attempts,
            Duration::from_millis(interval_ms),
            timeout_ms.map(Duration::from_millis),
        )
        .map_err(|error| ConfigError::Invalid {
            name: POLL_MAX_ATTEMPTS_VAR,
            value: max_attempts.to_string(),
            reason: error.to_string(),
        })?;

        let repair_policy =
            parse_or(get(REPAIR_POLICY_VAR), REPAIR_POLICY_VAR, RepairPolicy::Always)?;

        Ok(Self {
            function_name,
            dataset,
            catalog_database: get(CATALOG_DATABASE_VAR)
                .unwrap_or_else(|| DEFAULT_CATALOG_DATABASE.to_string()),
            work_group: get(WORK_GROUP_VAR).unwrap_or_else(|| DEFAULT_WORK_GROUP.to_string()),
            poll_policy,
            repair_policy,
            fail_on_error: parse_or(get(FAIL_ON_ERROR_VAR), FAIL_ON_ERROR_VAR, false)?,
            warehouse_url: get(WAREHOUSE_URL_VAR),
        })
    }
}

fn parse_or<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => parse_value(&value, name),
        None => Ok(default),
    }
}

fn parse_value<T>(value: &str, name: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|error| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: error.to_string(),
    })
}
