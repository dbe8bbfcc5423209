use thiserror::Error;
use unload_pipeline_core::PipelineError;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("invalid warehouse connection settings: {0}")]
    Configuration(#[source] sqlx::Error),

    #[error("failed to connect to warehouse: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("warehouse statement failed: {0}")]
    Execute(#[source] sqlx::Error),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryServiceError {
    #[error("failed to start query execution: {0}")]
    Submit(String),

    #[error("start query execution response carried no execution id")]
    MissingExecutionId,

    #[error("failed to fetch query execution {query_execution_id}: {message}")]
    Status {
        query_execution_id: String,
        message: String,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),

    #[error("{name}={value} is invalid: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid invocation event: {0}")]
    InvalidEvent(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("unload failed: {0}")]
    Unload(#[source] WarehouseError),

    #[error("partition repair failed: {0}")]
    Repair(#[source] QueryServiceError),

    #[error("partition repair for query execution {query_execution_id} ended in state {state}")]
    RepairNotSucceeded {
        query_execution_id: String,
        state: String,
    },

    #[error("partition repair for query execution {query_execution_id} still running after {attempts} status checks")]
    RepairGaveUp {
        query_execution_id: String,
        attempts: u32,
    },
}
