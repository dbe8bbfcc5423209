use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("invalid reference instant '{0}': expected an ISO-8601 timestamp")]
    InvalidReferenceInstant(String),

    #[error("unknown dataset '{0}': expected 'search' or 'confirmation'")]
    UnknownDataset(String),

    #[error("repair poll max_attempts must be a positive integer")]
    InvalidPollAttempts,
}
