use async_trait::async_trait;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, ResultConfiguration};
use unload_pipeline_core::execution::{QueryExecutionRecord, QueryExecutionState};
use unload_pipeline_core::repair::RepairRequest;

use crate::error::QueryServiceError;

/// The managed query service's submit and status calls.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn start_query_execution(
        &self,
        request: &RepairRequest,
    ) -> Result<String, QueryServiceError>;

    async fn get_query_execution(
        &self,
        query_execution_id: &str,
    ) -> Result<QueryExecutionRecord, QueryServiceError>;
}

#[derive(Debug, Clone)]
pub struct AthenaQueryService {
    client: aws_sdk_athena::Client,
}

impl AthenaQueryService {
    pub fn new(client: aws_sdk_athena::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryService for AthenaQueryService {
    async fn start_query_execution(
        &self,
        request: &RepairRequest,
    ) -> Result<String, QueryServiceError> {
        let output = self
            .client
            .start_query_execution()
            .query_string(&request.query_string)
            .client_request_token(&request.client_request_token)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&request.database)
                    .build(),
            )
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&request.output_location)
                    .build(),
            )
            .work_group(&request.work_group)
            .send()
            .await
            .map_err(|error| QueryServiceError::Submit(DisplayErrorContext(&error).to_string()))?;

        output
            .query_execution_id()
            .map(str::to_string)
            .ok_or(QueryServiceError::MissingExecutionId)
    }

    async fn get_query_execution(
        &self,
        query_execution_id: &str,
    ) -> Result<QueryExecutionRecord, QueryServiceError> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(query_execution_id)
            .send()
            .await
            .map_err(|error| QueryServiceError::Status {
                query_execution_id: query_execution_id.to_string(),
                message: DisplayErrorContext(&error).to_string(),
            })?;

        let execution = output
            .query_execution()
            .ok_or_else(|| QueryServiceError::Status {
                query_execution_id: query_execution_id.to_string(),
                message: "response carried no query execution".to_string(),
            })?;
        let status = execution.status();

        Ok(QueryExecutionRecord {
            query_execution_id: execution
                .query_execution_id()
                .unwrap_or(query_execution_id)
                .to_string(),
            state: status
                .and_then(|status| status.state())
                .map(|state| QueryExecutionState::from_wire(state.as_str()))
                .unwrap_or_else(|| QueryExecutionState::Unknown("UNKNOWN".to_string())),
            state_change_reason: status
                .and_then(|status| status.state_change_reason())
                .map(str::to_string),
            output_location: execution
                .result_configuration()
                .and_then(|configuration| configuration.output_location())
                .map(str::to_string),
        })
    }
}
