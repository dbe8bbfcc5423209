use std::sync::Mutex;

use async_trait::async_trait;
use unload_pipeline_core::execution::{QueryExecutionRecord, QueryExecutionState};
use unload_pipeline_core::repair::RepairRequest;
use unload_pipeline_lambda::adapters::query_service::QueryService;
use unload_pipeline_lambda::adapters::warehouse::{ResultCell, ResultRow, Warehouse};
use unload_pipeline_lambda::error::{QueryServiceError, WarehouseError};

/// Records statements and answers with one status row, or fails.
pub struct FakeWarehouse {
    pub statements: Mutex<Vec<String>>,
    pub error: Option<String>,
}

impl FakeWarehouse {
    pub fn ok() -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            error: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            error: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>, WarehouseError> {
        self.statements.lock().unwrap().push(sql.to_string());
        match &self.error {
            Some(message) => Err(WarehouseError::Connect(sqlx::Error::Protocol(
                message.clone(),
            ))),
            None => Ok(vec![ResultRow {
                cells: vec![ResultCell {
                    name: "status".to_string(),
                    value: Some("UNLOAD completed".to_string()),
                }],
            }]),
        }
    }
}

/// Reports `running_checks` RUNNING polls, then `final_state`.
pub struct FakeAthena {
    pub running_checks: usize,
    pub final_state: QueryExecutionState,
    pub submissions: Mutex<Vec<RepairRequest>>,
    pub polls: Mutex<usize>,
    pub fail_submit: bool,
}

impl FakeAthena {
    pub fn new(running_checks: usize, final_state: QueryExecutionState) -> Self {
        Self {
            running_checks,
            final_state,
            submissions: Mutex::new(Vec::new()),
            polls: Mutex::new(0),
            fail_submit: false,
        }
    }

    pub fn polls(&self) -> usize {
        *self.polls.lock().unwrap()
    }

    pub fn submissions(&self) -> Vec<RepairRequest> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryService for FakeAthena {
    async fn start_query_execution(
        &self,
        request: &RepairRequest,
    ) -> Result<String, QueryServiceError> {
        if self.fail_submit {
            return Err(QueryServiceError::Submit("AccessDeniedException".to_string()));
        }
        self.submissions.lock().unwrap().push(request.clone());
        Ok("4d1c0a52-qe".to_string())
    }

    async fn get_query_execution(
        &self,
        query_execution_id: &str,
    ) -> Result<QueryExecutionRecord, QueryServiceError> {
        let mut polls = self.polls.lock().unwrap();
        *polls += 1;
        let state = if *polls <= self.running_checks {
            QueryExecutionState::Running
        } else {
            self.final_state.clone()
        };
        Ok(QueryExecutionRecord {
            query_execution_id: query_execution_id.to_string(),
            state,
            state_change_reason: None,
            output_location: Some(format!(
                "s3://em-data-analytics-bucket/athena-temp-outputs/{query_execution_id}.txt"
            )),
        })
    }
}
