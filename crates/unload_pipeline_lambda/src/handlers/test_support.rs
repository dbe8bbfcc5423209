use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tracing::subscriber::DefaultGuard;
use unload_pipeline_core::execution::{QueryExecutionRecord, QueryExecutionState};
use unload_pipeline_core::repair::RepairRequest;

use crate::adapters::query_service::QueryService;
use crate::adapters::warehouse::{ResultRow, Warehouse};
use crate::error::{QueryServiceError, WarehouseError};

pub(crate) struct RecordingWarehouse {
    statements: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingWarehouse {
    pub(crate) fn succeeding() -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.statements.lock().expect("poisoned mutex").clone()
    }
}

#[async_trait]
impl Warehouse for RecordingWarehouse {
    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>, WarehouseError> {
        self.statements
            .lock()
            .expect("poisoned mutex")
            .push(sql.to_string());
        if self.fail {
            return Err(WarehouseError::Execute(sqlx::Error::Protocol(
                "permission denied for relation normalized_farenet_001".to_string(),
            )));
        }
        Ok(Vec::new())
    }
}

/// Answers status polls from a fixed script; the last state repeats.
pub(crate) struct ScriptedQueryService {
    states: Mutex<VecDeque<QueryExecutionState>>,
    submissions: Mutex<Vec<RepairRequest>>,
    polls: Mutex<usize>,
}

impl ScriptedQueryService {
    pub(crate) fn new(states: &[QueryExecutionState]) -> Self {
        Self {
            states: Mutex::new(states.iter().cloned().collect()),
            submissions: Mutex::new(Vec::new()),
            polls: Mutex::new(0),
        }
    }

    pub(crate) fn submissions(&self) -> Vec<RepairRequest> {
        self.submissions.lock().expect("poisoned mutex").clone()
    }

    pub(crate) fn polls(&self) -> usize {
        *self.polls.lock().expect("poisoned mutex")
    }
}

#[async_trait]
impl QueryService for ScriptedQueryService {
    async fn start_query_execution(
        &self,
        request: &RepairRequest,
    ) -> Result<String, QueryServiceError> {
        self.submissions
            .lock()
            .expect("poisoned mutex")
            .push(request.clone());
        Ok("qe-123".to_string())
    }

    async fn get_query_execution(
        &self,
        query_execution_id: &str,
    ) -> Result<QueryExecutionRecord, QueryServiceError> {
        *self.polls.lock().expect("poisoned mutex") += 1;
        let mut states = self.states.lock().expect("poisoned mutex");
        let state = if states.len() > 1 {
            states.pop_front()
        } else {
            states.front().cloned()
        }
        .unwrap_or(QueryExecutionState::Running);

        Ok(QueryExecutionRecord {
            query_execution_id: query_execution_id.to_string(),
            state,
            state_change_reason: None,
            output_location: Some(format!("s3://results/{query_execution_id}.txt")),
        })
    }
}

/// Captures JSON log lines emitted on the current thread.
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("poisoned mutex")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    pub(crate) fn install(&self) -> DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn lines(&self) -> Vec<Value> {
        let buffer = self.buffer.lock().expect("poisoned mutex");
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub(crate) fn events_at(&self, level: &str) -> Vec<String> {
        self.lines()
            .iter()
            .filter(|line| line["level"] == level)
            .filter_map(|line| line["fields"]["event"].as_str().map(str::to_string))
            .collect()
    }
}
