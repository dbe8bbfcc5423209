use serde::Serialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{error, info, warn};
use unload_pipeline_core::poll::PollPolicy;
use unload_pipeline_core::repair::RepairRequest;

use crate::adapters::query_service::QueryService;
use crate::error::QueryServiceError;

const COMPONENT: &str = "partition_repair";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepairOutcome {
    Succeeded {
        query_execution_id: String,
        output_location: Option<String>,
        status_checks: u32,
    },
    Failed {
        query_execution_id: String,
        state: String,
        reason: Option<String>,
        status_checks: u32,
    },
    /// The execution was still `RUNNING` when the poll budget ran out. The
    /// repair may yet finish on the service side.
    GaveUp {
        query_execution_id: String,
        status_checks: u32,
    },
}

impl RepairOutcome {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Submits `MSCK REPAIR TABLE` and polls until a non-`RUNNING` state or the
/// policy's budget is spent.
///
/// A terminal state other than `SUCCEEDED` is logged as an error and
/// reported, not raised; only service call failures are returned as errors.
pub async fn remap_partitions(
    service: &dyn QueryService,
    request: &RepairRequest,
    policy: &PollPolicy,
) -> Result<RepairOutcome, QueryServiceError> {
    let params = json!(request);
    info!(
        component = COMPONENT,
        event = "repair_submitting",
        params = %params,
    );
    let query_execution_id = service.start_query_execution(request).await?;
    info!(
        component = COMPONENT,
        event = "repair_submitted",
        query_execution_id = %query_execution_id,
    );

    let started_at = Instant::now();
    let mut status_checks = 0u32;
    loop {
        let execution = service.get_query_execution(&query_execution_id).await?;
        status_checks += 1;
        let snapshot = json!(execution);
        info!(
            component = COMPONENT,
            event = "repair_status",
            status_check = status_checks,
            execution = %snapshot,
        );

        if !execution.state.is_running() {
            info!(
                component = COMPONENT,
                event = "repair_finished",
                state = %execution.state,
                output_location = execution.output_location.as_deref().unwrap_or_default(),
            );

            if !execution.state.is_succeeded() {
                error!(
                    component = COMPONENT,
                    event = "repair_not_succeeded",
                    query_execution_id = %query_execution_id,
                    state = %execution.state,
                    reason = execution.state_change_reason.as_deref().unwrap_or_default(),
                    "query execution state [{}] is not SUCCEEDED for query execution [{}]",
                    execution.state,
                    query_execution_id,
                );
                return Ok(RepairOutcome::Failed {
                    query_execution_id,
                    state: execution.state.to_string(),
                    reason: execution.state_change_reason,
                    status_checks,
                });
            }

            return Ok(RepairOutcome::Succeeded {
                query_execution_id,
                output_location: execution.output_location,
                status_checks,
            });
        }

        if !policy.allows_another_attempt(status_checks, started_at.elapsed()) {
            warn!(
                component = COMPONENT,
                event = "repair_poll_exhausted",
                query_execution_id = %query_execution_id,
                status_checks,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
            );
            return Ok(RepairOutcome::GaveUp {
                query_execution_id,
                status_checks,
            });
        }

        tokio::time::sleep(policy.interval()).await;
    }
}
