use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use unload_pipeline_core::dataset::{DatasetDefinition, DatasetKind};
use unload_pipeline_core::repair::{idempotency_token, RepairRequest};
use unload_pipeline_core::window::{
    parse_reference_instant, reference_instant_from_millis, TimeWindow, WindowLiterals,
};

use crate::adapters::query_service::QueryService;
use crate::adapters::warehouse::{ResultRow, Warehouse};
use crate::config::{PipelineConfig, RepairPolicy};
use crate::error::HandlerError;
use crate::handlers::repair::{remap_partitions, RepairOutcome};
use crate::handlers::unload::run_unload;

const COMPONENT: &str = "invocation";

/// External systems one invocation talks to, constructed by the caller.
pub struct PipelineDependencies<'a> {
    pub warehouse: &'a dyn Warehouse,
    pub query_service: &'a dyn QueryService,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnloadReport {
    Completed {
        row_count: usize,
        first_row: Option<ResultRow>,
    },
    Failed {
        error: String,
    },
}

/// Lambda response body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InvocationReport {
    pub dataset: DatasetKind,
    /// `None` when the event's `now` could not be read.
    pub window: Option<WindowLiterals>,
    pub unload: UnloadReport,
    /// `None` when the repair was skipped after a failed UNLOAD.
    pub repair: Option<RepairOutcome>,
}

/// Runs one nightly invocation: UNLOAD for the event's reporting day, then
/// partition repair on the dataset's catalog table.
///
/// The repair always targets the configured dataset's table; the event can
/// only move the reporting window. An unreadable `now` fails the UNLOAD stage
/// like a warehouse error does. Unless `fail_on_error` is set, stage failures
/// are reported in the returned body rather than as an error.
pub async fn handle_invocation(
    event: &Value,
    invoked_at: DateTime<Utc>,
    config: &PipelineConfig,
    deps: &PipelineDependencies<'_>,
) -> Result<InvocationReport, HandlerError> {
    let definition = config.dataset.definition();
    let (window, unload) = match reference_instant(event, invoked_at) {
        Ok(reference) => {
            let window = TimeWindow::ending_at(reference);
            info!(
                component = COMPONENT,
                event = "invocation_started",
                dataset = %config.dataset,
                reference = %window.right_now_literal(),
                function_name = %config.function_name,
            );
            let unload = run_unload(deps.warehouse, &definition, &window)
                .await
                .map_err(HandlerError::Unload);
            (Some(window), unload)
        }
        Err(error) => {
            error!(
                component = COMPONENT,
                event = "invalid_reference",
                dataset = %config.dataset,
                error = %error,
            );
            (None, Err(error))
        }
    };
    let unload_report = match &unload {
        Ok(rows) => UnloadReport::Completed {
            row_count: rows.len(),
            first_row: rows.first().cloned(),
        },
        Err(error) => UnloadReport::Failed {
            error: error.to_string(),
        },
    };

    let repair = if unload.is_err() && config.repair_policy == RepairPolicy::OnUnloadSuccess {
        info!(
            component = COMPONENT,
            event = "repair_skipped",
            dataset = %config.dataset,
        );
        None
    } else {
        let request = repair_request(&definition, config);
        let outcome = remap_partitions(deps.query_service, &request, &config.poll_policy)
            .await
            .map_err(HandlerError::Repair)?;
        Some(outcome)
    };

    let report = InvocationReport {
        dataset: config.dataset,
        window: window.as_ref().map(TimeWindow::literals),
        unload: unload_report,
        repair,
    };
    info!(
        component = COMPONENT,
        event = "invocation_completed",
        dataset = %config.dataset,
        unload_succeeded = unload.is_ok(),
        repair_succeeded = report.repair.as_ref().is_some_and(RepairOutcome::is_succeeded),
    );

    if config.fail_on_error {
        if let Err(error) = unload {
            return Err(error);
        }
        match &report.repair {
            Some(RepairOutcome::Failed {
                query_execution_id,
                state,
                ..
            }) => {
                return Err(HandlerError::RepairNotSucceeded {
                    query_execution_id: query_execution_id.clone(),
                    state: state.clone(),
                });
            }
            Some(RepairOutcome::GaveUp {
                query_execution_id,
                status_checks,
            }) => {
                return Err(HandlerError::RepairGaveUp {
                    query_execution_id: query_execution_id.clone(),
                    attempts: *status_checks,
                });
            }
            _ => {}
        }
    }

    Ok(report)
}

/// The reporting instant: the event's `now` when present and truthy,
/// otherwise the invocation time.
pub fn reference_instant(
    event: &Value,
    invoked_at: DateTime<Utc>,
) -> Result<DateTime<Utc>, HandlerError> {
    match event.get("now") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(invoked_at),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(invoked_at),
        Some(Value::String(text)) => Ok(parse_reference_instant(text)?),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(0) => Ok(invoked_at),
            Some(millis) => Ok(reference_instant_from_millis(millis)?),
            None => Err(HandlerError::InvalidEvent(format!(
                "`now` must be an ISO-8601 string or epoch milliseconds, got {number}"
            ))),
        },
        Some(other) => Err(HandlerError::InvalidEvent(format!(
            "`now` must be an ISO-8601 string or epoch milliseconds, got {other}"
        ))),
    }
}

fn repair_request(definition: &DatasetDefinition, config: &PipelineConfig) -> RepairRequest {
    let table = &definition.catalog_table;
    let token = idempotency_token(table, &mut rand::thread_rng());
    RepairRequest::new(table, &config.function_name, token)
        .with_database(config.catalog_database.clone())
        .with_work_group(config.work_group.clone())
}
