mod common;

use chrono::{TimeZone, Utc};
use common::{FakeAthena, FakeWarehouse};
use serde_json::json;
use unload_pipeline_core::execution::QueryExecutionState;
use unload_pipeline_lambda::config::{PipelineConfig, DATASET_VAR, FUNCTION_NAME_VAR};
use unload_pipeline_lambda::error::HandlerError;
use unload_pipeline_lambda::handlers::invocation::{
    handle_invocation, PipelineDependencies, UnloadReport,
};
use unload_pipeline_lambda::handlers::repair::RepairOutcome;

fn config_for(dataset: &str) -> PipelineConfig {
    PipelineConfig::from_lookup(|key| match key {
        FUNCTION_NAME_VAR => Some("DA-reportAggregated".to_string()),
        DATASET_VAR => Some(dataset.to_string()),
        _ => None,
    })
    .expect("config should load")
}

fn invoked_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 16, 4, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[tokio::test(start_paused = true)]
async fn search_invocation_unloads_then_repairs() {
    let warehouse = FakeWarehouse::ok();
    let athena = FakeAthena::new(2, QueryExecutionState::Succeeded);
    let deps = PipelineDependencies {
        warehouse: &warehouse,
        query_service: &athena,
    };

    let report = handle_invocation(
        &json!({"now": "2023-06-15T10:00:00.000Z"}),
        invoked_at(),
        &config_for("search"),
        &deps,
    )
    .await
    .expect("invocation should succeed");

    let statements = warehouse.statements.lock().unwrap().clone();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains("''2023-06-14 00:00:00.000Z''"));
    assert!(statements[0].contains("''2023-06-15 00:00:00.000Z''"));
    assert!(statements[0].contains("''2023-06-15T10:00:00.000Z''"));

    assert!(matches!(report.unload, UnloadReport::Completed { row_count: 1, .. }));
    assert!(matches!(
        report.repair,
        Some(RepairOutcome::Succeeded { status_checks: 3, .. })
    ));
    assert_eq!(athena.polls(), 3);

    let body = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(body["dataset"], "search");
    assert_eq!(body["window"]["to_date"], "2023-06-15 00:00:00.000Z");
    assert_eq!(body["repair"]["status"], "succeeded");
    assert_eq!(
        body["unload"]["first_row"]["cells"][0]["value"],
        "UNLOAD completed"
    );
}

#[tokio::test(start_paused = true)]
async fn warehouse_failure_is_reported_and_repair_runs_once() {
    let warehouse = FakeWarehouse::failing("connection refused");
    let athena = FakeAthena::new(0, QueryExecutionState::Succeeded);
    let deps = PipelineDependencies {
        warehouse: &warehouse,
        query_service: &athena,
    };

    let report = handle_invocation(&json!({}), invoked_at(), &config_for("confirmation"), &deps)
        .await
        .expect("default policy should not fail the invocation");

    match report.unload {
        UnloadReport::Failed { error } => assert!(error.contains("connection refused")),
        other => panic!("expected failed unload, got {other:?}"),
    }
    assert_eq!(athena.submissions().len(), 1);
    assert_eq!(
        athena.submissions()[0].query_string,
        "MSCK REPAIR TABLE aggregated_normalized_farenet_confirmation_001;"
    );
}

#[tokio::test(start_paused = true)]
async fn repair_poll_is_capped_at_five_checks() {
    let warehouse = FakeWarehouse::ok();
    let athena = FakeAthena::new(usize::MAX, QueryExecutionState::Succeeded);
    let deps = PipelineDependencies {
        warehouse: &warehouse,
        query_service: &athena,
    };

    let report = handle_invocation(&json!({}), invoked_at(), &config_for("search"), &deps)
        .await
        .expect("exhausted poll is not an invocation failure by default");

    assert_eq!(athena.polls(), 5);
    assert!(matches!(
        report.repair,
        Some(RepairOutcome::GaveUp { status_checks: 5, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn query_service_errors_propagate() {
    let warehouse = FakeWarehouse::ok();
    let mut athena = FakeAthena::new(0, QueryExecutionState::Succeeded);
    athena.fail_submit = true;
    let deps = PipelineDependencies {
        warehouse: &warehouse,
        query_service: &athena,
    };

    let error = handle_invocation(&json!({}), invoked_at(), &config_for("search"), &deps)
        .await
        .expect_err("submit failure should propagate");

    assert!(matches!(error, HandlerError::Repair(_)));
    assert_eq!(athena.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn malformed_now_skips_the_warehouse_and_still_repairs() {
    let warehouse = FakeWarehouse::ok();
    let athena = FakeAthena::new(0, QueryExecutionState::Succeeded);
    let deps = PipelineDependencies {
        warehouse: &warehouse,
        query_service: &athena,
    };

    let report = handle_invocation(
        &json!({"now": "15/06/2023"}),
        invoked_at(),
        &config_for("search"),
        &deps,
    )
    .await
    .expect("default policy should not fail the invocation");

    match &report.unload {
        UnloadReport::Failed { error } => assert!(error.contains("15/06/2023")),
        other => panic!("expected failed unload, got {other:?}"),
    }
    assert!(warehouse.statements.lock().unwrap().is_empty());
    assert_eq!(athena.submissions().len(), 1);
    assert!(matches!(report.repair, Some(RepairOutcome::Succeeded { .. })));

    let body = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(body["window"], serde_json::Value::Null);
    assert_eq!(body["unload"]["status"], "failed");
}

#[tokio::test(start_paused = true)]
async fn malformed_now_fails_the_invocation_when_errors_are_surfaced() {
    let warehouse = FakeWarehouse::ok();
    let athena = FakeAthena::new(0, QueryExecutionState::Succeeded);
    let deps = PipelineDependencies {
        warehouse: &warehouse,
        query_service: &athena,
    };
    let config = PipelineConfig {
        fail_on_error: true,
        ..config_for("search")
    };

    let error = handle_invocation(&json!({"now": "15/06/2023"}), invoked_at(), &config, &deps)
        .await
        .expect_err("malformed now should fail");

    assert!(error.to_string().contains("15/06/2023"));
    assert!(warehouse.statements.lock().unwrap().is_empty());
    assert_eq!(athena.submissions().len(), 1);
}
