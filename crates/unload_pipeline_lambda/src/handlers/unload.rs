use serde_json::json;
use tracing::{debug, error, info};
use unload_pipeline_core::dataset::DatasetDefinition;
use unload_pipeline_core::query::build_unload_query;
use unload_pipeline_core::window::TimeWindow;

use crate::adapters::warehouse::{ResultRow, Warehouse};
use crate::error::WarehouseError;

const COMPONENT: &str = "unload";

/// Renders and runs the dataset's UNLOAD for `window`.
///
/// Failures are logged here and handed back to the caller, which decides
/// whether partition repair still runs.
pub async fn run_unload(
    warehouse: &dyn Warehouse,
    definition: &DatasetDefinition,
    window: &TimeWindow,
) -> Result<Vec<ResultRow>, WarehouseError> {
    let sql = build_unload_query(definition, window);
    let literals = json!(window.literals());
    info!(
        component = COMPONENT,
        event = "unload_started",
        dataset = %definition.kind,
        details = %literals,
    );
    debug!(component = COMPONENT, event = "unload_statement", sql = %sql);

    match warehouse.execute(&sql).await {
        Ok(rows) => {
            let first_row = json!(rows.first());
            info!(
                component = COMPONENT,
                event = "unload_completed",
                dataset = %definition.kind,
                row_count = rows.len(),
                first_row = %first_row,
            );
            Ok(rows)
        }
        Err(unload_error) => {
            error!(
                component = COMPONENT,
                event = "unload_failed",
                dataset = %definition.kind,
                error = %unload_error,
            );
            Err(unload_error)
        }
    }
}
