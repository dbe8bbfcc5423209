use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use unload_pipeline_lambda::adapters::query_service::AthenaQueryService;
use unload_pipeline_lambda::adapters::warehouse::PgWarehouse;
use unload_pipeline_lambda::config::PipelineConfig;
use unload_pipeline_lambda::handlers::invocation::{
    handle_invocation, InvocationReport, PipelineDependencies,
};
use unload_pipeline_lambda::logging::init_tracing;

struct RuntimeDependencies {
    config: PipelineConfig,
    warehouse: PgWarehouse,
    query_service: AthenaQueryService,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    runtime: &RuntimeDependencies,
) -> Result<InvocationReport, Error> {
    let deps = PipelineDependencies {
        warehouse: &runtime.warehouse,
        query_service: &runtime.query_service,
    };

    handle_invocation(&event.payload, Utc::now(), &runtime.config, &deps)
        .await
        .map_err(|error| {
            tracing::error!(
                component = "runtime",
                event = "invocation_failed",
                request_id = %event.context.request_id,
                error = %error,
            );
            Error::from(error.to_string())
        })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = PipelineConfig::from_env()?;
    tracing::info!(
        component = "runtime",
        event = "runtime_configured",
        config = ?config,
    );

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let runtime = RuntimeDependencies {
        warehouse: PgWarehouse::from_url_or_env(config.warehouse_url.as_deref())?,
        query_service: AthenaQueryService::new(aws_sdk_athena::Client::new(&aws_config)),
        config,
    };
    let runtime = &runtime;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, runtime).await
    }))
    .await
}
