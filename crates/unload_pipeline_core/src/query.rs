use crate::dataset::DatasetDefinition;
use crate::window::TimeWindow;

const INGESTION_TIMESTAMP_COLUMN: &str = "__createdat";

/// Renders the Redshift `UNLOAD` that materialises one day of `definition`
/// into partitioned Parquet.
///
/// Ingestion time is bounded by `[FROM_DATE, RIGHTNOW)` and the business
/// timestamp by `[FROM_DATE, TO_DATE)`.
pub fn build_unload_query(definition: &DatasetDefinition, window: &TimeWindow) -> String {
    let select = build_select(definition, window);
    format!(
        "UNLOAD ('{body}')\nTO '{output}'\niam_role '{role}'\nPARQUET\nPARTITION BY ({partitions})\nALLOWOVERWRITE;",
        body = quote_unload_body(&select),
        output = definition.output_location,
        role = definition.iam_role,
        partitions = definition.partition_columns().join(","),
    )
}

/// The aggregation itself, in plain SQL.
pub fn build_select(definition: &DatasetDefinition, window: &TimeWindow) -> String {
    let dimensions = definition.dimensions();
    let projection = dimensions
        .iter()
        .chain(definition.metrics.iter())
        .map(|column| format!("  {}", column.render()))
        .collect::<Vec<_>>()
        .join(",\n");

    let from_date = window.from_date_literal();
    let to_date = window.to_date_literal();
    let right_now = window.right_now_literal();
    let timestamp = &definition.event_timestamp_column;

    let mut predicates = vec![
        format!(
            "{INGESTION_TIMESTAMP_COLUMN} >= '{from_date}' AND {INGESTION_TIMESTAMP_COLUMN} < '{right_now}'"
        ),
        format!(
            "{timestamp} >= '{from_date}'::TIMESTAMP AND {timestamp} < '{to_date}'::TIMESTAMP"
        ),
        format!(
            "airlineiatacode not in ({})",
            sql_string_list(&definition.excluded_carrier_codes)
        ),
    ];
    predicates.extend(definition.extra_predicates.iter().cloned());

    let group_by = (1..=dimensions.len())
        .map(|ordinal| ordinal.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "\nSELECT\n{projection}\nFROM {source}\nWHERE {predicates}\nGROUP BY {group_by}\n",
        source = definition.source_table,
        predicates = predicates.join("\n  AND "),
    )
}

/// `UNLOAD ('...')` takes the query as a string literal, so every quote in
/// the inner statement is doubled.
pub fn quote_unload_body(select: &str) -> String {
    select.replace('\'', "''")
}

fn sql_string_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("'{}'", value.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(",")
}
