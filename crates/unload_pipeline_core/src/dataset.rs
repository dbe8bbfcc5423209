use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::PipelineError;

pub const ANALYTICS_BUCKET: &str = "s3://em-data-analytics-bucket";
pub const UNLOAD_IAM_ROLE: &str =
    "arn:aws:iam::002584813484:role/DA-reportAggregatedNormalized_farenet-001_unload_role";
pub const PARTITION_COLUMNS: [&str; 4] = ["airlineiatacode", "year", "month", "day"];

/// Carrier codes excluded from every dataset: errored tenants, STAR
/// members and test/empty values.
const SHARED_EXCLUDED_CARRIERS: [&str; 19] = [
    "AB", "AY", "CA", "LH", "LO", "LX", "OS", "OU", "OZ", "SA", "SK", "SN", "TK", "11", "HAV",
    "ey_test", "jet_test", "", "",
];

/// Upper-cased categorical columns shared by both datasets, in select order
/// after the carrier code and event date.
const ROUTE_CODE_COLUMNS: [&str; 2] = ["departureairportiatacode", "arrivalairportiatacode"];
const PLAIN_DATE_COLUMNS: [&str; 2] = ["departuredate", "returndate"];
const SEGMENT_CODE_COLUMNS: [&str; 6] = [
    "flighttype",
    "journeytype",
    "devicecategory",
    "siteedition",
    "outboundfareclass",
    "inboundfareclass",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Search,
    Confirmation,
}

impl DatasetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Confirmation => "confirmation",
        }
    }

    pub fn definition(self) -> DatasetDefinition {
        match self {
            Self::Search => DatasetDefinition::search(),
            Self::Confirmation => DatasetDefinition::confirmation(),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "search" | "searches" => Ok(Self::Search),
            "confirmation" | "confirmations" | "booking" | "bookings" => Ok(Self::Confirmation),
            _ => Err(PipelineError::UnknownDataset(value.to_string())),
        }
    }
}

/// A projected column of the aggregation: an SQL expression and its alias.
///
/// Expressions are written in plain SQL; quoting for the UNLOAD body happens
/// when the statement is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    pub expression: String,
    pub alias: Option<String>,
}

impl SelectColumn {
    pub fn bare(column: &str) -> Self {
        Self {
            expression: column.to_string(),
            alias: None,
        }
    }

    pub fn aliased(expression: impl Into<String>, alias: &str) -> Self {
        Self {
            expression: expression.into(),
            alias: Some(alias.to_string()),
        }
    }

    pub fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {alias}", self.expression),
            None => self.expression.clone(),
        }
    }
}

/// Everything that differs between the search and confirmation pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDefinition {
    pub kind: DatasetKind,
    pub source_table: String,
    pub event_timestamp_column: String,
    pub event_date_alias: String,
    pub metrics: Vec<SelectColumn>,
    pub excluded_carrier_codes: Vec<String>,
    pub extra_predicates: Vec<String>,
    pub output_location: String,
    pub iam_role: String,
    pub catalog_table: String,
}

impl DatasetDefinition {
    pub fn search() -> Self {
        let timestamp = "farenettimestamp";
        Self {
            kind: DatasetKind::Search,
            source_table: "public.normalized_farenet_001".to_string(),
            event_timestamp_column: timestamp.to_string(),
            event_date_alias: "farenetdate".to_string(),
            metrics: vec![
                SelectColumn::aliased("count(distinct farenetid)", "searches"),
                SelectColumn::aliased(
                    "AVG(CASE WHEN totalpriceusd > '0' AND totalpriceusd < '100000.00' \
                     THEN totalpriceusd ELSE NULL END)",
                    "averagepriceusd",
                ),
                SelectColumn::aliased("SUM(passengercount)::INT", "passengercount"),
                SelectColumn::aliased(
                    format!("min({timestamp})::TIMESTAMP"),
                    "minfarenettimestamp",
                ),
                SelectColumn::aliased(
                    format!("max({timestamp})::TIMESTAMP"),
                    "maxfarenettimestamp",
                ),
            ],
            excluded_carrier_codes: excluded_carriers(&[]),
            extra_predicates: vec!["isusersearch is TRUE".to_string()],
            output_location: format!(
                "{ANALYTICS_BUCKET}/athena-temp-outputs/aggregated_normalized_farenet_001/v1/"
            ),
            iam_role: UNLOAD_IAM_ROLE.to_string(),
            catalog_table: "aggregated_normalized_farenet_001".to_string(),
        }
    }

    pub fn confirmation() -> Self {
        let timestamp = "farenetconfirmationtimestamp";
        Self {
            kind: DatasetKind::Confirmation,
            source_table: "public.normalized_farenet_confirmation_001".to_string(),
            event_timestamp_column: timestamp.to_string(),
            event_date_alias: "farenetconfirmationdate".to_string(),
            metrics: vec![
                SelectColumn::aliased("count(distinct farenetconfirmationid)", "bookings"),
                SelectColumn::aliased("SUM(passengercount)::INT", "passengercount"),
                SelectColumn::aliased("sum(totalpriceusd)::DECIMAL(24,2)", "revenue"),
                SelectColumn::aliased(
                    format!("min({timestamp})::TIMESTAMP"),
                    "minfarenetconfirmationtimestamp",
                ),
                SelectColumn::aliased(
                    format!("max({timestamp})::TIMESTAMP"),
                    "maxfarenetconfirmationtimestamp",
                ),
            ],
            // PC sits between SN and TK in the booking denylist.
            excluded_carrier_codes: excluded_carriers(&[("SN", "PC")]),
            extra_predicates: Vec::new(),
            output_location: format!(
                "{ANALYTICS_BUCKET}/reports/aggregated_normalized_farenet_confirmation_001/v1/"
            ),
            iam_role: UNLOAD_IAM_ROLE.to_string(),
            catalog_table: "aggregated_normalized_farenet_confirmation_001".to_string(),
        }
    }

    /// Non-aggregate columns in select order; the query groups by all of them.
    pub fn dimensions(&self) -> Vec<SelectColumn> {
        let timestamp = &self.event_timestamp_column;
        let mut columns = vec![
            upper("airlineiatacode"),
            SelectColumn::aliased(format!("{timestamp}::DATE"), &self.event_date_alias),
        ];
        columns.extend(ROUTE_CODE_COLUMNS.iter().copied().map(upper));
        columns.extend(PLAIN_DATE_COLUMNS.iter().copied().map(SelectColumn::bare));
        columns.extend(SEGMENT_CODE_COLUMNS.iter().copied().map(upper));
        for (alias, start, length) in [("year", 1, 4), ("month", 6, 2), ("day", 9, 2)] {
            columns.push(SelectColumn::aliased(
                format!("substring({timestamp}, {start}, {length})::smallint"),
                alias,
            ));
        }
        columns
    }

    pub fn partition_columns(&self) -> &'static [&'static str] {
        &PARTITION_COLUMNS
    }
}

fn upper(column: &str) -> SelectColumn {
    SelectColumn::aliased(format!("UPPER({column})"), column)
}

/// Shared denylist, with `(after, code)` insertions for dataset-specific codes.
fn excluded_carriers(insertions: &[(&str, &str)]) -> Vec<String> {
    let mut codes = Vec::with_capacity(SHARED_EXCLUDED_CARRIERS.len() + insertions.len());
    for code in SHARED_EXCLUDED_CARRIERS {
        codes.push(code.to_string());
        for (after, inserted) in insertions {
            if *after == code {
                codes.push((*inserted).to_string());
            }
        }
    }
    codes
}
