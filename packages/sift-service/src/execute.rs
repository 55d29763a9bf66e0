//! Query execution orchestration.
//!
//! One query in, one result out: rows, an execution plan, or a consolidated
//! report, selected by the request flags. This is the only place that talks
//! to the store.

use serde_json::{Map, Value, json};

use crate::{
	ServiceError, ServiceResult, SiftService, StoreError,
	consolidate::{self, FormattedResults},
	explain::{self, ExplainRequest},
	fatal_timeout,
	perf::PerfSampler,
	plan::QueryExecutionPlan,
};

use sift_domain::check_query;

/// Key marking a row as performance metadata rather than query output.
pub const PERFORMANCE_ROW_KEY: &str = "query_performance";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExecuteRequest {
	pub query: String,
	#[serde(default)]
	pub bind_vars: Map<String, Value>,
	#[serde(default)]
	pub explain: bool,
	#[serde(default)]
	pub collect_performance: bool,
	#[serde(default)]
	pub deduplicate: bool,
	/// Falls back to `consolidation.similarity_threshold` from the config.
	#[serde(default)]
	pub similarity_threshold: Option<f64>,
	/// Falls back to `consolidation.max_results` from the config.
	#[serde(default)]
	pub max_results: Option<usize>,
}
impl ExecuteRequest {
	pub fn new(query: impl Into<String>) -> Self {
		Self {
			query: query.into(),
			bind_vars: Map::new(),
			explain: false,
			collect_performance: false,
			deduplicate: false,
			similarity_threshold: None,
			max_results: None,
		}
	}
}

/// The shape of the outcome is fixed by the request flags (`explain` →
/// `Plan`, `deduplicate` → `Consolidated`, otherwise `Rows`), not by
/// runtime inspection.
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
	Rows(Vec<Value>),
	Plan(Box<QueryExecutionPlan>),
	Consolidated(FormattedResults),
}

pub(crate) fn execute(
	service: &SiftService,
	request: ExecuteRequest,
) -> ServiceResult<ExecuteOutcome> {
	if request.query.trim().is_empty() {
		return Err(ServiceError::InvalidRequest { message: "Query must be non-empty.".to_string() });
	}
	if request.explain {
		let plan = explain::explain(service, ExplainRequest {
			query: request.query,
			bind_vars: request.bind_vars,
			all_plans: false,
			max_plans: None,
			collect_performance: request.collect_performance,
		})?;

		return Ok(ExecuteOutcome::Plan(Box::new(plan)));
	}

	let mut rows = fetch_rows(service, &request)?;

	if !request.deduplicate {
		return Ok(ExecuteOutcome::Rows(rows));
	}

	let query_time = strip_performance_rows(&mut rows);
	let threshold = request
		.similarity_threshold
		.unwrap_or(service.cfg.consolidation.similarity_threshold);
	let max_results = request.max_results.or(service.cfg.consolidation.max_results);
	let mut formatted =
		consolidate::deduplicate(&rows, service.resolver.as_ref(), threshold, max_results);

	formatted.query_time_seconds = query_time;

	Ok(ExecuteOutcome::Consolidated(formatted))
}

/// Submits the query and materializes normalized rows. Guard failures and
/// store rejections come back as a single synthetic error row so batch
/// callers always see a row-shaped result; a store timeout is fatal.
fn fetch_rows(service: &SiftService, request: &ExecuteRequest) -> ServiceResult<Vec<Value>> {
	if let Err(guard) = check_query(&request.query) {
		tracing::warn!(error = %guard, "Query failed the local syntax guard.");

		return Ok(vec![error_row(&guard.to_string())]);
	}

	let sampler = request.collect_performance.then(|| PerfSampler::start(request.query.len()));
	let outcome = service.connector.query(&request.query, &request.bind_vars);
	// The sampler stops here on every exit path: success, rejection, and
	// transport failure alike. A timeout exits the process anyway.
	let performance = sampler.map(PerfSampler::finish);
	let mut rows = match outcome {
		Ok(rows) => rows.into_iter().map(normalize_row).collect::<Vec<_>>(),
		Err(StoreError::Timeout { message }) => fatal_timeout(&message),
		Err(StoreError::Rejected { message }) => {
			tracing::warn!(%message, "Store rejected the query.");

			vec![error_row(&message)]
		},
		Err(err @ StoreError::Transport { .. }) =>
			return Err(ServiceError::Store { message: err.to_string() }),
	};

	if let Some(performance) = performance {
		rows.push(json!({ (PERFORMANCE_ROW_KEY): performance }));
	}

	Ok(rows)
}

fn error_row(message: &str) -> Value {
	json!({ "error": message })
}

/// Non-object scalar rows are wrapped so every row is a mapping.
fn normalize_row(row: Value) -> Value {
	if row.is_object() { row } else { json!({ "result": row }) }
}

/// Removes performance-tagged rows from the candidate set, returning the
/// wall time of the last one so it can be reattached after grouping.
fn strip_performance_rows(rows: &mut Vec<Value>) -> Option<f64> {
	let mut query_time = None;

	rows.retain(|row| {
		let Some(record) = row.get(PERFORMANCE_ROW_KEY) else {
			return true;
		};

		if let Some(seconds) = record.get("elapsed_seconds").and_then(Value::as_f64) {
			query_time = Some(seconds);
		}

		false
	});

	query_time
}
