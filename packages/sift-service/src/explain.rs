//! Query plan analysis.
//!
//! Submits an explain request to the store, parses the raw payload
//! defensively, and enriches it with derived warnings and recommendations.
//! Analysis failures are absorbed into the returned record; only transport
//! failures error, and only a store timeout is fatal.

use regex::Regex;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use sift_config::Config;

use crate::{
	ServiceError, ServiceResult, SiftService, StoreError, fatal_timeout,
	perf::PerfSampler,
	plan::{FULL_SCAN_NODE, INDEX_NODE, IndexUsed, QueryAnalysis, QueryExecutionPlan, QueryPlan},
};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExplainRequest {
	pub query: String,
	#[serde(default)]
	pub bind_vars: Map<String, Value>,
	#[serde(default)]
	pub all_plans: bool,
	/// Falls back to `analysis.max_plans` from the config.
	#[serde(default)]
	pub max_plans: Option<u32>,
	/// Samples process resource usage around the explain round-trip and
	/// attaches the record to the returned plan.
	#[serde(default)]
	pub collect_performance: bool,
}
impl ExplainRequest {
	pub fn new(query: impl Into<String>) -> Self {
		Self {
			query: query.into(),
			bind_vars: Map::new(),
			all_plans: false,
			max_plans: None,
			collect_performance: false,
		}
	}
}

pub(crate) fn explain(
	service: &SiftService,
	request: ExplainRequest,
) -> ServiceResult<QueryExecutionPlan> {
	if request.query.trim().is_empty() {
		return Err(ServiceError::InvalidRequest { message: "Query must be non-empty.".to_string() });
	}

	let max_plans = request.max_plans.unwrap_or(service.cfg.analysis.max_plans);
	let bind_vars = bind_with_placeholders(&request.query, &request.bind_vars);
	let sampler = request.collect_performance.then(|| PerfSampler::start(request.query.len()));
	let outcome =
		service.connector.explain(&request.query, &bind_vars, request.all_plans, max_plans);
	// The sampler stops here on every exit path; a timeout exits the
	// process anyway.
	let performance = sampler.map(PerfSampler::finish);
	let raw = match outcome {
		Ok(raw) => raw,
		Err(StoreError::Timeout { message }) => fatal_timeout(&message),
		Err(StoreError::Rejected { message }) => {
			tracing::warn!(%message, "Store rejected the query during explain.");

			let mut plan = degraded_plan(
				&request.query,
				bind_vars,
				Value::Null,
				format!("Store rejected the query during explain: {message}."),
			);

			plan.performance = performance;

			return Ok(plan);
		},
		Err(err @ StoreError::Transport { .. }) =>
			return Err(ServiceError::Store { message: err.to_string() }),
	};
	let mut plan = build_execution_plan(&service.cfg, &request.query, bind_vars, raw, max_plans);

	plan.performance = performance;

	Ok(plan)
}

/// Scans the query for `@name` parameters missing from `bind_vars` and
/// synthesizes a plausible placeholder per name pattern. Explain-only:
/// placeholder values must never satisfy a real data-returning execution.
pub fn bind_with_placeholders(
	query: &str,
	bind_vars: &Map<String, Value>,
) -> Map<String, Value> {
	let mut bound = bind_vars.clone();

	for name in missing_parameters(query, bind_vars) {
		let placeholder = placeholder_for(&name);

		tracing::debug!(%name, %placeholder, "Synthesized explain-only bind parameter.");
		bound.insert(name, placeholder);
	}

	bound
}

fn missing_parameters(query: &str, bind_vars: &Map<String, Value>) -> Vec<String> {
	let Ok(re) = Regex::new(r"@{1,2}([A-Za-z_][A-Za-z0-9_]*)") else {
		return Vec::new();
	};
	let mut names = Vec::new();

	for capture in re.captures_iter(query) {
		// `@@name` binds a collection, not a value; leave those alone.
		if capture.get(0).map(|token| token.as_str().starts_with("@@")).unwrap_or(true) {
			continue;
		}

		let name = &capture[1];

		if !bind_vars.contains_key(name) && !names.iter().any(|seen: &String| seen == name) {
			names.push(name.to_string());
		}
	}

	names
}

fn placeholder_for(name: &str) -> Value {
	let lowered = name.to_ascii_lowercase();
	let matches_any =
		|needles: &[&str]| needles.iter().any(|needle| lowered.contains(needle));

	if matches_any(&["size", "bytes", "length"]) {
		// A plausible byte count: 1 MiB.
		json!(1_048_576)
	} else if matches_any(&["date", "time", "when"]) {
		json!("2024-01-01T00:00:00Z")
	} else if matches_any(&["path", "file", "dir", "name"]) {
		json!("/tmp/sample.txt")
	} else if matches_any(&["limit", "count", "max", "top"]) {
		json!(10)
	} else {
		json!(format!("placeholder_{name}"))
	}
}

/// Builds the full record from a raw explain payload. Never fails: an
/// unexpected shape becomes an empty plan plus a warning.
pub fn build_execution_plan(
	cfg: &Config,
	query: &str,
	bind_vars: Map<String, Value>,
	raw: Value,
	max_plans: u32,
) -> QueryExecutionPlan {
	let mut shape_warnings = Vec::new();
	let (plan, alternative_plans) = match extract_plans(&raw, max_plans) {
		Some(plans) => plans,
		None => {
			let shape = json_shape(&raw);

			tracing::warn!(%shape, "Unexpected explain payload shape.");
			shape_warnings
				.push(format!("Unexpected explain payload shape: expected an object with a plan, got {shape}."));

			(QueryPlan::default(), Vec::new())
		},
	};
	let mut analysis = analyze(&plan, cfg.analysis.high_cost_threshold);

	analysis.warnings.extend(shape_warnings);
	analysis.warnings.extend(store_warnings(&raw));

	QueryExecutionPlan {
		query_id: Uuid::new_v4(),
		query: query.to_string(),
		bind_vars,
		plan,
		alternative_plans,
		analysis,
		performance: None,
		stats: raw.get("stats").cloned().unwrap_or(Value::Null),
		cacheable: raw.get("cacheable").and_then(Value::as_bool).unwrap_or(false),
		raw,
	}
}

fn degraded_plan(
	query: &str,
	bind_vars: Map<String, Value>,
	raw: Value,
	warning: String,
) -> QueryExecutionPlan {
	QueryExecutionPlan {
		query_id: Uuid::new_v4(),
		query: query.to_string(),
		bind_vars,
		plan: QueryPlan::default(),
		alternative_plans: Vec::new(),
		analysis: QueryAnalysis { warnings: vec![warning], ..Default::default() },
		performance: None,
		stats: Value::Null,
		cacheable: false,
		raw,
	}
}

/// Primary plan plus alternatives, from either `plan` or an all-plans
/// `plans` array. `None` means the payload shape is unusable.
fn extract_plans(raw: &Value, max_plans: u32) -> Option<(QueryPlan, Vec<QueryPlan>)> {
	if let Some(plans) = raw.get("plans").and_then(Value::as_array) {
		let mut parsed: Vec<QueryPlan> = plans
			.iter()
			.take(max_plans.max(1) as usize)
			.filter_map(QueryPlan::from_value)
			.collect();

		if parsed.is_empty() {
			return None;
		}

		let primary = parsed.remove(0);

		return Some((primary, parsed));
	}

	raw.get("plan").and_then(QueryPlan::from_value).map(|plan| (plan, Vec::new()))
}

fn analyze(plan: &QueryPlan, high_cost_threshold: f64) -> QueryAnalysis {
	let mut analysis = QueryAnalysis::default();

	for node in &plan.nodes {
		match node.node_type.as_str() {
			FULL_SCAN_NODE => {
				let collection = node.collection.as_deref().unwrap_or("unknown");

				analysis
					.warnings
					.push(format!("Full collection scan on '{collection}'."));
				analysis.recommendations.push(format!(
					"Consider adding an index on collection '{collection}' to avoid the full scan."
				));
			},
			INDEX_NODE => analysis.indexes_used.extend(indexes_of(node)),
			_ => {},
		}
	}

	if analysis.indexes_used.is_empty() && !plan.nodes.is_empty() {
		analysis
			.recommendations
			.push("No index is used by this query; review its filter conditions.".to_string());
	}
	if plan.estimated_cost > high_cost_threshold {
		analysis.warnings.push(format!(
			"Estimated cost {:.1} exceeds the high-cost threshold {:.1}.",
			plan.estimated_cost, high_cost_threshold,
		));
		analysis
			.recommendations
			.push("Query is potentially inefficient; consider restructuring it.".to_string());
	}

	analysis.summary.insert("node_count".to_string(), json!(plan.nodes.len()));
	analysis.summary.insert("rule_count".to_string(), json!(plan.rules.len()));
	analysis.summary.insert("collections".to_string(), json!(plan.collection_names()));
	analysis.summary.insert("estimated_cost".to_string(), json!(plan.estimated_cost));

	analysis
}

fn indexes_of(node: &crate::plan::PlanNode) -> Vec<IndexUsed> {
	let Some(indexes) = node.indexes.as_ref().filter(|indexes| !indexes.is_empty()) else {
		// An index node without descriptors still proves an index was hit.
		return vec![IndexUsed {
			node_id: node.id,
			collection: node.collection.clone(),
			index_type: None,
			fields: Vec::new(),
		}];
	};

	indexes
		.iter()
		.map(|descriptor| IndexUsed {
			node_id: node.id,
			collection: node.collection.clone(),
			index_type: descriptor
				.get("type")
				.and_then(Value::as_str)
				.map(ToString::to_string),
			fields: descriptor
				.get("fields")
				.and_then(Value::as_array)
				.map(|fields| {
					fields.iter().filter_map(Value::as_str).map(ToString::to_string).collect()
				})
				.unwrap_or_default(),
		})
		.collect()
}

/// Store-supplied warnings, surfaced verbatim. Accepts both bare strings and
/// `{ code, message }` objects.
fn store_warnings(raw: &Value) -> Vec<String> {
	raw.get("warnings")
		.and_then(Value::as_array)
		.map(|warnings| {
			warnings
				.iter()
				.filter_map(|warning| {
					warning
						.as_str()
						.map(ToString::to_string)
						.or_else(|| {
							warning
								.get("message")
								.and_then(Value::as_str)
								.map(ToString::to_string)
						})
				})
				.collect()
		})
		.unwrap_or_default()
}

fn json_shape(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}
