//! Structured execution-plan types and defensive parsing of raw store
//! payloads.
//!
//! The explain payload shape is store-defined and externally versioned.
//! Parsing here keeps the fields it recognizes, routes everything else into
//! a per-node `extra` side map, and skips what it cannot make sense of
//! rather than failing the whole plan.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::perf::QueryPerformance;

/// Node type the store emits for a full collection scan.
pub const FULL_SCAN_NODE: &str = "EnumerateCollectionNode";

/// Node type the store emits when an index is read.
pub const INDEX_NODE: &str = "IndexNode";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
	pub id: i64,
	#[serde(rename = "type")]
	pub node_type: String,
	pub dependencies: Vec<i64>,
	pub estimated_cost: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub collection: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub indexes: Option<Vec<Value>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub condition: Option<Value>,
	/// Store-specific fields we do not model; merged back at serialization.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl PlanNode {
	/// Returns `None` for values that are not a plan node at all. Field-level
	/// oddities degrade instead: a missing id becomes -1, a missing type
	/// becomes "unknown".
	pub fn from_value(value: &Value) -> Option<Self> {
		let object = value.as_object()?;
		let mut extra = Map::new();

		for (key, field) in object {
			if !matches!(
				key.as_str(),
				"id" | "type" | "dependencies" | "estimatedCost" | "collection" | "indexes"
					| "condition"
			) {
				extra.insert(key.clone(), field.clone());
			}
		}

		Some(Self {
			id: object.get("id").and_then(Value::as_i64).unwrap_or(-1),
			node_type: object
				.get("type")
				.and_then(Value::as_str)
				.unwrap_or("unknown")
				.to_string(),
			dependencies: object
				.get("dependencies")
				.and_then(Value::as_array)
				.map(|deps| deps.iter().filter_map(Value::as_i64).collect())
				.unwrap_or_default(),
			estimated_cost: object.get("estimatedCost").and_then(Value::as_f64).unwrap_or(0.0),
			collection: object
				.get("collection")
				.and_then(Value::as_str)
				.map(ToString::to_string),
			indexes: object.get("indexes").and_then(Value::as_array).cloned(),
			condition: object.get("condition").filter(|cond| cond.is_object()).cloned(),
			extra,
		})
	}
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryPlan {
	pub nodes: Vec<PlanNode>,
	pub rules: Vec<String>,
	pub collections: Vec<Value>,
	pub variables: Vec<Value>,
	pub estimated_cost: f64,
}
impl QueryPlan {
	/// Parses one `plan` object. Malformed nodes are skipped with a warning;
	/// the rest of the plan survives.
	pub fn from_value(value: &Value) -> Option<Self> {
		let object = value.as_object()?;
		let nodes = object
			.get("nodes")
			.and_then(Value::as_array)
			.map(|nodes| {
				nodes
					.iter()
					.filter_map(|node| {
						let parsed = PlanNode::from_value(node);

						if parsed.is_none() {
							tracing::warn!(node = %node, "Skipping malformed plan node.");
						}

						parsed
					})
					.collect()
			})
			.unwrap_or_default();

		Some(Self {
			nodes,
			rules: object
				.get("rules")
				.and_then(Value::as_array)
				.map(|rules| {
					rules.iter().filter_map(Value::as_str).map(ToString::to_string).collect()
				})
				.unwrap_or_default(),
			collections: object
				.get("collections")
				.and_then(Value::as_array)
				.cloned()
				.unwrap_or_default(),
			variables: object
				.get("variables")
				.and_then(Value::as_array)
				.cloned()
				.unwrap_or_default(),
			estimated_cost: object.get("estimatedCost").and_then(Value::as_f64).unwrap_or(0.0),
		})
	}

	pub fn collection_names(&self) -> Vec<String> {
		self.collections
			.iter()
			.filter_map(|collection| {
				collection
					.as_object()
					.and_then(|object| object.get("name"))
					.and_then(Value::as_str)
					.or_else(|| collection.as_str())
			})
			.map(ToString::to_string)
			.collect()
	}
}

/// One index actually read by the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexUsed {
	pub node_id: i64,
	pub collection: Option<String>,
	pub index_type: Option<String>,
	pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryAnalysis {
	pub summary: Map<String, Value>,
	pub warnings: Vec<String>,
	pub recommendations: Vec<String>,
	pub indexes_used: Vec<IndexUsed>,
}

/// Everything one explain call produced: the primary plan, alternatives,
/// derived analysis, optional resource metrics, and the untouched raw
/// payload for audit. Built once, immutable, never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryExecutionPlan {
	pub query_id: Uuid,
	pub query: String,
	pub bind_vars: Map<String, Value>,
	pub plan: QueryPlan,
	pub alternative_plans: Vec<QueryPlan>,
	pub analysis: QueryAnalysis,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub performance: Option<QueryPerformance>,
	pub stats: Value,
	pub cacheable: bool,
	pub raw: Value,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use crate::plan::{PlanNode, QueryPlan};

	#[test]
	fn node_parsing_splits_known_and_extra_fields() {
		let node = PlanNode::from_value(&json!({
			"id": 3,
			"type": "IndexNode",
			"dependencies": [1, 2],
			"estimatedCost": 12.5,
			"collection": "Objects",
			"producesResult": true,
		}))
		.unwrap();

		assert_eq!(node.id, 3);
		assert_eq!(node.node_type, "IndexNode");
		assert_eq!(node.dependencies, vec![1, 2]);
		assert_eq!(node.estimated_cost, 12.5);
		assert_eq!(node.collection.as_deref(), Some("Objects"));
		assert_eq!(node.extra.get("producesResult"), Some(&json!(true)));
	}

	#[test]
	fn node_parsing_degrades_missing_fields() {
		let node = PlanNode::from_value(&json!({})).unwrap();

		assert_eq!(node.id, -1);
		assert_eq!(node.node_type, "unknown");
		assert!(node.dependencies.is_empty());
		assert_eq!(PlanNode::from_value(&json!("not a node")), None);
	}

	#[test]
	fn extra_fields_merge_back_on_serialization() {
		let raw = json!({
			"id": 1,
			"type": "SingletonNode",
			"dependencies": [],
			"estimatedCost": 1.0,
			"producesResult": false,
		});
		let node = PlanNode::from_value(&raw).unwrap();
		let serialized = serde_json::to_value(&node).unwrap();

		assert_eq!(serialized.get("producesResult"), Some(&json!(false)));
		assert_eq!(serialized.get("type"), Some(&json!("SingletonNode")));
	}

	#[test]
	fn malformed_nodes_are_skipped_not_fatal() {
		let plan = QueryPlan::from_value(&json!({
			"nodes": [
				{ "id": 1, "type": "SingletonNode", "dependencies": [], "estimatedCost": 1.0 },
				"garbage",
				{ "id": 2, "type": "ReturnNode", "dependencies": [1], "estimatedCost": 2.0 },
			],
			"rules": ["remove-unnecessary-calculations"],
			"estimatedCost": 2.0,
		}))
		.unwrap();

		assert_eq!(plan.nodes.len(), 2);
		assert_eq!(plan.rules, vec!["remove-unnecessary-calculations"]);
		assert_eq!(plan.estimated_cost, 2.0);
	}

	#[test]
	fn collection_names_accept_descriptors_and_bare_strings() {
		let plan = QueryPlan::from_value(&json!({
			"collections": [{ "name": "Objects", "type": "read" }, "Activities"],
		}))
		.unwrap();

		assert_eq!(plan.collection_names(), vec!["Objects", "Activities"]);
	}
}
