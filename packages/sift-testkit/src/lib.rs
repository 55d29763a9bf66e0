//! Test doubles for the query/consolidation pipeline: a scriptable store
//! connector, identity-resolver stubs, and result-item builders.

use std::{
	collections::VecDeque,
	sync::Mutex,
};

use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use sift_domain::{IdentityResolver, Resolution, display_name};
use sift_service::{StoreConnector, StoreError};

pub fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// Scriptable store. Responses are consumed in order; when the script runs
/// dry, queries return no rows and explains return an empty object.
#[derive(Default)]
pub struct MockStore {
	query_script: Mutex<VecDeque<Result<Vec<Value>, StoreError>>>,
	explain_script: Mutex<VecDeque<Result<Value, StoreError>>>,
	queries_seen: Mutex<Vec<(String, Map<String, Value>)>>,
	explains_seen: Mutex<Vec<(String, Map<String, Value>, bool, u32)>>,
}
impl MockStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_rows(self, rows: Vec<Value>) -> Self {
		self.query_script.lock().unwrap().push_back(Ok(rows));

		self
	}

	pub fn with_query_error(self, error: StoreError) -> Self {
		self.query_script.lock().unwrap().push_back(Err(error));

		self
	}

	pub fn with_explain_payload(self, payload: Value) -> Self {
		self.explain_script.lock().unwrap().push_back(Ok(payload));

		self
	}

	pub fn with_explain_error(self, error: StoreError) -> Self {
		self.explain_script.lock().unwrap().push_back(Err(error));

		self
	}

	/// Queries submitted so far, with their bind variables.
	pub fn queries_seen(&self) -> Vec<(String, Map<String, Value>)> {
		self.queries_seen.lock().unwrap().clone()
	}

	/// Explain calls submitted so far: query, bind variables, all-plans
	/// flag, max-plans count.
	pub fn explains_seen(&self) -> Vec<(String, Map<String, Value>, bool, u32)> {
		self.explains_seen.lock().unwrap().clone()
	}
}
impl StoreConnector for MockStore {
	fn query(
		&self,
		query: &str,
		bind_vars: &Map<String, Value>,
	) -> Result<Vec<Value>, StoreError> {
		self.queries_seen.lock().unwrap().push((query.to_string(), bind_vars.clone()));

		self.query_script.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
	}

	fn explain(
		&self,
		query: &str,
		bind_vars: &Map<String, Value>,
		all_plans: bool,
		max_plans: u32,
	) -> Result<Value, StoreError> {
		self.explains_seen.lock().unwrap().push((
			query.to_string(),
			bind_vars.clone(),
			all_plans,
			max_plans,
		));

		self.explain_script.lock().unwrap().pop_front().unwrap_or_else(|| Ok(json!({})))
	}
}

/// Resolver that treats every pair as the same item.
pub struct AlwaysSame {
	pub score: f64,
}
impl IdentityResolver for AlwaysSame {
	fn resolve(&self, _: &Value, _: &Value, _: f64) -> Resolution {
		Resolution { is_same: true, score: self.score }
	}
}

/// Resolver that never matches anything.
pub struct NeverSame;
impl IdentityResolver for NeverSame {
	fn resolve(&self, _: &Value, _: &Value, _: f64) -> Resolution {
		Resolution { is_same: false, score: 0.0 }
	}
}

/// Resolver scripted by display-name pairs. Unknown pairs score 0.0 and
/// never match; known pairs match when their score clears the threshold.
pub struct PairResolver {
	pairs: Vec<(String, String, f64)>,
}
impl PairResolver {
	pub fn new(pairs: &[(&str, &str, f64)]) -> Self {
		Self {
			pairs: pairs
				.iter()
				.map(|(a, b, score)| (a.to_string(), b.to_string(), *score))
				.collect(),
		}
	}

	fn score_of(&self, a: &str, b: &str) -> Option<f64> {
		self.pairs
			.iter()
			.find(|(x, y, _)| (x == a && y == b) || (x == b && y == a))
			.map(|(_, _, score)| *score)
	}
}
impl IdentityResolver for PairResolver {
	fn resolve(&self, a: &Value, b: &Value, threshold: f64) -> Resolution {
		let score = display_name(a)
			.zip(display_name(b))
			.and_then(|(a, b)| self.score_of(a, b))
			.unwrap_or(0.0);

		Resolution { is_same: score > 0.0 && score >= threshold, score }
	}
}

/// Wraps another resolver and records every call, so tests can prove the
/// exact-match pass never consults the similarity seam.
pub struct RecordingResolver<R> {
	inner: R,
	calls: Mutex<Vec<(String, String, f64)>>,
}
impl<R> RecordingResolver<R> {
	pub fn new(inner: R) -> Self {
		Self { inner, calls: Mutex::new(Vec::new()) }
	}

	pub fn calls(&self) -> Vec<(String, String, f64)> {
		self.calls.lock().unwrap().clone()
	}
}
impl<R> IdentityResolver for RecordingResolver<R>
where
	R: IdentityResolver,
{
	fn resolve(&self, a: &Value, b: &Value, threshold: f64) -> Resolution {
		self.calls.lock().unwrap().push((
			display_name(a).unwrap_or("?").to_string(),
			display_name(b).unwrap_or("?").to_string(),
			threshold,
		));

		self.inner.resolve(a, b, threshold)
	}
}

/// A file-like result item with a top-level checksum and RFC 3339 timestamp.
pub fn file_item(name: &str, checksum: Option<&str>, timestamp: Option<&str>) -> Value {
	let mut item = Map::new();

	item.insert("name".to_string(), json!(name));

	if let Some(checksum) = checksum {
		item.insert("checksum".to_string(), json!(checksum));
	}
	if let Some(timestamp) = timestamp {
		item.insert("timestamp".to_string(), json!(timestamp));
	}

	Value::Object(item)
}

/// A recorder-style item with POSIX attributes under the conventional
/// `Record.Attributes` path.
pub fn posix_item(name: &str, object_id: &str, st_mtime: f64) -> Value {
	json!({
		"name": name,
		"Record": {
			"Attributes": {
				"ObjectIdentifier": object_id,
				"st_mtime": st_mtime,
			},
		},
	})
}
