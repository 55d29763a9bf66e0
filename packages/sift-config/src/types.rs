use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
	pub analysis: Analysis,
	pub consolidation: Consolidation,
	pub display: Display,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Analysis {
	/// Estimated plan cost above which a query is flagged as inefficient.
	pub high_cost_threshold: f64,
	pub max_plans: u32,
}
impl Default for Analysis {
	fn default() -> Self {
		Self { high_cost_threshold: 1_000.0, max_plans: 5 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Consolidation {
	pub similarity_threshold: f64,
	pub max_results: Option<usize>,
}
impl Default for Consolidation {
	fn default() -> Self {
		Self { similarity_threshold: 0.85, max_results: None }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Display {
	pub max_categories: usize,
}
impl Default for Display {
	fn default() -> Self {
		Self { max_categories: 5 }
	}
}
