//! Query execution, plan analysis, and result consolidation for a personal
//! index. The store itself and the identity-resolution similarity function
//! are external collaborators, consumed through the `StoreConnector` and
//! `IdentityResolver` seams.

pub mod consolidate;
pub mod display;
mod error;
pub mod execute;
pub mod explain;
pub mod perf;
pub mod plan;

pub use consolidate::{FormattedResults, ResultGroup, deduplicate};
pub use display::{DisplayOptions, format_group, format_item, format_results};
pub use error::{ServiceError, ServiceResult, StoreError};
pub use execute::{ExecuteOutcome, ExecuteRequest, PERFORMANCE_ROW_KEY};
pub use explain::ExplainRequest;
pub use perf::{PerfSampler, QueryPerformance};
pub use plan::{IndexUsed, PlanNode, QueryAnalysis, QueryExecutionPlan, QueryPlan};

use std::sync::Arc;

use serde_json::{Map, Value};

use sift_config::Config;
use sift_domain::IdentityResolver;

/// The store's query-submission interface. The on-wire explain schema is
/// store-defined and externally versioned; callers get the raw payload and
/// the analyzer stays defensive about its shape.
pub trait StoreConnector
where
	Self: Send + Sync,
{
	fn query(&self, query: &str, bind_vars: &Map<String, Value>) -> Result<Vec<Value>, StoreError>;

	fn explain(
		&self,
		query: &str,
		bind_vars: &Map<String, Value>,
		all_plans: bool,
		max_plans: u32,
	) -> Result<Value, StoreError>;
}

pub struct SiftService {
	pub cfg: Config,
	pub connector: Arc<dyn StoreConnector>,
	pub resolver: Arc<dyn IdentityResolver>,
}
impl SiftService {
	pub fn new(
		cfg: Config,
		connector: Arc<dyn StoreConnector>,
		resolver: Arc<dyn IdentityResolver>,
	) -> Self {
		Self { cfg, connector, resolver }
	}

	/// Executes a query. The outcome variant follows the request flags:
	/// `explain` yields `Plan`, `deduplicate` yields `Consolidated`,
	/// otherwise `Rows`.
	pub fn execute(&self, request: ExecuteRequest) -> ServiceResult<ExecuteOutcome> {
		execute::execute(self, request)
	}

	/// Requests the execution plan without fetching rows, enriched with
	/// derived warnings and recommendations.
	pub fn explain(&self, request: ExplainRequest) -> ServiceResult<QueryExecutionPlan> {
		explain::explain(self, request)
	}

	/// Consolidates already-materialized rows; no store access.
	pub fn deduplicate(
		&self,
		results: &[Value],
		similarity_threshold: Option<f64>,
		max_results: Option<usize>,
	) -> FormattedResults {
		consolidate::deduplicate(
			results,
			self.resolver.as_ref(),
			similarity_threshold.unwrap_or(self.cfg.consolidation.similarity_threshold),
			max_results.or(self.cfg.consolidation.max_results),
		)
	}

	pub fn format_for_display(
		&self,
		results: &FormattedResults,
		options: &DisplayOptions,
	) -> String {
		display::format_results(results, options, self.cfg.display.max_categories)
	}
}

/// A store timeout is a hard infrastructure failure: fail fast, never retry,
/// never return a partial result.
pub(crate) fn fatal_timeout(message: &str) -> ! {
	tracing::error!(%message, "Store timed out; terminating.");

	std::process::exit(1);
}
