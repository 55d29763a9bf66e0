//! Result consolidation: groups near-duplicate items under a single
//! representative and computes summary statistics.
//!
//! Two grouping passes run over the recency-ordered input. The exact-match
//! pass seals groups sharing a strong identifier without ever consulting the
//! identity resolver; the similarity pass is pairwise over what remains and
//! is O(n^2) in that remainder. Callers with thousands of rows should
//! pre-filter or shard before calling in here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use sift_domain::{IdentityResolver, categories_of, modified_at, strong_identifier};

/// One deduplicated group. The primary is the most recently modified member;
/// ties keep original scan order and timestamp-less items sort last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultGroup {
	pub primary: Value,
	pub duplicates: Vec<Value>,
	/// Parallel to `duplicates`; reporting-only scores against the primary.
	pub similarity_scores: Vec<f64>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub last_modified: Option<OffsetDateTime>,
	pub item_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedResults {
	/// Sorted by `item_count` descending: heavier duplication surfaces first.
	pub result_groups: Vec<ResultGroup>,
	pub original_count: usize,
	pub unique_count: usize,
	pub suppressed_count: usize,
	pub summary: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub query_time_seconds: Option<f64>,
	pub categories: BTreeMap<String, u64>,
}

/// Groups `results` into deduplicated `ResultGroup`s. Deterministic given
/// the same input order and a deterministic resolver; all state is local to
/// the call.
pub fn deduplicate(
	results: &[Value],
	resolver: &dyn IdentityResolver,
	similarity_threshold: f64,
	max_results: Option<usize>,
) -> FormattedResults {
	let ordered = order_by_recency(results);
	let clusters = cluster(&ordered, resolver, similarity_threshold);
	let mut groups: Vec<ResultGroup> = clusters
		.into_iter()
		.map(|members| build_group(&ordered, &members, resolver))
		.collect();

	// Stable: clusters of equal size keep their creation order.
	groups.sort_by(|a, b| b.item_count.cmp(&a.item_count));

	if let Some(max_results) = max_results {
		groups.truncate(max_results);
	}

	let original_count = results.len();
	let unique_count = groups.len();
	let suppressed_count = original_count - unique_count;
	let summary = if suppressed_count > 0 {
		format!("Found {unique_count} unique items ({suppressed_count} duplicates suppressed)")
	} else {
		format!("Found {unique_count} unique items")
	};

	FormattedResults {
		result_groups: groups,
		original_count,
		unique_count,
		suppressed_count,
		summary,
		query_time_seconds: None,
		categories: count_categories(results),
	}
}

struct OrderedItem<'a> {
	item: &'a Value,
	modified: Option<OffsetDateTime>,
}

/// Recency ordering decides which member of a cluster becomes the primary,
/// so it is load-bearing for reproducibility: the sort is stable, most
/// recent first, items without a timestamp last.
fn order_by_recency<'a>(results: &'a [Value]) -> Vec<OrderedItem<'a>> {
	let mut ordered: Vec<OrderedItem<'a>> =
		results.iter().map(|item| OrderedItem { item, modified: modified_at(item) }).collect();

	ordered.sort_by(|a, b| match (a.modified, b.modified) {
		(Some(a), Some(b)) => b.cmp(&a),
		(Some(_), None) => std::cmp::Ordering::Less,
		(None, Some(_)) => std::cmp::Ordering::Greater,
		(None, None) => std::cmp::Ordering::Equal,
	});

	ordered
}

/// Index clusters over `ordered`, exact-match pass first, then the pairwise
/// similarity pass. The first index of each cluster is its primary.
fn cluster(
	ordered: &[OrderedItem<'_>],
	resolver: &dyn IdentityResolver,
	similarity_threshold: f64,
) -> Vec<Vec<usize>> {
	let mut clusters: Vec<Vec<usize>> = Vec::new();
	let mut processed = vec![false; ordered.len()];
	let mut sealed_by_id: BTreeMap<String, usize> = BTreeMap::new();

	for (position, entry) in ordered.iter().enumerate() {
		let Some(identifier) = strong_identifier(entry.item) else {
			continue;
		};

		match sealed_by_id.get(&identifier) {
			Some(&cluster_idx) => clusters[cluster_idx].push(position),
			None => {
				sealed_by_id.insert(identifier, clusters.len());
				clusters.push(vec![position]);
			},
		}

		processed[position] = true;
	}

	for position in 0..ordered.len() {
		if processed[position] {
			continue;
		}

		processed[position] = true;

		let mut members = vec![position];

		for candidate in position + 1..ordered.len() {
			if processed[candidate] {
				continue;
			}

			let resolution = resolver.resolve(
				ordered[position].item,
				ordered[candidate].item,
				similarity_threshold,
			);

			if resolution.is_same {
				processed[candidate] = true;
				members.push(candidate);
			}
		}

		clusters.push(members);
	}

	clusters
}

fn build_group(
	ordered: &[OrderedItem<'_>],
	members: &[usize],
	resolver: &dyn IdentityResolver,
) -> ResultGroup {
	let primary = ordered[members[0]].item;
	let duplicates: Vec<Value> =
		members[1..].iter().map(|&position| ordered[position].item.clone()).collect();
	// Reporting-only: threshold zero always accepts, so every duplicate gets
	// a score against the primary.
	let similarity_scores: Vec<f64> = members[1..]
		.iter()
		.map(|&position| resolver.resolve(primary, ordered[position].item, 0.0).score)
		.collect();

	ResultGroup {
		primary: primary.clone(),
		item_count: 1 + duplicates.len(),
		last_modified: ordered[members[0]].modified,
		duplicates,
		similarity_scores,
	}
}

fn count_categories(results: &[Value]) -> BTreeMap<String, u64> {
	let mut categories = BTreeMap::new();

	for item in results {
		for tag in categories_of(item) {
			*categories.entry(tag).or_insert(0) += 1;
		}
	}

	categories
}

#[cfg(test)]
mod tests {
	use serde_json::{Value, json};

	use sift_domain::{IdentityResolver, Resolution};

	use crate::consolidate::deduplicate;

	/// Resolver that panics when consulted for grouping; singleton-only
	/// inputs must never reach the similarity seam at all.
	struct PanickingResolver;
	impl IdentityResolver for PanickingResolver {
		fn resolve(&self, _: &Value, _: &Value, _: f64) -> Resolution {
			panic!("identity resolver must not be consulted for sealed singletons");
		}
	}

	struct NeverSame;
	impl IdentityResolver for NeverSame {
		fn resolve(&self, _: &Value, _: &Value, _: f64) -> Resolution {
			Resolution { is_same: false, score: 0.1 }
		}
	}

	#[test]
	fn identical_timestamps_keep_original_scan_order() {
		let results = vec![
			json!({ "name": "first", "timestamp": "2024-05-01T00:00:00Z" }),
			json!({ "name": "second", "timestamp": "2024-05-01T00:00:00Z" }),
		];
		let formatted = deduplicate(&results, &NeverSame, 1.0, None);

		assert_eq!(formatted.result_groups[0].primary["name"], json!("first"));
		assert_eq!(formatted.result_groups[1].primary["name"], json!("second"));
	}

	#[test]
	fn timestampless_items_sort_last() {
		let results = vec![
			json!({ "name": "undated" }),
			json!({ "name": "dated", "timestamp": "2024-05-01T00:00:00Z", "checksum": "a" }),
		];
		let formatted = deduplicate(&results, &NeverSame, 0.9, None);

		assert_eq!(formatted.result_groups[0].primary["name"], json!("dated"));
	}

	#[test]
	fn max_results_truncates_and_counts_stay_consistent() {
		let results: Vec<Value> =
			(0..4).map(|i| json!({ "name": format!("f{i}"), "checksum": format!("c{i}") })).collect();
		let formatted = deduplicate(&results, &PanickingResolver, 0.9, Some(2));

		assert_eq!(formatted.result_groups.len(), 2);
		assert_eq!(formatted.original_count, 4);
		assert_eq!(formatted.unique_count, 2);
		assert_eq!(formatted.suppressed_count, 2);
		assert_eq!(
			formatted.original_count,
			formatted.unique_count + formatted.suppressed_count,
		);
	}

	#[test]
	fn categories_cover_every_input_item() {
		let results = vec![
			json!({ "name": "a.pdf", "checksum": "x" }),
			json!({ "name": "b.pdf", "checksum": "x" }),
			json!({ "name": "c.txt", "checksum": "y" }),
		];
		let formatted = deduplicate(&results, &NeverSame, 0.9, None);

		assert_eq!(formatted.categories.get("ext:pdf"), Some(&2));
		assert_eq!(formatted.categories.get("ext:txt"), Some(&1));
	}
}
