//! Human-readable rendering of consolidated results. Pure presentation:
//! no store access, no mutation of the input.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;

use sift_domain::display_name;

use crate::consolidate::{FormattedResults, ResultGroup};

const ABBREVIATED_ITEM_LEN: usize = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayOptions {
	pub include_duplicates: bool,
	pub max_groups: Option<usize>,
	pub include_summary: bool,
}
impl Default for DisplayOptions {
	fn default() -> Self {
		Self { include_duplicates: true, max_groups: None, include_summary: true }
	}
}

pub fn format_results(
	results: &FormattedResults,
	options: &DisplayOptions,
	max_categories: usize,
) -> String {
	let mut out = String::new();

	if options.include_summary {
		out.push_str(&results.summary);
		out.push('\n');

		if let Some(seconds) = results.query_time_seconds {
			out.push_str(&format!("Query time: {seconds:.3}s\n"));
		}
	}

	if !results.categories.is_empty() {
		out.push_str("Categories:\n");

		let mut entries: Vec<(&String, &u64)> = results.categories.iter().collect();

		// Busiest categories first; BTreeMap iteration already fixed the
		// name order for ties.
		entries.sort_by(|a, b| b.1.cmp(a.1));

		for (tag, count) in entries.iter().take(max_categories) {
			out.push_str(&format!("  {tag}: {count}\n"));
		}

		if entries.len() > max_categories {
			out.push_str(&format!("  ... and {} more\n", entries.len() - max_categories));
		}
	}

	let shown = options.max_groups.unwrap_or(results.result_groups.len());

	for (position, group) in results.result_groups.iter().take(shown).enumerate() {
		out.push_str(&format_group(group, position + 1, options.include_duplicates));
	}

	if results.result_groups.len() > shown {
		out.push_str(&format!("... and {} more results\n", results.result_groups.len() - shown));
	}

	out
}

pub fn format_group(group: &ResultGroup, position: usize, include_duplicates: bool) -> String {
	let mut out = format!("{position}. {}", format_item(&group.primary));

	if let Some(modified) = group.last_modified
		&& let Ok(rendered) = modified.format(&Rfc3339)
	{
		out.push_str(&format!(" (modified {rendered})"));
	}
	if group.item_count > 1 {
		out.push_str(&format!(" [{} duplicates]", group.item_count - 1));
	}

	out.push('\n');

	if include_duplicates {
		for (duplicate, score) in group.duplicates.iter().zip(&group.similarity_scores) {
			out.push_str(&format!("   - {} (similarity {score:.2})\n", format_item(duplicate)));
		}
	}

	out
}

/// Abbreviated one-line rendering of an item: its display name, or a
/// truncated compact JSON fallback for items without one.
pub fn format_item(item: &Value) -> String {
	if let Some(name) = display_name(item) {
		return name.to_string();
	}

	let mut rendered = item.to_string();

	if rendered.len() > ABBREVIATED_ITEM_LEN {
		let cut = (0..=ABBREVIATED_ITEM_LEN)
			.rev()
			.find(|&len| rendered.is_char_boundary(len))
			.unwrap_or(0);

		rendered.truncate(cut);
		rendered.push_str("...");
	}

	rendered
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use serde_json::json;

	use crate::{
		consolidate::{FormattedResults, ResultGroup},
		display::{DisplayOptions, format_item, format_results},
	};

	fn sample_results(group_count: usize, categories: &[(&str, u64)]) -> FormattedResults {
		let result_groups: Vec<ResultGroup> = (0..group_count)
			.map(|i| ResultGroup {
				primary: json!({ "name": format!("file{i}.txt") }),
				duplicates: vec![json!({ "name": format!("file{i}-copy.txt") })],
				similarity_scores: vec![0.91],
				last_modified: None,
				item_count: 2,
			})
			.collect();

		FormattedResults {
			original_count: group_count * 2,
			unique_count: group_count,
			suppressed_count: group_count,
			summary: format!(
				"Found {group_count} unique items ({group_count} duplicates suppressed)"
			),
			query_time_seconds: Some(0.25),
			categories: categories
				.iter()
				.map(|(tag, count)| (tag.to_string(), *count))
				.collect::<BTreeMap<_, _>>(),
			result_groups,
		}
	}

	#[test]
	fn renders_summary_categories_and_groups() {
		let results = sample_results(2, &[("ext:txt", 4)]);
		let rendered = format_results(&results, &DisplayOptions::default(), 5);

		assert!(rendered.starts_with("Found 2 unique items (2 duplicates suppressed)\n"));
		assert!(rendered.contains("Query time: 0.250s"));
		assert!(rendered.contains("  ext:txt: 4"));
		assert!(rendered.contains("1. file0.txt [1 duplicates]"));
		assert!(rendered.contains("   - file0-copy.txt (similarity 0.91)"));
	}

	#[test]
	fn caps_categories_with_a_more_tail() {
		let results = sample_results(
			1,
			&[("ext:a", 9), ("ext:b", 8), ("ext:c", 7), ("ext:d", 6), ("ext:e", 5), ("ext:f", 4)],
		);
		let rendered = format_results(&results, &DisplayOptions::default(), 5);

		assert!(rendered.contains("  ext:a: 9"));
		assert!(rendered.contains("  ext:e: 5"));
		assert!(!rendered.contains("ext:f"));
		assert!(rendered.contains("  ... and 1 more\n"));
	}

	#[test]
	fn caps_groups_with_a_more_results_tail() {
		let results = sample_results(4, &[]);
		let options = DisplayOptions { max_groups: Some(2), ..Default::default() };
		let rendered = format_results(&results, &options, 5);

		assert!(rendered.contains("2. file1.txt"));
		assert!(!rendered.contains("3. file2.txt"));
		assert!(rendered.contains("... and 2 more results\n"));
	}

	#[test]
	fn duplicates_can_be_suppressed() {
		let results = sample_results(1, &[]);
		let options = DisplayOptions { include_duplicates: false, ..Default::default() };
		let rendered = format_results(&results, &options, 5);

		assert!(!rendered.contains("similarity"));
	}

	#[test]
	fn nameless_items_fall_back_to_truncated_json() {
		let compact = format_item(&json!({ "k": "v" }));
		let long = format_item(&json!({ "data": "x".repeat(200) }));

		assert_eq!(compact, r#"{"k":"v"}"#);
		assert!(long.ends_with("..."));
		assert!(long.len() <= 63);
	}
}
