//! Total accessors over heterogeneous result items.
//!
//! A result item is one row of query output: a `serde_json::Value` that is
//! usually an object but carries no guaranteed schema. Every accessor here
//! returns `Option` and tolerates arbitrary input.

use serde_json::Value;

/// Field names tried, in order, when a human-readable name is needed.
const NAME_FIELDS: [&str; 6] = ["Label", "name", "Name", "path", "Path", "URI"];

/// Top-level fields that carry a content checksum.
const CHECKSUM_FIELDS: [&str; 3] = ["checksum", "Checksum", "sha256"];

/// Nested lookup: `get_path(item, &["Record", "Attributes", "st_mtime"])`.
pub fn get_path<'a>(item: &'a Value, path: &[&str]) -> Option<&'a Value> {
	let mut current = item;

	for key in path {
		current = current.as_object()?.get(*key)?;
	}

	Some(current)
}

pub fn get_str<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
	item.as_object()?.get(key)?.as_str()
}

/// Best-effort display name for an item.
pub fn display_name(item: &Value) -> Option<&str> {
	NAME_FIELDS.iter().find_map(|field| get_str(item, field))
}

/// Strong identifier used for exact-match grouping: a content checksum, or
/// the object identifier under the conventional attributes path. The two
/// namespaces are prefixed so a checksum can never collide with an object id.
pub fn strong_identifier(item: &Value) -> Option<String> {
	if let Some(checksum) = CHECKSUM_FIELDS.iter().find_map(|field| get_str(item, field)) {
		return Some(format!("checksum:{checksum}"));
	}

	let object_id = get_path(item, &["Record", "Attributes", "ObjectIdentifier"])
		.or_else(|| get_path(item, &["ObjectIdentifier"]))?
		.as_str()?;

	Some(format!("object:{object_id}"))
}
