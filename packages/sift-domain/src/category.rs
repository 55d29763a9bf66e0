//! Category tagging over heterogeneous result items.

use serde_json::Value;

use crate::item::{display_name, get_path, get_str};

/// MIME-type-like fields, first match wins.
const MIME_FIELDS: [&str; 3] = ["MimeType", "mime_type", "mimetype"];

/// Semantic-label attributes that count as categories. Fixed allow-list;
/// anything else an item carries is ignored.
const SEMANTIC_LABELS: [&str; 3] = ["FileType", "ContentType", "Category"];

const MAX_EXTENSION_LEN: usize = 10;

/// Collects the category tags one item contributes: a file-extension tag,
/// MIME tags (full type plus its top-level half), and allow-listed semantic
/// labels. Duplicates within one item are kept; the caller counts
/// occurrences.
pub fn categories_of(item: &Value) -> Vec<String> {
	let mut tags = Vec::new();

	if let Some(extension) = display_name(item).and_then(extension_of) {
		tags.push(format!("ext:{extension}"));
	}
	if let Some(mime) = MIME_FIELDS.iter().find_map(|field| get_str(item, field)) {
		tags.push(format!("mime:{mime}"));

		if let Some((top_level, _)) = mime.split_once('/') {
			tags.push(format!("mime:{top_level}"));
		}
	}

	for label in SEMANTIC_LABELS {
		let value = get_str(item, label)
			.or_else(|| get_path(item, &["SemanticAttributes", label]).and_then(Value::as_str));

		if let Some(value) = value {
			tags.push(format!("{label}:{value}"));
		}
	}

	tags
}

/// A file-extension-like suffix: short, alphanumeric, after the final dot.
fn extension_of(name: &str) -> Option<String> {
	let (stem, suffix) = name.rsplit_once('.')?;

	if stem.is_empty()
		|| suffix.is_empty()
		|| suffix.len() > MAX_EXTENSION_LEN
		|| !suffix.chars().all(|c| c.is_ascii_alphanumeric())
	{
		return None;
	}

	Some(suffix.to_ascii_lowercase())
}
