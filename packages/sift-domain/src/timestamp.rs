//! Best-effort modification-timestamp extraction.
//!
//! Items come from dozens of recorders and agree on no single timestamp
//! field. Extraction tries a fixed candidate list and the first successful
//! parse wins; when nothing parses the item simply has no timestamp.

use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::item::get_path;

/// POSIX stat fields under the conventional attributes path, most
/// authoritative first: modification, then change, then access time.
const POSIX_FIELDS: [&str; 3] = ["st_mtime", "st_ctime", "st_atime"];

/// Conventionally named top-level timestamp fields.
const TOP_LEVEL_FIELDS: [&str; 6] =
	["timestamp", "Timestamp", "st_mtime", "modified", "last_modified", "created_at"];

/// Extracts the item's modification timestamp, if any candidate field parses.
pub fn modified_at(item: &Value) -> Option<OffsetDateTime> {
	for field in POSIX_FIELDS {
		if let Some(value) = get_path(item, &["Record", "Attributes", field])
			&& let Some(parsed) = parse_timestamp(value)
		{
			return Some(parsed);
		}
	}

	for field in TOP_LEVEL_FIELDS {
		if let Some(value) = get_path(item, &[field])
			&& let Some(parsed) = parse_timestamp(value)
		{
			return Some(parsed);
		}
	}

	None
}

/// Accepts an RFC 3339 string or a numeric epoch (fractional seconds kept).
fn parse_timestamp(value: &Value) -> Option<OffsetDateTime> {
	match value {
		Value::String(raw) => OffsetDateTime::parse(raw, &Rfc3339).ok(),
		Value::Number(number) => {
			let seconds = number.as_f64()?;

			if !seconds.is_finite() {
				return None;
			}

			OffsetDateTime::from_unix_timestamp_nanos((seconds * 1e9) as i128).ok()
		},
		_ => None,
	}
}
