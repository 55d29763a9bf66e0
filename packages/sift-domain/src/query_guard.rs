//! Cheap local query-syntax guard, run before a query is submitted.
//!
//! Not a parser: the store validates queries itself. This only rejects the
//! obviously broken ones (no selection/projection keywords, unbalanced
//! brackets) without a network round-trip.

use regex::Regex;

/// Keywords that select data from a collection.
const SELECTION_KEYWORDS: [&str; 2] = ["FOR", "SEARCH"];

/// Keywords that project a result.
const PROJECTION_KEYWORDS: [&str; 2] = ["RETURN", "COLLECT"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryGuardError {
	MissingSelectionKeyword,
	MissingProjectionKeyword,
	UnbalancedBrackets { detail: String },
}
impl std::fmt::Display for QueryGuardError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::MissingSelectionKeyword =>
				write!(f, "Query has no data-selection keyword (FOR or SEARCH)."),
			Self::MissingProjectionKeyword =>
				write!(f, "Query has no projection keyword (RETURN or COLLECT)."),
			Self::UnbalancedBrackets { detail } => write!(f, "Unbalanced brackets: {detail}."),
		}
	}
}
impl std::error::Error for QueryGuardError {}

pub fn check_query(query: &str) -> Result<(), QueryGuardError> {
	if !contains_any_keyword(query, &SELECTION_KEYWORDS) {
		return Err(QueryGuardError::MissingSelectionKeyword);
	}
	if !contains_any_keyword(query, &PROJECTION_KEYWORDS) {
		return Err(QueryGuardError::MissingProjectionKeyword);
	}

	check_brackets(query)
}

fn contains_any_keyword(query: &str, keywords: &[&str]) -> bool {
	keywords.iter().any(|keyword| {
		Regex::new(&format!(r"(?i)\b{keyword}\b")).map(|re| re.is_match(query)).unwrap_or(false)
	})
}

fn check_brackets(query: &str) -> Result<(), QueryGuardError> {
	let mut stack = Vec::new();

	for (position, c) in query.char_indices() {
		match c {
			'(' | '[' | '{' => stack.push(c),
			')' | ']' | '}' => {
				let expected = match c {
					')' => '(',
					']' => '[',
					_ => '{',
				};

				if stack.pop() != Some(expected) {
					return Err(QueryGuardError::UnbalancedBrackets {
						detail: format!("unexpected '{c}' at byte {position}"),
					});
				}
			},
			_ => {},
		}
	}

	if let Some(open) = stack.pop() {
		return Err(QueryGuardError::UnbalancedBrackets {
			detail: format!("unclosed '{open}'"),
		});
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::query_guard::{QueryGuardError, check_query};

	#[test]
	fn accepts_a_plain_selection_and_projection() {
		assert!(check_query("FOR doc IN Objects FILTER doc.size > @minSize RETURN doc").is_ok());
		assert!(check_query("for doc in Objects collect kind = doc.kind return kind").is_ok());
	}

	#[test]
	fn rejects_missing_keywords() {
		assert_eq!(
			check_query("RETURN 1 + 1"),
			Err(QueryGuardError::MissingSelectionKeyword),
		);
		assert_eq!(
			check_query("FOR doc IN Objects FILTER doc.size > 1"),
			Err(QueryGuardError::MissingProjectionKeyword),
		);
	}

	#[test]
	fn keywords_match_on_word_boundaries_only() {
		// "FORMAT" and "RETURNED" must not satisfy the guard.
		assert_eq!(
			check_query("FORMAT x RETURNED y"),
			Err(QueryGuardError::MissingSelectionKeyword),
		);
	}

	#[test]
	fn rejects_unbalanced_brackets() {
		assert!(matches!(
			check_query("FOR doc IN Objects RETURN { a: doc.a"),
			Err(QueryGuardError::UnbalancedBrackets { .. }),
		));
		assert!(matches!(
			check_query("FOR doc IN Objects RETURN doc.a]"),
			Err(QueryGuardError::UnbalancedBrackets { .. }),
		));
		assert!(matches!(
			check_query("FOR doc IN Objects RETURN (doc.a]"),
			Err(QueryGuardError::UnbalancedBrackets { .. }),
		));
	}
}
