//! The identity-resolution seam.
//!
//! Deciding whether two items are the same logical thing is delegated to an
//! external resolver. The consolidation engine consumes this trait; test
//! doubles live in `sift-testkit`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
	pub is_same: bool,
	pub score: f64,
}

/// Must be pure and deterministic for fixed inputs; group membership and
/// primary selection are only reproducible if the resolver is.
pub trait IdentityResolver
where
	Self: Send + Sync,
{
	fn resolve(&self, a: &Value, b: &Value, threshold: f64) -> Resolution;
}
