//! The candidate filter seam.

use crate::types::{Candidate, UserContext};
use anyhow::Result;

/// A stage that removes candidates a user should not be shown.
///
/// Survivors keep their relative order. A filter may consult shared
/// catalog data but never scores candidates; scoring happens after the
/// whole pipeline ran.
pub trait Filter: Send + Sync {
    /// Short identifier used in pipeline logs
    fn name(&self) -> &str;

    fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>>;
}
