//! Build counter stamped on every published index

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of index builds that have been published.
///
/// Starts at 0 before the first build, so the first published index is
/// generation 1. Serializes as a bare integer.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: u64) -> Self {
        Self(value)
    }

    /// Generation the next successful build will carry.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_build_is_generation_one() {
        let unpublished = Generation::new();
        assert_eq!(unpublished.value(), 0);
        assert_eq!(unpublished.next(), Generation::from_value(1));
        assert!(unpublished.next() > unpublished);
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_value(Generation::from_value(7)).unwrap();
        assert_eq!(json, serde_json::json!(7));
        assert_eq!(Generation::from_value(7).to_string(), "gen-7");
    }
}
