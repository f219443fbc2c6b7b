use serde::{Deserialize, Serialize};

/// How a posting's `frequency` is accumulated while documents are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyPolicy {
    /// `frequency` always equals the number of recorded positions.
    #[default]
    Normalized,
    /// The first occurrence of a term in a document seeds `frequency` from its
    /// count hint; every later occurrence adds exactly one.
    SeedFromHint,
}

impl FrequencyPolicy {
    pub(crate) fn to_tag(self) -> u8 {
        match self {
            FrequencyPolicy::Normalized => 0,
            FrequencyPolicy::SeedFromHint => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FrequencyPolicy::Normalized),
            1 => Some(FrequencyPolicy::SeedFromHint),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub frequency_policy: FrequencyPolicy,
    /// Log a warning when a docId that is already indexed is added again.
    pub warn_on_readd: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { frequency_policy: FrequencyPolicy::Normalized, warn_on_readd: true }
    }
}

impl IndexConfig {
    pub fn with_policy(frequency_policy: FrequencyPolicy) -> Self {
        Self { frequency_policy, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_tags_round_trip() {
        for p in [FrequencyPolicy::Normalized, FrequencyPolicy::SeedFromHint] {
            assert_eq!(FrequencyPolicy::from_tag(p.to_tag()), Some(p));
        }
        assert_eq!(FrequencyPolicy::from_tag(7), None);
    }
}
