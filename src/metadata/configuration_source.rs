//! Provenance lattice for model configuration
//!
//! Every mutable aspect of the model (a key's existence, a relationship's
//! foreign key properties, an ignored member, ...) records the configuration
//! source that last authorized it. A later change is only applied when its
//! source overrides the recorded one.

use serde::{Deserialize, Serialize};

/// Where a piece of configuration came from, ordered by authority
///
/// `Convention < DataAnnotation < Explicit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigurationSource {
    /// Inferred by an automatic convention
    Convention,
    /// Declared through a data annotation on the native type
    DataAnnotation,
    /// Configured explicitly by the user
    Explicit,
}

impl ConfigurationSource {
    /// All sources, lowest rank first
    pub const ALL: [ConfigurationSource; 3] = [
        ConfigurationSource::Convention,
        ConfigurationSource::DataAnnotation,
        ConfigurationSource::Explicit,
    ];

    /// True iff this source ranks at least as high as `other`
    pub fn overrides(self, other: ConfigurationSource) -> bool {
        self >= other
    }

    /// Like [`overrides`](Self::overrides), an absent source is always overridden
    pub fn overrides_opt(self, other: Option<ConfigurationSource>) -> bool {
        other.is_none_or(|other| self.overrides(other))
    }

    /// The higher ranked of the two, an absent source ranks below everything
    pub fn max_with(self, other: Option<ConfigurationSource>) -> ConfigurationSource {
        match other {
            Some(other) if other > self => other,
            _ => self,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConfigurationSource::Convention => "convention",
            ConfigurationSource::DataAnnotation => "data annotation",
            ConfigurationSource::Explicit => "explicit",
        }
    }
}

/// `Max` over two optional sources
pub fn max_source(
    a: Option<ConfigurationSource>,
    b: Option<ConfigurationSource>,
) -> Option<ConfigurationSource> {
    match (a, b) {
        (Some(a), b) => Some(a.max_with(b)),
        (None, b) => b,
    }
}

/// True when a recorded source exists and it overrides `source`
///
/// Used for "keep the existing value because it is more authoritative" checks.
pub fn pinned_above(recorded: Option<ConfigurationSource>, source: ConfigurationSource) -> bool {
    recorded.is_some_and(|recorded| recorded.overrides(source))
}

impl std::fmt::Display for ConfigurationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConfigurationSource::*;

    #[test]
    fn test_max_overrides_both_operands() {
        for a in ConfigurationSource::ALL {
            for b in ConfigurationSource::ALL {
                let max = a.max_with(Some(b));
                assert!(max.overrides(a));
                assert!(max.overrides(b));
            }
        }
    }

    #[test]
    fn test_rank_order() {
        assert!(Explicit.overrides(Convention));
        assert!(!Convention.overrides(Explicit));
        assert!(DataAnnotation.overrides(DataAnnotation));
        assert!(!DataAnnotation.overrides(Explicit));
    }

    #[test]
    fn test_absent_source_is_lowest() {
        assert_eq!(Convention.max_with(None), Convention);
        assert!(Convention.overrides_opt(None));
        assert_eq!(max_source(None, None), None);
        assert_eq!(max_source(None, Some(DataAnnotation)), Some(DataAnnotation));
        assert_eq!(max_source(Some(Explicit), Some(Convention)), Some(Explicit));
        assert!(!pinned_above(None, Convention));
        assert!(pinned_above(Some(Explicit), DataAnnotation));
    }
}
