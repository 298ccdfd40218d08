//! Configuration for model building

use serde::{Deserialize, Serialize};

/// What to do when a new primary key replaces one that foreign keys reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimaryKeyReplacement {
    /// Fail unless every referencing foreign key can move to the new key
    #[default]
    AllOrNothing,
    /// Move what can be moved and keep the old key for the rest
    BestEffort,
}

/// Configuration for the model builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelBuilderConfig {
    /// How to handle foreign keys referencing a replaced primary key
    pub primary_key_replacement: PrimaryKeyReplacement,

    /// Base name of the key property synthesized for principals without a primary key
    pub shadow_key_property_name: String,

    /// Remove convention-only entity types that lose their last incoming navigation
    pub prune_unreachable_entity_types: bool,
}

impl Default for ModelBuilderConfig {
    fn default() -> Self {
        Self {
            primary_key_replacement: PrimaryKeyReplacement::AllOrNothing,
            shadow_key_property_name: "TempId".to_string(),
            prune_unreachable_entity_types: true,
        }
    }
}

impl ModelBuilderConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> ModelBuilderConfigBuilder {
        ModelBuilderConfigBuilder::default()
    }
}

/// Builder for ModelBuilderConfig
#[derive(Debug, Default)]
pub struct ModelBuilderConfigBuilder {
    config: ModelBuilderConfig,
}

impl ModelBuilderConfigBuilder {
    /// Set the primary key replacement policy
    pub fn primary_key_replacement(mut self, policy: PrimaryKeyReplacement) -> Self {
        self.config.primary_key_replacement = policy;
        self
    }

    /// Set the name of synthesized key properties (blank names are ignored)
    pub fn shadow_key_property_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.config.shadow_key_property_name = name;
        }
        self
    }

    /// Enable or disable unreachable entity type pruning
    pub fn prune_unreachable_entity_types(mut self, prune: bool) -> Self {
        self.config.prune_unreachable_entity_types = prune;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ModelBuilderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelBuilderConfig::default();
        assert_eq!(config.primary_key_replacement, PrimaryKeyReplacement::AllOrNothing);
        assert_eq!(config.shadow_key_property_name, "TempId");
        assert!(config.prune_unreachable_entity_types);
    }

    #[test]
    fn test_builder() {
        let config = ModelBuilderConfig::builder()
            .primary_key_replacement(PrimaryKeyReplacement::BestEffort)
            .shadow_key_property_name("  ")
            .prune_unreachable_entity_types(false)
            .build();

        assert_eq!(config.primary_key_replacement, PrimaryKeyReplacement::BestEffort);
        assert_eq!(config.shadow_key_property_name, "TempId");
        assert!(!config.prune_unreachable_entity_types);
    }

    #[test]
    fn test_deserialize_partial_camel_case() {
        let config: ModelBuilderConfig =
            serde_json::from_str(r#"{"primaryKeyReplacement":"bestEffort"}"#).unwrap();
        assert_eq!(config.primary_key_replacement, PrimaryKeyReplacement::BestEffort);
        assert_eq!(config.shadow_key_property_name, "TempId");
    }
}
