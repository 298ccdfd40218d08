//! Entity type builder
//!
//! The hub of model building: it owns the configuration sources of the keys,
//! properties, indexes and relationships declared on one entity type, and
//! orchestrates the cascades that keep the graph consistent when any of them
//! change.

mod base_type;
mod keys;
mod members;
mod relationships;

use std::collections::BTreeMap;

pub use relationships::NewRelationship;
pub(crate) use members::can_remove_foreign_key;
pub(crate) use relationships::RelationshipMerge;

use super::metadata_dictionary::MetadataDictionary;
use super::model_builder::InternalModelBuilder;
use super::property_builder::PropertyBuilderState;
use super::relationship_builder::RelationshipBuilderState;
use crate::metadata::{
    ConfigurationSource, EntityType, EntityTypeId, ForeignKeyId, IndexId, KeyId, PropertyId,
};

/// Builder bookkeeping for one entity type
#[derive(Debug, Clone, Default)]
pub struct EntityTypeBuilderState {
    pub(crate) keys: MetadataDictionary<KeyId, ()>,
    pub(crate) properties: MetadataDictionary<PropertyId, PropertyBuilderState>,
    pub(crate) indexes: MetadataDictionary<IndexId, ()>,
    /// Relationships declared on this type, i.e. where it is the dependent
    pub(crate) relationships: MetadataDictionary<ForeignKeyId, RelationshipBuilderState>,
    pub(crate) ignored_members: BTreeMap<String, ConfigurationSource>,
    pub(crate) base_type_source: Option<ConfigurationSource>,
}

impl EntityTypeBuilderState {
    pub fn key_source(&self, key: KeyId) -> ConfigurationSource {
        self.keys.configuration_source(key)
    }

    pub fn property_source(&self, property: PropertyId) -> ConfigurationSource {
        self.properties.configuration_source(property)
    }

    pub fn relationship_source(&self, foreign_key: ForeignKeyId) -> ConfigurationSource {
        self.relationships.configuration_source(foreign_key)
    }

    pub fn ignored_source(&self, name: &str) -> Option<ConfigurationSource> {
        self.ignored_members.get(name).copied()
    }

    pub fn base_type_source(&self) -> Option<ConfigurationSource> {
        self.base_type_source
    }
}

/// Handle for configuring one entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternalEntityTypeBuilder(pub(crate) EntityTypeId);

impl InternalEntityTypeBuilder {
    pub fn id(self) -> EntityTypeId {
        self.0
    }

    pub fn metadata(self, mb: &InternalModelBuilder) -> &EntityType {
        mb.model().entity_type(self.0)
    }

    pub fn name(self, mb: &InternalModelBuilder) -> String {
        self.metadata(mb).name().to_string()
    }
}
