//! Detached relationships
//!
//! A snapshot records a foreign key by value: its two ends, its property lists
//! by name and type, its navigations and the configuration sources of its
//! builder. Attaching it re-creates an equivalent relationship even when the
//! original foreign key, or some of its properties, no longer exist.

use tracing::debug;

use super::entity_type_builder::{InternalEntityTypeBuilder, NewRelationship, RelationshipMerge};
use super::error::BuildResult;
use super::model_builder::InternalModelBuilder;
use super::relationship_builder::{InternalRelationshipBuilder, RelationshipBuilderState};
use crate::metadata::{ConfigurationSource, EntityTypeId, ForeignKeyId, Model, PropertyId, PropertyType};

/// A property captured by name and type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: String,
    pub property_type: PropertyType,
    pub is_shadow: bool,
}

impl PropertySpec {
    pub(crate) fn capture(model: &Model, properties: &[PropertyId]) -> Vec<PropertySpec> {
        properties
            .iter()
            .map(|p| {
                let property = model.property(*p);
                PropertySpec {
                    name: property.name().to_string(),
                    property_type: property.property_type().clone(),
                    is_shadow: property.is_shadow(),
                }
            })
            .collect()
    }
}

/// Find every captured property on `entity_type` by name
fn find_all(model: &Model, entity_type: EntityTypeId, specs: &[PropertySpec]) -> Option<Vec<PropertyId>> {
    specs
        .iter()
        .map(|spec| model.find_property(entity_type, &spec.name))
        .collect()
}

#[derive(Debug, Clone)]
pub struct RelationshipSnapshot {
    pub(crate) foreign_key: ForeignKeyId,
    pub(crate) principal: EntityTypeId,
    pub(crate) dependent: EntityTypeId,
    pub(crate) properties: Vec<PropertySpec>,
    pub(crate) principal_properties: Vec<PropertySpec>,
    pub(crate) is_unique: Option<bool>,
    pub(crate) is_required: Option<bool>,
    pub(crate) navigation_to_principal: Option<String>,
    pub(crate) navigation_to_dependent: Option<String>,
    pub(crate) state: RelationshipBuilderState,
    pub(crate) configuration_source: ConfigurationSource,
}

impl RelationshipSnapshot {
    /// Capture a relationship that is still part of the model
    pub fn capture(mb: &InternalModelBuilder, foreign_key: ForeignKeyId) -> Option<RelationshipSnapshot> {
        let model = mb.model();
        let fk = model.try_foreign_key(foreign_key)?;
        let dependent = fk.declaring_entity_type();
        let configuration_source = mb
            .entity_state(dependent)
            .map(|s| s.relationships.configuration_source(foreign_key))
            .unwrap_or(ConfigurationSource::Explicit);

        Some(RelationshipSnapshot {
            foreign_key,
            principal: fk.principal_entity_type(),
            dependent,
            properties: PropertySpec::capture(model, fk.properties()),
            principal_properties: PropertySpec::capture(model, model.key(fk.principal_key()).properties()),
            is_unique: fk.configured_unique(),
            is_required: fk.configured_required(),
            navigation_to_principal: fk.dependent_to_principal().map(str::to_string),
            navigation_to_dependent: fk.principal_to_dependent().map(str::to_string),
            state: InternalRelationshipBuilder(foreign_key).state(mb),
            configuration_source,
        })
    }

    pub fn foreign_key(&self) -> ForeignKeyId {
        self.foreign_key
    }

    pub fn principal_entity_type(&self) -> EntityTypeId {
        self.principal
    }

    pub fn dependent_entity_type(&self) -> EntityTypeId {
        self.dependent
    }

    pub fn navigation_to_principal(&self) -> Option<&str> {
        self.navigation_to_principal.as_deref()
    }

    pub fn navigation_to_dependent(&self) -> Option<&str> {
        self.navigation_to_dependent.as_deref()
    }

    pub fn configuration_source(&self) -> ConfigurationSource {
        self.configuration_source
    }

    pub(crate) fn with_state(mut self, state: RelationshipBuilderState) -> Self {
        self.state = state;
        self
    }

    pub(crate) fn with_configuration_source(mut self, source: ConfigurationSource) -> Self {
        self.configuration_source = source;
        self
    }

    /// Re-create the relationship at the source it was detached with
    pub fn attach(&self, mb: &mut InternalModelBuilder) -> BuildResult<InternalRelationshipBuilder> {
        let source = self.configuration_source;
        if let Some(fk) = mb.model().try_foreign_key(self.foreign_key) {
            let dependent = InternalEntityTypeBuilder(fk.declaring_entity_type());
            return Ok(Some(dependent.relationship_for(mb, self.foreign_key, true, source)));
        }

        let model = mb.model();
        if !model.contains_entity_type(self.principal) || !model.contains_entity_type(self.dependent) {
            return Ok(None);
        }

        let foreign_key_properties = self
            .state
            .foreign_key_properties_source
            .and_then(|_| find_all(model, self.dependent, &self.properties));
        let principal_properties = self
            .state
            .principal_key_source
            .and_then(|_| find_all(model, self.principal, &self.principal_properties));

        let request = NewRelationship {
            principal: self.principal,
            dependent: self.dependent,
            navigation_to_principal: None,
            navigation_to_dependent: None,
            foreign_key_properties,
            principal_properties,
            is_unique: self.state.is_unique_source.and(self.is_unique),
            is_required: self.state.is_required_source.and(self.is_required),
        };
        let merge = RelationshipMerge {
            snapshot: self,
            configuration_source: source,
        };
        let Some(mut relationship) =
            InternalEntityTypeBuilder(self.dependent).relationship_with(mb, request, source, Some(merge))?
        else {
            return Ok(None);
        };

        let inverted = relationship.dependent_entity_type(mb) != self.dependent;
        if let Some(name) = self.navigation_to_principal.as_deref() {
            let renamed = if inverted {
                relationship.navigation_to_dependent(mb, Some(name), source, None)?
            } else {
                relationship.navigation_to_principal(mb, Some(name), source, None)?
            };
            let Some(renamed) = renamed else {
                return Ok(None);
            };
            relationship = renamed;
        }
        if let Some(name) = self.navigation_to_dependent.as_deref() {
            let renamed = if inverted {
                relationship.navigation_to_principal(mb, Some(name), source, None)?
            } else {
                relationship.navigation_to_dependent(mb, Some(name), source, None)?
            };
            let Some(renamed) = renamed else {
                return Ok(None);
            };
            relationship = renamed;
        }

        debug!(
            dependent = mb.model().entity_type(self.dependent).name(),
            principal = mb.model().entity_type(self.principal).name(),
            source = %source,
            "relationship attached"
        );
        Ok(Some(relationship))
    }
}
