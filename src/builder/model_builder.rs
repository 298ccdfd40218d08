//! Model builder
//!
//! Registry of entity types and their builder state, and the entry point for
//! building a model.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use tracing::debug;

use super::config::ModelBuilderConfig;
use super::entity_type_builder::{EntityTypeBuilderState, InternalEntityTypeBuilder, can_remove_foreign_key};
use super::error::{BuildResult, ModelBuilderError};
use super::metadata_dictionary::MetadataDictionary;
use crate::conventions::{ConventionDispatcher, ConventionSet};
use crate::metadata::{ConfigurationSource, EntityTypeId, ForeignKeyId, Model, ModelDescription, NativeType};

#[derive(Debug, Default)]
pub struct InternalModelBuilder {
    model: Model,
    entity_types: MetadataDictionary<EntityTypeId, ()>,
    entity_builders: BTreeMap<EntityTypeId, EntityTypeBuilderState>,
    ignored_entity_types: BTreeMap<String, ConfigurationSource>,
    conventions: ConventionSet,
    config: ModelBuilderConfig,
}

impl InternalModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ModelBuilderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_conventions(mut self, conventions: ConventionSet) -> Self {
        self.conventions = conventions;
        self
    }

    pub fn config(&self) -> &ModelBuilderConfig {
        &self.config
    }

    pub fn conventions(&self) -> &ConventionSet {
        &self.conventions
    }

    pub fn conventions_mut(&mut self) -> &mut ConventionSet {
        &mut self.conventions
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub(crate) fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    pub fn describe(&self) -> ModelDescription {
        self.model.describe()
    }

    pub fn entity_state(&self, entity_type: EntityTypeId) -> Option<&EntityTypeBuilderState> {
        self.entity_builders.get(&entity_type)
    }

    pub(crate) fn entity_state_mut(&mut self, entity_type: EntityTypeId) -> &mut EntityTypeBuilderState {
        self.entity_builders.entry(entity_type).or_default()
    }

    /// The model and one entity type's builder state, borrowed together
    pub(crate) fn model_and_state(
        &mut self,
        entity_type: EntityTypeId,
    ) -> (&mut Model, &mut EntityTypeBuilderState) {
        (&mut self.model, self.entity_builders.entry(entity_type).or_default())
    }

    /// The source the entity type was configured with
    pub fn entity_type_source(&self, entity_type: EntityTypeId) -> ConfigurationSource {
        self.entity_types.configuration_source(entity_type)
    }

    pub fn ignored_entity_type_source(&self, name: &str) -> Option<ConfigurationSource> {
        self.ignored_entity_types.get(name).copied()
    }

    pub fn find_entity(&self, name: &str) -> Option<InternalEntityTypeBuilder> {
        self.model.find_entity_type(name).map(InternalEntityTypeBuilder)
    }

    /// The builder of an existing entity type, raising its source to `source`
    pub fn entity_for(&mut self, entity_type: EntityTypeId, source: ConfigurationSource) -> InternalEntityTypeBuilder {
        if !self.entity_types.try_get(entity_type, source) {
            self.entity_types.insert(entity_type, (), source);
        }
        InternalEntityTypeBuilder(entity_type)
    }

    /// Add or configure an entity type without a native type
    pub fn entity(&mut self, name: &str, source: ConfigurationSource) -> BuildResult<InternalEntityTypeBuilder> {
        self.add_entity_type(name, None, source)
    }

    /// Add or configure an entity type backed by `native_type`
    pub fn entity_with_native_type(
        &mut self,
        native_type: NativeType,
        source: ConfigurationSource,
    ) -> BuildResult<InternalEntityTypeBuilder> {
        let name = native_type.name.clone();
        self.add_entity_type(&name, Some(native_type), source)
    }

    fn add_entity_type(
        &mut self,
        name: &str,
        native_type: Option<NativeType>,
        source: ConfigurationSource,
    ) -> BuildResult<InternalEntityTypeBuilder> {
        if let Some(ignored) = self.ignored_entity_types.get(name).copied() {
            if !source.overrides(ignored) {
                return Ok(None);
            }
            if ignored == ConfigurationSource::Explicit {
                return Err(ModelBuilderError::EntityTypeIgnoredExplicitly {
                    entity_type: name.to_string(),
                });
            }
            self.ignored_entity_types.remove(name);
        }

        let existing = self.model.find_entity_type(name);
        if let (Some(existing), Some(native_type)) = (existing, &native_type) {
            if !self.model.entity_type(existing).has_native_type() {
                self.model.set_native_type(existing, native_type.clone());
            }
        }

        let Self { model, entity_types, .. } = self;
        let (entity_type, is_new) =
            entity_types.get_or_add(existing, || model.add_entity_type(name, native_type), source);

        let builder = InternalEntityTypeBuilder(entity_type);
        if is_new {
            debug!(entity_type = name, source = %source, "entity type added");
            return ConventionDispatcher::on_entity_type_added(self, builder);
        }
        Ok(Some(builder))
    }

    /// Ignore an entity type name, removing the entity type if it exists
    pub fn ignore(&mut self, name: &str, source: ConfigurationSource) -> Result<bool, ModelBuilderError> {
        if let Some(ignored) = self.ignored_entity_types.get(name).copied() {
            if ignored.overrides(source) {
                return Ok(true);
            }
        }

        if let Some(entity_type) = self.model.find_entity_type(name) {
            if !self.remove_entity_type_with(entity_type, source, false)? {
                if source == ConfigurationSource::Explicit {
                    return Err(ModelBuilderError::EntityTypeAddedExplicitly {
                        entity_type: name.to_string(),
                    });
                }
                return Ok(false);
            }
        }

        self.ignored_entity_types.insert(name.to_string(), source);
        debug!(entity_type = name, source = %source, "entity type ignored");
        Ok(true)
    }

    /// Remove an entity type together with every relationship it takes part in
    ///
    /// Entity types that still have derived types are kept.
    pub fn remove_entity_type(
        &mut self,
        entity_type: EntityTypeId,
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        self.remove_entity_type_with(entity_type, source, true)
    }

    fn remove_entity_type_with(
        &mut self,
        entity_type: EntityTypeId,
        source: ConfigurationSource,
        can_override_same: bool,
    ) -> Result<bool, ModelBuilderError> {
        if !self.model.contains_entity_type(entity_type)
            || !self.model.direct_derived_types(entity_type).is_empty()
            || !self.entity_types.can_remove(entity_type, source, can_override_same)
        {
            return Ok(false);
        }

        let relationships: BTreeSet<ForeignKeyId> = self
            .model
            .all_foreign_keys()
            .filter(|fk| fk.declaring_entity_type() == entity_type || fk.principal_entity_type() == entity_type)
            .map(|fk| fk.id())
            .collect();
        if !relationships
            .iter()
            .all(|fk| can_remove_foreign_key(self, *fk, source, true))
        {
            return Ok(false);
        }

        self.entity_types.remove(entity_type, source, can_override_same);
        for fk in relationships {
            let Some(owner) = self.model.try_foreign_key(fk).map(|f| f.declaring_entity_type()) else {
                continue;
            };
            let removed = InternalEntityTypeBuilder(owner).remove_relationship(self, fk, source)?;
            debug_assert!(removed.is_some());
        }

        if let Some(removed) = self.model.remove_entity_type(entity_type) {
            debug!(entity_type = removed.name(), source = %source, "entity type removed");
        }
        self.entity_builders.remove(&entity_type);
        Ok(true)
    }

    /// Remove entity types that can no longer be reached by navigation
    ///
    /// Entity types configured at or above `source` are the roots; inheritance
    /// links count in both directions.
    pub fn remove_entity_types_unreachable_by_navigations(
        &mut self,
        source: ConfigurationSource,
    ) -> Result<(), ModelBuilderError> {
        let mut graph = DiGraph::<EntityTypeId, ()>::new();
        let mut nodes: BTreeMap<EntityTypeId, NodeIndex> = BTreeMap::new();
        for entity_type in self.model.entity_types() {
            nodes.insert(entity_type.id(), graph.add_node(entity_type.id()));
        }
        for entity_type in self.model.entity_types() {
            if let Some(base) = entity_type.base_type() {
                graph.add_edge(nodes[&entity_type.id()], nodes[&base], ());
                graph.add_edge(nodes[&base], nodes[&entity_type.id()], ());
            }
        }
        for fk in self.model.all_foreign_keys() {
            for navigation in fk.navigations() {
                graph.add_edge(
                    nodes[&navigation.declaring_entity_type],
                    nodes[&navigation.target_entity_type],
                    (),
                );
            }
        }

        let mut reachable = BTreeSet::new();
        let mut dfs = Dfs::empty(&graph);
        for (entity_type, node) in &nodes {
            if !self.entity_types.configuration_source(*entity_type).overrides(source) {
                continue;
            }
            dfs.move_to(*node);
            while let Some(visited) = dfs.next(&graph) {
                reachable.insert(graph[visited]);
            }
        }

        // Derived types go before their base types
        let mut unreachable: Vec<EntityTypeId> =
            nodes.keys().copied().filter(|id| !reachable.contains(id)).collect();
        unreachable.sort_by_key(|id| std::cmp::Reverse(self.model.base_chain(*id).len()));

        for entity_type in unreachable {
            if self.remove_entity_type_with(entity_type, source, true)? {
                debug!(entity_type = ?entity_type, "unreachable entity type pruned");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConfigurationSource::*;

    #[test]
    fn test_entity_is_idempotent_and_raises_source() {
        let mut mb = InternalModelBuilder::new();
        let first = mb.entity("Blog", Convention).unwrap().unwrap();
        let second = mb.entity("Blog", Explicit).unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(mb.model().entity_types().count(), 1);
        assert_eq!(mb.entity_type_source(first.id()), Explicit);
    }

    #[test]
    fn test_ignored_entity_type_blocks_lower_sources() {
        let mut mb = InternalModelBuilder::new();
        assert!(mb.ignore("Audit", DataAnnotation).unwrap());

        assert!(mb.entity("Audit", Convention).unwrap().is_none());
        assert!(mb.entity("Audit", Explicit).unwrap().is_some());
        assert_eq!(mb.ignored_entity_type_source("Audit"), None);
    }

    #[test]
    fn test_explicit_ignore_and_entity_conflict() {
        let mut mb = InternalModelBuilder::new();
        mb.entity("Blog", Explicit).unwrap().unwrap();
        let err = mb.ignore("Blog", Explicit).unwrap_err();
        assert!(matches!(err, ModelBuilderError::EntityTypeAddedExplicitly { .. }));

        assert!(mb.ignore("Tag", Explicit).unwrap());
        let err = mb.entity("Tag", Explicit).unwrap_err();
        assert!(matches!(err, ModelBuilderError::EntityTypeIgnoredExplicitly { .. }));
    }

    #[test]
    fn test_ignore_removes_convention_entity_type() {
        let mut mb = InternalModelBuilder::new();
        let tag = mb.entity("Tag", Convention).unwrap().unwrap();
        assert!(mb.ignore("Tag", DataAnnotation).unwrap());
        assert!(!mb.model().contains_entity_type(tag.id()));
    }
}
