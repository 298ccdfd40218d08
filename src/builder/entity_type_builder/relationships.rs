//! Relationships and navigations
//!
//! Every foreign key is owned by the builder of its dependent entity type;
//! the principal side only ever declares navigations pointing at dependents.

use tracing::debug;

use super::InternalEntityTypeBuilder;
use super::members::{can_remove_foreign_key, remove_shadow_properties_if_unused};
use crate::builder::error::{BuildResult, ModelBuilderError};
use crate::builder::model_builder::InternalModelBuilder;
use crate::builder::property_builder::{InternalPropertyBuilder, can_set_required_properties};
use crate::builder::relationship_builder::{InternalRelationshipBuilder, RelationshipBuilderState};
use crate::builder::snapshot::RelationshipSnapshot;
use crate::conventions::ConventionDispatcher;
use crate::metadata::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, Navigation, PropertyId, PropertyType,
};

/// Everything a new relationship may be created with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
    pub principal: EntityTypeId,
    pub dependent: EntityTypeId,
    pub navigation_to_principal: Option<String>,
    pub navigation_to_dependent: Option<String>,
    pub foreign_key_properties: Option<Vec<PropertyId>>,
    pub principal_properties: Option<Vec<PropertyId>>,
    pub is_unique: Option<bool>,
    pub is_required: Option<bool>,
}

impl NewRelationship {
    pub fn between(principal: EntityTypeId, dependent: EntityTypeId) -> Self {
        Self {
            principal,
            dependent,
            navigation_to_principal: None,
            navigation_to_dependent: None,
            foreign_key_properties: None,
            principal_properties: None,
            is_unique: None,
            is_required: None,
        }
    }
}

/// A replaced relationship whose configuration is carried over to the new one
#[derive(Debug, Clone, Copy)]
pub(crate) struct RelationshipMerge<'a> {
    pub(crate) snapshot: &'a RelationshipSnapshot,
    pub(crate) configuration_source: ConfigurationSource,
}

/// Treat an empty navigation name as no navigation
fn non_empty(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.is_empty())
}

impl InternalEntityTypeBuilder {
    /// The builder of an existing foreign key, tracked at `source`
    ///
    /// A foreign key that was not tracked yet starts with every aspect at
    /// `Explicit` when `existing` is set, and unconfigured otherwise.
    pub fn relationship_for(
        self,
        mb: &mut InternalModelBuilder,
        foreign_key: ForeignKeyId,
        existing: bool,
        source: ConfigurationSource,
    ) -> InternalRelationshipBuilder {
        let owner = mb.model().foreign_key(foreign_key).declaring_entity_type();
        if owner != self.0 {
            return InternalEntityTypeBuilder(owner).relationship_for(mb, foreign_key, existing, source);
        }

        let relationships = &mut mb.entity_state_mut(self.0).relationships;
        if !relationships.try_get(foreign_key, source) {
            let initial = existing.then_some(ConfigurationSource::Explicit);
            relationships.insert(foreign_key, RelationshipBuilderState::new(initial), source);
        }
        InternalRelationshipBuilder(foreign_key)
    }

    /// Find or create a relationship between two entity types
    ///
    /// An existing compatible navigation with one of the requested names is
    /// reused before anything new is created. With `strict_principal` unset
    /// the reused foreign key may point the other way.
    #[allow(clippy::too_many_arguments)]
    pub fn relationship(
        self,
        mb: &mut InternalModelBuilder,
        principal: EntityTypeId,
        dependent: EntityTypeId,
        navigation_to_principal: Option<&str>,
        navigation_to_dependent: Option<&str>,
        source: ConfigurationSource,
        is_unique: Option<bool>,
        strict_principal: bool,
    ) -> BuildResult<InternalRelationshipBuilder> {
        let principal_builder = mb.entity_for(principal, source);
        let dependent_builder = mb.entity_for(dependent, source);
        if dependent != self.0 {
            return dependent_builder.relationship(
                mb,
                principal,
                dependent,
                navigation_to_principal,
                navigation_to_dependent,
                source,
                is_unique,
                strict_principal,
            );
        }

        if let Some(name) = non_empty(navigation_to_principal) {
            if !dependent_builder.can_add(mb, name, source)? {
                return Ok(None);
            }
        }
        if let Some(name) = non_empty(navigation_to_dependent) {
            if !principal_builder.can_add(mb, name, source)? {
                return Ok(None);
            }
        }

        let existing_to_principal =
            non_empty(navigation_to_principal).and_then(|n| mb.model().find_declared_navigation(dependent, n));
        if let Some(navigation) = &existing_to_principal {
            let fk = mb.model().foreign_key(navigation.foreign_key);
            if navigation.is_compatible(fk, principal, dependent, strict_principal.then_some(true), is_unique) {
                let inverse = navigation_to_dependent.map(|n| non_empty(Some(n)));
                return self.relationship_from_navigation(mb, navigation, source, inverse);
            }
        }

        let existing_to_dependent =
            non_empty(navigation_to_dependent).and_then(|n| mb.model().find_declared_navigation(principal, n));
        if let Some(navigation) = &existing_to_dependent {
            let fk = mb.model().foreign_key(navigation.foreign_key);
            if navigation.is_compatible(fk, principal, dependent, strict_principal.then_some(false), is_unique) {
                let inverse = navigation_to_principal.map(|n| non_empty(Some(n)));
                return self.relationship_from_navigation(mb, navigation, source, inverse);
            }
        }

        let conflicting: Vec<ForeignKeyId> = existing_to_principal
            .iter()
            .chain(existing_to_dependent.iter())
            .map(|n| n.foreign_key)
            .collect();
        if !self.remove_relationships(mb, source, &conflicting)? {
            return Ok(None);
        }

        let request = NewRelationship {
            navigation_to_principal: non_empty(navigation_to_principal).map(str::to_string),
            navigation_to_dependent: non_empty(navigation_to_dependent).map(str::to_string),
            is_unique,
            ..NewRelationship::between(principal, dependent)
        };
        self.relationship_with(mb, request, source, None)
    }

    /// [`relationship`](Self::relationship) with both ends given by name
    pub fn relationship_by_name(
        self,
        mb: &mut InternalModelBuilder,
        principal_name: &str,
        dependent_name: &str,
        navigation_to_principal: Option<&str>,
        navigation_to_dependent: Option<&str>,
        source: ConfigurationSource,
    ) -> BuildResult<InternalRelationshipBuilder> {
        let Some(principal) = mb.entity(principal_name, source)? else {
            return Ok(None);
        };
        let Some(dependent) = mb.entity(dependent_name, source)? else {
            return Ok(None);
        };
        self.relationship(
            mb,
            principal.id(),
            dependent.id(),
            navigation_to_principal,
            navigation_to_dependent,
            source,
            None,
            true,
        )
    }

    /// Create or configure the relationship described by `request`
    pub fn relationship_from_request(
        self,
        mb: &mut InternalModelBuilder,
        request: NewRelationship,
        source: ConfigurationSource,
    ) -> BuildResult<InternalRelationshipBuilder> {
        self.relationship_with(mb, request, source, None)
    }

    /// Create a relationship from a full description, or configure the matching one
    ///
    /// With `merge` set the configuration sources of a replaced relationship
    /// are carried over instead of re-applying the requested aspects.
    pub(crate) fn relationship_with(
        self,
        mb: &mut InternalModelBuilder,
        request: NewRelationship,
        source: ConfigurationSource,
        merge: Option<RelationshipMerge<'_>>,
    ) -> BuildResult<InternalRelationshipBuilder> {
        if request.dependent != self.0 {
            return InternalEntityTypeBuilder(request.dependent).relationship_with(mb, request, source, merge);
        }

        let NewRelationship {
            principal,
            dependent,
            navigation_to_principal,
            navigation_to_dependent,
            foreign_key_properties,
            principal_properties,
            is_unique,
            is_required,
        } = request;
        let foreign_key_properties = foreign_key_properties.filter(|p| !p.is_empty());
        let principal_properties = principal_properties.filter(|p| !p.is_empty());
        let principal_builder = InternalEntityTypeBuilder(principal);

        let existing = foreign_key_properties.as_deref().and_then(|properties| {
            mb.model().find_matching_foreign_key(
                dependent,
                principal,
                properties,
                principal_properties.as_deref(),
                is_unique,
            )
        });
        let is_existing = existing.is_some();
        let fk = match existing {
            Some(fk) => fk,
            None => {
                if let Some(properties) = &foreign_key_properties {
                    if let Some(conflicting) = mb.model().find_foreign_key(dependent, properties) {
                        if self.remove_relationship(mb, conflicting, source)?.is_none() {
                            return Ok(None);
                        }
                    }
                }
                let created = self.create_foreign_key(
                    mb,
                    principal_builder,
                    navigation_to_principal.as_deref(),
                    foreign_key_properties.clone(),
                    principal_properties.clone(),
                    is_unique,
                    is_required,
                    source,
                )?;
                match created {
                    Some(fk) => fk,
                    None => return Ok(None),
                }
            }
        };

        if let Some(required) = is_required {
            if !self.apply_required(mb, fk, required, is_existing, source)? {
                return Ok(None);
            }
        }

        let builder = self.relationship_for(mb, fk, is_existing, source);

        let Some(builder) = self
            .navigation(mb, navigation_to_principal.as_deref(), builder.0, true, source)?
            .or_else(|| self.tracked_relationship(mb, builder, source))
        else {
            return Ok(None);
        };
        let Some(builder) = principal_builder
            .navigation(mb, navigation_to_dependent.as_deref(), builder.0, false, source)?
            .or_else(|| self.tracked_relationship(mb, builder, source))
        else {
            return Ok(None);
        };

        let builder = match merge {
            Some(merge) => {
                let builder = self.relationship_for(mb, builder.0, true, merge.configuration_source);
                match builder.merge_configuration_source_with(mb, merge.snapshot, source)? {
                    Some(builder) => builder,
                    None => return Ok(None),
                }
            }
            None => {
                let mut builder = builder;
                if is_unique.is_some() {
                    match builder.unique(mb, is_unique, source)? {
                        Some(b) => builder = b,
                        None => return Ok(None),
                    }
                }
                if is_required.is_some() {
                    match builder.required(mb, is_required, source)? {
                        Some(b) => builder = b,
                        None => return Ok(None),
                    }
                }
                if foreign_key_properties.is_some() {
                    match builder.foreign_key_properties(mb, foreign_key_properties, source)? {
                        Some(b) => builder = b,
                        None => return Ok(None),
                    }
                }
                if principal_properties.is_some() {
                    match builder.principal_key_properties(mb, principal_properties, source)? {
                        Some(b) => builder = b,
                        None => return Ok(None),
                    }
                }
                builder
            }
        };

        if !is_existing {
            return ConventionDispatcher::on_foreign_key_added(mb, builder);
        }
        Ok(Some(builder))
    }

    /// The relationship if this type still tracks it, raising its source
    fn tracked_relationship(
        self,
        mb: &mut InternalModelBuilder,
        builder: InternalRelationshipBuilder,
        source: ConfigurationSource,
    ) -> Option<InternalRelationshipBuilder> {
        mb.entity_state_mut(self.0)
            .relationships
            .try_get(builder.0, source)
            .then_some(builder)
    }

    /// Give the foreign key properties the requested requiredness
    ///
    /// A newly created foreign key is dropped again when that is not possible.
    fn apply_required(
        self,
        mb: &mut InternalModelBuilder,
        fk: ForeignKeyId,
        is_required: bool,
        is_existing: bool,
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        if !self.can_set_required(mb, fk, is_required, source)? {
            let error = self.required_conflict(mb, fk, is_required);
            if !is_existing {
                self.discard_foreign_key(mb, fk)?;
            }
            if source == ConfigurationSource::Explicit {
                return Err(error);
            }
            return Ok(false);
        }

        let properties = mb.model().foreign_key(fk).properties().to_vec();
        let nullable_typed: Vec<PropertyId> = properties
            .iter()
            .copied()
            .filter(|p| mb.model().property(*p).property_type().is_nullable())
            .collect();
        if nullable_typed.is_empty() && !is_required {
            let model = mb.model();
            let foreign_key = model.foreign_key(fk);
            let error = ModelBuilderError::CannotBeOptional {
                dependent: model.entity_type(foreign_key.declaring_entity_type()).name().to_string(),
                principal: model.entity_type(foreign_key.principal_entity_type()).name().to_string(),
            };
            if !is_existing {
                self.discard_foreign_key(mb, fk)?;
            }
            if source == ConfigurationSource::Explicit {
                return Err(error);
            }
            return Ok(false);
        }

        let targets = if nullable_typed.is_empty() { properties } else { nullable_typed };
        for property in targets {
            let set = InternalPropertyBuilder(property).required(mb, is_required, source)?;
            if set && !is_required {
                break;
            }
        }
        if let Some(foreign_key) = mb.model_mut().foreign_key_mut(fk) {
            foreign_key.is_required = Some(is_required);
        }
        Ok(true)
    }

    fn required_conflict(self, mb: &InternalModelBuilder, fk: ForeignKeyId, is_required: bool) -> ModelBuilderError {
        let model = mb.model();
        let foreign_key = model.foreign_key(fk);
        ModelBuilderError::RequiredConflict {
            dependent: model.entity_type(foreign_key.declaring_entity_type()).name().to_string(),
            principal: model.entity_type(foreign_key.principal_entity_type()).name().to_string(),
            requiredness: if is_required { "required" } else { "optional" }.to_string(),
        }
    }

    /// Drop a foreign key that was never handed out
    fn discard_foreign_key(self, mb: &mut InternalModelBuilder, fk: ForeignKeyId) -> Result<(), ModelBuilderError> {
        let Some(removed) = mb.model_mut().remove_foreign_key(fk) else {
            return Ok(());
        };
        mb.entity_state_mut(self.0).relationships.remove(fk, ConfigurationSource::Explicit, true);
        remove_shadow_properties_if_unused(mb, removed.properties());
        if mb.model().contains_entity_type(removed.principal_entity_type()) {
            InternalEntityTypeBuilder(removed.principal_entity_type()).remove_key_if_unused(mb, removed.principal_key())?;
        }
        Ok(())
    }

    /// Whether the foreign key properties can take the requested requiredness
    pub fn can_set_required(
        self,
        mb: &InternalModelBuilder,
        fk: ForeignKeyId,
        is_required: bool,
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        debug_assert_eq!(mb.model().foreign_key(fk).declaring_entity_type(), self.0);
        if mb.model().is_foreign_key_required(fk) == is_required {
            return Ok(true);
        }
        let properties = mb.model().foreign_key(fk).properties().to_vec();
        can_set_required_properties(mb, &properties, is_required, source)
    }

    /// Create a foreign key on this (dependent) type, inferring what is not given
    ///
    /// Missing principal keys and foreign key properties are synthesized as
    /// shadow properties named after the navigation or the principal type.
    #[allow(clippy::too_many_arguments)]
    fn create_foreign_key(
        self,
        mb: &mut InternalModelBuilder,
        principal: InternalEntityTypeBuilder,
        navigation_to_principal: Option<&str>,
        foreign_key_properties: Option<Vec<PropertyId>>,
        principal_properties: Option<Vec<PropertyId>>,
        is_unique: Option<bool>,
        is_required: Option<bool>,
        source: ConfigurationSource,
    ) -> BuildResult<ForeignKeyId> {
        if let Some(properties) = &foreign_key_properties {
            if mb.model().find_foreign_key(self.0, properties).is_some() {
                return Ok(None);
            }
            if let Some(principal_properties) = &principal_properties {
                if !mb.model().are_compatible(principal_properties, properties) {
                    let model = mb.model();
                    return Err(ModelBuilderError::IncompatibleForeignKeyProperties {
                        dependent: self.name(mb),
                        dependent_properties: model.property_names(properties),
                        principal: principal.name(mb),
                        principal_properties: model.property_names(principal_properties),
                    });
                }
            }
        }

        let mut principal_key = match principal_properties {
            Some(properties) => match principal.key_for(mb, properties, source)? {
                Some(key) => Some(key.0),
                None => return Ok(None),
            },
            None => mb.model().find_primary_key(principal.0),
        };

        let properties = match foreign_key_properties {
            Some(properties) => {
                let compatible = principal_key
                    .is_some_and(|key| mb.model().are_compatible(mb.model().key(key).properties(), &properties));
                if !compatible {
                    let mut key_properties = Vec::with_capacity(properties.len());
                    for property in &properties {
                        let data = mb.model().property(*property);
                        let (name, property_type) = (data.name().to_string(), data.property_type().clone());
                        match create_unique_property(mb, &name, property_type, principal, is_required)? {
                            Some(created) => key_properties.push(created),
                            None => return Ok(None),
                        }
                    }
                    match principal.key_for(mb, key_properties, ConfigurationSource::Convention)? {
                        Some(key) => principal_key = Some(key.0),
                        None => return Ok(None),
                    }
                }
                properties
            }
            None => {
                let base_name = match non_empty(navigation_to_principal) {
                    Some(navigation) => navigation.to_string(),
                    None => mb.model().entity_type(principal.0).display_name().to_string(),
                };
                if principal_key.is_none() {
                    let name = mb.config().shadow_key_property_name.clone();
                    let Some(key_property) = create_unique_property(mb, &name, PropertyType::int(), principal, is_required)?
                    else {
                        return Ok(None);
                    };
                    match principal.key_for(mb, vec![key_property], ConfigurationSource::Convention)? {
                        Some(key) => principal_key = Some(key.0),
                        None => return Ok(None),
                    }
                }
                let Some(key) = principal_key else {
                    return Ok(None);
                };

                let key_properties = mb.model().key(key).properties().to_vec();
                let mut properties = Vec::with_capacity(key_properties.len());
                for key_property in key_properties {
                    let data = mb.model().property(key_property);
                    let name = format!("{base_name}{}", data.name());
                    let property_type = data.property_type().make_nullable();
                    match create_unique_property(mb, &name, property_type, self, is_required)? {
                        Some(created) => properties.push(created),
                        None => return Ok(None),
                    }
                }
                properties
            }
        };

        let Some(principal_key) = principal_key.filter(|k| mb.model().try_key(*k).is_some()) else {
            return Ok(None);
        };
        let fk = mb
            .model_mut()
            .add_foreign_key(self.0, properties.clone(), principal_key, principal.0);
        if let Some(foreign_key) = mb.model_mut().foreign_key_mut(fk) {
            foreign_key.is_unique = is_unique;
        }

        for property in properties {
            let builder = InternalPropertyBuilder(property);
            builder.use_value_generator(mb, None, ConfigurationSource::Convention);
            builder.value_generated(mb, None, ConfigurationSource::Convention);
        }

        debug!(
            dependent = %self.name(mb),
            principal = %principal.name(mb),
            source = %source,
            "foreign key added"
        );
        Ok(Some(fk))
    }

    /// The relationship a navigation belongs to, optionally renaming its inverse
    ///
    /// `inverse` of `Some(None)` clears the inverse navigation.
    pub fn relationship_from_navigation(
        self,
        mb: &mut InternalModelBuilder,
        navigation: &Navigation,
        source: ConfigurationSource,
        inverse: Option<Option<&str>>,
    ) -> BuildResult<InternalRelationshipBuilder> {
        let relationship = self.relationship_for(mb, navigation.foreign_key, true, source);
        match inverse {
            None => Ok(Some(relationship)),
            Some(inverse) => {
                let inverse = non_empty(inverse);
                if navigation.points_to_principal {
                    relationship.navigation_to_dependent(mb, inverse, source, None)
                } else {
                    relationship.navigation_to_principal(mb, inverse, source, None)
                }
            }
        }
    }

    /// A relationship from this type to the named principal over the named properties
    pub fn foreign_key<S: AsRef<str>>(
        self,
        mb: &mut InternalModelBuilder,
        principal_name: &str,
        property_names: &[S],
        source: ConfigurationSource,
    ) -> BuildResult<InternalRelationshipBuilder> {
        let Some(principal) = mb.entity(principal_name, source)? else {
            return Ok(None);
        };
        let Some(properties) = self.get_or_create_properties(mb, property_names, source)? else {
            return Ok(None);
        };
        let Some(relationship) = self.relationship(mb, principal.id(), self.0, None, None, source, None, false)? else {
            return Ok(None);
        };
        relationship.foreign_key_properties(mb, Some(properties), source)
    }

    /// Set, rename or clear (`None`) one navigation of `fk` declared on this type
    pub fn navigation(
        self,
        mb: &mut InternalModelBuilder,
        name: Option<&str>,
        fk: ForeignKeyId,
        points_to_principal: bool,
        source: ConfigurationSource,
    ) -> BuildResult<InternalRelationshipBuilder> {
        self.navigation_with(mb, name, fk, points_to_principal, source, true)
    }

    pub(super) fn navigation_with(
        self,
        mb: &mut InternalModelBuilder,
        name: Option<&str>,
        fk: ForeignKeyId,
        points_to_principal: bool,
        source: ConfigurationSource,
        can_override_same: bool,
    ) -> BuildResult<InternalRelationshipBuilder> {
        let Some(foreign_key) = mb.model().try_foreign_key(fk) else {
            return Ok(None);
        };
        let existing = foreign_key.navigation_name(points_to_principal).map(str::to_string);
        let owner = InternalEntityTypeBuilder(mb.model().foreign_key(fk).declaring_entity_type());
        let builder = owner.relationship_for(mb, fk, true, ConfigurationSource::Convention);

        if name == existing.as_deref() {
            mb.entity_state_mut(owner.0)
                .relationships
                .update_configuration_source(fk, source);
            return Ok(Some(builder));
        }

        if !self.can_set_navigation(mb, name, fk, source, can_override_same)? {
            return Ok(None);
        }

        mb.model_mut().set_navigation(fk, points_to_principal, None);

        let conflicting = name
            .and_then(|n| mb.model().find_navigation(self.0, n))
            .filter(|n| n.foreign_key != fk);
        if let Some(conflicting) = conflicting {
            let removed = self.remove_relationship(mb, conflicting.foreign_key, source)?;
            debug_assert!(removed.is_some());
        }

        let Some(name) = name else {
            debug!(entity_type = %self.name(mb), navigation = ?existing, source = %source, "navigation removed");
            return Ok(Some(builder));
        };

        mb.entity_state_mut(self.0).ignored_members.remove(name);
        mb.entity_state_mut(owner.0)
            .relationships
            .update_configuration_source(fk, source);
        mb.model_mut()
            .set_navigation(fk, points_to_principal, Some(name.to_string()));
        debug!(entity_type = %self.name(mb), navigation = name, source = %source, "navigation added");

        let Some(navigation) = mb.model().find_declared_navigation(self.0, name) else {
            return Ok(None);
        };
        ConventionDispatcher::on_navigation_added(mb, builder, &navigation)
    }

    fn can_set_navigation(
        self,
        mb: &mut InternalModelBuilder,
        name: Option<&str>,
        fk: ForeignKeyId,
        source: ConfigurationSource,
        can_override_same: bool,
    ) -> Result<bool, ModelBuilderError> {
        if !can_remove_foreign_key(mb, fk, source, can_override_same) {
            return Ok(false);
        }

        let Some(name) = name else {
            return Ok(true);
        };
        if let Some(conflicting) = mb.model().find_navigation(self.0, name) {
            if conflicting.foreign_key != fk
                && !can_remove_foreign_key(mb, conflicting.foreign_key, source, can_override_same)
            {
                return Ok(false);
            }
        }
        if !self.can_add(mb, name, source)? {
            return Ok(false);
        }

        // Properties and navigations share one namespace
        if mb.model().find_property(self.0, name).is_some() {
            if source == ConfigurationSource::Explicit {
                return Err(ModelBuilderError::NavigationConflict {
                    navigation: name.to_string(),
                    entity_type: self.name(mb),
                });
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// Remove a relationship, keeping what is needed to attach it again
    pub fn detach_relationship(
        self,
        mb: &mut InternalModelBuilder,
        fk: ForeignKeyId,
        source: ConfigurationSource,
    ) -> BuildResult<RelationshipSnapshot> {
        if !mb.model().contains_foreign_key(fk) {
            return Ok(None);
        }
        self.relationship_for(mb, fk, true, ConfigurationSource::Convention);
        let Some(snapshot) = RelationshipSnapshot::capture(mb, fk) else {
            return Ok(None);
        };
        let Some(removed) = self.remove_relationship(mb, fk, source)? else {
            return Ok(None);
        };
        debug!(foreign_key = ?fk, source = %source, "relationship detached");
        Ok(Some(snapshot.with_configuration_source(removed)))
    }

    /// Remove all of `fks` or none of them
    fn remove_relationships(
        self,
        mb: &mut InternalModelBuilder,
        source: ConfigurationSource,
        fks: &[ForeignKeyId],
    ) -> Result<bool, ModelBuilderError> {
        for fk in fks {
            let recorded = mb
                .model()
                .try_foreign_key(*fk)
                .and_then(|f| mb.entity_state(f.declaring_entity_type()))
                .map(|s| s.relationship_source(*fk))
                .unwrap_or(ConfigurationSource::Explicit);
            if !source.overrides(recorded) {
                return Ok(false);
            }
        }
        for fk in fks {
            if mb.model().contains_foreign_key(*fk) {
                let removed = self.remove_relationship(mb, *fk, source)?;
                debug_assert!(removed.is_some());
            }
        }
        Ok(true)
    }

    /// Remove a relationship with its navigations
    ///
    /// Shadow properties and principal keys that only served this foreign key
    /// are removed too.
    pub fn remove_relationship(
        self,
        mb: &mut InternalModelBuilder,
        fk: ForeignKeyId,
        source: ConfigurationSource,
    ) -> BuildResult<ConfigurationSource> {
        let Some(owner) = mb.model().try_foreign_key(fk).map(|f| f.declaring_entity_type()) else {
            return Ok(None);
        };
        if owner != self.0 {
            return InternalEntityTypeBuilder(owner).remove_relationship(mb, fk, source);
        }

        let Some(removed_source) = mb.entity_state_mut(self.0).relationships.remove(fk, source, true) else {
            return Ok(None);
        };
        let Some(removed) = mb.model_mut().remove_foreign_key(fk) else {
            return Ok(Some(removed_source));
        };
        debug!(
            dependent = %self.name(mb),
            foreign_key = ?fk,
            source = %source,
            "foreign key removed"
        );

        remove_shadow_properties_if_unused(mb, removed.properties());
        if mb.model().contains_entity_type(removed.principal_entity_type()) {
            InternalEntityTypeBuilder(removed.principal_entity_type())
                .remove_key_if_unused(mb, removed.principal_key())?;
        }
        ConventionDispatcher::on_foreign_key_removed(mb, self, &removed)?;
        Ok(Some(removed_source))
    }

    /// Remove a relationship left without navigations on either end
    pub(crate) fn remove_foreign_key_if_unused(
        self,
        mb: &mut InternalModelBuilder,
        fk: ForeignKeyId,
        source: ConfigurationSource,
    ) -> Result<(), ModelBuilderError> {
        let Some(foreign_key) = mb.model().try_foreign_key(fk) else {
            return Ok(());
        };
        if foreign_key.dependent_to_principal().is_none() && foreign_key.principal_to_dependent().is_none() {
            self.remove_relationship(mb, fk, source)?;
        }
        Ok(())
    }
}

/// Add a convention property named `base_name`, suffixed until the name is free
///
/// Ignored names and names used by navigations are skipped.
fn create_unique_property(
    mb: &mut InternalModelBuilder,
    base_name: &str,
    property_type: PropertyType,
    entity_type: InternalEntityTypeBuilder,
    is_required: Option<bool>,
) -> BuildResult<PropertyId> {
    let mut index = 0usize;
    loop {
        let name = if index == 0 {
            base_name.to_string()
        } else {
            format!("{base_name}{index}")
        };
        index += 1;

        let model = mb.model();
        if model.find_property(entity_type.0, &name).is_some()
            || model.find_navigation(entity_type.0, &name).is_some()
            || entity_type.is_ignored(mb, &name).is_some()
        {
            continue;
        }

        let Some(builder) = entity_type.property(mb, &name, property_type.clone(), ConfigurationSource::Convention)? else {
            return Ok(None);
        };
        if let Some(required) = is_required {
            builder.required(mb, required, ConfigurationSource::Convention)?;
        }
        return Ok(Some(builder.0));
    }
}
