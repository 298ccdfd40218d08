//! Properties, indexes and ignored members

use tracing::{debug, trace};

use super::InternalEntityTypeBuilder;
use crate::builder::error::{BuildResult, ModelBuilderError};
use crate::builder::model_builder::InternalModelBuilder;
use crate::builder::property_builder::{InternalIndexBuilder, InternalPropertyBuilder};
use crate::builder::snapshot::PropertySpec;
use crate::conventions::ConventionDispatcher;
use crate::metadata::{ConfigurationSource, ForeignKeyId, IndexId, PropertyId, PropertyType};

impl InternalEntityTypeBuilder {
    /// Add or configure a shadow property
    pub fn property(
        self,
        mb: &mut InternalModelBuilder,
        name: &str,
        property_type: PropertyType,
        source: ConfigurationSource,
    ) -> BuildResult<InternalPropertyBuilder> {
        self.internal_property(mb, name, property_type, true, source)
    }

    /// Add or configure the property backing a member of the native type
    ///
    /// The property is declared on the ancestor whose native type declares the
    /// member.
    pub fn native_property(
        self,
        mb: &mut InternalModelBuilder,
        member_name: &str,
        source: ConfigurationSource,
    ) -> BuildResult<InternalPropertyBuilder> {
        let model = mb.model();
        let entity_type = model.entity_type(self.0);
        let Some(native_type) = entity_type.native_type() else {
            return Err(ModelBuilderError::PropertyNotFound {
                property: member_name.to_string(),
                entity_type: entity_type.name().to_string(),
            });
        };
        let Some(member) = native_type.find_member(member_name).cloned() else {
            return Err(ModelBuilderError::NoNativeProperty {
                property: member_name.to_string(),
                entity_type: entity_type.name().to_string(),
            });
        };

        let mut declaring = self.0;
        loop {
            let current = model.entity_type(declaring);
            if current.native_type().is_some_and(|n| n.name == member.declaring_type) {
                break;
            }
            match current.base_type() {
                Some(base) if model.entity_type(base).has_native_type() => declaring = base,
                _ => break,
            }
        }

        let declaring = mb.entity_for(declaring, ConfigurationSource::Convention);
        declaring.internal_property(mb, &member.name, member.property_type, false, source)
    }

    fn internal_property(
        self,
        mb: &mut InternalModelBuilder,
        name: &str,
        property_type: PropertyType,
        is_shadow: bool,
        source: ConfigurationSource,
    ) -> BuildResult<InternalPropertyBuilder> {
        if !self.can_add(mb, name, source)? {
            return Ok(None);
        }

        if mb.model().find_navigation(self.0, name).is_some() {
            if source == ConfigurationSource::Explicit {
                return Err(ModelBuilderError::ConflictingNavigation {
                    property: name.to_string(),
                    entity_type: self.name(mb),
                });
            }
            return Ok(None);
        }

        // An inherited property is configured where it is declared
        if let Some(existing) = mb.model().find_property(self.0, name) {
            let declaring = mb.model().property(existing).declaring_entity_type();
            if declaring != self.0 {
                return mb.entity_for(declaring, ConfigurationSource::Convention).internal_property(
                    mb,
                    name,
                    property_type,
                    is_shadow,
                    source,
                );
            }
        }

        let existing = mb.model().find_declared_property(self.0, name);
        if existing.is_none() && !self.remove_derived_properties(mb, name, source)? {
            return Ok(None);
        }

        let (property, is_new) = {
            let (model, state) = mb.model_and_state(self.0);
            state.properties.get_or_add(
                existing,
                || model.add_property(self.0, name, property_type, is_shadow),
                source,
            )
        };

        let builder = InternalPropertyBuilder(property);
        if is_new {
            debug!(entity_type = %self.name(mb), property = name, source = %source, "property added");
            return ConventionDispatcher::on_property_added(mb, builder);
        }
        Ok(Some(builder))
    }

    /// Remove same-named properties from derived types so this type can declare it
    fn remove_derived_properties(
        self,
        mb: &mut InternalModelBuilder,
        name: &str,
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        let conflicting: Vec<PropertyId> = mb
            .model()
            .derived_types(self.0)
            .into_iter()
            .filter_map(|derived| mb.model().find_declared_property(derived, name))
            .collect();

        for property in &conflicting {
            let declaring = mb.model().property(*property).declaring_entity_type();
            if !InternalEntityTypeBuilder(declaring).can_remove_property(mb, *property, source, true) {
                return Ok(false);
            }
        }
        for property in conflicting {
            if !mb.model().contains_property(property) {
                continue;
            }
            let declaring = mb.model().property(property).declaring_entity_type();
            let removed = InternalEntityTypeBuilder(declaring).remove_property(mb, property, source, true)?;
            debug_assert!(removed.is_some());
        }
        Ok(true)
    }

    /// Whether a member named `name` may be added at `source`
    ///
    /// Clears an ignore entry that `source` overrides.
    pub(crate) fn can_add(
        self,
        mb: &mut InternalModelBuilder,
        name: &str,
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        let Some(ignored) = mb.entity_state(self.0).and_then(|s| s.ignored_source(name)) else {
            return Ok(true);
        };
        if !source.overrides(ignored) {
            return Ok(false);
        }
        if ignored == ConfigurationSource::Explicit {
            return Err(ModelBuilderError::PropertyIgnoredExplicitly {
                member: name.to_string(),
                entity_type: self.name(mb),
            });
        }

        mb.entity_state_mut(self.0).ignored_members.remove(name);
        trace!(entity_type = %self.name(mb), member = name, "ignore entry cleared");
        Ok(true)
    }

    pub fn can_add_navigation(
        self,
        mb: &mut InternalModelBuilder,
        name: &str,
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        Ok(self.can_add(mb, name, source)? && mb.model().find_navigation(self.0, name).is_none())
    }

    /// The source a member name was ignored with, if any
    pub fn is_ignored(self, mb: &InternalModelBuilder, name: &str) -> Option<ConfigurationSource> {
        mb.entity_state(self.0).and_then(|s| s.ignored_source(name))
    }

    /// Ignore a member name, removing the property or navigation it names
    ///
    /// The ignore entry is rolled back when the removal is blocked.
    pub fn ignore(
        self,
        mb: &mut InternalModelBuilder,
        name: &str,
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        let previous = self.is_ignored(mb, name);
        if previous.is_some_and(|previous| previous.overrides(source)) {
            return Ok(true);
        }

        mb.entity_state_mut(self.0).ignored_members.insert(name.to_string(), source);

        if let Some(property) = mb.model().find_declared_property(self.0, name) {
            if self.remove_property(mb, property, source, false)?.is_none() {
                self.restore_ignore(mb, name, previous);
                if source == ConfigurationSource::Explicit {
                    return Err(ModelBuilderError::PropertyAddedExplicitly {
                        member: name.to_string(),
                        entity_type: self.name(mb),
                    });
                }
                return Ok(false);
            }
        }

        if let Some(navigation) = mb.model().find_declared_navigation(self.0, name) {
            let can_override_same = source != ConfigurationSource::Explicit;
            let cleared = self.navigation_with(
                mb,
                None,
                navigation.foreign_key,
                navigation.points_to_principal,
                source,
                can_override_same,
            )?;
            if cleared.is_none() {
                self.restore_ignore(mb, name, previous);
                if source == ConfigurationSource::Explicit {
                    return Err(ModelBuilderError::PropertyAddedExplicitly {
                        member: name.to_string(),
                        entity_type: self.name(mb),
                    });
                }
                return Ok(false);
            }

            self.remove_foreign_key_if_unused(mb, navigation.foreign_key, source)?;
            if mb.config().prune_unreachable_entity_types {
                mb.remove_entity_types_unreachable_by_navigations(source)?;
            }
        }

        debug!(entity_type = %self.name(mb), member = name, source = %source, "member ignored");
        Ok(true)
    }

    fn restore_ignore(self, mb: &mut InternalModelBuilder, name: &str, previous: Option<ConfigurationSource>) {
        let state = mb.entity_state_mut(self.0);
        match previous {
            Some(previous) => {
                state.ignored_members.insert(name.to_string(), previous);
            }
            None => {
                state.ignored_members.remove(name);
            }
        }
    }

    /// Resolve property names, falling back to members of the native type
    pub fn get_or_create_properties<S: AsRef<str>>(
        self,
        mb: &mut InternalModelBuilder,
        names: &[S],
        source: ConfigurationSource,
    ) -> BuildResult<Vec<PropertyId>> {
        let mut properties = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let builder = match mb.model().find_property(self.0, name) {
                Some(existing) => {
                    let declaring = mb.model().property(existing).declaring_entity_type();
                    mb.entity_state_mut(declaring)
                        .properties
                        .update_configuration_source(existing, source);
                    Some(InternalPropertyBuilder(existing))
                }
                None => self.native_property(mb, name, source)?,
            };
            match builder {
                Some(builder) => properties.push(builder.0),
                None => return Ok(None),
            }
        }
        Ok(Some(properties))
    }

    /// Resolve captured properties by name, re-creating the missing ones at convention
    pub(crate) fn properties_for_specs(
        self,
        mb: &mut InternalModelBuilder,
        specs: &[PropertySpec],
    ) -> BuildResult<Vec<PropertyId>> {
        let mut properties = Vec::with_capacity(specs.len());
        for spec in specs {
            if let Some(existing) = mb.model().find_property(self.0, &spec.name) {
                properties.push(existing);
                continue;
            }

            let has_member = mb
                .model()
                .entity_type(self.0)
                .native_type()
                .is_some_and(|n| n.find_member(&spec.name).is_some());
            let created = if !spec.is_shadow && has_member {
                self.native_property(mb, &spec.name, ConfigurationSource::Convention)?
            } else {
                self.property(mb, &spec.name, spec.property_type.clone(), ConfigurationSource::Convention)?
            };
            match created {
                Some(builder) => properties.push(builder.0),
                None => return Ok(None),
            }
        }
        Ok(Some(properties))
    }

    /// Whether the property and everything that would cascade from it can go
    pub(crate) fn can_remove_property(
        self,
        mb: &InternalModelBuilder,
        property: PropertyId,
        source: ConfigurationSource,
        can_override_same: bool,
    ) -> bool {
        let model = mb.model();
        let untracked = source == ConfigurationSource::Explicit;
        let declaring = model.property(property).declaring_entity_type();

        let property_removable = mb
            .entity_state(declaring)
            .map(|s| s.properties.can_remove(property, source, can_override_same))
            .unwrap_or(untracked && can_override_same);
        if !property_removable {
            return false;
        }

        let indexes_removable = model.containing_indexes(property).into_iter().all(|index| {
            let owner = model.index(index).declaring_entity_type();
            mb.entity_state(owner)
                .map(|s| s.indexes.can_remove(index, source, true))
                .unwrap_or(untracked)
        });
        let foreign_keys_removable = model
            .containing_foreign_keys(property)
            .into_iter()
            .all(|fk| can_remove_foreign_key(mb, fk, source, true));
        let keys_removable = model.containing_keys(property).into_iter().all(|key| {
            let owner = model.key(key).declaring_entity_type();
            mb.entity_state(owner)
                .map(|s| s.keys.can_remove(key, source, true))
                .unwrap_or(untracked)
                && model
                    .referencing_foreign_keys_of_key(key)
                    .into_iter()
                    .all(|fk| can_remove_foreign_key(mb, fk, source, true))
        });

        indexes_removable && foreign_keys_removable && keys_removable
    }

    /// Remove a property with the indexes, keys and foreign keys that use it
    ///
    /// Foreign keys over the property are detached and attached again, which
    /// lets them pick different properties.
    pub fn remove_property(
        self,
        mb: &mut InternalModelBuilder,
        property: PropertyId,
        source: ConfigurationSource,
        can_override_same: bool,
    ) -> BuildResult<ConfigurationSource> {
        let Some(data) = mb.model().try_property(property).cloned() else {
            return Ok(None);
        };
        if data.declaring_entity_type() != self.0 {
            return InternalEntityTypeBuilder(data.declaring_entity_type()).remove_property(
                mb,
                property,
                source,
                can_override_same,
            );
        }
        if !self.can_remove_property(mb, property, source, can_override_same) {
            return Ok(None);
        }

        let removed = mb
            .entity_state_mut(self.0)
            .properties
            .remove(property, source, can_override_same)
            .unwrap_or(ConfigurationSource::Explicit);

        for index in mb.model().containing_indexes(property) {
            let owner = mb.model().index(index).declaring_entity_type();
            let removed_index = InternalEntityTypeBuilder(owner).remove_index(mb, index, source);
            debug_assert!(removed_index.is_some());
        }

        let mut detached = Vec::new();
        for fk in mb.model().containing_foreign_keys(property) {
            let owner = mb.model().foreign_key(fk).declaring_entity_type();
            if let Some(snapshot) = InternalEntityTypeBuilder(owner).detach_relationship(mb, fk, source)? {
                detached.push(snapshot);
            }
        }

        for key in mb.model().containing_keys(property) {
            for fk in mb.model().referencing_foreign_keys_of_key(key) {
                let owner = mb.model().foreign_key(fk).declaring_entity_type();
                if let Some(snapshot) = InternalEntityTypeBuilder(owner).detach_relationship(mb, fk, source)? {
                    detached.push(snapshot);
                }
            }
            if let Some(owner) = mb.model().try_key(key).map(|k| k.declaring_entity_type()) {
                let removed_key = InternalEntityTypeBuilder(owner).remove_key(mb, key, source, true)?;
                debug_assert!(removed_key.is_some());
            }
        }

        if mb.model().contains_property(property) {
            mb.model_mut().remove_property(property);
        }
        debug!(entity_type = %self.name(mb), property = data.name(), source = %source, "property removed");

        for snapshot in detached {
            snapshot.attach(mb)?;
        }
        Ok(Some(removed))
    }

    /// Add or configure an index over the named properties
    pub fn index<S: AsRef<str>>(
        self,
        mb: &mut InternalModelBuilder,
        names: &[S],
        source: ConfigurationSource,
    ) -> BuildResult<InternalIndexBuilder> {
        let Some(properties) = self.get_or_create_properties(mb, names, source)? else {
            return Ok(None);
        };
        Ok(Some(self.index_for(mb, properties, source)))
    }

    pub fn index_for(
        self,
        mb: &mut InternalModelBuilder,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> InternalIndexBuilder {
        let existing = mb.model().find_declared_index(self.0, &properties);
        let (index, is_new) = {
            let (model, state) = mb.model_and_state(self.0);
            state
                .indexes
                .get_or_add(existing, || model.add_index(self.0, properties), source)
        };
        if is_new {
            debug!(entity_type = %self.name(mb), source = %source, "index added");
        }
        InternalIndexBuilder(index)
    }

    pub fn remove_index(
        self,
        mb: &mut InternalModelBuilder,
        index: IndexId,
        source: ConfigurationSource,
    ) -> Option<ConfigurationSource> {
        let data = mb.model().try_index(index)?.clone();
        let removed = mb.entity_state_mut(self.0).indexes.remove(index, source, true)?;
        mb.model_mut().remove_index(index);
        remove_shadow_properties_if_unused(mb, data.properties());
        debug!(entity_type = %self.name(mb), source = %source, "index removed");
        Some(removed)
    }
}

/// Whether the relationship owning `foreign_key` can be removed at `source`
pub(crate) fn can_remove_foreign_key(
    mb: &InternalModelBuilder,
    foreign_key: ForeignKeyId,
    source: ConfigurationSource,
    can_override_same: bool,
) -> bool {
    let Some(fk) = mb.model().try_foreign_key(foreign_key) else {
        return true;
    };
    mb.entity_state(fk.declaring_entity_type())
        .map(|s| s.relationships.can_remove(foreign_key, source, can_override_same))
        .unwrap_or(source == ConfigurationSource::Explicit && can_override_same)
}

/// Remove the shadow properties among `properties` that nothing uses any more
pub(crate) fn remove_shadow_properties_if_unused(mb: &mut InternalModelBuilder, properties: &[PropertyId]) {
    for property in properties {
        if mb.model().try_property(*property).is_some_and(|p| p.is_shadow()) {
            remove_property_if_unused(mb, *property);
        }
    }
}

fn remove_property_if_unused(mb: &mut InternalModelBuilder, property: PropertyId) {
    let model = mb.model();
    let Some(declaring) = model.try_property(property).map(|p| p.declaring_entity_type()) else {
        return;
    };
    if !model.is_property_unused(property) {
        return;
    }
    if mb
        .entity_state_mut(declaring)
        .properties
        .remove(property, ConfigurationSource::Convention, true)
        .is_none()
    {
        return;
    }
    if let Some(removed) = mb.model_mut().remove_property(property) {
        trace!(property = removed.name(), "unused shadow property removed");
    }
}
