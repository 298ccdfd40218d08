//! Keys and the primary key

use tracing::{debug, warn};

use super::InternalEntityTypeBuilder;
use super::members::{can_remove_foreign_key, remove_shadow_properties_if_unused};
use crate::builder::config::PrimaryKeyReplacement;
use crate::builder::error::{BuildResult, ModelBuilderError};
use crate::builder::model_builder::InternalModelBuilder;
use crate::builder::property_builder::InternalKeyBuilder;
use crate::builder::relationship_builder::InternalRelationshipBuilder;
use crate::conventions::ConventionDispatcher;
use crate::metadata::{ConfigurationSource, KeyId, PropertyId};

impl InternalEntityTypeBuilder {
    pub fn primary_key<S: AsRef<str>>(
        self,
        mb: &mut InternalModelBuilder,
        names: &[S],
        source: ConfigurationSource,
    ) -> BuildResult<InternalKeyBuilder> {
        let Some(properties) = self.get_or_create_properties(mb, names, source)? else {
            return Ok(None);
        };
        self.primary_key_for(mb, properties, source)
    }

    /// Make `properties` the primary key
    ///
    /// Foreign keys referencing the previous primary key are moved to the new
    /// one. Under [`PrimaryKeyReplacement::AllOrNothing`] nothing changes unless
    /// every one of them can move.
    pub fn primary_key_for(
        self,
        mb: &mut InternalModelBuilder,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> BuildResult<InternalKeyBuilder> {
        if properties.is_empty() {
            return Ok(None);
        }

        let old_key = mb.model().find_declared_primary_key(self.0);
        let mut new_key = mb.model().find_declared_key(self.0, &properties);
        if let Some(old_key) = old_key.filter(|old| Some(*old) != new_key) {
            let old_source = mb
                .entity_state(self.0)
                .map(|s| s.key_source(old_key))
                .unwrap_or(ConfigurationSource::Explicit);
            if !source.overrides(old_source) {
                return Ok(None);
            }

            if mb.config().primary_key_replacement == PrimaryKeyReplacement::AllOrNothing {
                for fk in mb.model().referencing_foreign_keys_of_key(old_key) {
                    if InternalRelationshipBuilder(fk).can_update_principal_key(mb, &properties, source) {
                        continue;
                    }
                    if source == ConfigurationSource::Explicit {
                        let model = mb.model();
                        let foreign_key = model.foreign_key(fk);
                        return Err(ModelBuilderError::PrimaryKeyReplacement {
                            entity_type: self.name(mb),
                            dependent: model.entity_type(foreign_key.declaring_entity_type()).name().to_string(),
                            foreign_key: model.property_names(foreign_key.properties()),
                        });
                    }
                    return Ok(None);
                }
            }

            if new_key.is_none() {
                match self.key_for(mb, properties.clone(), ConfigurationSource::Convention)? {
                    Some(key) => new_key = Some(key.0),
                    None => return Ok(None),
                }
            }
            if let Some(new_key) = new_key {
                self.update_referencing_foreign_keys(mb, old_key, new_key, source)?;
            }
        }

        let new_key = new_key.filter(|k| {
            mb.model()
                .try_key(*k)
                .is_some_and(|k| k.declaring_entity_type() == self.0)
        });
        let (key, is_new) = {
            let (model, state) = mb.model_and_state(self.0);
            state.keys.get_or_add(
                new_key,
                || model.add_key(self.0, properties.clone()),
                source,
            )
        };
        mb.model_mut().set_primary_key(self.0, Some(key));
        for property in &properties {
            let declaring = mb.model().property(*property).declaring_entity_type();
            mb.entity_state_mut(declaring)
                .properties
                .update_configuration_source(*property, source);
        }
        debug!(entity_type = %self.name(mb), source = %source, "primary key set");

        let builder = if is_new {
            ConventionDispatcher::on_key_added(mb, InternalKeyBuilder(key))?
        } else {
            Some(InternalKeyBuilder(key))
        };
        if builder.is_none() || mb.model().try_key(key).is_none() {
            return Ok(None);
        }

        self.replace_convention_shadow_keys(mb, key)?;
        Ok(Some(InternalKeyBuilder(key)))
    }

    pub fn key<S: AsRef<str>>(
        self,
        mb: &mut InternalModelBuilder,
        names: &[S],
        source: ConfigurationSource,
    ) -> BuildResult<InternalKeyBuilder> {
        let Some(properties) = self.get_or_create_properties(mb, names, source)? else {
            return Ok(None);
        };
        self.key_for(mb, properties, source)
    }

    /// Add or configure an alternate key over `properties`
    pub fn key_for(
        self,
        mb: &mut InternalModelBuilder,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> BuildResult<InternalKeyBuilder> {
        if properties.is_empty() {
            return Ok(None);
        }

        // A key over inherited properties belongs to the root of the hierarchy
        let declaring = mb
            .model()
            .find_key(self.0, &properties)
            .map(|k| mb.model().key(k).declaring_entity_type())
            .unwrap_or(self.0);
        if declaring != self.0 {
            return InternalEntityTypeBuilder(declaring).key_for(mb, properties, source);
        }

        for property in &properties {
            let owner = mb.model().property(*property).declaring_entity_type();
            mb.entity_state_mut(owner)
                .properties
                .update_configuration_source(*property, source);
        }

        let existing = mb.model().find_declared_key(self.0, &properties);
        let (key, is_new) = {
            let (model, state) = mb.model_and_state(self.0);
            state
                .keys
                .get_or_add(existing, || model.add_key(self.0, properties), source)
        };

        let builder = InternalKeyBuilder(key);
        if is_new {
            debug!(entity_type = %self.name(mb), source = %source, "key added");
            return ConventionDispatcher::on_key_added(mb, builder);
        }
        Ok(Some(builder))
    }

    /// Remove a key along with the foreign keys that reference it
    pub fn remove_key(
        self,
        mb: &mut InternalModelBuilder,
        key: KeyId,
        source: ConfigurationSource,
        can_override_same: bool,
    ) -> BuildResult<ConfigurationSource> {
        let Some(data) = mb.model().try_key(key).cloned() else {
            return Ok(None);
        };
        if data.declaring_entity_type() != self.0 {
            return InternalEntityTypeBuilder(data.declaring_entity_type()).remove_key(
                mb,
                key,
                source,
                can_override_same,
            );
        }

        let key_removable = mb
            .entity_state(self.0)
            .map(|s| s.keys.can_remove(key, source, can_override_same))
            .unwrap_or(source == ConfigurationSource::Explicit && can_override_same);
        let referencing = mb.model().referencing_foreign_keys_of_key(key);
        if !key_removable
            || !referencing
                .iter()
                .all(|fk| can_remove_foreign_key(mb, *fk, source, true))
        {
            return Ok(None);
        }

        let removed = mb
            .entity_state_mut(self.0)
            .keys
            .remove(key, source, can_override_same)
            .unwrap_or(ConfigurationSource::Explicit);

        for fk in referencing {
            let Some(owner) = mb.model().try_foreign_key(fk).map(|f| f.declaring_entity_type()) else {
                continue;
            };
            let removed_fk = InternalEntityTypeBuilder(owner).remove_relationship(mb, fk, source)?;
            debug_assert!(removed_fk.is_some());
        }

        mb.model_mut().remove_key(key);
        remove_shadow_properties_if_unused(mb, data.properties());
        debug!(entity_type = %self.name(mb), source = %source, "key removed");
        Ok(Some(removed))
    }

    /// Remove a key that is neither primary nor referenced
    pub(crate) fn remove_key_if_unused(
        self,
        mb: &mut InternalModelBuilder,
        key: KeyId,
    ) -> Result<(), ModelBuilderError> {
        let model = mb.model();
        if model.try_key(key).is_none()
            || model.find_primary_key(self.0) == Some(key)
            || !model.referencing_foreign_keys_of_key(key).is_empty()
        {
            return Ok(());
        }

        self.remove_key(mb, key, ConfigurationSource::Convention, true)?;
        Ok(())
    }

    /// Move every foreign key referencing `old_key` to `new_key`
    ///
    /// The old key is removed only when all of them moved.
    fn update_referencing_foreign_keys(
        self,
        mb: &mut InternalModelBuilder,
        old_key: KeyId,
        new_key: KeyId,
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        let new_properties = mb.model().key(new_key).properties().to_vec();
        let mut all_moved = true;
        for fk in mb.model().referencing_foreign_keys_of_key(old_key) {
            let Some(owner) = mb.model().try_foreign_key(fk).map(|f| f.declaring_entity_type()) else {
                continue;
            };
            let relationship =
                InternalEntityTypeBuilder(owner).relationship_for(mb, fk, true, ConfigurationSource::Convention);
            if relationship.update_principal_key(mb, &new_properties, source)?.is_none() {
                all_moved = false;
            }
        }

        let Some(old_owner) = mb.model().try_key(old_key).map(|k| k.declaring_entity_type()) else {
            return Ok(all_moved);
        };
        if all_moved {
            InternalEntityTypeBuilder(old_owner).remove_key(mb, old_key, ConfigurationSource::Convention, true)?;
        } else {
            warn!(
                entity_type = %self.name(mb),
                "some foreign keys could not move to the new primary key, keeping the old key"
            );
        }
        Ok(all_moved)
    }

    /// Replace convention keys made only of shadow properties with `new_key`
    fn replace_convention_shadow_keys(
        self,
        mb: &mut InternalModelBuilder,
        new_key: KeyId,
    ) -> Result<(), ModelBuilderError> {
        for key in mb.model().keys(self.0) {
            let Some(data) = mb.model().try_key(key) else {
                continue;
            };
            if key == new_key {
                continue;
            }
            let owner = data.declaring_entity_type();
            let is_convention = mb
                .entity_state(owner)
                .is_some_and(|s| s.key_source(key) == ConfigurationSource::Convention);
            let all_shadow = data
                .properties()
                .iter()
                .all(|p| mb.model().property(*p).is_shadow());
            if is_convention && all_shadow {
                self.update_referencing_foreign_keys(mb, key, new_key, ConfigurationSource::Convention)?;
            }
        }
        Ok(())
    }
}
