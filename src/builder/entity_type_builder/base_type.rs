//! Changing the base type
//!
//! Every removal the new hierarchy requires is checked before anything is
//! touched. Relationships over removed properties and keys are detached
//! first and attached again once the base type is in place, so they bind to
//! the inherited members.

use std::collections::BTreeSet;

use tracing::debug;

use super::InternalEntityTypeBuilder;
use super::members::can_remove_foreign_key;
use crate::builder::error::{BuildResult, ModelBuilderError};
use crate::builder::model_builder::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityTypeId, ForeignKey, ForeignKeyId, Model, Navigation, PropertyId};

/// Everything that has to go before the base type can change
#[derive(Debug, Default)]
struct BaseTypeChange {
    duplicated_properties: Vec<PropertyId>,
    redundant_relationships: BTreeSet<ForeignKeyId>,
    detached_relationships: BTreeSet<ForeignKeyId>,
}

/// The end of `fk` opposite to `entity_type` or one of its ancestors
fn other_end(model: &Model, fk: &ForeignKey, entity_type: EntityTypeId) -> EntityTypeId {
    if model.is_same_or_derived_from(entity_type, fk.declaring_entity_type()) {
        fk.principal_entity_type()
    } else {
        fk.declaring_entity_type()
    }
}

/// The navigation of `fk` declared on `entity_type` or one of its ancestors
fn navigation_from(model: &Model, fk: &ForeignKey, entity_type: EntityTypeId) -> Option<Navigation> {
    fk.navigations()
        .into_iter()
        .find(|n| model.is_same_or_derived_from(entity_type, n.declaring_entity_type))
}

impl InternalEntityTypeBuilder {
    /// Set or clear the base type by name
    pub fn base_type_by_name(
        self,
        mb: &mut InternalModelBuilder,
        base_name: Option<&str>,
        source: ConfigurationSource,
    ) -> BuildResult<InternalEntityTypeBuilder> {
        let base = match base_name {
            Some(name) => match mb.entity(name, source)? {
                Some(base) => Some(base.id()),
                None => return Ok(None),
            },
            None => None,
        };
        self.base_type(mb, base, source)
    }

    /// Set or clear the base type
    ///
    /// Properties and keys the new base already provides are removed from
    /// this type, and relationships the base already has to the same target
    /// are dropped as redundant.
    pub fn base_type(
        self,
        mb: &mut InternalModelBuilder,
        base: Option<EntityTypeId>,
        source: ConfigurationSource,
    ) -> BuildResult<InternalEntityTypeBuilder> {
        let current = mb.model().entity_type(self.0).base_type();
        let recorded = {
            let state = mb.entity_state_mut(self.0);
            *state.base_type_source.get_or_insert(if current.is_some() {
                ConfigurationSource::Explicit
            } else {
                ConfigurationSource::Convention
            })
        };

        if current == base {
            mb.entity_state_mut(self.0).base_type_source = Some(source.max_with(Some(recorded)));
            return Ok(Some(self));
        }
        if !source.overrides(recorded) {
            return Ok(None);
        }

        let mut detached = Vec::new();
        if let Some(base) = base {
            if mb.model().is_same_or_derived_from(base, self.0) {
                if source == ConfigurationSource::Explicit {
                    return Err(ModelBuilderError::CircularBaseType {
                        entity_type: self.name(mb),
                        base_type: mb.model().entity_type(base).name().to_string(),
                    });
                }
                return Ok(None);
            }

            let change = match self.plan_base_type_change(mb, base, source) {
                Ok(change) => change,
                Err(reason) => {
                    if source == ConfigurationSource::Explicit {
                        return Err(ModelBuilderError::BaseTypeConflict {
                            entity_type: self.name(mb),
                            base_type: mb.model().entity_type(base).name().to_string(),
                            reason,
                        });
                    }
                    return Ok(None);
                }
            };

            for fk in &change.redundant_relationships {
                if mb.model().contains_foreign_key(*fk) {
                    let removed = self.remove_relationship(mb, *fk, source)?;
                    debug_assert!(removed.is_some());
                }
            }
            for fk in &change.detached_relationships {
                let Some(owner) = mb.model().try_foreign_key(*fk).map(|f| f.declaring_entity_type()) else {
                    continue;
                };
                if let Some(snapshot) = InternalEntityTypeBuilder(owner).detach_relationship(mb, *fk, source)? {
                    detached.push(snapshot);
                }
            }
            for property in &change.duplicated_properties {
                if mb.model().contains_property(*property) {
                    let removed = self.remove_property(mb, *property, source, true)?;
                    debug_assert!(removed.is_some());
                }
            }
            for key in mb.model().entity_type(self.0).declared_keys().to_vec() {
                let removed = self.remove_key(mb, key, source, true)?;
                debug_assert!(removed.is_some());
            }
        }

        mb.model_mut().set_base_type(self.0, base);
        mb.entity_state_mut(self.0).base_type_source = Some(source);
        debug!(
            entity_type = %self.name(mb),
            base_type = ?base.map(|b| mb.model().entity_type(b).name().to_string()),
            source = %source,
            "base type changed"
        );

        for snapshot in detached {
            snapshot.attach(mb)?;
        }
        Ok(Some(self))
    }

    /// Collect the removals for deriving from `base`, or why they are blocked
    fn plan_base_type_change(
        self,
        mb: &InternalModelBuilder,
        base: EntityTypeId,
        source: ConfigurationSource,
    ) -> Result<BaseTypeChange, String> {
        let model = mb.model();
        let mut change = BaseTypeChange::default();

        for base_property in model.properties(base) {
            let name = model.property(base_property).name();
            if let Some(duplicated) = model.find_declared_property(self.0, name) {
                if !self.can_remove_property(mb, duplicated, source, true) {
                    return Err(format!("the property '{name}' cannot be removed"));
                }
                change.duplicated_properties.push(duplicated);
            }
        }

        let state = mb.entity_state(self.0);
        for key in model.entity_type(self.0).declared_keys() {
            let removable = state
                .map(|s| s.keys.can_remove(*key, source, true))
                .unwrap_or(source == ConfigurationSource::Explicit);
            if !removable {
                let names = model.property_names(model.key(*key).properties());
                return Err(format!("the key {names:?} cannot be removed"));
            }
        }

        let base_relationships: Vec<&ForeignKey> = model
            .foreign_keys(base)
            .into_iter()
            .chain(model.referencing_foreign_keys(base))
            .map(|fk| model.foreign_key(fk))
            .collect();
        let own_relationships: BTreeSet<ForeignKeyId> = model
            .entity_type(self.0)
            .declared_foreign_keys()
            .iter()
            .copied()
            .chain(
                model
                    .all_foreign_keys()
                    .filter(|fk| fk.principal_entity_type() == self.0)
                    .map(|fk| fk.id()),
            )
            .collect();

        for id in &own_relationships {
            let fk = model.foreign_key(*id);
            let target = other_end(model, fk, self.0);
            let redundant = match navigation_from(model, fk, self.0) {
                None => {
                    let properties = model.property_names(fk.properties());
                    let principal_properties = model.property_names(model.key(fk.principal_key()).properties());
                    base_relationships.iter().any(|r| {
                        other_end(model, r, base) == target
                            && model.property_names(r.properties()) == properties
                            && model.property_names(model.key(r.principal_key()).properties()) == principal_properties
                    })
                }
                Some(navigation) => base_relationships.iter().any(|r| {
                    other_end(model, r, base) == target
                        && navigation_from(model, r, base).is_some_and(|n| n.name == navigation.name)
                }),
            };
            if redundant {
                if !can_remove_foreign_key(mb, *id, source, true) {
                    let target = model.entity_type(target).name();
                    return Err(format!("the relationship with '{target}' cannot be removed"));
                }
                change.redundant_relationships.insert(*id);
            }
        }

        let mut detach = BTreeSet::new();
        for property in &change.duplicated_properties {
            detach.extend(model.containing_foreign_keys(*property));
        }
        for key in model.entity_type(self.0).declared_keys() {
            detach.extend(model.referencing_foreign_keys_of_key(*key));
        }
        for fk in detach {
            if change.redundant_relationships.contains(&fk) {
                continue;
            }
            if !can_remove_foreign_key(mb, fk, source, true) {
                return Err("a relationship over the replaced members cannot be detached".to_string());
            }
            change.detached_relationships.insert(fk);
        }

        Ok(change)
    }
}
