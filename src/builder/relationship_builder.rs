//! Relationship builder
//!
//! Configures one foreign key. Most changes cannot be applied in place: the
//! foreign key is removed and re-created through the dependent entity type,
//! and the configuration sources of the old builder are merged into the new
//! one. A replacement that fails re-attaches the old relationship.

use tracing::{debug, warn};

use super::entity_type_builder::{InternalEntityTypeBuilder, NewRelationship, RelationshipMerge};
use super::error::{BuildResult, ModelBuilderError};
use super::model_builder::InternalModelBuilder;
use super::property_builder::can_set_required_properties;
use super::snapshot::{PropertySpec, RelationshipSnapshot};
use crate::metadata::{
    ConfigurationSource, EntityTypeId, ForeignKey, ForeignKeyId, PropertyId, max_source, pinned_above,
};

/// Configuration sources of the independently tracked aspects of a relationship
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationshipBuilderState {
    pub foreign_key_properties_source: Option<ConfigurationSource>,
    pub principal_key_source: Option<ConfigurationSource>,
    pub is_unique_source: Option<ConfigurationSource>,
    pub is_required_source: Option<ConfigurationSource>,
    pub principal_end_source: Option<ConfigurationSource>,
}

impl RelationshipBuilderState {
    /// Every aspect starting at `initial`
    pub fn new(initial: Option<ConfigurationSource>) -> Self {
        Self {
            foreign_key_properties_source: initial,
            principal_key_source: initial,
            is_unique_source: initial,
            is_required_source: initial,
            principal_end_source: initial,
        }
    }
}

/// Values a short replacement may override; unset ones default to the current foreign key
#[derive(Debug, Clone, Default)]
struct ReplaceOptions {
    dependent_properties: Option<Vec<PropertyId>>,
    principal_properties: Option<Vec<PropertyId>>,
    is_unique: Option<bool>,
    is_required: Option<bool>,
}

/// Full description of a replacement foreign key
#[derive(Debug, Clone)]
struct Replacement {
    principal: EntityTypeId,
    dependent: EntityTypeId,
    navigation_to_principal: Option<String>,
    navigation_to_dependent: Option<String>,
    foreign_key_properties: Option<Vec<PropertySpec>>,
    principal_properties: Option<Vec<PropertySpec>>,
    is_unique: Option<bool>,
    is_required: Option<bool>,
}

/// Handle for configuring one relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternalRelationshipBuilder(pub(crate) ForeignKeyId);

impl InternalRelationshipBuilder {
    pub fn id(self) -> ForeignKeyId {
        self.0
    }

    /// The foreign key this handle configures
    ///
    /// Panics when the foreign key was removed or replaced; check
    /// [`is_attached`](Self::is_attached) or use [`try_metadata`](Self::try_metadata).
    pub fn metadata(self, mb: &InternalModelBuilder) -> &ForeignKey {
        mb.model().foreign_key(self.0)
    }

    pub fn try_metadata(self, mb: &InternalModelBuilder) -> Option<&ForeignKey> {
        mb.model().try_foreign_key(self.0)
    }

    pub fn principal_entity_type(self, mb: &InternalModelBuilder) -> EntityTypeId {
        self.metadata(mb).principal_entity_type()
    }

    pub fn dependent_entity_type(self, mb: &InternalModelBuilder) -> EntityTypeId {
        self.metadata(mb).declaring_entity_type()
    }

    /// Whether the relationship is still part of the model
    pub fn is_attached(self, mb: &InternalModelBuilder) -> bool {
        mb.model().contains_foreign_key(self.0)
    }

    pub fn state(self, mb: &InternalModelBuilder) -> RelationshipBuilderState {
        mb.model()
            .try_foreign_key(self.0)
            .and_then(|fk| mb.entity_state(fk.declaring_entity_type()))
            .and_then(|s| s.relationships.state(self.0).copied())
            .unwrap_or_default()
    }

    fn set_state(self, mb: &mut InternalModelBuilder, state: RelationshipBuilderState) {
        let Some(dependent) = mb.model().try_foreign_key(self.0).map(|fk| fk.declaring_entity_type()) else {
            return;
        };
        if let Some(current) = mb.entity_state_mut(dependent).relationships.state_mut(self.0) {
            *current = state;
        }
    }

    pub fn navigation_to_principal(
        self,
        mb: &mut InternalModelBuilder,
        name: Option<&str>,
        source: ConfigurationSource,
        strict_prefer_existing: Option<bool>,
    ) -> BuildResult<Self> {
        self.navigation_end(mb, name, true, source, strict_prefer_existing)
    }

    pub fn navigation_to_dependent(
        self,
        mb: &mut InternalModelBuilder,
        name: Option<&str>,
        source: ConfigurationSource,
        strict_prefer_existing: Option<bool>,
    ) -> BuildResult<Self> {
        self.navigation_end(mb, name, false, source, strict_prefer_existing)
    }

    /// Set or clear one navigation
    ///
    /// With `strict_prefer_existing` set, a compatible navigation of the same
    /// name on another foreign key wins and this relationship is folded into it.
    fn navigation_end(
        self,
        mb: &mut InternalModelBuilder,
        name: Option<&str>,
        points_to_principal: bool,
        source: ConfigurationSource,
        strict_prefer_existing: Option<bool>,
    ) -> BuildResult<Self> {
        let Some(fk) = self.try_metadata(mb).cloned() else {
            return Ok(None);
        };
        let declaring = if points_to_principal {
            fk.declaring_entity_type()
        } else {
            fk.principal_entity_type()
        };
        let entity_type = mb.entity_for(declaring, source);

        if let Some(strict) = strict_prefer_existing {
            let existing = name.and_then(|n| mb.model().find_declared_navigation(declaring, n));
            if let Some(navigation) = existing {
                let compatible = navigation.is_compatible(
                    mb.model().foreign_key(navigation.foreign_key),
                    fk.principal_entity_type(),
                    fk.declaring_entity_type(),
                    strict.then_some(points_to_principal),
                    Some(fk.is_unique()),
                );
                if compatible {
                    let inverse = fk.navigation_name(!points_to_principal).map(str::to_string);
                    if navigation.foreign_key == self.0
                        || entity_type.remove_relationship(mb, self.0, source)?.is_some()
                    {
                        return entity_type.relationship_from_navigation(
                            mb,
                            &navigation,
                            source,
                            Some(inverse.as_deref()),
                        );
                    }
                }
            }
        }

        let has_changed = name.is_some() && fk.navigation_name(points_to_principal) != name;
        match entity_type.navigation(mb, name, self.0, points_to_principal, source)? {
            Some(builder) if has_changed => {
                let state = builder.state(mb);
                builder.replace_foreign_key(mb, state, source, ReplaceOptions::default())
            }
            other => Ok(other),
        }
    }

    pub fn required(
        self,
        mb: &mut InternalModelBuilder,
        is_required: Option<bool>,
        source: ConfigurationSource,
    ) -> BuildResult<Self> {
        if !self.is_attached(mb) {
            return Ok(None);
        }
        let mut state = self.state(mb);
        if is_required == Some(mb.model().is_foreign_key_required(self.0)) {
            if let Some(fk) = mb.model_mut().foreign_key_mut(self.0) {
                fk.is_required = is_required;
            }
            state.is_required_source = Some(source.max_with(state.is_required_source));
            self.set_state(mb, state);
            return Ok(Some(self));
        }

        if !source.overrides_opt(state.is_required_source) {
            return Ok(None);
        }

        if let Some(required) = is_required {
            if pinned_above(state.foreign_key_properties_source, source) {
                let dependent = InternalEntityTypeBuilder(self.dependent_entity_type(mb));
                if !dependent.can_set_required(mb, self.0, required, source)? {
                    return Ok(None);
                }
            }
        }

        state.is_required_source = Some(source.max_with(state.is_required_source));
        self.replace_foreign_key(
            mb,
            state,
            source,
            ReplaceOptions {
                is_required,
                ..ReplaceOptions::default()
            },
        )
    }

    pub fn unique(
        self,
        mb: &mut InternalModelBuilder,
        is_unique: Option<bool>,
        source: ConfigurationSource,
    ) -> BuildResult<Self> {
        if !self.is_attached(mb) {
            return Ok(None);
        }
        let mut state = self.state(mb);
        let fk = self.metadata(mb);
        let has_navigation_to_dependent = fk.principal_to_dependent().is_some();
        if is_unique == Some(fk.is_unique()) {
            if let Some(fk) = mb.model_mut().foreign_key_mut(self.0) {
                fk.is_unique = is_unique;
            }
            state.is_unique_source = Some(source.max_with(state.is_unique_source));
            self.set_state(mb, state);
            return Ok(Some(self));
        }

        // The navigation to the dependent fixes the multiplicity
        if has_navigation_to_dependent {
            return Ok(None);
        }

        if !source.overrides_opt(state.is_unique_source) {
            return Ok(None);
        }

        state.is_unique_source = Some(source.max_with(state.is_unique_source));
        self.replace_foreign_key(
            mb,
            state,
            source,
            ReplaceOptions {
                is_unique,
                ..ReplaceOptions::default()
            },
        )
    }

    /// Swap the principal and dependent ends of a one-to-one relationship
    pub fn invert(self, mb: &mut InternalModelBuilder, source: ConfigurationSource) -> BuildResult<Self> {
        let Some(fk) = self.try_metadata(mb).cloned() else {
            return Ok(None);
        };
        if !fk.is_unique() {
            return Ok(None);
        }

        let mut state = self.state(mb);
        if pinned_above(state.foreign_key_properties_source, source)
            || pinned_above(state.principal_key_source, source)
            || !source.overrides_opt(state.principal_end_source)
        {
            if source == ConfigurationSource::Explicit {
                let model = mb.model();
                return Err(ModelBuilderError::RelationshipCannotBeInverted {
                    principal: model.entity_type(fk.principal_entity_type()).name().to_string(),
                    dependent: model.entity_type(fk.declaring_entity_type()).name().to_string(),
                });
            }
            return Ok(None);
        }

        state.principal_end_source = Some(source.max_with(state.principal_end_source));
        state.foreign_key_properties_source = None;
        state.principal_key_source = None;

        let is_required = state
            .is_required_source
            .map(|_| mb.model().is_foreign_key_required(self.0));
        debug!(
            principal = mb.model().entity_type(fk.principal_entity_type()).name(),
            dependent = mb.model().entity_type(fk.declaring_entity_type()).name(),
            source = %source,
            "inverting relationship"
        );
        self.replace_foreign_key_with(
            mb,
            state,
            source,
            Replacement {
                principal: fk.declaring_entity_type(),
                dependent: fk.principal_entity_type(),
                navigation_to_principal: fk.principal_to_dependent().map(str::to_string),
                navigation_to_dependent: fk.dependent_to_principal().map(str::to_string),
                foreign_key_properties: None,
                principal_properties: None,
                is_unique: Some(fk.is_unique()),
                is_required,
            },
        )
    }

    /// Use the named dependent properties as the foreign key
    pub fn foreign_key<S: AsRef<str>>(
        self,
        mb: &mut InternalModelBuilder,
        property_names: &[S],
        source: ConfigurationSource,
    ) -> BuildResult<Self> {
        if !self.is_attached(mb) {
            return Ok(None);
        }
        let dependent = mb.entity_for(self.dependent_entity_type(mb), source);
        let Some(properties) = dependent.get_or_create_properties(mb, property_names, source)? else {
            return Ok(None);
        };
        self.foreign_key_properties(mb, Some(properties), source)
    }

    /// Use `properties` as the foreign key, or re-infer it when `None`
    pub fn foreign_key_properties(
        self,
        mb: &mut InternalModelBuilder,
        properties: Option<Vec<PropertyId>>,
        source: ConfigurationSource,
    ) -> BuildResult<Self> {
        if !self.is_attached(mb) {
            return Ok(None);
        }
        let mut state = self.state(mb);
        let fk = self.metadata(mb);
        if properties.as_deref() == Some(fk.properties()) {
            let names = mb.model().property_names(fk.properties());
            state.foreign_key_properties_source =
                Some(source.max_with(state.foreign_key_properties_source));
            self.set_state(mb, state);

            let dependent = mb.entity_for(self.dependent_entity_type(mb), source);
            dependent.get_or_create_properties(mb, &names, source)?;
            return Ok(Some(self));
        }

        if !source.overrides_opt(state.foreign_key_properties_source) {
            return Ok(None);
        }

        let properties = properties.filter(|p| !p.is_empty());
        state.foreign_key_properties_source = properties
            .as_ref()
            .map(|_| source.max_with(state.foreign_key_properties_source));

        self.replace_foreign_key(
            mb,
            state,
            source,
            ReplaceOptions {
                dependent_properties: properties,
                ..ReplaceOptions::default()
            },
        )
    }

    pub fn can_set_foreign_key(
        self,
        mb: &InternalModelBuilder,
        properties: &[PropertyId],
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        if !self.is_attached(mb) {
            return Ok(false);
        }
        let state = self.state(mb);
        if !source.overrides_opt(state.foreign_key_properties_source) {
            return Ok(false);
        }

        if source.overrides_opt(state.is_required_source) || properties.is_empty() {
            return Ok(true);
        }

        let is_required = mb.model().is_foreign_key_required(self.0);
        if !is_required
            && !properties
                .iter()
                .any(|p| mb.model().property(*p).property_type().is_nullable())
        {
            return Ok(false);
        }

        can_set_required_properties(mb, properties, is_required, source)
    }

    /// Set the foreign key as seen from the named end, inverting when that end is the principal
    pub fn foreign_key_on<S: AsRef<str>>(
        self,
        mb: &mut InternalModelBuilder,
        dependent_type_name: &str,
        property_names: &[S],
        source: ConfigurationSource,
    ) -> BuildResult<Self> {
        if !self.is_attached(mb) {
            return Ok(None);
        }
        let entity_type = self.resolve_type(mb, dependent_type_name)?;
        let mut state = self.state(mb);
        state.principal_end_source = Some(source.max_with(state.principal_end_source));
        self.set_state(mb, state);

        let builder = if entity_type == self.dependent_entity_type(mb) {
            Some(self)
        } else {
            self.invert(mb, source)?
        };
        match builder {
            Some(builder) => builder.foreign_key(mb, property_names, source),
            None => Ok(None),
        }
    }

    /// Use the named principal properties as the principal key
    pub fn principal_key<S: AsRef<str>>(
        self,
        mb: &mut InternalModelBuilder,
        property_names: &[S],
        source: ConfigurationSource,
    ) -> BuildResult<Self> {
        if !self.is_attached(mb) {
            return Ok(None);
        }
        let principal = mb.entity_for(self.principal_entity_type(mb), source);
        let Some(properties) = principal.get_or_create_properties(mb, property_names, source)? else {
            return Ok(None);
        };
        self.principal_key_properties(mb, Some(properties), source)
    }

    pub fn principal_key_properties(
        self,
        mb: &mut InternalModelBuilder,
        properties: Option<Vec<PropertyId>>,
        source: ConfigurationSource,
    ) -> BuildResult<Self> {
        if !self.is_attached(mb) {
            return Ok(None);
        }
        let mut state = self.state(mb);
        let key = mb.model().key(self.metadata(mb).principal_key());
        if let Some(properties) = properties.as_deref().filter(|p| *p == key.properties()) {
            let principal = mb.entity_for(self.principal_entity_type(mb), source);
            principal.key_for(mb, properties.to_vec(), source)?;
            state.principal_key_source = Some(source.max_with(state.principal_key_source));
            self.set_state(mb, state);
            return Ok(Some(self));
        }

        if !source.overrides_opt(state.principal_key_source) {
            return Ok(None);
        }

        let properties = properties.filter(|p| !p.is_empty());
        state.principal_key_source = properties
            .as_ref()
            .map(|_| source.max_with(state.principal_key_source));

        self.replace_foreign_key(
            mb,
            state,
            source,
            ReplaceOptions {
                principal_properties: properties,
                ..ReplaceOptions::default()
            },
        )
    }

    /// Set the principal key as seen from the named end, inverting when that end is the dependent
    pub fn principal_key_on<S: AsRef<str>>(
        self,
        mb: &mut InternalModelBuilder,
        principal_type_name: &str,
        property_names: &[S],
        source: ConfigurationSource,
    ) -> BuildResult<Self> {
        if !self.is_attached(mb) {
            return Ok(None);
        }
        let entity_type = self.resolve_type(mb, principal_type_name)?;
        let mut state = self.state(mb);
        state.principal_end_source = Some(source.max_with(state.principal_end_source));
        self.set_state(mb, state);

        let builder = if entity_type == self.principal_entity_type(mb) {
            Some(self)
        } else {
            self.invert(mb, source)?
        };
        match builder {
            Some(builder) => builder.principal_key(mb, property_names, source),
            None => Ok(None),
        }
    }

    pub fn can_update_principal_key(
        self,
        mb: &InternalModelBuilder,
        properties: &[PropertyId],
        source: ConfigurationSource,
    ) -> bool {
        let Some(fk) = self.try_metadata(mb) else {
            return false;
        };
        if mb.model().key(fk.principal_key()).properties() == properties {
            return true;
        }

        let state = self.state(mb);
        if pinned_above(state.principal_key_source, source) {
            return false;
        }

        !(pinned_above(state.foreign_key_properties_source, source)
            && !mb.model().are_compatible(properties, fk.properties()))
    }

    /// Point the relationship at a new principal key unless its key is pinned
    pub fn update_principal_key(
        self,
        mb: &mut InternalModelBuilder,
        properties: &[PropertyId],
        source: ConfigurationSource,
    ) -> BuildResult<Self> {
        if !self.is_attached(mb) {
            return Ok(None);
        }
        if mb.model().key(self.metadata(mb).principal_key()).properties() == properties {
            return Ok(Some(self));
        }
        if !self.can_update_principal_key(mb, properties, source) {
            return Ok(None);
        }

        let state = self.state(mb);
        self.replace_foreign_key(
            mb,
            state,
            source,
            ReplaceOptions {
                principal_properties: Some(properties.to_vec()),
                ..ReplaceOptions::default()
            },
        )
    }

    /// Replace keeping every aspect whose recorded source wins over `source`
    fn replace_foreign_key(
        self,
        mb: &mut InternalModelBuilder,
        state: RelationshipBuilderState,
        source: ConfigurationSource,
        options: ReplaceOptions,
    ) -> BuildResult<Self> {
        let fk = self.metadata(mb).clone();
        let model = mb.model();

        let dependent_properties = options.dependent_properties.or_else(|| {
            pinned_above(state.foreign_key_properties_source, source).then(|| fk.properties().to_vec())
        });
        let principal_properties = options.principal_properties.or_else(|| {
            pinned_above(state.principal_key_source, source)
                .then(|| model.key(fk.principal_key()).properties().to_vec())
        });
        let is_unique = options
            .is_unique
            .or_else(|| fk.principal_to_dependent().map(|_| fk.is_unique()))
            .or_else(|| pinned_above(state.is_unique_source, source).then(|| fk.is_unique()));
        let is_required = options.is_required.or_else(|| {
            pinned_above(state.is_required_source, source)
                .then(|| model.is_foreign_key_required(self.0))
        });

        if let (Some(properties), Some(required)) = (&dependent_properties, is_required) {
            if !can_set_required_properties(mb, properties, required, source)? {
                return Ok(None);
            }
        }

        let model = mb.model();
        let replacement = Replacement {
            principal: fk.principal_entity_type(),
            dependent: fk.declaring_entity_type(),
            navigation_to_principal: fk.dependent_to_principal().map(str::to_string),
            navigation_to_dependent: fk.principal_to_dependent().map(str::to_string),
            foreign_key_properties: dependent_properties.map(|p| PropertySpec::capture(model, &p)),
            principal_properties: principal_properties.map(|p| PropertySpec::capture(model, &p)),
            is_unique,
            is_required,
        };
        self.replace_foreign_key_with(mb, state, source, replacement)
    }

    /// Remove the foreign key and create `replacement` in its place
    ///
    /// `state` is merged into the new builder. On failure the old relationship
    /// is attached again.
    fn replace_foreign_key_with(
        self,
        mb: &mut InternalModelBuilder,
        state: RelationshipBuilderState,
        source: ConfigurationSource,
        replacement: Replacement,
    ) -> BuildResult<Self> {
        let Some(snapshot) = RelationshipSnapshot::capture(mb, self.0) else {
            return Ok(None);
        };
        let dependent = InternalEntityTypeBuilder(snapshot.dependent);
        let Some(replaced_source) = dependent.remove_relationship(mb, self.0, ConfigurationSource::Explicit)? else {
            return Ok(None);
        };

        let snapshot = snapshot.with_configuration_source(replaced_source);
        let merge_from = snapshot.clone().with_state(state);
        match add_relationship(mb, replacement, source, replaced_source, &merge_from) {
            Ok(Some(builder)) => {
                debug!(old = ?self.0, new = ?builder.0, source = %source, "foreign key replaced");
                Ok(Some(builder))
            }
            Ok(None) => {
                debug!(foreign_key = ?self.0, source = %source, "replacement failed, restoring relationship");
                snapshot.attach(mb)?;
                Ok(None)
            }
            Err(err) => {
                if let Err(restore) = snapshot.attach(mb) {
                    warn!(error = %restore, "could not restore relationship after failed replacement");
                }
                Err(err)
            }
        }
    }

    /// Carry the configuration sources of a replaced relationship over to this one
    pub(crate) fn merge_configuration_source_with(
        self,
        mb: &mut InternalModelBuilder,
        old: &RelationshipSnapshot,
        source: ConfigurationSource,
    ) -> BuildResult<Self> {
        let fk = self.metadata(mb);
        let inverted = old.dependent != fk.declaring_entity_type();
        debug_assert!(
            (!inverted && old.principal == fk.principal_entity_type())
                || (inverted
                    && old.dependent == fk.principal_entity_type()
                    && old.principal == fk.declaring_entity_type())
        );
        let (configured_unique, configured_required) = (fk.configured_unique(), fk.configured_required());

        let (target_foreign_key_source, target_principal_key_source) = if inverted {
            (old.state.principal_key_source, old.state.foreign_key_properties_source)
        } else {
            (old.state.foreign_key_properties_source, old.state.principal_key_source)
        };

        let mut state = self.state(mb);
        state.foreign_key_properties_source =
            max_source(target_foreign_key_source, state.foreign_key_properties_source);
        state.principal_key_source = max_source(target_principal_key_source, state.principal_key_source);
        state.principal_end_source = old.state.principal_end_source;
        state.is_unique_source = max_source(old.state.is_unique_source, state.is_unique_source);
        state.is_required_source = max_source(old.state.is_required_source, state.is_required_source);
        self.set_state(mb, state);

        let mut builder = self;
        if let (Some(is_unique), None) = (old.is_unique, configured_unique) {
            match builder.unique(mb, Some(is_unique), source)? {
                Some(b) => builder = b,
                None => return Ok(None),
            }
        }
        if let (Some(is_required), None) = (old.is_required, configured_required) {
            match builder.required(mb, Some(is_required), source)? {
                Some(b) => builder = b,
                None => return Ok(None),
            }
        }
        Ok(Some(builder))
    }

    fn resolve_type(self, mb: &InternalModelBuilder, name: &str) -> Result<EntityTypeId, ModelBuilderError> {
        let fk = self.metadata(mb);
        let model = mb.model();
        let dependent = model.entity_type(fk.declaring_entity_type());
        let principal = model.entity_type(fk.principal_entity_type());
        if dependent.name() == name {
            return Ok(dependent.id());
        }
        if principal.name() == name {
            return Ok(principal.id());
        }
        Err(ModelBuilderError::EntityTypeNotInRelationship {
            entity_type: name.to_string(),
            principal: principal.name().to_string(),
            dependent: dependent.name().to_string(),
        })
    }
}

/// Create the replacement relationship through its dependent entity type
fn add_relationship(
    mb: &mut InternalModelBuilder,
    replacement: Replacement,
    source: ConfigurationSource,
    replaced_source: ConfigurationSource,
    merge_from: &RelationshipSnapshot,
) -> BuildResult<InternalRelationshipBuilder> {
    let principal = mb.entity_for(replacement.principal, source);
    let dependent = mb.entity_for(replacement.dependent, source);

    let foreign_key_properties = match replacement.foreign_key_properties {
        Some(specs) => match dependent.properties_for_specs(mb, &specs)? {
            Some(properties) => Some(properties),
            None => return Ok(None),
        },
        None => None,
    };
    let principal_properties = match replacement.principal_properties {
        Some(specs) => match principal.properties_for_specs(mb, &specs)? {
            Some(properties) => Some(properties),
            None => return Ok(None),
        },
        None => None,
    };

    let request = NewRelationship {
        principal: principal.id(),
        dependent: dependent.id(),
        navigation_to_principal: replacement.navigation_to_principal,
        navigation_to_dependent: replacement.navigation_to_dependent,
        foreign_key_properties,
        principal_properties,
        is_unique: replacement.is_unique,
        is_required: replacement.is_required,
    };
    let merge = RelationshipMerge {
        snapshot: merge_from,
        configuration_source: replaced_source,
    };
    dependent.relationship_with(mb, request, source, Some(merge))
}
