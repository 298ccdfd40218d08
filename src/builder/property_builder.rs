//! Builders for properties, keys and indexes

use tracing::{debug, trace};

use super::error::ModelBuilderError;
use super::model_builder::InternalModelBuilder;
use crate::metadata::{
    ConfigurationSource, EntityTypeId, Index, IndexId, Key, KeyId, Property, PropertyId,
    ValueGenerated,
};

/// Configuration sources of the aspects of one property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyBuilderState {
    pub is_required_source: Option<ConfigurationSource>,
    pub value_generated_source: Option<ConfigurationSource>,
    pub value_generator_source: Option<ConfigurationSource>,
}

/// Handle for configuring one property
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternalPropertyBuilder(pub(crate) PropertyId);

impl InternalPropertyBuilder {
    pub fn id(self) -> PropertyId {
        self.0
    }

    pub fn metadata(self, mb: &InternalModelBuilder) -> &Property {
        mb.model().property(self.0)
    }

    pub fn entity_type(self, mb: &InternalModelBuilder) -> EntityTypeId {
        self.metadata(mb).declaring_entity_type()
    }

    fn state(self, mb: &InternalModelBuilder) -> PropertyBuilderState {
        let declaring = self.entity_type(mb);
        mb.entity_state(declaring)
            .and_then(|s| s.properties.state(self.0).copied())
            .unwrap_or_default()
    }

    fn state_mut(self, mb: &mut InternalModelBuilder) -> Option<&mut PropertyBuilderState> {
        let declaring = mb.model().try_property(self.0)?.declaring_entity_type();
        mb.entity_state_mut(declaring).properties.state_mut(self.0)
    }

    /// Whether the property may become required (or optional) at `source`
    ///
    /// Making a property optional when its type cannot hold a missing value
    /// fails, with an error when requested explicitly.
    pub fn can_set_required(
        self,
        mb: &InternalModelBuilder,
        is_required: bool,
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        let property = self.metadata(mb);
        if property.is_nullable() == !is_required {
            return Ok(true);
        }

        let recorded = self.state(mb).is_required_source.or(property
            .configured_nullable()
            .map(|_| ConfigurationSource::Explicit));
        if !source.overrides_opt(recorded) {
            return Ok(false);
        }

        if !is_required && !property.property_type().is_nullable() {
            if source == ConfigurationSource::Explicit {
                return Err(ModelBuilderError::PropertyCannotBeNullable {
                    property: property.name().to_string(),
                    entity_type: mb.model().entity_type(property.declaring_entity_type()).name().to_string(),
                    property_type: property.property_type().to_string(),
                });
            }
            return Ok(false);
        }

        Ok(true)
    }

    pub fn required(
        self,
        mb: &mut InternalModelBuilder,
        is_required: bool,
        source: ConfigurationSource,
    ) -> Result<bool, ModelBuilderError> {
        if !self.can_set_required(mb, is_required, source)? {
            return Ok(false);
        }

        if let Some(property) = mb.model_mut().property_mut(self.0) {
            property.is_nullable = Some(!is_required);
        }
        if let Some(state) = self.state_mut(mb) {
            state.is_required_source = Some(source.max_with(state.is_required_source));
        }
        trace!(property = ?self.0, is_required, source = %source, "property requiredness set");
        Ok(true)
    }

    pub fn value_generated(
        self,
        mb: &mut InternalModelBuilder,
        value_generated: Option<ValueGenerated>,
        source: ConfigurationSource,
    ) -> bool {
        let recorded = self.state(mb).value_generated_source;
        if !source.overrides_opt(recorded) {
            return false;
        }

        if let Some(property) = mb.model_mut().property_mut(self.0) {
            property.value_generated = value_generated;
        }
        if let Some(state) = self.state_mut(mb) {
            state.value_generated_source = Some(source.max_with(state.value_generated_source));
        }
        true
    }

    pub fn use_value_generator(
        self,
        mb: &mut InternalModelBuilder,
        generate_value: Option<bool>,
        source: ConfigurationSource,
    ) -> bool {
        let recorded = self.state(mb).value_generator_source;
        if !source.overrides_opt(recorded) {
            return false;
        }

        if let Some(property) = mb.model_mut().property_mut(self.0) {
            property.requires_value_generator = generate_value;
        }
        if let Some(state) = self.state_mut(mb) {
            state.value_generator_source = Some(source.max_with(state.value_generator_source));
        }
        true
    }
}

/// Handle for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternalKeyBuilder(pub(crate) KeyId);

impl InternalKeyBuilder {
    pub fn id(self) -> KeyId {
        self.0
    }

    pub fn metadata(self, mb: &InternalModelBuilder) -> &Key {
        mb.model().key(self.0)
    }

    pub fn entity_type(self, mb: &InternalModelBuilder) -> EntityTypeId {
        self.metadata(mb).declaring_entity_type()
    }
}

/// Handle for an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternalIndexBuilder(pub(crate) IndexId);

impl InternalIndexBuilder {
    pub fn id(self) -> IndexId {
        self.0
    }

    pub fn metadata(self, mb: &InternalModelBuilder) -> &Index {
        mb.model().index(self.0)
    }

    pub fn entity_type(self, mb: &InternalModelBuilder) -> EntityTypeId {
        self.metadata(mb).declaring_entity_type()
    }
}

/// Whether `properties` can be given the requested requiredness at `source`
///
/// Only properties whose type can hold a missing value take part. When none
/// does and the request is explicit the change is let through so that it
/// fails later with a descriptive error.
pub(crate) fn can_set_required_properties(
    mb: &InternalModelBuilder,
    properties: &[PropertyId],
    is_required: bool,
    source: ConfigurationSource,
) -> Result<bool, ModelBuilderError> {
    let candidates: Vec<PropertyId> = properties
        .iter()
        .copied()
        .filter(|p| mb.model().property(*p).property_type().is_nullable())
        .collect();
    if candidates.is_empty() && source == ConfigurationSource::Explicit {
        return Ok(true);
    }

    if is_required {
        for property in candidates {
            if !InternalPropertyBuilder(property).can_set_required(mb, true, source)? {
                return Ok(false);
            }
        }
        Ok(true)
    } else {
        for property in candidates {
            if InternalPropertyBuilder(property).can_set_required(mb, false, source)? {
                return Ok(true);
            }
        }
        debug!(source = %source, "no foreign key property can become optional");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyType;
    use ConfigurationSource::*;

    fn builder_with_property(property_type: PropertyType) -> (InternalModelBuilder, InternalPropertyBuilder) {
        let mut mb = InternalModelBuilder::new();
        let post = mb.entity("Post", Explicit).unwrap().unwrap();
        let property = post
            .property(&mut mb, "Rating", property_type, Convention)
            .unwrap()
            .unwrap();
        (mb, property)
    }

    #[test]
    fn test_required_is_pinned_by_higher_source() {
        let (mut mb, property) = builder_with_property(PropertyType::string());

        assert!(property.required(&mut mb, true, DataAnnotation).unwrap());
        assert!(!property.metadata(&mb).is_nullable());
        assert!(!property.required(&mut mb, false, Convention).unwrap());
        assert!(!property.metadata(&mb).is_nullable());
        assert!(property.required(&mut mb, false, Explicit).unwrap());
        assert!(property.metadata(&mb).is_nullable());
    }

    #[test]
    fn test_non_nullable_type_cannot_become_optional() {
        let (mut mb, property) = builder_with_property(PropertyType::int());

        assert!(!property.required(&mut mb, false, Convention).unwrap());
        let err = property.required(&mut mb, false, Explicit).unwrap_err();
        assert!(matches!(err, ModelBuilderError::PropertyCannotBeNullable { .. }));
    }

    #[test]
    fn test_value_generation_sources() {
        let (mut mb, property) = builder_with_property(PropertyType::int());

        assert!(property.value_generated(&mut mb, Some(ValueGenerated::OnAdd), Explicit));
        assert!(!property.value_generated(&mut mb, None, Convention));
        assert_eq!(property.metadata(&mb).value_generated(), Some(ValueGenerated::OnAdd));

        assert!(property.use_value_generator(&mut mb, Some(true), Convention));
        assert!(property.use_value_generator(&mut mb, None, Convention));
        assert_eq!(property.metadata(&mb).requires_value_generator(), None);
    }
}
