//! Conventions
//!
//! A convention reacts to a structural change by configuring more of the
//! model, normally at [`ConfigurationSource::Convention`]. Conventions run
//! synchronously in registration order and may call back into any builder,
//! including the one that notified them.
//!
//! Each handler receives the builder produced by the previous one. Returning
//! `Ok(None)`, or detaching the element, stops the chain.
//!
//! [`ConfigurationSource::Convention`]: crate::metadata::ConfigurationSource::Convention

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::builder::{
    BuildResult, InternalEntityTypeBuilder, InternalKeyBuilder, InternalModelBuilder, InternalPropertyBuilder,
    InternalRelationshipBuilder, ModelBuilderError,
};
use crate::metadata::{ForeignKey, Navigation};

/// Handler for model building notifications
///
/// Every method defaults to passing the element through unchanged.
pub trait ModelConvention {
    fn on_entity_type_added(
        &self,
        _mb: &mut InternalModelBuilder,
        entity_type: InternalEntityTypeBuilder,
    ) -> BuildResult<InternalEntityTypeBuilder> {
        Ok(Some(entity_type))
    }

    fn on_key_added(&self, _mb: &mut InternalModelBuilder, key: InternalKeyBuilder) -> BuildResult<InternalKeyBuilder> {
        Ok(Some(key))
    }

    fn on_property_added(
        &self,
        _mb: &mut InternalModelBuilder,
        property: InternalPropertyBuilder,
    ) -> BuildResult<InternalPropertyBuilder> {
        Ok(Some(property))
    }

    fn on_navigation_added(
        &self,
        _mb: &mut InternalModelBuilder,
        relationship: InternalRelationshipBuilder,
        _navigation: &Navigation,
    ) -> BuildResult<InternalRelationshipBuilder> {
        Ok(Some(relationship))
    }

    fn on_foreign_key_added(
        &self,
        _mb: &mut InternalModelBuilder,
        relationship: InternalRelationshipBuilder,
    ) -> BuildResult<InternalRelationshipBuilder> {
        Ok(Some(relationship))
    }

    /// Called once the foreign key and everything that only served it are gone
    fn on_foreign_key_removed(
        &self,
        _mb: &mut InternalModelBuilder,
        _entity_type: InternalEntityTypeBuilder,
        _foreign_key: &ForeignKey,
    ) -> Result<(), ModelBuilderError> {
        Ok(())
    }
}

/// Ordered list of registered conventions
#[derive(Clone, Default)]
pub struct ConventionSet {
    conventions: Vec<Rc<dyn ModelConvention>>,
}

impl ConventionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a convention after the existing ones
    pub fn add(&mut self, convention: impl ModelConvention + 'static) -> &mut Self {
        self.conventions.push(Rc::new(convention));
        self
    }

    pub fn with(mut self, convention: impl ModelConvention + 'static) -> Self {
        self.add(convention);
        self
    }

    pub fn len(&self) -> usize {
        self.conventions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conventions.is_empty()
    }

    /// The registered conventions at this moment
    ///
    /// Dispatch iterates over this copy so conventions registered while
    /// a notification unwinds only see later notifications.
    fn snapshot(&self) -> Vec<Rc<dyn ModelConvention>> {
        self.conventions.clone()
    }
}

impl fmt::Debug for ConventionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionSet")
            .field("len", &self.conventions.len())
            .finish()
    }
}

/// Runs the registered conventions for each kind of change
pub struct ConventionDispatcher;

impl ConventionDispatcher {
    pub fn on_entity_type_added(
        mb: &mut InternalModelBuilder,
        entity_type: InternalEntityTypeBuilder,
    ) -> BuildResult<InternalEntityTypeBuilder> {
        let mut current = entity_type;
        for convention in mb.conventions().snapshot() {
            match convention.on_entity_type_added(mb, current)? {
                Some(next) if mb.model().contains_entity_type(next.id()) => current = next,
                _ => return Ok(None),
            }
        }
        trace!(entity_type = ?current.id(), "entity type conventions applied");
        Ok(Some(current))
    }

    pub fn on_key_added(mb: &mut InternalModelBuilder, key: InternalKeyBuilder) -> BuildResult<InternalKeyBuilder> {
        let mut current = key;
        for convention in mb.conventions().snapshot() {
            match convention.on_key_added(mb, current)? {
                Some(next) if mb.model().try_key(next.id()).is_some() => current = next,
                _ => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    pub fn on_property_added(
        mb: &mut InternalModelBuilder,
        property: InternalPropertyBuilder,
    ) -> BuildResult<InternalPropertyBuilder> {
        let mut current = property;
        for convention in mb.conventions().snapshot() {
            match convention.on_property_added(mb, current)? {
                Some(next) if mb.model().contains_property(next.id()) => current = next,
                _ => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    pub fn on_navigation_added(
        mb: &mut InternalModelBuilder,
        relationship: InternalRelationshipBuilder,
        navigation: &Navigation,
    ) -> BuildResult<InternalRelationshipBuilder> {
        let mut current = relationship;
        for convention in mb.conventions().snapshot() {
            match convention.on_navigation_added(mb, current, navigation)? {
                Some(next) if next.is_attached(mb) => current = next,
                _ => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    pub fn on_foreign_key_added(
        mb: &mut InternalModelBuilder,
        relationship: InternalRelationshipBuilder,
    ) -> BuildResult<InternalRelationshipBuilder> {
        let mut current = relationship;
        for convention in mb.conventions().snapshot() {
            match convention.on_foreign_key_added(mb, current)? {
                Some(next) if next.is_attached(mb) => current = next,
                _ => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    pub fn on_foreign_key_removed(
        mb: &mut InternalModelBuilder,
        entity_type: InternalEntityTypeBuilder,
        foreign_key: &ForeignKey,
    ) -> Result<(), ModelBuilderError> {
        for convention in mb.conventions().snapshot() {
            if !mb.model().contains_entity_type(entity_type.id()) {
                break;
            }
            convention.on_foreign_key_removed(mb, entity_type, foreign_key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::metadata::{ConfigurationSource, PropertyType};

    #[derive(Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<String>>>,
        label: &'static str,
    }

    impl ModelConvention for Recorder {
        fn on_property_added(
            &self,
            mb: &mut InternalModelBuilder,
            property: InternalPropertyBuilder,
        ) -> BuildResult<InternalPropertyBuilder> {
            let name = property.metadata(mb).name().to_string();
            self.events.borrow_mut().push(format!("{}:{name}", self.label));
            Ok(Some(property))
        }
    }

    struct Veto;

    impl ModelConvention for Veto {
        fn on_property_added(
            &self,
            _mb: &mut InternalModelBuilder,
            _property: InternalPropertyBuilder,
        ) -> BuildResult<InternalPropertyBuilder> {
            Ok(None)
        }
    }

    #[test]
    fn test_conventions_run_in_registration_order() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let conventions = ConventionSet::new()
            .with(Recorder { events: events.clone(), label: "first" })
            .with(Recorder { events: events.clone(), label: "second" });
        let mut mb = InternalModelBuilder::new().with_conventions(conventions);

        let post = mb.entity("Post", ConfigurationSource::Explicit).unwrap().unwrap();
        post.property(&mut mb, "Title", PropertyType::string(), ConfigurationSource::Explicit)
            .unwrap()
            .unwrap();

        assert_eq!(*events.borrow(), vec!["first:Title".to_string(), "second:Title".to_string()]);
    }

    #[test]
    fn test_returning_none_stops_the_chain() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let conventions = ConventionSet::new()
            .with(Veto)
            .with(Recorder { events: events.clone(), label: "after" });
        let mut mb = InternalModelBuilder::new().with_conventions(conventions);

        let post = mb.entity("Post", ConfigurationSource::Explicit).unwrap().unwrap();
        let result = post
            .property(&mut mb, "Title", PropertyType::string(), ConfigurationSource::Explicit)
            .unwrap();

        assert!(result.is_none());
        assert!(events.borrow().is_empty());
        // The property itself stays; only the notification chain stopped
        assert!(mb.model().find_property(post.id(), "Title").is_some());
    }
}
