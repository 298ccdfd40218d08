//! Convention dispatch tests

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use entity_metadata_builder::{
    BuildResult, ConfigurationSource::{Convention, Explicit},
    ConventionSet, ForeignKeyId, InternalEntityTypeBuilder, InternalModelBuilder, InternalPropertyBuilder,
    ModelConvention, PropertyType,
    metadata::ForeignKey,
    ModelBuilderError,
};

/// Makes a property named `Id` the primary key
struct KeyDiscovery;

impl ModelConvention for KeyDiscovery {
    fn on_property_added(
        &self,
        mb: &mut InternalModelBuilder,
        property: InternalPropertyBuilder,
    ) -> BuildResult<InternalPropertyBuilder> {
        let (name, declaring) = {
            let metadata = property.metadata(mb);
            (metadata.name().to_string(), metadata.declaring_entity_type())
        };
        if name == "Id" && mb.model().find_primary_key(declaring).is_none() {
            let entity_type = mb.entity_for(declaring, Convention);
            entity_type.primary_key_for(mb, vec![property.id()], Convention)?;
        }
        Ok(Some(property))
    }
}

/// Gives every new entity type a shadow `Id`
struct ShadowId;

impl ModelConvention for ShadowId {
    fn on_entity_type_added(
        &self,
        mb: &mut InternalModelBuilder,
        entity_type: InternalEntityTypeBuilder,
    ) -> BuildResult<InternalEntityTypeBuilder> {
        entity_type.property(mb, "Id", PropertyType::int(), Convention)?;
        Ok(Some(entity_type))
    }
}

/// Records what is left of a foreign key when its removal is announced
#[derive(Default)]
struct RemovalRecorder {
    removed: Rc<RefCell<Vec<(ForeignKeyId, bool, usize)>>>,
}

impl ModelConvention for RemovalRecorder {
    fn on_foreign_key_removed(
        &self,
        mb: &mut InternalModelBuilder,
        _entity_type: InternalEntityTypeBuilder,
        foreign_key: &ForeignKey,
    ) -> Result<(), ModelBuilderError> {
        let model = mb.model();
        let remaining = foreign_key
            .properties()
            .iter()
            .filter(|p| model.contains_property(**p))
            .count();
        self.removed
            .borrow_mut()
            .push((foreign_key.id(), model.contains_foreign_key(foreign_key.id()), remaining));
        Ok(())
    }
}

mod reentrant_convention_tests {
    use super::*;

    #[test]
    fn test_property_convention_sets_primary_key() -> Result<()> {
        let mut mb = InternalModelBuilder::new().with_conventions(ConventionSet::new().with(KeyDiscovery));
        let blog = mb.entity("Blog", Explicit)?.context("Blog")?;
        blog.property(&mut mb, "Id", PropertyType::int(), Explicit)?.context("Id")?;

        let description = mb.describe();
        let blog_description = description.entity_type("Blog").context("Blog")?;
        assert_eq!(blog_description.primary_key, Some(vec!["Id".to_string()]));
        Ok(())
    }

    #[test]
    fn test_nested_notifications_run_all_conventions() -> Result<()> {
        let conventions = ConventionSet::new().with(ShadowId).with(KeyDiscovery);
        let mut mb = InternalModelBuilder::new().with_conventions(conventions);

        let tag = mb.entity("Tag", Convention)?.context("Tag")?;

        let model = mb.model();
        let key = model.find_primary_key(tag.id()).context("primary key")?;
        assert_eq!(model.property_names(model.key(key).properties()), vec!["Id".to_string()]);
        assert!(model.property(model.key(key).properties()[0]).is_shadow());
        Ok(())
    }

    #[test]
    fn test_explicit_primary_key_replaces_convention_key() -> Result<()> {
        let mut mb = InternalModelBuilder::new().with_conventions(ConventionSet::new().with(KeyDiscovery));
        let blog = mb.entity("Blog", Explicit)?.context("Blog")?;
        blog.property(&mut mb, "Id", PropertyType::int(), Convention)?.context("Id")?;
        blog.property(&mut mb, "Code", PropertyType::int(), Explicit)?.context("Code")?;

        blog.primary_key(&mut mb, &["Code"], Explicit)?.context("primary key")?;

        let description = mb.describe();
        let blog_description = description.entity_type("Blog").context("Blog")?;
        assert_eq!(blog_description.primary_key, Some(vec!["Code".to_string()]));
        assert_eq!(blog_description.keys, vec![vec!["Code".to_string()]]);
        Ok(())
    }
}

mod removal_notification_tests {
    use super::*;

    #[test]
    fn test_removal_is_announced_after_cleanup() -> Result<()> {
        let recorder = RemovalRecorder::default();
        let removed = recorder.removed.clone();
        let mut mb = InternalModelBuilder::new().with_conventions(ConventionSet::new().with(KeyDiscovery).with(recorder));

        let blog = mb.entity("Blog", Explicit)?.context("Blog")?;
        blog.property(&mut mb, "Id", PropertyType::int(), Explicit)?.context("Id")?;
        let post = mb.entity("Post", Explicit)?.context("Post")?;
        let relationship = post
            .relationship(&mut mb, blog.id(), post.id(), Some("Blog"), None, Convention, None, true)?
            .context("relationship")?;
        removed.borrow_mut().clear();

        post.remove_relationship(&mut mb, relationship.id(), Explicit)?
            .context("removed")?;

        assert_eq!(*removed.borrow(), vec![(relationship.id(), false, 0)]);
        assert!(mb.model().find_property(post.id(), "BlogId").is_none());
        Ok(())
    }
}
