//! Relationship builder tests

use anyhow::{Context, Result};
use entity_metadata_builder::{
    ConfigurationSource::{self, Convention, Explicit},
    InternalEntityTypeBuilder, InternalModelBuilder, ModelBuilderError, NewRelationship, PropertyType,
};

fn entity_with_key(
    mb: &mut InternalModelBuilder,
    name: &str,
    source: ConfigurationSource,
) -> Result<InternalEntityTypeBuilder> {
    let entity_type = mb.entity(name, source)?.context("entity type was not added")?;
    entity_type
        .property(mb, "Id", PropertyType::int(), source)?
        .context("key property was not added")?;
    entity_type
        .primary_key(mb, &["Id"], source)?
        .context("primary key was not set")?;
    Ok(entity_type)
}

/// Blog{Id} and Post{Id, BlogId}
fn blog_and_post(mb: &mut InternalModelBuilder) -> Result<(InternalEntityTypeBuilder, InternalEntityTypeBuilder)> {
    let blog = entity_with_key(mb, "Blog", Explicit)?;
    let post = entity_with_key(mb, "Post", Explicit)?;
    post.property(mb, "BlogId", PropertyType::int(), Explicit)?
        .context("BlogId")?;
    Ok((blog, post))
}

mod foreign_key_tests {
    use super::*;

    #[test]
    fn test_foreign_key_by_convention_uses_primary_key() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (blog, post) = blog_and_post(&mut mb)?;

        let relationship = post.foreign_key(&mut mb, "Blog", &["BlogId"], Convention)?.context("FK")?;

        let model = mb.model();
        let fk = relationship.metadata(&mb);
        assert_eq!(fk.principal_entity_type(), blog.id());
        assert_eq!(fk.declaring_entity_type(), post.id());
        assert_eq!(model.property_names(fk.properties()), vec!["BlogId".to_string()]);
        assert_eq!(
            model.property_names(model.key(fk.principal_key()).properties()),
            vec!["Id".to_string()]
        );
        assert!(fk.navigations().is_empty());
        // The temporary shadow property used while inferring is gone
        assert_eq!(model.entity_type(post.id()).declared_properties().len(), 2);
        Ok(())
    }

    #[test]
    fn test_relationship_synthesizes_shadow_foreign_key() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let blog = entity_with_key(&mut mb, "Blog", Explicit)?;
        let post = mb.entity("Post", Explicit)?.context("Post")?;

        let relationship = post
            .relationship(&mut mb, blog.id(), post.id(), Some("Owner"), Some("Posts"), Convention, None, true)?
            .context("relationship")?;

        let description = mb.describe();
        let post_description = description.entity_type("Post").context("Post")?;
        let owner_id = post_description.property("OwnerId").context("OwnerId")?;
        assert!(owner_id.is_shadow);
        assert_eq!(owner_id.property_type, "int?");
        assert_eq!(relationship.metadata(&mb).dependent_to_principal(), Some("Owner"));
        assert_eq!(relationship.metadata(&mb).principal_to_dependent(), Some("Posts"));
        Ok(())
    }

    #[test]
    fn test_incompatible_explicit_properties_are_an_error() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (blog, post) = blog_and_post(&mut mb)?;
        post.property(&mut mb, "BlogName", PropertyType::string(), Explicit)?
            .context("BlogName")?;
        let blog_id = mb.model().find_property(blog.id(), "Id").context("Id")?;
        let blog_name = mb.model().find_property(post.id(), "BlogName").context("BlogName")?;

        let request = NewRelationship {
            foreign_key_properties: Some(vec![blog_name]),
            principal_properties: Some(vec![blog_id]),
            ..NewRelationship::between(blog.id(), post.id())
        };
        let err = post.relationship_from_request(&mut mb, request, Explicit).unwrap_err();
        assert!(matches!(err, ModelBuilderError::IncompatibleForeignKeyProperties { .. }));
        Ok(())
    }
}

mod navigation_tests {
    use super::*;

    #[test]
    fn test_convention_cannot_rename_explicit_navigation() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (blog, post) = blog_and_post(&mut mb)?;
        let relationship = post
            .relationship(&mut mb, blog.id(), post.id(), Some("Blog"), None, Explicit, None, true)?
            .context("relationship")?;

        let renamed = relationship.navigation_to_principal(&mut mb, Some("MyBlog"), Convention, None)?;

        assert!(renamed.is_none());
        assert!(mb.model().find_navigation(post.id(), "Blog").is_some());
        assert!(mb.model().find_navigation(post.id(), "MyBlog").is_none());
        Ok(())
    }

    #[test]
    fn test_navigation_name_conflicts_with_property() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (blog, post) = blog_and_post(&mut mb)?;
        let relationship = post
            .relationship(&mut mb, blog.id(), post.id(), None, None, Convention, None, true)?
            .context("relationship")?;

        let err = relationship
            .navigation_to_principal(&mut mb, Some("BlogId"), Explicit, None)
            .unwrap_err();
        assert!(matches!(err, ModelBuilderError::NavigationConflict { .. }));
        Ok(())
    }

    #[test]
    fn test_ignoring_last_navigation_removes_relationship_and_prunes() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let blog = entity_with_key(&mut mb, "Blog", Explicit)?;
        let tag = mb.entity("Tag", Convention)?.context("Tag")?;
        blog.relationship(&mut mb, blog.id(), tag.id(), None, Some("Tags"), Convention, None, true)?
            .context("relationship")?;
        assert_eq!(mb.model().foreign_keys(tag.id()).len(), 1);

        assert!(blog.ignore(&mut mb, "Tags", Explicit)?);

        assert!(mb.find_entity("Tag").is_none());
        assert_eq!(mb.model().all_foreign_keys().count(), 0);
        assert_eq!(blog.is_ignored(&mb, "Tags"), Some(Explicit));
        Ok(())
    }

    #[test]
    fn test_existing_dependent_navigation_is_reused() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let blog = entity_with_key(&mut mb, "Blog", Explicit)?;
        let post = entity_with_key(&mut mb, "Post", Explicit)?;
        post.relationship(&mut mb, blog.id(), post.id(), None, Some("Posts"), Convention, None, true)?
            .context("relationship")?;

        let relationship = post
            .relationship(&mut mb, blog.id(), post.id(), Some("Blog"), Some("Posts"), Convention, None, true)?
            .context("reused relationship")?;

        assert_eq!(mb.model().all_foreign_keys().count(), 1);
        let fk = relationship.metadata(&mb);
        assert_eq!(fk.dependent_to_principal(), Some("Blog"));
        assert_eq!(fk.principal_to_dependent(), Some("Posts"));
        Ok(())
    }

    #[test]
    fn test_strict_prefer_existing_folds_into_existing_navigation() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let blog = entity_with_key(&mut mb, "Blog", Explicit)?;
        let post = entity_with_key(&mut mb, "Post", Explicit)?;
        let existing = post
            .relationship(&mut mb, blog.id(), post.id(), Some("Blog"), None, Convention, None, true)?
            .context("relationship with navigation")?;
        let unnamed = post
            .relationship(&mut mb, blog.id(), post.id(), None, None, Convention, None, true)?
            .context("relationship without navigation")?;
        assert_eq!(mb.model().foreign_keys(post.id()).len(), 2);

        let folded = unnamed
            .navigation_to_principal(&mut mb, Some("Blog"), Convention, Some(true))?
            .context("folded")?;

        assert_eq!(folded.id(), existing.id());
        assert!(!unnamed.is_attached(&mb));
        assert_eq!(mb.model().foreign_keys(post.id()).len(), 1);
        assert!(mb.model().find_property(post.id(), "BlogId1").is_none());
        assert_eq!(folded.metadata(&mb).dependent_to_principal(), Some("Blog"));
        Ok(())
    }
}

mod invert_tests {
    use super::*;

    #[test]
    fn test_invert_one_to_many_returns_none() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (blog, post) = blog_and_post(&mut mb)?;
        let relationship = post
            .relationship(&mut mb, blog.id(), post.id(), Some("Blog"), Some("Posts"), Convention, Some(false), true)?
            .context("relationship")?;

        assert!(relationship.invert(&mut mb, Explicit)?.is_none());
        assert!(relationship.invert(&mut mb, Convention)?.is_none());
        assert_eq!(relationship.dependent_entity_type(&mb), post.id());
        Ok(())
    }

    #[test]
    fn test_invert_one_to_one_swaps_ends() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let blog = entity_with_key(&mut mb, "Blog", Explicit)?;
        let header = entity_with_key(&mut mb, "BlogHeader", Explicit)?;
        let relationship = header
            .relationship(&mut mb, blog.id(), header.id(), Some("Blog"), Some("Header"), Convention, Some(true), true)?
            .context("relationship")?;

        let inverted = relationship.invert(&mut mb, Convention)?.context("inverted")?;

        let fk = inverted.metadata(&mb);
        assert_eq!(fk.declaring_entity_type(), blog.id());
        assert_eq!(fk.principal_entity_type(), header.id());
        assert_eq!(fk.dependent_to_principal(), Some("Header"));
        assert_eq!(fk.principal_to_dependent(), Some("Blog"));
        assert!(fk.is_unique());
        Ok(())
    }

    #[test]
    fn test_invert_with_pinned_foreign_key_is_an_error_when_explicit() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (blog, post) = blog_and_post(&mut mb)?;
        let relationship = post
            .relationship(&mut mb, blog.id(), post.id(), None, None, Explicit, Some(true), true)?
            .context("relationship")?;
        let relationship = relationship.foreign_key(&mut mb, &["BlogId"], Explicit)?.context("FK")?;

        let err = relationship.invert(&mut mb, Explicit).unwrap_err();
        assert!(matches!(err, ModelBuilderError::RelationshipCannotBeInverted { .. }));
        assert!(relationship.is_attached(&mb));
        Ok(())
    }
}

mod snapshot_tests {
    use super::*;

    #[test]
    fn test_detach_then_attach_restores_relationship() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (blog, post) = blog_and_post(&mut mb)?;
        let relationship = post
            .relationship(&mut mb, blog.id(), post.id(), Some("Blog"), Some("Posts"), Explicit, None, true)?
            .context("relationship")?;
        let relationship = relationship.required(&mut mb, Some(true), Explicit)?.context("required")?;
        let before = relationship.metadata(&mb).clone();

        let snapshot = post
            .detach_relationship(&mut mb, relationship.id(), Explicit)?
            .context("detached")?;
        assert!(!relationship.is_attached(&mb));

        let attached = snapshot.attach(&mut mb)?.context("attached")?;
        let after = attached.metadata(&mb);
        assert_eq!(after.declaring_entity_type(), before.declaring_entity_type());
        assert_eq!(after.principal_entity_type(), before.principal_entity_type());
        assert_eq!(after.dependent_to_principal(), before.dependent_to_principal());
        assert_eq!(after.principal_to_dependent(), before.principal_to_dependent());
        assert_eq!(after.is_unique(), before.is_unique());
        assert!(mb.model().is_foreign_key_required(attached.id()));
        Ok(())
    }

    #[test]
    fn test_optional_on_non_nullable_foreign_key_is_rejected() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (_, post) = blog_and_post(&mut mb)?;
        let relationship = post.foreign_key(&mut mb, "Blog", &["BlogId"], Convention)?.context("FK")?;
        let before = mb.describe();

        // BlogId is an int and cannot become optional
        let result = relationship.required(&mut mb, Some(false), Convention)?;

        assert!(result.is_none());
        assert_eq!(before, mb.describe());
        assert_eq!(mb.model().foreign_keys(post.id()).len(), 1);
        Ok(())
    }

    #[test]
    fn test_failed_replacement_restores_relationship() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (blog, post) = blog_and_post(&mut mb)?;
        post.property(&mut mb, "BlogName", PropertyType::string(), Explicit)?
            .context("BlogName")?;
        let relationship = post
            .relationship(&mut mb, blog.id(), post.id(), Some("Blog"), None, Convention, None, true)?
            .context("relationship")?;
        let relationship = relationship
            .principal_key(&mut mb, &["Id"], Explicit)?
            .context("principal key")?;
        let before = mb.describe();

        // The pinned int key cannot be referenced by a string property
        let err = relationship.foreign_key(&mut mb, &["BlogName"], Explicit).unwrap_err();

        assert!(matches!(err, ModelBuilderError::IncompatibleForeignKeyProperties { .. }));
        assert_eq!(before, mb.describe());
        assert_eq!(mb.model().foreign_keys(post.id()).len(), 1);
        Ok(())
    }

    #[test]
    fn test_replaced_handle_returns_none() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (blog, post) = blog_and_post(&mut mb)?;
        let relationship = post
            .relationship(&mut mb, blog.id(), post.id(), Some("Blog"), None, Convention, None, true)?
            .context("relationship")?;

        let replaced = relationship
            .unique(&mut mb, Some(true), ConfigurationSource::DataAnnotation)?
            .context("unique")?;
        assert!(!relationship.is_attached(&mb));
        assert!(replaced.is_attached(&mb));
        let before = mb.describe();

        assert!(relationship.required(&mut mb, Some(true), Convention)?.is_none());
        assert!(relationship.unique(&mut mb, Some(false), Explicit)?.is_none());
        assert!(relationship.invert(&mut mb, Convention)?.is_none());
        assert!(relationship.navigation_to_principal(&mut mb, Some("Owner"), Explicit, None)?.is_none());
        assert!(relationship.foreign_key(&mut mb, &["BlogId"], Explicit)?.is_none());
        assert!(relationship.principal_key(&mut mb, &["Id"], Explicit)?.is_none());
        assert!(relationship.try_metadata(&mb).is_none());
        assert_eq!(before, mb.describe());
        Ok(())
    }
}
