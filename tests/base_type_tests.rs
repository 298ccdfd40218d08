//! Base type change tests

use anyhow::{Context, Result};
use entity_metadata_builder::{
    ConfigurationSource::{Convention, DataAnnotation, Explicit},
    InternalEntityTypeBuilder, InternalModelBuilder, ModelBuilderError, ModelValidator, PropertyType,
};

/// Blog{Id}, and Content and Post each with {Id, BlogId} and a foreign key to Blog
fn blog_content_post(
    mb: &mut InternalModelBuilder,
) -> Result<(InternalEntityTypeBuilder, InternalEntityTypeBuilder, InternalEntityTypeBuilder)> {
    let blog = mb.entity("Blog", Explicit)?.context("Blog")?;
    blog.property(mb, "Id", PropertyType::int(), Explicit)?.context("Blog.Id")?;
    blog.primary_key(mb, &["Id"], Explicit)?.context("Blog key")?;

    let mut dependents = Vec::new();
    for name in ["Content", "Post"] {
        let entity_type = mb.entity(name, Explicit)?.context("dependent")?;
        entity_type.property(mb, "Id", PropertyType::int(), Explicit)?.context("Id")?;
        entity_type.primary_key(mb, &["Id"], Explicit)?.context("key")?;
        entity_type.property(mb, "BlogId", PropertyType::int(), Explicit)?.context("BlogId")?;
        entity_type
            .foreign_key(mb, "Blog", &["BlogId"], Convention)?
            .context("foreign key")?;
        dependents.push(entity_type);
    }
    Ok((blog, dependents[0], dependents[1]))
}

mod base_type_change_tests {
    use super::*;

    #[test]
    fn test_base_type_removes_duplicated_members_and_redundant_foreign_key() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (blog, content, post) = blog_content_post(&mut mb)?;

        post.base_type(&mut mb, Some(content.id()), Explicit)?.context("base type")?;

        let model = mb.model();
        let post_type = model.entity_type(post.id());
        assert_eq!(post_type.base_type(), Some(content.id()));
        assert!(post_type.declared_properties().is_empty());
        assert!(post_type.declared_keys().is_empty());
        assert!(post_type.declared_foreign_keys().is_empty());

        let blog_id = model.find_property(post.id(), "BlogId").context("inherited BlogId")?;
        assert_eq!(model.property(blog_id).declaring_entity_type(), content.id());
        assert_eq!(model.referencing_foreign_keys(blog.id()).len(), 1);
        assert!(ModelValidator::new().validate(model).is_valid());
        Ok(())
    }

    #[test]
    fn test_base_type_removes_relationship_with_same_navigation() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let blog = mb.entity("Blog", Explicit)?.context("Blog")?;
        blog.property(&mut mb, "Id", PropertyType::int(), Explicit)?.context("Blog.Id")?;
        blog.primary_key(&mut mb, &["Id"], Explicit)?.context("Blog key")?;
        let mut dependents = Vec::new();
        for name in ["Content", "Post"] {
            let entity_type = mb.entity(name, Explicit)?.context("dependent")?;
            entity_type.property(&mut mb, "Id", PropertyType::int(), Explicit)?.context("Id")?;
            entity_type.primary_key(&mut mb, &["Id"], Explicit)?.context("key")?;
            entity_type
                .relationship(&mut mb, blog.id(), entity_type.id(), Some("Blog"), None, Convention, None, true)?
                .context("relationship")?;
            dependents.push(entity_type);
        }
        let (content, post) = (dependents[0], dependents[1]);

        post.base_type(&mut mb, Some(content.id()), Explicit)?.context("base type")?;

        let model = mb.model();
        let post_type = model.entity_type(post.id());
        assert!(post_type.declared_foreign_keys().is_empty());
        assert!(post_type.declared_properties().is_empty());
        let navigation = model.find_navigation(post.id(), "Blog").context("inherited navigation")?;
        assert_eq!(navigation.declaring_entity_type, content.id());
        assert_eq!(model.referencing_foreign_keys(blog.id()).len(), 1);
        Ok(())
    }

    #[test]
    fn test_blocked_base_type_change_leaves_model_untouched() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (_, content, post) = blog_content_post(&mut mb)?;
        let before = mb.describe();

        // Post.Id was configured explicitly and cannot be removed at a lower source
        let result = post.base_type(&mut mb, Some(content.id()), DataAnnotation)?;

        assert!(result.is_none());
        assert_eq!(before, mb.describe());
        Ok(())
    }

    #[test]
    fn test_circular_base_type_is_an_error() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (_, content, post) = blog_content_post(&mut mb)?;
        post.base_type(&mut mb, Some(content.id()), Explicit)?.context("base type")?;

        let err = content.base_type(&mut mb, Some(post.id()), Explicit).unwrap_err();
        assert!(matches!(err, ModelBuilderError::CircularBaseType { .. }));
        assert!(content.base_type(&mut mb, Some(post.id()), Convention)?.is_none());
        Ok(())
    }

    #[test]
    fn test_explicit_base_type_survives_convention() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let (_, content, post) = blog_content_post(&mut mb)?;
        post.base_type(&mut mb, Some(content.id()), Explicit)?.context("base type")?;

        assert!(post.base_type(&mut mb, None, Convention)?.is_none());
        assert_eq!(mb.model().entity_type(post.id()).base_type(), Some(content.id()));

        post.base_type(&mut mb, None, Explicit)?.context("cleared")?;
        assert_eq!(mb.model().entity_type(post.id()).base_type(), None);
        Ok(())
    }

    #[test]
    fn test_base_type_by_name_creates_base() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let post = mb.entity("Post", Explicit)?.context("Post")?;

        post.base_type_by_name(&mut mb, Some("Content"), DataAnnotation)?
            .context("base type")?;

        let content = mb.find_entity("Content").context("Content")?;
        assert_eq!(mb.model().entity_type(post.id()).base_type(), Some(content.id()));
        assert_eq!(
            mb.entity_state(post.id()).and_then(|s| s.base_type_source()),
            Some(DataAnnotation)
        );
        Ok(())
    }
}
