//! Model validation tests

use anyhow::{Context, Result};
use entity_metadata_builder::{
    ConfigurationSource::{Convention, Explicit},
    InternalModelBuilder, ModelValidator, PropertyType,
};

mod model_validation_tests {
    use super::*;

    #[test]
    fn test_built_model_is_valid() -> Result<()> {
        let mut mb = InternalModelBuilder::new();
        let blog = mb.entity("Blog", Explicit)?.context("Blog")?;
        blog.property(&mut mb, "Id", PropertyType::int(), Explicit)?.context("Id")?;
        blog.primary_key(&mut mb, &["Id"], Explicit)?.context("key")?;
        let post = mb.entity("Post", Explicit)?.context("Post")?;
        post.property(&mut mb, "Id", PropertyType::int(), Explicit)?.context("Post.Id")?;
        post.primary_key(&mut mb, &["Id"], Explicit)?.context("Post key")?;
        post.property(&mut mb, "Title", PropertyType::string(), Explicit)?.context("Title")?;
        post.index(&mut mb, &["Title"], Convention)?.context("index")?;
        post.relationship(&mut mb, blog.id(), post.id(), Some("Blog"), Some("Posts"), Convention, None, true)?
            .context("relationship")?;

        let result = ModelValidator::new().validate(mb.model());
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.into_result().is_ok());
        Ok(())
    }
}
