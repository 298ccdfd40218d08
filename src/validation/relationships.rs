//! Relationship validation functionality
//!
//! Validates that every foreign key has visible dependent properties, a
//! principal key that exists on the principal type, matching arity and
//! compatible property types.

use super::ModelValidationError;
use super::entity_types::check_property_list;
use crate::metadata::{ForeignKey, Model};

/// Relationship validator
#[derive(Debug, Default)]
pub struct RelationshipValidator;

impl RelationshipValidator {
    /// Create a new relationship validator
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, model: &Model) -> Vec<ModelValidationError> {
        model
            .all_foreign_keys()
            .flat_map(|fk| self.validate_foreign_key(model, fk))
            .collect()
    }

    pub fn validate_foreign_key(&self, model: &Model, foreign_key: &ForeignKey) -> Vec<ModelValidationError> {
        let Some(dependent) = model.try_entity_type(foreign_key.declaring_entity_type()) else {
            return Vec::new();
        };
        let mut errors = check_property_list(model, dependent, "foreign key", foreign_key.properties());
        if !errors.is_empty() {
            return errors;
        }

        let principal = model
            .try_entity_type(foreign_key.principal_entity_type())
            .map(|e| e.name().to_string())
            .unwrap_or_default();
        let properties = model.property_names(foreign_key.properties());
        let principal_key = model.try_key(foreign_key.principal_key()).filter(|k| {
            model.is_same_or_derived_from(foreign_key.principal_entity_type(), k.declaring_entity_type())
        });
        let Some(principal_key) = principal_key else {
            errors.push(ModelValidationError::MissingPrincipalKey {
                dependent: dependent.name().to_string(),
                principal,
                properties,
            });
            return errors;
        };

        let expected = principal_key.properties().len();
        let actual = foreign_key.properties().len();
        if expected != actual {
            errors.push(ModelValidationError::ForeignKeyArity {
                dependent: dependent.name().to_string(),
                principal,
                properties,
                expected,
                actual,
            });
            return errors;
        }

        for (property, principal_property) in foreign_key.properties().iter().zip(principal_key.properties()) {
            let (Some(property), Some(principal_property)) =
                (model.try_property(*property), model.try_property(*principal_property))
            else {
                continue;
            };
            if !principal_property
                .property_type()
                .is_compatible_with(property.property_type())
            {
                errors.push(ModelValidationError::IncompatibleForeignKeyProperty {
                    dependent: dependent.name().to_string(),
                    property: property.name().to_string(),
                    principal: principal.clone(),
                    principal_property: principal_property.name().to_string(),
                });
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityTypeId, KeyId, PropertyType};

    fn blog_and_post() -> (Model, EntityTypeId, KeyId, EntityTypeId) {
        let mut model = Model::new();
        let blog = model.add_entity_type("Blog", None);
        let id = model.add_property(blog, "Id", PropertyType::int(), false);
        let key = model.add_key(blog, vec![id]);
        model.set_primary_key(blog, Some(key));
        let post = model.add_entity_type("Post", None);
        (model, blog, key, post)
    }

    #[test]
    fn test_matching_foreign_key_is_valid() {
        let (mut model, blog, key, post) = blog_and_post();
        let blog_id = model.add_property(post, "BlogId", PropertyType::int(), false);
        model.add_foreign_key(post, vec![blog_id], key, blog);

        assert!(RelationshipValidator::new().validate(&model).is_empty());
    }

    #[test]
    fn test_incompatible_property_type_is_reported() {
        let (mut model, blog, key, post) = blog_and_post();
        let blog_id = model.add_property(post, "BlogId", PropertyType::string(), false);
        model.add_foreign_key(post, vec![blog_id], key, blog);

        let errors = RelationshipValidator::new().validate(&model);
        assert_eq!(
            errors,
            vec![ModelValidationError::IncompatibleForeignKeyProperty {
                dependent: "Post".to_string(),
                property: "BlogId".to_string(),
                principal: "Blog".to_string(),
                principal_property: "Id".to_string(),
            }]
        );
    }

    #[test]
    fn test_arity_mismatch_is_reported() {
        let (mut model, blog, key, post) = blog_and_post();
        let first = model.add_property(post, "BlogId", PropertyType::int(), false);
        let second = model.add_property(post, "BlogRevision", PropertyType::int(), false);
        model.add_foreign_key(post, vec![first, second], key, blog);

        let errors = RelationshipValidator::new().validate(&model);
        assert!(matches!(
            errors.as_slice(),
            [ModelValidationError::ForeignKeyArity { expected: 1, actual: 2, .. }]
        ));
    }

    #[test]
    fn test_key_of_unrelated_type_is_missing_principal_key() {
        let (mut model, _blog, key, post) = blog_and_post();
        let tag = model.add_entity_type("Tag", None);
        let blog_id = model.add_property(post, "BlogId", PropertyType::int(), false);
        model.add_foreign_key(post, vec![blog_id], key, tag);

        let errors = RelationshipValidator::new().validate(&model);
        assert!(matches!(
            errors.as_slice(),
            [ModelValidationError::MissingPrincipalKey { principal, .. }] if principal == "Tag"
        ));
    }
}
