//! Error types for model building

use thiserror::Error;

/// Conflicts that cannot be resolved silently
///
/// Raised for explicit configuration that contradicts other explicit
/// configuration, and for lookups that cannot be satisfied at all. Conflicts
/// at a lower configuration source are reported as `Ok(None)` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelBuilderError {
    /// A member was ignored explicitly and cannot be added back
    #[error("The member '{member}' cannot be added to '{entity_type}' because it was explicitly ignored")]
    PropertyIgnoredExplicitly { member: String, entity_type: String },

    /// A member was added explicitly and cannot be ignored
    #[error("The member '{member}' of '{entity_type}' cannot be ignored because it was explicitly configured")]
    PropertyAddedExplicitly { member: String, entity_type: String },

    /// A navigation of the same name already exists
    #[error("The navigation '{navigation}' of '{entity_type}' conflicts with an existing relationship")]
    NavigationConflict { navigation: String, entity_type: String },

    /// The name is already used by a navigation
    #[error("The property '{property}' cannot be added to '{entity_type}' because a navigation with the same name exists")]
    ConflictingNavigation { property: String, entity_type: String },

    #[error("The relationship between '{principal}' and '{dependent}' cannot be inverted because it is not one-to-one or its ends were configured explicitly")]
    RelationshipCannotBeInverted { principal: String, dependent: String },

    #[error("The entity type '{entity_type}' is not part of the relationship between '{principal}' and '{dependent}'")]
    EntityTypeNotInRelationship {
        entity_type: String,
        principal: String,
        dependent: String,
    },

    /// A property name could not be resolved on a type without a native type
    #[error("The property '{property}' cannot be found on '{entity_type}'")]
    PropertyNotFound { property: String, entity_type: String },

    /// The native type has no member with the requested name
    #[error("The native type of '{entity_type}' has no member named '{property}'")]
    NoNativeProperty { property: String, entity_type: String },

    #[error("The properties {dependent_properties:?} of '{dependent}' are not compatible with the principal key {principal_properties:?} of '{principal}'")]
    IncompatibleForeignKeyProperties {
        dependent: String,
        dependent_properties: Vec<String>,
        principal: String,
        principal_properties: Vec<String>,
    },

    #[error("The base type of '{entity_type}' cannot be set to '{base_type}': {reason}")]
    BaseTypeConflict {
        entity_type: String,
        base_type: String,
        reason: String,
    },

    #[error("The base type of '{entity_type}' cannot be set to '{base_type}' because it would create a cycle")]
    CircularBaseType { entity_type: String, base_type: String },

    #[error("The property '{property}' of '{entity_type}' cannot be made nullable because its type '{property_type}' cannot hold a missing value")]
    PropertyCannotBeNullable {
        property: String,
        entity_type: String,
        property_type: String,
    },

    #[error("The relationship from '{dependent}' to '{principal}' cannot be made optional because none of its properties can hold a missing value")]
    CannotBeOptional { dependent: String, principal: String },

    /// The requiredness of the foreign key properties is pinned the other way
    #[error("The relationship from '{dependent}' to '{principal}' cannot be made {requiredness} because its properties were configured otherwise")]
    RequiredConflict {
        dependent: String,
        principal: String,
        requiredness: String,
    },

    #[error("The primary key of '{entity_type}' cannot be replaced because foreign key {foreign_key:?} from '{dependent}' cannot be moved to the new key")]
    PrimaryKeyReplacement {
        entity_type: String,
        dependent: String,
        foreign_key: Vec<String>,
    },

    #[error("The entity type '{entity_type}' cannot be added because it was explicitly ignored")]
    EntityTypeIgnoredExplicitly { entity_type: String },

    #[error("The entity type '{entity_type}' cannot be ignored because it was explicitly configured")]
    EntityTypeAddedExplicitly { entity_type: String },

    #[error("The entity type '{0}' is not part of the model")]
    UnknownEntityType(String),
}

/// Result of a builder operation
///
/// `Ok(None)` means the change lost to more authoritative configuration.
pub type BuildResult<T> = Result<Option<T>, ModelBuilderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_member_and_type() {
        let err = ModelBuilderError::PropertyIgnoredExplicitly {
            member: "Title".to_string(),
            entity_type: "Post".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("'Title'"));
        assert!(message.contains("'Post'"));
    }
}
