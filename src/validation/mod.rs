//! Validation functionality
//!
//! Checks a model against the structural invariants of the metadata graph:
//! - Entity type validation (primary keys, member visibility, hierarchy)
//! - Relationship validation (foreign key shape and principal keys)
//!
//! The builders keep these invariants on their own. Validation is for models
//! that were deserialized, edited by hand, or are about to be handed on.

pub mod entity_types;
pub mod relationships;

pub use entity_types::EntityTypeValidator;
pub use relationships::RelationshipValidator;

use crate::metadata::Model;

/// Invariant violation found in a model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelValidationError {
    #[error("Entity type '{entity_type}' has a primary key that is not one of its keys")]
    PrimaryKeyNotDeclared { entity_type: String },

    #[error("Entity type '{entity_type}' declares a primary key although base type '{base_type}' already has one")]
    MultiplePrimaryKeys { entity_type: String, base_type: String },

    #[error("A {kind} on entity type '{entity_type}' has no properties")]
    EmptyMember { entity_type: String, kind: &'static str },

    #[error("A {kind} on entity type '{entity_type}' uses property '{property}', which is not visible there")]
    InvisibleProperty {
        entity_type: String,
        kind: &'static str,
        property: String,
    },

    #[error("Property '{property}' on entity type '{entity_type}' is already declared by base type '{base_type}'")]
    RedeclaredProperty {
        entity_type: String,
        property: String,
        base_type: String,
    },

    #[error("The name '{name}' is used by more than one member of entity type '{entity_type}'")]
    DuplicateMemberName { entity_type: String, name: String },

    #[error("Entity type '{entity_type}' is part of a base type cycle")]
    CircularBaseType { entity_type: String },

    #[error("The foreign key {properties:?} on '{dependent}' references a key that '{principal}' does not have")]
    MissingPrincipalKey {
        dependent: String,
        principal: String,
        properties: Vec<String>,
    },

    #[error(
        "The foreign key {properties:?} on '{dependent}' has {actual} properties but the principal key on '{principal}' has {expected}"
    )]
    ForeignKeyArity {
        dependent: String,
        principal: String,
        properties: Vec<String>,
        expected: usize,
        actual: usize,
    },

    #[error(
        "Foreign key property '{dependent}.{property}' is not compatible with principal key property '{principal}.{principal_property}'"
    )]
    IncompatibleForeignKeyProperty {
        dependent: String,
        property: String,
        principal: String,
        principal_property: String,
    },
}

/// Result of model validation
#[derive(Debug, Default)]
pub struct ModelValidationResult {
    pub errors: Vec<ModelValidationError>,
}

impl ModelValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The first error, if any
    pub fn into_result(self) -> Result<(), ModelValidationError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Runs every validator over a model
#[derive(Debug, Default)]
pub struct ModelValidator;

impl ModelValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, model: &Model) -> ModelValidationResult {
        let mut errors = EntityTypeValidator::new().validate(model);
        errors.extend(RelationshipValidator::new().validate(model));
        ModelValidationResult { errors }
    }
}

/// Name of a property for reporting, even when it no longer exists
pub(crate) fn property_label(model: &Model, property: crate::metadata::PropertyId) -> String {
    model
        .try_property(property)
        .map(|p| p.name().to_string())
        .unwrap_or_else(|| format!("{property:?}"))
}

/// Whether `property` is declared on `entity_type` or one of its ancestors
pub(crate) fn is_visible(model: &Model, entity_type: crate::metadata::EntityTypeId, property: crate::metadata::PropertyId) -> bool {
    model
        .try_property(property)
        .is_some_and(|p| model.is_same_or_derived_from(entity_type, p.declaring_entity_type()))
}
