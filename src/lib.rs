//! Entity Metadata Builder - conflict-resolving construction of entity/relationship models
//!
//! Provides:
//! - The metadata graph (entity types, properties, keys, foreign keys, indexes)
//! - Builders that apply changes according to their configuration source
//! - Convention notifications fired after structural changes
//! - Validation of the finished model

pub mod builder;
pub mod conventions;
pub mod metadata;
pub mod validation;

// Re-export commonly used types
pub use builder::{
    BuildResult, InternalEntityTypeBuilder, InternalIndexBuilder, InternalKeyBuilder, InternalModelBuilder,
    InternalPropertyBuilder, InternalRelationshipBuilder, ModelBuilderConfig, ModelBuilderError, NewRelationship,
    PrimaryKeyReplacement, RelationshipSnapshot,
};
pub use conventions::{ConventionDispatcher, ConventionSet, ModelConvention};
pub use metadata::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, KeyId, Model, ModelDescription, NativeType, Navigation,
    PropertyId, PropertyType,
};
pub use validation::{ModelValidationError, ModelValidationResult, ModelValidator};
