//! Model building
//!
//! Conflict-resolving builders over the metadata graph. Every operation takes
//! the [`ConfigurationSource`](crate::metadata::ConfigurationSource) it acts on
//! behalf of and only changes what that source is allowed to change.

pub mod config;
pub mod entity_type_builder;
pub mod error;
pub mod metadata_dictionary;
pub mod model_builder;
pub mod property_builder;
pub mod relationship_builder;
pub mod snapshot;

pub use config::{ModelBuilderConfig, ModelBuilderConfigBuilder, PrimaryKeyReplacement};
pub use entity_type_builder::{EntityTypeBuilderState, InternalEntityTypeBuilder, NewRelationship};
pub use error::{BuildResult, ModelBuilderError};
pub use metadata_dictionary::MetadataDictionary;
pub use model_builder::InternalModelBuilder;
pub use property_builder::{InternalIndexBuilder, InternalKeyBuilder, InternalPropertyBuilder, PropertyBuilderState};
pub use relationship_builder::{InternalRelationshipBuilder, RelationshipBuilderState};
pub use snapshot::{PropertySpec, RelationshipSnapshot};
