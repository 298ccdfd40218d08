//! Metadata graph
//!
//! Plain data holders for entity types and the items they own. Builders in
//! [`crate::builder`] decide what may change; this layer only stores it.

pub mod configuration_source;
pub mod description;
pub mod entity_type;
pub mod foreign_key;
pub mod key;
pub mod model;
pub mod property;
pub mod types;

pub use configuration_source::{ConfigurationSource, max_source, pinned_above};
pub use description::{
    EntityTypeDescription, ForeignKeyDescription, ModelDescription, PropertyDescription,
};
pub use entity_type::{EntityType, EntityTypeId};
pub use foreign_key::{ForeignKey, ForeignKeyId, Navigation};
pub use key::{Index, IndexId, Key, KeyId};
pub use model::Model;
pub use property::{Property, PropertyId};
pub use types::{NativeMember, NativeType, PropertyType, ValueGenerated};
