//! Entity type node

use serde::{Deserialize, Serialize};

use super::foreign_key::ForeignKeyId;
use super::key::{IndexId, KeyId};
use super::property::PropertyId;
use super::types::NativeType;

/// Identity of an entity type in the model arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityTypeId(pub(crate) usize);

/// An entity type and the items it declares
///
/// Inherited items are reached through [`Model`](super::Model) lookups that
/// walk `base_type`; the lists here only hold what this type declares itself.
#[derive(Debug, Clone)]
pub struct EntityType {
    pub(crate) id: EntityTypeId,
    pub(crate) name: String,
    pub(crate) native_type: Option<NativeType>,
    pub(crate) base_type: Option<EntityTypeId>,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) keys: Vec<KeyId>,
    pub(crate) primary_key: Option<KeyId>,
    pub(crate) foreign_keys: Vec<ForeignKeyId>,
    pub(crate) indexes: Vec<IndexId>,
}

impl EntityType {
    pub(crate) fn new(id: EntityTypeId, name: String, native_type: Option<NativeType>) -> Self {
        Self {
            id,
            name,
            native_type,
            base_type: None,
            properties: Vec::new(),
            keys: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short name used to synthesize member names ("Blog" for "App.Models.Blog")
    pub fn display_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn native_type(&self) -> Option<&NativeType> {
        self.native_type.as_ref()
    }

    pub fn has_native_type(&self) -> bool {
        self.native_type.is_some()
    }

    pub fn base_type(&self) -> Option<EntityTypeId> {
        self.base_type
    }

    pub fn declared_properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn declared_keys(&self) -> &[KeyId] {
        &self.keys
    }

    pub fn declared_primary_key(&self) -> Option<KeyId> {
        self.primary_key
    }

    pub fn declared_foreign_keys(&self) -> &[ForeignKeyId] {
        &self.foreign_keys
    }

    pub fn declared_indexes(&self) -> &[IndexId] {
        &self.indexes
    }
}
