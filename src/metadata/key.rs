//! Key and index nodes

use serde::{Deserialize, Serialize};

use super::entity_type::EntityTypeId;
use super::property::PropertyId;

/// Identity of a key in the model arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyId(pub(crate) usize);

/// Identity of an index in the model arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexId(pub(crate) usize);

/// A unique, ordered, non-empty list of properties
#[derive(Debug, Clone)]
pub struct Key {
    pub(crate) id: KeyId,
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
}

impl Key {
    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }
}

#[derive(Debug, Clone)]
pub struct Index {
    pub(crate) id: IndexId,
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
}

impl Index {
    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }
}
