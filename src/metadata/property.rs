//! Property node

use serde::{Deserialize, Serialize};

use super::entity_type::EntityTypeId;
use super::types::{PropertyType, ValueGenerated};

/// Identity of a property in the model arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct Property {
    pub(crate) id: PropertyId,
    pub(crate) name: String,
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) property_type: PropertyType,
    pub(crate) is_shadow: bool,
    pub(crate) is_nullable: Option<bool>,
    pub(crate) value_generated: Option<ValueGenerated>,
    pub(crate) requires_value_generator: Option<bool>,
}

impl Property {
    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    pub fn property_type(&self) -> &PropertyType {
        &self.property_type
    }

    /// A shadow property has no backing native member
    pub fn is_shadow(&self) -> bool {
        self.is_shadow
    }

    /// The configured nullability, if any
    pub fn configured_nullable(&self) -> Option<bool> {
        self.is_nullable
    }

    /// Effective nullability, defaulting to what the type allows
    pub fn is_nullable(&self) -> bool {
        self.is_nullable.unwrap_or(self.property_type.is_nullable())
    }

    pub fn value_generated(&self) -> Option<ValueGenerated> {
        self.value_generated
    }

    pub fn requires_value_generator(&self) -> Option<bool> {
        self.requires_value_generator
    }
}
