//! Foreign key edge and navigation views

use serde::{Deserialize, Serialize};

use super::entity_type::EntityTypeId;
use super::key::KeyId;
use super::property::PropertyId;

/// Identity of a foreign key in the model arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForeignKeyId(pub(crate) usize);

/// A relationship between a dependent (declaring) and a principal entity type
///
/// Navigations are stored here by name: the dependent-to-principal navigation
/// is declared on the dependent type and the principal-to-dependent
/// navigation on the principal type.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub(crate) id: ForeignKeyId,
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) principal_key: KeyId,
    pub(crate) principal_entity_type: EntityTypeId,
    pub(crate) is_unique: Option<bool>,
    pub(crate) is_required: Option<bool>,
    pub(crate) dependent_to_principal: Option<String>,
    pub(crate) principal_to_dependent: Option<String>,
}

impl ForeignKey {
    pub fn id(&self) -> ForeignKeyId {
        self.id
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn principal_key(&self) -> KeyId {
        self.principal_key
    }

    pub fn principal_entity_type(&self) -> EntityTypeId {
        self.principal_entity_type
    }

    /// The configured uniqueness, if any
    pub fn configured_unique(&self) -> Option<bool> {
        self.is_unique
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique.unwrap_or(false)
    }

    /// The configured requiredness, if any
    pub fn configured_required(&self) -> Option<bool> {
        self.is_required
    }

    pub fn dependent_to_principal(&self) -> Option<&str> {
        self.dependent_to_principal.as_deref()
    }

    pub fn principal_to_dependent(&self) -> Option<&str> {
        self.principal_to_dependent.as_deref()
    }

    pub fn navigation_name(&self, points_to_principal: bool) -> Option<&str> {
        if points_to_principal {
            self.dependent_to_principal()
        } else {
            self.principal_to_dependent()
        }
    }

    /// The end of the relationship that is not `entity_type`
    pub fn other_entity_type(&self, entity_type: EntityTypeId) -> EntityTypeId {
        if self.declaring_entity_type == entity_type {
            self.principal_entity_type
        } else {
            self.declaring_entity_type
        }
    }

    /// The navigation declared on `entity_type`, if any
    pub fn navigation_from(&self, entity_type: EntityTypeId) -> Option<Navigation> {
        if self.declaring_entity_type == entity_type {
            if let Some(name) = &self.dependent_to_principal {
                return Some(self.navigation(name, true));
            }
        }
        if self.principal_entity_type == entity_type {
            if let Some(name) = &self.principal_to_dependent {
                return Some(self.navigation(name, false));
            }
        }
        None
    }

    pub fn navigations(&self) -> Vec<Navigation> {
        let mut navigations = Vec::new();
        if let Some(name) = &self.dependent_to_principal {
            navigations.push(self.navigation(name, true));
        }
        if let Some(name) = &self.principal_to_dependent {
            navigations.push(self.navigation(name, false));
        }
        navigations
    }

    /// Same two ends, and the same uniqueness when `unique` is given
    pub fn is_compatible(
        &self,
        principal: EntityTypeId,
        dependent: EntityTypeId,
        unique: Option<bool>,
    ) -> bool {
        unique.is_none_or(|unique| self.is_unique() == unique)
            && self.principal_entity_type == principal
            && self.declaring_entity_type == dependent
    }

    fn navigation(&self, name: &str, points_to_principal: bool) -> Navigation {
        Navigation {
            name: name.to_string(),
            declaring_entity_type: if points_to_principal {
                self.declaring_entity_type
            } else {
                self.principal_entity_type
            },
            target_entity_type: if points_to_principal {
                self.principal_entity_type
            } else {
                self.declaring_entity_type
            },
            foreign_key: self.id,
            points_to_principal,
        }
    }
}

/// One side of a foreign key, as seen from the entity type declaring it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub name: String,
    pub declaring_entity_type: EntityTypeId,
    pub target_entity_type: EntityTypeId,
    pub foreign_key: ForeignKeyId,
    pub points_to_principal: bool,
}

impl Navigation {
    /// Whether this navigation could serve a relationship between the given ends
    ///
    /// With `should_point_to_principal` unset either direction is accepted.
    pub fn is_compatible(
        &self,
        foreign_key: &ForeignKey,
        principal: EntityTypeId,
        dependent: EntityTypeId,
        should_point_to_principal: Option<bool>,
        one_to_one: Option<bool>,
    ) -> bool {
        debug_assert_eq!(foreign_key.id, self.foreign_key);
        if should_point_to_principal.is_none_or(|p| p == self.points_to_principal)
            && foreign_key.is_compatible(principal, dependent, one_to_one)
        {
            return true;
        }

        should_point_to_principal.is_none()
            && foreign_key.is_compatible(dependent, principal, one_to_one)
    }
}
