//! Value types and native type descriptors
//!
//! The builder never inspects real host types. A [`NativeType`] is a plain
//! description of the members a backing type exposes, including the members it
//! inherits, each tagged with the type that declares it.

use serde::{Deserialize, Serialize};

/// Type of a property value
///
/// Two property types are compatible when their underlying names match; the
/// nullability flag only says whether the type can hold a missing value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyType {
    /// Underlying type name (e.g. "int", "string", "Guid")
    pub name: String,
    /// Whether the type can represent a missing value
    pub nullable: bool,
}

impl PropertyType {
    pub fn new(name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            nullable,
        }
    }

    pub fn int() -> Self {
        Self::new("int", false)
    }

    pub fn long() -> Self {
        Self::new("long", false)
    }

    pub fn guid() -> Self {
        Self::new("Guid", false)
    }

    /// Reference type, nullable by nature
    pub fn string() -> Self {
        Self::new("string", true)
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The same underlying type, able to hold a missing value
    pub fn make_nullable(&self) -> Self {
        Self::new(self.name.clone(), true)
    }

    pub fn is_compatible_with(&self, other: &PropertyType) -> bool {
        self.name == other.name
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.nullable {
            write!(f, "{}?", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// When a store generates a property's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueGenerated {
    Never,
    OnAdd,
    OnAddOrUpdate,
}

/// A member of a native type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeMember {
    pub name: String,
    pub property_type: PropertyType,
    /// Name of the native type that declares this member
    pub declaring_type: String,
}

/// Description of a backing type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    /// Declared and inherited members
    #[serde(default)]
    pub members: Vec<NativeMember>,
}

impl NativeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_type: None,
            members: Vec::new(),
        }
    }

    /// Derive from `base`, inheriting all of its members
    pub fn derived_from(name: impl Into<String>, base: &NativeType) -> Self {
        Self {
            name: name.into(),
            base_type: Some(base.name.clone()),
            members: base.members.clone(),
        }
    }

    /// Add a member declared by this type
    pub fn with_member(mut self, name: impl Into<String>, property_type: PropertyType) -> Self {
        let name = name.into();
        self.members.retain(|m| m.name != name);
        self.members.push(NativeMember {
            name,
            property_type,
            declaring_type: self.name.clone(),
        });
        self
    }

    /// Find a member anywhere in the native hierarchy
    pub fn find_member(&self, name: &str) -> Option<&NativeMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_nullable_keeps_compatibility() {
        let int = PropertyType::int();
        let nullable = int.make_nullable();
        assert!(nullable.is_nullable());
        assert!(!int.is_nullable());
        assert!(int.is_compatible_with(&nullable));
        assert_eq!(nullable.to_string(), "int?");
    }

    #[test]
    fn test_derived_native_type_keeps_declaring_type() {
        let content = NativeType::new("Content").with_member("BlogId", PropertyType::int());
        let post = NativeType::derived_from("Post", &content).with_member("Title", PropertyType::string());

        assert_eq!(post.find_member("BlogId").map(|m| m.declaring_type.as_str()), Some("Content"));
        assert_eq!(post.find_member("Title").map(|m| m.declaring_type.as_str()), Some("Post"));
        assert!(post.find_member("Missing").is_none());
    }
}
