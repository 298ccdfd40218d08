//! Serializable, identity-free view of a model
//!
//! Ids change whenever a foreign key or property is re-created, so two models
//! describing the same schema are compared through their descriptions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::entity_type::EntityTypeId;
use super::model::Model;
use super::property::PropertyId;
use super::types::ValueGenerated;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescription {
    pub entity_types: Vec<EntityTypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeDescription {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    pub properties: Vec<PropertyDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,
    pub keys: Vec<Vec<String>>,
    pub indexes: Vec<Vec<String>>,
    pub foreign_keys: Vec<ForeignKeyDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescription {
    pub name: String,
    /// Type name with a trailing `?` when nullable
    pub property_type: String,
    pub is_shadow: bool,
    pub is_nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_generated: Option<ValueGenerated>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDescription {
    pub properties: Vec<String>,
    pub principal_entity_type: String,
    pub principal_key: Vec<String>,
    pub is_unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent_to_principal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_to_dependent: Option<String>,
}

impl ModelDescription {
    pub fn entity_type(&self, name: &str) -> Option<&EntityTypeDescription> {
        self.entity_types.iter().find(|e| e.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize model description")
    }
}

impl EntityTypeDescription {
    pub fn property(&self, name: &str) -> Option<&PropertyDescription> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl Model {
    /// Describe the model, sorted by entity type name
    pub fn describe(&self) -> ModelDescription {
        let mut entity_types: Vec<EntityTypeDescription> = self
            .entity_types()
            .map(|e| self.describe_entity_type(e.id()))
            .collect();
        entity_types.sort_by(|a, b| a.name.cmp(&b.name));
        ModelDescription { entity_types }
    }

    fn describe_entity_type(&self, id: EntityTypeId) -> EntityTypeDescription {
        let entity_type = self.entity_type(id);
        let names = |properties: &[PropertyId]| self.property_names(properties);

        let properties = entity_type
            .declared_properties()
            .iter()
            .map(|p| {
                let property = self.property(*p);
                PropertyDescription {
                    name: property.name().to_string(),
                    property_type: property.property_type().to_string(),
                    is_shadow: property.is_shadow(),
                    is_nullable: property.is_nullable(),
                    value_generated: property.value_generated(),
                }
            })
            .collect();

        let mut keys: Vec<Vec<String>> = entity_type
            .declared_keys()
            .iter()
            .map(|k| names(self.key(*k).properties()))
            .collect();
        keys.sort();

        let mut indexes: Vec<Vec<String>> = entity_type
            .declared_indexes()
            .iter()
            .map(|i| names(self.index(*i).properties()))
            .collect();
        indexes.sort();

        let mut foreign_keys: Vec<ForeignKeyDescription> = entity_type
            .declared_foreign_keys()
            .iter()
            .map(|fk| {
                let fk = self.foreign_key(*fk);
                ForeignKeyDescription {
                    properties: names(fk.properties()),
                    principal_entity_type: self
                        .entity_type(fk.principal_entity_type())
                        .name()
                        .to_string(),
                    principal_key: names(self.key(fk.principal_key()).properties()),
                    is_unique: fk.is_unique(),
                    is_required: fk.configured_required(),
                    dependent_to_principal: fk.dependent_to_principal().map(str::to_string),
                    principal_to_dependent: fk.principal_to_dependent().map(str::to_string),
                }
            })
            .collect();
        foreign_keys.sort();

        EntityTypeDescription {
            name: entity_type.name().to_string(),
            base_type: entity_type
                .base_type()
                .map(|b| self.entity_type(b).name().to_string()),
            properties,
            primary_key: entity_type
                .declared_primary_key()
                .map(|k| names(self.key(k).properties())),
            keys,
            indexes,
            foreign_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyType;

    #[test]
    fn test_describe_is_sorted_and_serializable() {
        let mut model = Model::new();
        let post = model.add_entity_type("Post", None);
        let blog = model.add_entity_type("Blog", None);
        let id = model.add_property(blog, "Id", PropertyType::int(), false);
        let key = model.add_key(blog, vec![id]);
        model.set_primary_key(blog, Some(key));
        let blog_id = model.add_property(post, "BlogId", PropertyType::int().make_nullable(), true);
        model.add_foreign_key(post, vec![blog_id], key, blog);

        let description = model.describe();
        let names: Vec<&str> = description.entity_types.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Blog", "Post"]);

        let post = description.entity_type("Post").unwrap();
        assert_eq!(post.foreign_keys[0].principal_key, vec!["Id".to_string()]);
        assert_eq!(post.property("BlogId").unwrap().property_type, "int?");

        let json = description.to_json().unwrap();
        assert!(json.contains("\"principalEntityType\": \"Blog\""));
    }
}
