//! Arena holding every node of the schema graph
//!
//! Nodes refer to each other by id only, so replacing a foreign key or
//! re-creating a property never leaves a dangling reference behind a borrow.
//! The model performs no permission checks; that is the builders' job.

use std::collections::BTreeMap;

use tracing::trace;

use super::entity_type::{EntityType, EntityTypeId};
use super::foreign_key::{ForeignKey, ForeignKeyId, Navigation};
use super::key::{Index, IndexId, Key, KeyId};
use super::property::{Property, PropertyId};
use super::types::{NativeType, PropertyType};

#[derive(Debug, Clone, Default)]
pub struct Model {
    entity_types: BTreeMap<EntityTypeId, EntityType>,
    properties: BTreeMap<PropertyId, Property>,
    keys: BTreeMap<KeyId, Key>,
    foreign_keys: BTreeMap<ForeignKeyId, ForeignKey>,
    indexes: BTreeMap<IndexId, Index>,
    next_id: usize,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    // ------------------------------------------------------------------
    // Entity types
    // ------------------------------------------------------------------

    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.entity_types.values()
    }

    /// Panics if the entity type was removed
    pub fn entity_type(&self, id: EntityTypeId) -> &EntityType {
        &self.entity_types[&id]
    }

    pub fn try_entity_type(&self, id: EntityTypeId) -> Option<&EntityType> {
        self.entity_types.get(&id)
    }

    pub fn contains_entity_type(&self, id: EntityTypeId) -> bool {
        self.entity_types.contains_key(&id)
    }

    pub fn find_entity_type(&self, name: &str) -> Option<EntityTypeId> {
        self.entity_types
            .values()
            .find(|e| e.name == name)
            .map(|e| e.id)
    }

    pub(crate) fn add_entity_type(
        &mut self,
        name: &str,
        native_type: Option<NativeType>,
    ) -> EntityTypeId {
        debug_assert!(self.find_entity_type(name).is_none());
        let id = EntityTypeId(self.allocate());
        self.entity_types
            .insert(id, EntityType::new(id, name.to_string(), native_type));
        id
    }

    pub(crate) fn set_native_type(&mut self, id: EntityTypeId, native_type: NativeType) {
        if let Some(entity_type) = self.entity_types.get_mut(&id) {
            entity_type.native_type = Some(native_type);
        }
    }

    pub(crate) fn remove_entity_type(&mut self, id: EntityTypeId) -> Option<EntityType> {
        let removed = self.entity_types.remove(&id)?;
        for property in &removed.properties {
            self.properties.remove(property);
        }
        for key in &removed.keys {
            self.keys.remove(key);
        }
        for index in &removed.indexes {
            self.indexes.remove(index);
        }
        debug_assert!(removed.foreign_keys.is_empty());
        Some(removed)
    }

    pub(crate) fn set_base_type(&mut self, id: EntityTypeId, base_type: Option<EntityTypeId>) {
        if let Some(entity_type) = self.entity_types.get_mut(&id) {
            entity_type.base_type = base_type;
        }
    }

    /// `id` followed by its ancestors, nearest first
    pub fn base_chain(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(entity_type) = current.and_then(|id| self.entity_types.get(&id)) {
            if chain.contains(&entity_type.id) {
                break;
            }
            chain.push(entity_type.id);
            current = entity_type.base_type;
        }
        chain
    }

    pub fn root_type(&self, id: EntityTypeId) -> EntityTypeId {
        self.base_chain(id).last().copied().unwrap_or(id)
    }

    pub fn is_same_or_derived_from(&self, id: EntityTypeId, ancestor: EntityTypeId) -> bool {
        self.base_chain(id).contains(&ancestor)
    }

    pub fn direct_derived_types(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        self.entity_types
            .values()
            .filter(|e| e.base_type == Some(id))
            .map(|e| e.id)
            .collect()
    }

    pub fn derived_types(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        let mut result = Vec::new();
        let mut pending = self.direct_derived_types(id);
        while let Some(derived) = pending.pop() {
            if derived == id || result.contains(&derived) {
                continue;
            }
            result.push(derived);
            pending.extend(self.direct_derived_types(derived));
        }
        result
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Panics if the property was removed
    pub fn property(&self, id: PropertyId) -> &Property {
        &self.properties[&id]
    }

    pub fn try_property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(&id)
    }

    pub(crate) fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        self.properties.get_mut(&id)
    }

    pub fn find_declared_property(&self, entity_type: EntityTypeId, name: &str) -> Option<PropertyId> {
        self.try_entity_type(entity_type)?
            .properties
            .iter()
            .copied()
            .find(|p| self.properties[p].name == name)
    }

    /// Find a property declared on `entity_type` or one of its ancestors
    pub fn find_property(&self, entity_type: EntityTypeId, name: &str) -> Option<PropertyId> {
        self.base_chain(entity_type)
            .into_iter()
            .find_map(|id| self.find_declared_property(id, name))
    }

    /// Declared and inherited properties, root type first
    pub fn properties(&self, entity_type: EntityTypeId) -> Vec<PropertyId> {
        let mut chain = self.base_chain(entity_type);
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|id| self.entity_types[&id].properties.iter().copied())
            .collect()
    }

    pub(crate) fn add_property(
        &mut self,
        entity_type: EntityTypeId,
        name: &str,
        property_type: PropertyType,
        is_shadow: bool,
    ) -> PropertyId {
        debug_assert!(self.find_property(entity_type, name).is_none());
        let id = PropertyId(self.allocate());
        self.properties.insert(
            id,
            Property {
                id,
                name: name.to_string(),
                declaring_entity_type: entity_type,
                property_type,
                is_shadow,
                is_nullable: None,
                value_generated: None,
                requires_value_generator: None,
            },
        );
        if let Some(entity) = self.entity_types.get_mut(&entity_type) {
            entity.properties.push(id);
        }
        trace!(property = name, "property added to model");
        id
    }

    pub(crate) fn remove_property(&mut self, id: PropertyId) -> Option<Property> {
        debug_assert!(self.containing_keys(id).is_empty());
        debug_assert!(self.containing_foreign_keys(id).is_empty());
        debug_assert!(self.containing_indexes(id).is_empty());
        let removed = self.properties.remove(&id)?;
        if let Some(entity) = self.entity_types.get_mut(&removed.declaring_entity_type) {
            entity.properties.retain(|p| *p != id);
        }
        Some(removed)
    }

    pub fn contains_property(&self, id: PropertyId) -> bool {
        self.properties.contains_key(&id)
    }

    pub fn property_names(&self, properties: &[PropertyId]) -> Vec<String> {
        properties
            .iter()
            .map(|p| self.properties[p].name.clone())
            .collect()
    }

    /// Same arity and pairwise compatible underlying types
    pub fn are_compatible(&self, principal: &[PropertyId], dependent: &[PropertyId]) -> bool {
        principal.len() == dependent.len()
            && principal.iter().zip(dependent).all(|(p, d)| {
                self.properties[p]
                    .property_type
                    .is_compatible_with(&self.properties[d].property_type)
            })
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// Panics if the key was removed
    pub fn key(&self, id: KeyId) -> &Key {
        &self.keys[&id]
    }

    pub fn try_key(&self, id: KeyId) -> Option<&Key> {
        self.keys.get(&id)
    }

    pub fn find_declared_key(&self, entity_type: EntityTypeId, properties: &[PropertyId]) -> Option<KeyId> {
        self.try_entity_type(entity_type)?
            .keys
            .iter()
            .copied()
            .find(|k| self.keys[k].properties == properties)
    }

    pub fn find_key(&self, entity_type: EntityTypeId, properties: &[PropertyId]) -> Option<KeyId> {
        self.base_chain(entity_type)
            .into_iter()
            .find_map(|id| self.find_declared_key(id, properties))
    }

    /// Declared and inherited keys
    pub fn keys(&self, entity_type: EntityTypeId) -> Vec<KeyId> {
        self.base_chain(entity_type)
            .into_iter()
            .flat_map(|id| self.entity_types[&id].keys.iter().copied())
            .collect()
    }

    pub fn find_declared_primary_key(&self, entity_type: EntityTypeId) -> Option<KeyId> {
        self.try_entity_type(entity_type)?.primary_key
    }

    /// The primary key of the nearest type in the hierarchy that defines one
    pub fn find_primary_key(&self, entity_type: EntityTypeId) -> Option<KeyId> {
        self.base_chain(entity_type)
            .into_iter()
            .find_map(|id| self.entity_types[&id].primary_key)
    }

    pub(crate) fn add_key(&mut self, entity_type: EntityTypeId, properties: Vec<PropertyId>) -> KeyId {
        debug_assert!(!properties.is_empty());
        let id = KeyId(self.allocate());
        self.keys.insert(
            id,
            Key {
                id,
                declaring_entity_type: entity_type,
                properties,
            },
        );
        if let Some(entity) = self.entity_types.get_mut(&entity_type) {
            entity.keys.push(id);
        }
        id
    }

    pub(crate) fn remove_key(&mut self, id: KeyId) -> Option<Key> {
        debug_assert!(self.referencing_foreign_keys_of_key(id).is_empty());
        let removed = self.keys.remove(&id)?;
        if let Some(entity) = self.entity_types.get_mut(&removed.declaring_entity_type) {
            entity.keys.retain(|k| *k != id);
            if entity.primary_key == Some(id) {
                entity.primary_key = None;
            }
        }
        Some(removed)
    }

    pub(crate) fn set_primary_key(&mut self, entity_type: EntityTypeId, key: Option<KeyId>) {
        if let Some(entity) = self.entity_types.get_mut(&entity_type) {
            debug_assert!(key.is_none_or(|k| entity.keys.contains(&k)));
            entity.primary_key = key;
        }
    }

    pub fn containing_keys(&self, property: PropertyId) -> Vec<KeyId> {
        self.keys
            .values()
            .filter(|k| k.properties.contains(&property))
            .map(|k| k.id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Foreign keys and navigations
    // ------------------------------------------------------------------

    pub fn all_foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.foreign_keys.values()
    }

    /// Panics if the foreign key was removed
    pub fn foreign_key(&self, id: ForeignKeyId) -> &ForeignKey {
        &self.foreign_keys[&id]
    }

    pub fn try_foreign_key(&self, id: ForeignKeyId) -> Option<&ForeignKey> {
        self.foreign_keys.get(&id)
    }

    pub(crate) fn foreign_key_mut(&mut self, id: ForeignKeyId) -> Option<&mut ForeignKey> {
        self.foreign_keys.get_mut(&id)
    }

    pub fn contains_foreign_key(&self, id: ForeignKeyId) -> bool {
        self.foreign_keys.contains_key(&id)
    }

    pub(crate) fn add_foreign_key(
        &mut self,
        dependent: EntityTypeId,
        properties: Vec<PropertyId>,
        principal_key: KeyId,
        principal: EntityTypeId,
    ) -> ForeignKeyId {
        let id = ForeignKeyId(self.allocate());
        self.foreign_keys.insert(
            id,
            ForeignKey {
                id,
                declaring_entity_type: dependent,
                properties,
                principal_key,
                principal_entity_type: principal,
                is_unique: None,
                is_required: None,
                dependent_to_principal: None,
                principal_to_dependent: None,
            },
        );
        if let Some(entity) = self.entity_types.get_mut(&dependent) {
            entity.foreign_keys.push(id);
        }
        id
    }

    pub(crate) fn remove_foreign_key(&mut self, id: ForeignKeyId) -> Option<ForeignKey> {
        let removed = self.foreign_keys.remove(&id)?;
        if let Some(entity) = self.entity_types.get_mut(&removed.declaring_entity_type) {
            entity.foreign_keys.retain(|fk| *fk != id);
        }
        Some(removed)
    }

    /// Declared and inherited foreign keys
    pub fn foreign_keys(&self, entity_type: EntityTypeId) -> Vec<ForeignKeyId> {
        self.base_chain(entity_type)
            .into_iter()
            .flat_map(|id| self.entity_types[&id].foreign_keys.iter().copied())
            .collect()
    }

    /// Foreign keys whose principal end is `entity_type` or one of its ancestors
    pub fn referencing_foreign_keys(&self, entity_type: EntityTypeId) -> Vec<ForeignKeyId> {
        let chain = self.base_chain(entity_type);
        self.foreign_keys
            .values()
            .filter(|fk| chain.contains(&fk.principal_entity_type))
            .map(|fk| fk.id)
            .collect()
    }

    pub fn referencing_foreign_keys_of_key(&self, key: KeyId) -> Vec<ForeignKeyId> {
        self.foreign_keys
            .values()
            .filter(|fk| fk.principal_key == key)
            .map(|fk| fk.id)
            .collect()
    }

    pub fn containing_foreign_keys(&self, property: PropertyId) -> Vec<ForeignKeyId> {
        self.foreign_keys
            .values()
            .filter(|fk| fk.properties.contains(&property))
            .map(|fk| fk.id)
            .collect()
    }

    /// Configured requiredness, otherwise required when no property can hold a missing value
    pub fn is_foreign_key_required(&self, foreign_key: ForeignKeyId) -> bool {
        let fk = &self.foreign_keys[&foreign_key];
        fk.is_required
            .unwrap_or_else(|| !fk.properties.iter().any(|p| self.properties[p].is_nullable()))
    }

    /// A foreign key over exactly `properties`, declared or inherited
    pub fn find_foreign_key(&self, entity_type: EntityTypeId, properties: &[PropertyId]) -> Option<ForeignKeyId> {
        self.foreign_keys(entity_type)
            .into_iter()
            .find(|fk| self.foreign_keys[fk].properties == properties)
    }

    /// A foreign key matching every given aspect
    pub fn find_matching_foreign_key(
        &self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        properties: &[PropertyId],
        principal_properties: Option<&[PropertyId]>,
        is_unique: Option<bool>,
    ) -> Option<ForeignKeyId> {
        self.foreign_keys(dependent).into_iter().find(|id| {
            let fk = &self.foreign_keys[id];
            fk.properties == properties
                && fk.principal_entity_type == principal
                && principal_properties.is_none_or(|p| self.keys[&fk.principal_key].properties == p)
                && is_unique.is_none_or(|u| fk.is_unique() == u)
        })
    }

    pub(crate) fn set_navigation(
        &mut self,
        foreign_key: ForeignKeyId,
        points_to_principal: bool,
        name: Option<String>,
    ) {
        if let Some(fk) = self.foreign_keys.get_mut(&foreign_key) {
            if points_to_principal {
                fk.dependent_to_principal = name;
            } else {
                fk.principal_to_dependent = name;
            }
        }
    }

    /// Navigations declared on `entity_type`
    pub fn declared_navigations(&self, entity_type: EntityTypeId) -> Vec<Navigation> {
        self.foreign_keys
            .values()
            .flat_map(|fk| fk.navigations())
            .filter(|n| n.declaring_entity_type == entity_type)
            .collect()
    }

    pub fn find_declared_navigation(&self, entity_type: EntityTypeId, name: &str) -> Option<Navigation> {
        self.foreign_keys
            .values()
            .flat_map(|fk| fk.navigations())
            .find(|n| n.declaring_entity_type == entity_type && n.name == name)
    }

    /// Find a navigation declared on `entity_type` or one of its ancestors
    pub fn find_navigation(&self, entity_type: EntityTypeId, name: &str) -> Option<Navigation> {
        self.base_chain(entity_type)
            .into_iter()
            .find_map(|id| self.find_declared_navigation(id, name))
    }

    // ------------------------------------------------------------------
    // Indexes
    // ------------------------------------------------------------------

    /// Panics if the index was removed
    pub fn index(&self, id: IndexId) -> &Index {
        &self.indexes[&id]
    }

    pub fn try_index(&self, id: IndexId) -> Option<&Index> {
        self.indexes.get(&id)
    }

    pub fn find_declared_index(&self, entity_type: EntityTypeId, properties: &[PropertyId]) -> Option<IndexId> {
        self.try_entity_type(entity_type)?
            .indexes
            .iter()
            .copied()
            .find(|i| self.indexes[i].properties == properties)
    }

    pub(crate) fn add_index(&mut self, entity_type: EntityTypeId, properties: Vec<PropertyId>) -> IndexId {
        let id = IndexId(self.allocate());
        self.indexes.insert(
            id,
            Index {
                id,
                declaring_entity_type: entity_type,
                properties,
            },
        );
        if let Some(entity) = self.entity_types.get_mut(&entity_type) {
            entity.indexes.push(id);
        }
        id
    }

    pub(crate) fn remove_index(&mut self, id: IndexId) -> Option<Index> {
        let removed = self.indexes.remove(&id)?;
        if let Some(entity) = self.entity_types.get_mut(&removed.declaring_entity_type) {
            entity.indexes.retain(|i| *i != id);
        }
        Some(removed)
    }

    pub fn containing_indexes(&self, property: PropertyId) -> Vec<IndexId> {
        self.indexes
            .values()
            .filter(|i| i.properties.contains(&property))
            .map(|i| i.id)
            .collect()
    }

    /// True when no key, index or foreign key uses the property
    pub fn is_property_unused(&self, property: PropertyId) -> bool {
        self.containing_keys(property).is_empty()
            && self.containing_indexes(property).is_empty()
            && self.containing_foreign_keys(property).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherited_lookups_walk_base_chain() {
        let mut model = Model::new();
        let content = model.add_entity_type("Content", None);
        let post = model.add_entity_type("Post", None);
        model.set_base_type(post, Some(content));

        let id = model.add_property(content, "Id", PropertyType::int(), true);
        let key = model.add_key(content, vec![id]);
        model.set_primary_key(content, Some(key));

        assert_eq!(model.find_property(post, "Id"), Some(id));
        assert_eq!(model.find_declared_property(post, "Id"), None);
        assert_eq!(model.find_primary_key(post), Some(key));
        assert_eq!(model.find_declared_primary_key(post), None);
        assert_eq!(model.base_chain(post), vec![post, content]);
        assert_eq!(model.derived_types(content), vec![post]);
    }

    #[test]
    fn test_navigation_views_follow_foreign_key_ends() {
        let mut model = Model::new();
        let blog = model.add_entity_type("Blog", None);
        let post = model.add_entity_type("Post", None);
        let blog_id = model.add_property(blog, "Id", PropertyType::int(), true);
        let post_blog_id = model.add_property(post, "BlogId", PropertyType::int(), true);
        let key = model.add_key(blog, vec![blog_id]);
        let fk = model.add_foreign_key(post, vec![post_blog_id], key, blog);
        model.set_navigation(fk, true, Some("Blog".to_string()));
        model.set_navigation(fk, false, Some("Posts".to_string()));

        let to_blog = model.find_declared_navigation(post, "Blog").unwrap();
        assert!(to_blog.points_to_principal);
        assert_eq!(to_blog.target_entity_type, blog);

        let to_posts = model.find_declared_navigation(blog, "Posts").unwrap();
        assert!(!to_posts.points_to_principal);
        assert_eq!(model.foreign_key(fk).other_entity_type(post), blog);
        assert_eq!(model.referencing_foreign_keys_of_key(key), vec![fk]);
        assert!(!model.is_property_unused(post_blog_id));
    }
}
