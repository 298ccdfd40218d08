//! Entity type validation functionality
//!
//! Validates primary keys, key and index shape, property redeclaration, the
//! shared property/navigation namespace and base type cycles.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{ModelValidationError, is_visible, property_label};
use crate::metadata::{EntityType, EntityTypeId, Model, PropertyId};

/// Entity type validator
#[derive(Debug, Default)]
pub struct EntityTypeValidator;

impl EntityTypeValidator {
    /// Create a new entity type validator
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, model: &Model) -> Vec<ModelValidationError> {
        let mut errors = self.check_base_type_cycles(model);
        let cyclic: BTreeSet<String> = errors
            .iter()
            .filter_map(|e| match e {
                ModelValidationError::CircularBaseType { entity_type } => Some(entity_type.clone()),
                _ => None,
            })
            .collect();

        for entity_type in model.entity_types() {
            // Inherited lookups are meaningless inside a cycle
            if cyclic.contains(entity_type.name()) {
                continue;
            }
            errors.extend(self.check_primary_key(model, entity_type));
            errors.extend(self.check_members(model, entity_type));
            errors.extend(self.check_redeclared_properties(model, entity_type));
            errors.extend(self.check_member_names(model, entity_type));
        }
        errors
    }

    /// Find entity types whose base type chain loops back on itself
    ///
    /// Uses petgraph's strongly connected components over the base type edges.
    pub fn check_base_type_cycles(&self, model: &Model) -> Vec<ModelValidationError> {
        let mut graph = DiGraph::<EntityTypeId, ()>::new();
        let mut node_map: BTreeMap<EntityTypeId, NodeIndex> = BTreeMap::new();
        for entity_type in model.entity_types() {
            node_map.insert(entity_type.id(), graph.add_node(entity_type.id()));
        }
        for entity_type in model.entity_types() {
            if let Some(base) = entity_type.base_type().and_then(|b| node_map.get(&b)) {
                graph.add_edge(node_map[&entity_type.id()], *base, ());
            }
        }

        let mut names = BTreeSet::new();
        for component in tarjan_scc(&graph) {
            let is_cycle = component.len() > 1 || graph.contains_edge(component[0], component[0]);
            if is_cycle {
                names.extend(component.iter().map(|n| model.entity_type(graph[*n]).name().to_string()));
            }
        }
        names
            .into_iter()
            .map(|entity_type| ModelValidationError::CircularBaseType { entity_type })
            .collect()
    }

    fn check_primary_key(&self, model: &Model, entity_type: &EntityType) -> Vec<ModelValidationError> {
        let Some(primary_key) = entity_type.declared_primary_key() else {
            return Vec::new();
        };
        if !entity_type.declared_keys().contains(&primary_key) {
            return vec![ModelValidationError::PrimaryKeyNotDeclared {
                entity_type: entity_type.name().to_string(),
            }];
        }

        model
            .base_chain(entity_type.id())
            .into_iter()
            .skip(1)
            .find(|ancestor| model.entity_type(*ancestor).declared_primary_key().is_some())
            .map(|ancestor| ModelValidationError::MultiplePrimaryKeys {
                entity_type: entity_type.name().to_string(),
                base_type: model.entity_type(ancestor).name().to_string(),
            })
            .into_iter()
            .collect()
    }

    fn check_members(&self, model: &Model, entity_type: &EntityType) -> Vec<ModelValidationError> {
        let keys = entity_type
            .declared_keys()
            .iter()
            .filter_map(|k| model.try_key(*k))
            .map(|k| ("key", k.properties()));
        let indexes = entity_type
            .declared_indexes()
            .iter()
            .filter_map(|i| model.try_index(*i))
            .map(|i| ("index", i.properties()));

        let mut errors = Vec::new();
        for (kind, properties) in keys.chain(indexes) {
            errors.extend(check_property_list(model, entity_type, kind, properties));
        }
        errors
    }

    fn check_redeclared_properties(&self, model: &Model, entity_type: &EntityType) -> Vec<ModelValidationError> {
        let mut errors = Vec::new();
        for property in entity_type.declared_properties() {
            let Some(property) = model.try_property(*property) else {
                continue;
            };
            let ancestor = model
                .base_chain(entity_type.id())
                .into_iter()
                .skip(1)
                .find(|a| model.find_declared_property(*a, property.name()).is_some());
            if let Some(ancestor) = ancestor {
                errors.push(ModelValidationError::RedeclaredProperty {
                    entity_type: entity_type.name().to_string(),
                    property: property.name().to_string(),
                    base_type: model.entity_type(ancestor).name().to_string(),
                });
            }
        }
        errors
    }

    /// Properties and navigations visible on an entity type share one namespace
    fn check_member_names(&self, model: &Model, entity_type: &EntityType) -> Vec<ModelValidationError> {
        let chain = model.base_chain(entity_type.id());
        let mut counts: BTreeMap<String, (usize, bool)> = BTreeMap::new();
        for owner in &chain {
            let declared_here = *owner == entity_type.id();
            let properties = model
                .entity_type(*owner)
                .declared_properties()
                .iter()
                .filter_map(|p| model.try_property(*p))
                .map(|p| p.name().to_string());
            let navigations = model.declared_navigations(*owner).into_iter().map(|n| n.name);
            for name in properties.chain(navigations) {
                let entry = counts.entry(name).or_default();
                entry.0 += 1;
                entry.1 |= declared_here;
            }
        }

        counts
            .into_iter()
            .filter(|(_, (count, declared_here))| *count > 1 && *declared_here)
            .map(|(name, _)| ModelValidationError::DuplicateMemberName {
                entity_type: entity_type.name().to_string(),
                name,
            })
            .collect()
    }
}

/// Check that a key, index or foreign key has visible properties
pub(crate) fn check_property_list(
    model: &Model,
    entity_type: &EntityType,
    kind: &'static str,
    properties: &[PropertyId],
) -> Vec<ModelValidationError> {
    if properties.is_empty() {
        return vec![ModelValidationError::EmptyMember {
            entity_type: entity_type.name().to_string(),
            kind,
        }];
    }
    properties
        .iter()
        .filter(|p| !is_visible(model, entity_type.id(), **p))
        .map(|p| ModelValidationError::InvisibleProperty {
            entity_type: entity_type.name().to_string(),
            kind,
            property: property_label(model, *p),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyType;

    fn model_with_blog() -> (Model, EntityTypeId) {
        let mut model = Model::new();
        let blog = model.add_entity_type("Blog", None);
        let id = model.add_property(blog, "Id", PropertyType::int(), false);
        let key = model.add_key(blog, vec![id]);
        model.set_primary_key(blog, Some(key));
        (model, blog)
    }

    #[test]
    fn test_valid_entity_type_has_no_errors() {
        let (model, _) = model_with_blog();
        assert!(EntityTypeValidator::new().validate(&model).is_empty());
    }

    #[test]
    fn test_base_type_cycle_is_reported_for_each_member() {
        let (mut model, blog) = model_with_blog();
        let post = model.add_entity_type("Post", None);
        model.set_base_type(post, Some(blog));
        model.set_base_type(blog, Some(post));

        let errors = EntityTypeValidator::new().check_base_type_cycles(&model);
        assert_eq!(
            errors,
            vec![
                ModelValidationError::CircularBaseType { entity_type: "Blog".to_string() },
                ModelValidationError::CircularBaseType { entity_type: "Post".to_string() },
            ]
        );
    }

    #[test]
    fn test_redeclared_property_and_second_primary_key() {
        let (mut model, blog) = model_with_blog();
        let special = model.add_entity_type("SpecialBlog", None);
        let id = model.add_property(special, "Id", PropertyType::int(), false);
        let key = model.add_key(special, vec![id]);
        model.set_primary_key(special, Some(key));
        model.set_base_type(special, Some(blog));

        let errors = EntityTypeValidator::new().validate(&model);
        assert!(errors.contains(&ModelValidationError::RedeclaredProperty {
            entity_type: "SpecialBlog".to_string(),
            property: "Id".to_string(),
            base_type: "Blog".to_string(),
        }));
        assert!(errors.contains(&ModelValidationError::MultiplePrimaryKeys {
            entity_type: "SpecialBlog".to_string(),
            base_type: "Blog".to_string(),
        }));
        assert!(errors.iter().any(|e| matches!(e, ModelValidationError::DuplicateMemberName { name, .. } if name == "Id")));
    }

    #[test]
    fn test_index_over_foreign_property_is_invisible() {
        let (mut model, blog) = model_with_blog();
        let post = model.add_entity_type("Post", None);
        let title = model.add_property(post, "Title", PropertyType::string(), false);
        model.add_index(blog, vec![title]);

        let errors = EntityTypeValidator::new().validate(&model);
        assert_eq!(
            errors,
            vec![ModelValidationError::InvisibleProperty {
                entity_type: "Blog".to_string(),
                kind: "index",
                property: "Title".to_string(),
            }]
        );
    }
}
