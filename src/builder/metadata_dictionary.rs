//! Per-item configuration source registry
//!
//! Each builder keeps one dictionary per kind of item it owns (keys,
//! properties, indexes, relationships). An entry holds the builder state for
//! the item and the configuration source that authorized its existence.

use std::collections::BTreeMap;

use tracing::trace;

use crate::metadata::ConfigurationSource;

#[derive(Debug, Clone)]
struct Entry<B> {
    state: B,
    source: ConfigurationSource,
}

/// Registry mapping an item to its builder state and configuration source
///
/// Items that are not tracked are treated as configured explicitly: nothing
/// below an explicit source may remove them.
#[derive(Debug, Clone)]
pub struct MetadataDictionary<K, B> {
    values: BTreeMap<K, Entry<B>>,
}

impl<K, B> Default for MetadataDictionary<K, B> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy + std::fmt::Debug, B> MetadataDictionary<K, B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `existing`, or the item produced by `create` when there is none
    ///
    /// Returns the item and whether it was created. Creation is the only case
    /// in which the caller should notify conventions.
    pub fn get_or_add(
        &mut self,
        existing: Option<K>,
        create: impl FnOnce() -> K,
        source: ConfigurationSource,
    ) -> (K, bool)
    where
        B: Default,
    {
        match existing {
            Some(item) => {
                match self.values.get_mut(&item) {
                    Some(entry) => entry.source = source.max_with(Some(entry.source)),
                    None => self.insert(item, B::default(), source),
                }
                (item, false)
            }
            None => {
                let item = create();
                self.insert(item, B::default(), source);
                (item, true)
            }
        }
    }

    /// Track an item with explicit initial state, replacing any previous entry
    pub fn insert(&mut self, item: K, state: B, source: ConfigurationSource) {
        trace!(item = ?item, source = %source, "tracking item");
        self.values.insert(item, Entry { state, source });
    }

    pub fn contains(&self, item: K) -> bool {
        self.values.contains_key(&item)
    }

    pub fn state(&self, item: K) -> Option<&B> {
        self.values.get(&item).map(|e| &e.state)
    }

    pub fn state_mut(&mut self, item: K) -> Option<&mut B> {
        self.values.get_mut(&item).map(|e| &mut e.state)
    }

    /// The recorded source, `Explicit` when the item is not tracked
    pub fn configuration_source(&self, item: K) -> ConfigurationSource {
        self.values
            .get(&item)
            .map(|e| e.source)
            .unwrap_or(ConfigurationSource::Explicit)
    }

    /// Raise the recorded source of a tracked item to at least `source`
    pub fn update_configuration_source(&mut self, item: K, source: ConfigurationSource) {
        if let Some(entry) = self.values.get_mut(&item) {
            let updated = source.max_with(Some(entry.source));
            if updated != entry.source {
                trace!(item = ?item, from = %entry.source, to = %updated, "configuration source raised");
                entry.source = updated;
            }
        }
    }

    /// Like [`update_configuration_source`](Self::update_configuration_source), reporting whether the item is tracked
    pub fn try_get(&mut self, item: K, source: ConfigurationSource) -> bool {
        if self.contains(item) {
            self.update_configuration_source(item, source);
            true
        } else {
            false
        }
    }

    pub fn can_remove(
        &self,
        item: K,
        source: ConfigurationSource,
        can_override_same_source: bool,
    ) -> bool {
        let recorded = self.configuration_source(item);
        source.overrides(recorded) && (recorded != source || can_override_same_source)
    }

    /// Stop tracking an item, returning the source it was recorded with
    ///
    /// Returns `None` when the recorded source wins over `source`.
    pub fn remove(
        &mut self,
        item: K,
        source: ConfigurationSource,
        can_override_same_source: bool,
    ) -> Option<ConfigurationSource> {
        if !self.can_remove(item, source, can_override_same_source) {
            return None;
        }
        let recorded = self.configuration_source(item);
        self.values.remove(&item);
        Some(recorded)
    }

    pub fn items(&self) -> impl Iterator<Item = K> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConfigurationSource::*;

    #[test]
    fn test_get_or_add_creates_once() {
        let mut dictionary: MetadataDictionary<u32, ()> = MetadataDictionary::new();
        let (item, created) = dictionary.get_or_add(None, || 7, Convention);
        assert_eq!(item, 7);
        assert!(created);

        let (item, created) = dictionary.get_or_add(Some(7), || unreachable!(), DataAnnotation);
        assert_eq!(item, 7);
        assert!(!created);
        assert_eq!(dictionary.configuration_source(7), DataAnnotation);

        dictionary.get_or_add(Some(7), || unreachable!(), Convention);
        assert_eq!(dictionary.configuration_source(7), DataAnnotation);
    }

    #[test]
    fn test_remove_respects_recorded_source() {
        let mut dictionary: MetadataDictionary<u32, ()> = MetadataDictionary::new();
        dictionary.insert(1, (), DataAnnotation);

        assert_eq!(dictionary.remove(1, Convention, true), None);
        assert_eq!(dictionary.remove(1, DataAnnotation, false), None);
        assert!(dictionary.can_remove(1, DataAnnotation, true));
        assert_eq!(dictionary.remove(1, DataAnnotation, true), Some(DataAnnotation));
        assert!(!dictionary.contains(1));
    }

    #[test]
    fn test_untracked_items_count_as_explicit() {
        let mut dictionary: MetadataDictionary<u32, ()> = MetadataDictionary::new();
        assert_eq!(dictionary.configuration_source(3), Explicit);
        assert!(!dictionary.can_remove(3, DataAnnotation, true));
        assert!(!dictionary.try_get(3, Convention));
        assert_eq!(dictionary.remove(3, Explicit, true), Some(Explicit));
    }
}
