//! Deletion-aware name tracking
//!
//! GL recycles object names: a buffer created right after another was
//! deleted may come back with the same number. A cache that remembers "name 7
//! is bound" would then skip binding the *new* buffer 7.
//!
//! Instead of scanning every cache on deletion, each namespace keeps a
//! generation counter per name. Caches store a [`TrackedName`] (name plus the
//! generation it was bound at); deleting the name bumps its generation, so no
//! stale entry can ever compare equal again.

use std::collections::HashMap;

use crate::rhi::types::GlName;

/// A driver name stamped with the generation it was observed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackedName {
    /// Driver object name
    pub name: GlName,
    /// Generation of `name` when the entry was recorded
    pub generation: u32,
}

impl TrackedName {
    /// The reserved "nothing bound" name
    pub const NONE: Self = Self { name: 0, generation: 0 };
}

/// Generation counters for one GL object namespace
///
/// Entries are never removed: dropping a retired name would reset it to
/// generation 0 and revive cache entries recorded before the deletion.
/// Drivers hand freed names out again before minting new ones, so the map
/// is bounded by the peak number of live objects in the namespace.
#[derive(Debug, Default, Clone)]
pub struct NameGenerations {
    generations: HashMap<GlName, u32>,
}

impl NameGenerations {
    /// Create an empty tracker; every name starts at generation 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation of a name
    pub fn generation(&self, name: GlName) -> u32 {
        self.generations.get(&name).copied().unwrap_or(0)
    }

    /// Stamp a name with its current generation
    pub fn track(&self, name: GlName) -> TrackedName {
        TrackedName { name, generation: self.generation(name) }
    }

    /// Whether a cached entry still refers to the live object behind its name
    pub fn is_current(&self, tracked: TrackedName) -> bool {
        tracked.generation == self.generation(tracked.name)
    }

    /// Record the deletion of a name, invalidating every cached entry for it
    ///
    /// Name 0 is never retired.
    pub fn retire(&mut self, name: GlName) {
        if name == 0 {
            return;
        }
        let generation = self.generations.entry(name).or_insert(0);
        *generation = generation.wrapping_add(1);
    }
}

/// Generation trackers for every namespace the caches hold names from
///
/// Vertex, index, uniform and pixel buffers share the GL buffer namespace, so
/// they share one tracker.
#[derive(Debug, Default, Clone)]
pub struct ResourceGenerations {
    /// Buffer objects
    pub buffers: NameGenerations,
    /// Program objects
    pub programs: NameGenerations,
    /// Texture objects
    pub textures: NameGenerations,
}

impl ResourceGenerations {
    /// Create trackers with every name at generation 0
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retire_invalidates_cached_name() {
        let mut generations = NameGenerations::new();
        let cached = generations.track(7);
        assert!(generations.is_current(cached));

        generations.retire(7);
        assert!(!generations.is_current(cached));
        assert_ne!(generations.track(7), cached);
    }

    #[test]
    fn test_other_names_unaffected() {
        let mut generations = NameGenerations::new();
        let cached = generations.track(3);
        generations.retire(4);
        assert!(generations.is_current(cached));
    }

    #[test]
    fn test_recycled_names_share_one_entry() {
        let mut generations = NameGenerations::new();
        let first = generations.track(9);
        for _ in 0..100 {
            generations.retire(9);
        }
        assert_eq!(generations.generations.len(), 1);
        assert_eq!(generations.generation(9), 100);
        assert!(!generations.is_current(first));
    }

    #[test]
    fn test_zero_is_never_retired() {
        let mut generations = NameGenerations::new();
        generations.retire(0);
        assert_eq!(generations.track(0), TrackedName::NONE);
    }
}
