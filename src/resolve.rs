//! Second pass over a populated [`EntityStore`]: turns declared ids into links.
//!
//! Every entity is visited exactly once, in any order and possibly from several workers.
//! A visit writes to the visited entity and to the entities it points at, so each write is a
//! single locked append on one entity (see [`Entity::push_relation`]).
//!
//! - parent: `parent_id` resolves -> `parent` is set and the entity is registered in the
//!   parent's children.
//! - children: every resolvable id in `child_ids` is registered in `children`.
//! - references: for kind `T` and resolvable target `E`, an `in` declaration adds
//!   `E` to `incoming[T]` and self to `E.outgoing[T]`; `out` is the mirror image.
//!
//! Ids missing from the store are dropped and counted as dangling. Repeated declarations
//! produce repeated edges.

use petgraph::Direction;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    entity::{relation_kind, Entity},
    parallel,
    store::EntityStore,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub entities: usize,
    pub parent_links: usize,
    pub child_links: usize,
    /// Edges established, each counted once even though both endpoints record it.
    pub edges: usize,
    /// Declared parent, child or reference ids missing from the store.
    pub dangling: usize,
}

#[derive(Default)]
struct Counters {
    parent_links: AtomicUsize,
    child_links: AtomicUsize,
    edges: AtomicUsize,
    dangling: AtomicUsize,
}

pub struct Resolver<'a> {
    store: &'a EntityStore,
    ref_suffix: &'a str,
    counters: Counters,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a EntityStore, ref_suffix: &'a str) -> Self {
        Resolver {
            store,
            ref_suffix,
            counters: Counters::default(),
        }
    }

    /// Resolves every entity in the store. Work lists shorter than `threshold` run
    /// sequentially.
    pub fn resolve_all(self, threshold: usize) -> ResolveStats {
        let entities = self.store.all();
        parallel::for_each(&entities, threshold, |entity| self.resolve(entity));
        let stats = ResolveStats {
            entities: entities.len(),
            parent_links: self.counters.parent_links.load(Ordering::Relaxed),
            child_links: self.counters.child_links.load(Ordering::Relaxed),
            edges: self.counters.edges.load(Ordering::Relaxed),
            dangling: self.counters.dangling.load(Ordering::Relaxed),
        };
        tracing::debug!("[Resolver] {:?}", stats);
        stats
    }

    pub fn resolve(&self, entity: &Entity) {
        self.resolve_parent(entity);
        self.resolve_children(entity);
        self.resolve_references(entity, Direction::Incoming);
        self.resolve_references(entity, Direction::Outgoing);
    }

    fn resolve_parent(&self, entity: &Entity) {
        let Some(parent_id) = entity.parent_id.as_deref() else {
            return;
        };
        match self.store.get(parent_id) {
            Some(parent) => {
                entity.set_parent(&parent.id);
                parent.add_child(&entity.id);
                self.counters.parent_links.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.counters.dangling.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn resolve_children(&self, entity: &Entity) {
        for child_id in entity.child_ids.iter() {
            if self.store.contains(child_id) {
                entity.add_child(child_id);
                self.counters.child_links.fetch_add(1, Ordering::Relaxed);
            } else {
                self.counters.dangling.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn resolve_references(&self, entity: &Entity, direction: Direction) {
        for (element, targets) in entity.declared_refs(direction).iter() {
            let kind = relation_kind(element, self.ref_suffix);
            for target_id in targets.iter() {
                let Some(target) = self.store.get(target_id) else {
                    tracing::trace!(
                        "[Resolver] {}: dangling {kind} reference to '{target_id}'",
                        entity.id
                    );
                    self.counters.dangling.fetch_add(1, Ordering::Relaxed);
                    continue;
                };
                entity.push_relation(direction, kind, &target.id);
                target.push_relation(direction.opposite(), kind, &entity.id);
                self.counters.edges.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Resets every derived link so the store can be resolved again from scratch.
pub fn clear_links(store: &EntityStore) {
    for entity in store.all() {
        entity.clear_links();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn entity(id: &str) -> Entity {
        Entity::new(id, format!("{id}.xml"))
    }

    fn sample_store() -> EntityStore {
        let store = EntityStore::new();
        let mut p1 = entity("p1");
        p1.child_ids.push("p2".to_string());
        p1.child_ids.push("missing-child".to_string());
        p1.declare_ref(Direction::Outgoing, "ChildRef", "p3");
        p1.declare_ref(Direction::Outgoing, "ChildRef", "nowhere");
        let mut p2 = entity("p2");
        p2.parent_id = Some("p1".to_string());
        let mut p3 = entity("p3");
        p3.declare_ref(Direction::Incoming, "Mother_Ref", "p2");
        store.insert(p1).unwrap();
        store.insert(p2).unwrap();
        store.insert(p3).unwrap();
        store
    }

    #[test]
    fn links_parent_children_and_references() {
        let store = sample_store();
        let stats = Resolver::new(&store, "Ref").resolve_all(usize::MAX);

        let p1 = store.get("p1").unwrap();
        let p2 = store.get("p2").unwrap();
        let p3 = store.get("p3").unwrap();

        assert_eq!(p2.parent().as_deref(), Some("p1"));
        assert_eq!(p1.child_keys(), vec!["p2"]);
        assert_eq!(p1.related_ids(Direction::Outgoing, "Child"), vec!["p3"]);
        assert_eq!(p3.related_ids(Direction::Incoming, "Child"), vec!["p1"]);
        assert_eq!(p3.related_ids(Direction::Incoming, "Mother"), vec!["p2"]);
        assert_eq!(p2.related_ids(Direction::Outgoing, "Mother"), vec!["p3"]);

        assert_eq!(
            stats,
            ResolveStats {
                entities: 3,
                parent_links: 1,
                child_links: 1,
                edges: 2,
                dangling: 2,
            }
        );
    }

    #[test]
    fn repeated_declarations_are_not_deduplicated() {
        let store = EntityStore::new();
        let mut a = entity("a");
        a.declare_ref(Direction::Outgoing, "LinkRef", "b");
        a.declare_ref(Direction::Outgoing, "LinkRef", "b");
        store.insert(a).unwrap();
        store.insert(entity("b")).unwrap();
        Resolver::new(&store, "Ref").resolve_all(1);
        assert_eq!(
            store.get("b").unwrap().related_ids(Direction::Incoming, "Link"),
            vec!["a", "a"]
        );
    }

    #[test]
    fn re_resolving_after_clear_is_idempotent() {
        let store = sample_store();
        Resolver::new(&store, "Ref").resolve_all(1);
        let first: Vec<_> = store.all().iter().map(|e| e.links()).collect();
        clear_links(&store);
        Resolver::new(&store, "Ref").resolve_all(usize::MAX);
        let second: Vec<_> = store.all().iter().map(|e| e.links()).collect();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.parent, b.parent);
            assert_eq!(a.children, b.children);
            for (kind, ids) in a.outgoing.iter() {
                let left: BTreeSet<_> = ids.iter().collect();
                let right: BTreeSet<_> = b.outgoing[kind].iter().collect();
                assert_eq!(left, right);
            }
        }
    }
}
