//! Identifier-keyed entity storage.
//!
//! [`EntityStore`] is the aggregation store written concurrently by extraction workers.
//! Once resolution has run over it the store is frozen into an [`EntityGraph`], the
//! read-only view served to callers.

use dashmap::{mapref::entry::Entry, DashMap};
use petgraph::Direction;
use std::{collections::BTreeMap, sync::Arc};

use crate::{entity::Entity, error::GraphCacheError};

/// Thread-safe id -> entity map. Insertion is atomic per key and the first insert wins.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: DashMap<String, Arc<Entity>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entity` unless its id is already taken. A rejected insert leaves the
    /// existing entity untouched and reports both sources.
    pub fn insert(&self, entity: Entity) -> Result<Arc<Entity>, GraphCacheError> {
        match self.entities.entry(entity.id.clone()) {
            Entry::Occupied(existing) => Err(GraphCacheError::DuplicateIdentifier {
                id: entity.id,
                existing_uri: existing.get().source_uri.clone(),
                rejected_uri: entity.source_uri,
            }),
            Entry::Vacant(slot) => {
                let entity = Arc::new(entity);
                slot.insert(entity.clone());
                Ok(entity)
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Entity>> {
        self.entities.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Snapshot of every stored entity, ordered by id.
    pub fn all(&self) -> Vec<Arc<Entity>> {
        let mut all: Vec<Arc<Entity>> = self
            .entities
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&self) {
        self.entities.clear();
    }
}

/// Resolved, read-only entity graph. Navigation methods turn the identifier links stored on
/// each [`Entity`] back into entities.
#[derive(Debug, Default)]
pub struct EntityGraph {
    store: EntityStore,
}

impl From<EntityStore> for EntityGraph {
    fn from(store: EntityStore) -> Self {
        EntityGraph { store }
    }
}

impl EntityGraph {
    pub fn get(&self, id: &str) -> Option<Arc<Entity>> {
        self.store.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    pub fn entities(&self) -> Vec<Arc<Entity>> {
        self.store.all()
    }

    pub fn count(&self) -> usize {
        self.store.count()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn parent(&self, entity: &Entity) -> Option<Arc<Entity>> {
        entity.parent().and_then(|id| self.get(&id))
    }

    pub fn children(&self, entity: &Entity) -> Vec<Arc<Entity>> {
        self.lookup(entity.child_keys())
    }

    pub fn child(&self, entity: &Entity, id: &str) -> Option<Arc<Entity>> {
        if entity.has_child(id) {
            self.get(id)
        } else {
            None
        }
    }

    pub fn incoming(&self, entity: &Entity, kind: &str) -> Vec<Arc<Entity>> {
        self.lookup(entity.related_ids(Direction::Incoming, kind))
    }

    pub fn outgoing(&self, entity: &Entity, kind: &str) -> Vec<Arc<Entity>> {
        self.lookup(entity.related_ids(Direction::Outgoing, kind))
    }

    /// Every relation of `entity` in `direction`, grouped by kind.
    pub fn relations(
        &self,
        entity: &Entity,
        direction: Direction,
    ) -> BTreeMap<String, Vec<Arc<Entity>>> {
        entity
            .links()
            .relations(direction)
            .iter()
            .map(|(kind, ids)| (kind.clone(), self.lookup(ids.iter().cloned())))
            .collect()
    }

    fn lookup<I: IntoIterator<Item = String>>(&self, ids: I) -> Vec<Arc<Entity>> {
        ids.into_iter().filter_map(|id| self.get(&id)).collect()
    }
}
