//! Graph entities and their derived links.
//!
//! An [`Entity`] is immutable after extraction except for its [`EntityLinks`], which the
//! resolver fills in. Links never own other entities: they hold identifiers that are looked
//! up through the owning [`EntityStore`](crate::store::EntityStore) or
//! [`EntityGraph`](crate::store::EntityGraph).

use parking_lot::RwLock;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};

/// Reference declarations of one direction, keyed by the declaring element's local name.
pub type DeclaredRefs = BTreeMap<String, Vec<String>>;

/// Resolved reference edges of one direction, keyed by relationship kind.
pub type RelationMap = BTreeMap<String, Vec<String>>;

/// Element attributes in first-seen order. The first occurrence of a name wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    /// Inserts unless `name` is already present. Returns whether the value was stored.
    pub fn insert_first(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains_key(&name) {
            return false;
        }
        self.0.push((name, value.into()));
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::default();
        for (k, v) in iter {
            attributes.insert_first(k, v);
        }
        attributes
    }
}

/// Links derived by the resolver. Always recomputable from the declared fields and the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityLinks {
    pub parent: Option<String>,
    pub children: BTreeSet<String>,
    pub incoming: RelationMap,
    pub outgoing: RelationMap,
}

impl EntityLinks {
    pub fn relations(&self, direction: Direction) -> &RelationMap {
        match direction {
            Direction::Incoming => &self.incoming,
            Direction::Outgoing => &self.outgoing,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.incoming.values().map(Vec::len).sum::<usize>()
            + self.outgoing.values().map(Vec::len).sum::<usize>()
    }
}

#[derive(Debug)]
pub struct Entity {
    pub id: String,
    pub source_uri: String,
    /// 1-based line of the element's start tag, when the parser could report it.
    pub source_line: Option<u32>,
    pub element_name: String,
    pub attributes: Attributes,
    /// Nearest enclosing element that itself carries an identifier.
    pub parent_id: Option<String>,
    pub child_ids: Vec<String>,
    pub declared_in_refs: DeclaredRefs,
    pub declared_out_refs: DeclaredRefs,
    links: RwLock<EntityLinks>,
}

impl Entity {
    pub fn new(id: impl Into<String>, source_uri: impl Into<String>) -> Self {
        Entity {
            id: id.into(),
            source_uri: source_uri.into(),
            source_line: None,
            element_name: String::new(),
            attributes: Attributes::default(),
            parent_id: None,
            child_ids: Vec::new(),
            declared_in_refs: DeclaredRefs::new(),
            declared_out_refs: DeclaredRefs::new(),
            links: RwLock::new(EntityLinks::default()),
        }
    }

    pub fn declared_refs(&self, direction: Direction) -> &DeclaredRefs {
        match direction {
            Direction::Incoming => &self.declared_in_refs,
            Direction::Outgoing => &self.declared_out_refs,
        }
    }

    pub(crate) fn declare_ref(&mut self, direction: Direction, element: &str, target: &str) {
        let refs = match direction {
            Direction::Incoming => &mut self.declared_in_refs,
            Direction::Outgoing => &mut self.declared_out_refs,
        };
        refs.entry(element.to_string())
            .or_default()
            .push(target.to_string());
    }

    /// Snapshot of the resolved links.
    pub fn links(&self) -> EntityLinks {
        self.links.read().clone()
    }

    /// Id of the resolved parent, `None` until resolution or when `parent_id` dangles.
    pub fn parent(&self) -> Option<String> {
        self.links.read().parent.clone()
    }

    pub fn child_keys(&self) -> Vec<String> {
        self.links.read().children.iter().cloned().collect()
    }

    pub fn has_child(&self, id: &str) -> bool {
        self.links.read().children.contains(id)
    }

    /// Ids related to this entity by `kind` in `direction`, in discovery order.
    pub fn related_ids(&self, direction: Direction, kind: &str) -> Vec<String> {
        self.links
            .read()
            .relations(direction)
            .get(kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn relation_kinds(&self, direction: Direction) -> Vec<String> {
        self.links
            .read()
            .relations(direction)
            .keys()
            .cloned()
            .collect()
    }

    pub(crate) fn set_parent(&self, parent: &str) {
        self.links.write().parent = Some(parent.to_string());
    }

    /// Registers `child` unless already present. Returns whether this call added it.
    pub(crate) fn add_child(&self, child: &str) -> bool {
        let mut links = self.links.write();
        if links.children.contains(child) {
            return false;
        }
        links.children.insert(child.to_string())
    }

    /// Appends one edge end. Holds only this entity's lock.
    pub(crate) fn push_relation(&self, direction: Direction, kind: &str, other: &str) {
        let mut links = self.links.write();
        let relations = match direction {
            Direction::Incoming => &mut links.incoming,
            Direction::Outgoing => &mut links.outgoing,
        };
        relations
            .entry(kind.to_string())
            .or_default()
            .push(other.to_string());
    }

    pub(crate) fn clear_links(&self) {
        *self.links.write() = EntityLinks::default();
    }
}

/// Relationship kind for a reference element: the local name without the reference suffix
/// and any trailing `_` (`ChildRef` -> `Child`, `Mother_Ref` -> `Mother`).
pub fn relation_kind<'a>(element_name: &'a str, ref_suffix: &str) -> &'a str {
    let kind = element_name
        .strip_suffix(ref_suffix)
        .unwrap_or(element_name)
        .trim_end_matches('_');
    if kind.is_empty() {
        element_name
    } else {
        kind
    }
}
