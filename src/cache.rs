//! # GraphCache - the entity graph served for one folder
//!
//! [`GraphCache`] owns the live [`EntityGraph`] and decides when it has to be rebuilt.
//!
//! ## States
//!
//! - [`CacheState::Empty`]: nothing built yet.
//! - [`CacheState::Built`]: a graph is live and no change has been observed since it was built.
//! - [`CacheState::Dirty`]: a graph is live but the folder changed since. The stale graph is
//!   still served; the next [`GraphCache::load`] rebuilds it.
//!
//! Change notifications only ever flip the cache to `Dirty`. They arrive as
//! [`WorkspaceEvent`]s over a channel fed by the [`ChangeNotifier`]; the cache drains that
//! channel whenever it needs to know its state. Events that arrive while a build is running
//! stay queued and make the following load rebuild again.
//!
//! ## Rebuilds
//!
//! A rebuild fills a fresh store, resolves it and then swaps it in. If it fails the previous
//! graph stays live. Callers holding an `Arc<EntityGraph>` from [`GraphCache::graph`] keep a
//! consistent snapshot regardless of later rebuilds.
//!
//! ```rust,no_run
//! use xmlgraph::{cache::GraphCache, config::GraphConfig};
//!
//! let mut cache = GraphCache::new(GraphConfig::default());
//! cache.load("./data", false)?;
//! let grandpa = cache.get("abc-123").expect("loaded");
//! let graph = cache.graph().expect("loaded");
//! for child in graph.outgoing(&grandpa, "Father") {
//!     println!("{} is the father of {:?}", grandpa.id, child.attributes.get("Name"));
//! }
//! # Ok::<(), xmlgraph::GraphCacheError>(())
//! ```

use std::{
    path::{Path, PathBuf},
    sync::{
        mpsc::{channel, Receiver, Sender},
        Arc,
    },
};

use crate::{
    builder::{BuildReport, GraphBuilder},
    config::GraphConfig,
    entity::Entity,
    error::GraphCacheError,
    event::WorkspaceEvent,
    store::EntityGraph,
    watch::ChangeNotifier,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Built,
    Dirty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The live graph was current and no rebuild happened.
    Reused,
    Rebuilt(BuildReport),
}

impl LoadOutcome {
    pub fn report(&self) -> Option<&BuildReport> {
        match self {
            LoadOutcome::Reused => None,
            LoadOutcome::Rebuilt(report) => Some(report),
        }
    }
}

pub struct GraphCache {
    builder: GraphBuilder,
    graph: Option<Arc<EntityGraph>>,
    /// Folder the live graph was built from.
    built_root: Option<PathBuf>,
    /// Folder the notifier currently reports on.
    watched_root: Option<PathBuf>,
    dirty: bool,
    notifier: Box<dyn ChangeNotifier>,
    event_tx: Sender<WorkspaceEvent>,
    event_rx: Receiver<WorkspaceEvent>,
    last_report: Option<BuildReport>,
}

impl GraphCache {
    /// Creates a cache watching loaded folders with the platform file watcher.
    #[cfg(feature = "service")]
    pub fn new(config: GraphConfig) -> Self {
        let notifier = Box::new(crate::watch::FsNotifier::new(&config));
        Self::with_notifier(config, notifier)
    }

    /// Creates a cache without change notification; it rebuilds only on first load or when
    /// forced.
    #[cfg(not(feature = "service"))]
    pub fn new(config: GraphConfig) -> Self {
        Self::with_notifier(config, Box::new(crate::watch::NullNotifier))
    }

    pub fn with_notifier(config: GraphConfig, notifier: Box<dyn ChangeNotifier>) -> Self {
        let (event_tx, event_rx) = channel();
        GraphCache {
            builder: GraphBuilder::new(config),
            graph: None,
            built_root: None,
            watched_root: None,
            dirty: true,
            notifier,
            event_tx,
            event_rx,
            last_report: None,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        self.builder.config()
    }

    /// Builds the graph for `folder` unless the live graph is already current for it.
    ///
    /// Fails without touching the live graph when `folder` is blank, does not exist, or
    /// cannot be walked. Duplicate ids and documents that fail to parse do not fail the load;
    /// they are listed in the returned [`BuildReport`].
    pub fn load<P: AsRef<Path>>(
        &mut self,
        folder: P,
        force_reload: bool,
    ) -> Result<LoadOutcome, GraphCacheError> {
        let root = match validate_root(folder.as_ref()) {
            Ok(root) => root,
            Err(e) => {
                tracing::error!("[GraphCache] {e}");
                return Err(e);
            }
        };

        self.drain_events();
        if !force_reload
            && !self.dirty
            && self.graph.is_some()
            && self.built_root.as_deref() == Some(root.as_path())
        {
            tracing::debug!("[GraphCache] {:?} unchanged, serving cached graph", root);
            return Ok(LoadOutcome::Reused);
        }

        if self.watched_root.as_deref() != Some(root.as_path()) {
            self.watch(&root);
        }

        match self.builder.build(&root) {
            Ok((graph, report)) => {
                self.graph = Some(Arc::new(graph));
                self.built_root = Some(root.clone());
                // Without a working subscription changes can't be observed, so never trust
                // the graph to be current.
                self.dirty = self.watched_root.as_deref() != Some(root.as_path());
                self.last_report = Some(report.clone());
                Ok(LoadOutcome::Rebuilt(report))
            }
            Err(e) => {
                tracing::error!(
                    "[GraphCache] While loading the graph cache from {:?}: {e}",
                    root
                );
                if self.built_root != self.watched_root {
                    self.dirty = true;
                }
                Err(e)
            }
        }
    }

    fn watch(&mut self, root: &Path) {
        match self.notifier.subscribe(root, self.event_tx.clone()) {
            Ok(()) => self.watched_root = Some(root.to_path_buf()),
            Err(e) => {
                tracing::warn!(
                    "[GraphCache] Could not watch {:?}, every load will rebuild: {e}",
                    root
                );
                self.notifier.unsubscribe();
                self.watched_root = None;
            }
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            tracing::trace!("[GraphCache] workspace event {:?}", event);
            self.dirty = true;
        }
    }

    /// Sender feeding the cache's change channel. Anything sent marks the cache dirty.
    pub fn event_sender(&self) -> Sender<WorkspaceEvent> {
        self.event_tx.clone()
    }

    pub fn state(&mut self) -> CacheState {
        self.drain_events();
        match (&self.graph, self.dirty) {
            (None, _) => CacheState::Empty,
            (Some(_), false) => CacheState::Built,
            (Some(_), true) => CacheState::Dirty,
        }
    }

    /// Snapshot of the live graph.
    pub fn graph(&self) -> Option<Arc<EntityGraph>> {
        self.graph.clone()
    }

    pub fn count(&self) -> usize {
        self.graph.as_ref().map(|g| g.count()).unwrap_or(0)
    }

    pub fn entities(&self) -> Vec<Arc<Entity>> {
        self.graph
            .as_ref()
            .map(|g| g.entities())
            .unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Entity>> {
        self.graph.as_ref().and_then(|g| g.get(id))
    }

    pub fn root(&self) -> Option<&Path> {
        self.built_root.as_deref()
    }

    pub fn last_report(&self) -> Option<&BuildReport> {
        self.last_report.as_ref()
    }
}

fn validate_root(folder: &Path) -> Result<PathBuf, GraphCacheError> {
    if folder.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(GraphCacheError::InvalidInput(
            "The provided top level folder is empty or only whitespace.".to_string(),
        ));
    }
    if !folder.is_dir() {
        return Err(GraphCacheError::PathNotFound(format!(
            "The specified folder does not exist: {}",
            folder.display()
        )));
    }
    Ok(folder.canonicalize()?)
}
