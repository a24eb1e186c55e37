//! One complete graph build over a folder.
//!
//! [`GraphBuilder::build`] traverses the folder, extracts every matching document into a
//! fresh [`EntityStore`], resolves it and returns the frozen [`EntityGraph`] together with a
//! [`BuildReport`]. Per-file failures and duplicate ids end up in the report; only a folder
//! that cannot be walked at all fails the build.

use parking_lot::Mutex;
use std::{
    fs::read,
    path::Path,
    time::{Duration, Instant},
};

use crate::{
    codec::{decode_document, EntityCodec, XmlCodec},
    config::GraphConfig,
    error::GraphCacheError,
    resolve::{ResolveStats, Resolver},
    store::{EntityGraph, EntityStore},
    traverse,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub files_visited: usize,
    pub entities: usize,
    /// Recoverable errors met during the build, duplicates and extraction failures.
    pub diagnostics: Vec<GraphCacheError>,
    pub resolve: ResolveStats,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn duplicates(&self) -> impl Iterator<Item = &GraphCacheError> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, GraphCacheError::DuplicateIdentifier { .. }))
    }

    pub fn extraction_failures(&self) -> impl Iterator<Item = &GraphCacheError> {
        self.diagnostics
            .iter()
            .filter(|d| !matches!(d, GraphCacheError::DuplicateIdentifier { .. }))
    }
}

pub struct GraphBuilder {
    config: GraphConfig,
    codec: Box<dyn EntityCodec>,
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        let codec = Box::new(XmlCodec::new(config.clone()));
        GraphBuilder { config, codec }
    }

    pub fn with_codec(config: GraphConfig, codec: Box<dyn EntityCodec>) -> Self {
        GraphBuilder { config, codec }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Extracts one file into `store`. Duplicate ids are pushed to `diagnostics`; the file's
    /// other entities are still inserted.
    fn ingest_file(
        &self,
        path: &Path,
        store: &EntityStore,
        diagnostics: &Mutex<Vec<GraphCacheError>>,
    ) -> Result<(), GraphCacheError> {
        let bytes = read(path)
            .map_err(|e| GraphCacheError::extraction(path, None, format!("read failed: {e}")))?;
        let content = decode_document(&bytes, path)?;
        let entities = self.codec.extract(&content, path)?;
        tracing::debug!(
            "[GraphBuilder] {:?}: {} entities extracted",
            path,
            entities.len()
        );
        for entity in entities {
            if let Err(duplicate) = store.insert(entity) {
                tracing::warn!("[GraphBuilder] {duplicate}");
                diagnostics.lock().push(duplicate);
            }
        }
        Ok(())
    }

    pub fn build(&self, root: &Path) -> Result<(EntityGraph, BuildReport), GraphCacheError> {
        let started = Instant::now();
        let store = EntityStore::new();
        let duplicates = Mutex::new(Vec::new());

        let traversal = traverse::for_each_file(root, &self.config, |path| {
            self.ingest_file(path, &store, &duplicates)
        })?;
        for failure in traversal.failures.iter() {
            tracing::warn!("[GraphBuilder] {failure}");
        }

        let resolve = Resolver::new(&store, &self.config.ref_suffix)
            .resolve_all(self.config.parallel_threshold());

        let mut diagnostics = traversal.failures;
        diagnostics.extend(duplicates.into_inner());
        let report = BuildReport {
            files_visited: traversal.files_visited,
            entities: store.count(),
            diagnostics,
            resolve,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "[GraphBuilder] built {} entities from {} files under {:?} in {:?} ({} diagnostics)",
            report.entities,
            report.files_visited,
            root,
            report.elapsed,
            report.diagnostics.len()
        );
        Ok((EntityGraph::from(store), report))
    }
}
