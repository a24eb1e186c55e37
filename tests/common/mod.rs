//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use parking_lot::Mutex;
use std::{
    path::{Path, PathBuf},
    sync::{mpsc::Sender, Arc},
};
use tempfile::TempDir;
use xmlgraph::{event::WorkspaceEvent, watch::ChangeNotifier, GraphCacheError};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Create the family corpus: `a.xml` holds Alice (p1) with child Bob (p2) and an outgoing
/// `Child` reference to Carol (p3), who lives in `people/carol.xml`.
#[allow(dead_code)]
pub fn create_family(temp_dir: &TempDir) -> PathBuf {
    let root = temp_dir.path().join("family");
    write_file(
        &root,
        "a.xml",
        r#"<Person Guid="p1" Name="Alice"><Person Guid="p2" Name="Bob"/><ChildRef RefId="p3" RefDirection="out"/></Person>"#,
    );
    write_file(
        &root,
        "people/carol.xml",
        r#"<?xml version="1.0" encoding="utf-8"?>
<People>
  <Person Guid="p3" Name="Carol"/>
</People>"#,
    );
    root
}

/// What a [`ManualNotifier`] has been asked to do.
#[derive(Default)]
#[allow(dead_code)]
pub struct NotifierLog {
    pub subscriptions: Vec<PathBuf>,
    pub unsubscribes: usize,
    pub sender: Option<Sender<WorkspaceEvent>>,
}

/// Change notifier driven by the test: events are sent by hand through [`ManualNotifier::fire`].
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct ManualNotifier {
    pub log: Arc<Mutex<NotifierLog>>,
    pub fail_subscribe: bool,
}

#[allow(dead_code)]
impl ManualNotifier {
    pub fn failing() -> Self {
        ManualNotifier {
            fail_subscribe: true,
            ..Default::default()
        }
    }

    pub fn fire(&self, event: WorkspaceEvent) {
        let log = self.log.lock();
        let sender = log.sender.as_ref().expect("cache subscribed");
        sender.send(event).unwrap();
    }

    pub fn subscriptions(&self) -> Vec<PathBuf> {
        self.log.lock().subscriptions.clone()
    }
}

impl ChangeNotifier for ManualNotifier {
    fn subscribe(
        &mut self,
        root: &Path,
        tx: Sender<WorkspaceEvent>,
    ) -> Result<(), GraphCacheError> {
        if self.fail_subscribe {
            return Err(GraphCacheError::Watch("subscription refused".to_string()));
        }
        let mut log = self.log.lock();
        log.subscriptions.push(root.to_path_buf());
        log.sender = Some(tx);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        let mut log = self.log.lock();
        log.unsubscribes += 1;
        log.sender = None;
    }
}
