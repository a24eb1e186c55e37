use std::path::PathBuf;

/// A change observed under a watched folder. The cache only uses these to mark itself dirty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
    /// From, To
    Renamed(PathBuf, PathBuf),
    /// The notifier may have missed events and the whole tree should be considered changed.
    Rescan,
}

impl WorkspaceEvent {
    pub fn paths(&self) -> Vec<&PathBuf> {
        match self {
            WorkspaceEvent::Created(p) | WorkspaceEvent::Modified(p) | WorkspaceEvent::Removed(p) => {
                vec![p]
            }
            WorkspaceEvent::Renamed(from, to) => vec![from, to],
            WorkspaceEvent::Rescan => vec![],
        }
    }
}
