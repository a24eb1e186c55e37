//! Change notification for the folder a [`GraphCache`](crate::cache::GraphCache) was built from.
//!
//! A [`ChangeNotifier`] is handed the sending half of a channel when the cache starts
//! serving a folder. It pushes [`WorkspaceEvent`]s into that channel and does nothing else;
//! the cache drains the channel when it next needs to decide whether to rebuild. Nothing is
//! shared between the two besides the channel.
//!
//! With the `service` feature, [`FsNotifier`] watches the folder recursively through
//! `notify-debouncer-full`, reporting only files with a configured extension and ignoring
//! dot files. [`NullNotifier`] reports nothing, so a cache using it only rebuilds when asked
//! to.

use std::{path::Path, sync::mpsc::Sender};

use crate::{error::GraphCacheError, event::WorkspaceEvent};

pub trait ChangeNotifier: Send {
    /// Starts reporting changes under `root` into `tx`, releasing any previous subscription.
    fn subscribe(
        &mut self,
        root: &Path,
        tx: Sender<WorkspaceEvent>,
    ) -> Result<(), GraphCacheError>;

    fn unsubscribe(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl ChangeNotifier for NullNotifier {
    fn subscribe(
        &mut self,
        root: &Path,
        _tx: Sender<WorkspaceEvent>,
    ) -> Result<(), GraphCacheError> {
        tracing::debug!("[NullNotifier] not watching {:?}", root);
        Ok(())
    }

    fn unsubscribe(&mut self) {}
}

#[cfg(feature = "service")]
pub use fs::FsNotifier;

#[cfg(feature = "service")]
mod fs {
    use notify_debouncer_full::{
        new_debouncer,
        notify::{
            event::{ModifyKind, RenameMode},
            Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
        },
        DebounceEventResult, Debouncer, FileIdMap,
    };
    use std::{
        path::{Path, PathBuf},
        sync::mpsc::Sender,
        time::Duration,
    };

    use super::ChangeNotifier;
    use crate::{config::GraphConfig, error::GraphCacheError, event::WorkspaceEvent};

    /// A file system watcher with debouncing
    type FolderWatcher = Debouncer<RecommendedWatcher, FileIdMap>;

    pub struct FsNotifier {
        debounce: Duration,
        extensions: Vec<String>,
        active: Option<(PathBuf, FolderWatcher)>,
    }

    impl FsNotifier {
        pub fn new(config: &GraphConfig) -> Self {
            FsNotifier {
                debounce: config.debounce(),
                extensions: config.extensions.clone(),
                active: None,
            }
        }

        pub fn watched_root(&self) -> Option<&Path> {
            self.active.as_ref().map(|(root, _)| root.as_path())
        }
    }

    impl ChangeNotifier for FsNotifier {
        fn subscribe(
            &mut self,
            root: &Path,
            tx: Sender<WorkspaceEvent>,
        ) -> Result<(), GraphCacheError> {
            self.unsubscribe();

            let extensions = self.extensions.clone();
            let mut debouncer = new_debouncer(
                self.debounce,
                None,
                move |result: DebounceEventResult| match result {
                    Ok(events) => {
                        for event in events.iter() {
                            for change in translate(&event.event, &extensions) {
                                tracing::debug!("[FsNotifier] {:?}", change);
                                if tx.send(change).is_err() {
                                    // Receiver is gone, the cache was dropped.
                                    return;
                                }
                            }
                        }
                    }
                    Err(errors) => {
                        tracing::error!("[FsNotifier] watcher returned errors: {:?}", errors);
                        tx.send(WorkspaceEvent::Rescan).ok();
                    }
                },
            )?;
            debouncer
                .watcher()
                .watch(root, RecursiveMode::Recursive)?;
            tracing::info!("[FsNotifier] watching {:?}", root);
            self.active = Some((root.to_path_buf(), debouncer));
            Ok(())
        }

        fn unsubscribe(&mut self) {
            if let Some((root, mut debouncer)) = self.active.take() {
                let unwatch_res = debouncer.watcher().unwatch(&root);
                tracing::debug!("[FsNotifier] unwatch({:?}) = {:?}", root, unwatch_res);
                debouncer.stop();
            }
        }
    }

    impl Drop for FsNotifier {
        fn drop(&mut self) {
            self.unsubscribe();
        }
    }

    fn is_watched_file(path: &Path, extensions: &[String]) -> bool {
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|s| s.starts_with('.'))
            .unwrap_or(false);
        !hidden
            && path
                .extension()
                .map(|ext| extensions.iter().any(|ce| ce.as_str() == ext))
                .unwrap_or(false)
    }

    /// Maps one notify event onto workspace events, dropping paths outside the filter.
    pub(crate) fn translate(event: &Event, extensions: &[String]) -> Vec<WorkspaceEvent> {
        if event.need_rescan() {
            return vec![WorkspaceEvent::Rescan];
        }
        let watched: Vec<&PathBuf> = event
            .paths
            .iter()
            .filter(|p| is_watched_file(p, extensions))
            .collect();
        if watched.is_empty() {
            return Vec::new();
        }
        match event.kind {
            EventKind::Create(_) => watched
                .into_iter()
                .map(|p| WorkspaceEvent::Created(p.clone()))
                .collect(),
            EventKind::Remove(_) => watched
                .into_iter()
                .map(|p| WorkspaceEvent::Removed(p.clone()))
                .collect(),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
                vec![WorkspaceEvent::Renamed(
                    event.paths[0].clone(),
                    event.paths[1].clone(),
                )]
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => watched
                .into_iter()
                .map(|p| WorkspaceEvent::Removed(p.clone()))
                .collect(),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => watched
                .into_iter()
                .map(|p| WorkspaceEvent::Created(p.clone()))
                .collect(),
            EventKind::Modify(_) => watched
                .into_iter()
                .map(|p| WorkspaceEvent::Modified(p.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use notify_debouncer_full::notify::event::{CreateKind, DataChange, Flag};

        fn xml() -> Vec<String> {
            vec!["xml".to_string()]
        }

        #[test]
        fn only_matching_files_are_reported() {
            let event = Event::new(EventKind::Create(CreateKind::File))
                .add_path(PathBuf::from("/w/a.xml"))
                .add_path(PathBuf::from("/w/a.txt"))
                .add_path(PathBuf::from("/w/.a.xml"));
            assert_eq!(
                translate(&event, &xml()),
                vec![WorkspaceEvent::Created(PathBuf::from("/w/a.xml"))]
            );
        }

        #[test]
        fn renames_keep_both_ends() {
            let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
                .add_path(PathBuf::from("/w/old.xml"))
                .add_path(PathBuf::from("/w/new.tmp"));
            assert_eq!(
                translate(&event, &xml()),
                vec![WorkspaceEvent::Renamed(
                    PathBuf::from("/w/old.xml"),
                    PathBuf::from("/w/new.tmp")
                )]
            );
        }

        #[test]
        fn content_changes_are_modifications() {
            let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                .add_path(PathBuf::from("/w/a.xml"));
            assert_eq!(
                translate(&event, &xml()),
                vec![WorkspaceEvent::Modified(PathBuf::from("/w/a.xml"))]
            );
        }

        #[test]
        fn rescan_flag_wins() {
            let event = Event::new(EventKind::Other).set_flag(Flag::Rescan);
            assert_eq!(translate(&event, &xml()), vec![WorkspaceEvent::Rescan]);
        }

        #[test]
        fn access_events_are_ignored() {
            let event = Event::new(EventKind::Access(
                notify_debouncer_full::notify::event::AccessKind::Any,
            ))
            .add_path(PathBuf::from("/w/a.xml"));
            assert!(translate(&event, &xml()).is_empty());
        }
    }
}
