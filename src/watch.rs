//! Filesystem watching: drives incremental index updates from editor saves
//! and external file changes. Events are debounced so a burst of writes to
//! one file costs one re-extraction.

use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::{Receiver, unbounded};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as _};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::index::AssetIndex;
use crate::types::is_text_source;
use crate::workspace::Workspace;

/// Quiet period after the first event before a batch is processed.
const DEBOUNCE: Duration = Duration::from_millis(300);

/// Watch the workspace and apply incremental index updates until the event
/// stream closes. Deleted or unreadable sources are treated as empty, which
/// clears their reference records.
///
/// # Errors
///
/// Returns an error when the watcher cannot be created or started.
pub fn run(ws: &Workspace, index: &mut AssetIndex) -> Result<(), Error> {
    let (tx, rx) = unbounded::<Result<Event, notify::Error>>();
    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |event| {
            let _ = tx.send(event);
        })
        .map_err(|e| Error::Watch {
            reason: e.to_string(),
        })?;
    watcher
        .watch(&ws.root, RecursiveMode::Recursive)
        .map_err(|e| Error::Watch {
            reason: e.to_string(),
        })?;

    info!(root = %ws.root.display(), "watching for changes");
    event_loop(&rx, ws, index);
    Ok(())
}

/// Debounced event loop, separated from watcher setup so tests can feed a
/// channel directly.
fn event_loop(
    rx: &Receiver<Result<Event, notify::Error>>,
    ws: &Workspace,
    index: &mut AssetIndex,
) {
    while let Ok(first) = rx.recv() {
        let mut changed = Vec::new();
        collect_paths(first, &mut changed);
        // Drain the burst.
        while let Ok(event) = rx.recv_timeout(DEBOUNCE) {
            collect_paths(event, &mut changed);
        }

        changed.sort();
        changed.dedup();
        for path in changed {
            let content = std::fs::read_to_string(&path).unwrap_or_default();
            index.update_file_references(&path, &content, ws);
            debug!(path = %path.display(), "reindexed after change");
        }
    }
}

/// Text-source paths from one watcher event. Asset binaries and everything
/// else are ignored; index membership for assets is refreshed by full scans.
fn collect_paths(event: Result<Event, notify::Error>, out: &mut Vec<PathBuf>) {
    match event {
        Ok(event) => {
            for path in event.paths {
                if is_text_source(&path) {
                    out.push(path);
                }
            }
        }
        Err(e) => warn!(error = %e, "watch event error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use notify::event::{CreateKind, ModifyKind};

    fn workspace(name: &str) -> Workspace {
        let root = std::env::temp_dir().join(format!("assetref-watch-{name}"));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        Workspace::open(&root).unwrap()
    }

    fn modify_event(path: PathBuf) -> Result<Event, notify::Error> {
        let mut event = Event::new(EventKind::Modify(ModifyKind::Any));
        event.paths.push(path);
        Ok(event)
    }

    #[test]
    fn collects_only_text_sources() {
        let mut out = Vec::new();
        collect_paths(modify_event(PathBuf::from("/w/a.css")), &mut out);
        collect_paths(modify_event(PathBuf::from("/w/pic.png")), &mut out);
        collect_paths(
            {
                let mut event = Event::new(EventKind::Create(CreateKind::File));
                event.paths.push(PathBuf::from("/w/b.tsx"));
                Ok(event)
            },
            &mut out,
        );
        assert_eq!(out, vec![PathBuf::from("/w/a.css"), PathBuf::from("/w/b.tsx")]);
    }

    #[test]
    fn event_loop_applies_incremental_updates() {
        let ws = workspace("loop");
        std::fs::write(ws.root.join("pic.png"), b"x").unwrap();
        std::fs::write(ws.root.join("a.css"), "a { background: url(\"pic.png\"); }")
            .unwrap();

        let mut index = AssetIndex::new();
        index.scan(&ws).unwrap();
        assert_eq!(index.reference_count(&ws.root.join("pic.png")), 1);

        // Rewrite the source to drop the reference, then feed the event.
        std::fs::write(ws.root.join("a.css"), "a { color: red; }").unwrap();
        let (tx, rx) = unbounded();
        tx.send(modify_event(ws.root.join("a.css"))).unwrap();
        drop(tx);
        event_loop(&rx, &ws, &mut index);

        assert_eq!(index.reference_count(&ws.root.join("pic.png")), 0);
        assert!(index.unused_assets().contains(&&ws.root.join("pic.png")));
    }

    #[test]
    fn deleted_file_clears_its_records() {
        let ws = workspace("deleted");
        std::fs::write(ws.root.join("pic.png"), b"x").unwrap();
        std::fs::write(ws.root.join("a.css"), "a { background: url(\"pic.png\"); }")
            .unwrap();

        let mut index = AssetIndex::new();
        index.scan(&ws).unwrap();
        std::fs::remove_file(ws.root.join("a.css")).unwrap();

        let (tx, rx) = unbounded();
        tx.send(modify_event(ws.root.join("a.css"))).unwrap();
        drop(tx);
        event_loop(&rx, &ws, &mut index);

        assert_eq!(index.reference_count(&ws.root.join("pic.png")), 0);
    }
}
