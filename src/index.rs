//! The asset index: the workspace-wide reverse map from referenced resource
//! to every source location mentioning it, plus the asset inventory that
//! makes "unused asset" queries possible.
//!
//! Rebuilds are copy-on-write: replacement structures are built fully, then
//! swapped in, so readers never observe a half-built index.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::mappers;
use crate::scanner;
use crate::types::{
    AssetReference, ReferenceSite, ResolvedCandidate, has_resource_extension, offset_to_line_col,
};
use crate::workspace::Workspace;

/// Lifecycle of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Never scanned.
    Empty,
    /// A full scan is in progress.
    Scanning,
    /// A full scan completed.
    Ready,
    /// Incrementally updated since the last full scan.
    PartiallyUpdated,
}

/// Notification pushed to subscribers whenever index contents change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEvent {
    /// Contents changed; re-query what you care about.
    Changed,
}

/// The index itself. One instance per workspace, owned by the caller.
pub struct AssetIndex {
    /// Every file in the workspace with a tracked resource extension.
    assets: BTreeSet<PathBuf>,
    /// Resource path to the sites that reference it.
    references: HashMap<PathBuf, AssetReference>,
    state: IndexState,
    subscribers: Vec<Sender<IndexEvent>>,
}

impl AssetIndex {
    /// An empty, never-scanned index.
    pub fn new() -> Self {
        Self {
            assets: BTreeSet::new(),
            references: HashMap::new(),
            state: IndexState::Empty,
            subscribers: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> IndexState {
        self.state
    }

    /// Register a change subscriber. Every mutation that lands sends one
    /// event; disconnected receivers are pruned lazily.
    pub fn subscribe(&mut self) -> Receiver<IndexEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Full workspace scan: enumerate files, extract and resolve every
    /// reference in every text source, then atomically replace the previous
    /// contents. Unreadable sources are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error when file enumeration fails (bad glob).
    pub fn scan(&mut self, ws: &Workspace) -> Result<(), Error> {
        self.state = IndexState::Scanning;
        let files = scanner::enumerate(&ws.root, &ws.config)?;

        let mut assets: BTreeSet<PathBuf> = files.assets.into_iter().collect();
        let mut references: HashMap<PathBuf, AssetReference> = HashMap::new();

        for source in &files.sources {
            let content = match std::fs::read_to_string(source) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %source.display(), error = %e, "source unreadable, skipped");
                    continue;
                }
            };
            for (resource, site) in collect_file_references(ws, source, &content) {
                references
                    .entry(resource.clone())
                    .or_insert_with(|| AssetReference::new(resource))
                    .sites
                    .push(site);
            }
        }

        // Referenced resources outside the enumerated asset set (alias
        // targets outside include globs, for instance) still belong in the
        // inventory.
        for resource in references.keys() {
            assets.insert(resource.clone());
        }

        self.assets = assets;
        self.references = references;
        self.state = IndexState::Ready;
        info!(
            assets = self.assets.len(),
            referenced = self.references.len(),
            "index scan complete"
        );
        self.notify();
        Ok(())
    }

    /// Incremental update for one source file: drop every site previously
    /// recorded for it, re-extract from `content`, and merge. Records for
    /// other files are untouched. Pass empty content for a deleted file.
    pub fn update_file_references(&mut self, file: &Path, content: &str, ws: &Workspace) {
        self.references.retain(|_, reference| {
            reference.sites.retain(|site| site.file != file);
            !reference.sites.is_empty()
        });

        for (resource, site) in collect_file_references(ws, file, content) {
            self.assets.insert(resource.clone());
            self.references
                .entry(resource.clone())
                .or_insert_with(|| AssetReference::new(resource))
                .sites
                .push(site);
        }

        if self.state == IndexState::Ready || self.state == IndexState::PartiallyUpdated {
            self.state = IndexState::PartiallyUpdated;
        }
        debug!(file = %file.display(), "index updated incrementally");
        self.notify();
    }

    /// The reference record for one resource, if any source mentions it.
    pub fn references_for(&self, resource: &Path) -> Option<&AssetReference> {
        self.references.get(resource)
    }

    /// Number of reference sites recorded for one resource.
    pub fn reference_count(&self, resource: &Path) -> usize {
        self.references
            .get(resource)
            .map_or(0, |r| r.sites.len())
    }

    /// Every known asset, ordered.
    pub fn all_assets(&self) -> impl Iterator<Item = &PathBuf> {
        self.assets.iter()
    }

    /// Assets no source file references.
    pub fn unused_assets(&self) -> Vec<&PathBuf> {
        self.assets
            .iter()
            .filter(|asset| !self.references.contains_key(*asset))
            .collect()
    }

    /// Every reference record, in resource order.
    pub fn all_references(&self) -> Vec<&AssetReference> {
        let mut records: Vec<&AssetReference> = self.references.values().collect();
        records.sort_by(|a, b| a.resource.cmp(&b.resource));
        records
    }

    fn notify(&mut self) {
        self.subscribers.retain(|tx| tx.send(IndexEvent::Changed).is_ok());
    }
}

impl Default for AssetIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract every file-backed resource reference from one source file's
/// content. Network and base64 references have no workspace identity and do
/// not participate in indexing.
pub fn collect_file_references(
    ws: &Workspace,
    file: &Path,
    content: &str,
) -> Vec<(PathBuf, ReferenceSite)> {
    let ctx = ws.resolve_context_for(file);
    let mut out = Vec::new();
    for raw in ws.matcher.find_all(content) {
        let candidate = mappers::resolve(file, &raw.value, raw.span, &ctx);
        if let ResolvedCandidate::File { path, span } = candidate {
            if !has_resource_extension(&path) {
                continue;
            }
            let (line, column) = offset_to_line_col(content, span.start);
            out.push((
                path,
                ReferenceSite {
                    column,
                    file: file.to_path_buf(),
                    line,
                },
            ));
        }
    }
    out
}
