//! Position resolution: the "what asset is under the cursor" query. Extracts
//! candidates at a document position, consults the cache, races the rest,
//! and reports the winner with its index reference count.

use std::path::Path;

use tracing::debug;

use crate::cache::ResolutionCache;
use crate::index::AssetIndex;
use crate::mappers;
use crate::materialize::{Materializer, race_first_success};
use crate::types::{Origin, ResolvedCandidate, ResolvedResource, line_col_to_offset};
use crate::workspace::Workspace;

/// Resolve the asset reference at a 1-based (line, column) position in
/// `text`, the current content of `doc`.
///
/// Candidates whose span covers the position are resolved through the
/// mapper chain; `NotFound` candidates are discarded. A cache hit on any
/// candidate short-circuits the race. The winning materialization is cached
/// under its candidate key before returning.
pub async fn resolve_at(
    ws: &Workspace,
    materializer: &Materializer,
    cache: &mut ResolutionCache,
    index: Option<&AssetIndex>,
    doc: &Path,
    text: &str,
    line: u32,
    column: u32,
) -> ResolvedResource {
    let Some(offset) = line_col_to_offset(text, line, column) else {
        return ResolvedResource::NotFound;
    };

    let ctx = ws.resolve_context_for(doc);
    let candidates: Vec<ResolvedCandidate> = ws
        .matcher
        .find_at(text, offset)
        .into_iter()
        .filter(|raw| raw.span.contains(offset))
        .map(|raw| mappers::resolve(doc, &raw.value, raw.span, &ctx))
        .filter(|candidate| !matches!(candidate, ResolvedCandidate::NotFound))
        .collect();

    if candidates.is_empty() {
        return ResolvedResource::NotFound;
    }

    // Cache consultation before any materialization work.
    for candidate in &candidates {
        if let Some(key) = candidate.cache_key()
            && let Some(resource) = cache.get(&key)
        {
            debug!(key, "cache hit");
            return found(resource, index);
        }
    }

    let races = candidates
        .iter()
        .map(|candidate| async move {
            let resource = materializer.materialize(candidate).await?;
            Ok((candidate.cache_key(), resource))
        })
        .collect();

    match race_first_success(races).await {
        Some((key, resource)) => {
            if let Some(key) = key {
                cache.set(key, resource.clone());
            }
            found(resource, index)
        }
        None => ResolvedResource::NotFound,
    }
}

fn found(
    resource: crate::types::MaterializedResource,
    index: Option<&AssetIndex>,
) -> ResolvedResource {
    // Reference counts only exist for workspace files the index tracks.
    let reference_count = match (resource.origin, index) {
        (Origin::File, Some(index)) => index.reference_count(&resource.local_path),
        _ => 0,
    };
    ResolvedResource::Found {
        reference_count,
        resource,
    }
}
