//! Core CLI commands for assetref: scan, refs, unused, resolve, watch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::cache::ResolutionCache;
use crate::error::Error;
use crate::index::AssetIndex;
use crate::materialize::Materializer;
use crate::position;
use crate::types::ResolvedResource;
use crate::watch;
use crate::workspace::Workspace;

/// Scan the workspace and print the asset inventory with reference counts.
///
/// # Errors
///
/// Returns errors from workspace opening and file enumeration.
pub fn scan(root: &Path) -> Result<(), Error> {
    let ws = Workspace::open(root)?;
    let mut index = AssetIndex::new();
    index.scan(&ws)?;

    let mut referenced = 0usize;
    for asset in index.all_assets() {
        let count = index.reference_count(asset);
        if count > 0 {
            referenced += 1;
        }
        println!("{:>4}  {}", count, display_relative(&ws.root, asset));
    }
    let total = index.all_assets().count();
    println!();
    println!("{total} assets, {referenced} referenced");
    Ok(())
}

/// Print every reference site for one resource.
///
/// # Errors
///
/// Returns errors from workspace opening and file enumeration.
pub fn refs(root: &Path, resource: &Path) -> Result<ExitCode, Error> {
    let ws = Workspace::open(root)?;
    let mut index = AssetIndex::new();
    index.scan(&ws)?;

    let absolute = if resource.is_absolute() {
        resource.to_path_buf()
    } else {
        ws.root.join(resource)
    };

    let Some(record) = index.references_for(&absolute) else {
        println!("no references to {}", resource.display());
        return Ok(ExitCode::from(1));
    };
    for site in &record.sites {
        println!(
            "{}:{}:{}",
            display_relative(&ws.root, &site.file),
            site.line,
            site.column
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Print assets no source file references. Exit code 1 when any exist, so
/// the command composes with CI checks.
///
/// # Errors
///
/// Returns errors from workspace opening and file enumeration.
pub fn unused(root: &Path) -> Result<ExitCode, Error> {
    let ws = Workspace::open(root)?;
    let mut index = AssetIndex::new();
    index.scan(&ws)?;

    let unused = index.unused_assets();
    for asset in &unused {
        println!("{}", display_relative(&ws.root, asset));
    }
    if unused.is_empty() {
        println!("no unused assets");
        return Ok(ExitCode::SUCCESS);
    }
    Ok(ExitCode::from(1))
}

/// Resolve the asset reference at a document position and print what was
/// found. Exit code 1 when nothing resolves.
///
/// # Errors
///
/// Returns errors from workspace opening, file enumeration, and reading the
/// document.
pub fn resolve(root: &Path, doc: &Path, line: u32, column: u32) -> Result<ExitCode, Error> {
    let ws = Workspace::open(root)?;
    let mut index = AssetIndex::new();
    index.scan(&ws)?;

    let doc_path = if doc.is_absolute() {
        doc.to_path_buf()
    } else {
        ws.root.join(doc)
    };
    let text = std::fs::read_to_string(&doc_path)?;

    let materializer = Materializer::new();
    let mut cache = ResolutionCache::with_config(
        ws.config.cache.max_entries,
        ws.config.cache_max_age(),
    );

    // Single-threaded cooperative runtime; concurrency comes from racing
    // futures, not worker threads.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(position::resolve_at(
        &ws,
        &materializer,
        &mut cache,
        Some(&index),
        &doc_path,
        &text,
        line,
        column,
    ));

    match result {
        ResolvedResource::Found {
            reference_count,
            resource,
        } => {
            println!("path:       {}", resource.local_path.display());
            println!("origin:     {:?}", resource.origin);
            println!("kind:       {:?}", resource.kind);
            println!("size:       {} bytes", resource.byte_size);
            if let Some((w, h)) = resource.dimensions {
                println!("dimensions: {w}x{h}");
            }
            if let Some(vcs) = &resource.vcs {
                println!("last edit:  {} by {} ({})", vcs.date, vcs.author, vcs.commit);
            }
            if let Some(estimates) = &resource.optimize {
                for estimate in estimates {
                    println!(
                        "optimize:   {} ~{} bytes",
                        estimate.format, estimate.estimated_bytes
                    );
                }
            }
            println!("references: {reference_count}");
            Ok(ExitCode::SUCCESS)
        }
        ResolvedResource::NotFound => {
            println!("nothing resolved at {}:{line}:{column}", doc.display());
            Ok(ExitCode::from(1))
        }
    }
}

/// Scan, then watch the workspace and keep the index current until
/// interrupted.
///
/// # Errors
///
/// Returns errors from workspace opening, file enumeration, and watcher
/// setup.
pub fn watch(root: &Path) -> Result<(), Error> {
    let ws = Workspace::open(root)?;
    let mut index = AssetIndex::new();
    index.scan(&ws)?;
    println!("indexed {} assets, watching...", index.all_assets().count());
    watch::run(&ws, &mut index)?;
    Ok(())
}

/// Render a path relative to the workspace root when possible.
fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Parse a `file:line:column` position argument.
///
/// # Errors
///
/// Returns an I/O error describing the expected shape when the argument
/// does not parse.
pub fn parse_position(arg: &str) -> Result<(PathBuf, u32, u32), Error> {
    let bad = || {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("expected FILE:LINE:COLUMN, got `{arg}`"),
        ))
    };
    let (rest, column) = arg.rsplit_once(':').ok_or_else(bad)?;
    let (file, line) = rest.rsplit_once(':').ok_or_else(bad)?;
    let line: u32 = line.parse().map_err(|_| bad())?;
    let column: u32 = column.parse().map_err(|_| bad())?;
    if file.is_empty() || line == 0 || column == 0 {
        return Err(bad());
    }
    Ok((PathBuf::from(file), line, column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_position_argument() {
        let (file, line, column) = parse_position("src/page.html:12:34").unwrap();
        assert_eq!(file, PathBuf::from("src/page.html"));
        assert_eq!(line, 12);
        assert_eq!(column, 34);
    }

    #[test]
    fn rejects_malformed_positions() {
        assert!(parse_position("no-colons").is_err());
        assert!(parse_position("file:12").is_err());
        assert!(parse_position("file:0:1").is_err());
        assert!(parse_position("file:a:b").is_err());
    }

    #[test]
    fn windows_style_paths_keep_their_drive_colon() {
        let (file, line, column) = parse_position("C:/w/page.html:3:7").unwrap();
        assert_eq!(file, PathBuf::from("C:/w/page.html"));
        assert_eq!(line, 3);
        assert_eq!(column, 7);
    }

    #[test]
    fn relative_display_strips_root() {
        let root = Path::new("/w");
        assert_eq!(display_relative(root, Path::new("/w/a/b.png")), "a/b.png");
        assert_eq!(display_relative(root, Path::new("/x/c.png")), "/x/c.png");
    }
}
