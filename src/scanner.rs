//! Workspace file enumeration: walks the tree once and splits what it finds
//! into resource assets and scannable text sources, honoring the configured
//! include/exclude globs.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use crate::types::{has_resource_extension, is_text_source};

/// Dependency and build-output directories never walked.
const SKIP_DIRS: &[&str] = &["node_modules", "target", "dist", "build", "out", "vendor"];

/// The two file populations a scan cares about.
#[derive(Debug, Default)]
pub struct WorkspaceFiles {
    /// Files with a tracked resource extension.
    pub assets: Vec<PathBuf>,
    /// Text source files worth scanning for references.
    pub sources: Vec<PathBuf>,
}

/// Walk `root` and classify every file, applying the configured globs.
/// Include patterns narrow the walk; exclude patterns always win.
///
/// # Errors
///
/// Returns an error when a configured glob pattern fails to compile.
pub fn enumerate(root: &Path, config: &Config) -> Result<WorkspaceFiles, Error> {
    let mut overrides = OverrideBuilder::new(root);
    for pattern in &config.include {
        overrides.add(pattern).map_err(|e| Error::Glob {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
    }
    for pattern in &config.exclude {
        // An override starting with `!` is an exclusion.
        let negated = format!("!{pattern}");
        overrides.add(&negated).map_err(|e| Error::Glob {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
    }
    let overrides = overrides.build().map_err(|e| Error::Glob {
        pattern: String::new(),
        reason: e.to_string(),
    })?;

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .overrides(overrides)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.file_type().is_some_and(|t| t.is_dir()) && SKIP_DIRS.contains(&name.as_ref()))
        })
        .build();

    let mut files = WorkspaceFiles::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "walk entry skipped");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.into_path();
        if has_resource_extension(&path) {
            files.assets.push(path);
        } else if is_text_source(&path) {
            files.sources.push(path);
        }
    }

    files.assets.sort();
    files.sources.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("assetref-scanner-{name}"));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    #[test]
    fn classifies_assets_and_sources() {
        let root = workspace("classify");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/app.tsx"), "x").unwrap();
        std::fs::write(root.join("logo.png"), "x").unwrap();
        std::fs::write(root.join("notes.txt"), "x").unwrap();

        let files = enumerate(&root, &Config::default()).unwrap();
        assert_eq!(files.assets, vec![root.join("logo.png")]);
        assert_eq!(files.sources, vec![root.join("src/app.tsx")]);
    }

    #[test]
    fn skips_dependency_directories() {
        let root = workspace("skip");
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("node_modules/pkg/icon.svg"), "x").unwrap();
        std::fs::write(root.join("icon.svg"), "x").unwrap();

        let files = enumerate(&root, &Config::default()).unwrap();
        assert_eq!(files.assets, vec![root.join("icon.svg")]);
    }

    #[test]
    fn exclude_globs_win() {
        let root = workspace("exclude");
        std::fs::create_dir_all(root.join("generated")).unwrap();
        std::fs::write(root.join("generated/out.png"), "x").unwrap();
        std::fs::write(root.join("kept.png"), "x").unwrap();

        let config = Config {
            exclude: vec!["generated/**".to_string()],
            ..Config::default()
        };
        let files = enumerate(&root, &config).unwrap();
        assert_eq!(files.assets, vec![root.join("kept.png")]);
    }

    #[test]
    fn bad_glob_is_an_error() {
        let root = workspace("badglob");
        let config = Config {
            include: vec!["{unclosed".to_string()],
            ..Config::default()
        };
        assert!(matches!(
            enumerate(&root, &config),
            Err(Error::Glob { .. })
        ));
    }
}
