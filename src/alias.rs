//! Path-alias resolution: discovers project configuration files under the
//! workspace root, parses their path-mapping declarations, and answers
//! "which alias table applies to this source file" by nearest-ancestor
//! directory match.
//!
//! Malformed or mapping-less configuration files are skipped silently — a
//! monorepo with one broken `tsconfig.json` still resolves everything else.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// Dependency and build-output directories never walked for configuration.
const SKIP_DIRS: &[&str] = &["node_modules", "target", "dist", "build", "out", "vendor"];

/// One alias mapping: a path prefix and the absolute directory it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    /// The alias prefix as written in references (wildcard suffix stripped).
    pub prefix: String,
    /// Absolute directory the prefix substitutes to.
    pub target: PathBuf,
}

/// The alias table declared by one configuration file.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    /// Declared mappings, in declaration order.
    pub entries: Vec<AliasEntry>,
}

impl AliasTable {
    /// Table with no mappings; the result for files outside any config scope.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// All alias tables discovered under one workspace root, ready for
/// per-source-file lookup. An explicit instance, constructed at startup and
/// handed to whoever resolves — never module-level shared state.
pub struct AliasResolver {
    empty: AliasTable,
    /// (declaring directory, table), as discovered.
    tables: Vec<(PathBuf, AliasTable)>,
}

/// Parse result for one recognized configuration file. Tagged by shape so
/// downstream code never probes dynamic JSON.
enum ConfigShape {
    /// `compilerOptions.baseUrl` + `compilerOptions.paths` (tsconfig/jsconfig).
    CompilerOptions {
        base_url: Option<String>,
        paths: BTreeMap<String, Vec<String>>,
    },
    /// Top-level `alias` map (package.json, Parcel-style).
    PackageAlias { alias: BTreeMap<String, String> },
    /// Parsed fine but declares no mappings, or did not parse at all.
    NoMapping,
}

/// Raw tsconfig/jsconfig structure, only the fields we read.
#[derive(serde::Deserialize)]
struct CompilerOptionsFile {
    #[serde(rename = "compilerOptions", default)]
    compiler_options: Option<CompilerOptionsSection>,
}

#[derive(serde::Deserialize)]
struct CompilerOptionsSection {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    #[serde(default)]
    paths: Option<BTreeMap<String, Vec<String>>>,
}

/// Raw package.json structure, only the alias field.
#[derive(serde::Deserialize)]
struct PackageAliasFile {
    #[serde(default)]
    alias: Option<BTreeMap<String, String>>,
}

impl AliasResolver {
    /// Resolver with no tables at all.
    pub fn empty() -> Self {
        Self {
            empty: AliasTable::empty(),
            tables: Vec::new(),
        }
    }

    /// Discover and parse every recognized configuration file under `root`,
    /// skipping hidden and dependency directories. Never fails: unreadable
    /// or malformed files are skipped.
    pub fn load(root: &Path) -> Self {
        let mut tables = Vec::new();
        let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            let hidden = name.starts_with('.') && name.len() > 1 && e.depth() > 0;
            !(hidden || (e.file_type().is_dir() && SKIP_DIRS.contains(&name.as_ref())))
        });

        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name != "tsconfig.json" && name != "jsconfig.json" && name != "package.json" {
                continue;
            }
            let Some(dir) = entry.path().parent() else { continue };
            let table = load_table(entry.path(), dir);
            if !table.entries.is_empty() {
                tables.push((dir.to_path_buf(), table));
            }
        }

        Self {
            empty: AliasTable::empty(),
            tables,
        }
    }

    /// The alias table whose declaring directory is the nearest ancestor of
    /// `path` — longest matching prefix among all loaded tables. Empty table
    /// when no config scopes the file.
    pub fn resolve_for_file(&self, path: &Path) -> &AliasTable {
        self.tables
            .iter()
            .filter(|(dir, _)| path.starts_with(dir))
            .max_by_key(|(dir, _)| dir.components().count())
            .map_or(&self.empty, |(_, table)| table)
    }

    /// Number of loaded tables (diagnostic output).
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// Parse one configuration file into an alias table. Mapping-less and
/// malformed files produce an empty table.
fn load_table(path: &Path, dir: &Path) -> AliasTable {
    let shape = parse_config_file(path);
    let mut entries = Vec::new();
    match shape {
        ConfigShape::CompilerOptions { base_url, paths } => {
            let base = dir.join(base_url.as_deref().unwrap_or("."));
            for (pattern, targets) in &paths {
                // Only the first target participates; multi-target fallback
                // chains are not resolved.
                let Some(first) = targets.first() else { continue };
                entries.push(AliasEntry {
                    prefix: strip_wildcard(pattern),
                    target: crate::mappers::normalize_path(&base.join(strip_wildcard(first))),
                });
            }
        }
        ConfigShape::PackageAlias { alias } => {
            for (pattern, target) in &alias {
                entries.push(AliasEntry {
                    prefix: strip_wildcard(pattern),
                    target: crate::mappers::normalize_path(&dir.join(strip_wildcard(target))),
                });
            }
        }
        ConfigShape::NoMapping => {}
    }
    AliasTable { entries }
}

/// Parse a config file into its tagged shape. All failure modes collapse to
/// `NoMapping`.
fn parse_config_file(path: &Path) -> ConfigShape {
    let Ok(content) = std::fs::read_to_string(path) else {
        debug!(path = %path.display(), "alias config unreadable, skipped");
        return ConfigShape::NoMapping;
    };

    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    if file_name.as_deref() == Some("package.json") {
        return match serde_json::from_str::<PackageAliasFile>(&content) {
            Ok(PackageAliasFile { alias: Some(alias) }) if !alias.is_empty() => {
                ConfigShape::PackageAlias { alias }
            }
            Ok(_) => ConfigShape::NoMapping,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "alias config malformed, skipped");
                ConfigShape::NoMapping
            }
        };
    }

    match serde_json::from_str::<CompilerOptionsFile>(&content) {
        Ok(CompilerOptionsFile {
            compiler_options: Some(section),
        }) => {
            let paths = section.paths.unwrap_or_default();
            if paths.is_empty() {
                ConfigShape::NoMapping
            } else {
                ConfigShape::CompilerOptions {
                    base_url: section.base_url,
                    paths,
                }
            }
        }
        Ok(_) => ConfigShape::NoMapping,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "alias config malformed, skipped");
            ConfigShape::NoMapping
        }
    }
}

/// Strip a trailing `*` from an alias pattern or target, leaving a plain
/// prefix or directory path.
fn strip_wildcard(pattern: &str) -> String {
    let no_star = pattern.strip_suffix('*').unwrap_or(pattern);
    no_star.to_string()
}
