//! Workspace configuration, read from `.assetref.toml` at the workspace
//! root. A missing file means defaults; a present-but-malformed file is a
//! hard error so typos never silently change scan scope.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// Configuration file name looked up at the workspace root.
pub const CONFIG_FILE: &str = ".assetref.toml";

/// Parsed workspace configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Include globs narrowing the scan; empty means everything.
    pub include: Vec<String>,
    /// Exclude globs; these always win over includes.
    pub exclude: Vec<String>,
    /// Workspace-root-relative directories tried as extra resolution roots.
    pub extra_roots: Vec<String>,
    /// Directory name joined under a document's directory as a resolution
    /// hint (e.g. `images` for markdown trees).
    pub images_dir: Option<String>,
    /// Resolution cache tuning.
    pub cache: CacheConfig,
}

/// Cache tuning knobs. Floors are enforced by the cache itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of cached materializations.
    pub max_entries: usize,
    /// Entry time-to-live in seconds, measured from creation.
    pub max_age_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            extra_roots: vec!["assets".to_string(), "static".to_string()],
            images_dir: None,
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
            max_age_secs: crate::cache::DEFAULT_MAX_AGE.as_secs(),
        }
    }
}

impl Config {
    /// Load configuration from `root`. Missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// The configured cache TTL as a duration.
    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache.max_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn workspace(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("assetref-config-{name}"));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    #[test]
    fn missing_file_yields_defaults() {
        let root = workspace("missing");
        let config = Config::load(&root).unwrap();
        assert!(config.include.is_empty());
        assert_eq!(config.extra_roots, vec!["assets", "static"]);
        assert_eq!(config.cache.max_entries, 200);
    }

    #[test]
    fn parses_full_file() {
        let root = workspace("full");
        std::fs::write(
            root.join(CONFIG_FILE),
            r#"
include = ["src/**"]
exclude = ["src/generated/**"]
extra_roots = ["public"]
images_dir = "images"

[cache]
max_entries = 50
max_age_secs = 120
"#,
        )
        .unwrap();

        let config = Config::load(&root).unwrap();
        assert_eq!(config.include, vec!["src/**"]);
        assert_eq!(config.extra_roots, vec!["public"]);
        assert_eq!(config.images_dir.as_deref(), Some("images"));
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.cache_max_age(), Duration::from_secs(120));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let root = workspace("malformed");
        std::fs::write(root.join(CONFIG_FILE), "include = 42").unwrap();
        assert!(matches!(Config::load(&root), Err(Error::TomlDe(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let root = workspace("unknown");
        std::fs::write(root.join(CONFIG_FILE), "inclde = []").unwrap();
        assert!(Config::load(&root).is_err());
    }
}
