//! The workspace context: root directory, configuration, compiled matcher,
//! and discovered alias tables, bundled so every operation works from one
//! explicit instance.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::alias::AliasResolver;
use crate::config::Config;
use crate::error::Error;
use crate::mappers::ResolveContext;
use crate::matcher::Matcher;

/// One opened workspace. Construction does all the up-front work: config
/// load, regex compilation, and alias discovery.
pub struct Workspace {
    /// Discovered alias tables.
    pub aliases: AliasResolver,
    /// Parsed `.assetref.toml`, or defaults.
    pub config: Config,
    /// Compiled reference grammar.
    pub matcher: Matcher,
    /// Absolute workspace root.
    pub root: PathBuf,
}

impl Workspace {
    /// Open the workspace rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error when `root` is not a directory or the configuration
    /// file is present but invalid.
    pub fn open(root: &Path) -> Result<Self, Error> {
        let root = match root.canonicalize() {
            Ok(root) if root.is_dir() => root,
            _ => {
                return Err(Error::NoWorkspace {
                    path: root.to_path_buf(),
                });
            }
        };
        let config = Config::load(&root)?;
        let aliases = AliasResolver::load(&root);
        info!(
            root = %root.display(),
            alias_tables = aliases.table_count(),
            "workspace opened"
        );
        Ok(Self {
            aliases,
            config,
            matcher: Matcher::new(),
            root,
        })
    }

    /// The resolution context for references declared in `doc`.
    pub fn resolve_context_for(&self, doc: &Path) -> ResolveContext<'_> {
        ResolveContext {
            aliases: self.aliases.resolve_for_file(doc),
            extra_roots: &self.config.extra_roots,
            images_dir: self.config.images_dir.as_deref(),
            workspace_root: &self.root,
        }
    }
}
