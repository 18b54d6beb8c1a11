/// Crate-level error types for assetref.
use std::path::PathBuf;

/// All errors in assetref carry enough context to produce a useful diagnostic
/// without a debugger. "Not found" resolutions are never errors — they are
/// ordinary results (`ResolvedCandidate::NotFound`, `ResolvedResource::NotFound`);
/// the variants here cover genuine failures at the I/O and configuration
/// boundaries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A data URI could not be parsed or decoded at materialization time.
    #[error("malformed data URI: {reason}")]
    DataUri {
        /// Description of what was wrong with the URI.
        reason: String,
    },

    /// A network transfer failed before a status code was available.
    #[error("download failed: {url}: {reason}")]
    Download {
        /// Description of the transport failure.
        reason: String,
        /// The URL being fetched.
        url: String,
    },

    /// An include/exclude glob pattern could not be compiled.
    #[error("invalid glob `{pattern}`: {reason}")]
    Glob {
        /// The offending pattern as written in configuration.
        pattern: String,
        /// Description of the compile failure.
        reason: String,
    },

    /// A remote server answered with a non-success status.
    #[error("http {status}: {url}")]
    HttpStatus {
        /// The HTTP status code received.
        status: u16,
        /// The URL that produced the status.
        url: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// The workspace root does not exist or is not a directory.
    #[error("no workspace at {}", path.display())]
    NoWorkspace {
        /// The path that was expected to be a workspace root.
        path: PathBuf,
    },

    /// TOML deserialization failed for `.assetref.toml`.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A redirect chain exceeded the single permitted hop.
    #[error("too many redirects: {url}")]
    TooManyRedirects {
        /// The URL whose redirect chain was abandoned.
        url: String,
    },

    /// A resolved file exists but cannot be opened for reading.
    #[error("unreadable: {}", path.display())]
    Unreadable {
        /// The file that could not be read.
        path: PathBuf,
    },

    /// A `NotFound` candidate reached the materializer. Races treat this as
    /// an ordinary loss, never surfaced to callers.
    #[error("candidate did not resolve to a resource")]
    Unresolved,

    /// The filesystem watcher could not be created or started.
    #[error("watcher: {reason}")]
    Watch {
        /// Description of the watcher failure.
        reason: String,
    },
}
