//! Candidate materialization: turns a resolved candidate into a locally
//! readable file plus whatever metadata the collaborators can supply, and
//! hosts the race combinator that picks the first successful candidate.
//!
//! Temp files spilled for base64 and network origins are persisted for the
//! lifetime of the host process and never garbage-collected.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::StreamExt as _;
use futures::stream::FuturesUnordered;
use tracing::{debug, warn};

use crate::error::Error;
use crate::meta::{GitProbe, HeaderProbe, MetadataProbe, OptimizeEstimator, RatioEstimator, VcsProbe};
use crate::types::{
    MaterializedResource, Origin, ResolvedCandidate, ResourceKind, Span, extension_for_mime,
    extension_of,
};

/// Materializes candidates into locally readable resources. Owns the HTTP
/// client and the metadata collaborators; an explicit instance handed around
/// by the caller.
pub struct Materializer {
    client: reqwest::Client,
    estimator: Box<dyn OptimizeEstimator>,
    metadata: Box<dyn MetadataProbe>,
    vcs: Box<dyn VcsProbe>,
}

impl Materializer {
    /// Materializer with the default collaborators. Redirects are handled
    /// manually so the single-hop limit is enforced.
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("http client");
        Self {
            client,
            estimator: Box::new(RatioEstimator),
            metadata: Box::new(HeaderProbe),
            vcs: Box::new(GitProbe),
        }
    }

    /// Materializer with explicit collaborators, for tests and embedders.
    pub fn with_collaborators(
        metadata: Box<dyn MetadataProbe>,
        estimator: Box<dyn OptimizeEstimator>,
        vcs: Box<dyn VcsProbe>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("http client");
        Self {
            client,
            estimator,
            metadata,
            vcs,
        }
    }

    /// Materialize one candidate: verify or produce a locally readable file,
    /// then enrich it with collaborator metadata.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is unreadable, the data URI is
    /// malformed, the download fails, or a `NotFound` candidate is passed.
    pub async fn materialize(
        &self,
        candidate: &ResolvedCandidate,
    ) -> Result<MaterializedResource, Error> {
        let (local_path, origin, byte_size, span) = match candidate {
            ResolvedCandidate::File { path, span } => {
                let metadata =
                    std::fs::metadata(path).map_err(|_| Error::Unreadable { path: path.clone() })?;
                // Readability is the contract; an existing-but-unopenable
                // file must fail here, not at the consumer.
                std::fs::File::open(path).map_err(|_| Error::Unreadable { path: path.clone() })?;
                (path.clone(), Origin::File, metadata.len(), *span)
            }
            ResolvedCandidate::Base64 { uri, span } => {
                let (path, size) = spill_data_uri(uri)?;
                (path, Origin::Base64, size, *span)
            }
            ResolvedCandidate::Network { url, span } => {
                let (path, size) = self.download(url).await?;
                (path, Origin::Network, size, *span)
            }
            ResolvedCandidate::NotFound => return Err(Error::Unresolved),
        };

        Ok(self.enrich(local_path, origin, byte_size, span))
    }

    /// Best-effort metadata enrichment. Collaborator failures are logged and
    /// leave their fields empty; they never fail the materialization.
    fn enrich(
        &self,
        local_path: PathBuf,
        origin: Origin,
        byte_size: u64,
        span: Span,
    ) -> MaterializedResource {
        let kind = ResourceKind::from_path(&local_path);

        let meta = match self.metadata.probe(&local_path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %local_path.display(), error = %e, "metadata probe failed");
                crate::types::ResourceMeta::default()
            }
        };

        let optimize = match self.estimator.estimate(&local_path, kind, byte_size) {
            Ok(estimates) if !estimates.is_empty() => Some(estimates),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %local_path.display(), error = %e, "optimize estimate failed");
                None
            }
        };

        // Spilled base64 payloads have no history to inspect.
        let vcs = if origin == Origin::Base64 {
            None
        } else {
            match self.vcs.inspect(&local_path) {
                Ok(info) => info,
                Err(e) => {
                    warn!(path = %local_path.display(), error = %e, "vcs probe failed");
                    None
                }
            }
        };

        MaterializedResource {
            byte_size,
            codec: meta.codec,
            bitrate: meta.bitrate,
            dimensions: meta.dimensions,
            duration_secs: meta.duration_secs,
            kind,
            local_path,
            optimize,
            origin,
            span,
            vcs,
        }
    }

    /// Fetch a URL to a temp file, following at most one redirect.
    async fn download(&self, url: &str) -> Result<(PathBuf, u64), Error> {
        let mut target = url.to_string();
        let mut hops = 0u8;
        let response = loop {
            let response = self
                .client
                .get(&target)
                .send()
                .await
                .map_err(|e| Error::Download {
                    reason: e.to_string(),
                    url: target.clone(),
                })?;

            let status = response.status();
            if status.is_redirection() {
                if hops >= 1 {
                    return Err(Error::TooManyRedirects {
                        url: url.to_string(),
                    });
                }
                let Some(location) = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                else {
                    return Err(Error::Download {
                        reason: "redirect without location".to_string(),
                        url: target,
                    });
                };
                target = absolutize_location(&target, location);
                hops += 1;
                debug!(url, redirect = %target, "following redirect");
                continue;
            }
            if !status.is_success() {
                return Err(Error::HttpStatus {
                    status: status.as_u16(),
                    url: target,
                });
            }
            break response;
        };

        let extension = download_extension(&response, &target);
        let (mut file, temp_path) = temp_file(&extension)?;

        let mut stream = response.bytes_stream();
        let mut total = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Download {
                reason: e.to_string(),
                url: target.clone(),
            })?;
            file.write_all(&chunk)?;
            total += chunk.len() as u64;
        }
        file.flush()?;
        drop(file);

        Ok((temp_path.keep().map_err(|e| e.error)?, total))
    }
}

impl Default for Materializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a `data:<mime>;base64,<payload>` URI and spill it to a temp file.
fn spill_data_uri(uri: &str) -> Result<(PathBuf, u64), Error> {
    let rest = uri.strip_prefix("data:").ok_or_else(|| Error::DataUri {
        reason: "missing data: scheme".to_string(),
    })?;
    let (header, payload) = rest.split_once(";base64,").ok_or_else(|| Error::DataUri {
        reason: "missing ;base64, separator".to_string(),
    })?;

    // Payloads extracted from multiline template literals may carry
    // whitespace between fragments.
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes()).map_err(|e| Error::DataUri {
        reason: e.to_string(),
    })?;

    let extension = extension_for_mime(header.trim()).unwrap_or("bin");
    let (mut file, temp_path) = temp_file(extension)?;
    file.write_all(&bytes)?;
    file.flush()?;
    drop(file);

    let size = bytes.len() as u64;
    Ok((temp_path.keep().map_err(|e| e.error)?, size))
}

/// Create a named temp file with the given extension, returning the handle
/// and the path keeper separately.
fn temp_file(extension: &str) -> Result<(std::fs::File, tempfile::TempPath), Error> {
    let named = tempfile::Builder::new()
        .prefix("assetref-")
        .suffix(&format!(".{extension}"))
        .tempfile()?;
    Ok(named.into_parts())
}

/// Spill extension for a download: Content-Type first, then the URL path,
/// then a generic fallback.
fn download_extension(response: &reqwest::Response, url: &str) -> String {
    let from_mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| extension_for_mime(ct.split(';').next().unwrap_or(ct).trim()));
    if let Some(ext) = from_mime {
        return ext.to_string();
    }
    url_path_extension(url).unwrap_or_else(|| "bin".to_string())
}

/// Extension of the path component of a URL, query and fragment stripped.
fn url_path_extension(url: &str) -> Option<String> {
    let no_query = url.split(['?', '#']).next().unwrap_or(url);
    let path = no_query
        .split_once("://")
        .map_or(no_query, |(_, rest)| rest);
    let ext = extension_of(Path::new(path))?;
    crate::types::is_resource_extension(&ext).then_some(ext)
}

/// Resolve a Location header value against the request URL. Handles
/// absolute, protocol-relative, and path-relative forms.
fn absolutize_location(base: &str, location: &str) -> String {
    let lower = location.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return location.to_string();
    }
    if location.starts_with("//") {
        let scheme = base.split("://").next().unwrap_or("https");
        return format!("{scheme}:{location}");
    }
    if let Some(rest) = location.strip_prefix('/')
        && let Some(scheme_end) = base.find("://")
    {
        let after = &base[scheme_end + 3..];
        let host = after.split('/').next().unwrap_or(after);
        return format!("{}://{}/{}", &base[..scheme_end], host, rest);
    }
    // Path-relative: replace the last segment of the base path.
    match base.rfind('/') {
        Some(pos) if pos > base.find("://").map_or(0, |p| p + 2) => {
            format!("{}/{}", &base[..pos], location)
        }
        _ => format!("{base}/{location}"),
    }
}

/// Race a set of materialization futures; the first `Ok` wins and the rest
/// are dropped. Failures are ordinary losses. `None` when every candidate
/// fails or the set is empty.
pub async fn race_first_success<T, F>(futures: Vec<F>) -> Option<T>
where
    F: std::future::Future<Output = Result<T, Error>>,
{
    let mut pending: FuturesUnordered<F> = futures.into_iter().collect();
    while let Some(result) = pending.next().await {
        match result {
            Ok(value) => return Some(value),
            Err(e) => debug!(error = %e, "candidate lost the race"),
        }
    }
    None
}
