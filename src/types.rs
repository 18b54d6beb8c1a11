/// Core domain types: matches, candidates, reference sites, materialized
/// resources, and the extension/kind/mime tables everything else keys off.
use std::path::{Path, PathBuf};

/// Image file extensions (lowercase, no dot).
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico", "avif", "tif", "tiff",
];

/// Audio file extensions.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "aac", "m4a"];

/// Video file extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "avi", "mkv", "m4v"];

/// Font file extensions.
pub const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];

/// Office document extensions.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx"];

/// Text source extensions scanned for asset references.
pub const TEXT_SOURCE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "mjs", "cjs", "vue", "svelte", "html", "htm", "css", "scss",
    "sass", "less", "styl", "md", "markdown", "xml", "php", "hbs", "pug",
];

/// Recognized image MIME types and the extension used when spilling a
/// decoded data URI to disk.
pub const IMAGE_MIME_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/svg+xml", "svg"),
    ("image/webp", "webp"),
    ("image/bmp", "bmp"),
    ("image/x-icon", "ico"),
    ("image/avif", "avif"),
    ("image/tiff", "tif"),
];

/// All resource extensions, every category combined.
pub fn resource_extensions() -> impl Iterator<Item = &'static str> {
    IMAGE_EXTENSIONS
        .iter()
        .chain(AUDIO_EXTENSIONS)
        .chain(VIDEO_EXTENSIONS)
        .chain(FONT_EXTENSIONS)
        .chain(DOCUMENT_EXTENSIONS)
        .copied()
}

/// Check whether an extension (lowercase, no dot) names a tracked resource.
pub fn is_resource_extension(ext: &str) -> bool {
    resource_extensions().any(|e| e == ext)
}

/// Check whether a path ends in a tracked resource extension.
pub fn has_resource_extension(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| is_resource_extension(&ext))
}

/// Check whether a path names a text source file worth scanning.
pub fn is_text_source(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| TEXT_SOURCE_EXTENSIONS.contains(&ext.as_str()))
}

/// Lowercased extension of a path, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Spill extension for a known image MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    IMAGE_MIME_TYPES
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, ext)| *ext)
}

/// Broad classification of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Raster or vector image.
    Image,
    /// Audio stream.
    Audio,
    /// Video container.
    Video,
    /// Web or desktop font.
    Font,
    /// Office document.
    Document,
    /// Anything else the extension tables don't classify.
    Other,
}

impl ResourceKind {
    /// Classify by extension (lowercase, no dot).
    pub fn from_extension(ext: &str) -> Self {
        if IMAGE_EXTENSIONS.contains(&ext) {
            ResourceKind::Image
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            ResourceKind::Audio
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            ResourceKind::Video
        } else if FONT_EXTENSIONS.contains(&ext) {
            ResourceKind::Font
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            ResourceKind::Document
        } else {
            ResourceKind::Other
        }
    }

    /// Classify a path by its extension.
    pub fn from_path(path: &Path) -> Self {
        extension_of(path).map_or(ResourceKind::Other, |ext| Self::from_extension(&ext))
    }
}

/// Half-open byte range within a scanned text, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Span {
    /// Whether the span contains the given byte offset.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// One candidate reference string found by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    /// The span the value was parsed from, in document byte offsets.
    pub span: Span,
    /// The matched reference string, descriptor- and quote-stripped.
    pub value: String,
}

/// One source location that mentions a resource.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReferenceSite {
    /// One-based column of the reference start.
    pub column: u32,
    /// Source file containing the reference.
    pub file: PathBuf,
    /// One-based line number of the reference.
    pub line: u32,
}

/// A resource and every location that mentions it. Site order within one
/// file is discovery order; sites are deduplicated by exact offset within a
/// single file pass, never across passes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AssetReference {
    /// Absolute identity of the referenced resource.
    pub resource: PathBuf,
    /// Discovery-ordered reference locations.
    pub sites: Vec<ReferenceSite>,
}

impl AssetReference {
    /// Empty reference record for a resource.
    pub fn new(resource: PathBuf) -> Self {
        Self {
            resource,
            sites: Vec::new(),
        }
    }
}

/// Transient result of applying the resolution mapper chain to one raw
/// string. `NotFound` carries no location or payload and is excluded from
/// racing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCandidate {
    /// Inline base64 data URI, carried verbatim.
    Base64 {
        /// The span the URI was parsed from.
        span: Span,
        /// The full `data:<mime>;base64,<payload>` string.
        uri: String,
    },
    /// An existing local file.
    File {
        /// Absolute path to the file.
        path: PathBuf,
        /// The span the reference was parsed from.
        span: Span,
    },
    /// A remote URL, not yet fetched or verified.
    Network {
        /// The span the reference was parsed from.
        span: Span,
        /// Canonical URL (protocol-relative prefixes resolved to https).
        url: String,
    },
    /// No strategy located an existing target.
    NotFound,
}

impl ResolvedCandidate {
    /// The originating text span, if the candidate resolved at all.
    pub fn span(&self) -> Option<Span> {
        match self {
            ResolvedCandidate::Base64 { span, .. }
            | ResolvedCandidate::File { span, .. }
            | ResolvedCandidate::Network { span, .. } => Some(*span),
            ResolvedCandidate::NotFound => None,
        }
    }

    /// The cache key for this candidate: resolved absolute path or canonical
    /// URL. Base64 payloads are ephemeral and never cached.
    pub fn cache_key(&self) -> Option<String> {
        match self {
            ResolvedCandidate::File { path, .. } => Some(path.to_string_lossy().into_owned()),
            ResolvedCandidate::Network { url, .. } => Some(url.clone()),
            ResolvedCandidate::Base64 { .. } | ResolvedCandidate::NotFound => None,
        }
    }
}

/// Where a materialized resource's bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Decoded from an inline data URI.
    Base64,
    /// An ordinary local file.
    File,
    /// Downloaded over HTTP(S).
    Network,
}

/// Metadata gathered by the metadata collaborator. Every field other than
/// `kind` is best-effort.
#[derive(Debug, Clone, Default)]
pub struct ResourceMeta {
    /// Bitrate in bits per second, when determinable.
    pub bitrate: Option<u64>,
    /// Codec name, when determinable.
    pub codec: Option<String>,
    /// Pixel dimensions (width, height), when determinable.
    pub dimensions: Option<(u32, u32)>,
    /// Playback duration in seconds, when determinable.
    pub duration_secs: Option<f64>,
}

/// One optimization estimate from the transcoding-estimate collaborator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OptimizeEstimate {
    /// Estimated byte size after conversion.
    pub estimated_bytes: u64,
    /// Target format the estimate is for (e.g. "webp").
    pub format: String,
}

/// Version-control history for a referenced file, via the VCS collaborator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VcsInfo {
    /// Author of the most recent commit touching the file.
    pub author: String,
    /// Most recent commit id touching the file.
    pub commit: String,
    /// ISO-8601 date of that commit.
    pub date: String,
}

/// A candidate enriched with a guaranteed-locally-readable byte source and
/// whatever metadata the collaborators could provide. `local_path` is
/// readable by construction: the original file, or a freshly spilled temp
/// file for base64/network origins.
#[derive(Debug, Clone)]
pub struct MaterializedResource {
    /// Total byte size of the local file.
    pub byte_size: u64,
    /// Codec name, when the metadata probe determined one.
    pub codec: Option<String>,
    /// Bitrate in bits per second, when determinable.
    pub bitrate: Option<u64>,
    /// Pixel dimensions, when determinable.
    pub dimensions: Option<(u32, u32)>,
    /// Playback duration in seconds, when determinable.
    pub duration_secs: Option<f64>,
    /// Broad resource classification.
    pub kind: ResourceKind,
    /// Locally readable path to the bytes.
    pub local_path: PathBuf,
    /// Optimization estimates, absent when the estimator had nothing to say.
    pub optimize: Option<Vec<OptimizeEstimate>>,
    /// Where the bytes came from.
    pub origin: Origin,
    /// The text span the winning candidate was parsed from.
    pub span: Span,
    /// VCS history, absent for base64 origins and on probe failure.
    pub vcs: Option<VcsInfo>,
}

/// Answer to a position query. `NotFound` means "no hover, no answer" — it
/// is not a failure.
#[derive(Debug, Clone)]
pub enum ResolvedResource {
    /// A candidate materialized successfully.
    Found {
        /// Number of reference sites the index records for this resource.
        reference_count: usize,
        /// The materialized resource.
        resource: MaterializedResource,
    },
    /// Nothing at the position resolved.
    NotFound,
}

/// Convert a byte offset into 1-based (line, column). Column is a byte
/// column within the line, matching editor host conventions for ASCII-heavy
/// source.
pub fn offset_to_line_col(text: &str, offset: usize) -> (u32, u32) {
    let clamped = offset.min(text.len());
    let before = &text[..clamped];
    let line = before.bytes().filter(|b| *b == b'\n').count() as u32 + 1;
    let line_start = before.rfind('\n').map_or(0, |p| p + 1);
    let column = (clamped - line_start) as u32 + 1;
    (line, column)
}

/// Convert 1-based (line, column) into a byte offset. Returns `None` when
/// the position is outside the text.
pub fn line_col_to_offset(text: &str, line: u32, column: u32) -> Option<usize> {
    if line == 0 || column == 0 {
        return None;
    }
    let mut start = 0usize;
    let mut current = 1u32;
    while current < line {
        start = text[start..].find('\n').map(|p| start + p + 1)?;
        current += 1;
    }
    let line_end = text[start..].find('\n').map_or(text.len(), |p| start + p);
    let offset = start + (column as usize - 1);
    if offset > line_end {
        return None;
    }
    Some(offset)
}

/// The span of the line containing `offset` (not including the newline).
pub fn line_span_at(text: &str, offset: usize) -> Span {
    let clamped = offset.min(text.len());
    let start = text[..clamped].rfind('\n').map_or(0, |p| p + 1);
    let end = text[clamped..].find('\n').map_or(text.len(), |p| clamped + p);
    Span { start, end }
}
