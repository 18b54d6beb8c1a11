//! Metadata collaborators: trait seams for probing resource metadata,
//! estimating optimization gains, and inspecting version-control history.
//! The materializer holds these behind trait objects so tests can swap in
//! instrumented stand-ins.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::Error;
use crate::types::{OptimizeEstimate, ResourceKind, ResourceMeta};

/// Probes intrinsic metadata (dimensions, codec, duration) from resource
/// bytes on disk.
pub trait MetadataProbe {
    /// Inspect the file at `path`. Fields the probe cannot determine stay
    /// `None`; an `Err` means the file could not be examined at all.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened or read.
    fn probe(&self, path: &Path) -> Result<ResourceMeta, Error>;
}

/// Estimates post-conversion byte sizes for a resource.
pub trait OptimizeEstimator {
    /// Produce estimates for `path`. An empty vector means "nothing to
    /// suggest" and is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be examined.
    fn estimate(
        &self,
        path: &Path,
        kind: ResourceKind,
        byte_size: u64,
    ) -> Result<Vec<OptimizeEstimate>, Error>;
}

/// Looks up version-control history for a file.
pub trait VcsProbe {
    /// Most recent commit touching `path`, or `None` when the file is not
    /// tracked.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying VCS query fails to run.
    fn inspect(&self, path: &Path) -> Result<Option<crate::types::VcsInfo>, Error>;
}

/// Default metadata probe: reads image container headers directly. Covers
/// PNG, GIF, BMP, and JPEG; everything else yields an empty `ResourceMeta`.
pub struct HeaderProbe;

impl MetadataProbe for HeaderProbe {
    fn probe(&self, path: &Path) -> Result<ResourceMeta, Error> {
        let bytes = std::fs::read(path)?;
        Ok(ResourceMeta {
            dimensions: image_dimensions(&bytes),
            ..ResourceMeta::default()
        })
    }
}

/// Pixel dimensions from raw container bytes, when the format is recognized.
fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") && bytes.len() >= 24 {
        // Signature, IHDR length+type, then width and height big-endian.
        let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
        let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
        return Some((width, height));
    }
    if (bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) && bytes.len() >= 10 {
        let width = u16::from_le_bytes(bytes[6..8].try_into().ok()?);
        let height = u16::from_le_bytes(bytes[8..10].try_into().ok()?);
        return Some((u32::from(width), u32::from(height)));
    }
    if bytes.starts_with(b"BM") && bytes.len() >= 26 {
        let width = u32::from_le_bytes(bytes[18..22].try_into().ok()?);
        let height = u32::from_le_bytes(bytes[22..26].try_into().ok()?);
        return Some((width, height));
    }
    if bytes.starts_with(&[0xFF, 0xD8]) {
        return jpeg_dimensions(bytes);
    }
    None
}

/// Walk JPEG markers until a start-of-frame segment carrying dimensions.
fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let mut pos = 2usize;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = bytes[pos + 1];
        // SOF0 through SOF15, excluding DHT/JPG/DAC which share the range.
        let is_sof = (0xC0..=0xCF).contains(&marker)
            && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            if pos + 9 > bytes.len() {
                return None;
            }
            let height = u16::from_be_bytes(bytes[pos + 5..pos + 7].try_into().ok()?);
            let width = u16::from_be_bytes(bytes[pos + 7..pos + 9].try_into().ok()?);
            return Some((u32::from(width), u32::from(height)));
        }
        let length = u16::from_be_bytes(bytes[pos + 2..pos + 4].try_into().ok()?);
        pos += 2 + usize::from(length);
    }
    None
}

/// Default estimator: flat compression-ratio heuristics for images. Audio,
/// video, fonts, and documents get no suggestions.
pub struct RatioEstimator;

/// (target format, assumed size ratio against the original).
const IMAGE_RATIOS: &[(&str, f64)] = &[("webp", 0.65), ("avif", 0.50)];

impl OptimizeEstimator for RatioEstimator {
    fn estimate(
        &self,
        path: &Path,
        kind: ResourceKind,
        byte_size: u64,
    ) -> Result<Vec<OptimizeEstimate>, Error> {
        if kind != ResourceKind::Image {
            return Ok(Vec::new());
        }
        let current = crate::types::extension_of(path).unwrap_or_default();
        let estimates = IMAGE_RATIOS
            .iter()
            .filter(|(format, _)| *format != current)
            .map(|(format, ratio)| OptimizeEstimate {
                estimated_bytes: (byte_size as f64 * ratio) as u64,
                format: (*format).to_string(),
            })
            .collect();
        Ok(estimates)
    }
}

/// Default VCS probe: shells out to `git log` in the file's directory.
pub struct GitProbe;

impl VcsProbe for GitProbe {
    fn inspect(&self, path: &Path) -> Result<Option<crate::types::VcsInfo>, Error> {
        let dir = path.parent().unwrap_or(Path::new("."));
        let output = Command::new("git")
            .arg("log")
            .arg("-1")
            .arg("--format=%H%x09%an%x09%aI")
            .arg("--")
            .arg(path)
            .current_dir(dir)
            .output()?;

        if !output.status.success() {
            debug!(path = %path.display(), "git log failed, no vcs info");
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let mut parts = line.splitn(3, '\t');
        let (Some(commit), Some(author), Some(date)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Ok(None);
        };
        Ok(Some(crate::types::VcsInfo {
            author: author.to_string(),
            commit: commit.to_string(),
            date: date.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"\x89PNG\r\n\x1a\n");
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes
    }

    #[test]
    fn reads_png_dimensions() {
        assert_eq!(image_dimensions(&png_header(640, 480)), Some((640, 480)));
    }

    #[test]
    fn reads_gif_dimensions() {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&100u16.to_le_bytes());
        bytes.extend_from_slice(&50u16.to_le_bytes());
        assert_eq!(image_dimensions(&bytes), Some((100, 50)));
    }

    #[test]
    fn unknown_container_has_no_dimensions() {
        assert_eq!(image_dimensions(b"not an image"), None);
    }

    #[test]
    fn estimator_skips_non_images() {
        let estimates = RatioEstimator
            .estimate(Path::new("a.mp3"), ResourceKind::Audio, 1000)
            .unwrap();
        assert!(estimates.is_empty());
    }

    #[test]
    fn estimator_skips_current_format() {
        let estimates = RatioEstimator
            .estimate(Path::new("a.webp"), ResourceKind::Image, 1000)
            .unwrap();
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].format, "avif");
        assert_eq!(estimates[0].estimated_bytes, 500);
    }
}
