//! Path resolution mappers: the ordered chain of strategies that turn a raw
//! reference string plus its declaring-file context into a concrete
//! candidate. Strategies are tried in fixed priority order; the first one
//! that locates an existing target wins.

use std::path::{Component, Path, PathBuf};

use crate::alias::AliasTable;
use crate::types::{ResolvedCandidate, Span};

/// Everything a resolution needs besides the raw string itself. Borrowed
/// from the owning workspace so per-call setup stays allocation-free.
pub struct ResolveContext<'a> {
    /// The alias table scoped to the declaring document.
    pub aliases: &'a AliasTable,
    /// Extra source roots tried after workspace-root-relative resolution.
    pub extra_roots: &'a [String],
    /// Optional images-directory hint joined under the document directory.
    pub images_dir: Option<&'a str>,
    /// The workspace root.
    pub workspace_root: &'a Path,
}

/// Resolve one raw reference string from `doc` into a candidate.
///
/// Strategy order: data URI, network URL, absolute path, document-relative
/// (with optional images-dir hint), alias substitution, workspace-root
/// relative, configured extra roots, and finally leading-slash paths
/// reinterpreted as root-relative. Returns `NotFound` when every strategy
/// comes up empty.
pub fn resolve(doc: &Path, raw: &str, span: Span, ctx: &ResolveContext<'_>) -> ResolvedCandidate {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ResolvedCandidate::NotFound;
    }

    if is_data_uri(trimmed) {
        return ResolvedCandidate::Base64 {
            span,
            uri: trimmed.to_string(),
        };
    }

    if let Some(url) = network_url(trimmed) {
        return ResolvedCandidate::Network { span, url };
    }

    let normalized = normalize_raw(trimmed);
    let as_path = Path::new(normalized.as_str());

    if as_path.is_absolute() && file_exists(as_path) {
        return found(as_path.to_path_buf(), span);
    }

    let doc_dir = doc.parent().unwrap_or(Path::new(""));
    if !as_path.is_absolute() {
        let direct = normalize_path(&doc_dir.join(&normalized));
        if file_exists(&direct) {
            return found(direct, span);
        }
        if let Some(hint) = ctx.images_dir {
            let hinted = normalize_path(&doc_dir.join(hint).join(&normalized));
            if file_exists(&hinted) {
                return found(hinted, span);
            }
        }
    }

    if let Some(path) = resolve_alias(&normalized, ctx.aliases) {
        return found(path, span);
    }

    if !as_path.is_absolute() {
        let rooted = normalize_path(&ctx.workspace_root.join(&normalized));
        if file_exists(&rooted) {
            return found(rooted, span);
        }

        for extra in ctx.extra_roots {
            let candidate = normalize_path(&ctx.workspace_root.join(extra).join(&normalized));
            if file_exists(&candidate) {
                return found(candidate, span);
            }
        }
    }

    // Leading-slash paths that are not real absolute files get a second
    // reading as workspace-root-relative (web-style `/assets/a.png`).
    if let Some(rel) = normalized.strip_prefix('/') {
        let rooted = normalize_path(&ctx.workspace_root.join(rel));
        if file_exists(&rooted) {
            return found(rooted, span);
        }
    }

    ResolvedCandidate::NotFound
}

fn found(path: PathBuf, span: Span) -> ResolvedCandidate {
    ResolvedCandidate::File { path, span }
}

/// Alias substitution: every prefix that exactly matches or prefixes the
/// normalized raw path is tried, in table order, against its target
/// directory.
fn resolve_alias(normalized: &str, table: &AliasTable) -> Option<PathBuf> {
    for entry in &table.entries {
        let rest = if normalized == entry.prefix {
            ""
        } else if let Some(rest) = normalized.strip_prefix(&entry.prefix) {
            rest.trim_start_matches('/')
        } else {
            continue;
        };
        let candidate = normalize_path(&entry.target.join(rest));
        if file_exists(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Data URIs are recognized syntactically; payload validity is the
/// materializer's concern.
fn is_data_uri(raw: &str) -> bool {
    raw.starts_with("data:") && raw.contains(";base64,")
}

/// Canonical URL for network-scheme and protocol-relative references.
fn network_url(raw: &str) -> Option<String> {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(raw.to_string());
    }
    if raw.starts_with("//") {
        return Some(format!("https:{raw}"));
    }
    None
}

/// Strip query/fragment suffixes and a leading `./` from a raw path.
fn normalize_raw(raw: &str) -> String {
    let stripped = raw.split(['?', '#']).next().unwrap_or(raw);
    stripped.strip_prefix("./").unwrap_or(stripped).to_string()
}

/// Collapse `.` and `..` components in a path without touching the
/// filesystem. Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    components.last(),
                    Some(c) if !matches!(c, Component::ParentDir | Component::RootDir)
                );
                if can_pop {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir)) {
                    components.push(component);
                }
            }
            other => components.push(other),
        }
    }
    components.iter().collect()
}

fn file_exists(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{AliasEntry, AliasTable};

    const SPAN: Span = Span { start: 0, end: 10 };

    fn ctx<'a>(root: &'a Path, aliases: &'a AliasTable, extra: &'a [String]) -> ResolveContext<'a> {
        ResolveContext {
            aliases,
            extra_roots: extra,
            images_dir: None,
            workspace_root: root,
        }
    }

    fn workspace(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("assetref-mappers-{name}"));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    #[test]
    fn data_uri_short_circuits() {
        let root = workspace("datauri");
        let empty = AliasTable::empty();
        let c = resolve(
            &root.join("a.css"),
            "data:image/png;base64,AAAA",
            SPAN,
            &ctx(&root, &empty, &[]),
        );
        assert!(matches!(c, ResolvedCandidate::Base64 { .. }));
    }

    #[test]
    fn network_urls_and_protocol_relative() {
        let root = workspace("net");
        let empty = AliasTable::empty();
        let c = resolve(
            &root.join("a.css"),
            "https://cdn.example.com/a.png",
            SPAN,
            &ctx(&root, &empty, &[]),
        );
        assert!(matches!(c, ResolvedCandidate::Network { ref url, .. } if url.starts_with("https://cdn")));

        let c = resolve(
            &root.join("a.css"),
            "//cdn.example.com/b.png",
            SPAN,
            &ctx(&root, &empty, &[]),
        );
        assert!(
            matches!(c, ResolvedCandidate::Network { ref url, .. } if url == "https://cdn.example.com/b.png")
        );
    }

    #[test]
    fn document_relative_with_query_stripped() {
        let root = workspace("docrel");
        std::fs::create_dir_all(root.join("assets")).unwrap();
        std::fs::write(root.join("assets/logo.png"), b"x").unwrap();
        let empty = AliasTable::empty();

        let c = resolve(
            &root.join("src/page.html"),
            "../assets/logo.png?v=2",
            SPAN,
            &ctx(&root, &empty, &[]),
        );
        assert!(
            matches!(c, ResolvedCandidate::File { ref path, .. } if *path == root.join("assets/logo.png"))
        );
    }

    #[test]
    fn images_dir_hint_applies_under_document_directory() {
        let root = workspace("hint");
        std::fs::create_dir_all(root.join("docs/images")).unwrap();
        std::fs::write(root.join("docs/images/fig.png"), b"x").unwrap();
        let empty = AliasTable::empty();

        let c = resolve(
            &root.join("docs/guide.md"),
            "fig.png",
            SPAN,
            &ResolveContext {
                aliases: &empty,
                extra_roots: &[],
                images_dir: Some("images"),
                workspace_root: &root,
            },
        );
        assert!(
            matches!(c, ResolvedCandidate::File { ref path, .. } if *path == root.join("docs/images/fig.png"))
        );
    }

    #[test]
    fn alias_substitution_before_root_relative() {
        let root = workspace("alias");
        std::fs::create_dir_all(root.join("lib")).unwrap();
        std::fs::write(root.join("lib/icon.svg"), b"x").unwrap();
        // A root-relative decoy that must NOT win over the alias.
        std::fs::create_dir_all(root.join("@ui")).unwrap();
        std::fs::write(root.join("@ui/icon.svg"), b"decoy").unwrap();
        let table = AliasTable {
            entries: vec![AliasEntry {
                prefix: "@ui/".to_string(),
                target: root.join("lib"),
            }],
        };

        let c = resolve(
            &root.join("src/app.ts"),
            "@ui/icon.svg",
            SPAN,
            &ctx(&root, &table, &[]),
        );
        assert!(
            matches!(c, ResolvedCandidate::File { ref path, .. } if *path == root.join("lib/icon.svg"))
        );
    }

    #[test]
    fn extra_roots_in_declared_order() {
        let root = workspace("extra");
        std::fs::create_dir_all(root.join("static")).unwrap();
        std::fs::write(root.join("static/bg.jpg"), b"x").unwrap();
        let empty = AliasTable::empty();
        let extra = vec!["assets".to_string(), "static".to_string()];

        let c = resolve(
            &root.join("src/a.css"),
            "bg.jpg",
            SPAN,
            &ctx(&root, &empty, &extra),
        );
        assert!(
            matches!(c, ResolvedCandidate::File { ref path, .. } if *path == root.join("static/bg.jpg"))
        );
    }

    #[test]
    fn leading_slash_reinterpreted_as_root_relative() {
        let root = workspace("slash");
        std::fs::create_dir_all(root.join("assets")).unwrap();
        std::fs::write(root.join("assets/hero.webp"), b"x").unwrap();
        let empty = AliasTable::empty();

        let c = resolve(
            &root.join("index.html"),
            "/assets/hero.webp",
            SPAN,
            &ctx(&root, &empty, &[]),
        );
        assert!(
            matches!(c, ResolvedCandidate::File { ref path, .. } if *path == root.join("assets/hero.webp"))
        );
    }

    #[test]
    fn unmatched_alias_with_no_fallback_is_not_found() {
        let root = workspace("nomatch");
        let empty = AliasTable::empty();
        let c = resolve(
            &root.join("src/app.ts"),
            "@components/icon.svg",
            SPAN,
            &ctx(&root, &empty, &[]),
        );
        assert!(matches!(c, ResolvedCandidate::NotFound));
    }

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
    }
}
