//! Extension matcher: scans text for candidate asset-reference strings.
//!
//! Several overlapping grammar families run in a fixed priority order; when
//! two families match at the same offset, the earlier family wins and the
//! offset is reported once. Matches inside code comments are suppressed for
//! hover queries, and HTML comments are additionally suppressed for full
//! scans.

use std::collections::HashSet;

use regex::Regex;

use crate::types::{RawMatch, Span, extension_of, is_resource_extension, line_span_at,
                   resource_extensions};

/// Bound on how far the multi-line data-URI scan walks from the query
/// position, in bytes each direction.
const DATA_URI_SCAN_LIMIT: usize = 64 * 1024;

/// Compiled grammar families. Construct once per workspace and share; the
/// struct is an explicit instance rather than a module-level lazy static so
/// tests get fresh, independent matchers.
pub struct Matcher {
    binding: Regex,
    data_uri: Regex,
    html_attr: Regex,
    import: Regex,
    jsx_literal: Regex,
    quoted: Regex,
    srcset_attr: Regex,
    url_fn: Regex,
}

/// Alternation of every tracked resource extension, longest first so that
/// e.g. `woff2` is not shadowed by `woff`.
fn extension_alternation() -> String {
    let mut exts: Vec<&str> = resource_extensions().collect();
    exts.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    exts.join("|")
}

impl Matcher {
    /// Compile all grammar families.
    ///
    /// # Panics
    ///
    /// Panics if any hardcoded pattern is invalid (compile-time invariant).
    pub fn new() -> Self {
        let ext = extension_alternation();
        Self {
            url_fn: Regex::new(&format!(
                r#"(?i)url\(\s*['"]?([^'")\s]+\.(?:{ext}))(?:[?#][^'")\s]*)?['"]?\s*\)"#
            ))
            .expect("valid regex"),
            import: Regex::new(&format!(
                r#"(?i)\b(?:import\b[^'"\r\n]*?|require\s*\(\s*)['"]([^'"]+\.(?:{ext}))['"]"#
            ))
            .expect("valid regex"),
            html_attr: Regex::new(&format!(
                r#"(?i)\b(?:src|href|poster|data-src|data-lazy-src|data-original)\s*=\s*["']([^"']+\.(?:{ext}))(?:[?#][^"']*)?["']"#
            ))
            .expect("valid regex"),
            binding: Regex::new(&format!(
                r#"(?i):[a-z][\w-]*\s*=\s*"\s*['`]([^'"`]+\.(?:{ext}))['`]\s*""#
            ))
            .expect("valid regex"),
            jsx_literal: Regex::new(&format!(
                r#"(?i)\b[a-z][\w-]*\s*=\s*\{{\s*['"`]([^'"`{{}}]+\.(?:{ext}))['"`]\s*\}}"#
            ))
            .expect("valid regex"),
            srcset_attr: Regex::new(r#"(?i)\b(?:srcset|data-srcset)\s*=\s*["']([^"']+)["']"#)
                .expect("valid regex"),
            quoted: Regex::new(&format!(
                r#"['"`]([^'"`\r\n]+\.(?:{ext}))(?:[?#][^'"`\r\n]*)?['"`]"#
            ))
            .expect("valid regex"),
            data_uri: Regex::new(r"data:image/[a-zA-Z0-9.+-]+;base64,[A-Za-z0-9+/=]+")
                .expect("valid regex"),
        }
    }

    /// Find every candidate reference in `text`, comment-suppressed for a
    /// full scan (line, block, and HTML comments).
    pub fn find_all(&self, text: &str) -> Vec<RawMatch> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect(text, 0, &mut seen, &mut out);
        let comments = comment_spans(text, true);
        out.retain(|m| !in_spans(&comments, m.span.start));
        out
    }

    /// Find candidates on the line touching `offset`, plus a multi-line
    /// data-URI walk from the position. Line and block comments are
    /// suppressed; HTML comments are not (hover-query semantics).
    pub fn find_at(&self, text: &str, offset: usize) -> Vec<RawMatch> {
        let line = line_span_at(text, offset);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect(&text[line.start..line.end], line.start, &mut seen, &mut out);

        if let Some(multi) = find_multiline_data_uri(text, offset)
            && seen.insert(multi.span.start)
        {
            out.push(multi);
        }

        let comments = comment_spans(text, false);
        out.retain(|m| !in_spans(&comments, m.span.start));
        out
    }

    /// Run every family in priority order over `slice`, reporting each
    /// offset once. `base` rebases spans into whole-document coordinates.
    fn collect(&self, slice: &str, base: usize, seen: &mut HashSet<usize>, out: &mut Vec<RawMatch>) {
        self.collect_capture(&self.url_fn, slice, base, seen, out);
        self.collect_capture(&self.import, slice, base, seen, out);
        self.collect_capture(&self.html_attr, slice, base, seen, out);
        self.collect_srcset(slice, base, seen, out);
        self.collect_capture(&self.binding, slice, base, seen, out);
        self.collect_capture(&self.jsx_literal, slice, base, seen, out);
        self.collect_capture(&self.quoted, slice, base, seen, out);
        self.collect_data_uri(slice, base, seen, out);
    }

    /// Collect group-1 captures of a single-path family.
    fn collect_capture(
        &self,
        family: &Regex,
        slice: &str,
        base: usize,
        seen: &mut HashSet<usize>,
        out: &mut Vec<RawMatch>,
    ) {
        for caps in family.captures_iter(slice) {
            let Some(m) = caps.get(1) else { continue };
            let start = base + m.start();
            if !seen.insert(start) {
                continue;
            }
            out.push(RawMatch {
                span: Span { start, end: base + m.end() },
                value: m.as_str().to_string(),
            });
        }
    }

    /// Collect each path of a `srcset` list, distinct from its density or
    /// width descriptor.
    fn collect_srcset(&self, slice: &str, base: usize, seen: &mut HashSet<usize>, out: &mut Vec<RawMatch>) {
        for caps in self.srcset_attr.captures_iter(slice) {
            let Some(list) = caps.get(1) else { continue };
            let list_str = list.as_str();
            let mut item_offset = 0usize;
            for item in list_str.split(',') {
                let lead = item.len() - item.trim_start().len();
                if let Some(path) = item.split_whitespace().next()
                    && resource_path_value(path).is_some()
                {
                    let start = base + list.start() + item_offset + lead;
                    if seen.insert(start) {
                        out.push(RawMatch {
                            span: Span { start, end: start + path.len() },
                            value: path.to_string(),
                        });
                    }
                }
                item_offset += item.len() + 1;
            }
        }
    }

    /// Collect same-line base64 data URIs (whole-match values).
    fn collect_data_uri(&self, slice: &str, base: usize, seen: &mut HashSet<usize>, out: &mut Vec<RawMatch>) {
        for m in self.data_uri.find_iter(slice) {
            let start = base + m.start();
            if !seen.insert(start) {
                continue;
            }
            out.push(RawMatch {
                span: Span { start, end: base + m.end() },
                value: m.as_str().to_string(),
            });
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that a raw value (query/fragment allowed) names a tracked resource;
/// returns the query-stripped path on success.
fn resource_path_value(value: &str) -> Option<&str> {
    let stripped = value.split(['?', '#']).next().unwrap_or(value);
    let ext = extension_of(std::path::Path::new(stripped))?;
    is_resource_extension(&ext).then_some(stripped)
}

/// Walk forward and backward from `offset` to the enclosing quote or
/// template-literal delimiters, across line breaks, and report the delimited
/// content as a data URI when it is one (whitespace stripped so that
/// pretty-printed multi-line payloads concatenate cleanly).
fn find_multiline_data_uri(text: &str, offset: usize) -> Option<RawMatch> {
    let bytes = text.as_bytes();
    let clamped = offset.min(text.len());

    let back_limit = clamped.saturating_sub(DATA_URI_SCAN_LIMIT);
    let mut open = None;
    let mut i = clamped;
    while i > back_limit {
        i -= 1;
        let b = bytes[i];
        if b == b'`' || b == b'\'' || b == b'"' {
            open = Some((i, b));
            break;
        }
    }
    let (open_idx, delim) = open?;

    let fwd_limit = (clamped + DATA_URI_SCAN_LIMIT).min(text.len());
    let mut close = None;
    let mut j = clamped;
    while j < fwd_limit {
        if bytes[j] == delim {
            close = Some(j);
            break;
        }
        j += 1;
    }
    let close_idx = close?;

    let inner = &text[open_idx + 1..close_idx];
    let compact: String = inner.chars().filter(|c| !c.is_whitespace()).collect();
    if !compact.starts_with("data:image/") || !compact.contains(";base64,") {
        return None;
    }
    Some(RawMatch {
        span: Span { start: open_idx + 1, end: close_idx },
        value: compact,
    })
}

/// Spans of comments in `text`. Line comments require `//` at line start or
/// after whitespace so that `http://` and protocol-relative URLs survive.
/// Block comments are `/* */`; HTML comments `<!-- -->` are included only
/// when `include_html` is set (full-scan semantics).
fn comment_spans(text: &str, include_html: bool) -> Vec<Span> {
    let mut spans = Vec::new();
    collect_delimited(text, "/*", "*/", &mut spans);
    if include_html {
        collect_delimited(text, "<!--", "-->", &mut spans);
    }
    collect_line_comments(text, &mut spans);
    spans
}

/// Collect spans between `open` and `close`, running to end of text when
/// unterminated.
fn collect_delimited(text: &str, open: &str, close: &str, spans: &mut Vec<Span>) {
    let mut at = 0usize;
    while let Some(rel) = text[at..].find(open) {
        let start = at + rel;
        let body = start + open.len();
        let end = text[body..]
            .find(close)
            .map_or(text.len(), |p| body + p + close.len());
        spans.push(Span { start, end });
        at = end;
        if at >= text.len() {
            break;
        }
    }
}

/// Collect `//` line comments that begin a line or follow whitespace.
fn collect_line_comments(text: &str, spans: &mut Vec<Span>) {
    let mut line_start = 0usize;
    for line in text.split_inclusive('\n') {
        let trimmed = line.strip_suffix('\n').unwrap_or(line);
        if let Some(pos) = find_line_comment(trimmed) {
            spans.push(Span {
                start: line_start + pos,
                end: line_start + trimmed.len(),
            });
        }
        line_start += line.len();
    }
}

/// Position of a `//` comment opener on one line, if any.
fn find_line_comment(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut at = 0usize;
    while let Some(rel) = line[at..].find("//") {
        let pos = at + rel;
        let ok = pos == 0 || bytes[pos - 1].is_ascii_whitespace();
        if ok {
            return Some(pos);
        }
        at = pos + 2;
    }
    None
}

/// Whether `offset` falls inside any of the spans.
fn in_spans(spans: &[Span], offset: usize) -> bool {
    spans.iter().any(|s| s.contains(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(matches: &[RawMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.value.as_str()).collect()
    }

    #[test]
    fn url_function_quoted_and_bare() {
        let m = Matcher::new();
        let text = "a { background: url('img/a.png'); } b { background: url(img/b.jpg); }";
        assert_eq!(values(&m.find_all(text)), vec!["img/a.png", "img/b.jpg"]);
    }

    #[test]
    fn url_function_strips_query() {
        let m = Matcher::new();
        let text = "background: url('fonts/x.woff2?v=3');";
        assert_eq!(values(&m.find_all(text)), vec!["fonts/x.woff2"]);
    }

    #[test]
    fn import_and_require() {
        let m = Matcher::new();
        let text = "import logo from './logo.svg';\nconst a = require('../a.png');";
        assert_eq!(values(&m.find_all(text)), vec!["./logo.svg", "../a.png"]);
    }

    #[test]
    fn html_attributes() {
        let m = Matcher::new();
        let text = r#"<img src="a.png" data-lazy-src="b.webp"><video poster="c.jpg"></video>"#;
        assert_eq!(values(&m.find_all(text)), vec!["a.png", "b.webp", "c.jpg"]);
    }

    #[test]
    fn srcset_paths_without_descriptors() {
        let m = Matcher::new();
        let text = r#"<img srcset="img.jpg 1x, img@2x.jpg 2x, wide.png 480w">"#;
        let found = m.find_all(text);
        assert_eq!(values(&found), vec!["img.jpg", "img@2x.jpg", "wide.png"]);
        // Offsets point at the paths themselves, not the descriptors.
        assert_eq!(&text[found[1].span.start..found[1].span.end], "img@2x.jpg");
    }

    #[test]
    fn framework_bindings() {
        let m = Matcher::new();
        let vue = r#"<img :src="'@/assets/a.png'">"#;
        assert_eq!(values(&m.find_all(vue)), vec!["@/assets/a.png"]);
        let jsx = r#"<img src={'./b.gif'} />"#;
        assert_eq!(values(&m.find_all(jsx)), vec!["./b.gif"]);
    }

    #[test]
    fn generic_quoted_fallback() {
        let m = Matcher::new();
        let text = r#"const path = "media/clip.mp4";"#;
        assert_eq!(values(&m.find_all(text)), vec!["media/clip.mp4"]);
    }

    #[test]
    fn same_offset_reported_once_for_higher_priority_family() {
        // url() and the quoted fallback both match the same path at the same
        // offset; exactly one match must come back.
        let m = Matcher::new();
        let text = "background: url('img/logo.png');";
        let found = m.find_all(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "img/logo.png");
    }

    #[test]
    fn data_uri_same_line() {
        let m = Matcher::new();
        let text = "background: url('data:image/png;base64,iVBORw0KGgo=');";
        let found = m.find_all(text);
        assert_eq!(found.len(), 1);
        assert!(found[0].value.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn multiline_data_uri_found_from_inside_payload() {
        let text = "const img = `data:image/png;base64,\n  iVBORw0KGgo\n  AAAA=`;\n";
        let offset = text.find("iVBO").unwrap();
        let found = find_multiline_data_uri(text, offset).unwrap();
        assert_eq!(found.value, "data:image/png;base64,iVBORw0KGgoAAAA=");
    }

    #[test]
    fn hover_suppresses_line_and_block_comments() {
        let m = Matcher::new();
        let text = "// import a from './a.png'\nimport b from './b.png';\n/* url('c.png') */";
        let offset = text.find("'./b.png'").unwrap();
        let found = m.find_at(text, offset);
        assert_eq!(values(&found), vec!["./b.png"]);
        let commented = m.find_at(text, text.find("'./a.png'").unwrap());
        assert!(commented.is_empty());
    }

    #[test]
    fn protocol_relative_url_is_not_a_comment() {
        let m = Matcher::new();
        let text = r#"<img src="//cdn.example.com/a.png">"#;
        assert_eq!(values(&m.find_all(text)), vec!["//cdn.example.com/a.png"]);
    }

    #[test]
    fn full_scan_suppresses_html_comments() {
        let m = Matcher::new();
        let text = "<!-- <img src=\"old.png\"> -->\n<img src=\"new.png\">";
        assert_eq!(values(&m.find_all(text)), vec!["new.png"]);
    }
}
