use regex::Regex;
use site_kit_core::config::validate_path;
use site_kit_core::{DEFAULT_QUALITY, ImageFormat, TransformRequest, parse_dimensions};
use std::ops::Range;
use std::sync::LazyLock;

/// `src="…img.jpg?…"` / `data-src='…'`. Only values carrying a query are matched.
static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:data-)?src\s*=\s*(?:"(?P<dq>[^"]+?\.(?:jpe?g|png|gif|webp|svg)\?[^"]*)"|'(?P<sq>[^']+?\.(?:jpe?g|png|gif|webp|svg)\?[^']*)')"#,
    )
    .expect("attribute pattern is valid")
});

/// `url(…img.jpg?…)` with optional quotes; gradient layers before it are not part of the match
static STYLE_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)url\(\s*['"]?(?P<url>[^'"()\s]+?\.(?:jpe?g|png|gif|webp|svg)\?[^'"()\s]*)['"]?\s*\)"#,
    )
    .expect("style url pattern is valid")
});

static SCHEME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("scheme pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Value of a `src`-like attribute
    Attribute,
    /// Inside a CSS `url(...)` token
    StyleUrl,
}

/// One image URL with a query suffix found in markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference<'a> {
    pub kind: ReferenceKind,
    /// The URL exactly as written, query included
    pub url: &'a str,
    /// Byte range of `url` within the scanned markup
    pub span: Range<usize>,
}

/// Find every image URL with a query, in document order.
///
/// A style `url(...)` that sits inside an attribute value already matched as
/// an attribute reference is dropped, so spans never overlap.
pub(crate) fn find_references(markup: &str) -> Vec<ImageReference<'_>> {
    let mut refs: Vec<ImageReference<'_>> = ATTRIBUTE_PATTERN
        .captures_iter(markup)
        .filter_map(|caps| caps.name("dq").or_else(|| caps.name("sq")))
        .map(|m| ImageReference {
            kind: ReferenceKind::Attribute,
            url: m.as_str(),
            span: m.range(),
        })
        .collect();

    let style_refs: Vec<ImageReference<'_>> = STYLE_URL_PATTERN
        .captures_iter(markup)
        .filter_map(|caps| caps.name("url"))
        .map(|m| ImageReference {
            kind: ReferenceKind::StyleUrl,
            url: m.as_str(),
            span: m.range(),
        })
        .filter(|style| {
            !refs
                .iter()
                .any(|attr| attr.span.start < style.span.end && style.span.start < attr.span.end)
        })
        .collect();

    refs.extend(style_refs);
    refs.sort_by_key(|r| r.span.start);
    refs
}

/// Turn a referenced URL into a transform request.
///
/// Returns `None` (the reference is served as-is) when the URL is external,
/// carries no valid `size=WxH`, names an unknown `format=`, or would escape
/// the image root. The path is normalized by dropping one leading `/` and the
/// `asset_prefix` directory.
pub fn parse_request(url: &str, asset_prefix: &str) -> Option<TransformRequest> {
    let (path, query) = url.split_once('?')?;

    if path.starts_with("//") || SCHEME_PATTERN.is_match(path) {
        return None;
    }

    let query = query.split('#').next().unwrap_or_default().replace("&amp;", "&");
    let mut size = None;
    let mut format = None;
    let mut quality = DEFAULT_QUALITY;

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "size" => size = Some(parse_dimensions(value)?),
            "format" => format = Some(ImageFormat::from_param(value)?),
            "quality" => {
                if let Some(q) = parse_quality(value) {
                    quality = q;
                }
            }
            _ => {}
        }
    }

    let (width, height) = size?;
    let path = normalize_path(path, asset_prefix);
    validate_path(path, "image reference").ok()?;

    let mut request = TransformRequest::new(path, width, height).with_quality(quality);
    if let Some(format) = format {
        request = request.with_format(format);
    }
    Some(request)
}

/// Integer quality clamped to 1..=100. Integers too long for `i64` still
/// clamp by sign; anything else is not a quality.
fn parse_quality(value: &str) -> Option<u8> {
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let q = match value.parse::<i64>() {
        Ok(q) => q,
        Err(_) if value.starts_with('-') => i64::MIN,
        Err(_) => i64::MAX,
    };
    Some(q.clamp(1, 100) as u8)
}

fn normalize_path<'a>(path: &'a str, asset_prefix: &str) -> &'a str {
    let path = path.strip_prefix('/').unwrap_or(path);
    if asset_prefix.is_empty() {
        return path;
    }
    path.strip_prefix(asset_prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}
