use crate::reference::{ImageReference, find_references, parse_request};
use site_kit_core::{CacheKey, TransformRequest};
use std::collections::HashSet;
use tracing::debug;

/// Finds derivative requests in rendered markup and rewrites them to
/// derivative URLs.
#[derive(Debug, Clone)]
pub struct Scanner {
    asset_prefix: String,
}

impl Scanner {
    /// `asset_prefix` is the public image directory (e.g. `assets/images`);
    /// it is stripped from scanned paths and prepended to rewritten ones.
    pub fn new(asset_prefix: &str) -> Self {
        Self {
            asset_prefix: asset_prefix.trim_matches('/').to_string(),
        }
    }

    pub fn asset_prefix(&self) -> &str {
        &self.asset_prefix
    }

    /// Every image reference carrying a query, whether or not it is a valid request
    pub fn references<'a>(&self, markup: &'a str) -> Vec<ImageReference<'a>> {
        find_references(markup)
    }

    /// Extract the distinct transform requests in `markup`.
    ///
    /// Requests are unique by [`CacheKey`]; when the same key appears more
    /// than once the first occurrence (and its quality) wins. `label` names
    /// the page for diagnostics only.
    pub fn scan(&self, markup: &str, label: &str) -> Vec<TransformRequest> {
        let mut seen = HashSet::<CacheKey>::new();
        let mut requests = Vec::new();

        for reference in find_references(markup) {
            match parse_request(reference.url, &self.asset_prefix) {
                Some(request) => {
                    if seen.insert(request.key()) {
                        debug!(page = label, url = reference.url, key = %request.key(), "image request");
                        requests.push(request);
                    }
                }
                None => {
                    debug!(page = label, url = reference.url, "not a derivative request, skipping");
                }
            }
        }

        requests
    }

    /// Replace each recognised request with `resolve(request)`.
    ///
    /// Only the URL inside the attribute value or `url(...)` token is
    /// replaced; quotes, sibling gradient layers and trailing properties stay
    /// as written. References that `scan` would skip are left untouched.
    pub fn rewrite<F>(&self, markup: &str, mut resolve: F) -> String
    where
        F: FnMut(&TransformRequest) -> String,
    {
        let mut output = String::with_capacity(markup.len());
        let mut cursor = 0;

        for reference in find_references(markup) {
            let Some(request) = parse_request(reference.url, &self.asset_prefix) else {
                continue;
            };
            output.push_str(&markup[cursor..reference.span.start]);
            output.push_str(&resolve(&request));
            cursor = reference.span.end;
        }

        output.push_str(&markup[cursor..]);
        output
    }

    /// Rewrite every request to its derivative's public URL
    pub fn rewrite_to_derivatives(&self, markup: &str) -> String {
        self.rewrite(markup, |request| self.public_url(request))
    }

    /// Site-absolute URL of a request's derivative, e.g.
    /// `/assets/images/team/john-300x300.webp`
    pub fn public_url(&self, request: &TransformRequest) -> String {
        if self.asset_prefix.is_empty() {
            format!("/{}", request.derivative_path())
        } else {
            format!("/{}/{}", self.asset_prefix, request.derivative_path())
        }
    }
}
