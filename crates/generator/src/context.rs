use site_kit_core::{CacheKey, TransformRequest};
use site_kit_markup::Scanner;
use std::collections::{BTreeMap, BTreeSet};

/// Transform requests collected while scanning pages.
///
/// Each page can be scanned into its own context and the results merged, so
/// scanning carries no shared state. Requests are unique by [`CacheKey`].
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    requests: BTreeMap<CacheKey, Pending>,
}

#[derive(Debug, Clone)]
struct Pending {
    request: TransformRequest,
    pages: BTreeSet<String>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one page into a fresh context
    pub fn scan_page(scanner: &Scanner, page: &str, markup: &str) -> Self {
        let mut context = Self::new();
        for request in scanner.scan(markup, page) {
            context.add(request, page);
        }
        context
    }

    /// Record that `page` uses `request`. The first request seen for a key
    /// keeps its quality.
    pub fn add(&mut self, request: TransformRequest, page: &str) {
        self.requests
            .entry(request.key())
            .or_insert_with(|| Pending {
                request,
                pages: BTreeSet::new(),
            })
            .pages
            .insert(page.to_string());
    }

    pub fn merge(&mut self, other: PipelineContext) {
        for (key, pending) in other.requests {
            match self.requests.get_mut(&key) {
                Some(existing) => existing.pages.extend(pending.pages),
                None => {
                    self.requests.insert(key, pending);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Requests in cache-key order
    pub fn requests(&self) -> impl Iterator<Item = &TransformRequest> {
        self.requests.values().map(|p| &p.request)
    }

    /// Requests with the pages that reference them
    pub fn iter(&self) -> impl Iterator<Item = (&TransformRequest, &BTreeSet<String>)> {
        self.requests.values().map(|p| (&p.request, &p.pages))
    }

    pub fn pages_for(&self, key: &CacheKey) -> Option<&BTreeSet<String>> {
        self.requests.get(key).map(|p| &p.pages)
    }
}

impl FromIterator<PipelineContext> for PipelineContext {
    fn from_iter<I: IntoIterator<Item = PipelineContext>>(iter: I) -> Self {
        let mut merged = PipelineContext::new();
        for context in iter {
            merged.merge(context);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> Scanner {
        Scanner::new("assets/images")
    }

    #[test]
    fn test_scan_page_records_page() {
        let context = PipelineContext::scan_page(
            &scanner(),
            "index.html",
            r#"<img src="/assets/images/a.jpg?size=10x10">"#,
        );
        assert_eq!(context.len(), 1);
        let key: CacheKey = "a.jpg@10x10".parse().unwrap();
        assert!(context.pages_for(&key).unwrap().contains("index.html"));
    }

    #[test]
    fn test_merge_unions_pages_and_keeps_first_quality() {
        let a = PipelineContext::scan_page(
            &scanner(),
            "a.html",
            r#"<img src="/assets/images/x.jpg?size=10x10&quality=40">"#,
        );
        let b = PipelineContext::scan_page(
            &scanner(),
            "b.html",
            r#"<img src="/assets/images/x.jpg?size=10x10&quality=90"><img src="/assets/images/y.jpg?size=1x1">"#,
        );

        let merged: PipelineContext = [a, b].into_iter().collect();
        assert_eq!(merged.len(), 2);

        let key: CacheKey = "x.jpg@10x10".parse().unwrap();
        let pages: Vec<_> = merged.pages_for(&key).unwrap().iter().cloned().collect();
        assert_eq!(pages, vec!["a.html", "b.html"]);
        assert_eq!(merged.requests().next().unwrap().quality, 40);
    }

    #[test]
    fn test_scanning_twice_does_not_grow() {
        let html = r#"<img src="/assets/images/x.jpg?size=10x10"><div style="background:url('/assets/images/x.jpg?size=10x10')"></div>"#;
        let mut context = PipelineContext::scan_page(&scanner(), "p.html", html);
        context.merge(PipelineContext::scan_page(&scanner(), "p.html", html));
        assert_eq!(context.len(), 1);
    }
}
