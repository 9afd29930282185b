use crate::cache::{CacheEntry, CacheStore, Fingerprint};
use crate::context::PipelineContext;
use crate::derive::derive;
use crate::encode::check_dimensions;
use crate::error::ProcessError;
use crate::placeholder::render_placeholder;
use crate::report::BuildReport;
use site_kit_core::{SiteConfig, TransformRequest};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to a single request
#[derive(Debug)]
pub enum Outcome {
    CacheHit,
    Derived { undersized: Option<(u32, u32)> },
    Placeholder { written: bool },
    Failed(ProcessError),
}

/// Materializes derivatives and placeholders for a batch of requests.
///
/// Requests are processed one at a time against the cache store; a failing
/// request is recorded and the batch moves on.
#[derive(Debug)]
pub struct ImagePipeline {
    source_root: PathBuf,
    output_root: PathBuf,
    cache: CacheStore,
}

impl ImagePipeline {
    pub fn new(source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>, cache: CacheStore) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            cache,
        }
    }

    /// Pipeline for a project, with the cache loaded from its configured file
    pub fn from_config(config: &SiteConfig, project: &Path) -> Self {
        Self::new(
            config.source_root(project),
            config.derivative_root(project),
            CacheStore::load(config.cache_file(project)),
        )
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Location of the source file for a request
    pub fn source_file(&self, request: &TransformRequest) -> PathBuf {
        join_logical(&self.source_root, &request.source)
    }

    /// Location of the derivative or placeholder for a request
    pub fn derivative_file(&self, request: &TransformRequest) -> PathBuf {
        join_logical(&self.output_root, &request.derivative_path())
    }

    /// Process every request in `context` and report the results.
    ///
    /// The cache store is updated in memory; call [`ImagePipeline::finish`]
    /// to persist it.
    pub fn process(&mut self, context: &PipelineContext) -> BuildReport {
        info!(requests = context.len(), "processing image requests");
        let mut report = BuildReport::default();

        for (request, pages) in context.iter() {
            let outcome = self.process_request(request);
            record(&mut report, request, pages, outcome);
        }

        report
    }

    /// Process one request: placeholder for a missing source, cache hit when
    /// the previous output is still fresh, otherwise derive and write.
    pub fn process_request(&mut self, request: &TransformRequest) -> Outcome {
        let key = request.key();
        let relative = request.derivative_path();
        let source = self.source_file(request);
        let dest = self.derivative_file(request);

        if let Err(e) = check_dimensions(request.width, request.height, &dest) {
            return Outcome::Failed(e);
        }

        if !source.is_file() {
            if self.cache.is_fresh(&key, &relative, &dest, None) {
                debug!(key = %key, "placeholder cached");
                return Outcome::Placeholder { written: false };
            }

            warn!(source = %request.source, "missing source, generating placeholder");
            return match render_placeholder(request, &dest).and_then(|(bytes, _)| write_output(&dest, &bytes)) {
                Ok(()) => {
                    self.cache.insert(key, CacheEntry::placeholder(relative));
                    Outcome::Placeholder { written: true }
                }
                Err(e) => Outcome::Failed(e),
            };
        }

        let fingerprint = match Fingerprint::of_file(&source) {
            Ok(fingerprint) => fingerprint,
            Err(e) => return Outcome::Failed(ProcessError::io(&source, e)),
        };

        if self.cache.is_fresh(&key, &relative, &dest, Some(&fingerprint)) {
            debug!(key = %key, "cached");
            return Outcome::CacheHit;
        }

        let derivative = match derive(&source, request, &dest) {
            Ok(derivative) => derivative,
            Err(e) => return Outcome::Failed(e),
        };
        if let Err(e) = write_output(&dest, &derivative.bytes) {
            return Outcome::Failed(e);
        }

        info!(source = %request.source, output = %relative, "processed");
        let undersized = derivative
            .is_undersized(request)
            .then_some(derivative.source_dimensions)
            .flatten();
        self.cache.insert(key, CacheEntry::derivative(relative, fingerprint));
        Outcome::Derived { undersized }
    }

    /// Persist the cache store
    pub fn finish(self) -> io::Result<CacheStore> {
        self.cache.save()?;
        Ok(self.cache)
    }
}

fn record(report: &mut BuildReport, request: &TransformRequest, pages: &BTreeSet<String>, outcome: Outcome) {
    let output_name = request
        .derivative_path()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    match outcome {
        Outcome::CacheHit => report
            .cache_hits
            .push(format!("{} → {}", request.source, output_name)),
        Outcome::Derived { undersized } => {
            if let Some((width, height)) = undersized {
                warn!(source = %request.source, width, height, "image too small");
                report.warnings.push(format!(
                    "Image too small: {} ({}x{}) < requested ({}x{})",
                    request.source, width, height, request.width, request.height
                ));
            }
            report
                .processed
                .push(format!("{} → {}", request.source, output_name));
        }
        Outcome::Placeholder { written } => {
            if written {
                report.placeholders_written += 1;
            }
            let used_in = pages.iter().cloned().collect::<Vec<_>>().join(", ");
            report
                .placeholders
                .push(format!("{} (used in {})", request.source, used_in));
        }
        Outcome::Failed(e) => {
            warn!(source = %request.source, error = %e, "image processing failed");
            report
                .errors
                .push(format!("Failed to process {}: {}", request.source, e));
        }
    }
}

fn write_output(dest: &Path, bytes: &[u8]) -> Result<(), ProcessError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ProcessError::io(parent, e))?;
    }
    fs::write(dest, bytes).map_err(|e| ProcessError::io(dest, e))
}

/// Join a forward-slash logical path onto a filesystem root
fn join_logical(root: &Path, logical: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in logical.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}
