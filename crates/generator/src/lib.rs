// Image derivative generation: cache store, resizing, placeholders.
//
// Build flow:
//   1. scan rendered pages into a `PipelineContext` (one per page, merged)
//   2. `ImagePipeline::process` materializes each request, consulting the cache
//   3. `ImagePipeline::finish` persists the cache
//   4. pages are rewritten with `site_kit_markup::Scanner::rewrite_to_derivatives`

pub mod cache;
pub mod context;
pub mod derive;
mod encode;
pub mod error;
pub mod pipeline;
pub mod placeholder;
pub mod publish;
pub mod report;

pub use cache::{CacheEntry, CacheStore, Fingerprint};
pub use context::PipelineContext;
pub use derive::{Derivative, derive};
pub use encode::MAX_PIXELS;
pub use error::ProcessError;
pub use pipeline::{ImagePipeline, Outcome};
pub use placeholder::{placeholder_svg, render_placeholder};
pub use publish::copy_tree;
pub use report::BuildReport;
