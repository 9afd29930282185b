use anyhow::{Context, Result};
use site_kit_core::{SiteConfig, load_site_config};
use site_kit_generator::PipelineContext;
use site_kit_markup::Scanner;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A rendered page in the output directory
pub struct Page {
    pub path: PathBuf,
    /// Path relative to the output directory, for reports
    pub label: String,
    pub html: String,
}

/// Validate the project directory and load its configuration.
///
/// Shared by every command so they agree on what a project is.
pub fn load_project(path: &Path) -> Result<SiteConfig> {
    if !path.exists() {
        anyhow::bail!("Project directory does not exist: {}", path.display());
    }
    load_site_config(path).context("Failed to load site-kit.toml")
}

/// Read every `.html` file below `output`, in path order
pub fn load_pages(output: &Path) -> Result<Vec<Page>> {
    if !output.exists() {
        anyhow::bail!(
            "Output directory does not exist: {}\nRender the site before running this command",
            output.display()
        );
    }

    let mut pages = Vec::new();
    for entry in WalkDir::new(output).sort_by_file_name() {
        let entry = entry.context("Failed to walk output directory")?;
        let is_html = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
        if !is_html || !entry.file_type().is_file() {
            continue;
        }

        let html = fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        let label = entry
            .path()
            .strip_prefix(output)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        pages.push(Page {
            path: entry.path().to_path_buf(),
            label,
            html,
        });
    }

    Ok(pages)
}

/// Scan each page separately and merge the results
pub fn scan_pages(scanner: &Scanner, pages: &[Page]) -> PipelineContext {
    pages
        .iter()
        .map(|page| PipelineContext::scan_page(scanner, &page.label, &page.html))
        .collect()
}
