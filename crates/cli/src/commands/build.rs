use anyhow::{Context, Result};
use site_kit_core::SiteConfig;
use site_kit_deployer::{DeploymentConfig, apply_deployment, normalize_base_path};
use site_kit_generator::{BuildReport, ImagePipeline, copy_tree};
use site_kit_markup::Scanner;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::pages::{Page, load_pages, load_project, scan_pages};

/// Post-process a rendered site: image derivatives, then deployment settings
pub async fn run(path: PathBuf, base_path: Option<String>, no_images: bool) -> Result<()> {
    println!("🔨 Building site...");
    println!("   Project: {}", path.display());

    let config = load_project(&path)?;
    let output = config.output_dir(&path);
    println!("   Output: {}", output.display());
    println!();

    let mut pages = load_pages(&output)?;
    println!("✓ Found {} pages", pages.len());

    if no_images {
        println!("   Skipping images (--no-images)");
    } else {
        let report = process_images(&path, &config, &mut pages)?;
        println!();
        print!("{}", report);
    }

    println!();
    println!("🚀 Applying deployment settings...");
    let mut deployment = DeploymentConfig::from_env(&config.deploy);
    if let Some(base) = base_path {
        deployment.base_path = normalize_base_path(&base);
    }
    let result = apply_deployment(&output, &deployment)?;
    if result.base_path.is_empty() {
        println!("   ✓ No base path");
    } else {
        println!(
            "   ✓ Base path {} applied to {} pages",
            result.base_path, result.pages_rewritten
        );
    }
    if let Some(cname) = result.cname {
        println!("   ✓ Wrote {}", cname.display());
    }

    println!();
    println!("✅ Build complete!");
    println!("   Output: {}", output.display());
    println!();

    Ok(())
}

/// Scan, process, rewrite and publish images.
///
/// Every page is scanned before anything is generated, and no page is
/// rewritten until every derivative or placeholder exists.
fn process_images(project: &Path, config: &SiteConfig, pages: &mut [Page]) -> Result<BuildReport> {
    let published = config.published_images_dir(project);
    let source_root = config.source_root(project);

    println!("🎨 Copying source images...");
    let copied = copy_tree(&source_root, &published)
        .with_context(|| format!("Failed to copy images into {}", published.display()))?;
    println!("   ✓ Copied {} images", copied);

    let scanner = Scanner::new(&config.images.asset_prefix);
    let context = scan_pages(&scanner, pages);
    println!("🖼️  Processing {} image requests...", context.len());

    let mut pipeline = ImagePipeline::from_config(config, project);
    let derivative_root = pipeline.output_root().to_path_buf();
    let report = pipeline.process(&context);
    if let Err(e) = pipeline.finish() {
        warn!(error = %e, "failed to save image cache");
    }

    println!("📄 Rewriting image references...");
    let mut rewritten = 0;
    for page in pages.iter_mut() {
        let updated = scanner.rewrite_to_derivatives(&page.html);
        if updated != page.html {
            fs::write(&page.path, &updated)
                .with_context(|| format!("Failed to write {}", page.path.display()))?;
            page.html = updated;
            rewritten += 1;
        }
    }
    println!("   ✓ Rewrote {} pages", rewritten);

    println!("📦 Publishing derivatives...");
    let published_count = copy_tree(&derivative_root, &published)
        .with_context(|| format!("Failed to copy derivatives into {}", published.display()))?;
    println!("   ✓ Copied {} derivatives", published_count);

    Ok(report)
}
