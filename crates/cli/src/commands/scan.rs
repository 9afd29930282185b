use anyhow::{Context, Result};
use serde_json::json;
use site_kit_generator::ImagePipeline;
use site_kit_markup::Scanner;
use std::path::PathBuf;

use super::pages::{load_pages, load_project, scan_pages};

/// List derivative requests without generating anything
pub async fn run(path: PathBuf, as_json: bool) -> Result<()> {
    let config = load_project(&path)?;
    let pages = load_pages(&config.output_dir(&path))?;

    let scanner = Scanner::new(&config.images.asset_prefix);
    let context = scan_pages(&scanner, &pages);
    let pipeline = ImagePipeline::from_config(&config, &path);

    if as_json {
        let requests: Vec<_> = context
            .iter()
            .map(|(request, used_in)| {
                json!({
                    "key": request.key().to_string(),
                    "source": request.source,
                    "width": request.width,
                    "height": request.height,
                    "format": request.format.map(|f| f.to_string()),
                    "quality": request.quality,
                    "url": scanner.public_url(request),
                    "sourceExists": pipeline.source_file(request).is_file(),
                    "pages": used_in,
                })
            })
            .collect();
        let output = serde_json::to_string_pretty(&requests).context("Failed to serialize requests")?;
        println!("{}", output);
        return Ok(());
    }

    println!("🔍 {} image requests in {} pages", context.len(), pages.len());
    for (request, used_in) in context.iter() {
        let marker = if pipeline.source_file(request).is_file() {
            "✓"
        } else {
            "⚠ missing"
        };
        println!("   {} {} → {}", marker, request.key(), scanner.public_url(request));
        println!(
            "      used in {}",
            used_in.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}
