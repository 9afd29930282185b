use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use super::pages::load_project;

/// Remove the persisted image cache and the derivative root
pub async fn run(path: PathBuf) -> Result<()> {
    let config = load_project(&path)?;

    let cache_file = config.cache_file(&path);
    if cache_file.exists() {
        fs::remove_file(&cache_file)
            .with_context(|| format!("Failed to remove {}", cache_file.display()))?;
        println!("🧹 Removed {}", cache_file.display());
    }

    let derivatives = config.derivative_root(&path);
    if derivatives.exists() {
        fs::remove_dir_all(&derivatives)
            .with_context(|| format!("Failed to remove {}", derivatives.display()))?;
        println!("🧹 Removed {}", derivatives.display());
    }

    println!("✅ Image cache cleared");
    Ok(())
}
