// Deployment transforms applied to a finished build: base-path rewriting
// for project-page hosting and deployment marker files (CNAME).

pub mod base_path;

pub use base_path::{apply_base_path, apply_base_path_to_dir, normalize_base_path};

use anyhow::{Context, Result};
use site_kit_core::config::DeployConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Deployment settings after environment overrides
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeploymentConfig {
    /// Normalized base path, empty when served from the domain root
    pub base_path: String,
    pub custom_domain: Option<String>,
}

pub struct DeploymentResult {
    pub base_path: String,
    pub pages_rewritten: usize,
    pub cname: Option<PathBuf>,
}

impl DeploymentConfig {
    /// Resolve from the process environment
    pub fn from_env(config: &DeployConfig) -> Self {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve settings, reading environment variables through `env`.
    ///
    /// `CUSTOM_DOMAIN` overrides the configured custom domain. The base path
    /// is, in order: the configured `base_path`; empty when a custom domain is
    /// set; `/{repo}` on GitHub Actions (`GITHUB_ACTIONS=true`,
    /// `GITHUB_REPOSITORY=owner/repo`); otherwise empty.
    pub fn resolve<F>(config: &DeployConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let custom_domain = env("CUSTOM_DOMAIN")
            .filter(|d| !d.trim().is_empty())
            .or_else(|| config.custom_domain.clone())
            .map(|d| d.trim().to_string());

        let base_path = if let Some(explicit) = &config.base_path {
            normalize_base_path(explicit)
        } else if custom_domain.is_some() {
            String::new()
        } else {
            let on_actions = env("GITHUB_ACTIONS").as_deref() == Some("true");
            let repo = env("GITHUB_REPOSITORY")
                .and_then(|r| r.split('/').nth(1).map(str::to_string))
                .unwrap_or_default();
            if on_actions && !repo.is_empty() {
                normalize_base_path(&repo)
            } else {
                String::new()
            }
        };

        Self {
            base_path,
            custom_domain,
        }
    }
}

/// Write `CNAME` into `output_dir` when a custom domain is configured
pub fn create_deployment_files(output_dir: &Path, config: &DeploymentConfig) -> Result<Option<PathBuf>> {
    let Some(domain) = &config.custom_domain else {
        return Ok(None);
    };

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let cname = output_dir.join("CNAME");
    fs::write(&cname, domain).with_context(|| format!("Failed to write {}", cname.display()))?;
    Ok(Some(cname))
}

/// Apply the base path to every page and write deployment files
pub fn apply_deployment(output_dir: &Path, config: &DeploymentConfig) -> Result<DeploymentResult> {
    let pages_rewritten = apply_base_path_to_dir(output_dir, &config.base_path)
        .with_context(|| format!("Failed to apply base path in {}", output_dir.display()))?;
    if !config.base_path.is_empty() {
        info!(base_path = %config.base_path, pages = pages_rewritten, "applied base path");
    }

    let cname = create_deployment_files(output_dir, config)?;

    Ok(DeploymentResult {
        base_path: config.base_path.clone(),
        pages_rewritten,
        cname,
    })
}
