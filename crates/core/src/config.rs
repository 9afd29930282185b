use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "site-kit.toml";

/// Raw TOML configuration structure
/// This matches the site-kit.toml file structure exactly; every section is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    site: RawSite,
    #[serde(default)]
    paths: RawPaths,
    #[serde(default)]
    images: RawImages,
    #[serde(default)]
    deploy: DeployConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RawSite {
    name: Option<String>,
    url: Option<String>,
    languages: Option<Vec<String>>,
    default_language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPaths {
    output: Option<String>,
    temp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawImages {
    source_root: Option<String>,
    output_root: Option<String>,
    cache_file: Option<String>,
    asset_prefix: Option<String>,
}

/// Complete, validated site configuration
#[derive(Debug, Clone, Serialize)]
pub struct SiteConfig {
    pub site: SiteMeta,
    pub paths: PathsConfig,
    pub images: ImagesConfig,
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub languages: Vec<String>,
    pub default_language: String,
}

/// Build output locations, relative to the project directory
#[derive(Debug, Clone, Serialize)]
pub struct PathsConfig {
    /// Rendered site; pages are rewritten in place
    pub output: PathBuf,
    pub temp: PathBuf,
}

/// Image derivative pipeline locations
#[derive(Debug, Clone, Serialize)]
pub struct ImagesConfig {
    /// Tree of original images, mirroring the logical image paths used in markup
    pub source_root: PathBuf,
    /// Build cache holding every generated derivative and placeholder
    pub output_root: PathBuf,
    /// Persisted cache store (JSON)
    pub cache_file: PathBuf,
    /// Public directory prefix of images, without leading or trailing slash
    pub asset_prefix: String,
}

/// Deployment settings. Environment variables may override these, see
/// `site_kit_deployer::determine_base_path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        // The raw defaults are known-valid
        match from_raw(RawConfig::default()) {
            Ok(config) => config,
            Err(_) => unreachable!("default configuration is valid"),
        }
    }
}

impl SiteConfig {
    /// Directory holding the rendered site for a project
    pub fn output_dir(&self, project: &Path) -> PathBuf {
        project.join(&self.paths.output)
    }

    /// Where images are published inside the output directory
    pub fn published_images_dir(&self, project: &Path) -> PathBuf {
        let mut dir = self.output_dir(project);
        for segment in self.images.asset_prefix.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir
    }

    pub fn source_root(&self, project: &Path) -> PathBuf {
        project.join(&self.images.source_root)
    }

    pub fn derivative_root(&self, project: &Path) -> PathBuf {
        project.join(&self.images.output_root)
    }

    pub fn cache_file(&self, project: &Path) -> PathBuf {
        project.join(&self.images.cache_file)
    }
}

/// Load `site-kit.toml` from a project directory, falling back to defaults
/// when the file does not exist
pub fn load_site_config<P: AsRef<Path>>(project: P) -> Result<SiteConfig> {
    let path = project.as_ref().join(CONFIG_FILE);
    if !path.exists() {
        return Ok(SiteConfig::default());
    }
    parse_site_toml(path)
}

/// Parse site-kit.toml from a file path
pub fn parse_site_toml<P: AsRef<Path>>(path: P) -> Result<SiteConfig> {
    let content = fs::read_to_string(path)?;
    parse_site_toml_str(&content)
}

/// Parse site-kit.toml from a string (useful for testing)
pub fn parse_site_toml_str(content: &str) -> Result<SiteConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    from_raw(raw)
}

fn from_raw(raw: RawConfig) -> Result<SiteConfig> {
    let languages = raw
        .site
        .languages
        .unwrap_or_else(|| vec!["no".to_string(), "en".to_string()]);
    if languages.is_empty() {
        return Err(Error::ConfigParse(
            "site.languages must list at least one language".to_string(),
        ));
    }
    let default_language = raw
        .site
        .default_language
        .unwrap_or_else(|| languages[0].clone());
    if !languages.contains(&default_language) {
        return Err(Error::ConfigParse(format!(
            "site.default_language '{}' is not one of {:?}",
            default_language, languages
        )));
    }

    let paths = PathsConfig {
        output: validate_path(raw.paths.output.as_deref().unwrap_or("dist"), "paths.output")?,
        temp: validate_path(raw.paths.temp.as_deref().unwrap_or(".temp"), "paths.temp")?,
    };

    let asset_prefix = raw
        .images
        .asset_prefix
        .unwrap_or_else(|| "assets/images".to_string());
    let asset_prefix = asset_prefix.trim_matches('/').to_string();
    if !asset_prefix.is_empty() {
        validate_path(&asset_prefix, "images.asset_prefix")?;
    }

    let images = ImagesConfig {
        source_root: validate_path(
            raw.images.source_root.as_deref().unwrap_or("src/assets/images"),
            "images.source_root",
        )?,
        output_root: validate_path(
            raw.images.output_root.as_deref().unwrap_or(".temp/images"),
            "images.output_root",
        )?,
        cache_file: validate_path(
            raw.images.cache_file.as_deref().unwrap_or(".temp/image-cache.json"),
            "images.cache_file",
        )?,
        asset_prefix,
    };

    Ok(SiteConfig {
        site: SiteMeta {
            name: raw.site.name,
            url: raw.site.url,
            languages,
            default_language,
        },
        paths,
        images,
        deploy: raw.deploy,
    })
}

/// Validate and convert a path string to PathBuf.
///
/// Rejects absolute paths, parent directory references (`..`) and empty
/// paths. Image references found in markup go through the same check before
/// they are joined onto the source root, so a page cannot point the
/// generator outside the project.
///
/// # Examples
///
/// ```text
/// validate_path("src/assets/images", "images.source_root")  → Ok(PathBuf)
/// validate_path("/etc/passwd", "images.source_root")        → Err("Absolute paths not allowed...")
/// validate_path("../../etc", "paths.output")                → Err("Parent directory references...")
/// ```
pub fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    let invalid = |reason: &str| Error::InvalidPath {
        field: field_name.to_string(),
        path: path_str.to_string(),
        reason: reason.to_string(),
    };

    if path_str.trim().is_empty() {
        return Err(invalid("Empty path"));
    }

    let path = Path::new(path_str);

    // Leading separator counts as absolute on every platform
    if path.is_absolute() || path_str.starts_with('/') || path_str.starts_with('\\') {
        return Err(invalid("Absolute paths not allowed. Use relative paths only."));
    }

    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(invalid("Parent directory references (..) not allowed"));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(invalid("Absolute paths not allowed. Use relative paths only."));
            }
            _ => {}
        }
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path_valid_relative() {
        assert!(validate_path("src/assets/images", "images.source_root").is_ok());
        assert!(validate_path(".temp/image-cache.json", "images.cache_file").is_ok());
        assert!(validate_path("team/john.jpg", "reference").is_ok());
    }

    #[test]
    fn test_validate_path_rejects_absolute_unix() {
        let result = validate_path("/etc/passwd", "paths.output");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Absolute paths not allowed")
        );
    }

    #[test]
    fn test_validate_path_rejects_parent_dir() {
        for bad in ["../etc/passwd", "../../secret.txt", "images/../../../etc", "a/b/../../../c"] {
            let result = validate_path(bad, "paths.output");
            assert!(
                result
                    .unwrap_err()
                    .to_string()
                    .contains("Parent directory references"),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_validate_path_rejects_empty() {
        let result = validate_path("", "paths.output");
        assert!(result.unwrap_err().to_string().contains("Empty path"));
        assert!(validate_path("   ", "paths.output").is_err());
    }

    #[test]
    fn test_validate_path_field_name_in_error() {
        let result = validate_path("/etc/passwd", "images.source_root");
        assert!(result.unwrap_err().to_string().contains("images.source_root"));
    }

    #[test]
    fn test_defaults() {
        let config = SiteConfig::default();
        assert_eq!(config.paths.output, PathBuf::from("dist"));
        assert_eq!(config.images.source_root, PathBuf::from("src/assets/images"));
        assert_eq!(config.images.output_root, PathBuf::from(".temp/images"));
        assert_eq!(config.images.cache_file, PathBuf::from(".temp/image-cache.json"));
        assert_eq!(config.images.asset_prefix, "assets/images");
        assert_eq!(config.site.default_language, "no");
        assert!(config.deploy.base_path.is_none());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = parse_site_toml_str("").unwrap();
        assert_eq!(config.images.asset_prefix, "assets/images");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r##"
[site]
name = "Example AS"
url = "https://example.no"
languages = ["en", "no"]

[paths]
output = "public"

[images]
source_root = "images"
asset_prefix = "/static/img/"

[deploy]
base_path = "/website"
custom_domain = "example.no"
        "##;

        let config = parse_site_toml_str(toml).unwrap();
        assert_eq!(config.site.name.as_deref(), Some("Example AS"));
        assert_eq!(config.site.default_language, "en");
        assert_eq!(config.paths.output, PathBuf::from("public"));
        assert_eq!(config.paths.temp, PathBuf::from(".temp"));
        assert_eq!(config.images.source_root, PathBuf::from("images"));
        assert_eq!(config.images.asset_prefix, "static/img");
        assert_eq!(config.deploy.base_path.as_deref(), Some("/website"));
        assert_eq!(config.deploy.custom_domain.as_deref(), Some("example.no"));

        let project = Path::new("proj");
        assert_eq!(
            config.published_images_dir(project),
            PathBuf::from("proj/public/static/img")
        );
    }

    #[test]
    fn test_parse_config_rejects_path_traversal() {
        let toml = r##"
[images]
source_root = "../../../etc"
        "##;
        let result = parse_site_toml_str(toml);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Parent directory references")
        );
    }

    #[test]
    fn test_parse_config_rejects_unknown_default_language() {
        let toml = r##"
[site]
languages = ["no", "en"]
default_language = "sv"
        "##;
        assert!(parse_site_toml_str(toml).is_err());
    }

    #[test]
    fn test_parse_config_rejects_unknown_section() {
        assert!(parse_site_toml_str("[album]\ntitle = \"x\"\n").is_err());
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let config = load_site_config("definitely/not/a/project").unwrap();
        assert_eq!(config.paths.output, PathBuf::from("dist"));
    }
}
