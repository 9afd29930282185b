use regex::{Captures, Regex};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;
use walkdir::WalkDir;

static SITE_ABSOLUTE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?P<attr>src|href)="(?P<url>/[^"]*)""#).expect("base path pattern is valid")
});

/// Normalize a base path to `/segment[/segment…]`, or empty for the site root
pub fn normalize_base_path(base: &str) -> String {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Prefix every site-absolute `src="/…"` and `href="/…"` with `base`.
///
/// Protocol-relative URLs (`//host/…`) and URLs already under `base` are
/// left alone, so applying the same base twice changes nothing.
pub fn apply_base_path(html: &str, base: &str) -> String {
    let base = normalize_base_path(base);
    if base.is_empty() {
        return html.to_string();
    }

    SITE_ABSOLUTE_ATTR
        .replace_all(html, |caps: &Captures| {
            let url = &caps["url"];
            let already_based = url == base || url.starts_with(&format!("{}/", base));
            if url.starts_with("//") || already_based {
                caps[0].to_string()
            } else {
                format!(r#"{}="{}{}""#, &caps["attr"], base, url)
            }
        })
        .into_owned()
}

/// Apply [`apply_base_path`] to every `.html` file under `dir`.
/// Returns the number of files whose content changed.
pub fn apply_base_path_to_dir(dir: &Path, base: &str) -> io::Result<usize> {
    if normalize_base_path(base).is_empty() {
        return Ok(0);
    }

    let mut rewritten = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::other)?;
        if !is_html(entry.path()) || !entry.file_type().is_file() {
            continue;
        }

        let content = fs::read_to_string(entry.path())?;
        let updated = apply_base_path(&content, base);
        if updated != content {
            fs::write(entry.path(), updated)?;
            debug!(file = %entry.path().display(), "applied base path");
            rewritten += 1;
        }
    }

    Ok(rewritten)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}
