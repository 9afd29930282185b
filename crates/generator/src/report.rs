use std::fmt;

/// Outcome of one image batch, printed at the end of a build
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Derivatives written from a real source
    pub processed: Vec<String>,
    /// Requests whose existing output was still fresh
    pub cache_hits: Vec<String>,
    /// Every request whose source is missing, as `path (used in pages)`
    pub placeholders: Vec<String>,
    /// Placeholder images actually written this run
    pub placeholders_written: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl BuildReport {
    /// Files written to the derivative root by this run
    pub fn writes(&self) -> usize {
        self.processed.len() + self.placeholders_written
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "🖼️  Images: {} processed, {} cached, {} placeholders",
            self.processed.len(),
            self.cache_hits.len(),
            self.placeholders.len()
        )?;

        if !self.placeholders.is_empty() {
            writeln!(f, "\n🖼️  Generated placeholders: {}", self.placeholders.len())?;
            for placeholder in &self.placeholders {
                writeln!(f, "   {}", placeholder)?;
            }
        }

        if !self.errors.is_empty() {
            writeln!(f, "\n❌ Image processing errors: {}", self.errors.len())?;
            for error in &self.errors {
                writeln!(f, "   {}", error)?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(f, "\n⚠️  Image processing warnings: {}", self.warnings.len())?;
            for warning in &self.warnings {
                writeln!(f, "   {}", warning)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_sections() {
        let report = BuildReport {
            processed: vec!["team/john.jpg → john-300x300.webp".into()],
            placeholders: vec!["hero/missing.png (used in index.html)".into()],
            placeholders_written: 1,
            errors: vec!["Failed to decode broken.jpg".into()],
            warnings: vec!["Image too small: logo.png (100x50) < requested (300x300)".into()],
            ..Default::default()
        };

        let text = report.to_string();
        assert!(text.contains("1 processed, 0 cached, 1 placeholders"));
        assert!(text.contains("Generated placeholders: 1"));
        assert!(text.contains("hero/missing.png (used in index.html)"));
        assert!(text.contains("Image processing errors: 1"));
        assert!(text.contains("Image processing warnings: 1"));
        assert_eq!(report.writes(), 2);
        assert!(report.has_errors());
    }

    #[test]
    fn test_display_empty_report() {
        let text = BuildReport::default().to_string();
        assert!(!text.contains("placeholders:"));
        assert!(!text.contains("errors"));
    }
}
