use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Encoder quality used when a reference carries no `quality=` parameter
pub const DEFAULT_QUALITY: u8 = 80;

/// Image encodings recognised in references and source file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageFormat {
    Jpg,
    Jpeg,
    Png,
    Webp,
    Gif,
    Svg,
}

impl ImageFormat {
    /// Parse the value of a `format=` parameter.
    ///
    /// GIF is accepted as a source encoding but is not a valid conversion
    /// target, so it is rejected here.
    pub fn from_param(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Detect the encoding family from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("gif") {
            return Some(Self::Gif);
        }
        Self::from_param(ext)
    }

    /// File extension written for this format
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Svg => "svg",
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, Self::Svg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A request for one derivative of a source image.
///
/// `source` is the normalized logical path (forward slashes, no leading
/// separator, no asset-directory prefix). Identity is `(source, width,
/// height, format)`; `quality` only affects encoding. See [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
    pub quality: u8,
}

impl TransformRequest {
    pub fn new(source: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            source: source.into(),
            width,
            height,
            format: None,
            quality: DEFAULT_QUALITY,
        }
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set encoder quality, clamped to 1..=100
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn key(&self) -> CacheKey {
        CacheKey {
            source: self.source.clone(),
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }

    /// Relative path of the derivative, e.g. `team/john-300x300.webp`
    pub fn derivative_path(&self) -> String {
        derivative_path(&self.source, self.width, self.height, self.format)
    }

    /// Encoding family of the source file, from its extension
    pub fn source_format(&self) -> Option<ImageFormat> {
        let (_, ext) = split_extension(file_name(&self.source));
        ImageFormat::from_extension(ext)
    }

    /// Requested format, falling back to the source's own encoding
    pub fn output_format(&self) -> Option<ImageFormat> {
        self.format.or_else(|| self.source_format())
    }

    /// Human-readable label for placeholders ("hero-about_us.png" -> "Hero About Us")
    pub fn label(&self) -> String {
        let (name, _) = split_extension(file_name(&self.source));
        name.split(['-', '_'])
            .filter(|word| !word.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Composite identity of a [`TransformRequest`].
///
/// The string form (`team/john.jpg@300x300.webp`) is only used as the key of
/// the persisted cache file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
}

impl CacheKey {
    pub fn derivative_path(&self) -> String {
        derivative_path(&self.source, self.width, self.height, self.format)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}x{}", self.source, self.width, self.height)?;
        if let Some(format) = self.format {
            write!(f, ".{}", format)?;
        }
        Ok(())
    }
}

impl FromStr for CacheKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidData(format!("Malformed cache key '{}'", s));

        let (source, spec) = s.rsplit_once('@').ok_or_else(invalid)?;
        if source.is_empty() {
            return Err(invalid());
        }

        let (dims, format) = match spec.split_once('.') {
            Some((dims, ext)) => (dims, Some(ImageFormat::from_param(ext).ok_or_else(invalid)?)),
            None => (spec, None),
        };
        let (width, height) = parse_dimensions(dims).ok_or_else(invalid)?;

        Ok(CacheKey {
            source: source.to_string(),
            width,
            height,
            format,
        })
    }
}

/// Parse `WxH` into a pair of positive integers
pub fn parse_dimensions(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once('x')?;
    let width: u32 = w.parse().ok()?;
    let height: u32 = h.parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

/// Deterministic derivative location: `{dir}/{name}-{width}x{height}.{ext}`.
///
/// `ext` is the requested format's extension, or the source's own extension
/// when no format was requested. Both the generator and the markup rewriter
/// call this, so a reference always resolves to the file that was written.
pub fn derivative_path(
    source: &str,
    width: u32,
    height: u32,
    format: Option<ImageFormat>,
) -> String {
    let (dir, file) = match source.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", source),
    };
    let (name, source_ext) = split_extension(file);
    let ext = format.map(ImageFormat::extension).unwrap_or(source_ext);

    let file_name = if ext.is_empty() {
        format!("{}-{}x{}", name, width, height)
    } else {
        format!("{}-{}x{}.{}", name, width, height, ext)
    };

    if dir.is_empty() {
        file_name
    } else {
        format!("{}/{}", dir, file_name)
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn split_extension(file: &str) -> (&str, &str) {
    match file.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() => (name, ext),
        _ => (file, ""),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
