use crate::encode::{check_dimensions, encode, rasterize_svg};
use crate::error::ProcessError;
use site_kit_core::{ImageFormat, TransformRequest};
use std::path::Path;

/// Quality for lossy placeholder encodings
const PLACEHOLDER_QUALITY: u8 = 90;

/// SVG markup of the placeholder for `request`.
///
/// Flat grey background, a dashed inner border, the source's label and the
/// requested dimensions. Font sizes follow the smaller side so the text stays
/// legible at any aspect ratio.
pub fn placeholder_svg(request: &TransformRequest) -> String {
    let (width, height) = (request.width, request.height);
    let base = width.min(height) as f32;
    let label_size = base * 0.1;
    let dims_size = base * 0.08;
    let stroke = (base * 0.01).max(1.0);
    let dash = (base * 0.05).max(2.0);

    format!(
        r##"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg">
  <rect width="100%" height="100%" fill="#e0e0e0"/>
  <rect x="10%" y="10%" width="80%" height="80%" fill="none" stroke="#999" stroke-width="{stroke}" stroke-dasharray="{dash},{gap}"/>
  <text x="50%" y="45%" font-family="Arial, sans-serif" font-size="{label_size}" fill="#666" text-anchor="middle" dominant-baseline="middle">{label}</text>
  <text x="50%" y="55%" font-family="Arial, sans-serif" font-size="{dims_size}" fill="#999" text-anchor="middle" dominant-baseline="middle">{width}×{height}</text>
</svg>
"##,
        gap = dash / 2.0,
        label = xml_escape(&request.label()),
    )
}

/// Encoded placeholder image for `request`, in the requested format. Without
/// one, SVG sources get an SVG placeholder and everything else PNG. `dest` is
/// only used for error messages.
pub fn render_placeholder(
    request: &TransformRequest,
    dest: &Path,
) -> Result<(Vec<u8>, ImageFormat), ProcessError> {
    check_dimensions(request.width, request.height, dest)?;
    let format = request
        .format
        .or_else(|| request.source_format().filter(|f| f.is_vector()))
        .unwrap_or(ImageFormat::Png);
    let svg = placeholder_svg(request);

    if format.is_vector() {
        return Ok((svg.into_bytes(), format));
    }

    let raster = rasterize_svg(svg.as_bytes(), request.width, request.height, dest)?;
    let bytes = encode(&raster, format, PLACEHOLDER_QUALITY, dest)?;
    Ok((bytes, format))
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
