use crate::error::ProcessError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use site_kit_core::ImageFormat;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, LazyLock};

/// Largest output canvas, in pixels (16383 × 16383)
pub const MAX_PIXELS: u64 = 0x3FFF * 0x3FFF;

/// Reject output sizes whose buffers would exceed [`MAX_PIXELS`]
pub(crate) fn check_dimensions(width: u32, height: u32, path: &Path) -> Result<(), ProcessError> {
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(ProcessError::TooLarge {
            path: path.to_path_buf(),
            width,
            height,
            limit: MAX_PIXELS,
        });
    }
    Ok(())
}

/// System fonts, loaded once per process for SVG text rendering
static FONTS: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
});

/// Encode a raster image in `format`.
///
/// JPEG honours `quality`. PNG and GIF are lossless. WebP output is lossless
/// because that is the only WebP encoder `image` provides, so `quality` has no
/// effect there. `dest` is only used for error messages.
pub(crate) fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    quality: u8,
    dest: &Path,
) -> Result<Vec<u8>, ProcessError> {
    let encode_err = |source| ProcessError::Encode {
        path: dest.to_path_buf(),
        source,
    };

    let mut buffer = Vec::new();
    match format {
        ImageFormat::Jpg | ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder).map_err(encode_err)?;
        }
        ImageFormat::Png => {
            image
                .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
                .map_err(encode_err)?;
        }
        ImageFormat::Webp => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))
                .map_err(encode_err)?;
        }
        ImageFormat::Gif => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            rgba.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Gif)
                .map_err(encode_err)?;
        }
        ImageFormat::Svg => {
            return Err(ProcessError::Unsupported {
                path: dest.to_path_buf(),
                format,
            });
        }
    }
    Ok(buffer)
}

/// Rasterize SVG markup to exactly `width` × `height`.
///
/// The drawing is scaled to cover the canvas and centered, so any aspect
/// mismatch is cropped rather than letterboxed, matching how raster sources
/// are resized.
pub(crate) fn rasterize_svg(
    svg: &[u8],
    width: u32,
    height: u32,
    path: &Path,
) -> Result<DynamicImage, ProcessError> {
    check_dimensions(width, height, path)?;
    let svg_err = |reason: String| ProcessError::Svg {
        path: path.to_path_buf(),
        reason,
    };

    let options = usvg::Options {
        fontdb: Arc::clone(&FONTS),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(svg, &options).map_err(|e| svg_err(e.to_string()))?;

    let size = tree.size();
    let (source_width, source_height) = (size.width(), size.height());
    if source_width <= 0.0 || source_height <= 0.0 {
        return Err(svg_err("SVG has no drawable area".to_string()));
    }

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| svg_err(format!("cannot allocate {}x{} canvas", width, height)))?;

    let scale = (width as f32 / source_width).max(height as f32 / source_height);
    let translate_x = (width as f32 - source_width * scale) * 0.5;
    let translate_y = (height as f32 - source_height * scale) * 0.5;
    let transform = Transform::from_row(scale, 0.0, 0.0, scale, translate_x, translate_y);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(DynamicImage::ImageRgba8(pixmap_to_image(&pixmap)))
}

fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = image::Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    image
}
