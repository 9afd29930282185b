use crate::encode::{check_dimensions, encode, rasterize_svg};
use crate::error::ProcessError;
use image::imageops::FilterType;
use image::{GenericImageView, ImageReader};
use site_kit_core::{ImageFormat, TransformRequest};
use std::fs;
use std::path::Path;

/// Encoded derivative, ready to be written
#[derive(Debug)]
pub struct Derivative {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    /// Native size of a raster source; `None` for vector sources
    pub source_dimensions: Option<(u32, u32)>,
}

impl Derivative {
    /// Source is smaller than requested on either axis, so the output was upscaled
    pub fn is_undersized(&self, request: &TransformRequest) -> bool {
        match self.source_dimensions {
            Some((w, h)) => w < request.width || h < request.height,
            None => false,
        }
    }
}

/// Produce the derivative for `request` from the source file at `source`.
///
/// Raster output is exactly `width` × `height`: the source is scaled to cover
/// the box and center-cropped. The output keeps the source's encoding unless
/// the request names a format. SVG sources requested as SVG are passed
/// through byte-for-byte. `dest` is only used for error messages.
pub fn derive(
    source: &Path,
    request: &TransformRequest,
    dest: &Path,
) -> Result<Derivative, ProcessError> {
    check_dimensions(request.width, request.height, dest)?;
    let source_format = request.source_format();
    let output_format = request.output_format().unwrap_or(ImageFormat::Png);

    if source_format == Some(ImageFormat::Svg) {
        let svg = fs::read(source).map_err(|e| ProcessError::io(source, e))?;
        if output_format.is_vector() {
            return Ok(Derivative {
                bytes: svg,
                format: output_format,
                source_dimensions: None,
            });
        }
        let raster = rasterize_svg(&svg, request.width, request.height, source)?;
        return Ok(Derivative {
            bytes: encode(&raster, output_format, request.quality, dest)?,
            format: output_format,
            source_dimensions: None,
        });
    }

    if output_format.is_vector() {
        return Err(ProcessError::Unsupported {
            path: source.to_path_buf(),
            format: output_format,
        });
    }

    let image = ImageReader::open(source)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| ProcessError::io(source, e))?
        .decode()
        .map_err(|e| ProcessError::Decode {
            path: source.to_path_buf(),
            source: e,
        })?;

    let source_dimensions = image.dimensions();
    let resized = image.resize_to_fill(request.width, request.height, FilterType::Lanczos3);

    Ok(Derivative {
        bytes: encode(&resized, output_format, request.quality, dest)?,
        format: output_format,
        source_dimensions: Some(source_dimensions),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]))
            .save(&path)
            .unwrap();
        path
    }

    fn dimensions(bytes: &[u8]) -> (u32, u32) {
        image::load_from_memory(bytes).unwrap().dimensions()
    }

    #[test]
    fn test_exact_size_regardless_of_aspect() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "wide.png", 400, 100);

        for (w, h) in [(100, 100), (50, 200), (300, 10), (400, 100)] {
            let request = TransformRequest::new("wide.png", w, h);
            let derivative = derive(&source, &request, Path::new("out.png")).unwrap();
            assert_eq!(dimensions(&derivative.bytes), (w, h));
            assert_eq!(derivative.format, ImageFormat::Png);
        }
    }

    #[test]
    fn test_format_conversion() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "john.png", 600, 600);
        let request = TransformRequest::new("team/john.png", 300, 300).with_format(ImageFormat::Webp);

        let derivative = derive(&source, &request, Path::new("out.webp")).unwrap();
        assert_eq!(derivative.format, ImageFormat::Webp);
        assert_eq!(
            image::guess_format(&derivative.bytes).unwrap(),
            image::ImageFormat::WebP
        );
        assert!(!derivative.is_undersized(&request));
    }

    #[test]
    fn test_undersized_source_is_upscaled() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "logo.png", 100, 50);
        let request = TransformRequest::new("logo.png", 300, 300);

        let derivative = derive(&source, &request, Path::new("out.png")).unwrap();
        assert!(derivative.is_undersized(&request));
        assert_eq!(derivative.source_dimensions, Some((100, 50)));
        assert_eq!(dimensions(&derivative.bytes), (300, 300));
    }

    #[test]
    fn test_corrupt_source_fails() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.jpg");
        fs::write(&source, b"definitely not a jpeg").unwrap();

        let request = TransformRequest::new("broken.jpg", 10, 10);
        let err = derive(&source, &request, Path::new("out.jpg")).unwrap_err();
        assert!(matches!(err, ProcessError::Decode { .. }));
    }

    #[test]
    fn test_raster_to_svg_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path(), "a.png", 10, 10);
        let request = TransformRequest::new("a.png", 5, 5).with_format(ImageFormat::Svg);
        let err = derive(&source, &request, Path::new("out.svg")).unwrap_err();
        assert!(matches!(err, ProcessError::Unsupported { .. }));
    }

    #[test]
    fn test_svg_passthrough_and_rasterize() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("icon.svg");
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24"><circle cx="12" cy="12" r="10" fill="#333"/></svg>"##;
        fs::write(&source, svg).unwrap();

        let passthrough = TransformRequest::new("icon.svg", 48, 48);
        let derivative = derive(&source, &passthrough, Path::new("out.svg")).unwrap();
        assert_eq!(derivative.bytes, svg.as_bytes());
        assert_eq!(derivative.format, ImageFormat::Svg);

        let raster = TransformRequest::new("icon.svg", 64, 32).with_format(ImageFormat::Png);
        let derivative = derive(&source, &raster, Path::new("out.png")).unwrap();
        assert_eq!(dimensions(&derivative.bytes), (64, 32));
        assert!(!derivative.is_undersized(&raster));
    }
}
