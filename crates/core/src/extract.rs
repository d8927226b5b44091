//! Extraction: read a candidate entry, decode it, shrink it into the target
//! box and encode the result as PNG.

use std::io::{Cursor, Read, Seek};

use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

use crate::archive::CoverArchive;
use crate::error::ExtractError;

/// Resampling filter used when shrinking the cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(f: ResizeFilter) -> Self {
        match f {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// An encoded thumbnail plus what it was made from.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub source_width: u32,
    pub source_height: u32,
    /// Color type as stored in the source file (e.g. `Cmyk8` for print JPEGs).
    pub source_color: ExtendedColorType,
}

/// Read `path` from the container and render it as a thumbnail.
pub fn extract_cover<R: Read + Seek>(
    archive: &mut CoverArchive<R>,
    path: &str,
    size: u32,
    filter: ResizeFilter,
) -> Result<Thumbnail, ExtractError> {
    let bytes = archive.read_entry(path)?;
    render_thumbnail(path, &bytes, size, filter)
}

pub fn render_thumbnail(
    path: &str,
    bytes: &[u8],
    size: u32,
    filter: ResizeFilter,
) -> Result<Thumbnail, ExtractError> {
    let unsupported = |detail: String| ExtractError::UnsupportedImage {
        path: path.to_string(),
        detail,
    };

    let decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| unsupported(e.to_string()))?
        .into_decoder()
        .map_err(|e| unsupported(e.to_string()))?;
    // The decoder reports CMYK JPEGs as already converted to RGB.
    let source_color = match jpeg_components(bytes) {
        Some(4) => ExtendedColorType::Cmyk8,
        _ => decoder.original_color_type(),
    };
    let image = DynamicImage::from_decoder(decoder).map_err(|e| unsupported(e.to_string()))?;

    let (source_width, source_height) = (image.width(), image.height());
    let resized = fit_within(&image, size, filter);
    let output = normalize_color(resized, source_color);

    let mut png = Cursor::new(Vec::new());
    output
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| ExtractError::Encode(e.to_string()))?;

    tracing::debug!(
        "Rendered {} ({}x{} {:?}) -> {}x{}",
        path,
        source_width,
        source_height,
        source_color,
        output.width(),
        output.height()
    );

    Ok(Thumbnail {
        png: png.into_inner(),
        width: output.width(),
        height: output.height(),
        source_width,
        source_height,
        source_color,
    })
}

/// Shrink into a `size`×`size` box keeping the aspect ratio. Never upscales.
pub fn fit_within(image: &DynamicImage, size: u32, filter: ResizeFilter) -> DynamicImage {
    if image.width() <= size && image.height() <= size {
        return image.clone();
    }
    image.resize(size, size, filter.into())
}

/// Component count from the first JPEG frame header, or `None` if `bytes` is
/// not a JPEG. Four components means CMYK (or YCCK).
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        match marker {
            // fill byte
            0xFF => pos += 1,
            0x01 | 0xD0..=0xD7 => pos += 2,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                return bytes.get(pos + 9).copied();
            }
            0xD9 | 0xDA => return None,
            _ => {
                let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
                pos += 2 + len;
            }
        }
    }
    None
}

/// PNG output is RGB, or RGBA when the source carries alpha. CMYK sources
/// are always flattened to RGB.
fn normalize_color(image: DynamicImage, source_color: ExtendedColorType) -> DynamicImage {
    let cmyk = matches!(source_color, ExtendedColorType::Cmyk8);
    if cmyk {
        tracing::debug!("Converting CMYK cover to RGB");
    }
    if image.color().has_alpha() && !cmyk {
        DynamicImage::ImageRgba8(image.into_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.into_rgb8())
    }
}
