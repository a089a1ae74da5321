//! Crop export: load an image, copy the crop rectangle onto a fresh buffer
//! and encode it as PNG bytes plus a `data:` URL.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::ExportError;
use crate::types::{CropArea, now_millis};

pub const DEFAULT_MAX_IMAGE_SIZE: u32 = 4096;
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 200;
/// Largest side of an export buffer, after pixel-ratio scaling.
pub const MAX_EXPORT_DIMENSION: u32 = DEFAULT_MAX_IMAGE_SIZE * 4;

/// Where an image comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    /// `data:<mime>;base64,<payload>`
    DataUrl(String),
    Bytes(Vec<u8>),
}

impl ImageSource {
    pub fn parse(source: &str) -> Result<Self, ExportError> {
        let trimmed = source.trim();
        if trimmed.starts_with("data:") {
            Ok(Self::DataUrl(trimmed.to_string()))
        } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Err(ExportError::UnsupportedSource(trimmed.to_string()))
        } else {
            Ok(Self::Path(PathBuf::from(trimmed)))
        }
    }

    /// File name of a path source, empty for in-memory sources.
    pub fn file_name(&self) -> String {
        match self {
            ImageSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => String::new(),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => write!(f, "{}", path.display()),
            ImageSource::DataUrl(url) => {
                let header = url.split(',').next().unwrap_or_default();
                write!(f, "{header},…")
            }
            ImageSource::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Decodes the payload of a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, ExportError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| ExportError::DataUrl("missing `data:` prefix".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ExportError::DataUrl("missing `,` separator".into()))?;
    if !header.ends_with(";base64") {
        return Err(ExportError::DataUrl("only base64 payloads are supported".into()));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ExportError::DataUrl(e.to_string()))
}

pub fn encode_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn load_image(source: &ImageSource) -> Result<DynamicImage, ExportError> {
    let image = match source {
        ImageSource::Path(path) => {
            let bytes = std::fs::read(path).map_err(|source| ExportError::Read {
                path: path.clone(),
                source,
            })?;
            image::load_from_memory(&bytes)
        }
        ImageSource::DataUrl(url) => image::load_from_memory(&decode_data_url(url)?),
        ImageSource::Bytes(bytes) => image::load_from_memory(bytes),
    }
    .map_err(ExportError::Load)?;

    log::info!(
        "Loaded {} ({}×{})",
        source,
        image.width(),
        image.height()
    );
    Ok(image)
}

/// An exported crop. `width`/`height` are the crop size in source pixels;
/// `image` may be larger when exported at a pixel ratio above 1.
#[derive(Clone, Debug)]
pub struct CropResult {
    pub image: RgbaImage,
    pub png: Vec<u8>,
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

pub fn export_cropped_image(
    source: &ImageSource,
    area: &CropArea,
    pixel_ratio: f32,
) -> Result<CropResult, ExportError> {
    let image = load_image(source)?;
    export_from_image(&image, area, pixel_ratio)
}

pub fn export_from_image(
    image: &DynamicImage,
    area: &CropArea,
    pixel_ratio: f32,
) -> Result<CropResult, ExportError> {
    let x = area.top_left.x.round() as i64;
    let y = area.top_left.y.round() as i64;
    let width = (area.bottom_right.x - area.top_left.x).round() as i64;
    let height = (area.bottom_right.y - area.top_left.y).round() as i64;

    if width <= 0 || height <= 0 {
        return Err(ExportError::InvalidCropArea { width, height });
    }

    let out = crop_to_buffer(image, x, y, width, height)?;
    let out = scale_for_ratio(out, pixel_ratio)?;
    let png = encode_png(&out)?;
    let data_url = encode_data_url(&png, "image/png");

    log::info!(
        "Exported {}×{} crop at ({x}, {y}), {}",
        width,
        height,
        format_file_size(png.len() as u64)
    );

    Ok(CropResult {
        image: out,
        png,
        data_url,
        width: width as u32,
        height: height as u32,
    })
}

/// Checks that a `width × height` RGBA buffer is within the export limit.
fn buffer_size(width: i64, height: i64) -> Result<(u32, u32), ExportError> {
    let unavailable = || ExportError::BufferUnavailable {
        width: width.max(0) as u64,
        height: height.max(0) as u64,
    };
    let w = u32::try_from(width).map_err(|_| unavailable())?;
    let h = u32::try_from(height).map_err(|_| unavailable())?;
    if w == 0 || h == 0 || w > MAX_EXPORT_DIMENSION || h > MAX_EXPORT_DIMENSION {
        return Err(unavailable());
    }
    (w as usize)
        .checked_mul(h as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(unavailable)?;
    Ok((w, h))
}

fn allocate(width: i64, height: i64) -> Result<RgbaImage, ExportError> {
    let (w, h) = buffer_size(width, height)?;
    Ok(RgbaImage::new(w, h))
}

/// Copies the crop rectangle; parts outside the source stay transparent.
fn crop_to_buffer(
    image: &DynamicImage,
    x: i64,
    y: i64,
    width: i64,
    height: i64,
) -> Result<RgbaImage, ExportError> {
    let mut out = allocate(width, height)?;

    let src_x0 = x.max(0);
    let src_y0 = y.max(0);
    let src_x1 = (x + width).min(image.width() as i64);
    let src_y1 = (y + height).min(image.height() as i64);

    if src_x1 > src_x0 && src_y1 > src_y0 {
        let visible = image
            .crop_imm(
                src_x0 as u32,
                src_y0 as u32,
                (src_x1 - src_x0) as u32,
                (src_y1 - src_y0) as u32,
            )
            .to_rgba8();
        imageops::replace(&mut out, &visible, src_x0 - x, src_y0 - y);
    }

    Ok(out)
}

fn scale_for_ratio(image: RgbaImage, pixel_ratio: f32) -> Result<RgbaImage, ExportError> {
    let ratio = if pixel_ratio.is_finite() { pixel_ratio.max(1.0) } else { 1.0 };
    if ratio <= 1.0 {
        return Ok(image);
    }
    let width = (image.width() as f32 * ratio).round() as i64;
    let height = (image.height() as f32 * ratio).round() as i64;
    let (width, height) = buffer_size(width, height)?;
    Ok(imageops::resize(&image, width, height, FilterType::Triangle))
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(ExportError::Encode)?;
    Ok(png)
}

/// Writes the PNG to `path`.
pub fn download_image(result: &CropResult, path: &Path) -> Result<(), ExportError> {
    std::fs::write(path, &result.png).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Saved crop to {}", path.display());
    Ok(())
}

pub fn default_download_name() -> String {
    format!("cropped-{}.png", now_millis())
}

pub fn validate_image_size(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err("Invalid image size".to_string());
    }
    if width > max_width || height > max_height {
        return Err(format!(
            "Image too large ({width}×{height}), maximum is {max_width}×{max_height}"
        ));
    }
    Ok(())
}

pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else if b < KB * KB * KB {
        format!("{:.1} MB", b / (KB * KB))
    } else {
        format!("{:.1} GB", b / (KB * KB * KB))
    }
}

/// Problems that would make a crop area unusable for an image.
pub fn crop_area_issues(area: &CropArea, image_width: f32, image_height: f32) -> Vec<String> {
    let mut issues = Vec::new();
    let CropArea {
        top_left,
        bottom_right,
    } = area;

    if top_left.x < 0.0 || top_left.y < 0.0 {
        issues.push("Top-left corner has negative coordinates".to_string());
    }
    if bottom_right.x < 0.0 || bottom_right.y < 0.0 {
        issues.push("Bottom-right corner has negative coordinates".to_string());
    }
    if bottom_right.x > image_width {
        issues.push(format!(
            "Bottom-right x ({}) exceeds image width ({image_width})",
            bottom_right.x
        ));
    }
    if bottom_right.y > image_height {
        issues.push(format!(
            "Bottom-right y ({}) exceeds image height ({image_height})",
            bottom_right.y
        ));
    }
    if !area.has_positive_area() {
        issues.push("Crop area must have a positive size".to_string());
    }
    issues
}

pub fn is_crop_area_valid(area: &CropArea, image_width: f32, image_height: f32) -> bool {
    crop_area_issues(area, image_width, image_height).is_empty()
}

/// `photo.jpg` becomes `photo-cropped-<timestamp>.png`.
pub fn generate_filename(original: &str, suffix: &str, timestamp: Option<u64>) -> String {
    let base = match original.rfind('.') {
        Some(idx) if idx + 1 < original.len() && !original[idx + 1..].contains(['/', '\\']) => {
            &original[..idx]
        }
        _ => original,
    };
    let base = if base.is_empty() { "image" } else { base };
    match timestamp {
        Some(ts) => format!("{base}-{suffix}-{ts}.png"),
        None => format!("{base}-{suffix}.png"),
    }
}

/// Downscales so the width is at most `max_width`; never upscales.
pub fn thumbnail(image: &RgbaImage, max_width: u32) -> RgbaImage {
    let ratio = (max_width as f32 / image.width().max(1) as f32).min(1.0);
    if ratio >= 1.0 {
        return image.clone();
    }
    let width = ((image.width() as f32 * ratio).round() as u32).max(1);
    let height = ((image.height() as f32 * ratio).round() as u32).max(1);
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Crop preview as a PNG `data:` URL.
pub fn create_thumbnail(
    source: &ImageSource,
    area: &CropArea,
    max_width: u32,
) -> Result<String, ExportError> {
    let result = export_cropped_image(source, area, 1.0)?;
    let png = encode_png(&thumbnail(&result.image, max_width))?;
    Ok(encode_data_url(&png, "image/png"))
}

/// Exports several areas from one source. Areas that do not fit the image
/// or fail to export are skipped.
pub fn batch_export(
    source: &ImageSource,
    areas: &[CropArea],
    pixel_ratio: f32,
) -> Result<Vec<CropResult>, ExportError> {
    let image = load_image(source)?;
    let mut results = Vec::with_capacity(areas.len());
    let (image_width, image_height) = (image.width() as f32, image.height() as f32);
    for area in areas {
        let issues = crop_area_issues(area, image_width, image_height);
        if !issues.is_empty() {
            log::warn!("Skipping crop area {area:?}: {}", issues.join("; "));
            continue;
        }
        match export_from_image(&image, area, pixel_ratio) {
            Ok(result) => results.push(result),
            Err(e) => log::warn!("Skipping crop area {area:?}: {e}"),
        }
    }
    Ok(results)
}

/// Output formats this build can encode.
pub fn supported_formats() -> Vec<ImageFormat> {
    [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP]
        .into_iter()
        .filter(|format| format.writing_enabled())
        .collect()
}
