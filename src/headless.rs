//! Non-interactive crops driven from the command line.

use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::export::{
    DEFAULT_THUMBNAIL_WIDTH, ImageSource, batch_export, create_thumbnail, download_image,
    generate_filename, supported_formats,
};
use crate::types::{CropArea, Point, now_millis};

/// Parses `X0,Y0,X1,Y1` into a normalized area. Used as a clap value parser.
pub fn parse_crop(value: &str) -> Result<CropArea, String> {
    let coords = value
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in `{value}`: {e}"))?;

    match coords.as_slice() {
        [x0, y0, x1, y1] => Ok(CropArea::from_corners(
            Point::new(*x0, *y0),
            Point::new(*x1, *y1),
        )),
        _ => Err(format!("expected X0,Y0,X1,Y1, got `{value}`")),
    }
}

/// Writes one PNG per area into `output_dir`. Returns the written paths.
pub fn crop_to_files(
    source: &ImageSource,
    areas: &[CropArea],
    pixel_ratio: f32,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    let results = batch_export(source, areas, pixel_ratio)?;
    if results.len() < areas.len() {
        log::warn!("{} of {} areas exported", results.len(), areas.len());
    }

    let name = source.file_name();
    let stamp = now_millis();
    let mut written = Vec::with_capacity(results.len());
    for (idx, result) in results.iter().enumerate() {
        let suffix = if results.len() == 1 {
            "cropped".to_string()
        } else {
            format!("cropped{}", idx + 1)
        };
        let path = output_dir.join(generate_filename(&name, &suffix, Some(stamp)));
        download_image(result, &path)?;
        written.push(path);
    }
    Ok(written)
}

pub fn thumbnail_data_url(source: &ImageSource, area: &CropArea) -> Result<String, ExportError> {
    create_thumbnail(source, area, DEFAULT_THUMBNAIL_WIDTH)
}

pub fn format_list() -> Vec<String> {
    supported_formats()
        .into_iter()
        .flat_map(|format| format.extensions_str().first().copied())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn write_sample(dir: &Path) -> PathBuf {
        let path = dir.join("sample.png");
        let img = RgbaImage::from_pixel(40, 30, Rgba([10, 200, 30, 255]));
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn test_parse_crop_normalizes_corners() {
        let area = parse_crop("30, 20,10,5").unwrap();
        assert_eq!(area.top_left, Point::new(10.0, 5.0));
        assert_eq!(area.bottom_right, Point::new(30.0, 20.0));
    }

    #[test]
    fn test_parse_crop_rejects_bad_input() {
        assert!(parse_crop("1,2,3").is_err());
        assert!(parse_crop("1,2,3,x").is_err());
        assert!(parse_crop("").is_err());
    }

    #[test]
    fn test_crop_to_files_writes_one_png_per_area() {
        let dir = tempfile::tempdir().unwrap();
        let source = ImageSource::Path(write_sample(dir.path()));
        let areas = [
            parse_crop("0,0,10,10").unwrap(),
            parse_crop("5,5,5,20").unwrap(),
            parse_crop("10,10,40,30").unwrap(),
        ];

        let written = crop_to_files(&source, &areas, 1.0, dir.path()).unwrap();
        assert_eq!(written.len(), 2);

        let second = image::open(&written[1]).unwrap();
        assert_eq!((second.width(), second.height()), (30, 20));
        assert!(
            written[0]
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("sample-cropped1-")
        );
    }

    #[test]
    fn test_thumbnail_data_url_is_png() {
        let dir = tempfile::tempdir().unwrap();
        let source = ImageSource::Path(write_sample(dir.path()));
        let url = thumbnail_data_url(&source, &parse_crop("0,0,20,20").unwrap()).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_format_list_includes_png() {
        assert!(format_list().contains(&"png".to_string()));
    }
}
