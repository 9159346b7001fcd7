//! Image optimization for web delivery.
//!
//! Shrinks oversized images to fit a bounding box and re-encodes them with
//! web-friendly settings. The WebP path uses the pure-Rust lossless encoder,
//! so the quality knob only affects JPEG output.

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::formats::{is_image_file, ImageFormat};

/// Options for one optimization run.
#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// Maximum output width in pixels.
    pub max_width: u32,
    /// Maximum output height in pixels.
    pub max_height: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
    /// Output format; `None` keeps the input format.
    pub format: Option<ImageFormat>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            quality: 85,
            format: None,
        }
    }
}

/// Summary of an optimized image.
#[derive(Debug)]
pub struct OptimizeReport {
    pub output: PathBuf,
    pub original_bytes: u64,
    pub optimized_bytes: u64,
    /// Set when the image was shrunk to fit the bounds.
    pub resized_to: Option<(u32, u32)>,
}

impl OptimizeReport {
    /// Size reduction as a percentage of the original (negative if it grew).
    pub fn reduction_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        (self.original_bytes as f64 - self.optimized_bytes as f64) / self.original_bytes as f64
            * 100.0
    }
}

/// Default output path: `<stem>_optimized.<ext>` beside the input.
pub fn default_output_path(input: &Path, format: Option<ImageFormat>) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let ext = match format {
        Some(f) => f.extension().to_string(),
        None => input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
            .to_string(),
    };
    input.with_file_name(format!("{}_optimized.{}", stem, ext))
}

fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let mut rgb = image::RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let a = px[3] as u32;
        let blend = |c: u8| -> u8 { ((c as u32 * a + 255 * (255 - a)) / 255) as u8 };
        rgb.put_pixel(x, y, image::Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    DynamicImage::ImageRgb8(rgb)
}

fn encode_to(path: &Path, img: &DynamicImage, format: ImageFormat, quality: u8) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let writer = BufWriter::new(file);
    match format {
        ImageFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(writer, quality);
            encoder
                .encode_image(&img.to_rgb8())
                .context("encoding JPEG")?;
        }
        ImageFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(writer, CompressionType::Best, PngFilterType::Adaptive);
            img.write_with_encoder(encoder).context("encoding PNG")?;
        }
        ImageFormat::WebP => {
            let encoder = WebPEncoder::new_lossless(writer);
            // The lossless encoder only takes 8-bit RGB/RGBA.
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_with_encoder(encoder)
                .context("encoding WebP")?;
        }
        other => {
            drop(writer);
            img.save_with_format(path, other.to_image_crate())
                .with_context(|| format!("encoding {}", other))?;
        }
    }
    Ok(())
}

/// Optimize a single image.
///
/// The image is only resized when it exceeds the bounding box, preserving
/// aspect ratio. JPEG output flattens transparency onto white first.
pub fn optimize_image(
    input: &Path,
    output: Option<&Path>,
    options: &OptimizeOptions,
) -> Result<OptimizeReport> {
    if !input.exists() {
        return Err(anyhow!("Image not found: {}", input.display()));
    }
    if !(1..=100).contains(&options.quality) {
        return Err(anyhow!("Quality must be 1-100, got {}", options.quality));
    }

    let target_format = match options.format {
        Some(f) => f,
        None => ImageFormat::from_path(input)
            .ok_or_else(|| anyhow!("Unsupported image extension: {}", input.display()))?,
    };

    let mut img = image::open(input).with_context(|| format!("opening {}", input.display()))?;

    if target_format == ImageFormat::Jpeg && img.color().has_alpha() {
        img = flatten_onto_white(&img);
    }

    let mut resized_to = None;
    if img.width() > options.max_width || img.height() > options.max_height {
        img = img.resize(options.max_width, options.max_height, FilterType::Lanczos3);
        resized_to = Some((img.width(), img.height()));
    }

    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => default_output_path(input, options.format),
    };
    encode_to(&output_path, &img, target_format, options.quality)?;

    let original_bytes = fs::metadata(input).map(|m| m.len()).unwrap_or(0);
    let optimized_bytes = fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);

    Ok(OptimizeReport {
        output: output_path,
        original_bytes,
        optimized_bytes,
        resized_to,
    })
}

/// Collect image files from a folder, sorted by name.
pub fn image_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(anyhow!("Folder does not exist: {}", folder.display()));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| is_image_file(p))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn default_output_keeps_or_swaps_extension() {
        assert_eq!(
            default_output_path(Path::new("pics/photo.jpg"), None),
            PathBuf::from("pics/photo_optimized.jpg")
        );
        assert_eq!(
            default_output_path(Path::new("pics/photo.png"), Some(ImageFormat::WebP)),
            PathBuf::from("pics/photo_optimized.webp")
        );
    }

    #[test]
    fn reduction_percent_math() {
        let report = OptimizeReport {
            output: PathBuf::from("x"),
            original_bytes: 1000,
            optimized_bytes: 250,
            resized_to: None,
        };
        assert!((report.reduction_percent() - 75.0).abs() < 1e-9);

        let grew = OptimizeReport {
            output: PathBuf::from("x"),
            original_bytes: 100,
            optimized_bytes: 150,
            resized_to: None,
        };
        assert!(grew.reduction_percent() < 0.0);
    }

    #[test]
    fn flatten_blends_alpha_onto_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0])); // fully transparent -> white
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 255])); // opaque black stays black
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba)).to_rgb8();
        assert_eq!(flat.get_pixel(0, 0), &image::Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &image::Rgb([0, 0, 0]));
    }

    #[test]
    fn shrinks_only_when_over_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("big.png");
        image::RgbImage::from_pixel(400, 200, image::Rgb([9, 9, 9]))
            .save(&input)
            .unwrap();

        let options = OptimizeOptions {
            max_width: 200,
            max_height: 200,
            ..OptimizeOptions::default()
        };
        let report = optimize_image(&input, None, &options).unwrap();
        assert_eq!(report.resized_to, Some((200, 100)));
        assert!(report.output.ends_with("big_optimized.png"));

        // already small: no resize recorded
        let small = dir.path().join("small.png");
        image::RgbImage::from_pixel(100, 50, image::Rgb([9, 9, 9]))
            .save(&small)
            .unwrap();
        let report = optimize_image(&small, None, &options).unwrap();
        assert_eq!(report.resized_to, None);
    }

    #[test]
    fn converts_rgba_png_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("alpha.png");
        RgbaImage::from_pixel(32, 32, Rgba([10, 20, 30, 128]))
            .save(&input)
            .unwrap();

        let options = OptimizeOptions {
            format: Some(ImageFormat::Jpeg),
            ..OptimizeOptions::default()
        };
        let output = dir.path().join("alpha.jpg");
        let report = optimize_image(&input, Some(&output), &options).unwrap();
        assert!(report.optimized_bytes > 0);
        assert!(image::open(&output).is_ok());
    }

    #[test]
    fn missing_input_is_an_error() {
        let err = optimize_image(Path::new("no_such.png"), None, &OptimizeOptions::default());
        assert!(err.unwrap_err().to_string().contains("not found"));
    }
}
