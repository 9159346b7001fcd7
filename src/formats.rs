//! Image and video format taxonomy shared by every pipeline.
//!
//! Formats are classified by extension only; nothing here sniffs file
//! contents. Decoding is left to the `image` crate, which does its own
//! magic-byte detection.

use std::fmt;
use std::path::Path;

/// Image formats the pipelines can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Bmp,
    Gif,
    Tiff,
}

impl ImageFormat {
    /// All known formats, in menu order.
    pub const ALL: &'static [ImageFormat] = &[
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::WebP,
        ImageFormat::Bmp,
        ImageFormat::Gif,
        ImageFormat::Tiff,
    ];

    /// Parse a format name or extension, case-insensitive.
    /// Accepts both `jpg` and `jpeg` spellings, with or without a leading dot.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::WebP),
            "bmp" => Some(ImageFormat::Bmp),
            "gif" => Some(ImageFormat::Gif),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    /// Determine the format from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::parse)
    }

    /// Canonical file extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Gif => "gif",
            ImageFormat::Tiff => "tiff",
        }
    }

    /// Uppercase format name as shown in summaries.
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::WebP => "WEBP",
            ImageFormat::Bmp => "BMP",
            ImageFormat::Gif => "GIF",
            ImageFormat::Tiff => "TIFF",
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::WebP)
    }

    pub fn is_lossless(&self) -> bool {
        !self.is_lossy()
    }

    pub fn supports_transparency(&self) -> bool {
        matches!(self, ImageFormat::Png | ImageFormat::WebP | ImageFormat::Gif)
    }

    pub fn supports_animation(&self) -> bool {
        matches!(self, ImageFormat::Gif | ImageFormat::WebP)
    }

    /// The corresponding `image` crate format.
    pub fn to_image_crate(&self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::WebP => image::ImageFormat::WebP,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Tiff => image::ImageFormat::Tiff,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extensions treated as images when scanning folders.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff"];

/// Extensions treated as videos when scanning folders.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

fn has_extension_in(path: &Path, set: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| set.contains(&e.as_str()))
}

pub fn is_image_file(path: &Path) -> bool {
    has_extension_in(path, IMAGE_EXTENSIONS)
}

pub fn is_video_file(path: &Path) -> bool {
    has_extension_in(path, VIDEO_EXTENSIONS)
}

/// Quality use cases for lossy encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseCase {
    Thumbnail,
    Web,
    Archive,
}

/// Recommended encoder quality for a format and use case.
/// Lossless formats always report 100.
pub fn recommended_quality(format: ImageFormat, use_case: UseCase) -> u8 {
    if format.is_lossless() {
        return 100;
    }
    match (format, use_case) {
        (ImageFormat::Jpeg, UseCase::Thumbnail) => 70,
        (ImageFormat::Jpeg, UseCase::Web) => 85,
        (ImageFormat::Jpeg, UseCase::Archive) => 92,
        (ImageFormat::WebP, UseCase::Thumbnail) => 65,
        (ImageFormat::WebP, UseCase::Web) => 80,
        (ImageFormat::WebP, UseCase::Archive) => 90,
        _ => 85,
    }
}

/// Outcome of analysing a source-to-target format conversion.
#[derive(Debug, Clone)]
pub struct ConversionAdvice {
    pub should_convert: bool,
    pub will_lose_transparency: bool,
    pub will_lose_quality: bool,
    pub recommended: bool,
    pub warnings: Vec<String>,
}

/// Determine whether converting `source` to `target` loses information,
/// and whether the conversion is advisable at all.
pub fn conversion_advice(
    source: ImageFormat,
    target: ImageFormat,
    has_transparency: bool,
) -> ConversionAdvice {
    let mut advice = ConversionAdvice {
        should_convert: source != target,
        will_lose_transparency: false,
        will_lose_quality: false,
        recommended: true,
        warnings: Vec::new(),
    };

    if source == target {
        return advice;
    }

    if has_transparency && source.supports_transparency() && !target.supports_transparency() {
        advice.will_lose_transparency = true;
        advice.warnings.push(format!(
            "Converting {} to {} will discard the alpha channel",
            source, target
        ));
    }

    if source.is_lossless() && target.is_lossy() {
        advice.will_lose_quality = true;
        advice.warnings.push(format!(
            "Converting lossless {} to lossy {} will reduce quality",
            source, target
        ));
    }

    if target == ImageFormat::Jpeg && has_transparency {
        advice.recommended = false;
        advice
            .warnings
            .push("JPEG cannot store transparency; prefer PNG or WebP".to_string());
    }

    advice
}

/// Pick the best output format for web delivery.
pub fn optimal_output_format(
    input: ImageFormat,
    has_transparency: bool,
    prefer_modern: bool,
) -> ImageFormat {
    if has_transparency {
        return if prefer_modern { ImageFormat::WebP } else { ImageFormat::Png };
    }
    if input.supports_animation() {
        return if prefer_modern { ImageFormat::WebP } else { input };
    }
    if prefer_modern {
        ImageFormat::WebP
    } else {
        ImageFormat::Jpeg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_accepts_both_jpeg_spellings() {
        assert_eq!(ImageFormat::parse("jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::parse("JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::parse(".jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::parse("heic"), None);
    }

    #[test]
    fn file_type_detection() {
        assert!(is_image_file(&PathBuf::from("photo.JPG")));
        assert!(is_image_file(&PathBuf::from("graphic.png")));
        assert!(is_video_file(&PathBuf::from("clip.mp4")));
        assert!(!is_image_file(&PathBuf::from("clip.mp4")));
        assert!(!is_video_file(&PathBuf::from("notes.txt")));
        assert!(!is_image_file(&PathBuf::from("noext")));
    }

    #[test]
    fn category_tables() {
        assert!(ImageFormat::Jpeg.is_lossy());
        assert!(ImageFormat::Png.is_lossless());
        assert!(ImageFormat::Png.supports_transparency());
        assert!(!ImageFormat::Jpeg.supports_transparency());
        assert!(ImageFormat::Gif.supports_animation());
        assert!(!ImageFormat::Png.supports_animation());
    }

    #[test]
    fn lossless_quality_is_always_full() {
        for fmt in [ImageFormat::Png, ImageFormat::Bmp, ImageFormat::Tiff] {
            assert_eq!(recommended_quality(fmt, UseCase::Web), 100);
        }
        assert_eq!(recommended_quality(ImageFormat::Jpeg, UseCase::Web), 85);
    }

    #[test]
    fn advice_same_format_is_noop() {
        let advice = conversion_advice(ImageFormat::Png, ImageFormat::Png, true);
        assert!(!advice.should_convert);
        assert!(advice.warnings.is_empty());
    }

    #[test]
    fn advice_png_to_jpeg_with_alpha() {
        let advice = conversion_advice(ImageFormat::Png, ImageFormat::Jpeg, true);
        assert!(advice.should_convert);
        assert!(advice.will_lose_transparency);
        assert!(advice.will_lose_quality);
        assert!(!advice.recommended);
        assert_eq!(advice.warnings.len(), 3);
    }

    #[test]
    fn advice_jpeg_to_png_is_clean() {
        let advice = conversion_advice(ImageFormat::Jpeg, ImageFormat::Png, false);
        assert!(advice.should_convert);
        assert!(!advice.will_lose_quality);
        assert!(advice.recommended);
    }

    #[test]
    fn optimal_format_selection() {
        assert_eq!(
            optimal_output_format(ImageFormat::Png, true, true),
            ImageFormat::WebP
        );
        assert_eq!(
            optimal_output_format(ImageFormat::Png, true, false),
            ImageFormat::Png
        );
        assert_eq!(
            optimal_output_format(ImageFormat::Gif, false, false),
            ImageFormat::Gif
        );
        assert_eq!(
            optimal_output_format(ImageFormat::Jpeg, false, true),
            ImageFormat::WebP
        );
        assert_eq!(
            optimal_output_format(ImageFormat::Jpeg, false, false),
            ImageFormat::Jpeg
        );
    }
}
