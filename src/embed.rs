//! Image to C header conversion for microcontroller firmware.
//!
//! Any readable image is resized, optionally flipped, re-encoded as JPEG
//! and emitted as a `const unsigned char` array that an ESP32/Arduino
//! sketch can include directly.

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Hex bytes emitted per line of the generated array.
pub const DEFAULT_BYTES_PER_LINE: usize = 12;

/// Options for header generation.
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
    /// Mirror the image left-to-right.
    pub flip_horizontal: bool,
    /// Turn the image upside down.
    pub flip_vertical: bool,
    /// C identifier for the generated array.
    pub array_name: String,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            width: 240,
            height: 320,
            quality: 75,
            flip_horizontal: false,
            flip_vertical: false,
            array_name: "photoData".to_string(),
        }
    }
}

/// Summary of a completed conversion.
#[derive(Debug)]
pub struct EmbedReport {
    /// Dimensions of the source image before resizing.
    pub original_size: (u32, u32),
    /// Encoded JPEG payload size in bytes.
    pub jpeg_size: usize,
    /// Path of the written header.
    pub output: PathBuf,
}

/// Convert an image to a C header file containing its JPEG bytes.
pub fn image_to_header(input: &Path, output: &Path, options: &EmbedOptions) -> Result<EmbedReport> {
    if !(1..=100).contains(&options.quality) {
        return Err(anyhow!("JPEG quality must be 1-100, got {}", options.quality));
    }
    if options.width == 0 || options.height == 0 {
        return Err(anyhow!("Target dimensions must be non-zero"));
    }
    if !is_valid_identifier(&options.array_name) {
        return Err(anyhow!("'{}' is not a valid C identifier", options.array_name));
    }

    let img = image::open(input)
        .with_context(|| format!("opening {}", input.display()))?;
    let original_size = (img.width(), img.height());

    let mut rgb = img
        .resize_exact(options.width, options.height, FilterType::Lanczos3)
        .to_rgb8();

    if options.flip_horizontal {
        rgb = imageops::flip_horizontal(&rgb);
    }
    if options.flip_vertical {
        rgb = imageops::flip_vertical(&rgb);
    }

    let mut jpeg: Vec<u8> = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, options.quality)
        .encode_image(&rgb)
        .context("encoding JPEG")?;

    let source_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image");
    let header = render_header(
        &jpeg,
        source_name,
        options.width,
        options.height,
        &options.array_name,
        DEFAULT_BYTES_PER_LINE,
    );

    fs::write(output, header).with_context(|| format!("writing {}", output.display()))?;

    Ok(EmbedReport {
        original_size,
        jpeg_size: jpeg.len(),
        output: output.to_path_buf(),
    })
}

/// Render the header file text for a JPEG payload.
///
/// Bytes are grouped `bytes_per_line` per line as uppercase two-digit hex;
/// the final line carries no trailing comma.
pub fn render_header(
    data: &[u8],
    source_name: &str,
    width: u32,
    height: u32,
    array_name: &str,
    bytes_per_line: usize,
) -> String {
    let mut out = String::with_capacity(data.len() * 6 + 256);
    let _ = writeln!(out, "// Generated from: {}", source_name);
    let _ = writeln!(out, "// Size: {}x{} pixels", width, height);
    let _ = writeln!(out, "// JPEG size: {} bytes", data.len());
    out.push('\n');
    let _ = writeln!(out, "const unsigned char {}[] PROGMEM = {{", array_name);

    let per_line = bytes_per_line.max(1);
    for (i, chunk) in data.chunks(per_line).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("0x{:02X}", b)).collect();
        let last = (i + 1) * per_line >= data.len();
        if last {
            let _ = writeln!(out, "  {}", hex.join(", "));
        } else {
            let _ = writeln!(out, "  {},", hex.join(", "));
        }
    }

    out.push_str("};\n");
    out
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn header_layout_and_hex_grouping() {
        let data: Vec<u8> = (0u8..30).collect();
        let header = render_header(&data, "photo.jpg", 240, 320, "photoData", 12);

        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(lines[0], "// Generated from: photo.jpg");
        assert_eq!(lines[1], "// Size: 240x320 pixels");
        assert_eq!(lines[2], "// JPEG size: 30 bytes");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "const unsigned char photoData[] PROGMEM = {");
        // 30 bytes / 12 per line = 3 data lines
        assert!(lines[5].starts_with("  0x00, 0x01,"));
        assert!(lines[5].ends_with(","));
        assert!(lines[6].ends_with(","));
        // final line: 6 bytes, no trailing comma
        assert_eq!(lines[7], "  0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D");
        assert_eq!(lines[8], "};");
    }

    #[test]
    fn exact_multiple_has_no_trailing_comma() {
        let data: Vec<u8> = vec![0xAB; 24];
        let header = render_header(&data, "a.png", 10, 10, "img", 12);
        let lines: Vec<&str> = header.lines().collect();
        assert!(lines[5].ends_with(","));
        assert!(lines[6].ends_with("0xAB"));
    }

    #[test]
    fn single_byte_payload() {
        let header = render_header(&[0xFF], "x.bmp", 1, 1, "d", 12);
        assert!(header.contains("  0xFF\n};"));
    }

    #[test]
    fn identifier_validation() {
        assert!(is_valid_identifier("photoData"));
        assert!(is_valid_identifier("_buf2"));
        assert!(!is_valid_identifier("2photo"));
        assert!(!is_valid_identifier("photo-data"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn writes_header_for_real_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        RgbImage::from_pixel(64, 48, image::Rgb([200, 40, 40]))
            .save(&input)
            .unwrap();

        let output = dir.path().join("photoData.h");
        let report = image_to_header(&input, &output, &EmbedOptions::default()).unwrap();

        assert_eq!(report.original_size, (64, 48));
        assert!(report.jpeg_size > 0);
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("// Generated from: in.png"));
        assert!(text.contains("const unsigned char photoData[] PROGMEM = {"));
        // JPEG SOI marker is always first
        assert!(text.contains("0xFF, 0xD8"));
    }

    #[test]
    fn rejects_bad_quality() {
        let opts = EmbedOptions { quality: 0, ..EmbedOptions::default() };
        let err = image_to_header(Path::new("x.png"), Path::new("x.h"), &opts);
        assert!(err.is_err());
    }
}
