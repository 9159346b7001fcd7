//! Render text lines as centered images.
//!
//! Each non-empty line of a text file becomes one image: a solid-color
//! canvas with the line drawn centered, measured with the scaled font so
//! kerning is respected. `ab_glyph` does the measuring and `imageproc`
//! the drawing.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use std::fs;
use std::path::{Path, PathBuf};

use crate::formats::ImageFormat;

/// Longest sanitized text kept in an output filename.
pub const MAX_FILENAME_TEXT: usize = 50;

/// Font files probed when no font path is given.
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/SFNSDisplay.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Options for one text rendering run.
#[derive(Debug, Clone)]
pub struct TextOptions {
    pub width: u32,
    pub height: u32,
    pub font_size: f32,
    pub text_color: [u8; 3],
    pub bg_color: [u8; 3],
    pub format: ImageFormat,
    /// Minimum distance between text and the canvas edge before a fit
    /// warning is raised.
    pub padding: u32,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            font_size: 48.0,
            text_color: [255, 255, 255],
            bg_color: [0, 0, 0],
            format: ImageFormat::Png,
            padding: 20,
        }
    }
}

/// Load a font from an explicit path, or probe the system font locations.
pub fn load_font(path: Option<&Path>) -> Result<FontArc> {
    if let Some(p) = path {
        let bytes = fs::read(p).with_context(|| format!("reading font {}", p.display()))?;
        return FontArc::try_from_vec(bytes)
            .map_err(|e| anyhow!("parsing font {}: {}", p.display(), e));
    }

    for candidate in SYSTEM_FONT_PATHS {
        let p = Path::new(candidate);
        if p.exists() {
            if let Ok(bytes) = fs::read(p) {
                if let Ok(font) = FontArc::try_from_vec(bytes) {
                    return Ok(font);
                }
            }
        }
    }

    Err(anyhow!(
        "No usable system font found; pass a .ttf/.otf path explicitly"
    ))
}

/// Kerned pixel width and line height of `text` at the given scale.
pub fn measure_text(font: &FontArc, scale: PxScale, text: &str) -> (u32, u32) {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;

    for ch in text.chars() {
        let glyph = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, glyph);
        }
        width += scaled.h_advance(glyph);
        prev = Some(glyph);
    }

    let height = (scaled.ascent() - scaled.descent()).ceil() as u32;
    (width.ceil() as u32, height)
}

/// Render one line centered on a fresh canvas.
///
/// Returns the image and whether the text overflowed the padded area.
pub fn render_line(text: &str, font: &FontArc, options: &TextOptions) -> (RgbImage, bool) {
    let mut canvas = RgbImage::from_pixel(options.width, options.height, Rgb(options.bg_color));
    let scale = PxScale::from(options.font_size);
    let (text_w, text_h) = measure_text(font, scale, text);

    let x = (options.width.saturating_sub(text_w)) / 2;
    let y = (options.height.saturating_sub(text_h)) / 2;
    draw_text_mut(
        &mut canvas,
        Rgb(options.text_color),
        x as i32,
        y as i32,
        scale,
        font,
        text,
    );

    let max_w = options.width.saturating_sub(2 * options.padding);
    let max_h = options.height.saturating_sub(2 * options.padding);
    let overflow = text_w > max_w || text_h > max_h;
    (canvas, overflow)
}

/// Replace filename-hostile characters and truncate.
/// Keeps alphanumerics, spaces, `_` and `-`; everything else becomes `_`.
pub fn sanitize_filename(line: &str, max_len: usize) -> String {
    line.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect()
}

/// Output filename for line `idx` (1-based).
pub fn line_filename(idx: usize, line: &str, format: ImageFormat) -> String {
    format!(
        "line_{:03}_{}.{}",
        idx,
        sanitize_filename(line, MAX_FILENAME_TEXT),
        format.extension()
    )
}

/// One rendered line.
#[derive(Debug)]
pub struct RenderedLine {
    pub index: usize,
    pub text: String,
    pub output: PathBuf,
    pub bytes: u64,
    pub overflowed: bool,
}

/// Read a text file and render every non-empty line into `output_dir`.
pub fn process_text_file(
    input: &Path,
    output_dir: &Path,
    font: &FontArc,
    options: &TextOptions,
) -> Result<Vec<RenderedLine>> {
    let content =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if lines.is_empty() {
        return Err(anyhow!("No text found in {}", input.display()));
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output folder {}", output_dir.display()))?;

    let mut rendered = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let idx = i + 1;
        let (img, overflowed) = render_line(line, font, options);
        let output = output_dir.join(line_filename(idx, line, options.format));

        match options.format {
            // JPEG at high quality; the canvas has no alpha to lose.
            ImageFormat::Jpeg => {
                let file = fs::File::create(&output)
                    .with_context(|| format!("creating {}", output.display()))?;
                let mut writer = std::io::BufWriter::new(file);
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, 95)
                    .encode_image(&img)
                    .with_context(|| format!("writing {}", output.display()))?;
            }
            other => {
                img.save_with_format(&output, other.to_image_crate())
                    .with_context(|| format!("writing {}", output.display()))?;
            }
        }

        let bytes = fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
        rendered.push(RenderedLine {
            index: idx,
            text: line.clone(),
            output,
            bytes,
            overflowed,
        });
    }

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_font() -> Option<FontArc> {
        load_font(None).ok()
    }

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_filename("Hello World_2-b", 50), "Hello World_2-b");
        assert_eq!(sanitize_filename("a/b:c*d", 50), "a_b_c_d");
        assert_eq!(sanitize_filename("café!", 50), "café_");
    }

    #[test]
    fn sanitize_truncates() {
        let long = "x".repeat(120);
        assert_eq!(sanitize_filename(&long, 50).chars().count(), 50);
    }

    #[test]
    fn line_filename_layout() {
        assert_eq!(
            line_filename(7, "Hello, World", ImageFormat::Png),
            "line_007_Hello_ World.png"
        );
        assert_eq!(
            line_filename(12, "Go", ImageFormat::Jpeg),
            "line_012_Go.jpg"
        );
    }

    #[test]
    fn measure_is_monotonic_in_text_length() {
        let Some(font) = test_font() else { return };
        let scale = PxScale::from(48.0);
        let (short, _) = measure_text(&font, scale, "Hi");
        let (long, _) = measure_text(&font, scale, "Hi there, world");
        assert!(long > short);
        let (empty, h) = measure_text(&font, scale, "");
        assert_eq!(empty, 0);
        assert!(h > 0);
    }

    #[test]
    fn render_centers_and_flags_overflow() {
        let Some(font) = test_font() else { return };
        let options = TextOptions {
            width: 400,
            height: 100,
            ..TextOptions::default()
        };
        let (img, overflow) = render_line("ok", &font, &options);
        assert_eq!(img.dimensions(), (400, 100));
        assert!(!overflow);
        // corner stays background
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));

        let tiny = TextOptions {
            width: 40,
            height: 30,
            ..TextOptions::default()
        };
        let (_, overflow) = render_line("much too long to fit", &font, &tiny);
        assert!(overflow);
    }

    #[test]
    fn process_writes_one_image_per_nonempty_line() {
        let Some(font) = test_font() else { return };
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("lines.txt");
        fs::write(&input, "first\n\n  second  \n\n").unwrap();

        let out_dir = dir.path().join("out");
        let options = TextOptions {
            width: 200,
            height: 100,
            ..TextOptions::default()
        };
        let rendered = process_text_file(&input, &out_dir, &font, &options).unwrap();
        assert_eq!(rendered.len(), 2);
        assert!(out_dir.join("line_001_first.png").exists());
        assert!(out_dir.join("line_002_second.png").exists());
        assert!(rendered.iter().all(|r| r.bytes > 0));
    }

    #[test]
    fn empty_file_is_an_error() {
        let Some(font) = test_font() else { return };
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.txt");
        fs::write(&input, "\n\n").unwrap();
        let err = process_text_file(&input, dir.path(), &font, &TextOptions::default());
        assert!(err.is_err());
    }
}
