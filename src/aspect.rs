//! Aspect ratio adjustment for images and videos.
//!
//! Images are resized and composited with the `image` crate. Videos are
//! rewritten through an ffmpeg filter graph built from the same geometry.

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::formats::{is_image_file, is_video_file};
use crate::run_ffmpeg;

/// How to reach the target aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectMode {
    /// Scale to fit and pad with bars.
    Letterbox,
    /// Crop away the excess.
    Crop,
}

impl AspectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectMode::Letterbox => "letterbox",
            AspectMode::Crop => "crop",
        }
    }
}

/// Where the crop window sits inside the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropAnchor {
    #[default]
    Center,
    UpperLeft,
    UpperCenter,
    UpperRight,
    CenterLeft,
    CenterRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
}

impl CropAnchor {
    /// All anchors, in menu order.
    pub const ALL: &'static [CropAnchor] = &[
        CropAnchor::Center,
        CropAnchor::UpperLeft,
        CropAnchor::UpperCenter,
        CropAnchor::UpperRight,
        CropAnchor::CenterLeft,
        CropAnchor::CenterRight,
        CropAnchor::LowerLeft,
        CropAnchor::LowerCenter,
        CropAnchor::LowerRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CropAnchor::Center => "center",
            CropAnchor::UpperLeft => "upper_left",
            CropAnchor::UpperCenter => "upper_center",
            CropAnchor::UpperRight => "upper_right",
            CropAnchor::CenterLeft => "center_left",
            CropAnchor::CenterRight => "center_right",
            CropAnchor::LowerLeft => "lower_left",
            CropAnchor::LowerCenter => "lower_center",
            CropAnchor::LowerRight => "lower_right",
        }
    }
}

/// RGB bar color for letterboxing.
pub type BarColor = [u8; 3];

pub const BAR_BLACK: BarColor = [0, 0, 0];
pub const BAR_WHITE: BarColor = [255, 255, 255];
pub const BAR_GRAY: BarColor = [128, 128, 128];

/// Common target dimensions offered in the interactive menu.
pub const PRESET_RATIOS: &[(&str, u32, u32)] = &[
    ("16:9 (1920x1080) - Widescreen", 1920, 1080),
    ("4:3 (1024x768) - Standard", 1024, 768),
    ("1:1 (1080x1080) - Square", 1080, 1080),
    ("9:16 (1080x1920) - Vertical/Portrait", 1080, 1920),
    ("21:9 (2560x1080) - Ultra-wide", 2560, 1080),
];

/// Settings for one aspect ratio run.
#[derive(Debug, Clone)]
pub struct AspectOptions {
    pub target_width: u32,
    pub target_height: u32,
    pub mode: AspectMode,
    pub anchor: CropAnchor,
    pub bar_color: BarColor,
}

/// Top-left corner of a `target`-sized crop window inside the original,
/// positioned by `anchor`. Offsets never go negative.
pub fn crop_position(
    original_width: u32,
    original_height: u32,
    target_width: u32,
    target_height: u32,
    anchor: CropAnchor,
) -> (u32, u32) {
    let ow = original_width as i64;
    let oh = original_height as i64;
    let tw = target_width as i64;
    let th = target_height as i64;

    let center_x = (ow - tw) / 2;
    let center_y = (oh - th) / 2;
    let right_x = ow - tw;
    let bottom_y = oh - th;

    let (x, y) = match anchor {
        CropAnchor::Center => (center_x, center_y),
        CropAnchor::UpperLeft => (0, 0),
        CropAnchor::UpperCenter => (center_x, 0),
        CropAnchor::UpperRight => (right_x, 0),
        CropAnchor::CenterLeft => (0, center_y),
        CropAnchor::CenterRight => (right_x, center_y),
        CropAnchor::LowerLeft => (0, bottom_y),
        CropAnchor::LowerCenter => (center_x, bottom_y),
        CropAnchor::LowerRight => (right_x, bottom_y),
    };

    (x.max(0) as u32, y.max(0) as u32)
}

/// Inner size when letterboxing: fit width if the source is wider than the
/// target aspect, otherwise fit height.
pub fn fit_dimensions(
    original_width: u32,
    original_height: u32,
    target_width: u32,
    target_height: u32,
) -> (u32, u32) {
    let original_aspect = original_width as f64 / original_height as f64;
    let target_aspect = target_width as f64 / target_height as f64;

    if original_aspect > target_aspect {
        let h = (target_width as f64 / original_aspect) as u32;
        (target_width, h.max(1))
    } else {
        let w = (target_height as f64 * original_aspect) as u32;
        (w.max(1), target_height)
    }
}

/// Largest sub-rectangle of the original with the target aspect ratio.
pub fn crop_dimensions(
    original_width: u32,
    original_height: u32,
    target_width: u32,
    target_height: u32,
) -> (u32, u32) {
    let original_aspect = original_width as f64 / original_height as f64;
    let target_aspect = target_width as f64 / target_height as f64;

    if original_aspect > target_aspect {
        let w = (original_height as f64 * target_aspect) as u32;
        (w.max(1), original_height)
    } else {
        let h = (original_width as f64 / target_aspect) as u32;
        (original_width, h.max(1))
    }
}

/// Resize an image to the target dimensions, letterboxing or cropping.
pub fn resize_with_aspect(img: &DynamicImage, options: &AspectOptions) -> RgbImage {
    let (ow, oh) = (img.width(), img.height());
    let (tw, th) = (options.target_width, options.target_height);

    match options.mode {
        AspectMode::Letterbox => {
            let (fw, fh) = fit_dimensions(ow, oh, tw, th);
            let resized = img.resize_exact(fw, fh, FilterType::Lanczos3).to_rgb8();
            let mut canvas = RgbImage::from_pixel(tw, th, Rgb(options.bar_color));
            let x = (tw - fw) / 2;
            let y = (th - fh) / 2;
            imageops::replace(&mut canvas, &resized, x as i64, y as i64);
            canvas
        }
        AspectMode::Crop => {
            let (cw, ch) = crop_dimensions(ow, oh, tw, th);
            let (x, y) = crop_position(ow, oh, cw, ch, options.anchor);
            let cropped = img.crop_imm(x, y, cw, ch);
            cropped.resize_exact(tw, th, FilterType::Lanczos3).to_rgb8()
        }
    }
}

/// Result of converting a single file.
#[derive(Debug)]
pub struct FileReport {
    pub output: PathBuf,
    pub original_bytes: u64,
    pub new_bytes: u64,
}

/// Adjust the aspect ratio of one image file.
pub fn process_image(input: &Path, output: &Path, options: &AspectOptions) -> Result<FileReport> {
    let img = image::open(input).with_context(|| format!("opening {}", input.display()))?;
    let result = resize_with_aspect(&img, options);
    result
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    let original_bytes = fs::metadata(input).map(|m| m.len()).unwrap_or(0);
    let new_bytes = fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    Ok(FileReport {
        output: output.to_path_buf(),
        original_bytes,
        new_bytes,
    })
}

/// ffmpeg `-vf` filter graph matching `resize_with_aspect` for video frames.
pub fn video_filter(options: &AspectOptions) -> String {
    let (tw, th) = (options.target_width, options.target_height);
    match options.mode {
        AspectMode::Letterbox => {
            let [r, g, b] = options.bar_color;
            format!(
                "scale={tw}:{th}:force_original_aspect_ratio=decrease,\
pad={tw}:{th}:(ow-iw)/2:(oh-ih)/2:color=0x{r:02X}{g:02X}{b:02X}"
            )
        }
        AspectMode::Crop => {
            let w_expr = format!("'min(iw,ih*{tw}/{th})'");
            let h_expr = format!("'min(ih,iw*{th}/{tw})'");
            let x_expr = match options.anchor {
                CropAnchor::UpperLeft | CropAnchor::CenterLeft | CropAnchor::LowerLeft => "0",
                CropAnchor::UpperRight | CropAnchor::CenterRight | CropAnchor::LowerRight => {
                    "iw-ow"
                }
                _ => "(iw-ow)/2",
            };
            let y_expr = match options.anchor {
                CropAnchor::UpperLeft | CropAnchor::UpperCenter | CropAnchor::UpperRight => "0",
                CropAnchor::LowerLeft | CropAnchor::LowerCenter | CropAnchor::LowerRight => {
                    "ih-oh"
                }
                _ => "(ih-oh)/2",
            };
            format!("crop={w_expr}:{h_expr}:{x_expr}:{y_expr},scale={tw}:{th}")
        }
    }
}

/// Adjust the aspect ratio of one video file through ffmpeg.
pub fn process_video(input: &Path, output: &Path, options: &AspectOptions) -> Result<FileReport> {
    let args = vec![
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-vf".to_string(),
        video_filter(options),
        "-c:a".to_string(),
        "copy".to_string(),
        output.to_string_lossy().into_owned(),
    ];
    run_ffmpeg(&args)?;

    let original_bytes = fs::metadata(input).map(|m| m.len()).unwrap_or(0);
    let new_bytes = fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    Ok(FileReport {
        output: output.to_path_buf(),
        original_bytes,
        new_bytes,
    })
}

/// Which kinds of files a batch run picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Images,
    Videos,
    Both,
}

/// Collect matching media files from a folder, sorted by name.
pub fn media_files(folder: &Path, media_type: MediaType) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(anyhow!("Folder does not exist: {}", folder.display()));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| match media_type {
            MediaType::Images => is_image_file(p),
            MediaType::Videos => is_video_file(p),
            MediaType::Both => is_image_file(p) || is_video_file(p),
        })
        .collect();
    files.sort();
    Ok(files)
}
