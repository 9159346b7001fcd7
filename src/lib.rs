//! # mediaforge - Media Conversion Toolbox
//!
//! `mediaforge` is a collection of independent conversion pipelines for
//! hobbyist firmware and social-media workflows:
//!
//! - Embed an image as a C byte array for microcontroller sketches
//! - Turn still images into short videos (via ffmpeg)
//! - Retime videos to a fixed duration, trimming or looping
//! - Change aspect ratio by letterboxing or cropping
//! - Optimize images for web delivery
//! - Render text lines as centered images
//!
//! Raster work is delegated to the `image` crate; video encoding goes
//! through an external `ffmpeg` binary.
//!
//! ## Example
//!
//! ```no_run
//! use mediaforge::embed::{image_to_header, EmbedOptions};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let report = image_to_header(
//!     Path::new("photo.jpg"),
//!     Path::new("photoData.h"),
//!     &EmbedOptions::default(),
//! )?;
//! println!("{} bytes of JPEG", report.jpeg_size);
//! # Ok(())
//! # }
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

pub mod aspect;
pub mod embed;
pub mod formats;
pub mod optimize;
pub mod text;
pub mod video;

pub use aspect::{AspectMode, AspectOptions, CropAnchor, MediaType};
pub use embed::{EmbedOptions, EmbedReport};
pub use formats::ImageFormat;
pub use optimize::{OptimizeOptions, OptimizeReport};
pub use text::TextOptions;
pub use video::{ClipOptions, RetimeOptions};

/// Run ffmpeg with the given arguments, failing on a non-zero exit.
pub fn run_ffmpeg(args: &[String]) -> Result<()> {
    let status = Command::new("ffmpeg")
        .args(args)
        .status()
        .context("running ffmpeg (is it installed and on PATH?)")?;
    if !status.success() {
        return Err(anyhow!("ffmpeg failed (exit status {})", status));
    }
    Ok(())
}

/// Bytes as KB with the precision used in summaries.
pub fn kilobytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0
}

fn default_embed_width() -> u32 {
    240
}
fn default_embed_height() -> u32 {
    320
}
fn default_embed_quality() -> u8 {
    75
}
fn default_array_name() -> String {
    "photoData".to_string()
}

/// Built-in defaults for the `embed` pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct EmbedDefaults {
    #[serde(default = "default_embed_width")]
    pub width: u32,
    #[serde(default = "default_embed_height")]
    pub height: u32,
    #[serde(default = "default_embed_quality")]
    pub quality: u8,
    #[serde(default = "default_array_name")]
    pub array_name: String,
}

impl Default for EmbedDefaults {
    fn default() -> Self {
        Self {
            width: default_embed_width(),
            height: default_embed_height(),
            quality: default_embed_quality(),
            array_name: default_array_name(),
        }
    }
}

fn default_duration() -> f64 {
    4.0
}
fn default_fps() -> u32 {
    24
}
fn default_codec() -> String {
    "libx264".to_string()
}
fn default_container() -> String {
    "mp4".to_string()
}
fn default_fade() -> f64 {
    0.5
}

/// Built-in defaults for the `video` and `duration` pipelines.
#[derive(Debug, Deserialize, Clone)]
pub struct VideoDefaults {
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_container")]
    pub format: String,
    #[serde(default = "default_fade")]
    pub fade: f64,
}

impl Default for VideoDefaults {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            fps: default_fps(),
            codec: default_codec(),
            format: default_container(),
            fade: default_fade(),
        }
    }
}

fn default_max_width() -> u32 {
    1920
}
fn default_max_height() -> u32 {
    1080
}
fn default_web_quality() -> u8 {
    85
}

/// Built-in defaults for the `optimize` pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct OptimizeDefaults {
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    #[serde(default = "default_web_quality")]
    pub quality: u8,
}

impl Default for OptimizeDefaults {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            max_height: default_max_height(),
            quality: default_web_quality(),
        }
    }
}

fn default_font_size() -> f32 {
    48.0
}
fn default_text_color() -> [u8; 3] {
    [255, 255, 255]
}
fn default_bg_color() -> [u8; 3] {
    [0, 0, 0]
}
fn default_text_width() -> u32 {
    1080
}
fn default_text_height() -> u32 {
    1080
}

/// Built-in defaults for the `text` pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct TextDefaults {
    #[serde(default = "default_text_width")]
    pub width: u32,
    #[serde(default = "default_text_height")]
    pub height: u32,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_text_color")]
    pub text_color: [u8; 3],
    #[serde(default = "default_bg_color")]
    pub bg_color: [u8; 3],
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            width: default_text_width(),
            height: default_text_height(),
            font_size: default_font_size(),
            text_color: default_text_color(),
            bg_color: default_bg_color(),
        }
    }
}

/// Per-tool defaults, overridable from `mediaforge.json`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub embed: EmbedDefaults,
    #[serde(default)]
    pub video: VideoDefaults,
    #[serde(default)]
    pub optimize: OptimizeDefaults,
    #[serde(default)]
    pub text: TextDefaults,
}

impl AppConfig {
    /// Load configuration: app data dir, then the current directory,
    /// then built-in defaults.
    pub fn load() -> Result<Self> {
        let mut tried: Vec<PathBuf> = Vec::new();
        if let Some(mut d) = dirs::data_dir() {
            d.push("mediaforge");
            d.push("mediaforge.json");
            tried.push(d);
        }
        tried.push(PathBuf::from("mediaforge.json"));

        for p in &tried {
            if p.exists() {
                let content = fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                let cfg: AppConfig =
                    serde_json::from_str(&content).context("parsing config json")?;
                cfg.validate()?;
                return Ok(cfg);
            }
        }

        Ok(AppConfig::default())
    }

    fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.embed.quality) {
            return Err(anyhow!("embed.quality must be 1-100"));
        }
        if !(1..=100).contains(&self.optimize.quality) {
            return Err(anyhow!("optimize.quality must be 1-100"));
        }
        if self.video.duration <= 0.0 {
            return Err(anyhow!("video.duration must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.embed.width, 240);
        assert_eq!(cfg.embed.height, 320);
        assert_eq!(cfg.embed.quality, 75);
        assert_eq!(cfg.embed.array_name, "photoData");
        assert_eq!(cfg.video.duration, 4.0);
        assert_eq!(cfg.video.fps, 24);
        assert_eq!(cfg.video.codec, "libx264");
        assert_eq!(cfg.optimize.max_width, 1920);
        assert_eq!(cfg.optimize.quality, 85);
        assert_eq!(cfg.text.font_size, 48.0);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"embed": {"quality": 90}, "video": {"fps": 30}}"#).unwrap();
        assert_eq!(cfg.embed.quality, 90);
        assert_eq!(cfg.embed.width, 240);
        assert_eq!(cfg.video.fps, 30);
        assert_eq!(cfg.video.duration, 4.0);
        assert_eq!(cfg.optimize.max_height, 1080);
    }

    #[test]
    fn bad_quality_rejected() {
        let cfg: AppConfig = serde_json::from_str(r#"{"embed": {"quality": 0}}"#).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn kilobytes_conversion() {
        assert_eq!(kilobytes(2048), 2.0);
        assert_eq!(kilobytes(0), 0.0);
    }
}
