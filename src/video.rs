//! Still-image to video conversion and video retiming.
//!
//! All encoding goes through an external ffmpeg binary; this module only
//! builds argument lists and checks exit statuses. Durations are probed
//! with ffprobe.

use anyhow::{anyhow, Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

use crate::formats::VIDEO_EXTENSIONS;
use crate::run_ffmpeg;

/// Options for rendering a still image as a video clip.
#[derive(Debug, Clone)]
pub struct ClipOptions {
    /// Clip length in seconds.
    pub duration: f64,
    /// Output frame rate.
    pub fps: u32,
    /// ffmpeg video codec name.
    pub codec: String,
    /// Optional output dimensions; source size (padded to even) otherwise.
    pub size: Option<(u32, u32)>,
    /// Fade-in length in seconds (0 disables).
    pub fade_in: f64,
    /// Fade-out length in seconds (0 disables).
    pub fade_out: f64,
    /// Container extension, e.g. `mp4`.
    pub format: String,
}

impl Default for ClipOptions {
    fn default() -> Self {
        Self {
            duration: 4.0,
            fps: 24,
            codec: "libx264".to_string(),
            size: None,
            fade_in: 0.0,
            fade_out: 0.0,
            format: "mp4".to_string(),
        }
    }
}

fn fade_filters(duration: f64, fade_in: f64, fade_out: f64) -> Vec<String> {
    let mut filters = Vec::new();
    if fade_in > 0.0 {
        filters.push(format!("fade=t=in:st=0:d={}", fade_in));
    }
    if fade_out > 0.0 {
        let start = (duration - fade_out).max(0.0);
        filters.push(format!("fade=t=out:st={}:d={}", start, fade_out));
    }
    filters
}

/// ffmpeg arguments for turning one image into a clip.
///
/// The scale step either hits the requested size or pads the source to even
/// dimensions, which yuv420p encoders require.
pub(crate) fn build_clip_args(input: &Path, output: &Path, options: &ClipOptions) -> Vec<String> {
    let mut vf_parts = vec![match options.size {
        Some((w, h)) => format!("scale={}:{}", w, h),
        None => "scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string(),
    }];
    vf_parts.push("format=yuv420p".to_string());
    vf_parts.extend(fade_filters(options.duration, options.fade_in, options.fade_out));

    vec![
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-t".to_string(),
        options.duration.to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-vf".to_string(),
        vf_parts.join(","),
        "-c:v".to_string(),
        options.codec.clone(),
        "-r".to_string(),
        options.fps.to_string(),
        "-an".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Render a still image as a video clip.
pub fn image_to_video(input: &Path, output: &Path, options: &ClipOptions) -> Result<()> {
    if options.duration <= 0.0 {
        return Err(anyhow!("Clip duration must be positive"));
    }
    run_ffmpeg(&build_clip_args(input, output, options))
}

/// Container duration of a video in seconds, via ffprobe.
pub fn probe_duration(input: &Path) -> Result<f64> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .context("running ffprobe")?;

    if !out.status.success() {
        return Err(anyhow!("ffprobe failed for {}", input.display()));
    }

    let text = String::from_utf8_lossy(&out.stdout);
    text.trim()
        .parse::<f64>()
        .with_context(|| format!("parsing ffprobe duration '{}'", text.trim()))
}

/// Options for retiming a video to a fixed duration.
#[derive(Debug, Clone)]
pub struct RetimeOptions {
    /// Target duration in seconds.
    pub target_duration: f64,
    /// Fade length in seconds, used when `apply_fades` is set.
    pub fade_duration: f64,
    /// Apply fade in at the start and fade out at the end.
    pub apply_fades: bool,
}

impl Default for RetimeOptions {
    fn default() -> Self {
        Self {
            target_duration: 4.0,
            fade_duration: 0.5,
            apply_fades: false,
        }
    }
}

/// ffmpeg arguments for trimming or looping a video to the target duration.
pub(crate) fn build_retime_args(
    input: &Path,
    output: &Path,
    source_duration: f64,
    options: &RetimeOptions,
) -> Vec<String> {
    let mut args = vec!["-loglevel".to_string(), "error".to_string(), "-y".to_string()];

    // Shorter sources loop until they cover the target; -stream_loop counts
    // extra plays beyond the first.
    if source_duration > 0.0 && source_duration < options.target_duration {
        let extra = (options.target_duration / source_duration).ceil() as u64 - 1;
        args.push("-stream_loop".to_string());
        args.push(extra.to_string());
    }

    args.push("-i".to_string());
    args.push(input.to_string_lossy().into_owned());
    args.push("-t".to_string());
    args.push(options.target_duration.to_string());

    if options.apply_fades && options.fade_duration > 0.0 {
        let filters = fade_filters(
            options.target_duration,
            options.fade_duration,
            options.fade_duration,
        );
        args.push("-vf".to_string());
        args.push(filters.join(","));
    }

    args.push("-c:v".to_string());
    args.push("libx264".to_string());
    args.push("-an".to_string());
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Retime one video to exactly the target duration, trimming or looping.
pub fn adjust_duration(input: &Path, output: &Path, options: &RetimeOptions) -> Result<f64> {
    if options.target_duration <= 0.0 {
        return Err(anyhow!("Target duration must be positive"));
    }
    let source_duration = probe_duration(input)?;
    if source_duration <= 0.0 {
        return Err(anyhow!("No playable frames in {}", input.display()));
    }
    run_ffmpeg(&build_retime_args(input, output, source_duration, options))?;
    Ok(source_duration)
}

/// Collect video files from a folder, sorted by name.
pub fn video_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(anyhow!("Folder does not exist: {}", folder.display()));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .is_some_and(|e| VIDEO_EXTENSIONS.contains(&e.as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// One line of a duration mapping.
#[derive(Debug)]
pub enum MappingEntry {
    Ok { name: String, duration: f64 },
    Failed { name: String },
}

/// Probe every video in a folder and render the mapping file text.
pub fn render_mapping(entries: &[MappingEntry], target_duration: f64) -> String {
    let mut out = String::new();
    out.push_str("Video Mapping (Filename - Durations)\n");
    let _ = writeln!(out, "Target Duration: {:.2}s", target_duration);
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");
    for entry in entries {
        match entry {
            MappingEntry::Ok { name, duration } => {
                let _ = writeln!(
                    out,
                    "{} - Original: {:.2}s, Target: {:.2}s",
                    name, duration, target_duration
                );
            }
            MappingEntry::Failed { name } => {
                let _ = writeln!(out, "{} - ERROR", name);
            }
        }
    }
    out
}

/// Write a duration mapping for every video in `folder`.
/// Returns the entries so callers can report counts.
pub fn write_mapping(
    folder: &Path,
    output_file: &Path,
    target_duration: f64,
) -> Result<Vec<MappingEntry>> {
    let files = video_files(folder)?;
    if files.is_empty() {
        return Err(anyhow!("No video files found in {}", folder.display()));
    }

    let mut entries = Vec::with_capacity(files.len());
    for file in &files {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("?")
            .to_string();
        match probe_duration(file) {
            Ok(duration) => entries.push(MappingEntry::Ok { name, duration }),
            Err(_) => entries.push(MappingEntry::Failed { name }),
        }
    }

    fs::write(output_file, render_mapping(&entries, target_duration))
        .with_context(|| format!("writing {}", output_file.display()))?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_string(args: &[String]) -> String {
        args.join(" ")
    }

    #[test]
    fn clip_args_defaults() {
        let args = build_clip_args(
            Path::new("photo.png"),
            Path::new("videos/photo.mp4"),
            &ClipOptions::default(),
        );
        let joined = args_string(&args);
        assert!(joined.contains("-loop 1 -t 4 -i photo.png"));
        assert!(joined.contains("-vf scale=trunc(iw/2)*2:trunc(ih/2)*2,format=yuv420p"));
        assert!(joined.contains("-c:v libx264 -r 24 -an videos/photo.mp4"));
        // no fades requested
        assert!(!joined.contains("fade"));
    }

    #[test]
    fn clip_args_with_size_and_fades() {
        let options = ClipOptions {
            size: Some((1920, 1080)),
            fade_in: 0.5,
            fade_out: 1.0,
            duration: 4.0,
            ..ClipOptions::default()
        };
        let args = build_clip_args(Path::new("a.jpg"), Path::new("a.mp4"), &options);
        let vf = &args[args.iter().position(|a| a == "-vf").unwrap() + 1];
        assert_eq!(
            vf,
            "scale=1920:1080,format=yuv420p,fade=t=in:st=0:d=0.5,fade=t=out:st=3:d=1"
        );
    }

    #[test]
    fn fade_out_start_never_negative() {
        let filters = fade_filters(1.0, 0.0, 2.0);
        assert_eq!(filters, vec!["fade=t=out:st=0:d=2".to_string()]);
    }

    #[test]
    fn retime_trims_longer_source() {
        let options = RetimeOptions {
            target_duration: 4.0,
            ..RetimeOptions::default()
        };
        let args = build_retime_args(Path::new("in.mp4"), Path::new("out.mp4"), 10.0, &options);
        let joined = args_string(&args);
        assert!(!joined.contains("-stream_loop"));
        assert!(joined.contains("-t 4"));
    }

    #[test]
    fn retime_loops_shorter_source() {
        let options = RetimeOptions {
            target_duration: 10.0,
            ..RetimeOptions::default()
        };
        let args = build_retime_args(Path::new("in.mp4"), Path::new("out.mp4"), 3.0, &options);
        let joined = args_string(&args);
        // ceil(10/3) = 4 plays, 3 extra loops
        assert!(joined.contains("-stream_loop 3"));
        assert!(joined.contains("-t 10"));
    }

    #[test]
    fn retime_exact_length_does_not_loop() {
        let options = RetimeOptions {
            target_duration: 5.0,
            ..RetimeOptions::default()
        };
        let args = build_retime_args(Path::new("in.mp4"), Path::new("out.mp4"), 5.0, &options);
        assert!(!args_string(&args).contains("-stream_loop"));
    }

    #[test]
    fn retime_fades_cover_both_ends() {
        let options = RetimeOptions {
            target_duration: 6.0,
            fade_duration: 0.5,
            apply_fades: true,
        };
        let args = build_retime_args(Path::new("in.mp4"), Path::new("out.mp4"), 8.0, &options);
        let vf = &args[args.iter().position(|a| a == "-vf").unwrap() + 1];
        assert_eq!(vf, "fade=t=in:st=0:d=0.5,fade=t=out:st=5.5:d=0.5");
    }

    #[test]
    fn mapping_file_layout() {
        let entries = vec![
            MappingEntry::Ok {
                name: "intro.mp4".to_string(),
                duration: 2.5,
            },
            MappingEntry::Failed {
                name: "broken.mov".to_string(),
            },
        ];
        let text = render_mapping(&entries, 4.0);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Video Mapping (Filename - Durations)");
        assert_eq!(lines[1], "Target Duration: 4.00s");
        assert_eq!(lines[2], "=".repeat(50));
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "intro.mp4 - Original: 2.50s, Target: 4.00s");
        assert_eq!(lines[5], "broken.mov - ERROR");
    }

    #[test]
    fn video_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.mkv", "photo.png"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let files = video_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.mkv", "b.mp4"]);
    }
}
