use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::{theme::ColorfulTheme, Confirm, FuzzySelect, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use mediaforge::aspect::{
    self, AspectMode, AspectOptions, CropAnchor, MediaType, BAR_BLACK, BAR_GRAY, BAR_WHITE,
    PRESET_RATIOS,
};
use mediaforge::formats::{is_image_file, is_video_file, ImageFormat};
use mediaforge::video::{ClipOptions, RetimeOptions};
use mediaforge::{embed, kilobytes, optimize, text, video, AppConfig};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(version, about = "Media conversion toolbox for firmware and social-media workflows.")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Command>,

    /// Accept defaults instead of prompting
    #[arg(long, short = 'y', global = true)]
    yes: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an image to a C header with its JPEG bytes
    Embed {
        /// Input image (any readable format)
        input: Option<PathBuf>,
        /// Output header file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Target width in pixels
        #[arg(long)]
        width: Option<u32>,
        /// Target height in pixels
        #[arg(long)]
        height: Option<u32>,
        /// JPEG quality (1-100)
        #[arg(short, long)]
        quality: Option<u8>,
        /// Flip the image horizontally (mirror)
        #[arg(long)]
        flip_h: bool,
        /// Flip the image vertically (upside down)
        #[arg(long)]
        flip_v: bool,
        /// C identifier for the generated array
        #[arg(long)]
        array_name: Option<String>,
    },

    /// Turn still images into short videos
    Video {
        /// Input image file or folder of images
        input: Option<PathBuf>,
        /// Output folder
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Clip duration in seconds
        #[arg(short, long)]
        duration: Option<f64>,
        /// Container format (mp4, mov, avi...)
        #[arg(short, long)]
        format: Option<String>,
        /// Output size as WIDTHxHEIGHT (e.g. 1920x1080)
        #[arg(short, long)]
        size: Option<String>,
        /// Frames per second
        #[arg(long)]
        fps: Option<u32>,
        /// Video codec
        #[arg(long)]
        codec: Option<String>,
        /// Fade-in duration in seconds
        #[arg(long, default_value_t = 0.0)]
        fade_in: f64,
        /// Fade-out duration in seconds
        #[arg(long, default_value_t = 0.0)]
        fade_out: f64,
    },

    /// Retime videos to a fixed duration, trimming or looping
    Duration {
        /// Folder of input videos
        input: Option<PathBuf>,
        /// Output folder for retimed videos
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Target duration in seconds
        #[arg(short, long)]
        target: Option<f64>,
        /// Apply fade in/out effects
        #[arg(long)]
        fades: bool,
        /// Fade duration in seconds
        #[arg(long)]
        fade: Option<f64>,
        /// Also write a duration mapping file
        #[arg(long)]
        map: Option<PathBuf>,
        /// Only write the mapping file, do not retime
        #[arg(long)]
        map_only: bool,
    },

    /// Change aspect ratio by letterboxing or cropping
    Aspect {
        /// Input media file or folder
        input: Option<PathBuf>,
        /// Output file or folder
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Target size as WIDTHxHEIGHT
        #[arg(short, long)]
        size: Option<String>,
        /// Adjustment mode
        #[arg(short, long)]
        mode: Option<ModeArg>,
        /// Crop focus position (crop mode)
        #[arg(long)]
        anchor: Option<AnchorArg>,
        /// Letterbox bar color as R,G,B or black/white/gray
        #[arg(long)]
        color: Option<String>,
        /// Which media kinds a folder run picks up
        #[arg(long)]
        media: Option<MediaArg>,
    },

    /// Optimize images for web delivery
    Optimize {
        /// Input image file
        input: Option<PathBuf>,
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Process all images in this folder instead
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Output folder (for --dir mode)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Maximum width in pixels
        #[arg(long)]
        max_width: Option<u32>,
        /// Maximum height in pixels
        #[arg(long)]
        max_height: Option<u32>,
        /// Quality for JPEG output (1-100)
        #[arg(short, long)]
        quality: Option<u8>,
        /// Output format (keeps input format when omitted)
        #[arg(short, long)]
        format: Option<FormatArg>,
    },

    /// Render each line of a text file as a centered image
    Text {
        /// Input text file
        input: Option<PathBuf>,
        /// Output folder
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Image size as WIDTHxHEIGHT
        #[arg(short, long)]
        size: Option<String>,
        /// TTF/OTF font file (system font when omitted)
        #[arg(long)]
        font: Option<PathBuf>,
        /// Font size in pixels
        #[arg(long)]
        font_size: Option<f32>,
        /// Text color as R,G,B
        #[arg(long)]
        text_color: Option<String>,
        /// Background color as R,G,B
        #[arg(long)]
        bg_color: Option<String>,
        /// Output image format
        #[arg(short, long)]
        format: Option<FormatArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Letterbox,
    Crop,
}

impl From<ModeArg> for AspectMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Letterbox => AspectMode::Letterbox,
            ModeArg::Crop => AspectMode::Crop,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AnchorArg {
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

impl From<AnchorArg> for CropAnchor {
    fn from(value: AnchorArg) -> Self {
        match value {
            AnchorArg::Center => CropAnchor::Center,
            AnchorArg::UpperLeft => CropAnchor::UpperLeft,
            AnchorArg::UpperCenter => CropAnchor::UpperCenter,
            AnchorArg::UpperRight => CropAnchor::UpperRight,
            AnchorArg::CenterLeft => CropAnchor::CenterLeft,
            AnchorArg::CenterRight => CropAnchor::CenterRight,
            AnchorArg::LowerLeft => CropAnchor::LowerLeft,
            AnchorArg::LowerCenter => CropAnchor::LowerCenter,
            AnchorArg::LowerRight => CropAnchor::LowerRight,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MediaArg {
    Images,
    Videos,
    Both,
}

impl From<MediaArg> for MediaType {
    fn from(value: MediaArg) -> Self {
        match value {
            MediaArg::Images => MediaType::Images,
            MediaArg::Videos => MediaType::Videos,
            MediaArg::Both => MediaType::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Jpg,
    Png,
    Webp,
}

impl From<FormatArg> for ImageFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Jpg => ImageFormat::Jpeg,
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Webp => ImageFormat::WebP,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let interactive = !args.yes;
    let cfg = AppConfig::load()?;

    let cmd = match args.cmd {
        Some(cmd) => cmd,
        None => {
            if !interactive {
                return Err(anyhow!("A subcommand is required with --yes"));
            }
            prompt_tool_menu()?
        }
    };

    match cmd {
        Command::Embed {
            input,
            output,
            width,
            height,
            quality,
            flip_h,
            flip_v,
            array_name,
        } => {
            let input = resolve_input_image(input, interactive)?;
            let options = embed::EmbedOptions {
                width: width.unwrap_or(cfg.embed.width),
                height: height.unwrap_or(cfg.embed.height),
                quality: quality.unwrap_or(cfg.embed.quality),
                flip_horizontal: flip_h,
                flip_vertical: flip_v,
                array_name: array_name.unwrap_or_else(|| cfg.embed.array_name.clone()),
            };
            let output = output.unwrap_or_else(|| PathBuf::from("photoData.h"));
            run_embed(&input, &output, &options)
        }
        Command::Video {
            input,
            output,
            duration,
            format,
            size,
            fps,
            codec,
            fade_in,
            fade_out,
        } => {
            let input = resolve_input_media(input, interactive)?;
            let options = ClipOptions {
                duration: duration.unwrap_or(cfg.video.duration),
                fps: fps.unwrap_or(cfg.video.fps),
                codec: codec.unwrap_or_else(|| cfg.video.codec.clone()),
                size: size.as_deref().map(parse_size).transpose()?,
                fade_in,
                fade_out,
                format: format.unwrap_or_else(|| cfg.video.format.clone()),
            };
            let output = output.unwrap_or_else(|| PathBuf::from("videos"));
            run_video(&input, &output, &options)
        }
        Command::Duration {
            input,
            output,
            target,
            fades,
            fade,
            map,
            map_only,
        } => run_duration(
            input, output, target, fades, fade, map, map_only, &cfg, interactive,
        ),
        Command::Aspect {
            input,
            output,
            size,
            mode,
            anchor,
            color,
            media,
        } => run_aspect(input, output, size, mode, anchor, color, media, interactive),
        Command::Optimize {
            input,
            output,
            dir,
            output_dir,
            max_width,
            max_height,
            quality,
            format,
        } => {
            let options = optimize::OptimizeOptions {
                max_width: max_width.unwrap_or(cfg.optimize.max_width),
                max_height: max_height.unwrap_or(cfg.optimize.max_height),
                quality: quality.unwrap_or(cfg.optimize.quality),
                format: format.map(ImageFormat::from),
            };
            run_optimize(input, output, dir, output_dir, &options, interactive)
        }
        Command::Text {
            input,
            output,
            size,
            font,
            font_size,
            text_color,
            bg_color,
            format,
        } => run_text(
            input, output, size, font, font_size, text_color, bg_color, format, &cfg, interactive,
        ),
    }
}

fn prompt_tool_menu() -> Result<Command> {
    let tools = [
        "Embed image as C byte array",
        "Convert images to videos",
        "Adjust video durations",
        "Change aspect ratio",
        "Optimize images for web",
        "Render text lines as images",
    ];
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What do you want to do?")
        .default(0)
        .items(&tools)
        .interact()?;

    Ok(match choice {
        0 => Command::Embed {
            input: None,
            output: None,
            width: None,
            height: None,
            quality: None,
            flip_h: false,
            flip_v: false,
            array_name: None,
        },
        1 => Command::Video {
            input: None,
            output: None,
            duration: None,
            format: None,
            size: None,
            fps: None,
            codec: None,
            fade_in: 0.0,
            fade_out: 0.0,
        },
        2 => Command::Duration {
            input: None,
            output: None,
            target: None,
            fades: false,
            fade: None,
            map: None,
            map_only: false,
        },
        3 => Command::Aspect {
            input: None,
            output: None,
            size: None,
            mode: None,
            anchor: None,
            color: None,
            media: None,
        },
        4 => Command::Optimize {
            input: None,
            output: None,
            dir: None,
            output_dir: None,
            max_width: None,
            max_height: None,
            quality: None,
            format: None,
        },
        _ => Command::Text {
            input: None,
            output: None,
            size: None,
            font: None,
            font_size: None,
            text_color: None,
            bg_color: None,
            format: None,
        },
    })
}

fn find_files_in_cwd(filter: fn(&Path) -> bool) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && filter(e.path()))
        .map(|e| e.path().display().to_string())
        .collect();
    files.sort();
    files
}

fn resolve_input_image(input: Option<PathBuf>, interactive: bool) -> Result<PathBuf> {
    resolve_input(input, interactive, |p| is_image_file(p), "image")
}

fn resolve_input_media(input: Option<PathBuf>, interactive: bool) -> Result<PathBuf> {
    resolve_input(
        input,
        interactive,
        |p| is_image_file(p) || is_video_file(p),
        "media",
    )
}

fn resolve_input(
    input: Option<PathBuf>,
    interactive: bool,
    filter: fn(&Path) -> bool,
    kind: &str,
) -> Result<PathBuf> {
    if let Some(p) = input {
        if !p.exists() {
            return Err(anyhow!("Input path does not exist: {}", p.display()));
        }
        return Ok(p);
    }
    if !interactive {
        return Err(anyhow!("Input file must be provided with --yes"));
    }
    let files = find_files_in_cwd(filter);
    if files.is_empty() {
        return Err(anyhow!("No {} files found in current directory", kind));
    }
    let selection = FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Choose an input {} file", kind))
        .default(0)
        .items(&files)
        .interact()?;
    Ok(PathBuf::from(&files[selection]))
}

fn parse_size(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("Size must be WIDTHxHEIGHT, got '{}'", s))?;
    let w: u32 = w
        .trim()
        .parse()
        .with_context(|| format!("bad width '{}'", w))?;
    let h: u32 = h
        .trim()
        .parse()
        .with_context(|| format!("bad height '{}'", h))?;
    if w == 0 || h == 0 {
        return Err(anyhow!("Size components must be non-zero"));
    }
    Ok((w, h))
}

fn parse_rgb(s: &str) -> Result<[u8; 3]> {
    match s.trim().to_ascii_lowercase().as_str() {
        "black" => return Ok(BAR_BLACK),
        "white" => return Ok(BAR_WHITE),
        "gray" | "grey" => return Ok(BAR_GRAY),
        _ => {}
    }
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(anyhow!(
            "Color must be R,G,B or black/white/gray, got '{}'",
            s
        ));
    }
    let mut rgb = [0u8; 3];
    for (i, part) in parts.iter().enumerate() {
        rgb[i] = part
            .parse()
            .with_context(|| format!("bad color component '{}'", part))?;
    }
    Ok(rgb)
}

fn prompt_dimensions(default_index: usize) -> Result<(u32, u32)> {
    let mut items: Vec<String> = PRESET_RATIOS
        .iter()
        .map(|(label, _, _)| label.to_string())
        .collect();
    items.push("Custom".to_string());
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Target dimensions")
        .default(default_index)
        .items(&items)
        .interact()?;

    if choice < PRESET_RATIOS.len() {
        let (_, w, h) = PRESET_RATIOS[choice];
        Ok((w, h))
    } else {
        let w: u32 = Input::new().with_prompt("Target width").interact()?;
        let h: u32 = Input::new().with_prompt("Target height").interact()?;
        if w == 0 || h == 0 {
            return Err(anyhow!("Dimensions must be non-zero"));
        }
        Ok((w, h))
    }
}

fn prompt_bar_color() -> Result<[u8; 3]> {
    let items = ["Black", "White", "Gray", "Custom RGB"];
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Letterbox bar color")
        .default(0)
        .items(&items)
        .interact()?;
    Ok(match choice {
        1 => BAR_WHITE,
        2 => BAR_GRAY,
        3 => {
            let r: u8 = Input::new().with_prompt("Red (0-255)").interact()?;
            let g: u8 = Input::new().with_prompt("Green (0-255)").interact()?;
            let b: u8 = Input::new().with_prompt("Blue (0-255)").interact()?;
            [r, g, b]
        }
        _ => BAR_BLACK,
    })
}

fn prompt_anchor() -> Result<CropAnchor> {
    let labels = [
        "Center",
        "Upper Left",
        "Upper Center",
        "Upper Right",
        "Center Left",
        "Center Right",
        "Lower Left",
        "Lower Center",
        "Lower Right",
    ];
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Crop focus position")
        .default(0)
        .items(&labels)
        .interact()?;
    Ok(CropAnchor::ALL[choice])
}

fn progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}

fn run_embed(input: &Path, output: &Path, options: &embed::EmbedOptions) -> Result<()> {
    println!("Loading image: {}", input.display());
    println!("Resizing to: {}x{}", options.width, options.height);
    if options.flip_horizontal {
        println!("Flipping horizontally");
    }
    if options.flip_vertical {
        println!("Flipping vertically");
    }

    let report = embed::image_to_header(input, output, options)?;

    println!(
        "Original size: {}x{}",
        report.original_size.0, report.original_size.1
    );
    println!(
        "JPEG size: {} bytes ({:.2} KB)",
        report.jpeg_size,
        kilobytes(report.jpeg_size as u64)
    );
    println!("Done! Generated {}", report.output.display());
    println!(
        "Include this file in your sketch with: #include \"{}\"",
        report.output.display()
    );
    Ok(())
}

fn run_video(input: &Path, output_dir: &Path, options: &ClipOptions) -> Result<()> {
    let images: Vec<PathBuf> = if input.is_file() {
        vec![input.to_path_buf()]
    } else {
        aspect::media_files(input, MediaType::Images)?
    };
    if images.is_empty() {
        return Err(anyhow!("No images found in {}", input.display()));
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output folder {}", output_dir.display()))?;
    println!("Converting {} image(s) to video...", images.len());

    let mut succeeded = 0usize;
    for img in &images {
        let stem = img.file_stem().and_then(|s| s.to_str()).unwrap_or("clip");
        let out = output_dir.join(format!("{}.{}", stem, options.format));
        match video::image_to_video(img, &out, options) {
            Ok(()) => {
                println!(
                    "✓ {}",
                    out.file_name().and_then(|n| n.to_str()).unwrap_or("?")
                );
                succeeded += 1;
            }
            Err(e) => {
                eprintln!("✗ {}: {}", img.display(), e);
            }
        }
    }

    println!(
        "\n{}/{} videos written to {}",
        succeeded,
        images.len(),
        output_dir.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_duration(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    target: Option<f64>,
    fades: bool,
    fade: Option<f64>,
    map: Option<PathBuf>,
    map_only: bool,
    cfg: &AppConfig,
    interactive: bool,
) -> Result<()> {
    let input = match input {
        Some(p) => p,
        None if interactive => PathBuf::from(
            Input::<String>::new()
                .with_prompt("Input folder")
                .default("videos".to_string())
                .interact()?,
        ),
        None => return Err(anyhow!("Input folder must be provided with --yes")),
    };
    if !input.is_dir() {
        return Err(anyhow!("Not a folder: {}", input.display()));
    }

    let target = match target {
        Some(t) => t,
        None if interactive => Input::new()
            .with_prompt("Target duration in seconds")
            .default(cfg.video.duration)
            .interact()?,
        None => cfg.video.duration,
    };
    if target <= 0.0 {
        return Err(anyhow!("Target duration must be positive"));
    }

    if map_only || map.is_some() {
        let map_file = map.unwrap_or_else(|| PathBuf::from("video_mapping.txt"));
        let entries = video::write_mapping(&input, &map_file, target)?;
        let ok = entries
            .iter()
            .filter(|e| matches!(e, video::MappingEntry::Ok { .. }))
            .count();
        println!("Mapping saved to {}", map_file.display());
        println!("Total videos processed: {}", ok);
        if map_only {
            return Ok(());
        }
    }

    let apply_fades = if fades || fade.is_some() {
        true
    } else if interactive {
        Confirm::new()
            .with_prompt("Apply fade in/out effects?")
            .default(false)
            .interact()?
    } else {
        false
    };

    let fade_duration = match fade {
        Some(f) => f,
        None if apply_fades && interactive => Input::new()
            .with_prompt("Fade duration in seconds")
            .default(cfg.video.fade)
            .interact()?,
        None => cfg.video.fade,
    };

    let output_dir = output.unwrap_or_else(|| PathBuf::from("videos_adjusted"));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output folder {}", output_dir.display()))?;

    let files = video::video_files(&input)?;
    if files.is_empty() {
        return Err(anyhow!("No video files found in {}", input.display()));
    }

    let options = RetimeOptions {
        target_duration: target,
        fade_duration,
        apply_fades,
    };
    println!("Processing {} video(s) to {:.2}s...", files.len(), target);

    let mut succeeded = 0usize;
    for file in &files {
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("?");
        let out = output_dir.join(name);
        match video::adjust_duration(file, &out, &options) {
            Ok(source_duration) => {
                println!("✓ {} ({:.2}s -> {:.2}s)", name, source_duration, target);
                succeeded += 1;
            }
            Err(e) => eprintln!("✗ {}: {}", name, e),
        }
    }

    println!(
        "\n{}/{} videos adjusted, saved to {}",
        succeeded,
        files.len(),
        output_dir.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_aspect(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    size: Option<String>,
    mode: Option<ModeArg>,
    anchor: Option<AnchorArg>,
    color: Option<String>,
    media: Option<MediaArg>,
    interactive: bool,
) -> Result<()> {
    let input = resolve_input_media_or_dir(input, interactive)?;

    let (target_width, target_height) = match size {
        Some(s) => parse_size(&s)?,
        None if interactive => prompt_dimensions(0)?,
        None => (PRESET_RATIOS[0].1, PRESET_RATIOS[0].2),
    };

    let mode: AspectMode = match mode {
        Some(m) => m.into(),
        None if interactive => {
            let items = [
                "Letterbox - Add bars to preserve the full frame",
                "Crop - Cut the frame to fill the target ratio",
            ];
            match Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Adjustment mode")
                .default(0)
                .items(&items)
                .interact()?
            {
                1 => AspectMode::Crop,
                _ => AspectMode::Letterbox,
            }
        }
        None => AspectMode::Letterbox,
    };

    let anchor: CropAnchor = match anchor {
        Some(a) => a.into(),
        None if interactive && mode == AspectMode::Crop => prompt_anchor()?,
        None => CropAnchor::Center,
    };

    let bar_color = match color {
        Some(c) => parse_rgb(&c)?,
        None if interactive && mode == AspectMode::Letterbox => prompt_bar_color()?,
        None => BAR_BLACK,
    };

    let options = AspectOptions {
        target_width,
        target_height,
        mode,
        anchor,
        bar_color,
    };

    println!("Target dimensions: {}x{}", target_width, target_height);
    println!("Mode: {}", mode.as_str());
    if mode == AspectMode::Crop {
        println!("Crop anchor: {}", anchor.as_str());
    } else {
        println!(
            "Letterbox color: RGB({}, {}, {})",
            bar_color[0], bar_color[1], bar_color[2]
        );
    }

    if input.is_file() {
        let out = match output {
            Some(p) => p,
            None => default_sibling_output(&input, "adjusted")?,
        };
        let report = if is_video_file(&input) {
            aspect::process_video(&input, &out, &options)?
        } else {
            aspect::process_image(&input, &out, &options)?
        };
        println!(
            "✓ {} ({:.2} KB -> {:.2} KB)",
            report.output.display(),
            kilobytes(report.original_bytes),
            kilobytes(report.new_bytes)
        );
        return Ok(());
    }

    let media_type: MediaType = match media {
        Some(m) => m.into(),
        None if interactive => {
            let items = ["Images only", "Videos only", "Both images and videos"];
            match Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Process")
                .default(0)
                .items(&items)
                .interact()?
            {
                1 => MediaType::Videos,
                2 => MediaType::Both,
                _ => MediaType::Images,
            }
        }
        None => MediaType::Images,
    };

    let output_dir = output.unwrap_or_else(|| PathBuf::from("media_adjusted"));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output folder {}", output_dir.display()))?;

    let files = aspect::media_files(&input, media_type)?;
    if files.is_empty() {
        return Err(anyhow!("No media files found in {}", input.display()));
    }
    println!("\nProcessing {} file(s)...", files.len());

    let (images, videos): (Vec<_>, Vec<_>) = files.into_iter().partition(|p| is_image_file(p));
    let pb = progress_bar(
        (images.len() + videos.len()) as u64,
        "Adjusting aspect ratio",
    );
    let failures: Mutex<Vec<String>> = Mutex::new(Vec::new());

    // Images run in parallel; videos stay sequential since ffmpeg already
    // saturates the cores.
    images.par_iter().for_each(|file| {
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("?");
        let out = output_dir.join(name);
        if let Err(e) = aspect::process_image(file, &out, &options) {
            failures.lock().unwrap().push(format!("{}: {}", name, e));
        }
        pb.inc(1);
    });
    for file in &videos {
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("?");
        let out = output_dir.join(name);
        if let Err(e) = aspect::process_video(file, &out, &options) {
            failures.lock().unwrap().push(format!("{}: {}", name, e));
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let failures = failures.into_inner().unwrap();
    for failure in &failures {
        eprintln!("✗ {}", failure);
    }
    let total = images.len() + videos.len();
    println!(
        "\n{}/{} files processed, saved to {}",
        total - failures.len(),
        total,
        output_dir.display()
    );
    Ok(())
}

fn resolve_input_media_or_dir(input: Option<PathBuf>, interactive: bool) -> Result<PathBuf> {
    if let Some(p) = input {
        if !p.exists() {
            return Err(anyhow!("Input path does not exist: {}", p.display()));
        }
        return Ok(p);
    }
    if !interactive {
        return Err(anyhow!("Input path must be provided with --yes"));
    }
    let folder: String = Input::new()
        .with_prompt("Input file or folder")
        .default(".".to_string())
        .interact()?;
    let p = PathBuf::from(folder);
    if !p.exists() {
        return Err(anyhow!("Input path does not exist: {}", p.display()));
    }
    Ok(p)
}

fn default_sibling_output(input: &Path, suffix: &str) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Bad input file name: {}", input.display()))?;
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("png");
    Ok(input.with_file_name(format!("{}_{}.{}", stem, suffix, ext)))
}

fn run_optimize(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    options: &optimize::OptimizeOptions,
    interactive: bool,
) -> Result<()> {
    if let Some(dir) = dir {
        let files = optimize::image_files(&dir)?;
        if files.is_empty() {
            return Err(anyhow!("No images found in {}", dir.display()));
        }
        if let Some(out) = &output_dir {
            fs::create_dir_all(out)
                .with_context(|| format!("creating output folder {}", out.display()))?;
        }
        println!("Found {} images to optimize\n", files.len());

        let pb = progress_bar(files.len() as u64, "Optimizing");
        let reports: Mutex<Vec<(String, Result<optimize::OptimizeReport>)>> =
            Mutex::new(Vec::new());

        files.par_iter().for_each(|file| {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("?")
                .to_string();
            let out_path = output_dir.as_ref().map(|d| d.join(&name));
            let result = optimize::optimize_image(file, out_path.as_deref(), options);
            reports.lock().unwrap().push((name, result));
            pb.inc(1);
        });
        pb.finish_and_clear();

        let mut reports = reports.into_inner().unwrap();
        reports.sort_by(|a, b| a.0.cmp(&b.0));
        let mut succeeded = 0usize;
        for (name, result) in &reports {
            match result {
                Ok(report) => {
                    print_optimize_report(name, report);
                    succeeded += 1;
                }
                Err(e) => eprintln!("Error processing {}: {}\n", name, e),
            }
        }
        println!("{}/{} images optimized", succeeded, reports.len());
        return Ok(());
    }

    let input = resolve_input_image(input, interactive)?;
    let report = optimize::optimize_image(&input, output.as_deref(), options)?;
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image");
    print_optimize_report(name, &report);
    println!("Optimized image saved to: {}", report.output.display());
    Ok(())
}

fn print_optimize_report(name: &str, report: &optimize::OptimizeReport) {
    println!("Processing {}...", name);
    if let Some((w, h)) = report.resized_to {
        println!("Resized to {}x{}", w, h);
    }
    println!("Original: {:.2} KB", kilobytes(report.original_bytes));
    println!("Optimized: {:.2} KB", kilobytes(report.optimized_bytes));
    println!("Reduction: {:.1}%\n", report.reduction_percent());
}

#[allow(clippy::too_many_arguments)]
fn run_text(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    size: Option<String>,
    font_path: Option<PathBuf>,
    font_size: Option<f32>,
    text_color: Option<String>,
    bg_color: Option<String>,
    format: Option<FormatArg>,
    cfg: &AppConfig,
    interactive: bool,
) -> Result<()> {
    let input = match input {
        Some(p) => p,
        None if interactive => PathBuf::from(
            Input::<String>::new()
                .with_prompt("Path to text file")
                .default("text.txt".to_string())
                .interact()?,
        ),
        None => return Err(anyhow!("Input text file must be provided with --yes")),
    };
    if !input.exists() {
        return Err(anyhow!("Input file does not exist: {}", input.display()));
    }

    let (width, height) = match size {
        Some(s) => parse_size(&s)?,
        // Square preset, the usual shape for social-media text cards.
        None if interactive => prompt_dimensions(2)?,
        None => (cfg.text.width, cfg.text.height),
    };

    let font_size = match font_size {
        Some(s) => s,
        None if interactive => Input::new()
            .with_prompt("Font size")
            .default(cfg.text.font_size)
            .interact()?,
        None => cfg.text.font_size,
    };
    if font_size <= 0.0 {
        return Err(anyhow!("Font size must be positive"));
    }

    let (text_rgb, bg_rgb) = match (&text_color, &bg_color) {
        (None, None) if interactive => prompt_color_scheme(cfg)?,
        _ => (
            text_color
                .as_deref()
                .map(parse_rgb)
                .transpose()?
                .unwrap_or(cfg.text.text_color),
            bg_color
                .as_deref()
                .map(parse_rgb)
                .transpose()?
                .unwrap_or(cfg.text.bg_color),
        ),
    };

    let format = format.map(ImageFormat::from).unwrap_or(ImageFormat::Png);
    let output_dir = output.unwrap_or_else(|| PathBuf::from("images_processed"));

    let font = text::load_font(font_path.as_deref())?;
    if let Some(p) = &font_path {
        println!("Loaded custom font: {}", p.display());
    }

    let options = text::TextOptions {
        width,
        height,
        font_size,
        text_color: text_rgb,
        bg_color: bg_rgb,
        format,
        padding: 20,
    };

    println!("\nSettings:");
    println!("  Input file: {}", input.display());
    println!("  Output folder: {}", output_dir.display());
    println!("  Image dimensions: {}x{}", width, height);
    println!("  Font size: {}", font_size);
    println!(
        "  Text color (RGB): ({}, {}, {})",
        text_rgb[0], text_rgb[1], text_rgb[2]
    );
    println!(
        "  Background color (RGB): ({}, {}, {})",
        bg_rgb[0], bg_rgb[1], bg_rgb[2]
    );
    println!("  Output format: {}\n", format);

    let rendered = text::process_text_file(&input, &output_dir, &font, &options)?;
    for line in &rendered {
        if line.overflowed {
            eprintln!(
                "Warning: line {} ('{}') may not fit in {}x{}",
                line.index,
                truncate_for_display(&line.text, 30),
                width,
                height
            );
        }
        println!(
            "✓ {} ({:.2} KB)",
            line.output
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("?"),
            kilobytes(line.bytes)
        );
    }
    println!(
        "\n{} images created in {}",
        rendered.len(),
        output_dir.display()
    );
    Ok(())
}

fn prompt_color_scheme(cfg: &AppConfig) -> Result<([u8; 3], [u8; 3])> {
    let items = [
        "White text on black background",
        "Black text on white background",
        "Custom RGB colors",
    ];
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Color scheme")
        .default(0)
        .items(&items)
        .interact()?;
    Ok(match choice {
        1 => ([0, 0, 0], [255, 255, 255]),
        2 => {
            let text: String = Input::new()
                .with_prompt("Text color (R,G,B)")
                .default("255,255,255".to_string())
                .interact()?;
            let bg: String = Input::new()
                .with_prompt("Background color (R,G,B)")
                .default("0,0,0".to_string())
                .interact()?;
            (parse_rgb(&text)?, parse_rgb(&bg)?)
        }
        _ => (cfg.text.text_color, cfg.text.bg_color),
    })
}

fn truncate_for_display(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_accepts_both_separators() {
        assert_eq!(parse_size("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_size("1080X1920").unwrap(), (1080, 1920));
        assert!(parse_size("1920").is_err());
        assert!(parse_size("0x100").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn parse_rgb_names_and_triples() {
        assert_eq!(parse_rgb("black").unwrap(), [0, 0, 0]);
        assert_eq!(parse_rgb("White").unwrap(), [255, 255, 255]);
        assert_eq!(parse_rgb("gray").unwrap(), [128, 128, 128]);
        assert_eq!(parse_rgb("12, 34, 56").unwrap(), [12, 34, 56]);
        assert!(parse_rgb("1,2").is_err());
        assert!(parse_rgb("300,0,0").is_err());
    }

    #[test]
    fn sibling_output_keeps_extension() {
        let out = default_sibling_output(Path::new("clips/movie.mp4"), "adjusted").unwrap();
        assert_eq!(out, PathBuf::from("clips/movie_adjusted.mp4"));
    }

    #[test]
    fn display_truncation() {
        assert_eq!(truncate_for_display("short", 30), "short");
        let long = "a".repeat(40);
        assert_eq!(truncate_for_display(&long, 30).chars().count(), 33);
    }
}
