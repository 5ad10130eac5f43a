use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "quadreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stylize a single frame and write it as a PNG.
    Frame(FrameArgs),
    /// Stylize the whole video to an MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Stylize frames within each chunk on a rayon pool.
    #[arg(long)]
    parallel: bool,

    /// Worker thread count (defaults to the rayon global default).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Job description JSON; flags below override its fields.
    #[arg(long)]
    job: Option<PathBuf>,

    /// Input video file.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Directory of stamp images cycled into near-white regions.
    #[arg(long)]
    stamps: Option<PathBuf>,

    /// Quadtree build depth limit (default 6).
    #[arg(long)]
    limit: Option<u32>,

    /// Composite depth (defaults to the build limit).
    #[arg(long)]
    depth: Option<u32>,

    /// Fill style for regions that are not near-white (default plain).
    #[arg(long, value_enum)]
    mode: Option<ModeChoice>,

    /// Outline color as `r,g,b` (used with `--mode outlined`).
    #[arg(long, default_value = "255,255,255")]
    outline_color: String,

    /// Output frames per second (default 30).
    #[arg(long)]
    fps: Option<u32>,

    /// Stamp cycle tempo in beats per minute (default 120).
    #[arg(long)]
    bpm: Option<f64>,

    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,

    /// Audio file muxed into the MP4 output.
    #[arg(long)]
    audio: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Plain,
    Outlined,
}

fn main() -> anyhow::Result<()> {
    match Cli::parse().cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_job_json(path: &Path) -> anyhow::Result<quadreel::StylizeJob> {
    let f = File::open(path).with_context(|| format!("open job '{}'", path.display()))?;
    let job: quadreel::StylizeJob =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse job JSON")?;
    Ok(job)
}

fn parse_outline_color(s: &str) -> anyhow::Result<quadreel::Rgba8> {
    let parts: Vec<u8> = s
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("parse outline color '{s}' (expected r,g,b)"))?;
    let [r, g, b] = parts.as_slice() else {
        anyhow::bail!("outline color '{s}' must have exactly 3 components");
    };
    Ok(quadreel::Rgba8::opaque(*r, *g, *b))
}

fn build_job(args: &JobArgs) -> anyhow::Result<quadreel::StylizeJob> {
    let mut job = match &args.job {
        Some(path) => read_job_json(path)?,
        None => {
            let video = args
                .in_path
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--in is required without --job"))?;
            let limit = args.limit.unwrap_or(6);
            quadreel::StylizeJob {
                video,
                stamps: None,
                out: PathBuf::from("out.mp4"),
                build_limit: limit,
                render_level: limit,
                mode: quadreel::RenderMode::Plain,
                fps: 30,
                beats_per_minute: 120.0,
                max_frames: None,
                audio: None,
                overwrite: true,
            }
        }
    };

    // Explicitly passed flags override the JSON fields.
    if let Some(video) = &args.in_path {
        job.video = video.clone();
    }
    if let Some(stamps) = &args.stamps {
        job.stamps = Some(stamps.clone());
    }
    if let Some(limit) = args.limit {
        job.build_limit = limit;
        job.render_level = args.depth.unwrap_or(limit);
    }
    if let Some(depth) = args.depth {
        job.render_level = depth;
    }
    if let Some(mode) = args.mode {
        job.mode = match mode {
            ModeChoice::Plain => quadreel::RenderMode::Plain,
            ModeChoice::Outlined => {
                quadreel::RenderMode::Outlined(parse_outline_color(&args.outline_color)?)
            }
        };
    }
    if let Some(fps) = args.fps {
        job.fps = fps;
    }
    if let Some(bpm) = args.bpm {
        job.beats_per_minute = bpm;
    }
    if let Some(frames) = args.frames {
        job.max_frames = Some(frames);
    }
    if let Some(audio) = &args.audio {
        job.audio = Some(audio.clone());
    }

    job.validate()?;
    Ok(job)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let job = build_job(&args.job)?;

    let frame = quadreel::stylize_video_frame(&job, quadreel::FrameIndex(args.frame))?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        frame.data(),
        frame.width(),
        frame.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut job = build_job(&args.job)?;
    if let Some(out) = &args.out {
        job.out = out.clone();
    }

    let threading = quadreel::RenderThreading {
        parallel: args.parallel,
        threads: args.threads,
        ..quadreel::RenderThreading::default()
    };

    let stats = quadreel::stylize_to_mp4_with_stats(&job, &threading)?;

    eprintln!(
        "wrote {} ({} frames, {} resize cache entries)",
        job.out.display(),
        stats.frames,
        stats.cache_entries
    );
    Ok(())
}
