use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::{
    assets::stamps::load_stamp_dir,
    encode::{EncodeConfig, FfmpegEncoder},
    foundation::core::{FrameIndex, Rgba8},
    foundation::error::{QuadreelError, QuadreelResult},
    media::{VideoFrameReader, probe_video},
    raster::buffer::PixelBuffer,
    render::cache::{ResizeCache, Stamp},
    render::compositor::{RenderMode, render_node},
    tree::QuadNode,
};

/// Per-frame stylization parameters.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct StylizeOpts {
    /// Maximum quadtree build depth.
    pub build_limit: u32,
    /// Maximum depth visited while compositing; deeper than the built
    /// tree is a no-op.
    pub render_level: u32,
    /// Fill style for terminal regions that are not near-white.
    pub mode: RenderMode,
}

/// A batch stylization job: which video, which stamp set, how to
/// decompose, and where the MP4 goes.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StylizeJob {
    /// Input video file.
    pub video: PathBuf,
    /// Directory of stamp images cycled into near-white regions. With
    /// no stamp directory, near-white regions render as pure white.
    #[serde(default)]
    pub stamps: Option<PathBuf>,
    /// Output MP4 path.
    pub out: PathBuf,
    pub build_limit: u32,
    pub render_level: u32,
    pub mode: RenderMode,
    /// Output frames per second.
    pub fps: u32,
    /// Tempo the stamp sequence cycles at: one full cycle per beat.
    pub beats_per_minute: f64,
    /// Stop after this many frames; `None` runs to end of stream.
    #[serde(default)]
    pub max_frames: Option<u64>,
    /// Optional audio file muxed into the output with `-shortest`.
    #[serde(default)]
    pub audio: Option<PathBuf>,
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

fn default_overwrite() -> bool {
    true
}

impl StylizeJob {
    pub fn validate(&self) -> QuadreelResult<()> {
        if self.fps == 0 {
            return Err(QuadreelError::validation("job fps must be > 0"));
        }
        if self.stamps.is_some()
            && (!self.beats_per_minute.is_finite() || self.beats_per_minute <= 0.0)
        {
            return Err(QuadreelError::validation(
                "beats_per_minute must be positive when a stamp directory is set",
            ));
        }
        if let Some(max) = self.max_frames
            && max == 0
        {
            return Err(QuadreelError::validation(
                "max_frames must be > 0 when set",
            ));
        }
        Ok(())
    }

    pub fn opts(&self) -> StylizeOpts {
        StylizeOpts {
            build_limit: self.build_limit,
            render_level: self.render_level,
            mode: self.mode,
        }
    }
}

/// Map a frame number onto an index into the stamp sequence so the
/// sequence completes one full cycle per beat.
///
/// `frames_per_stamp = fps / (beats_per_second * len)`; the index is
/// `floor(frame / frames_per_stamp) mod len`.
pub fn stamp_index_for_frame(
    frame: FrameIndex,
    fps: u32,
    beats_per_second: f64,
    sequence_len: usize,
) -> usize {
    if sequence_len == 0 {
        return 0;
    }
    let frames_per_stamp = f64::from(fps) / (beats_per_second * sequence_len as f64);
    if !frames_per_stamp.is_finite() || frames_per_stamp <= 0.0 {
        return 0;
    }
    ((frame.0 as f64 / frames_per_stamp).floor() as u64 % sequence_len as u64) as usize
}

fn select_stamp(stamps: &[Stamp], frame: FrameIndex, fps: u32, beats_per_second: f64) -> Option<&Stamp> {
    if stamps.is_empty() {
        return None;
    }
    Some(&stamps[stamp_index_for_frame(frame, fps, beats_per_second, stamps.len())])
}

/// Decompose one frame and recompose it in the chosen style.
///
/// This is the per-frame core: everything around it is IO.
#[tracing::instrument(skip(frame, stamp, cache), fields(height = frame.height(), width = frame.width()))]
pub fn stylize_frame(
    frame: &PixelBuffer,
    opts: &StylizeOpts,
    stamp: Option<&Stamp>,
    cache: &ResizeCache,
) -> QuadreelResult<PixelBuffer> {
    let tree = QuadNode::build(frame, opts.build_limit)?;
    render_node(&tree, opts.render_level, stamp, opts.mode, cache)
}

/// Decode, stylize and return a single frame of the job's video.
pub fn stylize_video_frame(job: &StylizeJob, frame: FrameIndex) -> QuadreelResult<PixelBuffer> {
    job.validate()?;
    let info = probe_video(&job.video)?;
    let stamps = load_job_stamps(job)?;
    let cache = ResizeCache::new();
    let opts = job.opts();
    let beats_per_second = job.beats_per_minute / 60.0;

    let mut reader = VideoFrameReader::open(&info)?;
    for _ in 0..frame.0 {
        if reader.next_frame()?.is_none() {
            return Err(QuadreelError::media(format!(
                "video ended before frame {}",
                frame.0
            )));
        }
    }
    let Some(decoded) = reader.next_frame()? else {
        return Err(QuadreelError::media(format!(
            "video ended before frame {}",
            frame.0
        )));
    };

    let stamp = select_stamp(&stamps, frame, job.fps, beats_per_second);
    stylize_frame(&decoded, &opts, stamp, &cache)
}

#[derive(Clone, Debug)]
pub struct RenderThreading {
    pub parallel: bool,
    pub chunk_size: usize,
    pub threads: Option<usize>,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames: u64,
    pub cache_entries: usize,
    pub cache_resizes: u64,
}

/// Stylize the whole job to an MP4 with default threading.
pub fn stylize_to_mp4(job: &StylizeJob) -> QuadreelResult<()> {
    stylize_to_mp4_with_stats(job, &RenderThreading::default()).map(|_| ())
}

/// Stream the job's video through decode → decompose → composite →
/// encode, chunk by chunk.
///
/// With `threading.parallel`, frames within a chunk are stylized on a
/// rayon pool; the resize cache is shared across all workers and all
/// frames. Encoding stays sequential and in order either way.
pub fn stylize_to_mp4_with_stats(
    job: &StylizeJob,
    threading: &RenderThreading,
) -> QuadreelResult<RenderStats> {
    job.validate()?;

    let info = probe_video(&job.video)?;
    let stamps = load_job_stamps(job)?;
    let cache = ResizeCache::new();
    let opts = job.opts();
    let beats_per_second = job.beats_per_minute / 60.0;

    let cfg = EncodeConfig {
        width: info.width,
        height: info.height,
        fps: job.fps,
        out_path: job.out.clone(),
        overwrite: job.overwrite,
        audio: job.audio.clone(),
    };
    let mut enc = FfmpegEncoder::new(cfg, Rgba8::BLACK)?;
    let mut reader = VideoFrameReader::open(&info)?;

    let pool = if threading.parallel {
        Some(build_thread_pool(threading.threads)?)
    } else {
        None
    };
    let chunk_size = normalized_chunk_size(threading.chunk_size);

    let mut stats = RenderStats::default();
    let mut next_frame = 0u64;
    loop {
        let remaining = match job.max_frames {
            Some(max) => (max.saturating_sub(next_frame)).min(chunk_size),
            None => chunk_size,
        };
        if remaining == 0 {
            break;
        }

        let mut chunk = Vec::with_capacity(remaining as usize);
        while (chunk.len() as u64) < remaining {
            match reader.next_frame()? {
                Some(frame) => {
                    chunk.push((FrameIndex(next_frame + chunk.len() as u64), frame));
                }
                None => break,
            }
        }
        if chunk.is_empty() {
            break;
        }

        let stylized: Vec<QuadreelResult<PixelBuffer>> = match &pool {
            Some(pool) => pool.install(|| {
                chunk
                    .par_iter()
                    .map(|(idx, frame)| {
                        let stamp = select_stamp(&stamps, *idx, job.fps, beats_per_second);
                        stylize_frame(frame, &opts, stamp, &cache)
                    })
                    .collect()
            }),
            None => chunk
                .iter()
                .map(|(idx, frame)| {
                    let stamp = select_stamp(&stamps, *idx, job.fps, beats_per_second);
                    stylize_frame(frame, &opts, stamp, &cache)
                })
                .collect(),
        };

        for frame in stylized {
            enc.encode_frame(&frame?)?;
            stats.frames += 1;
        }
        next_frame += chunk.len() as u64;
        tracing::info!(frames = stats.frames, "encoded chunk");
    }

    enc.finish()?;
    stats.cache_entries = cache.len();
    stats.cache_resizes = cache.resize_count();
    tracing::info!(
        frames = stats.frames,
        cache_entries = stats.cache_entries,
        "stylize job finished"
    );
    Ok(stats)
}

/// Stylize to a numbered PNG sequence (`frame0000.png`, ...) instead of
/// an MP4, for inspecting individual frames.
pub fn stylize_to_pngs(job: &StylizeJob, out_dir: &Path) -> QuadreelResult<RenderStats> {
    use anyhow::Context as _;

    job.validate()?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create frame directory '{}'", out_dir.display()))?;

    let info = probe_video(&job.video)?;
    let stamps = load_job_stamps(job)?;
    let cache = ResizeCache::new();
    let opts = job.opts();
    let beats_per_second = job.beats_per_minute / 60.0;

    let mut reader = VideoFrameReader::open(&info)?;
    let mut stats = RenderStats::default();
    while stats.frames < job.max_frames.unwrap_or(u64::MAX) {
        let Some(frame) = reader.next_frame()? else {
            break;
        };

        let idx = FrameIndex(stats.frames);
        let stamp = select_stamp(&stamps, idx, job.fps, beats_per_second);
        let out = stylize_frame(&frame, &opts, stamp, &cache)?;

        let path = out_dir.join(format!("frame{:04}.png", idx.0));
        image::save_buffer_with_format(
            &path,
            out.data(),
            out.width(),
            out.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        stats.frames += 1;
    }

    stats.cache_entries = cache.len();
    stats.cache_resizes = cache.resize_count();
    Ok(stats)
}

fn load_job_stamps(job: &StylizeJob) -> QuadreelResult<Vec<Stamp>> {
    match &job.stamps {
        Some(dir) => load_stamp_dir(dir),
        None => Ok(Vec::new()),
    }
}

fn build_thread_pool(threads: Option<usize>) -> QuadreelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(QuadreelError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| QuadreelError::render(format!("failed to build rayon thread pool: {e}")))
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 { 1 } else { chunk_size as u64 }
}
