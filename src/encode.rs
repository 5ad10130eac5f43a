use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    foundation::core::Rgba8,
    foundation::error::{QuadreelError, QuadreelResult},
    raster::buffer::{CHANNELS, PixelBuffer},
};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// Optional audio file muxed alongside the video with `-shortest`.
    pub audio: Option<PathBuf>,
}

impl EncodeConfig {
    pub fn validate(&self) -> QuadreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(QuadreelError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(QuadreelError::validation("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // Default settings target yuv420p output for maximum compatibility.
            return Err(QuadreelError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

pub fn default_mp4_config(
    out_path: impl Into<PathBuf>,
    width: u32,
    height: u32,
    fps: u32,
) -> EncodeConfig {
    EncodeConfig {
        width,
        height,
        fps,
        out_path: out_path.into(),
        overwrite: true,
        audio: None,
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> QuadreelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Streams straight-alpha RGBA frames to the system `ffmpeg` binary for
/// MP4 encoding (libx264, yuv420p). Alpha is flattened over `bg_rgba`
/// before it reaches the encoder.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    bg_rgba: Rgba8,
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncodeConfig, bg_rgba: Rgba8) -> QuadreelResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(QuadreelError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(QuadreelError::media(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        // The system `ffmpeg` binary is used rather than `ffmpeg-next` to
        // avoid native FFmpeg dev header/lib requirements.
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if cfg.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
        ]);

        if let Some(audio) = &cfg.audio {
            cmd.arg("-i").arg(audio);
            cmd.args(["-map", "0:v", "-map", "1:a", "-c:a", "aac", "-shortest"]);
        } else {
            cmd.arg("-an");
        }

        cmd.args([
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            QuadreelError::media(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| QuadreelError::media("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            scratch: vec![0u8; (cfg.width * cfg.height) as usize * CHANNELS],
            cfg,
            bg_rgba,
            child,
            stdin: Some(stdin),
        })
    }

    pub fn encode_frame(&mut self, frame: &PixelBuffer) -> QuadreelResult<()> {
        if frame.width() != self.cfg.width || frame.height() != self.cfg.height {
            return Err(QuadreelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.cfg.width,
                self.cfg.height
            )));
        }

        flatten_to_opaque_rgba8(&mut self.scratch, frame.data(), self.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(QuadreelError::media("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            QuadreelError::media(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        Ok(())
    }

    pub fn finish(mut self) -> QuadreelResult<()> {
        drop(self.stdin.take());

        let output = self
            .child
            .wait_with_output()
            .map_err(|e| QuadreelError::media(format!("failed to wait for ffmpeg to finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(QuadreelError::media(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

fn flatten_to_opaque_rgba8(dst: &mut [u8], src: &[u8], bg_rgba: Rgba8) -> QuadreelResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(CHANNELS) {
        return Err(QuadreelError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = u16::from(bg_rgba.r);
    let bg_g = u16::from(bg_rgba.g);
    let bg_b = u16::from(bg_rgba.b);

    for (d, s) in dst.chunks_exact_mut(CHANNELS).zip(src.chunks_exact(CHANNELS)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (mul_div255(u16::from(s[0]), a) + mul_div255(bg_r, inv)).min(255) as u8;
        d[1] = (mul_div255(u16::from(s[1]), a) + mul_div255(bg_g, inv)).min(255) as u8;
        d[2] = (mul_div255(u16::from(s[2]), a) + mul_div255(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}
