use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::core::Resolution;
use crate::foundation::error::{QuadreelError, QuadreelResult};
use crate::raster::buffer::{CHANNELS, PixelBuffer};

#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub duration_sec: f64,
    pub has_audio: bool,
}

impl VideoSourceInfo {
    pub fn source_fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }

    pub fn resolution(&self) -> QuadreelResult<Resolution> {
        Resolution::new(self.height, self.width)
    }
}

/// Probe a video file with the system `ffprobe` binary.
pub fn probe_video(source_path: &Path) -> QuadreelResult<VideoSourceInfo> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| QuadreelError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(QuadreelError::media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    parse_probe_output(source_path, &out.stdout)
}

fn parse_probe_output(source_path: &Path, stdout: &[u8]) -> QuadreelResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(stdout)
        .map_err(|e| QuadreelError::media(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| QuadreelError::media("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| QuadreelError::media("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| QuadreelError::media("missing video height from ffprobe"))?;

    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| QuadreelError::media("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
        has_audio,
    })
}

/// Streams decoded RGBA frames from a video file, one `next_frame` call
/// per frame, by piping the system `ffmpeg` binary's rawvideo output.
///
/// The child process is killed if the reader is dropped before EOF.
pub struct VideoFrameReader {
    child: Child,
    stdout: ChildStdout,
    resolution: Resolution,
    frame_len: usize,
    frames_read: u64,
    done: bool,
}

impl VideoFrameReader {
    pub fn open(info: &VideoSourceInfo) -> QuadreelResult<Self> {
        let resolution = info.resolution()?;
        let frame_len = resolution.area() as usize * CHANNELS;

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&info.source_path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                QuadreelError::media(format!("failed to spawn ffmpeg for video decode: {e}"))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| QuadreelError::media("failed to open ffmpeg stdout (unexpected)"))?;

        Ok(Self {
            child,
            stdout,
            resolution,
            frame_len,
            frames_read: 0,
            done: false,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next decoded frame, or `None` at end of stream.
    ///
    /// A stream that ends mid-frame is a media error, as is a decoder
    /// that exits unsuccessfully at EOF.
    pub fn next_frame(&mut self) -> QuadreelResult<Option<PixelBuffer>> {
        if self.done {
            return Ok(None);
        }

        let mut bytes = vec![0u8; self.frame_len];
        let mut filled = 0usize;
        while filled < bytes.len() {
            let n = self
                .stdout
                .read(&mut bytes[filled..])
                .map_err(|e| QuadreelError::media(format!("read from ffmpeg stdout: {e}")))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            self.done = true;
            let status = self
                .child
                .wait()
                .map_err(|e| QuadreelError::media(format!("wait for ffmpeg decoder: {e}")))?;
            if !status.success() {
                return Err(QuadreelError::media(format!(
                    "ffmpeg video decode exited with status {status}"
                )));
            }
            return Ok(None);
        }
        if filled < self.frame_len {
            return Err(QuadreelError::media(format!(
                "truncated video frame: got {filled} of {} bytes",
                self.frame_len
            )));
        }

        self.frames_read += 1;
        Ok(Some(PixelBuffer::from_rgba(self.resolution, bytes)?))
    }
}

impl Drop for VideoFrameReader {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ff_ratio_parsing() {
        assert_eq!(parse_ff_ratio("30000/1001"), Some((30000, 1001)));
        assert_eq!(parse_ff_ratio("25/1"), Some((25, 1)));
        assert_eq!(parse_ff_ratio("25/0"), None);
        assert_eq!(parse_ff_ratio("nonsense"), None);
    }

    #[test]
    fn probe_output_parsing_extracts_video_stream() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 640, "height": 480, "r_frame_rate": "30/1"}
            ],
            "format": {"duration": "12.5"}
        }"#;
        let info = parse_probe_output(Path::new("clip.mp4"), json).unwrap();
        assert_eq!(info.width, 640);
        assert_eq!(info.height, 480);
        assert_eq!(info.fps_num, 30);
        assert_eq!(info.fps_den, 1);
        assert!((info.duration_sec - 12.5).abs() < 1e-9);
        assert!(info.has_audio);
        assert!((info.source_fps() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn probe_output_without_video_stream_is_an_error() {
        let json = br#"{"streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_probe_output(Path::new("clip.mp4"), json),
            Err(QuadreelError::Media(_))
        ));
    }
}
