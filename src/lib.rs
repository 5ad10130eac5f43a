//! Quadreel is a quadtree mosaic video stylizer.
//!
//! Each video frame is decomposed into a region quadtree of
//! uniform-color blocks, near-white blocks are substituted with a
//! cyclic "stamp" image, and the recomposed frames are streamed to the
//! system `ffmpeg` binary for MP4 output.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: [`VideoFrameReader`] yields one RGBA [`PixelBuffer`] per frame
//! 2. **Decompose**: [`QuadNode::build`] partitions the frame down to a depth limit
//! 3. **Composite**: [`render_node`] refills each region (mean color, outline, or stamp)
//! 4. **Encode**: [`FfmpegEncoder`] streams the frames to `ffmpeg` (libx264/yuv420p)
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic-by-default**: decomposition and compositing are pure
//!   for a given input; the only caches are explicit and idempotent.
//! - **No IO in the engine**: decode/encode live at the subprocess
//!   boundary (`media`, `encode`); the tree never touches a file.
//! - **Straight-alpha RGBA8** end-to-end: the engine fills and copies,
//!   it never blends; alpha is flattened once at the encoder.
#![forbid(unsafe_code)]

mod assets;
mod encode;
mod foundation;
mod media;
mod pipeline;
mod raster;
mod render;
mod tree;

pub use assets::stamps::{load_stamp_dir, load_stamp_image};
pub use encode::{
    EncodeConfig, FfmpegEncoder, default_mp4_config, ensure_parent_dir, is_ffmpeg_on_path,
};
pub use foundation::core::{FrameIndex, Resolution, Rgba8};
pub use foundation::error::{QuadreelError, QuadreelResult};
pub use media::{VideoFrameReader, VideoSourceInfo, probe_video};
pub use pipeline::{
    RenderStats, RenderThreading, StylizeJob, StylizeOpts, stamp_index_for_frame, stylize_frame,
    stylize_to_mp4, stylize_to_mp4_with_stats, stylize_to_pngs, stylize_video_frame,
};
pub use raster::buffer::{CHANNELS, PixelBuffer};
pub use raster::resize::resize_area;
pub use render::cache::{ResizeCache, Stamp, StampId};
pub use render::compositor::{NEAR_WHITE_THRESHOLD, RenderMode, is_near_white, render_node};
pub use tree::QuadNode;
