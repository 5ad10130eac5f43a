use std::path::PathBuf;

use quadreel::{
    FrameIndex, PixelBuffer, RenderMode, ResizeCache, Resolution, Rgba8, StylizeJob, StylizeOpts,
    load_stamp_dir, stamp_index_for_frame, stylize_frame,
};

fn res(h: u32, w: u32) -> Resolution {
    Resolution::new(h, w).unwrap()
}

fn basic_job() -> StylizeJob {
    StylizeJob {
        video: PathBuf::from("clip.mp4"),
        stamps: Some(PathBuf::from("stamps")),
        out: PathBuf::from("out.mp4"),
        build_limit: 6,
        render_level: 6,
        mode: RenderMode::Plain,
        fps: 30,
        beats_per_minute: 138.0,
        max_frames: Some(100),
        audio: None,
        overwrite: true,
    }
}

#[test]
fn job_survives_a_json_roundtrip() {
    let job = basic_job();
    let s = serde_json::to_string_pretty(&job).unwrap();
    let de: StylizeJob = serde_json::from_str(&s).unwrap();
    assert_eq!(de.build_limit, 6);
    assert_eq!(de.fps, 30);
    assert_eq!(de.mode, RenderMode::Plain);
    assert!(de.validate().is_ok());
}

#[test]
fn outlined_mode_serializes_with_its_color() {
    let mut job = basic_job();
    job.mode = RenderMode::Outlined(Rgba8::opaque(200, 10, 10));
    let s = serde_json::to_string(&job).unwrap();
    let de: StylizeJob = serde_json::from_str(&s).unwrap();
    assert_eq!(de.mode, RenderMode::Outlined(Rgba8::opaque(200, 10, 10)));
}

#[test]
fn tempo_mapping_advances_once_per_stamp_window() {
    // 30 fps, 138 bpm, 4 stamps: frames_per_stamp = 30 / (2.3 * 4).
    let bps = 138.0 / 60.0;
    let frames_per_stamp = 30.0 / (bps * 4.0);
    for f in 0..200u64 {
        let expected = ((f as f64 / frames_per_stamp).floor() as u64 % 4) as usize;
        assert_eq!(stamp_index_for_frame(FrameIndex(f), 30, bps, 4), expected);
    }
}

#[test]
fn loaded_stamps_substitute_into_a_white_frame() {
    let dir = std::env::temp_dir().join(format!("quadreel_job_it_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    image::RgbImage::from_pixel(8, 8, image::Rgb([30, 99, 30]))
        .save_with_format(dir.join("only.png"), image::ImageFormat::Png)
        .unwrap();

    let stamps = load_stamp_dir(&dir).unwrap();
    assert_eq!(stamps.len(), 1);

    let frame = PixelBuffer::solid(res(4, 4), Rgba8::WHITE);
    let opts = StylizeOpts {
        build_limit: 2,
        render_level: 2,
        mode: RenderMode::Plain,
    };
    let cache = ResizeCache::new();
    let out = stylize_frame(&frame, &opts, Some(&stamps[0]), &cache).unwrap();

    assert_eq!(out.resolution(), res(4, 4));
    // The stamp is uniform, so the downscale keeps its color exactly.
    assert_eq!(out.pixel(2, 2), Rgba8::opaque(30, 99, 30));
    assert_eq!(cache.len(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}
