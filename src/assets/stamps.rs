use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Resolution;
use crate::foundation::error::{QuadreelError, QuadreelResult};
use crate::raster::buffer::PixelBuffer;
use crate::render::cache::Stamp;

/// Decode one image file into a normalized RGBA8 buffer.
///
/// Grayscale and 3-channel sources gain replicated channels and an
/// opaque alpha on the way in; everything past this point is 4-channel.
pub fn load_stamp_image(path: &Path) -> QuadreelResult<PixelBuffer> {
    let img = image::open(path)
        .with_context(|| format!("decode stamp image '{}'", path.display()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let resolution = Resolution::new(height, width)?;
    PixelBuffer::from_rgba(resolution, rgba.into_raw())
}

/// Load every file in `dir` as a stamp image, sorted by file name so
/// that frame-sequence directories keep their order. Each stamp's cache
/// identity is its position in the returned sequence.
pub fn load_stamp_dir(dir: &Path) -> QuadreelResult<Vec<Stamp>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read stamp directory '{}'", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list stamp directory '{}'", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut stamps = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        stamps.push(Stamp {
            id: index as u32,
            image: load_stamp_image(path)?,
        });
    }

    if stamps.is_empty() {
        return Err(QuadreelError::validation(format!(
            "stamp directory '{}' contains no images",
            dir.display()
        )));
    }
    Ok(stamps)
}
