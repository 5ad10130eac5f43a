use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::foundation::core::Resolution;
use crate::foundation::error::QuadreelResult;
use crate::raster::buffer::PixelBuffer;
use crate::raster::resize::resize_area;

/// Caller-supplied stable identity for a stamp image, typically its
/// index in the loaded stamp sequence. The cache conflates identity
/// with pixel content, so one id must always mean the same pixels.
pub type StampId = u32;

/// A stamp image paired with its cache identity.
#[derive(Clone, Debug)]
pub struct Stamp {
    pub id: StampId,
    pub image: PixelBuffer,
}

/// Memoizes "stamp resized to resolution R", keyed by
/// `(StampId, height, width)`.
///
/// Entries are never evicted: the quadtree visits a small fixed set of
/// region resolutions, so the map stays bounded by depth in practice.
/// One instance is shared across frames and across render workers.
#[derive(Debug, Default)]
pub struct ResizeCache {
    entries: Mutex<HashMap<(StampId, u32, u32), Arc<PixelBuffer>>>,
    resizes: AtomicU64,
}

impl ResizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached resize of `image` at `target`, computing and
    /// inserting it on a miss.
    ///
    /// The resize runs outside the lock; when two workers race on the
    /// same key the first insert wins and the redundant result is
    /// dropped (idempotent, same pixels either way).
    pub fn get_or_create(
        &self,
        id: StampId,
        image: &PixelBuffer,
        target: Resolution,
    ) -> QuadreelResult<Arc<PixelBuffer>> {
        let key = (id, target.height, target.width);

        if let Some(hit) = self.lock().get(&key) {
            return Ok(hit.clone());
        }

        tracing::debug!(
            stamp = id,
            height = target.height,
            width = target.width,
            "resize cache miss"
        );
        let resized = Arc::new(resize_area(image, target)?);
        self.resizes.fetch_add(1, Ordering::Relaxed);

        Ok(self.lock().entry(key).or_insert(resized).clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of resize computations actually performed. Equals `len()`
    /// unless workers raced on a key.
    pub fn resize_count(&self) -> u64 {
        self.resizes.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(StampId, u32, u32), Arc<PixelBuffer>>> {
        // A writer can only panic before or after a complete insert, so
        // recovering from poison cannot expose a torn entry.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
