use crate::foundation::core::{Resolution, Rgba8};
use crate::foundation::error::{QuadreelError, QuadreelResult};

/// Channel count of every buffer inside the engine.
///
/// 3-channel input is accepted at the ingestion boundary only and gains
/// an opaque alpha channel there; everything past `from_raw` is RGBA8.
pub const CHANNELS: usize = 4;

/// Straight-alpha RGBA8 raster, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    resolution: Resolution,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Ingest raw pixel bytes with 3 or 4 channels per pixel.
    ///
    /// 3-channel input is normalized by appending a fully-opaque alpha
    /// value (255) to every pixel. Any other channel count is a channel
    /// error; a byte length that disagrees with `resolution * channels`
    /// is a validation error.
    pub fn from_raw(
        resolution: Resolution,
        channels: usize,
        bytes: Vec<u8>,
    ) -> QuadreelResult<Self> {
        if channels != 3 && channels != CHANNELS {
            return Err(QuadreelError::channel(format!(
                "expected 3 or 4 channels per pixel, got {channels}"
            )));
        }

        let expected = resolution.area() as usize * channels;
        if bytes.len() != expected {
            return Err(QuadreelError::validation(format!(
                "pixel data length {} does not match {}x{}x{channels} = {expected}",
                bytes.len(),
                resolution.height,
                resolution.width,
            )));
        }

        if channels == CHANNELS {
            return Ok(Self {
                resolution,
                data: bytes,
            });
        }

        let mut data = Vec::with_capacity(resolution.area() as usize * CHANNELS);
        for px in bytes.chunks_exact(3) {
            data.extend_from_slice(px);
            data.push(255);
        }
        Ok(Self { resolution, data })
    }

    /// Ingest bytes that are already RGBA8.
    pub fn from_rgba(resolution: Resolution, bytes: Vec<u8>) -> QuadreelResult<Self> {
        Self::from_raw(resolution, CHANNELS, bytes)
    }

    /// A uniform fill of `color`.
    pub fn solid(resolution: Resolution, color: Rgba8) -> Self {
        let px = color.channels();
        let mut data = Vec::with_capacity(resolution.area() as usize * CHANNELS);
        for _ in 0..resolution.area() {
            data.extend_from_slice(&px);
        }
        Self { resolution, data }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, row: u32, col: u32) -> Rgba8 {
        assert!(row < self.height() && col < self.width(), "pixel out of bounds");
        let idx = (row as usize * self.width() as usize + col as usize) * CHANNELS;
        Rgba8::from_channels([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    fn row(&self, row: u32) -> &[u8] {
        let stride = self.width() as usize * CHANNELS;
        let start = row as usize * stride;
        &self.data[start..start + stride]
    }

    /// Arithmetic per-channel mean over all pixels, truncated to u8.
    pub fn mean_color(&self) -> Rgba8 {
        let mut sums = [0u64; CHANNELS];
        for px in self.data.chunks_exact(CHANNELS) {
            for (s, &c) in sums.iter_mut().zip(px) {
                *s += u64::from(c);
            }
        }
        let n = self.resolution.area();
        Rgba8::from_channels([
            (sums[0] / n) as u8,
            (sums[1] / n) as u8,
            (sums[2] / n) as u8,
            (sums[3] / n) as u8,
        ])
    }

    /// True iff every pixel is bitwise-equal to the first.
    pub fn is_uniform(&self) -> bool {
        let first = &self.data[..CHANNELS];
        self.data.chunks_exact(CHANNELS).all(|px| px == first)
    }

    /// Cross-split into four quadrants `[nw, ne, sw, se]`.
    ///
    /// Odd dimensions put the larger half on the top/left: the north
    /// rows get `(h + 1) / 2` and the west columns `(w + 1) / 2`.
    /// A region under 2 pixels on either axis cannot be split.
    pub fn split4(&self) -> QuadreelResult<[Self; 4]> {
        let Resolution { height, width } = self.resolution;
        if height < 2 || width < 2 {
            return Err(QuadreelError::decomposition(format!(
                "region {height}x{width} is too small to split"
            )));
        }

        let top = height.div_ceil(2);
        let left = width.div_ceil(2);

        let quadrant = |rows: std::ops::Range<u32>, cols: std::ops::Range<u32>| {
            let res = Resolution {
                height: rows.end - rows.start,
                width: cols.end - cols.start,
            };
            let mut data = Vec::with_capacity(res.area() as usize * CHANNELS);
            for r in rows {
                let row = self.row(r);
                let start = cols.start as usize * CHANNELS;
                let end = cols.end as usize * CHANNELS;
                data.extend_from_slice(&row[start..end]);
            }
            Self {
                resolution: res,
                data,
            }
        };

        Ok([
            quadrant(0..top, 0..left),
            quadrant(0..top, left..width),
            quadrant(top..height, 0..left),
            quadrant(top..height, left..width),
        ])
    }

    /// Reassemble four quadrants produced by [`split4`](Self::split4):
    /// `nw | ne` above `sw | se`.
    pub fn concat4(nw: &Self, ne: &Self, sw: &Self, se: &Self) -> QuadreelResult<Self> {
        if nw.height() != ne.height() || sw.height() != se.height() {
            return Err(QuadreelError::render(
                "concat4 quadrant heights disagree across a row",
            ));
        }
        if nw.width() != sw.width() || ne.width() != se.width() {
            return Err(QuadreelError::render(
                "concat4 quadrant widths disagree across a column",
            ));
        }

        let resolution = Resolution {
            height: nw.height() + sw.height(),
            width: nw.width() + ne.width(),
        };
        let mut data = Vec::with_capacity(resolution.area() as usize * CHANNELS);
        for r in 0..nw.height() {
            data.extend_from_slice(nw.row(r));
            data.extend_from_slice(ne.row(r));
        }
        for r in 0..sw.height() {
            data.extend_from_slice(sw.row(r));
            data.extend_from_slice(se.row(r));
        }
        Ok(Self { resolution, data })
    }

    /// Overwrite the outermost ring of pixels with `color`.
    ///
    /// Regions smaller than 3x3 on either axis are left unmodified.
    /// Corner pixels are written twice, harmlessly.
    pub fn outline_in_place(&mut self, color: Rgba8) {
        let Resolution { height, width } = self.resolution;
        if height < 3 || width < 3 {
            return;
        }

        let px = color.channels();
        let stride = width as usize * CHANNELS;
        let last_row = (height as usize - 1) * stride;
        for c in 0..width as usize {
            self.data[c * CHANNELS..c * CHANNELS + CHANNELS].copy_from_slice(&px);
            let bottom = last_row + c * CHANNELS;
            self.data[bottom..bottom + CHANNELS].copy_from_slice(&px);
        }
        let last_col = (width as usize - 1) * CHANNELS;
        for r in 0..height as usize {
            let west = r * stride;
            self.data[west..west + CHANNELS].copy_from_slice(&px);
            let east = west + last_col;
            self.data[east..east + CHANNELS].copy_from_slice(&px);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(h: u32, w: u32) -> Resolution {
        Resolution::new(h, w).unwrap()
    }

    #[test]
    fn from_raw_appends_opaque_alpha_to_3_channel_input() {
        let buf = PixelBuffer::from_raw(res(1, 2), 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(buf.data(), &[1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn from_raw_rejects_odd_channel_counts() {
        assert!(matches!(
            PixelBuffer::from_raw(res(1, 1), 2, vec![0, 0]),
            Err(QuadreelError::Channel(_))
        ));
        assert!(matches!(
            PixelBuffer::from_raw(res(1, 1), 5, vec![0; 5]),
            Err(QuadreelError::Channel(_))
        ));
    }

    #[test]
    fn from_raw_rejects_mismatched_length() {
        assert!(matches!(
            PixelBuffer::from_raw(res(2, 2), 4, vec![0; 12]),
            Err(QuadreelError::Validation(_))
        ));
    }

    #[test]
    fn mean_color_truncates() {
        // Channel means: r = (0+3)/2 = 1.5 -> 1, g = (0+1)/2 -> 0.
        let buf =
            PixelBuffer::from_rgba(res(1, 2), vec![0, 0, 10, 255, 3, 1, 20, 255]).unwrap();
        assert_eq!(buf.mean_color(), Rgba8::from_channels([1, 0, 15, 255]));
    }

    #[test]
    fn uniformity_detects_single_off_pixel() {
        let mut bytes = vec![7u8; 4 * 9];
        assert!(PixelBuffer::from_rgba(res(3, 3), bytes.clone())
            .unwrap()
            .is_uniform());
        bytes[17] = 8;
        assert!(!PixelBuffer::from_rgba(res(3, 3), bytes).unwrap().is_uniform());
    }

    #[test]
    fn split4_odd_dims_put_larger_half_top_left() {
        let buf = PixelBuffer::solid(res(5, 3), Rgba8::BLACK);
        let [nw, ne, sw, se] = buf.split4().unwrap();
        assert_eq!(nw.resolution(), res(3, 2));
        assert_eq!(ne.resolution(), res(3, 1));
        assert_eq!(sw.resolution(), res(2, 2));
        assert_eq!(se.resolution(), res(2, 1));
    }

    #[test]
    fn split4_rejects_thin_regions() {
        assert!(PixelBuffer::solid(res(1, 4), Rgba8::BLACK).split4().is_err());
        assert!(PixelBuffer::solid(res(4, 1), Rgba8::BLACK).split4().is_err());
    }

    #[test]
    fn split_concat_roundtrip() {
        let bytes: Vec<u8> = (0..(3 * 5 * 4)).map(|i| (i % 251) as u8).collect();
        let buf = PixelBuffer::from_rgba(res(3, 5), bytes).unwrap();
        let [nw, ne, sw, se] = buf.split4().unwrap();
        let back = PixelBuffer::concat4(&nw, &ne, &sw, &se).unwrap();
        assert_eq!(back, buf);
    }

    #[test]
    fn concat4_rejects_mismatched_seams() {
        let a = PixelBuffer::solid(res(2, 2), Rgba8::BLACK);
        let b = PixelBuffer::solid(res(3, 2), Rgba8::BLACK);
        assert!(PixelBuffer::concat4(&a, &b, &a, &a).is_err());
    }

    #[test]
    fn outline_writes_ring_only() {
        let mut buf = PixelBuffer::solid(res(3, 4), Rgba8::BLACK);
        buf.outline_in_place(Rgba8::WHITE);
        for r in 0..3 {
            for c in 0..4 {
                let on_ring = r == 0 || r == 2 || c == 0 || c == 3;
                let expect = if on_ring { Rgba8::WHITE } else { Rgba8::BLACK };
                assert_eq!(buf.pixel(r, c), expect, "pixel ({r},{c})");
            }
        }
    }

    #[test]
    fn outline_skips_regions_under_3x3() {
        let mut buf = PixelBuffer::solid(res(2, 2), Rgba8::BLACK);
        let before = buf.clone();
        buf.outline_in_place(Rgba8::WHITE);
        assert_eq!(buf, before);
    }
}
