use crate::foundation::core::Resolution;
use crate::foundation::error::{QuadreelError, QuadreelResult};
use crate::raster::buffer::{CHANNELS, PixelBuffer};

/// Area-averaging resize.
///
/// Every destination pixel is the coverage-weighted mean of the source
/// rectangle it maps onto, so shrinking preserves average color; for
/// integer shrink factors the result is the exact per-block mean.
pub fn resize_area(src: &PixelBuffer, target: Resolution) -> QuadreelResult<PixelBuffer> {
    if target.height == 0 || target.width == 0 {
        return Err(QuadreelError::render(format!(
            "cannot resize to zero-area target {}x{}",
            target.height, target.width
        )));
    }

    if src.resolution() == target {
        return Ok(src.clone());
    }

    let src_h = src.height() as usize;
    let src_w = src.width() as usize;
    let y_scale = src_h as f64 / f64::from(target.height);
    let x_scale = src_w as f64 / f64::from(target.width);
    let data = src.data();

    let mut out = Vec::with_capacity(target.area() as usize * CHANNELS);
    for ty in 0..target.height {
        let y0 = f64::from(ty) * y_scale;
        let y1 = (f64::from(ty) + 1.0) * y_scale;
        let r0 = y0.floor() as usize;
        let r1 = (y1.ceil() as usize).min(src_h);

        for tx in 0..target.width {
            let x0 = f64::from(tx) * x_scale;
            let x1 = (f64::from(tx) + 1.0) * x_scale;
            let c0 = x0.floor() as usize;
            let c1 = (x1.ceil() as usize).min(src_w);

            let mut acc = [0.0f64; CHANNELS];
            let mut covered = 0.0f64;
            for r in r0..r1 {
                let wy = (y1.min(r as f64 + 1.0) - y0.max(r as f64)).max(0.0);
                if wy == 0.0 {
                    continue;
                }
                for c in c0..c1 {
                    let wx = (x1.min(c as f64 + 1.0) - x0.max(c as f64)).max(0.0);
                    let w = wy * wx;
                    if w == 0.0 {
                        continue;
                    }
                    let idx = (r * src_w + c) * CHANNELS;
                    for (a, &v) in acc.iter_mut().zip(&data[idx..idx + CHANNELS]) {
                        *a += w * f64::from(v);
                    }
                    covered += w;
                }
            }

            for a in acc {
                out.push((a / covered).round().clamp(0.0, 255.0) as u8);
            }
        }
    }

    PixelBuffer::from_rgba(target, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;

    fn res(h: u32, w: u32) -> Resolution {
        Resolution::new(h, w).unwrap()
    }

    #[test]
    fn rejects_zero_area_target() {
        let src = PixelBuffer::solid(res(2, 2), Rgba8::WHITE);
        let zero = Resolution {
            height: 0,
            width: 2,
        };
        assert!(matches!(
            resize_area(&src, zero),
            Err(QuadreelError::Render(_))
        ));
    }

    #[test]
    fn identity_resize_is_exact() {
        let bytes: Vec<u8> = (0..(2 * 3 * 4)).map(|i| i as u8).collect();
        let src = PixelBuffer::from_rgba(res(2, 3), bytes).unwrap();
        assert_eq!(resize_area(&src, res(2, 3)).unwrap(), src);
    }

    #[test]
    fn integer_downscale_is_exact_block_mean() {
        // One 2x2 block per output pixel; red channel 10/20/30/40 -> 25.
        #[rustfmt::skip]
        let bytes = vec![
            10, 0, 0, 255,  20, 0, 0, 255,  100, 0, 0, 255, 100, 0, 0, 255,
            30, 0, 0, 255,  40, 0, 0, 255,  100, 0, 0, 255, 100, 0, 0, 255,
        ];
        let src = PixelBuffer::from_rgba(res(2, 4), bytes).unwrap();
        let out = resize_area(&src, res(1, 2)).unwrap();
        assert_eq!(out.pixel(0, 0), Rgba8::from_channels([25, 0, 0, 255]));
        assert_eq!(out.pixel(0, 1), Rgba8::from_channels([100, 0, 0, 255]));
    }

    #[test]
    fn upscale_replicates_single_pixel() {
        let src = PixelBuffer::solid(res(1, 1), Rgba8::opaque(9, 8, 7));
        let out = resize_area(&src, res(2, 2)).unwrap();
        for r in 0..2 {
            for c in 0..2 {
                assert_eq!(out.pixel(r, c), Rgba8::opaque(9, 8, 7));
            }
        }
    }

    #[test]
    fn fractional_downscale_preserves_overall_mean() {
        // 3x3 ramp down to 2x2: the coverage-weighted total must equal
        // the source total (area weighting neither gains nor loses light).
        let bytes: Vec<u8> = (0..9)
            .flat_map(|i| [i * 20, 0, 0, 255])
            .collect();
        let src = PixelBuffer::from_rgba(res(3, 3), bytes).unwrap();
        let out = resize_area(&src, res(2, 2)).unwrap();

        let src_mean = src.mean_color().r as f64;
        let out_sum: f64 = (0..2)
            .flat_map(|r| (0..2).map(move |c| (r, c)))
            .map(|(r, c)| out.pixel(r, c).r as f64)
            .sum();
        assert!((out_sum / 4.0 - src_mean).abs() <= 1.0);
    }
}
