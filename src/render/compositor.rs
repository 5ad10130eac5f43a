use crate::foundation::core::Rgba8;
use crate::foundation::error::QuadreelResult;
use crate::raster::buffer::PixelBuffer;
use crate::render::cache::{ResizeCache, Stamp};
use crate::tree::QuadNode;

/// A mean color counts as near-white when every color channel (alpha
/// excluded) reaches this value, inclusive.
pub const NEAR_WHITE_THRESHOLD: u8 = 100;

/// How terminal regions that are not near-white get filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RenderMode {
    /// Flat fill with the region's mean color.
    Plain,
    /// Flat fill with a 1px border in the given color. Regions under
    /// 3x3 are filled without the border.
    Outlined(Rgba8),
}

pub fn is_near_white(color: Rgba8) -> bool {
    color.r >= NEAR_WHITE_THRESHOLD
        && color.g >= NEAR_WHITE_THRESHOLD
        && color.b >= NEAR_WHITE_THRESHOLD
}

/// Recompose an output buffer from a quadtree.
///
/// Recursion stops at leaves or at `render_level`, whichever comes
/// first; a `render_level` deeper than the built tree is a no-op. At a
/// terminal region, a near-white mean selects stamp substitution (when
/// a stamp is supplied) or a pure white block; anything else becomes a
/// mean-color fill per `mode`. Substitution takes precedence over
/// `mode`. The output always matches the node's region exactly.
pub fn render_node(
    node: &QuadNode,
    render_level: u32,
    stamp: Option<&Stamp>,
    mode: RenderMode,
    cache: &ResizeCache,
) -> QuadreelResult<PixelBuffer> {
    if node.level() == render_level {
        return render_terminal(node, stamp, mode, cache);
    }
    let Some([nw, ne, sw, se]) = node.children() else {
        return render_terminal(node, stamp, mode, cache);
    };

    let nw = render_node(nw, render_level, stamp, mode, cache)?;
    let ne = render_node(ne, render_level, stamp, mode, cache)?;
    let sw = render_node(sw, render_level, stamp, mode, cache)?;
    let se = render_node(se, render_level, stamp, mode, cache)?;
    PixelBuffer::concat4(&nw, &ne, &sw, &se)
}

fn render_terminal(
    node: &QuadNode,
    stamp: Option<&Stamp>,
    mode: RenderMode,
    cache: &ResizeCache,
) -> QuadreelResult<PixelBuffer> {
    let region = node.region();

    if is_near_white(node.mean_color()) {
        return match stamp {
            None => Ok(PixelBuffer::solid(region, Rgba8::WHITE)),
            Some(stamp) => cache
                .get_or_create(stamp.id, &stamp.image, region)
                .map(|resized| resized.as_ref().clone()),
        };
    }

    let mut block = PixelBuffer::solid(region, node.mean_color());
    if let RenderMode::Outlined(color) = mode {
        block.outline_in_place(color);
    }
    Ok(block)
}
