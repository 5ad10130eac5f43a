use crate::foundation::core::{Resolution, Rgba8};
use crate::foundation::error::QuadreelResult;
use crate::raster::buffer::PixelBuffer;

/// One node of a region quadtree over a pixel buffer.
///
/// Every node carries its mean color so that tree descent can stop at
/// any level and still produce a meaningful fill. Children, when
/// present, partition the node's region exactly with a cross-split in
/// `[nw, ne, sw, se]` order.
#[derive(Clone, Debug)]
pub struct QuadNode {
    level: u32,
    region: Resolution,
    mean: Rgba8,
    children: Option<Box<[QuadNode; 4]>>,
}

impl QuadNode {
    /// Decompose `buffer` into a quadtree with the root at level 0.
    ///
    /// Recursion stops at `limit`, on a pixel-uniform region, or on a
    /// region thinner than 2 pixels on either axis (such a region
    /// becomes a leaf even when `level < limit`).
    pub fn build(buffer: &PixelBuffer, limit: u32) -> QuadreelResult<Self> {
        Self::build_at(buffer, limit, 0)
    }

    fn build_at(buffer: &PixelBuffer, limit: u32, level: u32) -> QuadreelResult<Self> {
        let region = buffer.resolution();
        let mean = buffer.mean_color();

        let splittable = region.height >= 2 && region.width >= 2;
        let children = if level < limit && splittable && !buffer.is_uniform() {
            let [nw, ne, sw, se] = buffer.split4()?;
            Some(Box::new([
                Self::build_at(&nw, limit, level + 1)?,
                Self::build_at(&ne, limit, level + 1)?,
                Self::build_at(&sw, limit, level + 1)?,
                Self::build_at(&se, limit, level + 1)?,
            ]))
        } else {
            None
        };

        Ok(Self {
            level,
            region,
            mean,
            children,
        })
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn region(&self) -> Resolution {
        self.region
    }

    pub fn mean_color(&self) -> Rgba8 {
        self.mean
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Children in `[nw, ne, sw, se]` order, when this is not a leaf.
    pub fn children(&self) -> Option<&[QuadNode; 4]> {
        self.children.as_deref()
    }

    /// Deepest level present in this subtree.
    pub fn max_level(&self) -> u32 {
        match &self.children {
            None => self.level,
            Some(kids) => kids.iter().map(Self::max_level).max().unwrap_or(self.level),
        }
    }

    /// Total node count of this subtree, the root included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flat_map(|kids| kids.iter())
            .map(Self::node_count)
            .sum::<usize>()
    }
}
