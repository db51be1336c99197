use crate::ui::connector::{ConnectorSegment, DrawOrder};
use crate::ui::sprite::SpriteId;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub pos: [f32; 2],
    pub color: [f32; 4],
}

// Two triangles per quad, corners in the order the quad stores them.
const QUAD_INDICES: [usize; 6] = [0, 1, 2, 0, 2, 3];

/// Anything drawn this frame: connector slices, guide slices and note heads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawQuad {
    pub quad: [Vec2; 4],
    pub z_order: DrawOrder,
    pub alpha: f32,
    pub sprite: SpriteId,
}

impl From<ConnectorSegment> for DrawQuad {
    fn from(seg: ConnectorSegment) -> Self {
        Self { quad: seg.quad, z_order: seg.z_order, alpha: seg.alpha, sprite: seg.sprite }
    }
}

#[derive(Debug, Default)]
pub struct DrawBatch {
    quads: Vec<DrawQuad>,
    sorted: bool,
}

impl DrawBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.quads.clear();
        self.sorted = true;
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    pub fn push(&mut self, quad: DrawQuad) {
        self.quads.push(quad);
        self.sorted = false;
    }

    pub fn extend_segments(&mut self, segments: &[ConnectorSegment]) {
        self.quads.extend(segments.iter().copied().map(DrawQuad::from));
        self.sorted = false;
    }

    /// Quads back to front. Equal z keeps submission order.
    pub fn sorted(&mut self) -> &[DrawQuad] {
        if !self.sorted {
            self.quads.sort_by(|a, b| a.z_order.cmp(&b.z_order));
            self.sorted = true;
        }
        &self.quads
    }

    /// Flattens the sorted quads into `out` (cleared first).
    pub fn write_vertices(&mut self, out: &mut Vec<MeshVertex>) {
        out.clear();
        out.reserve(self.quads.len() * QUAD_INDICES.len());
        for q in self.sorted() {
            let mut color = q.sprite.tint();
            color[3] *= q.alpha.clamp(0.0, 1.0);
            out.extend(QUAD_INDICES.iter().map(|&i| MeshVertex { pos: q.quad[i].to_array(), color }));
        }
    }
}

#[inline(always)]
pub fn vertex_bytes(vertices: &[MeshVertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::connector::draw_order;
    use crate::ui::sprite::{GuideColor, SlideKind};

    fn quad_at(layer: u8, sprite: SpriteId) -> DrawQuad {
        DrawQuad {
            quad: [Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
            z_order: draw_order(layer, 1.0, 0.0),
            alpha: 0.5,
            sprite,
        }
    }

    #[test]
    fn sorts_by_z_and_keeps_submission_order_on_ties() {
        let mut batch = DrawBatch::new();
        batch.push(quad_at(30, SpriteId::SlideConnector(SlideKind::Critical)));
        batch.push(quad_at(10, SpriteId::Guide(GuideColor::Red)));
        batch.push(quad_at(10, SpriteId::Guide(GuideColor::Blue)));
        let sprites: Vec<SpriteId> = batch.sorted().iter().map(|q| q.sprite).collect();
        assert_eq!(
            sprites,
            [
                SpriteId::Guide(GuideColor::Red),
                SpriteId::Guide(GuideColor::Blue),
                SpriteId::SlideConnector(SlideKind::Critical),
            ]
        );
    }

    #[test]
    fn each_quad_becomes_two_triangles() {
        let mut batch = DrawBatch::new();
        batch.push(quad_at(1, SpriteId::Note { critical: false, flick: false }));
        let mut verts = Vec::new();
        batch.write_vertices(&mut verts);
        assert_eq!(verts.len(), 6);
        assert_eq!(verts[0].pos, [0.0, 0.0]);
        assert_eq!(verts[2].pos, [1.0, 1.0]);
        assert_eq!(verts[5].pos, [0.0, 1.0]);
        assert!(verts.iter().all(|v| (v.color[3] - 0.5).abs() <= 1e-6), "alpha folds into color");
        assert_eq!(vertex_bytes(&verts).len(), 6 * std::mem::size_of::<MeshVertex>());
    }
}
