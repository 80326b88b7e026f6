//! Lazily-cached hierarchical node transforms
//!
//! Each node carries a [`NodeTransform`]: the local position/rotation/scale
//! plus memoized local and world matrices guarded by a single dirty bit.
//! Writes are eager about invalidation: setting any local component marks
//! the node *and every descendant* dirty at the moment of the change, so a
//! read never has to re-walk its ancestor chain to detect staleness. The
//! cost model is O(subtree) per write, O(1) amortized per read.
//!
//! The world matrix itself is recomputed lazily on first read after a write:
//! because a dirty parent always implies a dirty child, composing the local
//! matrix with the parent's (possibly just-recomputed) world matrix is
//! sufficient; there is no need to walk to the root.

use crate::foundation::math::{Mat3, Transform2D, Vec2};

/// Per-node local transform with memoized local and world matrices
#[derive(Debug, Clone)]
pub struct NodeTransform {
    local: Transform2D,
    local_matrix: Mat3,
    world_matrix: Mat3,
    dirty: bool,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTransform {
    /// Create an identity transform, initially dirty
    pub fn new() -> Self {
        Self {
            local: Transform2D::identity(),
            local_matrix: Mat3::identity(),
            world_matrix: Mat3::identity(),
            dirty: true,
        }
    }

    /// Local position in the parent's space
    pub fn position(&self) -> Vec2 {
        self.local.position
    }

    /// Local rotation in radians
    pub fn rotation(&self) -> f32 {
        self.local.rotation
    }

    /// Local scale factors
    pub fn scale(&self) -> Vec2 {
        self.local.scale
    }

    /// The full local transform
    pub fn local(&self) -> Transform2D {
        self.local
    }

    /// Whether the cached matrices are stale
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The cached world matrix
    ///
    /// Only meaningful when the dirty bit is clear; [`crate::scene::Scene::world_matrix`]
    /// refreshes before reading.
    pub fn cached_world(&self) -> Mat3 {
        self.world_matrix
    }

    /// The cached local matrix; same staleness caveat as [`Self::cached_world`]
    pub fn cached_local(&self) -> Mat3 {
        self.local_matrix
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.local.position = position;
        self.dirty = true;
    }

    pub(crate) fn set_rotation(&mut self, rotation: f32) {
        self.local.rotation = rotation;
        self.dirty = true;
    }

    pub(crate) fn set_scale(&mut self, scale: Vec2) {
        self.local.scale = scale;
        self.dirty = true;
    }

    pub(crate) fn set_local(&mut self, local: Transform2D) {
        self.local = local;
        self.dirty = true;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Recompute both cached matrices from the local transform and the
    /// parent's world matrix, clearing the dirty bit
    pub(crate) fn refresh(&mut self, parent_world: &Mat3) {
        self.local_matrix = self.local.to_matrix();
        self.world_matrix = parent_world * self.local_matrix;
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::foundation::math::transform_point;

    #[test]
    fn refresh_composes_with_parent() {
        let mut parent = NodeTransform::new();
        let mut child = NodeTransform::new();
        parent.set_position(Vec2::new(0.0, 5.0));
        child.set_position(Vec2::new(10.0, 0.0));

        parent.refresh(&Mat3::identity());
        child.refresh(&parent.cached_world());

        let p = transform_point(&child.cached_world(), Vec2::zeros());
        assert_relative_eq!(p.x, 10.0);
        assert_relative_eq!(p.y, 5.0);
        assert!(!child.is_dirty());
    }

    #[test]
    fn writes_set_the_dirty_bit() {
        let mut t = NodeTransform::new();
        t.refresh(&Mat3::identity());
        assert!(!t.is_dirty());

        t.set_rotation(1.0);
        assert!(t.is_dirty());
    }
}
