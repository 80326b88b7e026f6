//! Render action trait
//!
//! A node's render actions form an ordered list of scoped wrappers around the
//! node's component and child rendering. `pre_render` hooks run in list order
//! before descendants render; `post_render` hooks run in reverse list order
//! after. The nested-scope bracketing lets a clip action push an offscreen
//! target in `pre_render` and composite it back in `post_render`.

use crate::foundation::math::Mat3;
use crate::render::frame::FrameRenderer;

/// Scoped wrapper bracketing a node's descendant rendering
pub trait RenderAction {
    /// Runs before the node's components and children render
    fn pre_render(&mut self, frame: &mut FrameRenderer) {
        let _ = frame;
    }

    /// Runs after the node's components and children render, in reverse list order
    fn post_render(&mut self, frame: &mut FrameRenderer) {
        let _ = frame;
    }

    /// Optional matrix contributed to the node's display-transform composition
    fn position_offset(&self) -> Option<Mat3> {
        None
    }
}
