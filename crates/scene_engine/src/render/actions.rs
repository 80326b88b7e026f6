//! Built-in render actions
//!
//! Small concrete wrappers covering the common cases: blend-mode scoping,
//! offscreen clipping, and letterbox scale-to-fit.

use crate::foundation::math::{Mat3, Vec2};
use crate::render::action::RenderAction;
use crate::render::batcher::{BlendMode, Color, RenderTarget};
use crate::render::frame::FrameRenderer;

/// Sets a blend mode for the node's subtree and restores the previous one after
pub struct BlendAction {
    mode: BlendMode,
    previous: BlendMode,
}

impl BlendAction {
    /// Create a blend action for the given mode
    pub fn new(mode: BlendMode) -> Self {
        Self {
            mode,
            previous: BlendMode::default(),
        }
    }
}

impl RenderAction for BlendAction {
    fn pre_render(&mut self, frame: &mut FrameRenderer) {
        self.previous = frame.current().set_blend(self.mode);
    }

    fn post_render(&mut self, frame: &mut FrameRenderer) {
        frame.current().set_blend(self.previous);
    }
}

/// Redirects the subtree into an owned offscreen target and composites it back
///
/// The target is pushed in `pre_render` and recovered by the paired
/// `post_render`; between the two the action temporarily gives up ownership
/// to the frame's target stack.
pub struct ClipAction {
    target: Option<Box<dyn RenderTarget>>,
    clear_color: Color,
}

impl ClipAction {
    /// Create a clip action around an offscreen target
    pub fn new(target: Box<dyn RenderTarget>, clear_color: Color) -> Self {
        Self {
            target: Some(target),
            clear_color,
        }
    }
}

impl RenderAction for ClipAction {
    fn pre_render(&mut self, frame: &mut FrameRenderer) {
        match self.target.take() {
            Some(mut target) => {
                target.clear(self.clear_color);
                frame.push_target(target);
            }
            // the target is already on the stack: unbalanced bracketing
            None => log::warn!("clip action re-entered without a matching post_render"),
        }
    }

    fn post_render(&mut self, frame: &mut FrameRenderer) {
        if let Some(mut target) = frame.pop_target() {
            target.present(frame.current());
            self.target = Some(target);
        }
    }
}

/// Scales a fixed design resolution to fit the current window, centered
///
/// Contributes a position offset only; it never redirects rendering. Update
/// the window size from the application when it changes.
pub struct LetterboxAction {
    design_size: Vec2,
    window_size: Vec2,
}

impl LetterboxAction {
    /// Create a letterbox mapping `design_size` into `window_size`
    pub fn new(design_size: Vec2, window_size: Vec2) -> Self {
        Self {
            design_size,
            window_size,
        }
    }

    /// Update the window size the design resolution is fitted into
    pub fn set_window_size(&mut self, window_size: Vec2) {
        self.window_size = window_size;
    }

    fn fit_scale(&self) -> f32 {
        if self.design_size.x <= 0.0 || self.design_size.y <= 0.0 {
            return 1.0;
        }
        (self.window_size.x / self.design_size.x).min(self.window_size.y / self.design_size.y)
    }
}

impl RenderAction for LetterboxAction {
    fn position_offset(&self) -> Option<Mat3> {
        let scale = self.fit_scale();
        let bar = (self.window_size - self.design_size * scale) * 0.5;
        Some(Mat3::new(
            scale, 0.0, bar.x,
            0.0, scale, bar.y,
            0.0, 0.0, 1.0,
        ))
    }
}
