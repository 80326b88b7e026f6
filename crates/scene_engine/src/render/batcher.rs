//! Opaque rendering backend surface
//!
//! The scene graph draws through these traits and nothing else; swapping the
//! GPU backend means implementing [`Batcher`] and [`RenderTarget`] for it.

use crate::foundation::math::{Mat3, Vec2};

/// RGBA color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red component
    pub r: f32,
    /// Green component
    pub g: f32,
    /// Blue component
    pub b: f32,
    /// Alpha component
    pub a: f32,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Fully transparent
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from RGBA components
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Blend mode for subsequent draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Standard premultiplied alpha blending
    #[default]
    Alpha,
    /// Additive blending
    Additive,
    /// Multiplicative blending
    Multiply,
    /// No blending
    Opaque,
}

/// Draw surface consumed by the scene graph
///
/// The batcher keeps its own matrix stack; the graph pushes a node's matrix
/// before rendering the node's components and children and pops afterward.
pub trait Batcher {
    /// Push a transform onto the matrix stack
    fn push_matrix(&mut self, matrix: Mat3);

    /// Pop the most recent transform
    fn pop_matrix(&mut self);

    /// Draw an axis-aligned rectangle of the given size at the current transform
    fn draw_rect(&mut self, size: Vec2, color: Color);

    /// Set the blend mode, returning the previous one
    fn set_blend(&mut self, mode: BlendMode) -> BlendMode;
}

/// An offscreen target that can be drawn into and composited back
///
/// Render actions that redirect rendering (clipping, letterboxing) push one
/// of these onto the frame's target stack in `pre_render` and composite it
/// into the surface below in the paired `post_render`.
pub trait RenderTarget: Batcher {
    /// Clear the target to a solid color
    fn clear(&mut self, color: Color);

    /// Composite this target's contents into another batcher
    fn present(&mut self, into: &mut dyn Batcher);
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Recording doubles shared by the render and scene tests

    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// One recorded batcher call
    #[derive(Debug, Clone, PartialEq)]
    pub enum DrawEvent {
        Push(Mat3),
        Pop,
        Rect { size: Vec2, color: Color },
        Blend(BlendMode),
        Clear(Color),
        Present,
    }

    /// Batcher that records every call into a shared log
    pub struct RecordingBatcher {
        pub log: Rc<RefCell<Vec<DrawEvent>>>,
        pub blend: BlendMode,
    }

    impl RecordingBatcher {
        pub fn new() -> Self {
            Self {
                log: Rc::new(RefCell::new(Vec::new())),
                blend: BlendMode::default(),
            }
        }
    }

    impl Batcher for RecordingBatcher {
        fn push_matrix(&mut self, matrix: Mat3) {
            self.log.borrow_mut().push(DrawEvent::Push(matrix));
        }

        fn pop_matrix(&mut self) {
            self.log.borrow_mut().push(DrawEvent::Pop);
        }

        fn draw_rect(&mut self, size: Vec2, color: Color) {
            self.log.borrow_mut().push(DrawEvent::Rect { size, color });
        }

        fn set_blend(&mut self, mode: BlendMode) -> BlendMode {
            self.log.borrow_mut().push(DrawEvent::Blend(mode));
            std::mem::replace(&mut self.blend, mode)
        }
    }

    impl RenderTarget for RecordingBatcher {
        fn clear(&mut self, color: Color) {
            self.log.borrow_mut().push(DrawEvent::Clear(color));
        }

        fn present(&mut self, into: &mut dyn Batcher) {
            self.log.borrow_mut().push(DrawEvent::Present);
            // the composite shows up in the destination log as a unit rect
            into.draw_rect(Vec2::new(1.0, 1.0), Color::WHITE);
        }
    }
}
