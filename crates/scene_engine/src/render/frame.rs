//! Per-frame render target stack
//!
//! The active render target is tracked as a stack: the base batcher supplied
//! by the application sits at depth zero, and render actions that redirect
//! rendering push offscreen targets above it. Popping at the base is a
//! guarded no-op so an unbalanced action cannot underflow the stack and
//! crash the frame.

use crate::render::batcher::{Batcher, RenderTarget};

/// Stack of render targets with the application's base batcher at the bottom
pub struct FrameRenderer {
    base: Box<dyn Batcher>,
    targets: Vec<Box<dyn RenderTarget>>,
}

impl FrameRenderer {
    /// Create a frame renderer over the application's base batcher
    pub fn new(base: Box<dyn Batcher>) -> Self {
        Self {
            base,
            targets: Vec::new(),
        }
    }

    /// The batcher all drawing currently goes to
    pub fn current(&mut self) -> &mut dyn Batcher {
        match self.targets.last_mut() {
            Some(target) => target.as_mut() as &mut dyn Batcher,
            None => self.base.as_mut(),
        }
    }

    /// Redirect subsequent drawing into an offscreen target
    pub fn push_target(&mut self, target: Box<dyn RenderTarget>) {
        self.targets.push(target);
    }

    /// Stop drawing into the top target and hand it back to its owner
    ///
    /// Returns `None` when only the base batcher remains; popping below the
    /// base is a logged no-op, never an underflow.
    pub fn pop_target(&mut self) -> Option<Box<dyn RenderTarget>> {
        if self.targets.is_empty() {
            log::warn!("pop_target ignored: already at the base batcher");
            return None;
        }
        self.targets.pop()
    }

    /// Number of redirect targets above the base
    pub fn depth(&self) -> usize {
        self.targets.len()
    }

    /// Tear down the stack and recover the base batcher
    ///
    /// Any targets still on the stack are dropped; a warning is logged since
    /// that means some action pushed without a matching pop.
    pub fn into_base(mut self) -> Box<dyn Batcher> {
        if !self.targets.is_empty() {
            log::warn!(
                "frame ended with {} unpopped render target(s)",
                self.targets.len()
            );
            self.targets.clear();
        }
        self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec2;
    use crate::render::batcher::test_support::{DrawEvent, RecordingBatcher};
    use crate::render::batcher::Color;

    #[test]
    fn drawing_goes_to_the_top_target() {
        let base = RecordingBatcher::new();
        let base_log = base.log.clone();
        let mut frame = FrameRenderer::new(Box::new(base));

        frame.current().draw_rect(Vec2::new(2.0, 2.0), Color::WHITE);

        let target = RecordingBatcher::new();
        let target_log = target.log.clone();
        frame.push_target(Box::new(target));
        frame.current().draw_rect(Vec2::new(3.0, 3.0), Color::BLACK);
        frame.pop_target();

        assert_eq!(base_log.borrow().len(), 1);
        assert_eq!(target_log.borrow().len(), 1);
        assert!(matches!(
            target_log.borrow()[0],
            DrawEvent::Rect { size, .. } if size.x == 3.0
        ));
    }

    #[test]
    fn pop_below_base_is_a_noop() {
        let mut frame = FrameRenderer::new(Box::new(RecordingBatcher::new()));
        assert!(frame.pop_target().is_none());
        assert!(frame.pop_target().is_none());
        assert_eq!(frame.depth(), 0);
    }

    #[test]
    fn into_base_recovers_the_batcher() {
        let base = RecordingBatcher::new();
        let log = base.log.clone();
        let mut frame = FrameRenderer::new(Box::new(base));
        frame.push_target(Box::new(RecordingBatcher::new()));

        let mut recovered = frame.into_base();
        recovered.draw_rect(Vec2::new(1.0, 1.0), Color::WHITE);
        assert_eq!(log.borrow().len(), 1);
    }
}
