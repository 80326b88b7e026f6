//! Render boundary: batcher traits, the frame target stack, and render actions
//!
//! The scene core never inspects pixels. It draws through an opaque
//! [`Batcher`] surface, redirects output through a stack of
//! [`RenderTarget`]s owned by a [`FrameRenderer`], and lets ancestors wrap
//! descendant rendering with [`RenderAction`]s.

pub mod action;
pub mod actions;
pub mod batcher;
pub mod frame;

pub use action::RenderAction;
pub use actions::{BlendAction, ClipAction, LetterboxAction};
pub use batcher::{Batcher, BlendMode, Color, RenderTarget};
pub use frame::FrameRenderer;
