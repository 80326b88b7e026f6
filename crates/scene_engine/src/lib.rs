//! # Scene Engine
//!
//! A retained-mode 2D scene graph with deferred structural mutation.
//!
//! ## Features
//!
//! - **Deferred mutation**: add, remove, and reparent nodes from inside the
//!   per-frame walk; changes are staged and applied atomically between ticks
//! - **Cascading activity state**: effective ticking and visibility are
//!   pushed down the tree on change, never polled bottom-up
//! - **Lazy transform cache**: world matrices are memoized behind a dirty
//!   flag that propagates eagerly to descendants on write
//! - **Render actions**: ancestors wrap descendant rendering with scoped
//!   clip/blend/offset brackets over an opaque batcher surface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! struct Spinner;
//!
//! impl Component for Spinner {
//!     fn update(&mut self, scene: &mut Scene, this: ComponentRef, dt: f32) {
//!         let angle = scene.node(this.owner).unwrap().transform().rotation();
//!         scene.set_local_rotation(this.owner, angle + dt);
//!     }
//!
//!     fn as_any(&self) -> &dyn std::any::Any {
//!         self
//!     }
//!
//!     fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
//!         self
//!     }
//! }
//!
//! let mut scene = Scene::new();
//! let node = scene.create_node_named("spinner");
//! scene.add_child(scene.root(), node);
//! scene.add_component(node, Spinner);
//! scene.flush();
//! scene.update(1.0 / 60.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod application;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for applications using the engine
pub mod prelude {
    pub use crate::application::{AppError, Application, Runner};
    pub use crate::core::config::SceneConfig;
    pub use crate::foundation::math::{Mat3, Transform2D, Vec2};
    pub use crate::render::{
        Batcher, BlendAction, BlendMode, ClipAction, Color, FrameRenderer, LetterboxAction,
        RenderAction, RenderTarget,
    };
    pub use crate::scene::{
        Component, ComponentId, ComponentRef, Guid, Node, NodeId, ObjectIdentity, Scene, TagSet,
    };
}
