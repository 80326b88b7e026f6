//! Retained-mode scene graph
//!
//! The tree is walked every frame for update and render while game logic
//! freely requests structural changes from inside the walk; the staged
//! containers defer those mutations until the walk finishes. See
//! [`graph::Scene`] for the frame protocol.

pub mod component;
pub mod graph;
pub mod identity;
pub mod node;
pub mod staged;
pub mod transform;

pub use component::{Component, ComponentId, ComponentRef, ComponentState};
pub use graph::{NodeId, Scene};
pub use identity::{Guid, ObjectIdentity, TagSet};
pub use node::{ActivityFlags, Node};
pub use staged::{ModifyAction, StageHooks, StagedList};
pub use transform::NodeTransform;
