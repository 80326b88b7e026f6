//! Component trait and per-component state
//!
//! A component is a behavior unit owned by exactly one node. Behaviors are
//! trait objects stored in the scene's component arena; lifecycle hooks
//! receive `&mut Scene` so they can queue structural mutations re-entrantly
//! (the requests are staged, never applied mid-walk).

use std::any::Any;

use crate::render::FrameRenderer;
use crate::scene::graph::{NodeId, Scene};
use crate::scene::identity::ObjectIdentity;

slotmap::new_key_type! {
    /// Stable handle to a component in the scene arena
    pub struct ComponentId;
}

/// Handle pair identifying a component and its owning node during a hook call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentRef {
    /// The component the hook is running for
    pub component: ComponentId,
    /// The node that owns it (null key if detached)
    pub owner: NodeId,
}

/// Behavior unit attached to a node
///
/// All hooks have empty default bodies; implement only what the behavior
/// needs. `on_first_entered` fires exactly once per component lifetime, even
/// if the owning node re-enters the tree multiple times, and always before
/// the regular `on_entered` for that entry.
pub trait Component: Any {
    /// Called when the component is inserted into a node's container
    fn on_added(&mut self, scene: &mut Scene, this: ComponentRef) {
        let _ = (scene, this);
    }

    /// Called once, on the component's first tree entry, before [`Component::on_entered`]
    fn on_first_entered(&mut self, scene: &mut Scene, this: ComponentRef) {
        let _ = (scene, this);
    }

    /// Called every time the owning node enters the tree
    fn on_entered(&mut self, scene: &mut Scene, this: ComponentRef) {
        let _ = (scene, this);
    }

    /// Called every time the owning node exits the tree
    fn on_exited(&mut self, scene: &mut Scene, this: ComponentRef) {
        let _ = (scene, this);
    }

    /// Called when the component is removed from its owner, just before it is dropped
    fn on_removed(&mut self, scene: &mut Scene, this: ComponentRef) {
        let _ = (scene, this);
    }

    /// Per-frame update, in container order
    fn update(&mut self, scene: &mut Scene, this: ComponentRef, delta_time: f32) {
        let _ = (scene, this, delta_time);
    }

    /// Per-frame render into the current batcher
    fn render(&self, scene: &Scene, this: ComponentRef, frame: &mut FrameRenderer) {
        let _ = (scene, this, frame);
    }

    /// Downcast support for typed component searches
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Bookkeeping shared by every component regardless of behavior
#[derive(Debug)]
pub struct ComponentState {
    pub(crate) owner: NodeId,
    pub(crate) identity: ObjectIdentity,
    pub(crate) active: bool,
    pub(crate) visible: bool,
    pub(crate) in_tree: bool,
    pub(crate) entered_tree_once: bool,
}

impl ComponentState {
    pub(crate) fn new(identity: ObjectIdentity) -> Self {
        Self {
            owner: NodeId::default(),
            identity,
            active: true,
            visible: true,
            in_tree: false,
            entered_tree_once: false,
        }
    }

    /// The owning node (null key while the component is detached or pending)
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// The component's identity
    pub fn identity(&self) -> &ObjectIdentity {
        &self.identity
    }

    /// Whether the component receives update calls
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the component receives render calls
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the owning node is currently in the tree
    pub fn is_in_tree(&self) -> bool {
        self.in_tree
    }

    /// Whether the component has ever entered the tree
    pub fn has_entered_tree(&self) -> bool {
        self.entered_tree_once
    }
}

/// Arena slot pairing state with the behavior box
///
/// The behavior is held in an `Option` so it can be taken out of the slot
/// while one of its own hooks runs against `&mut Scene`; if the component is
/// destroyed during the hook, the put-back notices and drops the box.
pub(crate) struct ComponentSlot {
    pub(crate) state: ComponentState,
    pub(crate) behavior: Option<Box<dyn Component>>,
}

impl ComponentSlot {
    pub(crate) fn new(identity: ObjectIdentity, behavior: Box<dyn Component>) -> Self {
        Self {
            state: ComponentState::new(identity),
            behavior: Some(behavior),
        }
    }
}
