//! Scene node (actor) data
//!
//! A node owns a staged container of child nodes, a staged container of
//! components, a render-action list, and a cached transform. The parent link
//! is a plain arena key: the slotmap null key is the "invalid root" sentinel,
//! so traversal code never null-checks an `Option`.

use crate::foundation::math::Mat3;
use crate::render::RenderAction;
use crate::scene::component::ComponentId;
use crate::scene::graph::NodeId;
use crate::scene::identity::ObjectIdentity;
use crate::scene::staged::StagedList;
use crate::scene::transform::NodeTransform;

/// Local and derived ticking/visibility toggles
///
/// The four `children_*`/`components_*` flags are local and writable; the
/// two `parent_*` flags are derived, recomputed top-down whenever a parent's
/// effective state changes. Effective state is always
/// `local && parent_effective`, pushed down on change and never polled
/// bottom-up, so per-frame queries stay O(1) under deep trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityFlags {
    /// Whether this node's components receive update calls
    pub components_ticking: bool,
    /// Whether this node's children are walked during update
    pub children_ticking: bool,
    /// Whether this node's components receive render calls
    pub components_visible: bool,
    /// Whether this node's children are walked during render
    pub children_visible: bool,
    /// Derived: whether the parent chain lets this node tick at all
    pub(crate) parent_ticking: bool,
    /// Derived: whether the parent chain lets this node render at all
    pub(crate) parent_visible: bool,
}

impl Default for ActivityFlags {
    fn default() -> Self {
        Self {
            components_ticking: true,
            children_ticking: true,
            components_visible: true,
            children_visible: true,
            parent_ticking: true,
            parent_visible: true,
        }
    }
}

impl ActivityFlags {
    /// Derived: whether this node is effectively ticked this frame
    pub fn effectively_ticking(&self) -> bool {
        self.parent_ticking
    }

    /// Derived: whether this node is effectively rendered this frame
    pub fn effectively_visible(&self) -> bool {
        self.parent_visible
    }

    /// Effective ticking handed down to children
    pub(crate) fn child_ticking(&self) -> bool {
        self.children_ticking && self.parent_ticking
    }

    /// Effective visibility handed down to children
    pub(crate) fn child_visible(&self) -> bool {
        self.children_visible && self.parent_visible
    }
}

/// A tree element owning children, components, a transform, and render actions
///
/// Lifecycle: constructed detached (parent is the null sentinel), becomes
/// attached when inserted into another node's container, in-tree when its
/// subtree root is reachable from the scene root, and finally invalidated,
/// a terminal state processed at end of tick.
pub struct Node {
    pub(crate) identity: ObjectIdentity,
    pub(crate) parent: NodeId,
    pub(crate) children: StagedList<NodeId>,
    pub(crate) components: StagedList<ComponentId>,
    pub(crate) actions: Vec<Box<dyn RenderAction>>,
    pub(crate) transform: NodeTransform,
    pub(crate) flags: ActivityFlags,
    pub(crate) in_tree: bool,
    pub(crate) entered_tree_once: bool,
    pub(crate) invalidated: bool,
    pub(crate) display_matrix: Mat3,
}

impl Node {
    pub(crate) fn new(identity: ObjectIdentity) -> Self {
        Self {
            identity,
            parent: NodeId::default(),
            children: StagedList::new(),
            components: StagedList::new(),
            actions: Vec::new(),
            transform: NodeTransform::new(),
            flags: ActivityFlags::default(),
            in_tree: false,
            entered_tree_once: false,
            invalidated: false,
            display_matrix: Mat3::identity(),
        }
    }

    /// The node's identity
    pub fn identity(&self) -> &ObjectIdentity {
        &self.identity
    }

    /// The parent handle; the null key means detached (or the scene root)
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// The live child list, in update/draw order
    pub fn children(&self) -> &[NodeId] {
        self.children.as_slice()
    }

    /// The live component list, in update/draw order
    pub fn components(&self) -> &[ComponentId] {
        self.components.as_slice()
    }

    /// Number of render actions attached to this node
    pub fn render_action_count(&self) -> usize {
        self.actions.len()
    }

    /// The node's transform cache (read-only; writes go through the scene)
    pub fn transform(&self) -> &NodeTransform {
        &self.transform
    }

    /// The local and derived activity flags
    pub fn flags(&self) -> &ActivityFlags {
        &self.flags
    }

    /// Whether the node is currently reachable from the scene root
    pub fn is_in_tree(&self) -> bool {
        self.in_tree
    }

    /// Whether the node has ever been in the tree
    pub fn has_entered_tree(&self) -> bool {
        self.entered_tree_once
    }

    /// Whether the node has been marked for teardown (irreversible)
    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// The display matrix cached by the last render pass
    ///
    /// Composes the parent's display matrix, render-action position offsets,
    /// and the local matrix. Recomputed every render pass, never across
    /// frames, since action state (like window size) changes independently of
    /// the logical transform.
    pub fn display_matrix(&self) -> Mat3 {
        self.display_matrix
    }
}
