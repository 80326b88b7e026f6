//! Scene: the arena-owning context and per-frame traversal driver
//!
//! The scene owns every node and component in generational arenas and drives
//! the per-frame walk: `update` then `render`, both plain recursive
//! traversals, then `apply_changes` to drain every container's mutation
//! queue, then `process_invalidations` to tear down nodes marked for removal.
//!
//! Concurrency here means re-entrant structural mutation during a
//! single-threaded walk, nothing more: any mutation requested while a walk is
//! in progress lands in a container's pending queue and becomes visible at
//! the next drain. Structural violations (cycles, missing members, operating
//! on destroyed handles) are logged no-ops; graph bookkeeping must never
//! crash a running frame.

use std::collections::VecDeque;

use slotmap::{Key, SlotMap};

use crate::core::config::SceneConfig;
use crate::foundation::math::{
    invert_or_identity, translation_of, Mat3, Transform2D, Vec2,
};
use crate::render::{FrameRenderer, RenderAction};
use crate::scene::component::{
    Component, ComponentId, ComponentRef, ComponentSlot, ComponentState,
};
use crate::scene::identity::{Guid, ObjectIdentity, TagSet};
use crate::scene::node::Node;
use crate::scene::staged::StageHooks;

slotmap::new_key_type! {
    /// Stable handle to a node in the scene arena
    ///
    /// The null key doubles as the "invalid root" parent sentinel.
    pub struct NodeId;
}

/// A queued request to tear a node down at the end of the current tick
#[derive(Debug, Clone, Copy)]
struct InvalidateRequest {
    node: NodeId,
    children: bool,
    components: bool,
}

/// The scene graph: node and component arenas plus the frame driver
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
    components: SlotMap<ComponentId, ComponentSlot>,
    root: NodeId,
    next_guid: u64,
    /// Non-zero while an update or render walk is on the stack
    lock_depth: u32,
    /// True while `apply_changes` is draining queues
    applying: bool,
    invalidations: VecDeque<InvalidateRequest>,
    config: SceneConfig,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create a scene with default configuration
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Create a scene with custom configuration
    pub fn with_config(config: SceneConfig) -> Self {
        let mut nodes = SlotMap::with_capacity_and_key(config.node_capacity);
        let mut root_node = Node::new(ObjectIdentity::named(Guid(0), "root"));
        root_node.in_tree = true;
        root_node.entered_tree_once = true;
        let root = nodes.insert(root_node);

        Self {
            nodes,
            components: SlotMap::with_capacity_and_key(config.component_capacity),
            root,
            next_guid: 1,
            lock_depth: 0,
            applying: false,
            invalidations: VecDeque::new(),
            config,
        }
    }

    /// The root node; always in the tree, never invalidated
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, the root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Read access to a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Read access to a component's shared state
    pub fn component_state(&self, id: ComponentId) -> Option<&ComponentState> {
        self.components.get(id).map(|slot| &slot.state)
    }

    /// Downcast read access to a component's behavior
    pub fn component<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.components
            .get(id)?
            .behavior
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Downcast write access to a component's behavior
    pub fn component_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.components
            .get_mut(id)?
            .behavior
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    fn alloc_guid(&mut self) -> Guid {
        let guid = Guid(self.next_guid);
        self.next_guid += 1;
        guid
    }

    fn structural_violation(&self, message: &str) {
        if self.config.strict_structure {
            log::error!("{message}");
        } else {
            log::warn!("{message}");
        }
    }

    // ------------------------------------------------------------------
    // Construction and queued structural mutation
    // ------------------------------------------------------------------

    /// Create a detached node
    pub fn create_node(&mut self) -> NodeId {
        let guid = self.alloc_guid();
        self.nodes.insert(Node::new(ObjectIdentity::new(guid)))
    }

    /// Create a detached node with a name
    pub fn create_node_named(&mut self, name: impl Into<String>) -> NodeId {
        let guid = self.alloc_guid();
        self.nodes.insert(Node::new(ObjectIdentity::named(guid, name)))
    }

    /// Set or clear a node's name
    pub fn set_node_name(&mut self, id: NodeId, name: Option<String>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.identity.set_name(name);
        }
    }

    /// Replace a node's tag set
    pub fn set_node_tags(&mut self, id: NodeId, tags: TagSet) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.identity.set_tags(tags);
        }
    }

    /// Queue appending `child` to `parent`'s children
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        match self.nodes.get_mut(parent) {
            Some(node) => node.children.queue_add(child),
            None => self.structural_violation("add_child ignored: unknown parent node"),
        }
    }

    /// Queue inserting `child` at the front of `parent`'s children
    pub fn add_child_at_top(&mut self, parent: NodeId, child: NodeId) {
        match self.nodes.get_mut(parent) {
            Some(node) => node.children.queue_add_at_top(child),
            None => self.structural_violation("add_child_at_top ignored: unknown parent node"),
        }
    }

    /// Queue inserting `child` at a signed offset from `anchor`
    pub fn add_child_relative(
        &mut self,
        parent: NodeId,
        child: NodeId,
        anchor: NodeId,
        offset: isize,
    ) {
        match self.nodes.get_mut(parent) {
            Some(node) => node.children.queue_add_relative(child, anchor, offset),
            None => self.structural_violation("add_child_relative ignored: unknown parent node"),
        }
    }

    /// Queue removing `child` from `parent`'s children (detaches, does not destroy)
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        match self.nodes.get_mut(parent) {
            Some(node) => node.children.queue_remove(child),
            None => self.structural_violation("remove_child ignored: unknown parent node"),
        }
    }

    /// Queue re-splicing `child` by a signed offset within `parent`'s children
    pub fn move_child(&mut self, parent: NodeId, child: NodeId, amount: isize) {
        match self.nodes.get_mut(parent) {
            Some(node) => node.children.queue_move(child, amount),
            None => self.structural_violation("move_child ignored: unknown parent node"),
        }
    }

    /// Queue detaching every child of `parent`
    pub fn clear_children(&mut self, parent: NodeId) {
        match self.nodes.get_mut(parent) {
            Some(node) => node.children.queue_clear(),
            None => self.structural_violation("clear_children ignored: unknown parent node"),
        }
    }

    /// Create a component and queue adding it to `node`
    ///
    /// The component exists in the arena immediately (searches see it as a
    /// virtual member) but joins the container at the next queue drain.
    pub fn add_component<C: Component>(&mut self, node: NodeId, behavior: C) -> Option<ComponentId> {
        if !self.nodes.contains_key(node) {
            self.structural_violation("add_component ignored: unknown node");
            return None;
        }
        let guid = self.alloc_guid();
        let id = self
            .components
            .insert(ComponentSlot::new(ObjectIdentity::new(guid), Box::new(behavior)));
        self.nodes[node].components.queue_add(id);
        Some(id)
    }

    /// Queue removing (and destroying) a component from its owner
    pub fn remove_component(&mut self, id: ComponentId) {
        let owner = match self.components.get(id) {
            Some(slot) => slot.state.owner,
            None => {
                self.structural_violation("remove_component ignored: unknown component");
                return;
            }
        };
        if owner.is_null() {
            self.structural_violation("remove_component ignored: component has no owner yet");
            return;
        }
        if let Some(node) = self.nodes.get_mut(owner) {
            node.components.queue_remove(id);
        }
    }

    /// Set whether a component receives update calls
    pub fn set_component_active(&mut self, id: ComponentId, active: bool) {
        if let Some(slot) = self.components.get_mut(id) {
            slot.state.active = active;
        }
    }

    /// Set whether a component receives render calls
    pub fn set_component_visible(&mut self, id: ComponentId, visible: bool) {
        if let Some(slot) = self.components.get_mut(id) {
            slot.state.visible = visible;
        }
    }

    /// Append a render action to a node's action list
    pub fn add_render_action(&mut self, node: NodeId, action: Box<dyn RenderAction>) {
        match self.nodes.get_mut(node) {
            Some(n) => n.actions.push(action),
            None => self.structural_violation("add_render_action ignored: unknown node"),
        }
    }

    /// Remove every render action from a node
    pub fn clear_render_actions(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.actions.clear();
        }
    }

    // ------------------------------------------------------------------
    // Activity flags
    // ------------------------------------------------------------------

    /// Set whether a node's children are walked during update
    pub fn set_children_ticking(&mut self, id: NodeId, value: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.flags.children_ticking = value;
            self.refresh_descendant_activity(id);
        }
    }

    /// Set whether a node's components receive update calls
    pub fn set_components_ticking(&mut self, id: NodeId, value: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.flags.components_ticking = value;
        }
    }

    /// Set whether a node's children are walked during render
    pub fn set_children_visible(&mut self, id: NodeId, value: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.flags.children_visible = value;
            self.refresh_descendant_activity(id);
        }
    }

    /// Set whether a node's components receive render calls
    pub fn set_components_visible(&mut self, id: NodeId, value: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.flags.components_visible = value;
        }
    }

    /// Recompute the derived flags of `id`'s children from `id`'s effective
    /// state, recursively
    fn refresh_descendant_activity(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else { return };
        let child_ticking = node.flags.child_ticking();
        let child_visible = node.flags.child_visible();
        let children: Vec<NodeId> = node.children.as_slice().to_vec();
        for child in children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.flags.parent_ticking = child_ticking;
                child_node.flags.parent_visible = child_visible;
            }
            self.refresh_descendant_activity(child);
        }
    }

    /// Recompute `id`'s own derived flags from its (possibly new) parent and
    /// push the result down its subtree
    fn refresh_activity_from_parent(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else { return };
        let parent = node.parent;
        // a detached subtree root answers to nobody: parent treated as
        // always-effective, same as the scene root
        let (ticking, visible) = match self.nodes.get(parent) {
            Some(p) => (p.flags.child_ticking(), p.flags.child_visible()),
            None => (true, true),
        };
        let node = &mut self.nodes[id];
        node.flags.parent_ticking = ticking;
        node.flags.parent_visible = visible;
        self.refresh_descendant_activity(id);
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    /// Set a node's local position, dirtying the whole subtree
    pub fn set_local_position(&mut self, id: NodeId, position: Vec2) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.transform.set_position(position);
            self.mark_dirty_subtree(id);
        }
    }

    /// Set a node's local rotation in radians, dirtying the whole subtree
    pub fn set_local_rotation(&mut self, id: NodeId, rotation: f32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.transform.set_rotation(rotation);
            self.mark_dirty_subtree(id);
        }
    }

    /// Set a node's local scale, dirtying the whole subtree
    pub fn set_local_scale(&mut self, id: NodeId, scale: Vec2) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.transform.set_scale(scale);
            self.mark_dirty_subtree(id);
        }
    }

    /// Replace a node's whole local transform, dirtying the subtree
    pub fn set_local_transform(&mut self, id: NodeId, local: Transform2D) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.transform.set_local(local);
            self.mark_dirty_subtree(id);
        }
    }

    /// Eagerly stamp the dirty bit on a node and every descendant
    fn mark_dirty_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else { return };
        node.transform.mark_dirty();
        let children: Vec<NodeId> = node.children.as_slice().to_vec();
        for child in children {
            self.mark_dirty_subtree(child);
        }
    }

    /// The node's world matrix, recomputing the cache if stale
    ///
    /// A dirty node's parent is never clean-but-stale (writes dirty whole
    /// subtrees), so one level of recursion per dirty ancestor suffices.
    pub fn world_matrix(&mut self, id: NodeId) -> Mat3 {
        let Some(node) = self.nodes.get(id) else {
            return Mat3::identity();
        };
        if !node.transform.is_dirty() {
            return node.transform.cached_world();
        }
        let parent = node.parent;
        let parent_world = if parent.is_null() {
            Mat3::identity()
        } else {
            self.world_matrix(parent)
        };
        let node = &mut self.nodes[id];
        node.transform.refresh(&parent_world);
        node.transform.cached_world()
    }

    /// The node's position in world space
    pub fn global_position(&mut self, id: NodeId) -> Vec2 {
        let world = self.world_matrix(id);
        translation_of(&world)
    }

    /// Convert a point from a node's local space to world space
    pub fn local_to_global(&mut self, id: NodeId, point: Vec2) -> Vec2 {
        let world = self.world_matrix(id);
        crate::foundation::math::transform_point(&world, point)
    }

    /// Convert a point from world space to a node's local space
    pub fn global_to_local(&mut self, id: NodeId, point: Vec2) -> Vec2 {
        let inverse = invert_or_identity(&self.world_matrix(id));
        crate::foundation::math::transform_point(&inverse, point)
    }

    /// Convert a point from one node's local space to another's
    pub fn from_other_local(&mut self, source: NodeId, target: NodeId, point: Vec2) -> Vec2 {
        let world_point = self.local_to_global(source, point);
        self.global_to_local(target, world_point)
    }

    // ------------------------------------------------------------------
    // Tree entry / exit
    // ------------------------------------------------------------------

    fn enter_tree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else { return };
        if node.in_tree {
            return;
        }
        node.in_tree = true;
        node.entered_tree_once = true;
        // components see a live node before siblings do
        let comps: Vec<ComponentId> = node.components.as_slice().to_vec();
        let children: Vec<NodeId> = node.children.as_slice().to_vec();
        for cid in comps {
            self.enter_component(cid);
        }
        for child in children {
            self.enter_tree(child);
        }
    }

    fn exit_tree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else { return };
        if !node.in_tree {
            return;
        }
        let comps: Vec<ComponentId> = node.components.as_slice().to_vec();
        let children: Vec<NodeId> = node.children.as_slice().to_vec();
        for cid in comps {
            self.exit_component(cid);
        }
        for child in children {
            self.exit_tree(child);
        }
        // cleared only after the whole subtree has exited, so no descendant
        // ever observes a half-exited parent
        if let Some(node) = self.nodes.get_mut(id) {
            node.in_tree = false;
        }
    }

    fn enter_component(&mut self, id: ComponentId) {
        let Some(slot) = self.components.get_mut(id) else { return };
        if slot.state.in_tree {
            return;
        }
        slot.state.in_tree = true;
        let first = !slot.state.entered_tree_once;
        slot.state.entered_tree_once = true;
        if first {
            self.run_component_hook(id, |behavior, scene, this| {
                behavior.on_first_entered(scene, this);
            });
        }
        self.run_component_hook(id, |behavior, scene, this| {
            behavior.on_entered(scene, this);
        });
    }

    fn exit_component(&mut self, id: ComponentId) {
        let Some(slot) = self.components.get(id) else { return };
        if !slot.state.in_tree {
            return;
        }
        self.run_component_hook(id, |behavior, scene, this| {
            behavior.on_exited(scene, this);
        });
        if let Some(slot) = self.components.get_mut(id) {
            slot.state.in_tree = false;
        }
    }

    /// Take a component's behavior out of its slot, run a hook against
    /// `&mut Scene`, and put it back unless the component was destroyed
    /// during the hook
    fn run_component_hook<F>(&mut self, id: ComponentId, hook: F)
    where
        F: FnOnce(&mut dyn Component, &mut Scene, ComponentRef),
    {
        let (owner, behavior) = match self.components.get_mut(id) {
            Some(slot) => match slot.behavior.take() {
                Some(behavior) => (slot.state.owner, behavior),
                // hook re-entered for a component already running one
                None => return,
            },
            None => return,
        };
        let mut behavior = behavior;
        hook(
            behavior.as_mut(),
            self,
            ComponentRef {
                component: id,
                owner,
            },
        );
        if let Some(slot) = self.components.get_mut(id) {
            slot.behavior = Some(behavior);
        }
    }

    // ------------------------------------------------------------------
    // Queue draining
    // ------------------------------------------------------------------

    /// Drain every container's pending queue, depth-first from the root
    ///
    /// A parent's own queue is drained before its (then-current) children's.
    /// Rejected while an update or render walk is in progress; top-level
    /// calls between walks are always allowed.
    pub fn apply_changes(&mut self) {
        if self.lock_depth > 0 || self.applying {
            self.structural_violation("apply_changes ignored: traversal in progress");
            return;
        }
        self.applying = true;
        self.apply_node_changes(self.root);
        // detached subtrees are not reachable from the root but their queues
        // still drain, so a tree can be assembled before it is attached
        let detached: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(id, node)| *id != self.root && node.parent.is_null())
            .map(|(id, _)| id)
            .collect();
        for id in detached {
            self.apply_node_changes(id);
        }
        self.applying = false;
    }

    fn apply_node_changes(&mut self, id: NodeId) {
        if !self.nodes.contains_key(id) {
            return;
        }
        if self.nodes[id].components.has_pending() {
            let mut list = std::mem::take(&mut self.nodes[id].components);
            list.apply_changes(&mut ComponentStageHooks { scene: self, owner: id });
            // hooks may have queued onto the placeholder; keep those pending
            let placeholder = std::mem::replace(&mut self.nodes[id].components, list);
            self.nodes[id].components.absorb_pending(placeholder);
        }
        if self.nodes.contains_key(id) && self.nodes[id].children.has_pending() {
            let mut list = std::mem::take(&mut self.nodes[id].children);
            list.apply_changes(&mut ChildStageHooks { scene: self, owner: id });
            let placeholder = std::mem::replace(&mut self.nodes[id].children, list);
            self.nodes[id].children.absorb_pending(placeholder);
        }
        let children: Vec<NodeId> = match self.nodes.get(id) {
            Some(node) => node.children.as_slice().to_vec(),
            None => return,
        };
        for child in children {
            self.apply_node_changes(child);
        }
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Record a node for teardown at the end of the current tick
    ///
    /// Irreversible: the node keeps being walked for the remainder of the
    /// tick (only the record changes, not the structure) and is destroyed
    /// when the invalidation queue drains. With `invalidate_children` false
    /// the children are evicted without being invalidated themselves,
    /// leaving live orphaned subtrees behind. Longstanding semantics some
    /// callers rely on, see DESIGN.md.
    pub fn queue_invalidate(
        &mut self,
        node: NodeId,
        invalidate_children: bool,
        invalidate_components: bool,
    ) {
        if node == self.root {
            self.structural_violation("queue_invalidate ignored: cannot invalidate the root");
            return;
        }
        let Some(n) = self.nodes.get_mut(node) else {
            self.structural_violation("queue_invalidate ignored: unknown node");
            return;
        };
        n.invalidated = true;
        self.invalidations.push_back(InvalidateRequest {
            node,
            children: invalidate_children,
            components: invalidate_components,
        });
    }

    /// Tear down every node recorded by [`Scene::queue_invalidate`]
    ///
    /// Runs to completion: requests queued by teardown hooks are processed
    /// in the same drain. Destroying a node twice is a no-op.
    pub fn process_invalidations(&mut self) {
        if self.lock_depth > 0 || self.applying {
            self.structural_violation("process_invalidations ignored: traversal in progress");
            return;
        }
        while let Some(request) = self.invalidations.pop_front() {
            self.teardown(request);
        }
    }

    fn teardown(&mut self, request: InvalidateRequest) {
        let Some(node) = self.nodes.get(request.node) else {
            // already destroyed via an ancestor's teardown; idempotent
            return;
        };
        let parent = node.parent;
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.detach(request.node);
        }
        self.exit_tree(request.node);
        self.destroy_node(request.node, request.children, request.components);
    }

    fn destroy_node(&mut self, id: NodeId, destroy_children: bool, destroy_components: bool) {
        let Some(node) = self.nodes.get_mut(id) else { return };
        node.invalidated = true;
        let comps: Vec<ComponentId> = node.components.as_slice().to_vec();
        let children: Vec<NodeId> = node.children.as_slice().to_vec();

        for cid in comps {
            if destroy_components {
                self.run_component_hook(cid, |behavior, scene, this| {
                    behavior.on_removed(scene, this);
                });
            }
            // the arena slot is always reclaimed; skipping the hook is the
            // only observable difference
            self.components.remove(cid);
        }

        if destroy_children {
            for child in children {
                self.destroy_node(child, true, destroy_components);
            }
        } else {
            // evicted without invalidation: live subtrees with no owner
            for child in children {
                if let Some(child_node) = self.nodes.get_mut(child) {
                    child_node.parent = NodeId::null();
                }
                self.refresh_activity_from_parent(child);
                self.mark_dirty_subtree(child);
            }
        }

        self.nodes.remove(id);
    }

    // ------------------------------------------------------------------
    // Per-frame walks
    // ------------------------------------------------------------------

    /// Walk the tree calling component updates, in container order
    ///
    /// Structural mutations requested from inside updates are queued, never
    /// applied mid-walk; a node added during this tick is invisible to the
    /// rest of the tick's traversal.
    pub fn update(&mut self, delta_time: f32) {
        if self.lock_depth > 0 || self.applying {
            self.structural_violation("update ignored: traversal or queue drain in progress");
            return;
        }
        self.lock_depth += 1;
        self.update_node(self.root, delta_time);
        self.lock_depth -= 1;
    }

    fn update_node(&mut self, id: NodeId, delta_time: f32) {
        let Some(node) = self.nodes.get(id) else { return };
        let flags = node.flags;
        if !flags.effectively_ticking() {
            return;
        }
        if flags.child_ticking() {
            // the live list cannot change mid-walk, so index iteration is sound
            let child_count = self.nodes[id].children.len();
            for index in 0..child_count {
                let child = self.nodes[id].children.as_slice()[index];
                self.update_node(child, delta_time);
            }
        }
        if flags.components_ticking {
            let comp_count = match self.nodes.get(id) {
                Some(node) => node.components.len(),
                None => return,
            };
            for index in 0..comp_count {
                let cid = self.nodes[id].components.as_slice()[index];
                let active = self
                    .components
                    .get(cid)
                    .is_some_and(|slot| slot.state.active);
                if active {
                    self.run_component_hook(cid, |behavior, scene, this| {
                        behavior.update(scene, this, delta_time);
                    });
                }
            }
        }
    }

    /// Walk the tree rendering visible components and children
    ///
    /// Caches each node's display transform, pushes the node's matrix onto
    /// the current batcher, brackets the subtree with render-action
    /// pre/post hooks, and pops.
    pub fn render(&mut self, frame: &mut FrameRenderer) {
        if self.lock_depth > 0 || self.applying {
            self.structural_violation("render ignored: traversal or queue drain in progress");
            return;
        }
        self.lock_depth += 1;
        self.render_node(self.root, frame, Mat3::identity());
        self.lock_depth -= 1;
    }

    fn render_node(&mut self, id: NodeId, frame: &mut FrameRenderer, parent_display: Mat3) {
        let Some(node) = self.nodes.get(id) else { return };
        let flags = node.flags;
        if !flags.effectively_visible() {
            return;
        }

        // refresh the world cache so component render hooks, which only get
        // `&Scene`, read clean matrices
        self.world_matrix(id);

        // actions leave the node while their hooks run against the frame
        let mut actions = std::mem::take(&mut self.nodes[id].actions);
        let mut offset = Mat3::identity();
        for action in &actions {
            if let Some(contribution) = action.position_offset() {
                offset *= contribution;
            }
        }
        let local = self.nodes[id].transform.cached_local();
        let display = parent_display * offset * local;
        self.nodes[id].display_matrix = display;

        frame.current().push_matrix(offset * local);
        for action in actions.iter_mut() {
            action.pre_render(frame);
        }

        if flags.components_visible {
            let comp_count = self.nodes[id].components.len();
            for index in 0..comp_count {
                let cid = self.nodes[id].components.as_slice()[index];
                let taken = match self.components.get_mut(cid) {
                    Some(slot) if slot.state.visible => {
                        slot.behavior.take().map(|b| (b, slot.state.owner))
                    }
                    _ => None,
                };
                if let Some((behavior, owner)) = taken {
                    behavior.render(
                        self,
                        ComponentRef {
                            component: cid,
                            owner,
                        },
                        frame,
                    );
                    if let Some(slot) = self.components.get_mut(cid) {
                        slot.behavior = Some(behavior);
                    }
                }
            }
        }

        if flags.child_visible() {
            let child_count = self.nodes[id].children.len();
            for index in 0..child_count {
                let child = self.nodes[id].children.as_slice()[index];
                self.render_node(child, frame, display);
            }
        }

        for action in actions.iter_mut().rev() {
            action.post_render(frame);
        }
        frame.current().pop_matrix();

        // actions added during the render landed on the placeholder list
        let added = std::mem::replace(&mut self.nodes[id].actions, actions);
        self.nodes[id].actions.extend(added);
    }

    /// One full frame: update, render, drain queues, process invalidations
    pub fn tick(&mut self, delta_time: f32, frame: &mut FrameRenderer) {
        self.update(delta_time);
        self.render(frame);
        self.apply_changes();
        self.process_invalidations();
    }

    /// Drain queues and invalidations outside the frame loop (setup code)
    pub fn flush(&mut self) {
        self.apply_changes();
        self.process_invalidations();
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Find the first node matching a predicate, depth-first from `from`
    ///
    /// Pending (queued but unapplied) additions are searched as virtual
    /// members, so a search issued mid-tick sees a consistent view.
    pub fn find_node<F>(&self, from: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        self.find_node_inner(from, &predicate)
    }

    fn find_node_inner(&self, from: NodeId, predicate: &dyn Fn(&Node) -> bool) -> Option<NodeId> {
        let node = self.nodes.get(from)?;
        if predicate(node) {
            return Some(from);
        }
        for child in node
            .children
            .iter()
            .copied()
            .chain(node.children.pending_adds())
        {
            if let Some(found) = self.find_node_inner(child, predicate) {
                return Some(found);
            }
        }
        None
    }

    /// Find a node by name under `from`
    pub fn find_by_name(&self, from: NodeId, name: &str) -> Option<NodeId> {
        self.find_node(from, |node| node.identity.matches_name(name))
    }

    /// Find a node by guid under `from`
    pub fn find_by_guid(&self, from: NodeId, guid: Guid) -> Option<NodeId> {
        self.find_node(from, |node| node.identity.guid() == guid)
    }

    /// Collect every node under `from` carrying any of the given tags
    pub fn find_with_tags(&self, from: NodeId, tags: TagSet) -> Vec<NodeId> {
        let mut matches = Vec::new();
        self.collect_tagged(from, tags, &mut matches);
        matches
    }

    fn collect_tagged(&self, from: NodeId, tags: TagSet, out: &mut Vec<NodeId>) {
        let Some(node) = self.nodes.get(from) else { return };
        if node.identity.has_any_tags(tags) {
            out.push(from);
        }
        for child in node
            .children
            .iter()
            .copied()
            .chain(node.children.pending_adds())
        {
            self.collect_tagged(child, tags, out);
        }
    }

    /// Find the first component of type `T` under `from`, pending included
    pub fn find_component<T: Component>(&self, from: NodeId) -> Option<ComponentId> {
        let node = self.nodes.get(from)?;
        for cid in node
            .components
            .iter()
            .copied()
            .chain(node.components.pending_adds())
        {
            let is_match = self
                .components
                .get(cid)
                .and_then(|slot| slot.behavior.as_ref())
                .is_some_and(|behavior| behavior.as_any().is::<T>());
            if is_match {
                return Some(cid);
            }
        }
        for child in node
            .children
            .iter()
            .copied()
            .chain(node.children.pending_adds())
        {
            if let Some(found) = self.find_component::<T>(child) {
                return Some(found);
            }
        }
        None
    }
}

// ----------------------------------------------------------------------
// Drain hooks
// ----------------------------------------------------------------------

/// Owner-side policy for child-node containers
struct ChildStageHooks<'a> {
    scene: &'a mut Scene,
    owner: NodeId,
}

impl StageHooks<NodeId> for ChildStageHooks<'_> {
    fn prepare_add(&mut self, element: NodeId) -> bool {
        let Some(candidate) = self.scene.nodes.get(element) else {
            self.scene
                .structural_violation("child add rejected: node no longer exists");
            return false;
        };
        if candidate.invalidated {
            self.scene
                .structural_violation("child add rejected: node is invalidated");
            return false;
        }
        if element == self.owner {
            self.scene
                .structural_violation("child add rejected: node cannot own itself");
            return false;
        }
        // adding an ancestor as a descendant would close a cycle
        let mut ancestor = self.scene.nodes[self.owner].parent;
        while !ancestor.is_null() {
            if ancestor == element {
                self.scene
                    .structural_violation("child add rejected: node is an ancestor of the owner");
                return false;
            }
            ancestor = match self.scene.nodes.get(ancestor) {
                Some(node) => node.parent,
                None => NodeId::null(),
            };
        }
        // exactly one owner per child: detach from any prior parent
        let prior = self.scene.nodes[element].parent;
        if !prior.is_null() && prior != self.owner {
            if let Some(prior_node) = self.scene.nodes.get_mut(prior) {
                prior_node.children.detach(element);
            }
        }
        true
    }

    fn handle_add(&mut self, element: NodeId) {
        let owner_in_tree = self.scene.nodes[self.owner].in_tree;
        let was_in_tree = self.scene.nodes[element].in_tree;
        self.scene.nodes[element].parent = self.owner;
        if owner_in_tree && !was_in_tree {
            self.scene.enter_tree(element);
        } else if !owner_in_tree && was_in_tree {
            self.scene.exit_tree(element);
        }
        self.scene.refresh_activity_from_parent(element);
        self.scene.mark_dirty_subtree(element);
    }

    fn handle_remove(&mut self, element: NodeId) {
        if self.scene.nodes.get(element).is_some_and(|n| n.in_tree) {
            self.scene.exit_tree(element);
        }
        if let Some(node) = self.scene.nodes.get_mut(element) {
            node.parent = NodeId::null();
        }
        self.scene.refresh_activity_from_parent(element);
        self.scene.mark_dirty_subtree(element);
    }
}

/// Owner-side policy for component containers
struct ComponentStageHooks<'a> {
    scene: &'a mut Scene,
    owner: NodeId,
}

impl StageHooks<ComponentId> for ComponentStageHooks<'_> {
    fn prepare_add(&mut self, element: ComponentId) -> bool {
        let Some(slot) = self.scene.components.get(element) else {
            self.scene
                .structural_violation("component add rejected: component no longer exists");
            return false;
        };
        let prior = slot.state.owner;
        if !prior.is_null() && prior != self.owner {
            if self.scene.components[element].state.in_tree
                && !self.scene.nodes[self.owner].in_tree
            {
                self.scene.exit_component(element);
            }
            if let Some(prior_node) = self.scene.nodes.get_mut(prior) {
                prior_node.components.detach(element);
            }
        }
        true
    }

    fn handle_add(&mut self, element: ComponentId) {
        let owner_in_tree = self.scene.nodes[self.owner].in_tree;
        self.scene.components[element].state.owner = self.owner;
        self.scene.run_component_hook(element, |behavior, scene, this| {
            behavior.on_added(scene, this);
        });
        if owner_in_tree {
            self.scene.enter_component(element);
        }
    }

    fn handle_remove(&mut self, element: ComponentId) {
        if !self.scene.components.contains_key(element) {
            return;
        }
        self.scene.exit_component(element);
        self.scene.run_component_hook(element, |behavior, scene, this| {
            behavior.on_removed(scene, this);
        });
        // removal destroys: a component never outlives its container slot
        self.scene.components.remove(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::batcher::test_support::{DrawEvent, RecordingBatcher};
    use crate::render::{BlendAction, BlendMode, Color, LetterboxAction};
    use approx::assert_relative_eq;
    use std::any::Any;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    /// Records every lifecycle hook it receives
    struct Probe {
        name: &'static str,
        log: Log,
    }

    impl Probe {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
            }
        }

        fn record(&self, event: &str) {
            self.log.borrow_mut().push(format!("{} {event}", self.name));
        }
    }

    impl Component for Probe {
        fn on_added(&mut self, _: &mut Scene, _: ComponentRef) {
            self.record("added");
        }

        fn on_first_entered(&mut self, _: &mut Scene, _: ComponentRef) {
            self.record("first-entered");
        }

        fn on_entered(&mut self, _: &mut Scene, _: ComponentRef) {
            self.record("entered");
        }

        fn on_exited(&mut self, _: &mut Scene, _: ComponentRef) {
            self.record("exited");
        }

        fn on_removed(&mut self, _: &mut Scene, _: ComponentRef) {
            self.record("removed");
        }

        fn update(&mut self, _: &mut Scene, _: ComponentRef, _: f32) {
            self.record("update");
        }

        fn render(&self, _: &Scene, _: ComponentRef, frame: &mut FrameRenderer) {
            self.record("render");
            frame.current().draw_rect(Vec2::new(1.0, 1.0), Color::WHITE);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    /// Runs an arbitrary closure every update
    struct OnUpdate<F: FnMut(&mut Scene, ComponentRef) + 'static> {
        hook: F,
    }

    impl<F: FnMut(&mut Scene, ComponentRef) + 'static> OnUpdate<F> {
        fn new(hook: F) -> Self {
            Self { hook }
        }
    }

    impl<F: FnMut(&mut Scene, ComponentRef) + 'static> Component for OnUpdate<F> {
        fn update(&mut self, scene: &mut Scene, this: ComponentRef, _: f32) {
            (self.hook)(scene, this);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn new_frame() -> (FrameRenderer, Rc<RefCell<Vec<DrawEvent>>>) {
        let base = RecordingBatcher::new();
        let log = base.log.clone();
        (FrameRenderer::new(Box::new(base)), log)
    }

    #[test]
    fn removal_and_add_during_update_are_deferred() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let a = scene.create_node_named("a");
        let b = scene.create_node_named("b");
        let c = scene.create_node_named("c");
        scene.add_child(root, a);
        scene.add_child(root, b);
        scene.add_component(a, Probe::new("a", &log));
        scene.add_component(b, Probe::new("b", &log));
        scene.add_component(
            a,
            OnUpdate::new(move |scene, _| {
                scene.remove_child(root, b);
                scene.add_child(root, c);
            }),
        );
        scene.flush();
        log.borrow_mut().clear();

        scene.update(0.016);
        // the tick still visits a then b; b's removal is deferred
        assert_eq!(entries(&log), vec!["a update", "b update"]);

        scene.apply_changes();
        assert_eq!(scene.node(root).unwrap().children(), &[a, c]);
        assert!(scene.node(b).unwrap().parent().is_null());
        assert!(!scene.node(b).unwrap().is_in_tree());
    }

    #[test]
    fn node_spawned_mid_tick_is_invisible_until_next_tick() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let driver = scene.create_node_named("driver");
        let spawned = scene.create_node_named("spawned");
        scene.add_child(root, driver);
        scene.add_component(spawned, Probe::new("s", &log));
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        scene.add_component(
            driver,
            OnUpdate::new(move |scene, _| {
                if !flag.get() {
                    flag.set(true);
                    scene.add_child(root, spawned);
                }
            }),
        );
        scene.flush();
        log.borrow_mut().clear();

        scene.update(0.016);
        assert!(!entries(&log).contains(&"s update".to_string()));

        scene.apply_changes();
        scene.update(0.016);
        assert!(entries(&log).contains(&"s update".to_string()));
    }

    #[test]
    fn parent_transform_writes_read_through_without_refresh() {
        let mut scene = Scene::new();
        let y = scene.create_node_named("y");
        let x = scene.create_node_named("x");
        scene.add_child(scene.root(), y);
        scene.add_child(y, x);
        scene.set_local_position(y, Vec2::new(0.0, 5.0));
        scene.set_local_position(x, Vec2::new(10.0, 0.0));
        scene.flush();

        let p = scene.global_position(x);
        assert_relative_eq!(p.x, 10.0);
        assert_relative_eq!(p.y, 5.0);

        scene.set_local_position(y, Vec2::new(100.0, 0.0));
        let p = scene.global_position(x);
        assert_relative_eq!(p.x, 110.0);
        assert_relative_eq!(p.y, 0.0);
    }

    #[test]
    fn world_matrix_matches_scratch_recomputation() {
        let mut scene = Scene::new();
        let a = scene.create_node();
        let b = scene.create_node();
        let c = scene.create_node();
        scene.add_child(scene.root(), a);
        scene.add_child(a, b);
        scene.add_child(b, c);
        scene.flush();

        scene.set_local_transform(
            a,
            Transform2D {
                position: Vec2::new(3.0, -2.0),
                rotation: 0.7,
                scale: Vec2::new(2.0, 2.0),
            },
        );
        scene.set_local_transform(
            b,
            Transform2D {
                position: Vec2::new(-1.0, 4.0),
                rotation: -0.3,
                scale: Vec2::new(0.5, 1.5),
            },
        );
        scene.set_local_position(c, Vec2::new(6.0, 6.0));

        // interleave reads and writes; the cache must never go stale
        let _ = scene.world_matrix(b);
        scene.set_local_rotation(a, 1.1);

        let expected = scene.node(a).unwrap().transform().local().to_matrix()
            * scene.node(b).unwrap().transform().local().to_matrix()
            * scene.node(c).unwrap().transform().local().to_matrix();
        let actual = scene.world_matrix(c);
        for row in 0..3 {
            for col in 0..3 {
                assert_relative_eq!(actual[(row, col)], expected[(row, col)], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn point_conversions_compose_cached_matrices() {
        let mut scene = Scene::new();
        let y = scene.create_node();
        let x = scene.create_node();
        scene.add_child(scene.root(), y);
        scene.add_child(y, x);
        scene.set_local_position(y, Vec2::new(0.0, 5.0));
        scene.set_local_position(x, Vec2::new(10.0, 0.0));
        scene.flush();

        let in_y = scene.from_other_local(x, y, Vec2::zeros());
        assert_relative_eq!(in_y.x, 10.0);
        assert_relative_eq!(in_y.y, 0.0);

        let world = scene.local_to_global(x, Vec2::new(1.0, 1.0));
        let back = scene.global_to_local(x, world);
        assert_relative_eq!(back.x, 1.0);
        assert_relative_eq!(back.y, 1.0);
    }

    #[test]
    fn effective_flags_cascade_on_toggle_and_reparent() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let p = scene.create_node_named("p");
        let c = scene.create_node_named("c");
        scene.add_child(root, p);
        scene.add_child(p, c);
        scene.add_component(c, Probe::new("c", &log));
        scene.flush();

        scene.set_children_ticking(p, false);
        assert!(scene.node(p).unwrap().flags().effectively_ticking());
        assert!(!scene.node(c).unwrap().flags().effectively_ticking());

        log.borrow_mut().clear();
        scene.update(0.016);
        assert!(entries(&log).is_empty());

        // reparenting under the root restores the child's effective state
        scene.add_child(root, c);
        scene.apply_changes();
        assert!(scene.node(c).unwrap().flags().effectively_ticking());
        assert_eq!(
            scene.node(c).unwrap().flags().effectively_ticking(),
            scene.node(root).unwrap().flags().children_ticking
                && scene.node(root).unwrap().flags().effectively_ticking()
        );

        log.borrow_mut().clear();
        scene.update(0.016);
        assert_eq!(entries(&log), vec!["c update"]);
    }

    #[test]
    fn reparenting_keeps_exactly_one_owner() {
        let mut scene = Scene::new();
        let root = scene.root();
        let p1 = scene.create_node_named("p1");
        let p2 = scene.create_node_named("p2");
        let x = scene.create_node_named("x");
        scene.add_child(root, p1);
        scene.add_child(root, p2);
        scene.add_child(p1, x);
        scene.flush();

        scene.add_child(p2, x);
        scene.apply_changes();

        assert!(scene.node(p1).unwrap().children().is_empty());
        assert_eq!(scene.node(p2).unwrap().children(), &[x]);
        assert_eq!(scene.node(x).unwrap().parent(), p2);
        assert!(scene.node(x).unwrap().is_in_tree());
    }

    #[test]
    fn sibling_order_follows_add_variants() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.create_node_named("a");
        let b = scene.create_node_named("b");
        let c = scene.create_node_named("c");
        scene.add_child(root, a);
        scene.add_child_at_top(root, b);
        scene.add_child_relative(root, c, b, 1);
        scene.apply_changes();
        assert_eq!(scene.node(root).unwrap().children(), &[b, c, a]);

        scene.move_child(root, a, -2);
        scene.apply_changes();
        assert_eq!(scene.node(root).unwrap().children(), &[a, b, c]);
    }

    #[test]
    fn invalidation_is_idempotent() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let p = scene.create_node_named("p");
        let c = scene.create_node_named("c");
        scene.add_child(root, p);
        scene.add_child(p, c);
        scene.add_component(c, Probe::new("c", &log));
        scene.flush();
        let before = scene.node_count();

        // twice directly, and again via the already-invalidated ancestor
        scene.queue_invalidate(c, true, true);
        scene.queue_invalidate(c, true, true);
        scene.queue_invalidate(p, true, true);
        scene.process_invalidations();

        assert!(scene.node(p).is_none());
        assert!(scene.node(c).is_none());
        assert_eq!(scene.node_count(), before - 2);
        assert_eq!(scene.component_count(), 0);
        // exited once, removed once
        let log = entries(&log);
        assert_eq!(log.iter().filter(|e| *e == "c exited").count(), 1);
        assert_eq!(log.iter().filter(|e| *e == "c removed").count(), 1);
    }

    #[test]
    fn invalidated_node_is_still_walked_for_the_rest_of_the_tick() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let a = scene.create_node_named("a");
        let b = scene.create_node_named("b");
        scene.add_child(root, a);
        scene.add_child(root, b);
        scene.add_component(b, Probe::new("b", &log));
        scene.add_component(
            a,
            OnUpdate::new(move |scene, _| {
                scene.queue_invalidate(b, true, true);
            }),
        );
        scene.flush();
        log.borrow_mut().clear();

        scene.update(0.016);
        assert!(entries(&log).contains(&"b update".to_string()));

        scene.apply_changes();
        scene.process_invalidations();
        assert!(scene.node(b).is_none());

        log.borrow_mut().clear();
        scene.update(0.016);
        assert!(!entries(&log).contains(&"b update".to_string()));
    }

    #[test]
    fn invalidate_without_children_orphans_subtree() {
        // reproduces the source semantics faithfully: the evicted children
        // stay alive with no owner, a likely leak for callers that forget
        // them (see DESIGN.md)
        let mut scene = Scene::new();
        let root = scene.root();
        let p = scene.create_node_named("p");
        let c = scene.create_node_named("c");
        scene.add_child(root, p);
        scene.add_child(p, c);
        scene.flush();

        scene.queue_invalidate(p, false, true);
        scene.process_invalidations();

        assert!(scene.node(p).is_none());
        let orphan = scene.node(c).expect("orphan stays alive");
        assert!(orphan.parent().is_null());
        assert!(!orphan.is_in_tree());
        assert!(!orphan.is_invalidated());
        assert!(scene.find_by_name(root, "c").is_none());
    }

    #[test]
    fn first_entered_fires_exactly_once_across_reentries() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let n = scene.create_node_named("n");
        scene.add_component(n, Probe::new("p", &log));
        scene.add_child(root, n);
        scene.flush();

        scene.remove_child(root, n);
        scene.apply_changes();
        scene.add_child(root, n);
        scene.apply_changes();

        let log = entries(&log);
        assert_eq!(
            log,
            vec![
                "p added",
                "p first-entered",
                "p entered",
                "p exited",
                "p entered"
            ]
        );
    }

    #[test]
    fn components_enter_before_children() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let parent = scene.create_node_named("parent");
        let child = scene.create_node_named("child");
        scene.add_component(parent, Probe::new("pc", &log));
        scene.add_component(child, Probe::new("cc", &log));
        scene.add_child(parent, child);
        scene.flush(); // assembles the detached subtree
        log.borrow_mut().clear();

        scene.add_child(root, parent);
        scene.apply_changes();

        let log = entries(&log);
        let pc = log.iter().position(|e| e == "pc entered").unwrap();
        let cc = log.iter().position(|e| e == "cc entered").unwrap();
        assert!(pc < cc);
    }

    #[test]
    fn searches_see_pending_additions() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let n = scene.create_node_named("pending");
        scene.set_node_tags(n, TagSet::bit(3));
        scene.add_component(n, Probe::new("p", &log));
        scene.add_child(root, n);

        // nothing applied yet: the node is a virtual member
        assert_eq!(scene.find_by_name(root, "pending"), Some(n));
        assert_eq!(scene.find_with_tags(root, TagSet::bit(3)), vec![n]);
        assert!(scene.find_component::<Probe>(root).is_some());
        let guid = scene.node(n).unwrap().identity().guid();
        assert_eq!(scene.find_by_guid(root, guid), Some(n));

        scene.flush();
        assert_eq!(scene.find_by_name(root, "pending"), Some(n));
    }

    #[test]
    fn adding_an_ancestor_as_a_child_is_rejected() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.create_node_named("a");
        let b = scene.create_node_named("b");
        scene.add_child(root, a);
        scene.add_child(a, b);
        scene.flush();

        scene.add_child(b, a);
        scene.add_child(a, a);
        scene.apply_changes();

        assert_eq!(scene.node(a).unwrap().parent(), root);
        assert!(scene.node(b).unwrap().children().is_empty());
        assert_eq!(scene.node(root).unwrap().children(), &[a]);
    }

    #[test]
    fn removing_a_non_member_is_a_logged_noop() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.create_node_named("a");
        let stray = scene.create_node_named("stray");
        scene.add_child(root, a);
        scene.flush();

        scene.remove_child(root, stray);
        scene.apply_changes();
        assert_eq!(scene.node(root).unwrap().children(), &[a]);
        assert!(scene.node(stray).is_some());
    }

    #[test]
    fn clear_children_detaches_without_destroying() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let a = scene.create_node_named("a");
        let b = scene.create_node_named("b");
        scene.add_child(root, a);
        scene.add_child(root, b);
        scene.add_component(a, Probe::new("a", &log));
        scene.flush();

        scene.clear_children(root);
        scene.apply_changes();

        assert!(scene.node(root).unwrap().children().is_empty());
        assert!(scene.node(a).unwrap().parent().is_null());
        assert!(scene.node(b).unwrap().parent().is_null());
        assert!(entries(&log).contains(&"a exited".to_string()));
    }

    #[test]
    fn component_removal_destroys_the_component() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let n = scene.create_node_named("n");
        scene.add_child(root, n);
        let cid = scene.add_component(n, Probe::new("p", &log)).unwrap();
        scene.flush();

        scene.remove_component(cid);
        scene.apply_changes();

        assert!(scene.component_state(cid).is_none());
        assert_eq!(scene.component_count(), 0);
        let log = entries(&log);
        assert!(log.contains(&"p exited".to_string()));
        assert!(log.contains(&"p removed".to_string()));
    }

    #[test]
    fn inactive_components_skip_update() {
        let mut scene = Scene::new();
        let log = new_log();
        let n = scene.create_node_named("n");
        scene.add_child(scene.root(), n);
        let cid = scene.add_component(n, Probe::new("p", &log)).unwrap();
        scene.flush();

        scene.set_component_active(cid, false);
        log.borrow_mut().clear();
        scene.update(0.016);
        assert!(entries(&log).is_empty());

        scene.set_component_active(cid, true);
        scene.update(0.016);
        assert_eq!(entries(&log), vec!["p update"]);
    }

    #[test]
    fn render_pushes_and_pops_symmetrically() {
        let mut scene = Scene::new();
        let log = new_log();
        let (mut frame, events) = new_frame();
        let root = scene.root();
        let a = scene.create_node_named("a");
        let b = scene.create_node_named("b");
        scene.add_child(root, a);
        scene.add_child(a, b);
        scene.add_component(a, Probe::new("a", &log));
        scene.add_component(b, Probe::new("b", &log));
        scene.flush();
        log.borrow_mut().clear();

        scene.render(&mut frame);

        let events = events.borrow();
        let pushes = events.iter().filter(|e| matches!(e, DrawEvent::Push(_))).count();
        let pops = events.iter().filter(|e| matches!(e, DrawEvent::Pop)).count();
        assert_eq!(pushes, 3); // root, a, b
        assert_eq!(pushes, pops);
        // a's component rendered before its child subtree
        assert_eq!(entries(&log), vec!["a render", "b render"]);
    }

    #[test]
    fn hidden_subtrees_are_skipped_entirely() {
        let mut scene = Scene::new();
        let log = new_log();
        let (mut frame, _) = new_frame();
        let root = scene.root();
        let a = scene.create_node_named("a");
        scene.add_child(root, a);
        scene.add_component(a, Probe::new("a", &log));
        scene.flush();
        log.borrow_mut().clear();

        scene.set_children_visible(root, false);
        scene.render(&mut frame);
        assert!(entries(&log).is_empty());

        scene.set_children_visible(root, true);
        scene.set_components_visible(a, false);
        scene.render(&mut frame);
        assert!(entries(&log).is_empty());

        scene.set_components_visible(a, true);
        scene.render(&mut frame);
        assert_eq!(entries(&log), vec!["a render"]);
    }

    #[test]
    fn render_actions_bracket_in_reverse_order() {
        let mut scene = Scene::new();
        let (mut frame, events) = new_frame();
        let root = scene.root();
        let n = scene.create_node_named("n");
        scene.add_child(root, n);
        scene.flush();
        scene.add_render_action(n, Box::new(BlendAction::new(BlendMode::Additive)));
        scene.add_render_action(n, Box::new(BlendAction::new(BlendMode::Multiply)));

        scene.render(&mut frame);

        let blends: Vec<BlendMode> = events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                DrawEvent::Blend(mode) => Some(*mode),
                _ => None,
            })
            .collect();
        // pre in list order, post in reverse: the second action restores the
        // first's mode, the first restores the original
        assert_eq!(
            blends,
            vec![
                BlendMode::Additive,
                BlendMode::Multiply,
                BlendMode::Additive,
                BlendMode::Alpha
            ]
        );
    }

    #[test]
    fn display_transform_includes_action_offsets() {
        let mut scene = Scene::new();
        let (mut frame, _) = new_frame();
        let root = scene.root();
        let child = scene.create_node_named("child");
        scene.add_child(root, child);
        scene.set_local_position(child, Vec2::new(10.0, 0.0));
        scene.flush();
        scene.add_render_action(
            root,
            Box::new(LetterboxAction::new(
                Vec2::new(100.0, 100.0),
                Vec2::new(200.0, 200.0),
            )),
        );

        scene.render(&mut frame);

        let display = scene.node(child).unwrap().display_matrix();
        let p = translation_of(&display);
        assert_relative_eq!(p.x, 20.0);
        assert_relative_eq!(p.y, 0.0);
        // the logical world transform is unaffected by render-action offsets
        let world = scene.global_position(child);
        assert_relative_eq!(world.x, 10.0);
    }

    #[test]
    fn detached_subtrees_can_be_assembled_before_attaching() {
        let mut scene = Scene::new();
        let root = scene.root();
        let sub_root = scene.create_node_named("sub");
        let leaf = scene.create_node_named("leaf");
        scene.add_child(sub_root, leaf);
        scene.flush();

        assert_eq!(scene.node(sub_root).unwrap().children(), &[leaf]);
        assert!(!scene.node(leaf).unwrap().is_in_tree());

        scene.add_child(root, sub_root);
        scene.flush();
        assert!(scene.node(leaf).unwrap().is_in_tree());
    }

    /// Starts an update walk from inside its own removal hook
    struct WalkOnRemoved {
        log: Log,
    }

    impl Component for WalkOnRemoved {
        fn on_removed(&mut self, scene: &mut Scene, _: ComponentRef) {
            self.log.borrow_mut().push("walk attempted".to_string());
            scene.update(0.016);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn walks_inside_queue_drain_are_rejected() {
        let mut scene = Scene::new();
        let log = new_log();
        let root = scene.root();
        let watcher = scene.create_node_named("watcher");
        let target = scene.create_node_named("target");
        scene.add_child(root, watcher);
        scene.add_child(root, target);
        scene.add_component(watcher, Probe::new("w", &log));
        let cid = scene
            .add_component(target, WalkOnRemoved { log: log.clone() })
            .unwrap();
        scene.flush();
        log.borrow_mut().clear();

        scene.remove_component(cid);
        scene.apply_changes();

        // the hook ran, but its nested walk was a logged no-op: nothing
        // ticked while containers were mid-drain
        let log = entries(&log);
        assert!(log.contains(&"walk attempted".to_string()));
        assert!(!log.contains(&"w update".to_string()));
    }
}
