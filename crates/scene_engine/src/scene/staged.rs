//! Deferred-mutation child containers
//!
//! A [`StagedList`] is an ordered element list plus a FIFO queue of pending
//! structural mutations. Game logic routinely adds or removes children while
//! the tree is being walked for update or render; mutating the list
//! mid-iteration would corrupt the traversal. Instead, every mutation is
//! recorded as a [`ModifyAction`] and the live list is only spliced when the
//! owner drains the queue between walks.
//!
//! The container is generic over the element key so the same protocol covers
//! child nodes and components. Owner-side policy (cycle validation, tree
//! entry/exit side effects) is supplied through [`StageHooks`] when the queue
//! is drained.

use std::collections::VecDeque;

/// A queued, not-yet-applied structural mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyAction<K> {
    /// Append an element at the end of the list
    Add(K),

    /// Insert an element at the front of the list
    AddAtTop(K),

    /// Insert an element at a signed offset from an existing anchor element
    AddRelative {
        /// Element to insert
        element: K,
        /// Existing member the insertion point is measured from
        anchor: K,
        /// Signed offset from the anchor's index
        offset: isize,
    },

    /// Remove an element from the list
    Remove(K),

    /// Re-splice an element by a signed offset, clamped to the list bounds
    Move {
        /// Element to move
        element: K,
        /// Signed index delta
        amount: isize,
    },

    /// Remove every element from the list
    Clear,
}

/// Owner-supplied policy hooks invoked while draining the pending queue
///
/// `prepare_add` validates a candidate and detaches it from any prior owner;
/// returning `false` rejects the insertion (the rejection reason is the
/// owner's to log). `handle_add` runs after the list splice, `handle_remove`
/// before it.
pub trait StageHooks<K> {
    /// Validate an element about to be inserted; reject by returning `false`
    fn prepare_add(&mut self, element: K) -> bool;

    /// Side effects after an element was inserted into the live list
    fn handle_add(&mut self, element: K);

    /// Side effects before an element is removed from the live list
    fn handle_remove(&mut self, element: K);
}

/// Ordered element list with a deferred-mutation queue
///
/// Insertion order is meaningful: it is update and draw order. The queue may
/// be appended to at any time; the element list changes only in
/// [`StagedList::apply_changes`].
#[derive(Debug, Clone)]
pub struct StagedList<K> {
    items: Vec<K>,
    queue: VecDeque<ModifyAction<K>>,
}

impl<K> Default for StagedList<K> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            queue: VecDeque::new(),
        }
    }
}

impl<K: Copy + PartialEq> StagedList<K> {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements in the live list (pending additions not counted)
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the live list is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The live elements in order
    pub fn as_slice(&self) -> &[K] {
        &self.items
    }

    /// Iterate the live elements in order
    pub fn iter(&self) -> std::slice::Iter<'_, K> {
        self.items.iter()
    }

    /// Whether an element is currently in the live list
    pub fn contains(&self, element: K) -> bool {
        self.items.contains(&element)
    }

    /// Index of an element in the live list
    pub fn index_of(&self, element: K) -> Option<usize> {
        self.items.iter().position(|e| *e == element)
    }

    /// Whether any mutations are waiting to be applied
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Iterate the elements of queued Add-family actions
    ///
    /// Searches treat these as virtual members so a lookup issued during a
    /// traversal still finds additions that have not been applied yet.
    pub fn pending_adds(&self) -> impl Iterator<Item = K> + '_ {
        self.queue.iter().filter_map(|action| match action {
            ModifyAction::Add(element)
            | ModifyAction::AddAtTop(element)
            | ModifyAction::AddRelative { element, .. } => Some(*element),
            _ => None,
        })
    }

    /// Queue an append at the end of the list
    pub fn queue_add(&mut self, element: K) {
        self.queue.push_back(ModifyAction::Add(element));
    }

    /// Queue an insertion at the front of the list
    pub fn queue_add_at_top(&mut self, element: K) {
        self.queue.push_back(ModifyAction::AddAtTop(element));
    }

    /// Queue an insertion relative to an existing element
    pub fn queue_add_relative(&mut self, element: K, anchor: K, offset: isize) {
        self.queue.push_back(ModifyAction::AddRelative {
            element,
            anchor,
            offset,
        });
    }

    /// Queue a removal
    pub fn queue_remove(&mut self, element: K) {
        self.queue.push_back(ModifyAction::Remove(element));
    }

    /// Queue a re-splice by a signed offset
    pub fn queue_move(&mut self, element: K, amount: isize) {
        self.queue.push_back(ModifyAction::Move { element, amount });
    }

    /// Queue removal of every element
    pub fn queue_clear(&mut self) {
        self.queue.push_back(ModifyAction::Clear);
    }

    /// Remove an element from the live list directly, without hooks
    ///
    /// Used by owners when an element changes containers: the new container's
    /// `prepare_add` detaches it from the old one.
    pub fn detach(&mut self, element: K) -> bool {
        match self.index_of(element) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Move another container's still-pending queue into this one
    ///
    /// While a drain is in progress the owner holds the container by value; a
    /// placeholder container collects any mutations queued by hooks, and its
    /// queue is absorbed when the drained container is put back.
    pub fn absorb_pending(&mut self, other: StagedList<K>) {
        debug_assert!(other.items.is_empty());
        self.queue.extend(other.queue);
    }

    /// Drain the pending queue, applying each action in FIFO order
    ///
    /// Rejected additions (vetoed by `prepare_add`) and removals or moves of
    /// non-members are skipped; an element re-added while already present is
    /// first detached from its current position so it never appears twice.
    pub fn apply_changes(&mut self, hooks: &mut impl StageHooks<K>) {
        let queue = std::mem::take(&mut self.queue);
        for action in queue {
            match action {
                ModifyAction::Add(element) => {
                    if hooks.prepare_add(element) {
                        self.detach(element);
                        self.items.push(element);
                        hooks.handle_add(element);
                    }
                }
                ModifyAction::AddAtTop(element) => {
                    if hooks.prepare_add(element) {
                        self.detach(element);
                        self.items.insert(0, element);
                        hooks.handle_add(element);
                    }
                }
                ModifyAction::AddRelative {
                    element,
                    anchor,
                    offset,
                } => {
                    if hooks.prepare_add(element) {
                        self.detach(element);
                        let index = match self.index_of(anchor) {
                            Some(anchor_index) => {
                                clamp_index(anchor_index as isize + offset, self.items.len())
                            }
                            None => {
                                log::warn!(
                                    "add-relative anchor is not in the container; appending"
                                );
                                self.items.len()
                            }
                        };
                        self.items.insert(index, element);
                        hooks.handle_add(element);
                    }
                }
                ModifyAction::Remove(element) => match self.index_of(element) {
                    Some(index) => {
                        hooks.handle_remove(element);
                        self.items.remove(index);
                    }
                    None => log::warn!("remove ignored: element is not in the container"),
                },
                ModifyAction::Move { element, amount } => match self.index_of(element) {
                    Some(from) => {
                        let to = clamp_index(from as isize + amount, self.items.len() - 1);
                        if to != from {
                            self.items.remove(from);
                            self.items.insert(to, element);
                        }
                    }
                    None => log::warn!("move ignored: element is not in the container"),
                },
                ModifyAction::Clear => {
                    let elements: Vec<K> = self.items.clone();
                    for element in elements {
                        hooks.handle_remove(element);
                    }
                    self.items.clear();
                }
            }
        }
    }
}

fn clamp_index(index: isize, max: usize) -> usize {
    index.clamp(0, max as isize) as usize
}
