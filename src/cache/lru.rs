//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.
//!
//! Keys live in a slab-backed doubly-linked list, so touching, removing and
//! evicting are all O(1). Callers hold on to the slot index returned by
//! [`LruTracker::push_front`] and pass it back for later updates.

// == Node ==
#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Newly pushed keys go to the head, so ties between keys touched at the
/// same instant are broken by insertion order.
#[derive(Debug)]
pub struct LruTracker<K> {
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts a new key as most recently used and returns its slot.
    pub fn push_front(&mut self, key: K) -> usize {
        let node = Node {
            key,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.link_front(slot);
        self.len += 1;
        slot
    }

    // == Touch ==
    /// Marks a slot as recently used (moves to head).
    pub fn touch(&mut self, slot: usize) {
        if self.head == Some(slot) || !self.is_live(slot) {
            return;
        }
        self.unlink(slot);
        self.link_front(slot);
    }

    // == Remove ==
    /// Removes a slot from the tracker, returning its key.
    pub fn remove(&mut self, slot: usize) -> Option<K> {
        if !self.is_live(slot) {
            return None;
        }
        self.unlink(slot);
        self.len -= 1;
        self.free.push(slot);
        self.nodes[slot].take().map(|node| node.key)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        let tail = self.tail?;
        self.remove(tail)
    }

    /// Returns the slot of the least recently used key.
    pub fn oldest_slot(&self) -> Option<usize> {
        self.tail
    }

    /// Returns the key stored in a slot.
    pub fn key(&self, slot: usize) -> Option<&K> {
        self.nodes.get(slot)?.as_ref().map(|node| &node.key)
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every tracked key.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn is_live(&self, slot: usize) -> bool {
        matches!(self.nodes.get(slot), Some(Some(_)))
    }

    fn link_front(&mut self, slot: usize) {
        let old_head = self.head;
        if let Some(node) = self.nodes[slot].as_mut() {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(head) = old_head.and_then(|h| self.nodes[h].as_mut()) {
            head.prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = match self.nodes[slot].as_ref() {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev.and_then(|p| self.nodes[p].as_mut()) {
            Some(prev_node) => prev_node.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.nodes[n].as_mut()) {
            Some(next_node) => next_node.prev = prev,
            None => self.tail = prev,
        }
    }
}
