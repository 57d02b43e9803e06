//! Slot-backed doubly linked list.
//!
//! Nodes live in a vector and link to each other by [`SlotId`], so a caller
//! holding an id can unlink that node in O(1) without pointer juggling.
//! Freed slots are recycled.
//!
//! ```text
//!   slots: [ Some(A: prev=None, next=2) | None (free) | Some(B: prev=0, next=None) ]
//!   head ─► [0] ◄──► [2] ◄── tail
//! ```

/// Stable handle to a node of a [`KeyList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

#[derive(Debug)]
pub struct KeyList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl<T> Default for KeyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KeyList<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn front_id(&self) -> Option<SlotId> {
        self.head
    }

    pub fn back_id(&self) -> Option<SlotId> {
        self.tail
    }

    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|id| self.get(id))
    }

    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.node(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .map(|node| &mut node.value)
    }

    /// Id of the node after `id`.
    pub fn next_id(&self, id: SlotId) -> Option<SlotId> {
        self.node(id).and_then(|node| node.next)
    }

    // == Push Back ==
    pub fn push_back(&mut self, value: T) -> SlotId {
        let id = self.alloc(Node {
            value,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.set_next(tail, Some(id)),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    // == Push Front ==
    pub fn push_front(&mut self, value: T) -> SlotId {
        let id = self.alloc(Node {
            value,
            prev: None,
            next: self.head,
        });
        match self.head {
            Some(head) => self.set_prev(head, Some(id)),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        id
    }

    // == Insert After ==
    /// Links a new node right after `anchor`. Returns `None` if `anchor` is
    /// not in the list.
    pub fn insert_after(&mut self, anchor: SlotId, value: T) -> Option<SlotId> {
        let next = self.node(anchor)?.next;
        let id = self.alloc(Node {
            value,
            prev: Some(anchor),
            next,
        });
        self.set_next(anchor, Some(id));
        match next {
            Some(next) => self.set_prev(next, Some(id)),
            None => self.tail = Some(id),
        }
        Some(id)
    }

    // == Remove ==
    /// Unlinks `id` and returns its value; the slot is recycled.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let node = self.slots.get_mut(id.0)?.take()?;
        match node.prev {
            Some(prev) => self.set_next(prev, node.next),
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.set_prev(next, node.prev),
            None => self.tail = node.prev,
        }
        self.free.push(id.0);
        self.len -= 1;
        Some(node.value)
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.head.and_then(|id| self.remove(id))
    }

    /// Iterates values from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut current = self.head;
        std::iter::from_fn(move || {
            let node = self.node(current?)?;
            current = node.next;
            Some(&node.value)
        })
    }

    fn node(&self, id: SlotId) -> Option<&Node<T>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn alloc(&mut self, node: Node<T>) -> SlotId {
        self.len += 1;
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                SlotId(index)
            }
            None => {
                self.slots.push(Some(node));
                SlotId(self.slots.len() - 1)
            }
        }
    }

    fn set_next(&mut self, id: SlotId, next: Option<SlotId>) {
        if let Some(Some(node)) = self.slots.get_mut(id.0) {
            node.next = next;
        }
    }

    fn set_prev(&mut self, id: SlotId, prev: Option<SlotId>) {
        if let Some(Some(node)) = self.slots.get_mut(id.0) {
            node.prev = prev;
        }
    }
}
