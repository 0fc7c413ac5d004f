//! Linked Slab Module
//!
//! An arena of slots threaded into a doubly-linked list by index.
//! Every operation is O(1); freed slots are recycled.

// == Slot ==
#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Linked Slab ==
/// Doubly-linked list stored in a `Vec`, addressed by slot index.
///
/// - Front = most recently pushed
/// - Back = oldest
#[derive(Debug)]
pub struct LinkedSlab<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for LinkedSlab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LinkedSlab<T> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts a value at the front and returns its slot index.
    pub fn push_front(&mut self, value: T) -> usize {
        let slot = Slot {
            value: Some(value),
            prev: None,
            next: self.head,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };

        match self.head {
            Some(old_head) => self.slots[old_head].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;
        idx
    }

    // == Remove ==
    /// Unlinks the slot and returns its value.
    ///
    /// Returns None for a vacant or out-of-range index.
    pub fn remove(&mut self, idx: usize) -> Option<T> {
        let value = self.slots.get_mut(idx)?.value.take()?;
        self.unlink(idx);
        self.free.push(idx);
        self.len -= 1;
        Some(value)
    }

    // == Move To Front ==
    /// Relinks an occupied slot at the front.
    pub fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) || self.get(idx).is_none() {
            return;
        }

        self.unlink(idx);
        self.slots[idx].prev = None;
        self.slots[idx].next = self.head;
        if let Some(old_head) = self.head {
            self.slots[old_head].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    // == Back ==
    /// Returns the oldest slot and its value.
    pub fn back(&self) -> Option<(usize, &T)> {
        let idx = self.tail?;
        self.slots[idx].value.as_ref().map(|v| (idx, v))
    }

    /// Returns the newest slot and its value.
    pub fn front(&self) -> Option<(usize, &T)> {
        let idx = self.head?;
        self.slots[idx].value.as_ref().map(|v| (idx, v))
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.slots.get(idx)?.value.as_ref()
    }

    /// Iterates values from back (oldest) to front (newest).
    pub fn iter_from_back(&self) -> impl Iterator<Item = &T> + '_ {
        let mut cursor = self.tail;
        std::iter::from_fn(move || {
            let idx = cursor?;
            let slot = &self.slots[idx];
            cursor = slot.prev;
            slot.value.as_ref()
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }

        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn collect(slab: &LinkedSlab<&'static str>) -> Vec<&'static str> {
        slab.iter_from_back().copied().collect()
    }

    #[test]
    fn test_push_and_back() {
        let mut slab = LinkedSlab::new();
        slab.push_front("a");
        slab.push_front("b");
        slab.push_front("c");

        assert_eq!(slab.len(), 3);
        assert_eq!(slab.back().map(|(_, v)| *v), Some("a"));
        assert_eq!(slab.front().map(|(_, v)| *v), Some("c"));
        assert_eq!(collect(&slab), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_move_to_front() {
        let mut slab = LinkedSlab::new();
        let a = slab.push_front("a");
        slab.push_front("b");
        slab.push_front("c");

        slab.move_to_front(a);
        assert_eq!(collect(&slab), vec!["b", "c", "a"]);

        // Moving the head is a no-op
        slab.move_to_front(a);
        assert_eq!(collect(&slab), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_remove_middle_and_ends() {
        let mut slab = LinkedSlab::new();
        let a = slab.push_front("a");
        let b = slab.push_front("b");
        let c = slab.push_front("c");

        assert_eq!(slab.remove(b), Some("b"));
        assert_eq!(collect(&slab), vec!["a", "c"]);

        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.remove(c), Some("c"));
        assert!(slab.is_empty());
        assert!(slab.back().is_none());
    }

    #[test]
    fn test_remove_vacant_slot() {
        let mut slab = LinkedSlab::new();
        let a = slab.push_front("a");
        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.remove(a), None);
        assert_eq!(slab.remove(99), None);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut slab = LinkedSlab::new();
        let a = slab.push_front("a");
        slab.remove(a);
        let b = slab.push_front("b");

        assert_eq!(a, b);
        assert_eq!(slab.len(), 1);
        assert_eq!(collect(&slab), vec!["b"]);
    }
}
