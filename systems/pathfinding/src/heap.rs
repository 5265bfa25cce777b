//! Fixed-capacity indexed binary heap.
//!
//! The heap stores lightweight keys. Priorities and heap-index slots live in a
//! caller-owned [`HeapSlots`] table, which lets the search mutate a node's
//! costs in place and then resift it with [`PriorityHeap::update_item`].

use std::cmp::Ordering;

use thiserror::Error;

/// Raised when inserting into a heap that has reached its capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("priority heap is full ({capacity} items)")]
pub struct HeapFull {
    /// Capacity of the heap that refused the item.
    pub capacity: usize,
}

/// Which end of the comparator order sits at the root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeapOrder {
    /// Root holds the smallest item.
    #[default]
    Min,
    /// Root holds the largest item.
    Max,
}

/// Storage for per-key heap indices and priorities.
pub trait HeapSlots<K: Copy> {
    /// Heap index last recorded for `key`, if any.
    fn heap_index(&self, key: K) -> Option<usize>;

    /// Records the position of `key` inside the heap.
    fn set_heap_index(&mut self, key: K, index: usize);

    /// Total order between two keys.
    fn compare(&self, a: K, b: K) -> Ordering;
}

/// Array-backed binary heap with O(1) membership and in-place resifting.
#[derive(Clone, Debug)]
pub struct PriorityHeap<K> {
    items: Vec<K>,
    capacity: usize,
    order: HeapOrder,
}

impl<K: Copy + PartialEq> PriorityHeap<K> {
    /// Creates an empty heap bounded to `capacity` items.
    #[must_use]
    pub fn new(capacity: usize, order: HeapOrder) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            order,
        }
    }

    /// Maximum number of items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Reports whether the heap holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reports whether another insertion would be refused.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Drops every item. Slot tables are left untouched.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Best item without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<K> {
        self.items.first().copied()
    }

    /// Inserts `key` in O(log n).
    pub fn push<S: HeapSlots<K>>(&mut self, key: K, slots: &mut S) -> Result<(), HeapFull> {
        if self.is_full() {
            return Err(HeapFull {
                capacity: self.capacity,
            });
        }
        let index = self.items.len();
        self.items.push(key);
        slots.set_heap_index(key, index);
        let _ = self.sift_up(index, slots);
        Ok(())
    }

    /// Removes and returns the best item in O(log n).
    pub fn pop<S: HeapSlots<K>>(&mut self, slots: &mut S) -> Option<K> {
        let last = self.items.len().checked_sub(1)?;
        self.items.swap(0, last);
        let first = self.items.pop()?;
        if let Some(&root) = self.items.first() {
            slots.set_heap_index(root, 0);
            let _ = self.sift_down(0, slots);
        }
        Some(first)
    }

    /// Restores heap order after the priority of `key` changed.
    ///
    /// Does nothing when `key` is not stored in the heap.
    pub fn update_item<S: HeapSlots<K>>(&mut self, key: K, slots: &mut S) {
        let Some(index) = self.position(key, slots) else {
            return;
        };
        let settled = self.sift_up(index, slots);
        if settled == index {
            let _ = self.sift_down(index, slots);
        }
    }

    /// Reports whether `key` is stored, using its recorded heap index.
    #[must_use]
    pub fn contains<S: HeapSlots<K>>(&self, key: K, slots: &S) -> bool {
        self.position(key, slots).is_some()
    }

    /// Iterates stored keys in heap storage order.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.items.iter()
    }

    fn position<S: HeapSlots<K>>(&self, key: K, slots: &S) -> Option<usize> {
        let index = slots.heap_index(key)?;
        (self.items.get(index) == Some(&key)).then_some(index)
    }

    fn precedes<S: HeapSlots<K>>(&self, a: K, b: K, slots: &S) -> bool {
        let ordering = slots.compare(a, b);
        match self.order {
            HeapOrder::Min => ordering == Ordering::Less,
            HeapOrder::Max => ordering == Ordering::Greater,
        }
    }

    fn sift_up<S: HeapSlots<K>>(&mut self, mut index: usize, slots: &mut S) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.precedes(self.items[index], self.items[parent], slots) {
                break;
            }
            self.swap(index, parent, slots);
            index = parent;
        }
        index
    }

    fn sift_down<S: HeapSlots<K>>(&mut self, mut index: usize, slots: &mut S) -> usize {
        loop {
            let left = index * 2 + 1;
            let right = left + 1;
            if left >= self.items.len() {
                return index;
            }
            let mut best = left;
            if right < self.items.len() && self.precedes(self.items[right], self.items[left], slots)
            {
                best = right;
            }
            if !self.precedes(self.items[best], self.items[index], slots) {
                return index;
            }
            self.swap(index, best, slots);
            index = best;
        }
    }

    fn swap<S: HeapSlots<K>>(&mut self, a: usize, b: usize, slots: &mut S) {
        self.items.swap(a, b);
        slots.set_heap_index(self.items[a], a);
        slots.set_heap_index(self.items[b], b);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Table {
        priority: HashMap<u32, i32>,
        index: HashMap<u32, usize>,
    }

    impl HeapSlots<u32> for Table {
        fn heap_index(&self, key: u32) -> Option<usize> {
            self.index.get(&key).copied()
        }

        fn set_heap_index(&mut self, key: u32, index: usize) {
            let _ = self.index.insert(key, index);
        }

        fn compare(&self, a: u32, b: u32) -> Ordering {
            self.priority[&a]
                .cmp(&self.priority[&b])
                .then_with(|| a.cmp(&b))
        }
    }

    fn table(entries: &[(u32, i32)]) -> Table {
        let mut table = Table::default();
        for (key, priority) in entries {
            let _ = table.priority.insert(*key, *priority);
        }
        table
    }

    fn assert_heap_property(heap: &PriorityHeap<u32>, slots: &Table) {
        let items: Vec<u32> = heap.iter().copied().collect();
        for (index, key) in items.iter().enumerate() {
            assert_eq!(slots.heap_index(*key), Some(index));
            if index > 0 {
                let parent = items[(index - 1) / 2];
                assert!(!heap.precedes(*key, parent, slots));
            }
        }
    }

    #[test]
    fn pops_in_ascending_order_for_min_heap() {
        let entries = [(1, 50), (2, 10), (3, 40), (4, 30), (5, 20), (6, 60)];
        let mut slots = table(&entries);
        let mut heap = PriorityHeap::new(8, HeapOrder::Min);
        for (key, _) in entries {
            heap.push(key, &mut slots).expect("capacity");
            assert_heap_property(&heap, &slots);
        }

        let mut drained = Vec::new();
        while let Some(key) = heap.pop(&mut slots) {
            assert_heap_property(&heap, &slots);
            drained.push(key);
        }
        assert_eq!(drained, vec![2, 5, 4, 3, 1, 6]);
    }

    #[test]
    fn max_heap_keeps_largest_at_root() {
        let entries = [(1, 5), (2, 9), (3, 7)];
        let mut slots = table(&entries);
        let mut heap = PriorityHeap::new(3, HeapOrder::Max);
        for (key, _) in entries {
            heap.push(key, &mut slots).expect("capacity");
        }
        assert_eq!(heap.peek(), Some(2));
        assert_eq!(heap.pop(&mut slots), Some(2));
        assert_eq!(heap.pop(&mut slots), Some(3));
    }

    #[test]
    fn update_item_resifts_in_both_directions() {
        let entries = [(1, 10), (2, 20), (3, 30), (4, 40)];
        let mut slots = table(&entries);
        let mut heap = PriorityHeap::new(4, HeapOrder::Min);
        for (key, _) in entries {
            heap.push(key, &mut slots).expect("capacity");
        }

        let _ = slots.priority.insert(4, 1);
        heap.update_item(4, &mut slots);
        assert_heap_property(&heap, &slots);
        assert_eq!(heap.peek(), Some(4));

        let _ = slots.priority.insert(4, 99);
        heap.update_item(4, &mut slots);
        assert_heap_property(&heap, &slots);
        assert_eq!(heap.peek(), Some(1));
    }

    #[test]
    fn contains_tracks_membership_through_index_slots() {
        let entries = [(1, 3), (2, 1), (3, 2)];
        let mut slots = table(&entries);
        let mut heap = PriorityHeap::new(3, HeapOrder::Min);
        heap.push(1, &mut slots).expect("capacity");
        heap.push(2, &mut slots).expect("capacity");

        assert!(heap.contains(1, &slots));
        assert!(heap.contains(2, &slots));
        assert!(!heap.contains(3, &slots));

        assert_eq!(heap.pop(&mut slots), Some(2));
        assert!(!heap.contains(2, &slots));
        assert!(heap.contains(1, &slots));
    }

    #[test]
    fn full_heap_refuses_insertions() {
        let entries = [(1, 1), (2, 2)];
        let mut slots = table(&entries);
        let mut heap = PriorityHeap::new(1, HeapOrder::Min);
        heap.push(1, &mut slots).expect("capacity");
        assert!(heap.is_full());
        assert_eq!(heap.push(2, &mut slots), Err(HeapFull { capacity: 1 }));
        assert_eq!(heap.len(), 1);
    }
}
