//! Ordered index of idle resources.

use std::collections::BTreeSet;

/// Insertion slots of every `Idle` resource.
///
/// Slots are positions in the pool's seeding order, so the smallest member
/// is always the first-fit choice. Lookup is O(log n) instead of a scan.
#[derive(Debug, Clone, Default)]
pub struct IdleIndex {
    slots: BTreeSet<usize>,
}

impl IdleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest-seeded idle slot.
    #[inline]
    pub fn first(&self) -> Option<usize> {
        self.slots.first().copied()
    }

    #[inline]
    pub fn insert(&mut self, slot: usize) -> bool {
        self.slots.insert(slot)
    }

    #[inline]
    pub fn remove(&mut self, slot: usize) -> bool {
        self.slots.remove(&slot)
    }

    #[inline]
    pub fn contains(&self, slot: usize) -> bool {
        self.slots.contains(&slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_is_lowest_slot() {
        let mut idx = IdleIndex::new();
        idx.insert(2);
        idx.insert(0);
        idx.insert(1);
        assert_eq!(idx.first(), Some(0));
        idx.remove(0);
        assert!(!idx.contains(0));
        assert!(idx.contains(2));
        assert_eq!(idx.first(), Some(1));
    }

    #[test]
    fn reinsert_restores_order() {
        let mut idx = IdleIndex::new();
        for slot in 0..3 {
            idx.insert(slot);
        }
        for slot in 0..3 {
            idx.remove(slot);
        }
        assert!(idx.is_empty());
        assert_eq!(idx.first(), None);

        idx.insert(1);
        assert_eq!(idx.first(), Some(1));
        idx.insert(0);
        assert_eq!(idx.first(), Some(0));
        assert_eq!(idx.len(), 2);
        assert!(!idx.insert(0));
    }
}
