//! A priority-ordered multiset backed by a binary heap.
//!
//! Elements come out in non-decreasing priority order. Duplicate priorities are kept, and
//! the relative order of elements sharing a priority is unspecified: it depends on the
//! heap's internal layout and may change after any insertion or removal.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Anything that carries an ordering priority. Lower values come first.
pub trait Prioritized {
    /// Ordering key of this element.
    fn priority(&self) -> i32;
}

/// Heap slot ordered by priority only, inverted so the max-heap yields the minimum.
#[derive(Debug, Clone)]
struct Slot<T>(T);

impl<T: Prioritized> PartialEq for Slot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority() == other.0.priority()
    }
}

impl<T: Prioritized> Eq for Slot<T> {}

impl<T: Prioritized> PartialOrd for Slot<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Prioritized> Ord for Slot<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.priority().cmp(&self.0.priority())
    }
}

/// Ordered multiset with `O(log n)` insertion and `O(n)` removal by value.
///
/// Removal matches on the element's own equality, not on its priority, so an element can
/// be removed without knowing where it sits in the order.
#[derive(Debug, Clone)]
pub struct PrioritySet<T> {
    heap: BinaryHeap<Slot<T>>,
}

impl<T: Prioritized> Default for PrioritySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Prioritized> PrioritySet<T> {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { heap: BinaryHeap::new() }
    }

    /// Creates an empty set with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { heap: BinaryHeap::with_capacity(capacity) }
    }

    /// Adds `value`, keeping any equal elements already present.
    pub fn insert(&mut self, value: T) {
        self.heap.push(Slot(value));
    }

    /// Removes one element equal to `value`. Returns whether anything was removed.
    pub fn remove<Q: ?Sized>(&mut self, value: &Q) -> bool
    where
        T: PartialEq<Q>,
    {
        self.remove_where(|element| element == value).is_some()
    }

    /// Removes and returns the first element, in heap layout order, matching `predicate`.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        if !self.heap.iter().any(|slot| predicate(&slot.0)) {
            return None;
        }

        let mut slots = std::mem::take(&mut self.heap).into_vec();
        let index = slots.iter().position(|slot| predicate(&slot.0));
        let removed = index.map(|index| slots.swap_remove(index).0);
        self.heap = BinaryHeap::from(slots);
        removed
    }

    /// The element with the lowest priority, if any.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.heap.peek().map(|slot| &slot.0)
    }

    /// Removes and returns the element with the lowest priority.
    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|slot| slot.0)
    }

    /// Number of elements, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the set holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Iterates in non-decreasing priority order.
    ///
    /// The iterator extracts from its own copy of the heap, so the set may be modified while
    /// it is alive without disturbing what it yields.
    #[must_use]
    pub fn iter(&self) -> Ordered<T>
    where
        T: Clone,
    {
        Ordered { heap: self.heap.clone() }
    }
}

impl<T: Prioritized> FromIterator<T> for PrioritySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self { heap: iter.into_iter().map(Slot).collect() }
    }
}

impl<T: Prioritized> Extend<T> for PrioritySet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.heap.extend(iter.into_iter().map(Slot));
    }
}

impl<T: Prioritized> IntoIterator for PrioritySet<T> {
    type Item = T;
    type IntoIter = Ordered<T>;

    fn into_iter(self) -> Self::IntoIter {
        Ordered { heap: self.heap }
    }
}

/// Iterator yielding elements by repeated extraction of the minimum.
#[derive(Debug)]
pub struct Ordered<T> {
    heap: BinaryHeap<Slot<T>>,
}

impl<T: Prioritized> Iterator for Ordered<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.heap.pop().map(|slot| slot.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.heap.len(), Some(self.heap.len()))
    }
}

impl<T: Prioritized> ExactSizeIterator for Ordered<T> {}

impl<T: Prioritized> std::iter::FusedIterator for Ordered<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Job {
        name: &'static str,
        priority: i32,
    }

    impl Prioritized for Job {
        fn priority(&self) -> i32 {
            self.priority
        }
    }

    const fn job(name: &'static str, priority: i32) -> Job {
        Job { name, priority }
    }

    fn priorities(set: &PrioritySet<Job>) -> Vec<i32> {
        set.iter().map(|j| j.priority).collect()
    }

    #[test]
    fn test_iterates_in_non_decreasing_order() {
        let jobs = [job("d", 40), job("b", 20), job("a", 10), job("c", 20), job("e", 100)];
        let set: PrioritySet<_> = jobs.into_iter().collect();

        assert_eq!(priorities(&set), vec![10, 20, 20, 40, 100]);
        assert_eq!(set.len(), 5, "iteration must not consume the set");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut set = PrioritySet::new();
        set.insert(job("a", 1));
        set.insert(job("a", 1));
        set.insert(job("b", 1));

        assert_eq!(set.len(), 3);
        assert!(set.remove(&job("a", 1)));
        assert_eq!(set.len(), 2);
        assert!(set.remove(&job("a", 1)));
        assert!(!set.remove(&job("a", 1)));
        assert_eq!(set.iter().map(|j| j.name).collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_remove_ignores_position() {
        let mut set: PrioritySet<_> = (0..50).map(|i| job("filler", i)).collect();
        set.insert(job("target", 25));

        let removed = set.remove_where(|j| j.name == "target");
        assert_eq!(removed, Some(job("target", 25)));
        assert_eq!(priorities(&set), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut set: PrioritySet<_> = [job("a", 3), job("b", 1)].into_iter().collect();
        assert!(!set.remove(&job("z", 3)));
        assert_eq!(priorities(&set), vec![1, 3]);
    }

    #[test]
    fn test_removal_during_iteration_keeps_order() {
        let mut set: PrioritySet<_> =
            [job("a", 5), job("b", 1), job("c", 3), job("d", 4)].into_iter().collect();

        let mut seen = Vec::new();
        for j in set.iter() {
            seen.push(j.priority);
            set.remove(&j);
            set.insert(job("late", 2));
        }

        assert_eq!(seen, vec![1, 3, 4, 5]);
        assert_eq!(priorities(&set), vec![2, 2, 2, 2]);
    }

    #[test]
    fn test_peek_and_pop_extract_minimum() {
        let mut set: PrioritySet<_> =
            [job("b", 7), job("a", -3), job("c", 12)].into_iter().collect();

        assert_eq!(set.peek().map(|j| j.name), Some("a"));
        assert_eq!(set.pop().map(|j| j.priority), Some(-3));
        assert_eq!(set.pop().map(|j| j.priority), Some(7));
        assert_eq!(set.into_iter().map(|j| j.priority).collect::<Vec<_>>(), vec![12]);
    }

    #[test]
    fn test_extend_and_clear() {
        let mut set = PrioritySet::with_capacity(4);
        set.extend([job("x", 2), job("y", 1)]);
        assert_eq!(priorities(&set), vec![1, 2]);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.iter().len(), 0);
    }
}
