use std::collections::VecDeque;

/// Fixed-capacity stack. Pushing past capacity silently drops the oldest
/// entry, so undo memory stays bounded however long the session runs.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Most recent entry, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_pushes_in_order() {
        for (capacity, pushes) in [(1, 5), (3, 4), (50, 51), (100, 1000)] {
            let mut history = BoundedHistory::new(capacity);
            for value in 0..pushes {
                history.push(value);
            }
            assert_eq!(history.count(), capacity);
            let kept = history.iter().copied().collect::<Vec<_>>();
            assert_eq!(kept, (pushes - capacity..pushes).collect::<Vec<_>>());
        }
    }

    #[test]
    fn pop_is_lifo_and_empty_pop_is_none() {
        let mut history = BoundedHistory::new(3);
        assert_eq!(history.pop(), None);
        history.push("a");
        history.push("b");
        assert_eq!(history.peek(), Some(&"b"));
        assert_eq!(history.pop(), Some("b"));
        assert_eq!(history.pop(), Some("a"));
        assert_eq!(history.pop(), None);
    }

    #[test]
    fn clear_empties_until_next_push() {
        let mut history = BoundedHistory::new(2);
        history.push(1);
        history.push(2);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.pop(), None);
        history.push(3);
        assert_eq!(history.pop(), Some(3));
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut history = BoundedHistory::new(0);
        history.push(1);
        assert_eq!(history.count(), 0);
        assert_eq!(history.capacity(), 0);
    }
}
