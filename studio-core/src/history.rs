//! Linear undo/redo history over whole-state snapshots.
//!
//! Every mutation replaces the complete state. Committing after an undo
//! discards the undone future; there is no branch retention.

use std::collections::VecDeque;

/// Snapshot history with a movable pointer.
#[derive(Debug, Clone)]
pub struct History<T> {
    /// Snapshots, oldest first. Never empty.
    entries: VecDeque<T>,
    /// Index of the current snapshot.
    index: usize,
    /// Maximum number of snapshots kept (oldest dropped when exceeded).
    limit: Option<usize>,
}

impl<T: Clone + PartialEq> History<T> {
    /// Create a history holding a single initial snapshot.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            entries: VecDeque::from([initial]),
            index: 0,
            limit: None,
        }
    }

    /// Create a history that keeps at most `limit` snapshots (minimum 1).
    #[must_use]
    pub fn with_limit(initial: T, limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::new(initial)
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> &T {
        &self.entries[self.index]
    }

    /// Record a new snapshot.
    ///
    /// Returns `false` without touching the history when `next` equals the
    /// current snapshot.
    pub fn commit(&mut self, next: T) -> bool {
        if next == *self.current() {
            return false;
        }
        self.entries.truncate(self.index + 1);
        self.entries.push_back(next);
        self.index += 1;

        if let Some(limit) = self.limit {
            while self.entries.len() > limit {
                self.entries.pop_front();
                self.index -= 1;
            }
        }
        true
    }

    /// Record a snapshot computed from the current one.
    pub fn commit_with<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(self.current());
        self.commit(next)
    }

    /// Step back one snapshot. Returns whether the pointer moved.
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one snapshot. Returns whether the pointer moved.
    pub fn redo(&mut self) -> bool {
        if self.can_redo() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Whether an earlier snapshot exists.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Whether a later snapshot exists.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: a history holds at least one snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the current snapshot.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Discard all history and start over from `state`.
    pub fn reset(&mut self, state: T) {
        self.entries.clear();
        self.entries.push_back(state);
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_commit_advances_pointer() {
        let mut history = History::new(0);
        assert!(history.commit(1));
        assert!(history.commit(2));
        assert_eq!(*history.current(), 2);
        assert_eq!(history.len(), 3);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_equal_commit_is_noop() {
        let mut history = History::new(vec![1, 2]);
        assert!(!history.commit(vec![1, 2]));
        assert_eq!(history.len(), 1);
        assert!(!history.commit_with(Clone::clone));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_undo_redo_bounds() {
        let mut history = History::new("a");
        assert!(!history.undo());
        assert!(!history.redo());
        history.commit("b");
        assert!(history.undo());
        assert_eq!(*history.current(), "a");
        assert!(!history.undo());
        assert!(history.redo());
        assert_eq!(*history.current(), "b");
        assert!(!history.redo());
    }

    #[test]
    fn test_commit_after_undo_discards_future() {
        let mut history = History::new(0);
        history.commit(1);
        history.commit(2);
        history.undo();
        history.undo();
        history.commit(5);
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(*history.current(), 5);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit(0, 3);
        for i in 1..=5 {
            history.commit(i);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(*history.current(), 5);
        assert!(history.undo());
        assert!(history.undo());
        assert!(!history.undo());
        assert_eq!(*history.current(), 3);
    }

    #[test]
    fn test_reset() {
        let mut history = History::new(0);
        history.commit(1);
        history.reset(9);
        assert_eq!(*history.current(), 9);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[derive(Debug, Clone)]
    enum Step {
        Commit(u8),
        Undo,
        Redo,
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            any::<u8>().prop_map(Step::Commit),
            Just(Step::Undo),
            Just(Step::Redo),
        ]
    }

    proptest! {
        #[test]
        fn prop_undo_then_redo_restores_state(
            steps in prop::collection::vec(arb_step(), 0..40)
        ) {
            let mut history = History::new(0u8);
            for step in steps {
                match step {
                    Step::Commit(v) => { history.commit(v); }
                    Step::Undo => { history.undo(); }
                    Step::Redo => { history.redo(); }
                }
            }

            let before = *history.current();
            if history.undo() {
                prop_assert!(history.redo(), "redo must succeed right after undo");
                prop_assert_eq!(*history.current(), before);
            }
        }

        #[test]
        fn prop_equal_commit_never_grows(
            values in prop::collection::vec(any::<u8>(), 1..20)
        ) {
            let mut history = History::new(0u8);
            for v in values {
                history.commit(v);
                let len = history.len();
                let current = *history.current();
                prop_assert!(!history.commit(current));
                prop_assert_eq!(history.len(), len);
            }
        }
    }
}
