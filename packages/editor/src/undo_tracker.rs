//! # Undo/Redo Tracker
//!
//! Counts how many completed edits can be undone or redone.
//!
//! ## Design
//!
//! - The text editor owns the real undo history; this only gates affordances
//!   such as enabling the undo button
//! - Any new edit clears the redo count (linear history)
//! - Undo/redo never drive a counter below zero

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoTracker {
    undo_count: usize,
    redo_count: usize,
}

impl UndoTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed edit
    pub fn finish_action(&mut self) {
        self.redo_count = 0;
        self.undo_count += 1;
    }

    /// Record an undo; ignored when nothing can be undone
    pub fn undo_action(&mut self) {
        if self.undo_count > 0 {
            self.undo_count -= 1;
            self.redo_count += 1;
        }
    }

    /// Record a redo; ignored when nothing can be redone
    pub fn redo_action(&mut self) {
        if self.redo_count > 0 {
            self.redo_count -= 1;
            self.undo_count += 1;
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo_count > 0
    }

    pub fn can_redo(&self) -> bool {
        self.redo_count > 0
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_count
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_count
    }

    pub fn clear(&mut self) {
        self.undo_count = 0;
        self.redo_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_creation() {
        let tracker = UndoTracker::new();
        assert!(!tracker.can_undo());
        assert!(!tracker.can_redo());
    }

    #[test]
    fn test_three_actions_then_undo() {
        let mut tracker = UndoTracker::new();
        for _ in 0..3 {
            tracker.finish_action();
        }
        assert!(tracker.can_undo());
        assert_eq!(tracker.undo_levels(), 3);

        tracker.undo_action();
        tracker.undo_action();
        assert!(tracker.can_redo());
        assert_eq!(tracker.undo_levels(), 1);
        assert_eq!(tracker.redo_levels(), 2);

        tracker.undo_action();
        assert!(!tracker.can_undo());
    }

    #[test]
    fn test_new_action_clears_redo() {
        let mut tracker = UndoTracker::new();
        tracker.finish_action();
        tracker.finish_action();
        tracker.undo_action();
        assert!(tracker.can_redo());

        tracker.finish_action();
        assert!(!tracker.can_redo());
        assert_eq!(tracker.undo_levels(), 2);
    }

    #[test]
    fn test_counters_never_underflow() {
        let mut tracker = UndoTracker::new();
        tracker.undo_action();
        tracker.redo_action();
        assert_eq!(tracker, UndoTracker::new());

        tracker.finish_action();
        tracker.undo_action();
        tracker.redo_action();
        tracker.redo_action();
        assert_eq!(tracker.undo_levels(), 1);
        assert_eq!(tracker.redo_levels(), 0);
    }
}
