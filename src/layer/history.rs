use std::collections::VecDeque;

use crate::gpu::Surface;

/// Snapshots kept per layer in each direction
pub const HISTORY_DEPTH: usize = 5;

/// Manages the bounded undo/redo snapshots of one layer
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    /// Pre-commit pixels, oldest first
    undo_stack: VecDeque<Surface>,
    /// Pixels replaced by an undo, most recent last
    redo_stack: VecDeque<Surface>,
    /// Absorbs snapshots evicted from the front of the undo queue
    baseline: Surface,
    depth: usize,
}

impl SnapshotHistory {
    /// Creates an empty history whose baseline is `initial`
    pub fn new(initial: Surface) -> Self {
        Self::with_depth(initial, HISTORY_DEPTH)
    }

    pub fn with_depth(initial: Surface, depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(depth + 1),
            redo_stack: VecDeque::with_capacity(depth + 1),
            baseline: initial,
            depth: depth.max(1),
        }
    }

    /// Records the state before a commit. Clears the redo queue.
    pub fn push(&mut self, snapshot: Surface) {
        self.undo_stack.push_back(snapshot);
        if self.undo_stack.len() > self.depth {
            if let Some(evicted) = self.undo_stack.pop_front() {
                log::trace!("undo queue full, evicting oldest snapshot into baseline");
                self.baseline = evicted;
            }
        }
        self.redo_stack.clear();
    }

    /// Swaps `current` with the most recent snapshot
    pub fn undo(&mut self, current: &mut Surface) -> bool {
        let Some(previous) = self.undo_stack.pop_back() else {
            return false;
        };
        let replaced = std::mem::replace(current, previous);
        self.redo_stack.push_back(replaced);
        if self.redo_stack.len() > self.depth {
            self.redo_stack.pop_front();
        }
        true
    }

    /// Re-applies the most recently undone state
    pub fn redo(&mut self, current: &mut Surface) -> bool {
        let Some(next) = self.redo_stack.pop_back() else {
            return false;
        };
        let replaced = std::mem::replace(current, next);
        self.undo_stack.push_back(replaced);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Oldest state still known, older than anything in the undo queue
    pub fn baseline(&self) -> &Surface {
        &self.baseline
    }

    /// Clear the history, keeping `current` as the new baseline
    pub fn clear(&mut self, current: &Surface) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.baseline = current.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::premultiplied;

    fn marked(value: u8) -> Surface {
        let mut surface = Surface::new(1, 1);
        surface.set(0, 0, premultiplied([value, 0, 0], 1.0));
        surface
    }

    fn mark(surface: &Surface) -> u8 {
        (surface.unmultiplied(0, 0)[0] * 255.0).round() as u8
    }

    #[test]
    fn test_depth_is_bounded_and_oldest_evicted() {
        let mut history = SnapshotHistory::new(marked(0));
        for i in 1..=8 {
            history.push(marked(i));
        }
        assert_eq!(history.undo_len(), HISTORY_DEPTH);
        assert_eq!(mark(history.baseline()), 3);

        let mut current = marked(9);
        let mut seen = Vec::new();
        while history.undo(&mut current) {
            seen.push(mark(&current));
        }
        assert_eq!(seen, vec![8, 7, 6, 5, 4]);
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = SnapshotHistory::new(marked(0));
        history.push(marked(1));
        let mut current = marked(2);
        assert!(history.undo(&mut current));
        assert!(history.can_redo());
        history.push(marked(1));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = SnapshotHistory::new(marked(0));
        history.push(marked(1));
        let mut current = marked(2);
        assert!(history.undo(&mut current));
        assert_eq!(mark(&current), 1);
        assert!(history.redo(&mut current));
        assert_eq!(mark(&current), 2);
        assert!(!history.redo(&mut current));
    }

    #[test]
    fn test_undo_empty_is_noop() {
        let mut history = SnapshotHistory::new(marked(0));
        let mut current = marked(5);
        assert!(!history.undo(&mut current));
        assert_eq!(mark(&current), 5);
    }
}
