//! Bounded undo/redo over team roster snapshots.
//!
//! The timeline is linear: recording a new snapshot drops every redo entry.
//! Both stacks hold at most `max` entries; the undo stack evicts its oldest
//! snapshot, the redo stack its farthest one.

use std::collections::VecDeque;

/// Undo (`past`, newest at the back) and redo (`future`, next at the front).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    pub past: VecDeque<Vec<u32>>,
    pub future: VecDeque<Vec<u32>>,
}

fn push_capped(stack: &mut VecDeque<Vec<u32>>, snapshot: Vec<u32>, max: usize) {
    if max == 0 {
        return;
    }
    stack.push_back(snapshot);
    while stack.len() > max {
        stack.pop_front();
    }
}

impl History {
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Record the pre-mutation roster and clear the redo stack.
    pub fn record(&self, before: Vec<u32>, max: usize) -> History {
        let mut past = self.past.clone();
        push_capped(&mut past, before, max);
        History {
            past,
            future: VecDeque::new(),
        }
    }

    /// Returns the restored roster and the updated history, or `None` when
    /// there is nothing to undo.
    pub fn undo(&self, current: &[u32], max: usize) -> Option<(Vec<u32>, History)> {
        let mut past = self.past.clone();
        let restored = past.pop_back()?;
        let mut future = self.future.clone();
        if max > 0 {
            future.push_front(current.to_vec());
            future.truncate(max);
        }
        Some((restored, History { past, future }))
    }

    /// Returns the re-applied roster and the updated history, or `None` when
    /// there is nothing to redo.
    pub fn redo(&self, current: &[u32], max: usize) -> Option<(Vec<u32>, History)> {
        let mut future = self.future.clone();
        let restored = future.pop_front()?;
        let mut past = self.past.clone();
        push_capped(&mut past, current.to_vec(), max);
        Some((restored, History { past, future }))
    }
}
