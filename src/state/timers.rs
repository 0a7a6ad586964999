//! Timer System - Deferred widget work on a virtual clock
//!
//! Widgets schedule small follow-ups: dismiss a toast, drop a ripple span,
//! focus an autofocus target on the next tick, hide a combobox list after
//! blur. Instead of threads, every task sits in a queue ordered by due time
//! and the host moves time forward with
//! [`Runtime::advance`](crate::Runtime::advance).
//!
//! Tasks due at the same instant run in scheduling order. A task scheduled
//! while others are running (for example a zero-delay follow-up) runs in the
//! same advance if it falls due within it.

use std::time::Duration;

use crate::types::NodeId;

/// Work a timer performs when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Remove the `show` class from a toast node.
    HideToast(NodeId),
    /// Focus an element.
    Focus(NodeId),
    /// Detach and release a node (ripple spans).
    RemoveNode(NodeId),
    /// Close a combobox list (the blur delay).
    HideCombobox { input: NodeId, list: NodeId },
}

/// Opaque timer handle for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    due: Duration,
    task: Task,
}

#[derive(Debug, Default, Clone)]
pub struct Timers {
    now: Duration,
    next_id: u64,
    queue: Vec<Timer>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `task` to run `delay` from now.
    pub fn schedule(&mut self, delay: Duration, task: Task) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.push(Timer {
            id,
            due: self.now + delay,
            task,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|t| t.id != id);
        self.queue.len() != before
    }

    /// Number of tasks waiting.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pop the earliest task due at or before `deadline`, moving the clock to
    /// its due time.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<Task> {
        let position = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= deadline)
            .min_by_key(|(_, t)| (t.due, t.id.0))
            .map(|(i, _)| i)?;
        let timer = self.queue.remove(position);
        self.now = self.now.max(timer.due);
        Some(timer.task)
    }

    /// Move the clock to `deadline` once every due task has run.
    pub fn settle(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(i: usize) -> NodeId {
        NodeId::new(i, 0)
    }

    #[test]
    fn test_due_order_and_ties() {
        let mut timers = Timers::new();
        timers.schedule(Duration::from_millis(300), Task::Focus(node(1)));
        timers.schedule(Duration::from_millis(100), Task::Focus(node(2)));
        timers.schedule(Duration::from_millis(100), Task::Focus(node(3)));

        let deadline = Duration::from_millis(200);
        assert_eq!(timers.pop_due(deadline), Some(Task::Focus(node(2))));
        assert_eq!(timers.pop_due(deadline), Some(Task::Focus(node(3))));
        assert_eq!(timers.pop_due(deadline), None);
        timers.settle(deadline);
        assert_eq!(timers.now(), deadline);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn test_schedule_relative_to_clock() {
        let mut timers = Timers::new();
        timers.settle(Duration::from_secs(5));
        timers.schedule(Duration::ZERO, Task::RemoveNode(node(4)));
        assert_eq!(
            timers.pop_due(Duration::from_secs(5)),
            Some(Task::RemoveNode(node(4)))
        );
    }

    #[test]
    fn test_cancel() {
        let mut timers = Timers::new();
        let id = timers.schedule(Duration::from_millis(10), Task::HideToast(node(1)));
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert_eq!(timers.pop_due(Duration::from_secs(1)), None);
    }
}
