//! # Scheduler Port
//!
//! Deferred work (normalization, rendering, history commit) is requested
//! through [`Scheduler::defer`] instead of ambient timers, so hosts decide
//! when it runs and tests drive it with a [`VirtualClock`].
//!
//! Each task kind has one slot: deferring a kind that is already pending
//! replaces it, which both coalesces bursts and debounces the commit timer.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// Deferred work, in run priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    Normalize,
    Render,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

pub trait Scheduler {
    /// Run `task` once `delay` has elapsed, replacing a pending one
    fn defer(&mut self, task: Task, delay: Duration) -> TaskHandle;

    /// Returns whether the handle was still pending
    fn cancel(&mut self, handle: TaskHandle) -> bool;

    /// Remove and return every due task, in priority order
    fn take_due(&mut self) -> Vec<Task>;

    fn is_scheduled(&self, task: Task) -> bool;
}

/// One slot per task kind, keyed in priority order
#[derive(Debug)]
struct Agenda<T> {
    slots: BTreeMap<Task, (TaskHandle, T)>,
    next_handle: u64,
}

impl<T: Copy + PartialOrd> Agenda<T> {
    fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            next_handle: 0,
        }
    }

    fn defer(&mut self, task: Task, deadline: T) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        if let Some((previous, _)) = self.slots.insert(task, (handle, deadline)) {
            trace!(?task, ?previous, "Replaced pending task");
        }
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) -> bool {
        let task = self
            .slots
            .iter()
            .find(|(_, (pending, _))| *pending == handle)
            .map(|(task, _)| *task);
        task.and_then(|task| self.slots.remove(&task)).is_some()
    }

    fn take_due(&mut self, now: T) -> Vec<Task> {
        let due: Vec<Task> = self
            .slots
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(task, _)| *task)
            .collect();
        for task in &due {
            self.slots.remove(task);
        }
        due
    }

    fn next_deadline(&self) -> Option<T> {
        self.slots
            .values()
            .map(|(_, deadline)| *deadline)
            .fold(None, |earliest, deadline| match earliest {
                Some(current) if current <= deadline => Some(current),
                _ => Some(deadline),
            })
    }

    fn is_scheduled(&self, task: Task) -> bool {
        self.slots.contains_key(&task)
    }
}

/// Deterministic clock advanced by hand
#[derive(Debug)]
pub struct VirtualClock {
    now: Duration,
    agenda: Agenda<Duration>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            agenda: Agenda::new(),
        }
    }

    /// Time elapsed since creation
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Time until the earliest pending task is due
    pub fn until_next(&self) -> Option<Duration> {
        self.agenda
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(self.now))
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for VirtualClock {
    fn defer(&mut self, task: Task, delay: Duration) -> TaskHandle {
        self.agenda.defer(task, self.now + delay)
    }

    fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.agenda.cancel(handle)
    }

    fn take_due(&mut self) -> Vec<Task> {
        self.agenda.take_due(self.now)
    }

    fn is_scheduled(&self, task: Task) -> bool {
        self.agenda.is_scheduled(task)
    }
}

/// Wall-clock scheduler for real hosts
#[derive(Debug)]
pub struct SystemClock {
    agenda: Agenda<Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            agenda: Agenda::new(),
        }
    }

    /// How long a host loop may sleep before work is due
    pub fn until_next(&self) -> Option<Duration> {
        self.agenda
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for SystemClock {
    fn defer(&mut self, task: Task, delay: Duration) -> TaskHandle {
        self.agenda.defer(task, Instant::now() + delay)
    }

    fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.agenda.cancel(handle)
    }

    fn take_due(&mut self) -> Vec<Task> {
        self.agenda.take_due(Instant::now())
    }

    fn is_scheduled(&self, task: Task) -> bool {
        self.agenda.is_scheduled(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_tasks_come_in_priority_order() {
        let mut clock = VirtualClock::new();
        clock.defer(Task::Commit, Duration::ZERO);
        clock.defer(Task::Render, Duration::ZERO);
        clock.defer(Task::Normalize, Duration::ZERO);

        assert_eq!(clock.take_due(), vec![Task::Normalize, Task::Render, Task::Commit]);
        assert!(clock.take_due().is_empty());
    }

    #[test]
    fn test_redefer_restarts_the_window() {
        let mut clock = VirtualClock::new();
        let first = clock.defer(Task::Commit, Duration::from_millis(500));
        clock.advance(Duration::from_millis(400));
        clock.defer(Task::Commit, Duration::from_millis(500));
        clock.advance(Duration::from_millis(400));

        assert!(clock.take_due().is_empty());
        assert!(!clock.cancel(first));
        clock.advance(Duration::from_millis(100));
        assert_eq!(clock.take_due(), vec![Task::Commit]);
    }

    #[test]
    fn test_cancel_removes_pending_task() {
        let mut clock = VirtualClock::new();
        let handle = clock.defer(Task::Render, Duration::ZERO);
        assert!(clock.cancel(handle));
        assert!(!clock.is_scheduled(Task::Render));
        assert!(clock.take_due().is_empty());
    }

    #[test]
    fn test_until_next() {
        let mut clock = VirtualClock::new();
        assert_eq!(clock.until_next(), None);
        clock.defer(Task::Commit, Duration::from_millis(300));
        clock.defer(Task::Render, Duration::from_millis(10));
        assert_eq!(clock.until_next(), Some(Duration::from_millis(10)));
    }
}
