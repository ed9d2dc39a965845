//! The synchronization primitive: the scheduler's generic building block
//! that [`Mutex`](super::Mutex) and [`Semaphore`](super::Semaphore) are thin
//! wrappers over.
//!
//! A primitive does not know whether it's a mutex or a semaphore; it only
//! knows how many tasks currently own it, who is stopped waiting for it, and
//! which single task (if any) it is overriding. The wrappers layer
//! mutual-exclusion and counting semantics on top of this shared shape, the
//! same way the C original keeps one `struct sprimitive` underneath both.

use alloc::vec::Vec;

use super::{ProcessHandle, TaskHandle};

pub struct Primitive {
    pub process: ProcessHandle,
    /// Count of tasks currently holding this primitive. Tracked as a bare
    /// cardinality rather than a link set by design (spec.md §9): this loses
    /// the ability to enumerate which tasks own a given primitive, but a
    /// mutex only ever needs the count to be 0 or 1 and a semaphore only
    /// ever needs it compared against its capacity — neither needs the
    /// enumeration this would otherwise buy.
    pub owning_tasks: u32,
    /// The single task this primitive currently overrides, if any (at most
    /// one — invariant 3). This is the mutex/semaphore's notion of "who
    /// currently holds this for priority-inheritance purposes", kept
    /// separate from `owning_tasks` because the two can disagree: a counted
    /// semaphore takes ownership without ever placing an override.
    pub overridden: Option<TaskHandle>,
    /// Tasks stopped waiting on this primitive, in the order they stopped
    /// (so a mutex's handoff can hand off to the longest waiter, and a
    /// semaphore's release can wake the next in line).
    pub stopped: Vec<TaskHandle>,
    /// Set whenever the stopped list, the owning-task count or the
    /// overridden task changes, mirroring
    /// [`Task::updated`](super::task::Task::updated): the scheduler's
    /// update-propagation walk clears this once the owning task's priority
    /// has been recomputed to account for it.
    pub updated: bool,
}

impl Primitive {
    pub fn new(process: ProcessHandle) -> Self {
        Primitive {
            process,
            owning_tasks: 0,
            overridden: None,
            stopped: Vec::new(),
            updated: false,
        }
    }

    pub fn is_owned(&self) -> bool {
        self.owning_tasks > 0
    }

    pub fn mark_updated(&mut self) {
        self.updated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::scheduler::process::Process;

    #[test]
    fn new_primitive_is_unowned() {
        let mut processes: Arena<Process> = Arena::new();
        let proc_handle = processes.insert(Process::new());
        let prim = Primitive::new(proc_handle);
        assert!(!prim.is_owned());
        assert!(prim.stopped.is_empty());
        assert_eq!(prim.overridden, None);
    }
}
