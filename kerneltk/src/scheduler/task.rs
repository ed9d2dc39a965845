//! The task: the unit the scheduler actually schedules.
//!
//! A task never stores its own priority — concrete priority is entirely a
//! policy concern (see [`super::policy::SchedOps`]). What the task *does*
//! own is the bookkeeping the generic core needs regardless of policy: a
//! count of primitives it currently holds, the set of primitives that
//! override it (and so contribute to whatever its effective priority ends
//! up being once the policy is asked), which primitive (if any) it is
//! stopped on, and whether its priority-relevant state has changed since the
//! policy last looked.

use alloc::vec::Vec;

use super::{PrimHandle, ProcessHandle, ThreadHandle};

/// A task's run eligibility, independent of priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Eligible to run, modulo whatever the policy's scheduling hook says.
    Active,
    /// Not eligible to run. `stopper` names the one primitive this task is
    /// stopped on — a task can only ever be stopped on one primitive at a
    /// time (invariant: `stopper.is_some()` iff `status == Stopped`).
    Stopped,
}

pub struct Task {
    pub process: ProcessHandle,
    pub thread: Option<ThreadHandle>,
    pub status: TaskStatus,
    /// The primitive this task is currently stopped on, if any.
    pub stopper: Option<PrimHandle>,
    /// Count of primitives this task currently owns (mutexes held,
    /// semaphore slots taken). Tracked as a bare cardinality, not an
    /// enumerable set — see
    /// [`Primitive::owning_tasks`](super::prim::Primitive::owning_tasks).
    pub owned_count: u32,
    /// Primitives that have placed a priority override on this task, in the
    /// order they were placed. The effective override a task experiences is
    /// whatever the policy's `get_task_priority` hook decides to make of
    /// this list — the core just keeps it correct.
    pub overriders: Vec<PrimHandle>,
    /// The commit index this task was last stamped with, i.e. the last
    /// commit in which it was (re)marked active. Compared against
    /// `Scheduler::commit_index` for an O(1) "is this task in the current
    /// active set" check, alongside the authoritative `Scheduler::actives`
    /// list.
    pub commit: u64,
    /// Set whenever this task's priority-relevant state changes (a
    /// primitive it owns gains or loses a waiter, an override lands or
    /// lifts) and cleared once the policy has been told about it via
    /// `task_priority_updated`. Lets a commit batch many changes and notify
    /// the policy once per task instead of once per edge in the graph.
    pub updated: bool,
}

impl Task {
    pub fn new(process: ProcessHandle) -> Self {
        Task {
            process,
            thread: None,
            status: TaskStatus::Active,
            stopper: None,
            owned_count: 0,
            overriders: Vec::new(),
            commit: 0,
            updated: false,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, TaskStatus::Active)
    }

    pub fn overrides(&self) -> usize {
        self.overriders.len()
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
    fn new_task_is_active_with_no_bookkeeping() {
        let mut processes: Arena<Process> = Arena::new();
        let proc_handle = processes.insert(Process::new());
        let task = Task::new(proc_handle);
        assert!(task.is_active());
        assert_eq!(task.stopper, None);
        assert_eq!(task.owned_count, 0);
        assert!(task.overriders.is_empty());
        assert!(!task.updated);
    }
}
