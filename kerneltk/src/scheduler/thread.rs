//! A thread: the scheduler's notion of an execution context a policy
//! assigns tasks onto. Most embeddings have exactly one (a single core), but
//! nothing in the core assumes that.

use alloc::vec::Vec;

use super::TaskHandle;

pub struct Thread {
    /// The task currently assigned to run on this thread, if the policy has
    /// assigned one since the last commit.
    pub current: Option<TaskHandle>,
    /// Tasks previously assigned to this thread, most recent last, kept so
    /// a policy's `assign_one`/`assign_all` hooks can make scheduling
    /// decisions that depend on recent history (round-robin among equals,
    /// for instance).
    pub history: Vec<TaskHandle>,
    /// The commit index this thread was last stamped with by
    /// `Scheduler::assign_thread`.
    pub commit: u64,
}

impl Thread {
    pub fn new() -> Self {
        Thread {
            current: None,
            history: Vec::new(),
            commit: 0,
        }
    }

    pub fn assign(&mut self, task: Option<TaskHandle>) {
        if let Some(previous) = self.current.take() {
            self.history.push(previous);
        }
        self.current = task;
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}
