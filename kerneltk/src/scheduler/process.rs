//! A process: the container a set of tasks and primitives are registered
//! under, and the unit that pause/resume operates on.

use alloc::vec::Vec;

use super::{PrimHandle, TaskHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    /// Paused by a call to `Scheduler::pause_process`; every task belonging
    /// to the process is stopped, and `resume_process` must undo exactly
    /// that stop, not any stop a task separately accumulated.
    Paused,
}

pub struct Process {
    pub status: ProcessStatus,
    pub tasks: Vec<TaskHandle>,
    pub primitives: Vec<PrimHandle>,
    /// The process's own built-in primitive, used by `pause_process` /
    /// `resume_process` to stop and resume its tasks. `None` only between
    /// `Process::new` and `Scheduler::register_process` finishing — every
    /// process reachable through the scheduler has one.
    pub pause_prim: Option<PrimHandle>,
}

impl Process {
    pub fn new() -> Self {
        Process {
            status: ProcessStatus::Running,
            tasks: Vec::new(),
            primitives: Vec::new(),
            pause_prim: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.status, ProcessStatus::Paused)
    }
}

impl Default for Process {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_process_is_running_and_empty() {
        let process = Process::new();
        assert!(!process.is_paused());
        assert!(process.tasks.is_empty());
        assert!(process.primitives.is_empty());
    }
}
