//! A counting semaphore, layered over a [`Primitive`] the same way
//! [`Mutex`](super::Mutex) is — the difference is entirely in how "owned" is
//! interpreted: a semaphore compares the primitive's `owning_tasks` counter
//! against a fixed capacity rather than treating any ownership at all as
//! exclusive, and it never places a priority override (a counted semaphore
//! does not inherit, spec.md §4.7).

use super::err::{ReleaseOutcome, SchedError};
use super::policy::SchedOps;
use super::{PrimHandle, ProcessHandle, Scheduler, TaskHandle, ThreadHandle};

pub struct Semaphore {
    prim: PrimHandle,
    capacity: u32,
}

impl Semaphore {
    pub fn new(
        scheduler: &mut Scheduler,
        process: ProcessHandle,
        capacity: u32,
    ) -> Result<Self, SchedError> {
        let prim = scheduler.register_prim(process)?;
        Ok(Semaphore { prim, capacity })
    }

    pub fn prim(&self) -> PrimHandle {
        self.prim
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// The number of slots currently held, read straight off the
    /// primitive's ownership counter.
    pub fn held(&self, scheduler: &Scheduler) -> u32 {
        scheduler.primitives().get(self.prim).map(|p| p.owning_tasks).unwrap_or(0)
    }

    /// Takes a slot on behalf of `thread`'s current task if any are free
    /// (spec.md §4.7: "Take: if owning_tasks == N, stop_thread; else
    /// take_ownership"); no override is placed either way.
    pub fn take(
        &self,
        scheduler: &mut Scheduler,
        ops: &mut dyn SchedOps,
        thread: ThreadHandle,
    ) -> Result<bool, SchedError> {
        let owning_tasks = scheduler.primitives().get(self.prim).ok_or(SchedError::StaleHandle)?.owning_tasks;
        if owning_tasks >= self.capacity {
            scheduler.stop_thread(ops, self.prim, thread)?;
            Ok(false)
        } else {
            let task = scheduler
                .threads()
                .get(thread)
                .ok_or(SchedError::StaleHandle)?
                .current
                .ok_or(SchedError::Precondition)?;
            scheduler.take_ownership(self.prim, task)?;
            Ok(true)
        }
    }

    /// Non-blocking take: never stops the calling thread.
    pub fn take_nb(&self, scheduler: &mut Scheduler, task: TaskHandle) -> Result<bool, SchedError> {
        let owning_tasks = scheduler.primitives().get(self.prim).ok_or(SchedError::StaleHandle)?.owning_tasks;
        if owning_tasks >= self.capacity {
            Ok(false)
        } else {
            scheduler.take_ownership(self.prim, task)?;
            Ok(true)
        }
    }

    /// Releases a slot held by `task`, resuming (not re-granting to) the
    /// longest-waiting stopped task if any — the waiter must separately
    /// call `take` to actually acquire the freed slot, the same way a
    /// mutex's resumed waiter must call `lock` again.
    pub fn release(
        &self,
        scheduler: &mut Scheduler,
        ops: &mut dyn SchedOps,
        task: TaskHandle,
    ) -> Result<ReleaseOutcome, SchedError> {
        let outcome = scheduler.release_ownership(self.prim, task)?;
        if outcome == ReleaseOutcome::Released {
            let next_waiter = scheduler
                .primitives()
                .get(self.prim)
                .ok_or(SchedError::StaleHandle)?
                .stopped
                .first()
                .copied();
            if let Some(next) = next_waiter {
                scheduler.resume_task(ops, next)?;
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::policy::Priority;
    use crate::scheduler::Scheduler;

    struct NullPolicy;
    impl SchedOps for NullPolicy {
        fn registered(&mut self, _s: &Scheduler, _t: TaskHandle) {}
        fn unregistered(&mut self, _s: &Scheduler, _t: TaskHandle) {}
        fn stopped(&mut self, _s: &Scheduler, _t: TaskHandle) {}
        fn resumed(&mut self, _s: &Scheduler, _t: TaskHandle) {}
        fn override_taken(&mut self, _s: &Scheduler, _p: PrimHandle, _t: TaskHandle) {}
        fn override_released(&mut self, _s: &Scheduler, _p: PrimHandle, _t: TaskHandle) {}
        fn task_priority_updated(&mut self, _s: &Scheduler, _t: TaskHandle) {}
        fn get_task_priority(&self, _s: &Scheduler, _t: TaskHandle) -> Priority {
            0
        }
        fn get_prim_priority(&self, _s: &Scheduler, _p: PrimHandle) -> Priority {
            0
        }
        fn schedule(&self, _s: &Scheduler, _incumbent: TaskHandle, _candidate: TaskHandle) -> bool {
            false
        }
        fn assign_all(&mut self, _s: &mut Scheduler) {}
        fn assign_one(&mut self, _s: &mut Scheduler, _thread: ThreadHandle) {}
    }

    fn thread_running(sched: &mut Scheduler, task: TaskHandle) -> ThreadHandle {
        let thread = sched.register_thread();
        sched.assign_thread(thread, Some(task)).unwrap();
        thread
    }

    #[test]
    fn counting_semaphore_blocks_once_exhausted() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy;
        let process = sched.register_process();
        let a = sched.register_task(&mut ops, process).unwrap();
        let b = sched.register_task(&mut ops, process).unwrap();
        let a_thread = thread_running(&mut sched, a);
        let b_thread = thread_running(&mut sched, b);
        let sem = Semaphore::new(&mut sched, process, 1).unwrap();

        sched.open_commit().unwrap();
        assert!(sem.take(&mut sched, &mut ops, a_thread).unwrap());
        assert!(!sem.take(&mut sched, &mut ops, b_thread).unwrap());
        sched.close_commit(&mut ops).unwrap();

        assert_eq!(sem.held(&sched), 1);
        assert_eq!(sched.primitives().get(sem.prim()).unwrap().overridden, None);
    }

    #[test]
    fn release_resumes_the_next_waiter_without_granting_the_slot() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy;
        let process = sched.register_process();
        let a = sched.register_task(&mut ops, process).unwrap();
        let b = sched.register_task(&mut ops, process).unwrap();
        let a_thread = thread_running(&mut sched, a);
        let b_thread = thread_running(&mut sched, b);
        let sem = Semaphore::new(&mut sched, process, 1).unwrap();

        sched.open_commit().unwrap();
        sem.take(&mut sched, &mut ops, a_thread).unwrap();
        sem.take(&mut sched, &mut ops, b_thread).unwrap();
        sem.release(&mut sched, &mut ops, a).unwrap();
        sched.close_commit(&mut ops).unwrap();

        assert_eq!(sem.held(&sched), 0);
        assert!(sched.tasks().get(b).unwrap().is_active());
    }
}
