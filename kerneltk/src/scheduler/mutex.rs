//! A priority-inheriting mutex, built as a thin wrapper over a single
//! [`Primitive`].

use super::err::{SchedError, UnlockOutcome};
use super::policy::SchedOps;
use super::{PrimHandle, ProcessHandle, Scheduler, TaskHandle, ThreadHandle};

pub struct Mutex {
    prim: PrimHandle,
}

impl Mutex {
    pub fn new(scheduler: &mut Scheduler, process: ProcessHandle) -> Result<Self, SchedError> {
        let prim = scheduler.register_prim(process)?;
        Ok(Mutex { prim })
    }

    pub fn prim(&self) -> PrimHandle {
        self.prim
    }

    /// Locks on behalf of `thread`'s current task: if the mutex is already
    /// owned, stops the thread (spec.md §4.7: "Lock: if already owned,
    /// stop_thread"); otherwise takes ownership and places an override onto
    /// the new owner, so it inherits the priority of whoever is about to
    /// wait on it. Must be called with the commit window open.
    pub fn lock(
        &self,
        scheduler: &mut Scheduler,
        ops: &mut dyn SchedOps,
        thread: ThreadHandle,
    ) -> Result<bool, SchedError> {
        let owned = scheduler
            .primitives()
            .get(self.prim)
            .ok_or(SchedError::StaleHandle)?
            .is_owned();
        if owned {
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
            scheduler.override_task(ops, self.prim, task)?;
            Ok(true)
        }
    }

    /// Non-blocking lock attempt: returns `Ok(true)` on success, `Ok(false)`
    /// if already owned, touching no waiter bookkeeping either way.
    pub fn lock_nb(
        &self,
        scheduler: &mut Scheduler,
        ops: &mut dyn SchedOps,
        thread: ThreadHandle,
    ) -> Result<bool, SchedError> {
        let owned = scheduler
            .primitives()
            .get(self.prim)
            .ok_or(SchedError::StaleHandle)?
            .is_owned();
        if owned {
            Ok(false)
        } else {
            let task = scheduler
                .threads()
                .get(thread)
                .ok_or(SchedError::StaleHandle)?
                .current
                .ok_or(SchedError::Precondition)?;
            scheduler.take_ownership(self.prim, task)?;
            scheduler.override_task(ops, self.prim, task)?;
            Ok(true)
        }
    }

    /// Releases the mutex. Only releases ownership, lifts the override and
    /// resumes the longest waiter (the first entry in the primitive's
    /// stopped list) to `Active` — it does not hand ownership to that
    /// waiter directly (spec.md §8 scenario 1: the resumed task must
    /// separately call `lock` again to actually contend for it).
    pub fn unlock(
        &self,
        scheduler: &mut Scheduler,
        ops: &mut dyn SchedOps,
        task: TaskHandle,
    ) -> Result<UnlockOutcome, SchedError> {
        let prim = scheduler.primitives().get(self.prim).ok_or(SchedError::StaleHandle)?;
        if !prim.is_owned() {
            return Ok(UnlockOutcome::NotLocked);
        }
        if prim.overridden != Some(task) {
            return Ok(UnlockOutcome::NotOwner);
        }
        let next_waiter = prim.stopped.first().copied();

        scheduler.unoverride_task(ops, self.prim)?;
        match scheduler.release_ownership(self.prim, task)? {
            super::err::ReleaseOutcome::Underflow => return Ok(UnlockOutcome::Underflow),
            super::err::ReleaseOutcome::Released => {}
        }

        if let Some(next) = next_waiter {
            scheduler.resume_task(ops, next)?;
        }
        Ok(UnlockOutcome::Released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::policy::Priority;

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
    fn second_locker_is_stopped_and_overrides_owner() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy;
        let process = sched.register_process();
        let owner = sched.register_task(&mut ops, process).unwrap();
        let waiter = sched.register_task(&mut ops, process).unwrap();
        let owner_thread = thread_running(&mut sched, owner);
        let waiter_thread = thread_running(&mut sched, waiter);
        let mutex = Mutex::new(&mut sched, process).unwrap();

        sched.open_commit().unwrap();
        assert_eq!(mutex.lock(&mut sched, &mut ops, owner_thread).unwrap(), true);
        assert_eq!(mutex.lock(&mut sched, &mut ops, waiter_thread).unwrap(), false);
        sched.close_commit(&mut ops).unwrap();

        assert_eq!(sched.tasks().get(owner).unwrap().overriders, alloc::vec![mutex.prim()]);
        assert_eq!(sched.primitives().get(mutex.prim()).unwrap().overridden, Some(owner));
    }

    #[test]
    fn unlock_resumes_waiter_without_handing_off_ownership() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy;
        let process = sched.register_process();
        let owner = sched.register_task(&mut ops, process).unwrap();
        let waiter = sched.register_task(&mut ops, process).unwrap();
        let owner_thread = thread_running(&mut sched, owner);
        let waiter_thread = thread_running(&mut sched, waiter);
        let mutex = Mutex::new(&mut sched, process).unwrap();

        sched.open_commit().unwrap();
        mutex.lock(&mut sched, &mut ops, owner_thread).unwrap();
        mutex.lock(&mut sched, &mut ops, waiter_thread).unwrap();
        let outcome = mutex.unlock(&mut sched, &mut ops, owner).unwrap();
        sched.close_commit(&mut ops).unwrap();

        assert_eq!(outcome, UnlockOutcome::Released);
        assert_eq!(sched.primitives().get(mutex.prim()).unwrap().owning_tasks, 0);
        assert_eq!(sched.primitives().get(mutex.prim()).unwrap().overridden, None);
        assert!(sched.tasks().get(waiter).unwrap().is_active());
    }

    #[test]
    fn unlock_by_non_owner_is_rejected() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy;
        let process = sched.register_process();
        let owner = sched.register_task(&mut ops, process).unwrap();
        let bystander = sched.register_task(&mut ops, process).unwrap();
        let owner_thread = thread_running(&mut sched, owner);
        let mutex = Mutex::new(&mut sched, process).unwrap();

        sched.open_commit().unwrap();
        mutex.lock(&mut sched, &mut ops, owner_thread).unwrap();
        let outcome = mutex.unlock(&mut sched, &mut ops, bystander).unwrap();
        sched.close_commit(&mut ops).unwrap();

        assert_eq!(outcome, UnlockOutcome::NotOwner);
    }
}
