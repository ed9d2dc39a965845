//! The scheduler object itself: the arenas for tasks, primitives, processes
//! and threads, the single lock guarding all of them, and the commit window
//! that batches state changes before asking the policy to act on them.

use alloc::vec::Vec;

use crate::arena::Arena;

use super::err::{ReleaseOutcome, SchedError};
use super::policy::SchedOps;
use super::prim::Primitive;
use super::process::{Process, ProcessStatus};
use super::task::{Task, TaskStatus};
use super::thread::Thread;
use super::{PrimHandle, ProcessHandle, TaskHandle, ThreadHandle};

/// Whether the scheduler's single lock is currently held.
///
/// The original exposes a raw `sched_lock`/`sched_unlock` pair (a
/// non-blocking trylock, and an unlock that traps if called unlocked). The
/// idiomatic Rust shape for "a lock that must be released by whoever took
/// it" is an RAII guard, so `try_lock` returns one of these instead of a
/// bare bool — see DESIGN.md Open Question O1.
pub struct SchedulerGuard<'a> {
    scheduler: &'a mut Scheduler,
}

impl<'a> SchedulerGuard<'a> {
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        self.scheduler
    }

    pub fn scheduler(&self) -> &Scheduler {
        self.scheduler
    }
}

impl<'a> Drop for SchedulerGuard<'a> {
    fn drop(&mut self) {
        debug_assert!(self.scheduler.locked, "guard dropped with lock already clear");
        self.scheduler.locked = false;
    }
}

pub struct Scheduler {
    locked: bool,
    commit_open: bool,
    /// Monotonically increasing, bumped once per `open_commit`. Tasks and
    /// threads stamp themselves with the value in effect when they last
    /// became active, so "is this task currently active" can be answered in
    /// O(1) by comparing the stamp to this counter, alongside the
    /// authoritative `actives` list.
    commit_index: u64,
    /// The active-task set: every task not currently stopped, in no
    /// particular order. Authoritative; `Task::commit` is the O(1)-check
    /// shortcut derived from it, not a replacement for it.
    actives: Vec<TaskHandle>,
    pub(crate) tasks: Arena<Task>,
    pub(crate) primitives: Arena<Primitive>,
    pub(crate) processes: Arena<Process>,
    pub(crate) threads: Arena<Thread>,
    /// Tasks touched during the currently-open commit, so `close_commit`
    /// only has to walk the ones that actually changed instead of every
    /// live task.
    dirty_tasks: Vec<TaskHandle>,
    /// Primitives touched during the currently-open commit, so their
    /// `updated` flag can be cleared at close without walking every live
    /// primitive.
    dirty_prims: Vec<PrimHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            locked: false,
            commit_open: false,
            commit_index: 0,
            actives: Vec::new(),
            tasks: Arena::new(),
            primitives: Arena::new(),
            processes: Arena::new(),
            threads: Arena::new(),
            dirty_tasks: Vec::new(),
            dirty_prims: Vec::new(),
        }
    }

    /// Attempts to take the scheduler's single spinlock. Non-blocking: an
    /// embedder spinning on this in a busy-loop, or deferring to an
    /// interrupt-driven retry, is their choice to make, not this crate's.
    pub fn try_lock(&mut self) -> Result<SchedulerGuard<'_>, SchedError> {
        if self.locked {
            return Err(SchedError::WouldBlock);
        }
        self.locked = true;
        Ok(SchedulerGuard { scheduler: self })
    }

    pub fn tasks(&self) -> &Arena<Task> {
        &self.tasks
    }

    pub fn primitives(&self) -> &Arena<Primitive> {
        &self.primitives
    }

    pub fn processes(&self) -> &Arena<Process> {
        &self.processes
    }

    pub fn threads(&self) -> &Arena<Thread> {
        &self.threads
    }

    pub fn commit_index(&self) -> u64 {
        self.commit_index
    }

    /// Whether `task` is a member of the active-task set, checked in O(1)
    /// against its commit stamp rather than scanning `actives`.
    pub fn is_active(&self, task: TaskHandle) -> bool {
        self.tasks
            .get(task)
            .map(|t| t.is_active() && t.commit == self.commit_index)
            .unwrap_or(false)
    }

    pub fn actives(&self) -> &[TaskHandle] {
        &self.actives
    }

    /// Assigns `task` as `thread`'s current occupant (or clears it, for
    /// `None`), stamping the thread with the commit index in effect now.
    /// The one mutation path into `Thread::current` a policy's
    /// `assign_one`/`assign_all` implementation is expected to use, so the
    /// commit stamp spec.md §3 lists among a thread's attributes actually
    /// gets maintained.
    pub fn assign_thread(
        &mut self,
        thread: ThreadHandle,
        task: Option<TaskHandle>,
    ) -> Result<(), SchedError> {
        let commit_index = self.commit_index;
        let t = self.threads.get_mut(thread).ok_or(SchedError::StaleHandle)?;
        t.assign(task);
        t.commit = commit_index;
        Ok(())
    }

    // ---- commit window ----------------------------------------------

    /// Opens the commit window and bumps the commit index. All the
    /// mutating operations below require it open; `close_commit` is what
    /// actually runs the update-propagation walk and asks the policy to
    /// notice.
    pub fn open_commit(&mut self) -> Result<(), SchedError> {
        if self.commit_open {
            return Err(SchedError::WrongCommitState);
        }
        self.commit_open = true;
        self.commit_index += 1;
        Ok(())
    }

    /// Closes the commit window: walks every task touched since
    /// `open_commit`, calls `task_priority_updated` on each exactly once,
    /// clears their (and every touched primitive's) `updated` flags, and
    /// finally asks the policy to reassign threads now that priorities are
    /// current.
    pub fn close_commit(&mut self, ops: &mut dyn SchedOps) -> Result<(), SchedError> {
        if !self.commit_open {
            return Err(SchedError::WrongCommitState);
        }
        let dirty = core::mem::take(&mut self.dirty_tasks);
        for task in dirty {
            if self.tasks.get(task).map(|t| t.updated).unwrap_or(false) {
                ops.task_priority_updated(self, task);
                if let Some(t) = self.tasks.get_mut(task) {
                    t.updated = false;
                }
            }
        }
        let dirty_prims = core::mem::take(&mut self.dirty_prims);
        for prim in dirty_prims {
            if let Some(p) = self.primitives.get_mut(prim) {
                p.updated = false;
            }
        }
        ops.assign_all(self);
        self.commit_open = false;
        Ok(())
    }

    fn require_commit_open(&self) -> Result<(), SchedError> {
        if self.commit_open {
            Ok(())
        } else {
            Err(SchedError::WrongCommitState)
        }
    }

    fn mark_task_updated(&mut self, task: TaskHandle) -> bool {
        match self.tasks.get_mut(task) {
            Some(t) if !t.updated => {
                t.updated = true;
                self.dirty_tasks.push(task);
                true
            }
            _ => false,
        }
    }

    fn mark_prim_updated(&mut self, prim: PrimHandle) -> bool {
        match self.primitives.get_mut(prim) {
            Some(p) if !p.updated => {
                p.updated = true;
                self.dirty_prims.push(prim);
                true
            }
            _ => false,
        }
    }

    /// The update-propagation walk, starting at a task: marks it updated,
    /// then follows `task.stopper` to the primitive it's stopped on, marks
    /// that updated, follows the primitive's `overridden` task, and
    /// repeats. Stops at the first already-marked node or the first absent
    /// edge.
    fn propagate_update_from_task(&mut self, task: TaskHandle) {
        let mut current = task;
        loop {
            if !self.mark_task_updated(current) {
                return;
            }
            let stopper = match self.tasks.get(current) {
                Some(t) => t.stopper,
                None => return,
            };
            let prim = match stopper {
                Some(p) => p,
                None => return,
            };
            if !self.mark_prim_updated(prim) {
                return;
            }
            let overridden = match self.primitives.get(prim) {
                Some(p) => p.overridden,
                None => return,
            };
            match overridden {
                Some(next) => current = next,
                None => return,
            }
        }
    }

    /// The update-propagation walk, starting at a primitive: marks it
    /// updated, then continues the walk from the task it overrides, if any.
    fn propagate_update_from_prim(&mut self, prim: PrimHandle) {
        if !self.mark_prim_updated(prim) {
            return;
        }
        let overridden = match self.primitives.get(prim) {
            Some(p) => p.overridden,
            None => return,
        };
        if let Some(task) = overridden {
            self.propagate_update_from_task(task);
        }
    }

    fn check_same_process(&self, task: TaskHandle, prim: PrimHandle) -> Result<(), SchedError> {
        let t = self.tasks.get(task).ok_or(SchedError::StaleHandle)?;
        let p = self.primitives.get(prim).ok_or(SchedError::StaleHandle)?;
        if t.process != p.process {
            return Err(SchedError::CrossProcess);
        }
        Ok(())
    }

    // ---- registration --------------------------------------------------

    /// Registers a new process along with its built-in pause primitive
    /// (used by `pause_process`/`resume_process`).
    pub fn register_process(&mut self) -> ProcessHandle {
        let process = self.processes.insert(Process::new());
        let pause_prim = self.primitives.insert(Primitive::new(process));
        self.processes.get_mut(process).unwrap().pause_prim = Some(pause_prim);
        process
    }

    /// Requires the commit window open (spec.md §4.3): structural removal
    /// of a process is exactly the kind of change the commit batches.
    pub fn unregister_process(&mut self, process: ProcessHandle) -> Result<(), SchedError> {
        self.require_commit_open()?;
        let (pause_prim, empty) = {
            let p = self.processes.get(process).ok_or(SchedError::StaleHandle)?;
            (p.pause_prim, p.tasks.is_empty() && p.primitives.is_empty())
        };
        if !empty {
            return Err(SchedError::NotAMember);
        }
        if let Some(prim) = pause_prim {
            self.primitives.remove(prim);
        }
        self.processes.remove(process);
        Ok(())
    }

    pub fn register_thread(&mut self) -> ThreadHandle {
        self.threads.insert(Thread::new())
    }

    /// Requires the commit window open (spec.md §4.3).
    pub fn unregister_thread(&mut self, thread: ThreadHandle) -> Result<(), SchedError> {
        self.require_commit_open()?;
        self.threads.remove(thread).ok_or(SchedError::StaleHandle)?;
        Ok(())
    }

    /// Registers a new task belonging to `process`. Mirrors the original's
    /// `process_register_task` / `sched_register_task`.
    pub fn register_task(
        &mut self,
        ops: &mut dyn SchedOps,
        process: ProcessHandle,
    ) -> Result<TaskHandle, SchedError> {
        if !self.processes.contains(process) {
            return Err(SchedError::StaleHandle);
        }
        let mut task = Task::new(process);
        task.commit = self.commit_index;
        let handle = self.tasks.insert(task);
        self.processes.get_mut(process).unwrap().tasks.push(handle);
        self.actives.push(handle);
        ops.registered(self, handle);
        Ok(handle)
    }

    /// Unregisters `task`, performing the full composite cleanup spec.md
    /// §4.5 mandates rather than refusing when the task still owns
    /// primitives or overrides others: it always succeeds, reporting
    /// residual ownership back to the caller instead. Cleaning up a
    /// primitive a task still owned at unregistration time is the caller's
    /// responsibility, not the scheduler's.
    ///
    /// Returns `true` if the task still owned one or more primitives.
    pub fn unregister_task(
        &mut self,
        ops: &mut dyn SchedOps,
        task: TaskHandle,
    ) -> Result<bool, SchedError> {
        let (process, thread, stopper, overriders, owned_count) = {
            let t = self.tasks.get(task).ok_or(SchedError::StaleHandle)?;
            (t.process, t.thread, t.stopper, t.overriders.clone(), t.owned_count)
        };

        if stopper.is_some() {
            self.resume_task(ops, task)?;
        }
        self.actives.retain(|&h| h != task);
        for prim in overriders {
            self.unoverride_task(ops, prim)?;
        }
        if let Some(thread_handle) = thread {
            if let Some(th) = self.threads.get_mut(thread_handle) {
                if th.current == Some(task) {
                    th.current = None;
                }
            }
        }
        if let Some(proc_ref) = self.processes.get_mut(process) {
            proc_ref.tasks.retain(|&h| h != task);
        }
        ops.unregistered(self, task);
        self.tasks.remove(task);
        self.dirty_tasks.retain(|&h| h != task);
        if let Some(thread_handle) = thread {
            ops.assign_one(self, thread_handle);
        }
        Ok(owned_count != 0)
    }

    /// Registers a new primitive belonging to `process`. Fixes a bug in the
    /// C original, where `process_register_prim` sets the process's
    /// primitive count to zero on every registration instead of
    /// incrementing it (see DESIGN.md Open Question O2) — here the
    /// primitive simply joins `process.primitives`, so there's no separate
    /// counter to get wrong.
    pub fn register_prim(&mut self, process: ProcessHandle) -> Result<PrimHandle, SchedError> {
        if !self.processes.contains(process) {
            return Err(SchedError::StaleHandle);
        }
        let handle = self.primitives.insert(Primitive::new(process));
        self.processes.get_mut(process).unwrap().primitives.push(handle);
        Ok(handle)
    }

    /// Unregisters `prim`, performing the composite cleanup spec.md §4.5
    /// mandates: resumes every task stopped on it and lifts its override if
    /// it has one, rather than refusing. Returns `true` if the primitive
    /// still had one or more owning tasks.
    pub fn unregister_prim(
        &mut self,
        ops: &mut dyn SchedOps,
        prim: PrimHandle,
    ) -> Result<bool, SchedError> {
        let (process, stopped, overridden, owning_tasks) = {
            let p = self.primitives.get(prim).ok_or(SchedError::StaleHandle)?;
            (p.process, p.stopped.clone(), p.overridden, p.owning_tasks)
        };
        for task in stopped {
            self.resume_task(ops, task)?;
        }
        if overridden.is_some() {
            self.unoverride_task(ops, prim)?;
        }
        if let Some(proc_ref) = self.processes.get_mut(process) {
            proc_ref.primitives.retain(|&h| h != prim);
        }
        self.primitives.remove(prim);
        Ok(owning_tasks != 0)
    }

    // ---- primitive ownership / override graph --------------------------

    /// `task` takes ownership of `prim`: bumps the primitive's owning-task
    /// counter and the task's owned-primitive counter. Records no graph
    /// edge — ownership is tracked purely as cardinality (spec.md §9); a
    /// caller that also wants priority inheritance calls `override_task`
    /// alongside this, as `Mutex::lock` does.
    ///
    /// Requires `task` active and sharing a process with `prim`.
    pub fn take_ownership(&mut self, prim: PrimHandle, task: TaskHandle) -> Result<(), SchedError> {
        self.check_same_process(task, prim)?;
        if !self.tasks.get(task).ok_or(SchedError::StaleHandle)?.is_active() {
            return Err(SchedError::Precondition);
        }
        self.primitives.get_mut(prim).unwrap().owning_tasks += 1;
        self.tasks.get_mut(task).unwrap().owned_count += 1;
        Ok(())
    }

    /// `task` releases ownership of `prim`, decrementing both counters.
    /// Returns `ReleaseOutcome::Underflow` rather than erroring if either
    /// counter is already zero (spec.md §7: a 0/1 result, not a hard
    /// error) — counters alone can't distinguish "this task never owned it"
    /// from "somebody already released on its behalf", so this is reported
    /// as underflow either way.
    pub fn release_ownership(
        &mut self,
        prim: PrimHandle,
        task: TaskHandle,
    ) -> Result<ReleaseOutcome, SchedError> {
        let owning_tasks = self.primitives.get(prim).ok_or(SchedError::StaleHandle)?.owning_tasks;
        let owned_count = self.tasks.get(task).ok_or(SchedError::StaleHandle)?.owned_count;
        if owning_tasks == 0 || owned_count == 0 {
            return Ok(ReleaseOutcome::Underflow);
        }
        self.primitives.get_mut(prim).unwrap().owning_tasks -= 1;
        self.tasks.get_mut(task).unwrap().owned_count -= 1;
        Ok(ReleaseOutcome::Released)
    }

    /// Places `prim`'s priority override onto `task`: the actual
    /// priority-inheritance graph edge, primitive-mediated (spec.md §3/§4.4)
    /// rather than a flat task-to-task link. If `prim` already overrides a
    /// different task, that override is lifted first — a primitive
    /// overrides at most one task at a time.
    pub fn override_task(
        &mut self,
        ops: &mut dyn SchedOps,
        prim: PrimHandle,
        task: TaskHandle,
    ) -> Result<(), SchedError> {
        self.check_same_process(task, prim)?;
        if !self.tasks.get(task).ok_or(SchedError::StaleHandle)?.is_active() {
            return Err(SchedError::Precondition);
        }
        let previous = self.primitives.get(prim).ok_or(SchedError::StaleHandle)?.overridden;
        if previous == Some(task) {
            return Ok(());
        }
        if previous.is_some() {
            self.unoverride_task(ops, prim)?;
        }
        self.primitives.get_mut(prim).unwrap().overridden = Some(task);
        self.tasks.get_mut(task).unwrap().overriders.push(prim);
        self.propagate_update_from_task(task);
        ops.override_taken(self, prim, task);
        Ok(())
    }

    /// Lifts whatever override `prim` currently has in place, if any. A
    /// no-op if `prim` overrides nobody.
    pub fn unoverride_task(
        &mut self,
        ops: &mut dyn SchedOps,
        prim: PrimHandle,
    ) -> Result<(), SchedError> {
        let task = match self.primitives.get(prim).ok_or(SchedError::StaleHandle)?.overridden {
            Some(t) => t,
            None => return Ok(()),
        };
        self.primitives.get_mut(prim).unwrap().overridden = None;
        if let Some(t) = self.tasks.get_mut(task) {
            t.overriders.retain(|&h| h != prim);
        }
        self.propagate_update_from_task(task);
        ops.override_released(self, prim, task);
        Ok(())
    }

    /// Stops `task` on `prim`: it's now waiting. Adds it to the primitive's
    /// stopped list and marks the task stopped. Requires `task` active,
    /// sharing a process with `prim`, and not already stopped on anything
    /// (a task has at most one stopper at a time).
    pub fn stop_task(
        &mut self,
        ops: &mut dyn SchedOps,
        prim: PrimHandle,
        task: TaskHandle,
    ) -> Result<(), SchedError> {
        self.check_same_process(task, prim)?;
        {
            let t = self.tasks.get(task).ok_or(SchedError::StaleHandle)?;
            if !t.is_active() || t.stopper.is_some() {
                return Err(SchedError::Precondition);
            }
        }
        {
            let t = self.tasks.get_mut(task).unwrap();
            t.stopper = Some(prim);
            t.status = TaskStatus::Stopped;
        }
        self.actives.retain(|&h| h != task);
        {
            let p = self.primitives.get_mut(prim).unwrap();
            if !p.stopped.contains(&task) {
                p.stopped.push(task);
            }
            p.updated = true;
        }
        self.propagate_update_from_prim(prim);
        ops.stopped(self, task);
        Ok(())
    }

    /// Undoes `stop_task` for `task`: removes it from its stopper
    /// primitive's waiters, marks it active again, and adds it back to the
    /// active-task set. Requires `task` currently stopped.
    pub fn resume_task(&mut self, ops: &mut dyn SchedOps, task: TaskHandle) -> Result<(), SchedError> {
        let prim = {
            let t = self.tasks.get(task).ok_or(SchedError::StaleHandle)?;
            if t.is_active() {
                return Err(SchedError::Precondition);
            }
            t.stopper.ok_or(SchedError::Precondition)?
        };
        if let Some(p) = self.primitives.get_mut(prim) {
            p.stopped.retain(|&h| h != task);
            p.updated = true;
        }
        let commit_index = self.commit_index;
        {
            let t = self.tasks.get_mut(task).unwrap();
            t.stopper = None;
            t.status = TaskStatus::Active;
            t.commit = commit_index;
        }
        self.actives.push(task);
        self.propagate_update_from_prim(prim);
        ops.resumed(self, task);
        Ok(())
    }

    /// Stops `thread`'s current task via `stop_task` on `prim`, then asks
    /// the policy to assign `thread` a new occupant. Errors if `thread` has
    /// no current task — there is nothing for this operation to stop.
    pub fn stop_thread(
        &mut self,
        ops: &mut dyn SchedOps,
        prim: PrimHandle,
        thread: ThreadHandle,
    ) -> Result<(), SchedError> {
        let current = self
            .threads
            .get(thread)
            .ok_or(SchedError::StaleHandle)?
            .current
            .ok_or(SchedError::Precondition)?;
        self.stop_task(ops, prim, current)?;
        ops.assign_one(self, thread);
        Ok(())
    }

    // ---- process pause / resume -----------------------------------------

    /// Stops every active task belonging to `process` via its built-in
    /// pause primitive. Idempotent: a process already paused returns
    /// `Ok(())` without double-stopping its tasks. Requires the commit
    /// window open.
    pub fn pause_process(
        &mut self,
        ops: &mut dyn SchedOps,
        process: ProcessHandle,
    ) -> Result<(), SchedError> {
        self.require_commit_open()?;
        let (pause_prim, tasks) = {
            let p = self.processes.get(process).ok_or(SchedError::StaleHandle)?;
            if p.is_paused() {
                return Ok(());
            }
            (p.pause_prim.ok_or(SchedError::Precondition)?, p.tasks.clone())
        };
        self.processes.get_mut(process).unwrap().status = ProcessStatus::Paused;
        for task in tasks {
            let active = self.tasks.get(task).map(|t| t.is_active()).unwrap_or(false);
            if active {
                self.stop_task(ops, pause_prim, task)?;
            }
        }
        Ok(())
    }

    /// Resumes a paused process: resumes every task its pause primitive
    /// actually stopped (not every task in the process, since some may be
    /// stopped on something else entirely). Requires the commit window
    /// open.
    pub fn resume_process(
        &mut self,
        ops: &mut dyn SchedOps,
        process: ProcessHandle,
    ) -> Result<(), SchedError> {
        self.require_commit_open()?;
        let pause_prim = {
            let p = self.processes.get(process).ok_or(SchedError::StaleHandle)?;
            if !p.is_paused() {
                return Ok(());
            }
            p.pause_prim.ok_or(SchedError::Precondition)?
        };
        self.processes.get_mut(process).unwrap().status = ProcessStatus::Running;
        let stopped = self
            .primitives
            .get(pause_prim)
            .map(|p| p.stopped.clone())
            .unwrap_or_default();
        for task in stopped {
            self.resume_task(ops, task)?;
        }
        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::policy::Priority;

    /// A minimal policy for exercising the core: effective priority is just
    /// "one more than the number of overriders", and `assign_all`/
    /// `assign_one` record their calls but otherwise do nothing — the tests
    /// drive task/thread state directly rather than relying on assignment.
    struct NullPolicy {
        pub stop_events: Vec<TaskHandle>,
        pub resume_events: Vec<TaskHandle>,
    }

    impl NullPolicy {
        fn new() -> Self {
            NullPolicy {
                stop_events: Vec::new(),
                resume_events: Vec::new(),
            }
        }
    }

    impl SchedOps for NullPolicy {
        fn registered(&mut self, _s: &Scheduler, _t: TaskHandle) {}
        fn unregistered(&mut self, _s: &Scheduler, _t: TaskHandle) {}
        fn stopped(&mut self, _s: &Scheduler, t: TaskHandle) {
            self.stop_events.push(t);
        }
        fn resumed(&mut self, _s: &Scheduler, t: TaskHandle) {
            self.resume_events.push(t);
        }
        fn override_taken(&mut self, _s: &Scheduler, _p: PrimHandle, _t: TaskHandle) {}
        fn override_released(&mut self, _s: &Scheduler, _p: PrimHandle, _t: TaskHandle) {}
        fn task_priority_updated(&mut self, _s: &Scheduler, _t: TaskHandle) {}
        fn get_task_priority(&self, s: &Scheduler, t: TaskHandle) -> Priority {
            s.tasks.get(t).map(|task| task.overrides() as Priority + 1).unwrap_or(0)
        }
        fn get_prim_priority(&self, s: &Scheduler, p: PrimHandle) -> Priority {
            s.primitives
                .get(p)
                .map(|prim| prim.stopped.len() as Priority)
                .unwrap_or(0)
        }
        fn schedule(&self, _s: &Scheduler, _incumbent: TaskHandle, _candidate: TaskHandle) -> bool {
            false
        }
        fn assign_all(&mut self, _s: &mut Scheduler) {}
        fn assign_one(&mut self, _s: &mut Scheduler, _thread: ThreadHandle) {}
    }

    #[test]
    fn take_ownership_does_not_require_open_commit() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy::new();
        let process = sched.register_process();
        let task = sched.register_task(&mut ops, process).unwrap();
        let prim = sched.register_prim(process).unwrap();
        assert!(sched.take_ownership(prim, task).is_ok());
        assert_eq!(sched.primitives().get(prim).unwrap().owning_tasks, 1);
    }

    #[test]
    fn stop_on_owned_primitive_overrides_owner_via_the_primitive() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy::new();
        let process = sched.register_process();
        let owner = sched.register_task(&mut ops, process).unwrap();
        let waiter = sched.register_task(&mut ops, process).unwrap();
        let prim = sched.register_prim(process).unwrap();

        sched.take_ownership(prim, owner).unwrap();
        sched.override_task(&mut ops, prim, owner).unwrap();
        sched.open_commit().unwrap();
        sched.stop_task(&mut ops, prim, waiter).unwrap();
        sched.close_commit(&mut ops).unwrap();

        assert_eq!(sched.tasks.get(owner).unwrap().overriders, alloc::vec![prim]);
        assert_eq!(sched.primitives.get(prim).unwrap().stopped, alloc::vec![waiter]);
        assert_eq!(ops.stop_events, alloc::vec![waiter]);
    }

    #[test]
    fn resume_task_leaves_the_primitives_own_override_untouched() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy::new();
        let process = sched.register_process();
        let owner = sched.register_task(&mut ops, process).unwrap();
        let waiter = sched.register_task(&mut ops, process).unwrap();
        let prim = sched.register_prim(process).unwrap();

        sched.take_ownership(prim, owner).unwrap();
        sched.override_task(&mut ops, prim, owner).unwrap();
        sched.open_commit().unwrap();
        sched.stop_task(&mut ops, prim, waiter).unwrap();
        sched.resume_task(&mut ops, waiter).unwrap();
        sched.close_commit(&mut ops).unwrap();

        // Resuming the waiter doesn't lift the override the primitive
        // itself placed on the owner — only `unoverride_task` does that.
        assert_eq!(sched.tasks.get(owner).unwrap().overriders, alloc::vec![prim]);
        assert_eq!(ops.resume_events, alloc::vec![waiter]);
    }

    #[test]
    fn unregister_task_reports_residual_ownership_instead_of_failing() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy::new();
        let process = sched.register_process();
        let task = sched.register_task(&mut ops, process).unwrap();
        let prim = sched.register_prim(process).unwrap();
        sched.take_ownership(prim, task).unwrap();

        let residual = sched.unregister_task(&mut ops, task).unwrap();
        assert!(residual);
        assert!(!sched.tasks().contains(task));
    }

    #[test]
    fn unregister_prim_resumes_its_waiters_instead_of_failing() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy::new();
        let process = sched.register_process();
        let owner = sched.register_task(&mut ops, process).unwrap();
        let waiter = sched.register_task(&mut ops, process).unwrap();
        let prim = sched.register_prim(process).unwrap();
        sched.take_ownership(prim, owner).unwrap();

        sched.open_commit().unwrap();
        sched.stop_task(&mut ops, prim, waiter).unwrap();
        sched.close_commit(&mut ops).unwrap();
        assert!(!sched.tasks().get(waiter).unwrap().is_active());

        let residual = sched.unregister_prim(&mut ops, prim).unwrap();
        assert!(residual);
        assert!(sched.tasks().get(waiter).unwrap().is_active());
    }

    #[test]
    fn stop_thread_stops_its_current_task_and_requests_reassignment() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy::new();
        let process = sched.register_process();
        let task = sched.register_task(&mut ops, process).unwrap();
        let prim = sched.register_prim(process).unwrap();
        let thread = sched.register_thread();
        sched.assign_thread(thread, Some(task)).unwrap();

        sched.stop_thread(&mut ops, prim, thread).unwrap();
        assert!(!sched.tasks().get(task).unwrap().is_active());
        assert_eq!(ops.stop_events, alloc::vec![task]);
    }

    #[test]
    fn stop_thread_with_no_current_task_errors() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy::new();
        let process = sched.register_process();
        let prim = sched.register_prim(process).unwrap();
        let thread = sched.register_thread();

        assert_eq!(
            sched.stop_thread(&mut ops, prim, thread),
            Err(SchedError::Precondition)
        );
    }

    #[test]
    fn pause_then_resume_process_restores_activity() {
        let mut sched = Scheduler::new();
        let mut ops = NullPolicy::new();
        let process = sched.register_process();
        let task = sched.register_task(&mut ops, process).unwrap();

        sched.open_commit().unwrap();
        sched.pause_process(&mut ops, process).unwrap();
        sched.close_commit(&mut ops).unwrap();
        assert!(!sched.tasks.get(task).unwrap().is_active());

        sched.open_commit().unwrap();
        sched.resume_process(&mut ops, process).unwrap();
        sched.close_commit(&mut ops).unwrap();
        assert!(sched.tasks.get(task).unwrap().is_active());
    }

    #[test]
    fn try_lock_can_be_reacquired_once_guard_drops() {
        let mut sched = Scheduler::new();
        let guard = sched.try_lock().unwrap();
        drop(guard);
        assert!(sched.try_lock().is_ok());
    }
}
