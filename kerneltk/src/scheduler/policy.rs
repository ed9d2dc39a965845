//! The policy vtable: every priority-bearing decision the core needs, asked
//! of an embedder-supplied implementation instead of baked in.
//!
//! The C original expresses this as a `struct sched_ops` of function
//! pointers, installed once and called through. A trait is the direct Rust
//! analogue, with one departure forced by the borrow checker: the core never
//! stores a `SchedOps` implementation inside [`Scheduler`](super::Scheduler)
//! itself (that would make every scheduler method take `&mut self` *and*
//! need to call back into a `&mut self` policy that might itself want to
//! read the scheduler — aliasing the compiler will refuse). Instead every
//! scheduler operation takes `ops: &mut dyn SchedOps` as an explicit
//! parameter, the same way the C functions take `struct sched_ops *ops`
//! explicitly rather than reading it off a global.
//!
//! All twelve hooks the original's `sched_ops` struct declares are kept,
//! even though the prose summary elsewhere describes "nine hooks" in
//! passing — the struct definition is ground truth (see DESIGN.md).

use super::{PrimHandle, Scheduler, TaskHandle};

/// An opaque, policy-defined priority value. The core never compares these
/// itself — it only ever asks the policy to compare, via `schedule` and
/// `assign_one`/`assign_all` deciding for themselves what "better" means.
pub type Priority = u32;

pub trait SchedOps {
    /// A task was just registered with the scheduler.
    fn registered(&mut self, scheduler: &Scheduler, task: TaskHandle);

    /// A task was just unregistered (and is about to be removed from the
    /// scheduler's arena).
    fn unregistered(&mut self, scheduler: &Scheduler, task: TaskHandle);

    /// A task transitioned into the stopped state.
    fn stopped(&mut self, scheduler: &Scheduler, task: TaskHandle);

    /// A task transitioned out of the stopped state.
    fn resumed(&mut self, scheduler: &Scheduler, task: TaskHandle);

    /// `prim` just placed a new priority override on `task` (because `prim`
    /// is now overriding whoever holds it, per the ownership/override
    /// graph).
    fn override_taken(&mut self, scheduler: &Scheduler, prim: PrimHandle, task: TaskHandle);

    /// The override `prim` previously placed on `task` was lifted.
    fn override_released(&mut self, scheduler: &Scheduler, prim: PrimHandle, task: TaskHandle);

    /// Called once per commit, for every task whose
    /// [`Task::updated`](super::task::Task::updated) flag was set, after the
    /// core has finished the update-propagation walk for this commit. This
    /// is the hook a policy uses to actually recompute and cache an
    /// effective priority, rather than doing so eagerly on every single
    /// graph edit.
    fn task_priority_updated(&mut self, scheduler: &Scheduler, task: TaskHandle);

    /// The effective priority of a task, for scheduling purposes.
    fn get_task_priority(&self, scheduler: &Scheduler, task: TaskHandle) -> Priority;

    /// The priority a primitive's waiters should be considered to contribute
    /// to its owner — typically the highest priority among
    /// `primitive.stopped`, but policy-defined.
    fn get_prim_priority(&self, scheduler: &Scheduler, prim: PrimHandle) -> Priority;

    /// Chooses which of two active, runnable tasks the core should consider
    /// "more important" when deciding who should occupy a thread. Returns
    /// `true` if `candidate` should displace `incumbent`.
    fn schedule(&self, scheduler: &Scheduler, incumbent: TaskHandle, candidate: TaskHandle) -> bool;

    /// Assigns every thread in the scheduler to whatever task the policy
    /// judges should run there, in one pass — called at commit close when
    /// the policy would rather decide holistically than thread-by-thread.
    fn assign_all(&mut self, scheduler: &mut Scheduler);

    /// Assigns a single thread to whatever task the policy judges should run
    /// there now — the cheaper alternative to `assign_all` for a policy
    /// that can reason about one thread in isolation.
    fn assign_one(&mut self, scheduler: &mut Scheduler, thread: super::ThreadHandle);
}
