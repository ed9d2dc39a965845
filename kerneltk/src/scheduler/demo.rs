//! A reference priority policy helper, not part of the generic core.
//!
//! The core deliberately never decides what "more important" means — that's
//! entirely up to a [`SchedOps`](super::SchedOps) implementation supplied by
//! the embedder. This module is not such an implementation; it's one
//! reusable piece an embedder writing a fixed-priority policy is likely to
//! want, grounded in the teacher's own concrete scheduler's task-scan helper:
//! "find the most important active task after `previous`, preferring the
//! earliest one in wraparound order on a tie." An embedder is free to use
//! this, adapt it, or ignore it entirely; nothing in `scheduler::scheduler`
//! calls it.

use crate::scheduler::policy::Priority;
use crate::scheduler::{Scheduler, TaskHandle};

/// Scans every active task in `scheduler`, returning the one judged most
/// important by `priority_of`, preferring (on a tie) whichever comes first
/// when walking forward from `previous` and wrapping around.
///
/// `previous` need not currently be active or even a valid handle; it is
/// only used to establish a scan order, the same role it plays in the
/// teacher's own `priority_scan`.
pub fn priority_scan(
    scheduler: &Scheduler,
    previous: Option<TaskHandle>,
    priority_of: impl Fn(&Scheduler, TaskHandle) -> Priority,
) -> Option<TaskHandle> {
    let tasks: alloc::vec::Vec<(TaskHandle, &crate::scheduler::task::Task)> =
        scheduler.tasks().iter().collect();
    if tasks.is_empty() {
        return None;
    }

    let start_index = previous
        .and_then(|p| tasks.iter().position(|(h, _)| *h == p))
        .map(|i| (i + 1) % tasks.len())
        .unwrap_or(0);

    let mut best: Option<(TaskHandle, Priority)> = None;
    for offset in 0..tasks.len() {
        let (handle, task) = tasks[(start_index + offset) % tasks.len()];
        if !task.is_active() {
            continue;
        }
        let priority = priority_of(scheduler, handle);
        match best {
            Some((_, best_priority)) if priority <= best_priority => {}
            _ => best = Some((handle, priority)),
        }
    }
    best.map(|(handle, _)| handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scheduler_has_no_candidate() {
        let sched = Scheduler::new();
        assert_eq!(priority_scan(&sched, None, |_, _| 0), None);
    }

    #[test]
    fn picks_the_highest_priority_active_task() {
        use crate::scheduler::policy::SchedOps;

        struct NullPolicy;
        impl SchedOps for NullPolicy {
            fn registered(&mut self, _s: &Scheduler, _t: TaskHandle) {}
            fn unregistered(&mut self, _s: &Scheduler, _t: TaskHandle) {}
            fn stopped(&mut self, _s: &Scheduler, _t: TaskHandle) {}
            fn resumed(&mut self, _s: &Scheduler, _t: TaskHandle) {}
            fn override_taken(&mut self, _s: &Scheduler, _p: crate::scheduler::PrimHandle, _t: TaskHandle) {}
            fn override_released(&mut self, _s: &Scheduler, _p: crate::scheduler::PrimHandle, _t: TaskHandle) {}
            fn task_priority_updated(&mut self, _s: &Scheduler, _t: TaskHandle) {}
            fn get_task_priority(&self, _s: &Scheduler, _t: TaskHandle) -> Priority {
                0
            }
            fn get_prim_priority(&self, _s: &Scheduler, _p: crate::scheduler::PrimHandle) -> Priority {
                0
            }
            fn schedule(&self, _s: &Scheduler, _i: TaskHandle, _c: TaskHandle) -> bool {
                false
            }
            fn assign_all(&mut self, _s: &mut Scheduler) {}
            fn assign_one(&mut self, _s: &mut Scheduler, _thread: crate::scheduler::ThreadHandle) {}
        }

        let mut sched = Scheduler::new();
        let mut ops = NullPolicy;
        let process = sched.register_process();
        let low = sched.register_task(&mut ops, process).unwrap();
        let high = sched.register_task(&mut ops, process).unwrap();

        let chosen = priority_scan(&sched, None, |_, t| if t == high { 10 } else { 1 });
        assert_eq!(chosen, Some(high));
        let _ = low;
    }
}
