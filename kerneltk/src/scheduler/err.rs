//! Scheduler error types.
//!
//! Kept as real enums rather than raw integers so call sites can `match`
//! exhaustively; the small-integer codes spec'd for `Mutex::unlock` and
//! `Scheduler::release_ownership` are produced from these via
//! [`abi::IntoCode`] at the boundary, not baked into the type itself.

use abi::{Code, IntoCode};

/// Errors common to the primitive ownership/override/stop graph operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// The handle named a task, primitive, process or thread no longer (or
    /// never) present in the scheduler's arenas.
    StaleHandle,
    /// The operation requires the commit window to be open (or closed) and
    /// it wasn't.
    WrongCommitState,
    /// A task and a primitive were presented together but don't share a
    /// process.
    CrossProcess,
    /// A precondition the core treats as a caller bug rather than an
    /// expected runtime condition was violated (an inactive task was
    /// stopped again, a thread with no current task was stopped, ...).
    Precondition,
    /// The scheduler's single spinlock was already held.
    WouldBlock,
    /// A process was to be unregistered but still has tasks or primitives
    /// registered under it.
    NotAMember,
}

impl IntoCode for SchedError {
    fn into_code(self) -> Code {
        match self {
            SchedError::StaleHandle => 1,
            SchedError::WrongCommitState => 2,
            SchedError::CrossProcess => 3,
            SchedError::Precondition => 4,
            SchedError::WouldBlock => 5,
            SchedError::NotAMember => 6,
        }
    }
}

impl core::fmt::Display for SchedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            SchedError::StaleHandle => "stale handle",
            SchedError::WrongCommitState => "wrong commit state",
            SchedError::CrossProcess => "task and primitive do not share a process",
            SchedError::Precondition => "precondition violated",
            SchedError::WouldBlock => "scheduler lock already held",
            SchedError::NotAMember => "process still has tasks or primitives registered",
        };
        f.write_str(s)
    }
}

/// The result of [`Mutex::unlock`](crate::scheduler::Mutex::unlock), named
/// the way spec.md §4.7 enumerates it: plain success, not locked at all, not
/// the current owner, and ownership-counter underflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Released,
    NotLocked,
    NotOwner,
    Underflow,
}

impl IntoCode for UnlockOutcome {
    fn into_code(self) -> Code {
        match self {
            UnlockOutcome::Released => 0,
            UnlockOutcome::NotLocked => 1,
            UnlockOutcome::NotOwner => 2,
            UnlockOutcome::Underflow => 3,
        }
    }
}

/// The two-way result of releasing ownership (spec.md §7: "ownership release
/// returns 0/1"): a plain release, or an underflow (releasing more than was
/// ever taken).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    Underflow,
}

impl IntoCode for ReleaseOutcome {
    fn into_code(self) -> Code {
        match self {
            ReleaseOutcome::Released => 0,
            ReleaseOutcome::Underflow => 1,
        }
    }
}
