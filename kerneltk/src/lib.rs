//! kerneltk: a priority-inheriting task scheduler and a relocatable ELF64
//! in-place loader, bundled as one toolkit.
//!
//! The two engines ([`scheduler`] and [`loader`]) are independent; they share
//! nothing but the small-integer error code convention in the `abi` crate.
//! See each module's documentation for its own design.
//!
//! # Algorithm naivety
//!
//! Like the kernel this crate's structure is modeled on, this toolkit favors
//! obviously-correct algorithms over clever ones: task/primitive membership
//! sets are small `Vec`s walked linearly rather than intrusive lists, because
//! the expected object counts (tasks, primitives, sections, symbols) are
//! small enough that this is never going to be the bottleneck, and linear
//! code is easy to get right and easy to debug.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
mod klog;

pub mod arena;
pub mod loader;
pub mod scheduler;
