//! First-fit memory space simulator
//!
//! This crate models `malloc`/`free` over an abstract address space using two
//! singly-linked lists of address ranges instead of a real heap:
//! - Pooled linked lists whose nodes live in an index-addressed arena
//! - First-fit allocation with block splitting and recycling
//! - Order-dependent coalescing of adjacent free ranges
//! - Optional statistics and operation tracking

#![no_std]

extern crate alloc;

use core::fmt;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// The error type used by lists and memory spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Invalid `length` (e.g. zero-sized request or block).
    InvalidParam,
    /// A list index outside the range accepted by the operation.
    IndexOutOfBounds { index: usize, len: usize },
    /// Free an address that is not the base of an allocated block.
    NotAllocated { addr: usize },
    /// Remove a value that is not in the list.
    ValueNotFound,
    /// Remove through an absent node handle.
    NullNode,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParam => write!(f, "invalid memory block size"),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {} out of bounds for list of length {}", index, len)
            }
            Self::NotAllocated { addr } => write!(
                f,
                "memory block with base address {} not found in allocated list",
                addr
            ),
            Self::ValueNotFound => write!(f, "value not found in list"),
            Self::NullNode => write!(f, "cannot remove an absent node"),
        }
    }
}

impl core::error::Error for AllocError {}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

pub mod block;
pub use block::MemoryBlock;

pub mod list;
pub use list::{ListNode, NodeId, NodePool, PoolStats, PooledList};

pub mod space;
pub use space::MemorySpace;

pub mod stats;
#[cfg(feature = "tracking")]
pub use stats::OpCounters;
pub use stats::SpaceStats;
