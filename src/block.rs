//! Memory block metadata
//!
//! Represents one contiguous range of the simulated address space.

use core::fmt;

use crate::{AllocError, AllocResult};

/// A contiguous address range `[base_addr, base_addr + length)`
///
/// `length` is never zero. Two blocks are equal when both fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryBlock {
    pub base_addr: usize,
    pub length: usize,
}

impl MemoryBlock {
    /// Create a new memory block
    ///
    /// Panics if `length` is zero or the range wraps past `usize::MAX`.
    pub const fn new(base_addr: usize, length: usize) -> Self {
        assert!(length > 0, "memory block length must be positive");
        assert!(
            base_addr.checked_add(length).is_some(),
            "memory block range overflows the address space"
        );
        Self { base_addr, length }
    }

    /// Create a new memory block, rejecting zero lengths and wrapping ranges
    pub const fn try_new(base_addr: usize, length: usize) -> AllocResult<Self> {
        if length == 0 || base_addr.checked_add(length).is_none() {
            return Err(AllocError::InvalidParam);
        }
        Ok(Self { base_addr, length })
    }

    /// One past the last address covered by this block
    pub const fn end(&self) -> usize {
        self.base_addr + self.length
    }

    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.base_addr && addr < self.end()
    }

    pub const fn overlaps(&self, other: &MemoryBlock) -> bool {
        self.base_addr < other.end() && other.base_addr < self.end()
    }

    /// Whether `other` starts exactly where this block ends
    pub const fn is_followed_by(&self, other: &MemoryBlock) -> bool {
        self.end() == other.base_addr
    }

    /// Grow this block over `next` if the two are contiguous
    ///
    /// Returns `true` when `next` has been absorbed.
    pub fn absorb(&mut self, next: &MemoryBlock) -> bool {
        if !self.is_followed_by(next) {
            return false;
        }
        self.length += next.length;
        true
    }

    /// Carve `length` units off the low end of this block
    ///
    /// Returns the carved block. The caller must ensure `length < self.length`
    /// so the remainder stays non-empty.
    pub(crate) fn split_front(&mut self, length: usize) -> MemoryBlock {
        debug_assert!(length > 0 && length < self.length);
        let front = MemoryBlock {
            base_addr: self.base_addr,
            length,
        };
        self.base_addr += length;
        self.length -= length;
        front
    }
}

impl fmt::Display for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} , {})", self.base_addr, self.length)
    }
}
