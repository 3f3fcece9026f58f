//! Pooled singly-linked lists
//!
//! This module provides the list machinery the memory space is built on:
//! - An index-addressed node pool shared by several lists
//! - Singly-linked lists with positional and value-based operations
//! - Order-preserving in-place coalescing of neighbouring nodes

pub mod node_pool;
pub mod pooled_list;

pub use node_pool::{ListNode, NodeId, NodePool, PoolStats};
pub use pooled_list::{ListDisplay, PooledList, PooledListIter};
