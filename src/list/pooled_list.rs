//! Pooled linked list implementation using a shared node pool
//!
//! Provides singly-linked lists that draw nodes from a [`NodePool`], allowing
//! several lists to share one arena. A list only keeps head/tail/len; every
//! operation receives the pool explicitly.

use core::fmt;
use core::marker::PhantomData;

#[cfg(feature = "log")]
use log::error;

use super::node_pool::{NodeId, NodePool};
use crate::{AllocError, AllocResult};

/// Pooled linked list - uses nodes from a node pool
///
/// This maintains only the list structure (head/tail/len), while
/// all nodes are allocated from the pool.
pub struct PooledList<T> {
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> PooledList<T> {
    /// Create a new empty pooled list
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// First node of the list
    pub fn first(&self) -> Option<NodeId> {
        self.head
    }

    /// Last node of the list
    pub fn last(&self) -> Option<NodeId> {
        self.tail
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the length of the list
    pub fn len(&self) -> usize {
        self.len
    }

    fn next_of(pool: &NodePool<T>, id: NodeId) -> Option<NodeId> {
        pool.get_node(id).and_then(|node| node.next)
    }

    /// Walk `index` links from the head
    fn walk(&self, pool: &NodePool<T>, index: usize) -> Option<NodeId> {
        let mut current = self.head;
        for _ in 0..index {
            current = Self::next_of(pool, current?);
        }
        current
    }

    /// Get the node at `index`
    ///
    /// Accepts `index == len` and answers `None` for it, so a caller may ask
    /// for the position one past the tail. Anything beyond that is an error.
    pub fn get_node(&self, pool: &NodePool<T>, index: usize) -> AllocResult<Option<NodeId>> {
        if index > self.len {
            return Err(AllocError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(self.walk(pool, index))
    }

    /// Get the value at `index`
    pub fn get_value<'a>(&self, pool: &'a NodePool<T>, index: usize) -> AllocResult<&'a T> {
        let out_of_bounds = AllocError::IndexOutOfBounds {
            index,
            len: self.len,
        };
        if index >= self.len {
            return Err(out_of_bounds);
        }
        self.walk(pool, index)
            .and_then(|id| pool.get_node(id))
            .map(|node| &node.data)
            .ok_or(out_of_bounds)
    }

    /// Insert `data` before position `index`
    ///
    /// Insertion at `0` or `len` is O(1); interior insertion walks the list.
    pub fn add(&mut self, pool: &mut NodePool<T>, index: usize, data: T) -> AllocResult {
        if index > self.len {
            return Err(AllocError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        if index == 0 {
            self.push_front(pool, data);
            return Ok(());
        }
        if index == self.len {
            self.push_back(pool, data);
            return Ok(());
        }

        let prev_idx = self
            .walk(pool, index - 1)
            .ok_or(AllocError::IndexOutOfBounds {
                index,
                len: self.len,
            })?;
        let next_idx = Self::next_of(pool, prev_idx);

        let new_node_idx = pool.alloc_node(data);
        if let Some(node) = pool.get_node_mut(new_node_idx) {
            node.next = next_idx;
        }
        if let Some(prev_node) = pool.get_node_mut(prev_idx) {
            prev_node.next = Some(new_node_idx);
        }

        self.len += 1;
        Ok(())
    }

    /// Insert `data` at the head of the list
    pub fn push_front(&mut self, pool: &mut NodePool<T>, data: T) {
        let new_node_idx = pool.alloc_node(data);
        if let Some(node) = pool.get_node_mut(new_node_idx) {
            node.next = self.head;
        }

        self.head = Some(new_node_idx);
        if self.tail.is_none() {
            self.tail = Some(new_node_idx);
        }
        self.len += 1;
    }

    /// Append `data` at the tail of the list
    pub fn push_back(&mut self, pool: &mut NodePool<T>, data: T) {
        let new_node_idx = pool.alloc_node(data);

        match self.tail {
            Some(tail) => {
                if let Some(tail_node) = pool.get_node_mut(tail) {
                    tail_node.next = Some(new_node_idx);
                }
            }
            None => self.head = Some(new_node_idx),
        }

        self.tail = Some(new_node_idx);
        self.len += 1;
    }

    /// Pop an element from the front of the list
    pub fn pop_front(&mut self, pool: &mut NodePool<T>) -> Option<T> {
        let head_idx = self.head?;
        self.unlink(pool, head_idx, None)
    }

    /// Find the first node whose value matches `pred`
    ///
    /// Returns (node_idx, prev_idx) where prev_idx is the node before it (or None if head)
    pub fn find_with_prev<F>(
        &self,
        pool: &NodePool<T>,
        mut pred: F,
    ) -> Option<(NodeId, Option<NodeId>)>
    where
        F: FnMut(&T) -> bool,
    {
        let mut prev_idx = None;
        let mut current_idx = self.head;
        let mut visited = 0;

        while let Some(idx) = current_idx {
            if visited > self.len {
                error!("Potential cycle detected during search");
                return None;
            }

            let node = pool.get_node(idx)?;
            if pred(&node.data) {
                return Some((idx, prev_idx));
            }
            prev_idx = current_idx;
            current_idx = node.next;
            visited += 1;
        }

        None
    }

    /// Remove a node by handle
    ///
    /// An absent handle is an error. A handle that is not reachable from this
    /// list's head leaves the list untouched and yields `Ok(false)`. Handles
    /// are not generation-checked: once a node is removed, its slot may be
    /// reused, and the old handle then refers to whichever node took it.
    pub fn remove_node(
        &mut self,
        pool: &mut NodePool<T>,
        node: Option<NodeId>,
    ) -> AllocResult<bool> {
        let node_idx = node.ok_or(AllocError::NullNode)?;

        let mut prev_idx = None;
        let mut current_idx = self.head;
        let mut visited = 0;

        while let Some(idx) = current_idx {
            if visited > self.len {
                error!("Potential cycle detected during remove");
                return Ok(false);
            }
            if idx == node_idx {
                return Ok(self.unlink(pool, node_idx, prev_idx).is_some());
            }
            prev_idx = current_idx;
            current_idx = Self::next_of(pool, idx);
            visited += 1;
        }

        Ok(false)
    }

    /// Remove and return the value at `index`
    pub fn remove_at(&mut self, pool: &mut NodePool<T>, index: usize) -> AllocResult<T> {
        let out_of_bounds = AllocError::IndexOutOfBounds {
            index,
            len: self.len,
        };
        if index >= self.len {
            return Err(out_of_bounds);
        }

        let prev_idx = match index {
            0 => None,
            _ => Some(self.walk(pool, index - 1).ok_or(out_of_bounds)?),
        };
        let node_idx = match prev_idx {
            Some(prev) => Self::next_of(pool, prev),
            None => self.head,
        }
        .ok_or(out_of_bounds)?;

        self.unlink(pool, node_idx, prev_idx).ok_or(out_of_bounds)
    }

    /// Remove a node using known prev_idx (O(1) operation)
    ///
    /// This is used when we already know the previous node index from
    /// find_with_prev(), avoiding a second traversal of the list.
    pub fn remove_with_prev(
        &mut self,
        pool: &mut NodePool<T>,
        node_idx: NodeId,
        prev_idx: Option<NodeId>,
    ) -> Option<T> {
        match prev_idx {
            Some(prev) if Self::next_of(pool, prev) != Some(node_idx) => {
                error!("prev {:?} does not point to node {:?}", prev, node_idx);
                return None;
            }
            None if self.head != Some(node_idx) => {
                error!("prev is None but node {:?} is not head", node_idx);
                return None;
            }
            _ => {}
        }

        self.unlink(pool, node_idx, prev_idx)
    }

    /// Internal implementation of remove with known prev_idx
    fn unlink(
        &mut self,
        pool: &mut NodePool<T>,
        node_idx: NodeId,
        prev_idx: Option<NodeId>,
    ) -> Option<T> {
        let next_idx = pool.get_node(node_idx)?.next;

        match prev_idx {
            Some(prev) => {
                if let Some(prev_node) = pool.get_node_mut(prev) {
                    prev_node.next = next_idx;
                }
            }
            None => self.head = next_idx,
        }

        if self.tail == Some(node_idx) {
            self.tail = prev_idx;
        }

        self.len -= 1;
        pool.dealloc_node(node_idx)
    }

    /// Merge list-adjacent pairs in place
    ///
    /// Walks `(current, next)` pairs from the head. When `merge` accepts a
    /// pair, `next` is spliced out and the walk retries the grown `current`
    /// against its new successor. `merge` must leave `current` untouched when
    /// it returns `false`. Returns the number of merges performed.
    pub fn coalesce<F>(&mut self, pool: &mut NodePool<T>, mut merge: F) -> usize
    where
        F: FnMut(&mut T, &T) -> bool,
    {
        let mut merges = 0;
        let mut current_idx = self.head;

        while let Some(idx) = current_idx {
            let Some(next_idx) = Self::next_of(pool, idx) else {
                break;
            };

            let merged = match pool.get_pair_mut(idx, next_idx) {
                Some((node, next_node)) => {
                    let merged = merge(&mut node.data, &next_node.data);
                    if merged {
                        node.next = next_node.next;
                    }
                    merged
                }
                None => {
                    error!("Invalid node pair {:?} -> {:?} in list", idx, next_idx);
                    break;
                }
            };

            if merged {
                if self.tail == Some(next_idx) {
                    self.tail = Some(idx);
                }
                self.len -= 1;
                pool.dealloc_node(next_idx);
                merges += 1;
            } else {
                current_idx = Some(next_idx);
            }
        }

        merges
    }

    /// Check head/tail/len consistency
    pub fn check_integrity(&self, pool: &NodePool<T>) -> bool {
        if self.len == 0 {
            return self.head.is_none() && self.tail.is_none();
        }

        let mut count = 0;
        let mut last = None;
        let mut current_idx = self.head;
        while let Some(idx) = current_idx {
            if count >= self.len {
                error!("List longer than its recorded length {}", self.len);
                return false;
            }
            let Some(node) = pool.get_node(idx) else {
                error!("Dangling node at slot {} in list", idx.index());
                return false;
            };
            count += 1;
            last = Some(idx);
            current_idx = node.next;
        }

        count == self.len && last == self.tail
    }

    /// Get iterator over elements
    pub fn iter<'a>(&self, pool: &'a NodePool<T>) -> PooledListIter<'a, T> {
        PooledListIter {
            pool,
            current: self.head,
            remaining: self.len,
        }
    }

    /// Clear all nodes from the list
    ///
    /// Returns all nodes to the pool
    pub fn clear(&mut self, pool: &mut NodePool<T>) {
        while self.pop_front(pool).is_some() {}
    }
}

impl<T: PartialEq> PooledList<T> {
    /// Index of the first value equal to `data`
    pub fn index_of(&self, pool: &NodePool<T>, data: &T) -> Option<usize> {
        self.iter(pool).position(|value| value == data)
    }

    /// Remove and return the first value equal to `data`
    pub fn remove_value(&mut self, pool: &mut NodePool<T>, data: &T) -> AllocResult<T> {
        let (node_idx, prev_idx) = self
            .find_with_prev(pool, |value| value == data)
            .ok_or(AllocError::ValueNotFound)?;
        self.unlink(pool, node_idx, prev_idx)
            .ok_or(AllocError::ValueNotFound)
    }
}

impl<T: fmt::Display> PooledList<T> {
    /// Render the list as one `"value "` fragment per node, in list order
    pub fn display<'a>(&'a self, pool: &'a NodePool<T>) -> ListDisplay<'a, T> {
        ListDisplay { list: self, pool }
    }
}

impl<T> Default for PooledList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator for PooledList
pub struct PooledListIter<'a, T> {
    pool: &'a NodePool<T>,
    current: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Iterator for PooledListIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.pool.get_node(self.current?)?;
        self.current = node.next;
        self.remaining -= 1;
        Some(&node.data)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// Debug rendering of a [`PooledList`]
pub struct ListDisplay<'a, T> {
    list: &'a PooledList<T>,
    pool: &'a NodePool<T>,
}

impl<T: fmt::Display> fmt::Display for ListDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in self.list.iter(self.pool) {
            write!(f, "{} ", value)?;
        }
        Ok(())
    }
}
