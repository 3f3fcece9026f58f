//! Node pool for pooled lists
//!
//! Provides a single arena of list nodes that can be shared by several lists.
//! Nodes are addressed by index, so lists never hold pointers into each other
//! and no node ever links backwards.

use alloc::vec::Vec;

/// Index handle of a node inside a [`NodePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw slot index of this node
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Simple linked list node stored in the node pool
#[derive(Debug, Clone, Copy)]
pub struct ListNode<T> {
    pub data: T,
    pub(crate) next: Option<NodeId>,
}

impl<T> ListNode<T> {
    /// The node following this one, if any
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }
}

enum Slot<T> {
    Occupied(ListNode<T>),
    /// Vacant slot, linked to the next vacant slot index
    Vacant(Option<usize>),
}

/// Node pool - every list of a memory space draws its nodes from here
///
/// Vacated slots are chained together and handed out again before the
/// backing vector grows.
pub struct NodePool<T> {
    slots: Vec<Slot<T>>,
    /// Free chain head - first vacant slot
    free_head: Option<usize>,
    /// Current number of vacant slots
    free_nodes: usize,
    /// Allocation statistics
    total_allocations: usize,
    total_deallocations: usize,
}

impl<T> NodePool<T> {
    /// Create an empty node pool
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            free_nodes: 0,
            total_allocations: 0,
            total_deallocations: 0,
        }
    }

    /// Create an empty node pool with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    /// Allocate a detached node holding `data`
    ///
    /// Reuses a vacant slot when one exists, otherwise grows the pool.
    pub fn alloc_node(&mut self, data: T) -> NodeId {
        let node = ListNode { data, next: None };
        self.total_allocations += 1;

        match self.free_head {
            Some(idx) => {
                if let Slot::Vacant(next_free) = self.slots[idx] {
                    self.free_head = next_free;
                }
                self.slots[idx] = Slot::Occupied(node);
                self.free_nodes -= 1;
                NodeId(idx)
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Return a node to the pool, yielding the value it held
    ///
    /// The node should not be part of any active list when freed. Returns
    /// `None` for a handle that is already vacant or was never issued.
    pub fn dealloc_node(&mut self, id: NodeId) -> Option<T> {
        let slot = self.slots.get_mut(id.0)?;
        if matches!(slot, Slot::Vacant(_)) {
            return None;
        }

        let old = core::mem::replace(slot, Slot::Vacant(self.free_head));
        self.free_head = Some(id.0);
        self.free_nodes += 1;
        self.total_deallocations += 1;

        match old {
            Slot::Occupied(node) => Some(node.data),
            Slot::Vacant(_) => None,
        }
    }

    /// Get a reference to a live node
    pub fn get_node(&self, id: NodeId) -> Option<&ListNode<T>> {
        match self.slots.get(id.0)? {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant(_) => None,
        }
    }

    /// Get a mutable reference to a live node
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut ListNode<T>> {
        match self.slots.get_mut(id.0)? {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant(_) => None,
        }
    }

    /// Borrow two distinct live nodes at once, the first mutably
    pub(crate) fn get_pair_mut(
        &mut self,
        a: NodeId,
        b: NodeId,
    ) -> Option<(&mut ListNode<T>, &ListNode<T>)> {
        if a.0 == b.0 || a.0.max(b.0) >= self.slots.len() {
            return None;
        }

        let (a_slot, b_slot) = if a.0 < b.0 {
            let (left, right) = self.slots.split_at_mut(b.0);
            (&mut left[a.0], &right[0])
        } else {
            let (left, right) = self.slots.split_at_mut(a.0);
            (&mut right[0], &left[b.0])
        };

        match (a_slot, b_slot) {
            (Slot::Occupied(a_node), Slot::Occupied(b_node)) => Some((a_node, b_node)),
            _ => None,
        }
    }

    /// Get the number of vacant slots in the pool
    pub fn free_node_count(&self) -> usize {
        self.free_nodes
    }

    /// Get the number of live nodes
    pub fn allocated_node_count(&self) -> usize {
        self.slots.len() - self.free_nodes
    }

    /// Get pool statistics
    pub fn get_stats(&self) -> PoolStats {
        PoolStats {
            total_slots: self.slots.len(),
            free_slots: self.free_nodes,
            allocated_nodes: self.allocated_node_count(),
            total_allocations: self.total_allocations,
            total_deallocations: self.total_deallocations,
        }
    }
}

impl<T> Default for NodePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Node pool statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub total_slots: usize,
    pub free_slots: usize,
    pub allocated_nodes: usize,
    pub total_allocations: usize,
    pub total_deallocations: usize,
}
