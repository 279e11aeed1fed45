//! Value objects for Transaction Scheduling

use serde::{Deserialize, Serialize};
use shared_types::{AccessKey, MemoryRegion, Transaction, TxId};

/// Stable position of a dependency node in the scheduler arena.
///
/// Indices are assigned once at graph construction and stay valid for the
/// lifetime of the scheduler; nodes are retired, never removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

/// Why one transaction must run after another
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Access lists share an application or account
    SharedAccess(AccessKey),
    /// Memory access lists share a region
    SharedMemory(MemoryRegion),
    /// Edge supplied by the caller with no conflict attached
    Explicit,
}

/// Lifecycle of a dependency node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeState {
    /// Waiting for predecessors
    Pending = 0,
    /// In the ready queue
    Ready = 1,
    /// Handed to a worker
    Running = 2,
    /// Result submitted and propagated; payload released
    Retired = 3,
}

impl NodeState {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => NodeState::Pending,
            1 => NodeState::Ready,
            2 => NodeState::Running,
            _ => NodeState::Retired,
        }
    }
}

/// Conflict between two transactions of a batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub tx1: TxId,
    pub tx2: TxId,
    pub kind: DependencyKind,
}

/// First overlap between two transactions' access lists, if any.
///
/// Memory regions are checked first since they name the exact state touched.
pub fn conflict_between(a: &Transaction, b: &Transaction) -> Option<DependencyKind> {
    if let Some(region) = a.memory_access.intersection(&b.memory_access).next() {
        return Some(DependencyKind::SharedMemory(*region));
    }
    a.access_list
        .intersection(&b.access_list)
        .next()
        .map(|key| DependencyKind::SharedAccess(*key))
}
