//! Common types used by resource allocation components.

use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Resource dimension managed by hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    /// Number of processing elements.
    Pes,
    /// Processing capacity in MIPS.
    Mips,
    Ram,
    Bandwidth,
    Storage,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ResourceKind::Pes => write!(f, "pes"),
            ResourceKind::Mips => write!(f, "mips"),
            ResourceKind::Ram => write!(f, "ram"),
            ResourceKind::Bandwidth => write!(f, "bw"),
            ResourceKind::Storage => write!(f, "storage"),
        }
    }
}

/// Allocation request exceeds the remaining capacity of some resource.
///
/// Nothing is allocated when this error is returned, the caller decides how to handle the refusal.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InsufficientCapacity {
    pub resource: ResourceKind,
    pub requested: f64,
    pub available: f64,
}

impl InsufficientCapacity {
    pub fn new(resource: ResourceKind, requested: f64, available: f64) -> Self {
        Self {
            resource,
            requested,
            available,
        }
    }
}

impl Display for InsufficientCapacity {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "insufficient {}: requested {}, available {}",
            self.resource, self.requested, self.available
        )
    }
}

impl std::error::Error for InsufficientCapacity {}

/// None of the datacenter hosts can accommodate the VM.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NoSuitableHost {
    pub vm_id: u32,
}

impl Display for NoSuitableHost {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "no suitable host for vm #{}", self.vm_id)
    }
}

impl std::error::Error for NoSuitableHost {}
