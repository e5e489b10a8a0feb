//! Processing element of a physical host.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::core::provisioner::PeProvisioner;

/// Status of processing element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PeStatus {
    Free,
    Busy,
}

impl Display for PeStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PeStatus::Free => write!(f, "free"),
            PeStatus::Busy => write!(f, "busy"),
        }
    }
}

/// Represents a single CPU core of a host with fixed processing capacity (MIPS).
#[derive(Clone, Debug)]
pub struct Pe {
    pub id: u32,
    status: PeStatus,
    provisioner: PeProvisioner,
}

impl Pe {
    pub fn new(id: u32, mips: f64) -> Self {
        Self {
            id,
            status: PeStatus::Free,
            provisioner: PeProvisioner::new(mips),
        }
    }

    pub fn mips(&self) -> f64 {
        self.provisioner.mips()
    }

    pub fn status(&self) -> PeStatus {
        self.status
    }

    pub fn set_status(&mut self, status: PeStatus) {
        self.status = status;
    }

    pub fn provisioner(&self) -> &PeProvisioner {
        &self.provisioner
    }

    pub fn provisioner_mut(&mut self) -> &mut PeProvisioner {
        &mut self.provisioner
    }
}

/// Builds a list of identical processing elements with ids starting from 0.
pub fn pe_list(count: u32, mips: f64) -> Vec<Pe> {
    (0..count).map(|id| Pe::new(id, mips)).collect()
}

pub(crate) fn max_pe_mips(pes: &[Pe]) -> f64 {
    pes.iter().map(|pe| pe.mips()).fold(0., f64::max)
}

pub(crate) fn total_mips(pes: &[Pe]) -> f64 {
    pes.iter().map(|pe| pe.mips()).sum()
}
