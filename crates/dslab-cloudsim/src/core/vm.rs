//! Representations of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::CloudletScheduler;

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    /// Submitted, but not placed on a host yet.
    Pending,
    Running,
    /// Could not be placed in any datacenter.
    Failed,
    Destroyed,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Pending => write!(f, "pending"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::Failed => write!(f, "failed"),
            VmStatus::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Identifies VM within datacenter.
///
/// VM ids are chosen by users, so VMs of different owners can have the same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VmUid {
    pub owner_id: u32,
    pub vm_id: u32,
}

impl VmUid {
    pub fn new(owner_id: u32, vm_id: u32) -> Self {
        Self { owner_id, vm_id }
    }
}

impl Display for VmUid {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}-{}", self.owner_id, self.vm_id)
    }
}

/// Represents virtual machine (VM).
///
/// VM is characterized by the number of its PEs and their capacity in MIPS, memory, bandwidth and image size.
/// The cloudlet scheduler defines how the capacity granted to VM by host is shared between resident cloudlets.
#[derive(Clone)]
pub struct Vm {
    pub id: u32,
    owner_id: u32,
    mips: f64,
    pes: u32,
    ram: u64,
    bw: u64,
    size: u64,
    vmm: String,
    cloudlet_scheduler: Box<dyn CloudletScheduler>,
    host_id: Option<u32>,
    datacenter_id: Option<u32>,
    status: VmStatus,
}

impl Serialize for Vm {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Vm", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("owner_id", &self.owner_id)?;
        state.serialize_field("mips", &self.mips)?;
        state.serialize_field("pes", &self.pes)?;
        state.serialize_field("ram", &self.ram)?;
        state.serialize_field("bw", &self.bw)?;
        state.serialize_field("size", &self.size)?;
        state.end()
    }
}

impl Vm {
    /// Creates virtual machine with specified parameters.
    pub fn new(
        id: u32,
        owner_id: u32,
        mips: f64,
        pes: u32,
        ram: u64,
        bw: u64,
        size: u64,
        vmm: &str,
        cloudlet_scheduler: Box<dyn CloudletScheduler>,
    ) -> Self {
        Self {
            id,
            owner_id,
            mips,
            pes,
            ram,
            bw,
            size,
            vmm: vmm.to_string(),
            cloudlet_scheduler,
            host_id: None,
            datacenter_id: None,
            status: VmStatus::Pending,
        }
    }

    pub fn owner_id(&self) -> u32 {
        self.owner_id
    }

    pub fn uid(&self) -> VmUid {
        VmUid::new(self.owner_id, self.id)
    }

    /// Returns the requested capacity of a single VM PE.
    pub fn mips(&self) -> f64 {
        self.mips
    }

    pub fn pes(&self) -> u32 {
        self.pes
    }

    pub fn ram(&self) -> u64 {
        self.ram
    }

    pub fn bw(&self) -> u64 {
        self.bw
    }

    /// Returns the image size, which is allocated from the host storage.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn vmm(&self) -> &str {
        &self.vmm
    }

    pub fn host_id(&self) -> Option<u32> {
        self.host_id
    }

    pub fn datacenter_id(&self) -> Option<u32> {
        self.datacenter_id
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    /// Returns the requested capacity per VM PE.
    pub fn current_requested_mips(&self) -> Vec<f64> {
        vec![self.mips; self.pes as usize]
    }

    pub fn total_mips(&self) -> f64 {
        self.mips * self.pes as f64
    }

    pub fn cloudlet_scheduler(&self) -> &dyn CloudletScheduler {
        self.cloudlet_scheduler.as_ref()
    }

    pub fn cloudlet_scheduler_mut(&mut self) -> &mut dyn CloudletScheduler {
        self.cloudlet_scheduler.as_mut()
    }

    /// Advances the resident cloudlets to `time` and returns the time of the next cloudlet completion.
    pub fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        self.cloudlet_scheduler.update_vm_processing(time, mips_share)
    }

    pub fn cloudlet_status(&self, cloudlet_id: u32) -> Option<CloudletStatus> {
        self.cloudlet_scheduler.cloudlet_status(cloudlet_id)
    }

    /// Returns the fraction of VM capacity used by its cloudlets.
    pub fn utilization_of_cpu(&self, time: f64) -> f64 {
        if self.pes == 0 {
            return 0.;
        }
        (self.cloudlet_scheduler.total_utilization_of_cpu(time) / self.pes as f64).min(1.)
    }

    pub fn set_owner(&mut self, owner_id: u32) {
        self.owner_id = owner_id;
    }

    pub(crate) fn set_host(&mut self, host_id: Option<u32>) {
        self.host_id = host_id;
    }

    pub(crate) fn set_datacenter(&mut self, datacenter_id: Option<u32>) {
        self.datacenter_id = datacenter_id;
    }

    pub(crate) fn set_status(&mut self, status: VmStatus) {
        self.status = status;
    }

    pub(crate) fn submit_cloudlet(&mut self, cloudlet: Cloudlet, time: f64) -> Option<f64> {
        self.cloudlet_scheduler.cloudlet_submit(cloudlet, time)
    }
}
