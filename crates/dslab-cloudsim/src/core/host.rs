//! Physical host.

use std::collections::BTreeMap;

use crate::core::common::InsufficientCapacity;
use crate::core::pe::{max_pe_mips, total_mips, Pe, PeStatus};
use crate::core::provisioner::ResourceProvisioner;
use crate::core::vm::{Vm, VmUid};
use crate::core::vm_scheduler::VmScheduler;

/// Represents a physical host of datacenter.
///
/// Host owns its processing elements and provisioners of memory, bandwidth and storage, and keeps the uids of
/// resident VMs. The VMs themselves are owned by the datacenter and are passed to the host when needed.
pub struct Host {
    pub id: u32,
    name: String,
    pes: Vec<Pe>,
    ram: ResourceProvisioner,
    bw: ResourceProvisioner,
    storage: ResourceProvisioner,
    vm_scheduler: Box<dyn VmScheduler>,
    vms: Vec<VmUid>,
}

impl Host {
    pub fn new(id: u32, pes: Vec<Pe>, ram: u64, bw: u64, storage: u64, vm_scheduler: Box<dyn VmScheduler>) -> Self {
        Self {
            id,
            name: format!("host{}", id),
            pes,
            ram: ResourceProvisioner::ram(ram),
            bw: ResourceProvisioner::bandwidth(bw),
            storage: ResourceProvisioner::storage(storage),
            vm_scheduler,
            vms: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks whether the host has enough free resources for the VM.
    pub fn can_host(&self, vm: &Vm) -> Result<(), InsufficientCapacity> {
        let uid = vm.uid();
        self.storage.check(uid, vm.size())?;
        self.ram.check(uid, vm.ram())?;
        self.bw.check(uid, vm.bw())?;
        self.vm_scheduler.check_capacity(vm, &self.pes)
    }

    pub fn is_suitable_for_vm(&self, vm: &Vm) -> bool {
        self.can_host(vm).is_ok()
    }

    /// Allocates resources for the VM and makes it resident.
    ///
    /// Partial reservations are rolled back on failure, so the host state is unchanged.
    pub fn vm_create(&mut self, vm: &mut Vm) -> Result<(), InsufficientCapacity> {
        self.can_host(vm)?;
        let uid = vm.uid();
        self.storage.allocate(uid, vm.size())?;
        if let Err(e) = self.ram.allocate(uid, vm.ram()) {
            self.storage.deallocate(uid);
            return Err(e);
        }
        if let Err(e) = self.bw.allocate(uid, vm.bw()) {
            self.storage.deallocate(uid);
            self.ram.deallocate(uid);
            return Err(e);
        }
        if let Err(e) = self.vm_scheduler.allocate_pes_for_vm(vm, &mut self.pes) {
            self.storage.deallocate(uid);
            self.ram.deallocate(uid);
            self.bw.deallocate(uid);
            return Err(e);
        }
        self.vms.push(uid);
        vm.set_host(Some(self.id));
        Ok(())
    }

    /// Releases all resources of the VM. Does nothing for VMs not resident on this host.
    pub fn vm_destroy(&mut self, vm: &mut Vm) {
        let uid = vm.uid();
        if let Some(index) = self.vms.iter().position(|&resident| resident == uid) {
            self.vms.remove(index);
            self.storage.deallocate(uid);
            self.ram.deallocate(uid);
            self.bw.deallocate(uid);
            self.vm_scheduler.deallocate_pes_for_vm(uid, &mut self.pes);
            vm.set_host(None);
        }
    }

    /// Advances cloudlets of all resident VMs to `time` using the current VM capacity shares.
    ///
    /// Returns the earliest time of the next cloudlet completion among resident VMs.
    pub fn update_vms_processing(&mut self, time: f64, vms: &mut BTreeMap<VmUid, Vm>) -> Option<f64> {
        let mut next_time: Option<f64> = None;
        for uid in self.vms.iter() {
            if let Some(vm) = vms.get_mut(uid) {
                let share = self.vm_scheduler.mips_share(*uid);
                if let Some(completion) = vm.update_processing(time, &share) {
                    next_time = Some(next_time.map_or(completion, |t| t.min(completion)));
                }
            }
        }
        next_time
    }

    /// Returns the fraction of host capacity used by cloudlets of resident VMs.
    pub fn utilization_of_cpu(&self, time: f64, vms: &BTreeMap<VmUid, Vm>) -> f64 {
        let capacity = self.total_mips();
        if capacity == 0. {
            return 0.;
        }
        let used: f64 = self
            .vms
            .iter()
            .filter_map(|uid| vms.get(uid))
            .map(|vm| {
                let share: f64 = self.vm_scheduler.mips_share(vm.uid()).iter().sum();
                vm.utilization_of_cpu(time) * share
            })
            .sum();
        (used / capacity).min(1.)
    }

    pub fn pes(&self) -> &[Pe] {
        &self.pes
    }

    pub fn pe_count(&self) -> u32 {
        self.pes.len() as u32
    }

    pub fn free_pe_count(&self) -> u32 {
        self.pes.iter().filter(|pe| pe.status() == PeStatus::Free).count() as u32
    }

    pub fn total_mips(&self) -> f64 {
        total_mips(&self.pes)
    }

    pub fn max_pe_mips(&self) -> f64 {
        max_pe_mips(&self.pes)
    }

    pub fn available_mips(&self) -> f64 {
        self.vm_scheduler.available_mips(&self.pes)
    }

    pub fn mips_share(&self, vm: VmUid) -> Vec<f64> {
        self.vm_scheduler.mips_share(vm)
    }

    pub fn ram(&self) -> &ResourceProvisioner {
        &self.ram
    }

    pub fn bw(&self) -> &ResourceProvisioner {
        &self.bw
    }

    pub fn storage(&self) -> &ResourceProvisioner {
        &self.storage
    }

    /// Returns uids of resident VMs in the order of their creation.
    pub fn vm_uids(&self) -> &[VmUid] {
        &self.vms
    }
}
