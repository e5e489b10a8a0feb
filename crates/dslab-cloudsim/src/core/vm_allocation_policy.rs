//! VM allocation policy of datacenter.

use std::collections::BTreeMap;

use crate::core::common::NoSuitableHost;
use crate::core::host::Host;
use crate::core::vm::{Vm, VmUid};
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;
use crate::core::vm_placement_algorithms::first_fit::FirstFit;

/// Places VMs on datacenter hosts using the placement algorithm and keeps track of placements.
pub struct VmAllocationPolicy {
    algorithm: Box<dyn VmPlacementAlgorithm>,
    placements: BTreeMap<VmUid, u32>,
}

impl Default for VmAllocationPolicy {
    fn default() -> Self {
        Self::new(Box::new(FirstFit::new()))
    }
}

impl VmAllocationPolicy {
    pub fn new(algorithm: Box<dyn VmPlacementAlgorithm>) -> Self {
        Self {
            algorithm,
            placements: BTreeMap::new(),
        }
    }

    /// Selects a host for the VM and creates the VM there. Returns the id of selected host.
    pub fn allocate_host_for_vm(&mut self, vm: &mut Vm, hosts: &mut [Host]) -> Result<u32, NoSuitableHost> {
        let host_id = self
            .algorithm
            .select_host(vm, hosts)
            .ok_or(NoSuitableHost { vm_id: vm.id })?;
        let host = hosts
            .iter_mut()
            .find(|host| host.id == host_id)
            .ok_or(NoSuitableHost { vm_id: vm.id })?;
        if self.allocate_host_for_vm_on(vm, host) {
            Ok(host_id)
        } else {
            Err(NoSuitableHost { vm_id: vm.id })
        }
    }

    /// Creates the VM on the specified host. Returns false if the host cannot accommodate the VM.
    pub fn allocate_host_for_vm_on(&mut self, vm: &mut Vm, host: &mut Host) -> bool {
        if host.vm_create(vm).is_ok() {
            self.placements.insert(vm.uid(), host.id);
            true
        } else {
            false
        }
    }

    /// Destroys the VM on its host and forgets the placement.
    pub fn deallocate_host_for_vm(&mut self, vm: &mut Vm, hosts: &mut [Host]) {
        if let Some(host_id) = self.placements.remove(&vm.uid()) {
            if let Some(host) = hosts.iter_mut().find(|host| host.id == host_id) {
                host.vm_destroy(vm);
            }
        }
    }

    pub fn host_of(&self, vm: VmUid) -> Option<u32> {
        self.placements.get(&vm).copied()
    }
}
