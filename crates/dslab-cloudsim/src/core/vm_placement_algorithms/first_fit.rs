//! First Fit algorithm.

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;

/// Uses the first suitable host.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmPlacementAlgorithm for FirstFit {
    fn select_host(&self, vm: &Vm, hosts: &[Host]) -> Option<u32> {
        hosts.iter().find(|host| host.is_suitable_for_vm(vm)).map(|host| host.id)
    }
}
