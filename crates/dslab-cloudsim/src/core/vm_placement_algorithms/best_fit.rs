//! Best Fit algorithm.

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;

/// Uses the most loaded (by available CPU capacity) suitable host.
#[derive(Default)]
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmPlacementAlgorithm for BestFit {
    fn select_host(&self, vm: &Vm, hosts: &[Host]) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut min_available_mips = f64::MAX;

        for host in hosts {
            if host.is_suitable_for_vm(vm) && host.available_mips() < min_available_mips {
                min_available_mips = host.available_mips();
                result = Some(host.id);
            }
        }
        result
    }
}
