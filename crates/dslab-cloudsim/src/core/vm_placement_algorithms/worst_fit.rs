//! Worst Fit algorithm.

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;

/// Uses the suitable host with the largest number of free PEs.
#[derive(Default)]
pub struct WorstFit;

impl WorstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmPlacementAlgorithm for WorstFit {
    fn select_host(&self, vm: &Vm, hosts: &[Host]) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut max_free_pes: i64 = -1;

        for host in hosts {
            if host.is_suitable_for_vm(vm) && host.free_pe_count() as i64 > max_free_pes {
                max_free_pes = host.free_pe_count() as i64;
                result = Some(host.id);
            }
        }
        result
    }
}
