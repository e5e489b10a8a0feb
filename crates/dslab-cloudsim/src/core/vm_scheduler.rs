//! Host-level scheduling of VMs.

use dyn_clone::{clone_trait_object, DynClone};

use crate::core::common::InsufficientCapacity;
use crate::core::config::options::parse_config_value;
use crate::core::pe::Pe;
use crate::core::vm::{Vm, VmUid};
use crate::core::vm_schedulers::space_shared::VmSchedulerSpaceShared;
use crate::core::vm_schedulers::time_shared::VmSchedulerTimeShared;

/// Trait for implementation of policies which share the host PEs among resident VMs.
///
/// The scheduler does not own the PEs, the host passes them on each call.
/// Allocated capacity is materialized on PE provisioners, so that the host state can be inspected per PE.
pub trait VmScheduler: DynClone {
    /// Checks whether the VM can be allocated on the given PEs.
    fn check_capacity(&self, vm: &Vm, pes: &[Pe]) -> Result<(), InsufficientCapacity>;

    /// Allocates PEs for the VM and returns the capacity (MIPS) granted per VM PE.
    ///
    /// Nothing is allocated on failure.
    fn allocate_pes_for_vm(&mut self, vm: &Vm, pes: &mut [Pe]) -> Result<Vec<f64>, InsufficientCapacity>;

    /// Releases PEs of the VM. Does nothing if the VM has no allocation.
    fn deallocate_pes_for_vm(&mut self, vm: VmUid, pes: &mut [Pe]);

    /// Returns the capacity (MIPS) currently granted per PE of the VM, empty if the VM has no allocation.
    fn mips_share(&self, vm: VmUid) -> Vec<f64>;

    fn is_suitable(&self, vm: &Vm, pes: &[Pe]) -> bool {
        self.check_capacity(vm, pes).is_ok()
    }

    /// Returns the capacity not granted to any VM.
    fn available_mips(&self, pes: &[Pe]) -> f64 {
        pes.iter().map(|pe| pe.provisioner().available_mips()).sum()
    }
}

clone_trait_object!(VmScheduler);

pub fn vm_scheduler_resolver(config_str: &str) -> Box<dyn VmScheduler> {
    let (scheduler_name, _options) = parse_config_value(config_str);
    match scheduler_name.as_str() {
        "TimeShared" => Box::new(VmSchedulerTimeShared::new()),
        "SpaceShared" => Box::new(VmSchedulerSpaceShared::new()),
        _ => panic!("Can't resolve: {}", config_str),
    }
}
