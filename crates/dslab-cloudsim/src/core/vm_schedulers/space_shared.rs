//! Space-shared VM scheduler.

use std::collections::BTreeMap;

use crate::core::common::{InsufficientCapacity, ResourceKind};
use crate::core::pe::{Pe, PeStatus};
use crate::core::vm::{Vm, VmUid};
use crate::core::vm_scheduler::VmScheduler;

/// Reserves a whole free PE for each VM PE, so VMs never share PEs.
#[derive(Clone, Default)]
pub struct VmSchedulerSpaceShared {
    assigned_pes: BTreeMap<VmUid, Vec<usize>>,
    shares: BTreeMap<VmUid, Vec<f64>>,
}

impl VmSchedulerSpaceShared {
    pub fn new() -> Self {
        Self::default()
    }

    fn suitable_pes(vm: &Vm, pes: &[Pe]) -> Vec<usize> {
        pes.iter()
            .enumerate()
            .filter(|(_, pe)| pe.status() == PeStatus::Free && pe.mips() >= vm.mips())
            .map(|(index, _)| index)
            .take(vm.pes() as usize)
            .collect()
    }
}

impl VmScheduler for VmSchedulerSpaceShared {
    fn check_capacity(&self, vm: &Vm, pes: &[Pe]) -> Result<(), InsufficientCapacity> {
        let suitable = Self::suitable_pes(vm, pes).len();
        if suitable < vm.pes() as usize {
            return Err(InsufficientCapacity::new(
                ResourceKind::Pes,
                vm.pes() as f64,
                suitable as f64,
            ));
        }
        Ok(())
    }

    fn allocate_pes_for_vm(&mut self, vm: &Vm, pes: &mut [Pe]) -> Result<Vec<f64>, InsufficientCapacity> {
        self.check_capacity(vm, pes)?;
        let selected = Self::suitable_pes(vm, pes);
        for &index in selected.iter() {
            pes[index].provisioner_mut().allocate_mips_for_vm(vm.uid(), vm.mips())?;
            pes[index].set_status(PeStatus::Busy);
        }
        let share = vec![vm.mips(); selected.len()];
        self.assigned_pes.insert(vm.uid(), selected);
        self.shares.insert(vm.uid(), share.clone());
        Ok(share)
    }

    fn deallocate_pes_for_vm(&mut self, vm: VmUid, pes: &mut [Pe]) {
        if let Some(assigned) = self.assigned_pes.remove(&vm) {
            for index in assigned {
                pes[index].provisioner_mut().deallocate_mips_for_vm(vm);
                pes[index].set_status(PeStatus::Free);
            }
        }
        self.shares.remove(&vm);
    }

    fn mips_share(&self, vm: VmUid) -> Vec<f64> {
        self.shares.get(&vm).cloned().unwrap_or_default()
    }

    fn available_mips(&self, pes: &[Pe]) -> f64 {
        pes.iter()
            .filter(|pe| pe.status() == PeStatus::Free)
            .map(|pe| pe.mips())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cloudlet_schedulers::space_shared::CloudletSchedulerSpaceShared;
    use crate::core::pe::pe_list;

    #[test]
    fn test_exclusive_pes() {
        let mut pes = pe_list(2, 1000.);
        let mut scheduler = VmSchedulerSpaceShared::new();
        let vm = |id| Vm::new(id, 0, 1000., 1, 0, 0, 0, "Xen", Box::new(CloudletSchedulerSpaceShared::new()));
        assert!(scheduler.allocate_pes_for_vm(&vm(0), &mut pes).is_ok());
        assert!(scheduler.allocate_pes_for_vm(&vm(1), &mut pes).is_ok());
        assert!(!scheduler.is_suitable(&vm(2), &pes));
        assert_eq!(scheduler.available_mips(&pes), 0.);

        scheduler.deallocate_pes_for_vm(VmUid::new(0, 0), &mut pes);
        assert_eq!(pes[0].status(), PeStatus::Free);
        assert_eq!(scheduler.available_mips(&pes), 1000.);
        assert!(scheduler.allocate_pes_for_vm(&vm(2), &mut pes).is_ok());
    }
}
