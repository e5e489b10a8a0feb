//! Time-shared VM scheduler with oversubscription.

use std::collections::BTreeMap;

use crate::core::common::{InsufficientCapacity, ResourceKind};
use crate::core::pe::{max_pe_mips, total_mips, Pe, PeStatus};
use crate::core::vm::{Vm, VmUid};
use crate::core::vm_scheduler::VmScheduler;

/// Shares the total host capacity among VMs.
///
/// While the aggregate demand of resident VMs fits into the host capacity, each VM gets the requested MIPS.
/// Otherwise all requests are scaled down proportionally, so that the host is never refused a VM because
/// of processing capacity, and the VMs just run slower.
#[derive(Clone, Default)]
pub struct VmSchedulerTimeShared {
    requested: BTreeMap<VmUid, Vec<f64>>,
    shares: BTreeMap<VmUid, Vec<f64>>,
}

impl VmSchedulerTimeShared {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_shares(&mut self, pes: &mut [Pe]) {
        let capacity = total_mips(pes);
        let demand: f64 = self.requested.values().flatten().sum();
        let factor = if demand > capacity && demand > 0. {
            capacity / demand
        } else {
            1.
        };
        self.shares = self
            .requested
            .iter()
            .map(|(&vm, mips)| (vm, mips.iter().map(|m| m * factor).collect()))
            .collect();

        // map the shares onto PEs, a share can span several PEs
        for pe in pes.iter_mut() {
            pe.provisioner_mut().deallocate_mips_for_all_vms();
        }
        let mut pe_index = 0;
        for (&vm, share) in self.shares.iter() {
            for &mips in share {
                let mut remaining = mips;
                while remaining > 1e-9 && pe_index < pes.len() {
                    let provisioner = pes[pe_index].provisioner_mut();
                    let portion = remaining.min(provisioner.available_mips());
                    if portion > 0. && provisioner.allocate_mips_for_vm(vm, portion).is_ok() {
                        remaining -= portion;
                    }
                    if provisioner.available_mips() <= 1e-9 {
                        pe_index += 1;
                    }
                }
            }
        }
        for pe in pes.iter_mut() {
            let status = if pe.provisioner().is_idle() {
                PeStatus::Free
            } else {
                PeStatus::Busy
            };
            pe.set_status(status);
        }
    }
}

impl VmScheduler for VmSchedulerTimeShared {
    fn check_capacity(&self, vm: &Vm, pes: &[Pe]) -> Result<(), InsufficientCapacity> {
        if vm.pes() as usize > pes.len() {
            return Err(InsufficientCapacity::new(
                ResourceKind::Pes,
                vm.pes() as f64,
                pes.len() as f64,
            ));
        }
        let max_mips = max_pe_mips(pes);
        if vm.mips() > max_mips {
            return Err(InsufficientCapacity::new(ResourceKind::Mips, vm.mips(), max_mips));
        }
        Ok(())
    }

    fn allocate_pes_for_vm(&mut self, vm: &Vm, pes: &mut [Pe]) -> Result<Vec<f64>, InsufficientCapacity> {
        self.check_capacity(vm, pes)?;
        self.requested.insert(vm.uid(), vm.current_requested_mips());
        self.update_shares(pes);
        Ok(self.mips_share(vm.uid()))
    }

    fn deallocate_pes_for_vm(&mut self, vm: VmUid, pes: &mut [Pe]) {
        if self.requested.remove(&vm).is_some() {
            self.update_shares(pes);
        }
    }

    fn mips_share(&self, vm: VmUid) -> Vec<f64> {
        self.shares.get(&vm).cloned().unwrap_or_default()
    }
}
