//! Capacity provisioners.
//!
//! A provisioner manages a pool of a single resource and tracks the shares granted to consumers
//! (VMs, identified by their [`VmUid`]). The sum of granted shares never exceeds the pool capacity.

use std::collections::BTreeMap;

use crate::core::common::{InsufficientCapacity, ResourceKind};
use crate::core::vm::VmUid;

/// Provisioner of an integral resource such as RAM, bandwidth or storage.
#[derive(Clone, Debug)]
pub struct ResourceProvisioner {
    resource: ResourceKind,
    capacity: u64,
    available: u64,
    allocations: BTreeMap<VmUid, u64>,
}

impl ResourceProvisioner {
    pub fn new(resource: ResourceKind, capacity: u64) -> Self {
        Self {
            resource,
            capacity,
            available: capacity,
            allocations: BTreeMap::new(),
        }
    }

    pub fn ram(capacity: u64) -> Self {
        Self::new(ResourceKind::Ram, capacity)
    }

    pub fn bandwidth(capacity: u64) -> Self {
        Self::new(ResourceKind::Bandwidth, capacity)
    }

    pub fn storage(capacity: u64) -> Self {
        Self::new(ResourceKind::Storage, capacity)
    }

    /// Checks whether the consumer can be granted the specified amount.
    ///
    /// The current share of the consumer is taken into account, since allocation replaces it.
    pub fn is_suitable(&self, consumer: VmUid, amount: u64) -> bool {
        self.check(consumer, amount).is_ok()
    }

    pub fn check(&self, consumer: VmUid, amount: u64) -> Result<(), InsufficientCapacity> {
        let free = self.available + self.allocated_for(consumer);
        if amount > free {
            return Err(InsufficientCapacity::new(self.resource, amount as f64, free as f64));
        }
        Ok(())
    }

    /// Grants the specified amount to the consumer, replacing its previous share.
    ///
    /// On failure the previous share is kept.
    pub fn allocate(&mut self, consumer: VmUid, amount: u64) -> Result<(), InsufficientCapacity> {
        self.check(consumer, amount)?;
        self.available = self.available + self.allocated_for(consumer) - amount;
        self.allocations.insert(consumer, amount);
        Ok(())
    }

    /// Returns the share of the consumer to the pool. Does nothing if the consumer has no share.
    pub fn deallocate(&mut self, consumer: VmUid) -> u64 {
        let amount = self.allocations.remove(&consumer).unwrap_or(0);
        self.available += amount;
        amount
    }

    pub fn deallocate_all(&mut self) {
        self.allocations.clear();
        self.available = self.capacity;
    }

    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn available(&self) -> u64 {
        self.available
    }

    pub fn allocated(&self) -> u64 {
        self.capacity - self.available
    }

    pub fn allocated_for(&self, consumer: VmUid) -> u64 {
        self.allocations.get(&consumer).copied().unwrap_or(0)
    }
}

/// Provisioner of processing capacity (MIPS) of a single processing element.
///
/// A VM can hold several slices of the same PE, one per its virtual PE mapped to this element.
#[derive(Clone, Debug)]
pub struct PeProvisioner {
    mips: f64,
    available_mips: f64,
    allocations: BTreeMap<VmUid, Vec<f64>>,
}

impl PeProvisioner {
    pub fn new(mips: f64) -> Self {
        Self {
            mips,
            available_mips: mips,
            allocations: BTreeMap::new(),
        }
    }

    /// Adds a slice of the specified capacity to the VM.
    pub fn allocate_mips_for_vm(&mut self, vm: VmUid, mips: f64) -> Result<(), InsufficientCapacity> {
        // tolerate floating-point errors accumulated while splitting shares between PEs
        if mips > self.available_mips + 1e-9 {
            return Err(InsufficientCapacity::new(ResourceKind::Mips, mips, self.available_mips));
        }
        let mips = mips.min(self.available_mips);
        self.available_mips -= mips;
        self.allocations.entry(vm).or_default().push(mips);
        Ok(())
    }

    /// Returns all slices of the VM to the pool.
    pub fn deallocate_mips_for_vm(&mut self, vm: VmUid) -> f64 {
        let mips = self
            .allocations
            .remove(&vm)
            .map(|slices| slices.iter().sum::<f64>())
            .unwrap_or(0.);
        self.available_mips = (self.available_mips + mips).min(self.mips);
        mips
    }

    pub fn deallocate_mips_for_all_vms(&mut self) {
        self.allocations.clear();
        self.available_mips = self.mips;
    }

    pub fn allocated_mips_for_vm(&self, vm: VmUid) -> f64 {
        self.allocations
            .get(&vm)
            .map(|slices| slices.iter().sum::<f64>())
            .unwrap_or(0.)
    }

    pub fn mips(&self) -> f64 {
        self.mips
    }

    pub fn available_mips(&self) -> f64 {
        self.available_mips
    }

    pub fn is_idle(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Returns the fraction of capacity granted to VMs.
    pub fn utilization(&self) -> f64 {
        if self.mips == 0. {
            return 0.;
        }
        1. - self.available_mips / self.mips
    }
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;

    use super::*;

    fn vm(id: u32) -> VmUid {
        VmUid::new(0, id)
    }

    #[test]
    fn test_reallocation_replaces_share() {
        let mut ram = ResourceProvisioner::ram(4096);
        assert!(ram.allocate(vm(1), 1024).is_ok());
        assert!(ram.allocate(vm(2), 2048).is_ok());
        assert_eq!(ram.available(), 1024);
        assert!(ram.allocate(vm(1), 2048).is_ok());
        assert_eq!(ram.available(), 0);
        assert_eq!(ram.allocated_for(vm(1)), 2048);

        let err = ram.allocate(vm(3), 1).unwrap_err();
        assert_eq!(err.resource, ResourceKind::Ram);
        assert_eq!(err.available, 0.);

        // failed reallocation keeps the previous share
        assert!(ram.allocate(vm(1), 5000).is_err());
        assert_eq!(ram.allocated_for(vm(1)), 2048);
    }

    #[test]
    fn test_deallocate_is_idempotent() {
        let mut bw = ResourceProvisioner::bandwidth(1000);
        bw.allocate(vm(7), 600).unwrap();
        assert_eq!(bw.deallocate(vm(7)), 600);
        assert_eq!(bw.deallocate(vm(7)), 0);
        assert_eq!(bw.available(), 1000);
    }

    #[test]
    fn test_same_vm_id_of_different_owners() {
        let mut ram = ResourceProvisioner::ram(4096);
        let mut pe = PeProvisioner::new(1000.);
        ram.allocate(VmUid::new(1, 0), 1024).unwrap();
        ram.allocate(VmUid::new(2, 0), 2048).unwrap();
        pe.allocate_mips_for_vm(VmUid::new(1, 0), 300.).unwrap();
        pe.allocate_mips_for_vm(VmUid::new(2, 0), 500.).unwrap();
        assert_eq!(ram.available(), 1024);
        assert_eq!(pe.allocated_mips_for_vm(VmUid::new(2, 0)), 500.);

        assert_eq!(ram.deallocate(VmUid::new(1, 0)), 1024);
        assert_eq!(ram.allocated_for(VmUid::new(2, 0)), 2048);
        assert_eq!(pe.deallocate_mips_for_vm(VmUid::new(1, 0)), 300.);
        assert_eq!(pe.available_mips(), 500.);
    }

    #[test]
    fn test_granted_shares_never_exceed_capacity() {
        let mut rng = StdRng::seed_from_u64(123);
        let mut storage = ResourceProvisioner::storage(10_000);
        let mut pe = PeProvisioner::new(2000.);
        for _ in 0..10_000 {
            let consumer = VmUid::new(rng.gen_range(0..2), rng.gen_range(0..10));
            if rng.gen_bool(0.6) {
                let _ = storage.allocate(consumer, rng.gen_range(0..3000));
                let _ = pe.allocate_mips_for_vm(consumer, rng.gen_range(0.0..800.0));
            } else {
                storage.deallocate(consumer);
                pe.deallocate_mips_for_vm(consumer);
            }
            let consumers: Vec<VmUid> = (0..20).map(|c| VmUid::new(c / 10, c % 10)).collect();
            let granted: u64 = consumers.iter().map(|&c| storage.allocated_for(c)).sum();
            assert!(granted <= storage.capacity());
            assert_eq!(granted, storage.allocated());
            let granted_mips: f64 = consumers.iter().map(|&c| pe.allocated_mips_for_vm(c)).sum();
            assert!(granted_mips <= pe.mips() + 1e-6);
            assert!(pe.available_mips() >= 0.);
        }
    }
}
