use rand::prelude::*;

use dslab_cloudsim::core::cloudlet::{Cloudlet, CloudletStatus};
use dslab_cloudsim::core::cloudlet_scheduler::CloudletScheduler;
use dslab_cloudsim::core::cloudlet_schedulers::time_shared::CloudletSchedulerTimeShared;
use dslab_cloudsim::core::common::ResourceKind;
use dslab_cloudsim::core::host::Host;
use dslab_cloudsim::core::pe::{pe_list, PeStatus};
use dslab_cloudsim::core::vm::{Vm, VmUid};
use dslab_cloudsim::core::vm_allocation_policy::VmAllocationPolicy;
use dslab_cloudsim::core::vm_placement_algorithm::{placement_algorithm_resolver, VmPlacementAlgorithm};
use dslab_cloudsim::core::vm_placement_algorithms::best_fit::BestFit;
use dslab_cloudsim::core::vm_placement_algorithms::worst_fit::WorstFit;
use dslab_cloudsim::core::vm_scheduler::vm_scheduler_resolver;
use dslab_cloudsim::core::vm_schedulers::time_shared::VmSchedulerTimeShared;

fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!((x - y).abs() < eps, "{} != {}", x, y);
}

fn host(id: u32, pes: u32, mips: f64, ram: u64, scheduler: &str) -> Host {
    Host::new(id, pe_list(pes, mips), ram, 10000, 100000, vm_scheduler_resolver(scheduler))
}

fn vm(id: u32, mips: f64, pes: u32, ram: u64) -> Vm {
    Vm::new(
        id,
        0,
        mips,
        pes,
        ram,
        1000,
        10000,
        "Xen",
        Box::new(CloudletSchedulerTimeShared::new()),
    )
}

fn cloudlet(id: u32, length: f64, pes: u32) -> Cloudlet {
    Cloudlet::with_full_utilization(id, length, pes, 300, 300)
}

#[test]
// Cloudlets demanding more PEs than VM has share the total VM capacity.
fn test_time_shared_cloudlets() {
    let mut scheduler = CloudletSchedulerTimeShared::new();
    scheduler.update_vm_processing(0., &[1000., 1000.]);
    assert_eq!(scheduler.cloudlet_submit(cloudlet(0, 10000., 1), 0.), Some(10.));
    scheduler.cloudlet_submit(cloudlet(1, 10000., 1), 0.);
    scheduler.cloudlet_submit(cloudlet(2, 20000., 1), 0.);
    assert_eq!(scheduler.running_cloudlets(), 3);

    // 2000 MIPS split between 3 cloudlets
    let next = scheduler.update_vm_processing(0., &[1000., 1000.]).unwrap();
    assert_float_eq(next, 15., 1e-9);

    let next = scheduler.update_vm_processing(15., &[1000., 1000.]).unwrap();
    assert_eq!(scheduler.next_finished_cloudlet().unwrap().id, 0);
    assert_eq!(scheduler.next_finished_cloudlet().unwrap().id, 1);
    assert!(scheduler.next_finished_cloudlet().is_none());
    // the last cloudlet now runs on a whole PE
    assert_float_eq(next, 25., 1e-9);
    assert_float_eq(scheduler.total_utilization_of_cpu(15.), 1., 1e-9);

    assert_eq!(scheduler.update_vm_processing(25., &[1000., 1000.]), None);
    let last = scheduler.next_finished_cloudlet().unwrap();
    assert_eq!(last.status(), CloudletStatus::Success);
    assert_float_eq(last.actual_cpu_time().unwrap(), 25., 1e-9);
    assert!(scheduler.is_idle());
}

#[test]
fn test_cancel_pause_resume() {
    let mut scheduler = CloudletSchedulerTimeShared::new();
    scheduler.update_vm_processing(0., &[1000.]);
    scheduler.cloudlet_submit(cloudlet(0, 10000., 1), 0.);
    scheduler.cloudlet_submit(cloudlet(1, 10000., 1), 0.);

    scheduler.update_vm_processing(4., &[1000.]);
    assert!(scheduler.cloudlet_pause(1, 4.));
    assert_eq!(scheduler.cloudlet_status(1), Some(CloudletStatus::Paused));
    assert!(!scheduler.cloudlet_pause(1, 4.));

    // the remaining cloudlet runs alone
    assert_eq!(scheduler.update_vm_processing(4., &[1000.]), Some(12.));
    scheduler.update_vm_processing(6., &[1000.]);
    let canceled = scheduler.cloudlet_cancel(0, 6.).unwrap();
    assert_eq!(canceled.status(), CloudletStatus::Canceled);
    assert_float_eq(canceled.finished_length(), 4000., 1e-9);
    assert_eq!(canceled.finish_time(), Some(6.));
    assert!(scheduler.cloudlet_cancel(0, 6.).is_none());
    assert!(scheduler.is_idle());
    assert_eq!(scheduler.update_vm_processing(6., &[1000.]), None);

    assert!(scheduler.cloudlet_resume(1, 6.));
    assert_eq!(scheduler.cloudlet_status(1), Some(CloudletStatus::InExec));
    assert_eq!(scheduler.update_vm_processing(6., &[1000.]), Some(14.));
}

#[test]
fn test_take_all_cloudlets() {
    let mut scheduler = CloudletSchedulerTimeShared::new();
    scheduler.update_vm_processing(0., &[1000.]);
    scheduler.cloudlet_submit(cloudlet(0, 10000., 1), 0.);
    scheduler.cloudlet_submit(cloudlet(1, 10000., 1), 0.);
    scheduler.cloudlet_pause(1, 0.);
    let cloudlets = scheduler.take_all_cloudlets();
    assert_eq!(cloudlets.len(), 2);
    assert!(scheduler.is_idle());
    assert_eq!(scheduler.cloudlet_status(0), None);
}

#[test]
fn test_host_rolls_back_failed_creation() {
    let mut host = host(0, 4, 1000., 4096, "TimeShared");
    // memory fits, but the VM has too many PEs
    let mut large = vm(0, 1000., 8, 1024);
    let err = host.can_host(&large).unwrap_err();
    assert_eq!(err.resource, ResourceKind::Pes);
    assert!(host.vm_create(&mut large).is_err());
    assert_eq!(host.ram().available(), 4096);
    assert_eq!(host.storage().available(), 100000);
    assert_eq!(host.bw().available(), 10000);
    assert_eq!(large.host_id(), None);

    let mut fat = vm(1, 1000., 1, 8192);
    assert_eq!(host.can_host(&fat).unwrap_err().resource, ResourceKind::Ram);
    assert!(host.vm_create(&mut fat).is_err());

    let mut small = vm(2, 1000., 2, 1024);
    assert!(host.vm_create(&mut small).is_ok());
    assert_eq!(small.host_id(), Some(0));
    assert_eq!(host.vm_uids(), &[small.uid()]);
    assert_eq!(host.pes()[0].status(), PeStatus::Busy);
    assert_eq!(host.pes()[3].status(), PeStatus::Free);

    host.vm_destroy(&mut small);
    assert_eq!(small.host_id(), None);
    assert!(host.vm_uids().is_empty());
    assert_eq!(host.ram().available(), 4096);
    assert_float_eq(host.available_mips(), 4000., 1e-9);
}

#[test]
// If host reports that VM is suitable, the VM creation succeeds.
fn test_suitability_implies_creation() {
    let mut rng = StdRng::seed_from_u64(123);
    for scheduler in ["TimeShared", "SpaceShared"] {
        let mut host = host(0, 4, 2000., 8192, scheduler);
        let mut resident: Vec<Vm> = Vec::new();
        for id in 0..500 {
            if rng.gen_bool(0.7) {
                let mut vm = vm(
                    id,
                    rng.gen_range(1..=4) as f64 * 500.,
                    rng.gen_range(1..=3),
                    rng.gen_range(1..=8) * 512,
                );
                if host.is_suitable_for_vm(&vm) {
                    assert!(host.vm_create(&mut vm).is_ok());
                    resident.push(vm);
                } else {
                    assert!(host.vm_create(&mut vm).is_err());
                }
            } else if !resident.is_empty() {
                let index = rng.gen_range(0..resident.len());
                let mut vm = resident.remove(index);
                host.vm_destroy(&mut vm);
            }
            let ram: u64 = resident.iter().map(|vm| vm.ram()).sum();
            assert_eq!(host.ram().allocated(), ram);
            assert!(host.ram().allocated() <= host.ram().capacity());
            let granted: f64 = host.pes().iter().map(|pe| pe.mips() - pe.provisioner().available_mips()).sum();
            assert!(granted <= host.total_mips() + 1e-6);
        }
    }
}

#[test]
fn test_placement_algorithms() {
    let mut hosts = vec![
        host(0, 4, 1000., 4096, "TimeShared"),
        host(1, 2, 1000., 4096, "TimeShared"),
        host(2, 1, 1000., 512, "TimeShared"),
    ];
    let candidate = vm(10, 1000., 1, 1024);

    assert_eq!(placement_algorithm_resolver("FirstFit").select_host(&candidate, &hosts), Some(0));
    assert_eq!(placement_algorithm_resolver("BestFit").select_host(&candidate, &hosts), Some(1));
    assert_eq!(placement_algorithm_resolver("WorstFit").select_host(&candidate, &hosts), Some(0));

    let mut policy = VmAllocationPolicy::new(Box::new(BestFit::new()));
    let mut first = vm(0, 1000., 1, 1024);
    assert_eq!(policy.allocate_host_for_vm(&mut first, &mut hosts), Ok(1));
    assert_eq!(policy.host_of(first.uid()), Some(1));

    let mut policy = VmAllocationPolicy::new(Box::new(WorstFit::new()));
    let mut second = vm(1, 1000., 1, 1024);
    assert_eq!(policy.allocate_host_for_vm(&mut second, &mut hosts), Ok(0));
    policy.deallocate_host_for_vm(&mut second, &mut hosts);
    assert_eq!(policy.host_of(second.uid()), None);
    assert_eq!(hosts[0].ram().available(), 4096);

    let mut explicit = vm(2, 1000., 1, 256);
    assert!(policy.allocate_host_for_vm_on(&mut explicit, &mut hosts[2]));
    assert_eq!(policy.host_of(explicit.uid()), Some(2));

    let mut huge = vm(3, 1000., 1, 1_000_000);
    let err = policy.allocate_host_for_vm(&mut huge, &mut hosts).unwrap_err();
    assert_eq!(err.vm_id, 3);
    assert_eq!(huge.host_id(), None);
}

#[test]
fn test_shares_follow_host_population() {
    let mut host = Host::new(0, pe_list(2, 1000.), 4096, 10000, 100000, Box::new(VmSchedulerTimeShared::new()));
    let mut vms: Vec<Vm> = (0..4).map(|id| vm(id, 1000., 1, 512)).collect();
    for vm in vms.iter_mut() {
        host.vm_create(vm).unwrap();
    }
    for vm in vms.iter() {
        assert_float_eq(host.mips_share(vm.uid())[0], 500., 1e-9);
    }
    host.vm_destroy(&mut vms[0]);
    host.vm_destroy(&mut vms[1]);
    assert_eq!(host.mips_share(VmUid::new(0, 2)), vec![1000.]);
    assert!(host.mips_share(VmUid::new(0, 0)).is_empty());
}

#[test]
// VMs of different users may have the same id.
fn test_same_vm_id_of_different_owners() {
    let mut hosts = vec![host(0, 2, 1000., 4096, "TimeShared")];
    let mut policy = VmAllocationPolicy::default();
    let mut first = vm(0, 1000., 1, 1024);
    first.set_owner(1);
    let mut second = vm(0, 1000., 1, 1024);
    second.set_owner(2);
    assert_eq!(policy.allocate_host_for_vm(&mut first, &mut hosts), Ok(0));
    assert_eq!(policy.allocate_host_for_vm(&mut second, &mut hosts), Ok(0));
    assert_eq!(hosts[0].vm_uids(), &[VmUid::new(1, 0), VmUid::new(2, 0)]);
    assert_eq!(hosts[0].ram().available(), 2048);

    policy.deallocate_host_for_vm(&mut first, &mut hosts);
    assert_eq!(policy.host_of(VmUid::new(1, 0)), None);
    assert_eq!(policy.host_of(VmUid::new(2, 0)), Some(0));
    assert_eq!(hosts[0].vm_uids(), &[VmUid::new(2, 0)]);
    assert_eq!(hosts[0].mips_share(second.uid()), vec![1000.]);
}
