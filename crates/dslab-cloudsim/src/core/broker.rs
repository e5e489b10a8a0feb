//! Broker component acting on behalf of a cloud user.

use std::collections::BTreeMap;
use std::rc::Rc;

use indexmap::IndexMap;

use dslab_core::cast;
use dslab_core::context::SimulationContext;
use dslab_core::event::Event;
use dslab_core::handler::EventHandler;
use dslab_core::{log_debug, log_info, log_warn};

use crate::core::characteristics::DatacenterCharacteristics;
use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::config::SimulationConfig;
use crate::core::events::broker::BrokerStart;
use crate::core::events::cloudlet::{CloudletCancel, CloudletPause, CloudletResume, CloudletReturn, CloudletSubmit};
use crate::core::events::datacenter::{CharacteristicsReply, CharacteristicsRequest};
use crate::core::events::vm::{VmCreateAck, VmCreateRequest, VmDestroyRequest};
use crate::core::vm::{Vm, VmStatus};

/// Broker submits VMs and cloudlets of a user to datacenters and collects the results.
///
/// On start the broker requests characteristics of datacenters and then creates VMs in the first one.
/// VMs which could not be created are retried in the next datacenters, and the VMs left after all
/// datacenters were tried become failed. After that the cloudlets are submitted to the created VMs,
/// using the explicit bindings or the round-robin assignment for unbound cloudlets.
/// When all cloudlets are returned, the broker destroys its VMs.
/// A VM can also be destroyed earlier on request, its unfinished cloudlets are then returned as failed.
pub struct Broker {
    pub id: u32,
    vms: Vec<Vm>,
    cloudlets: Vec<Cloudlet>,
    bindings: IndexMap<u32, u32>,
    received: Vec<Cloudlet>,

    datacenters: Vec<u32>,
    characteristics: BTreeMap<u32, DatacenterCharacteristics>,
    next_datacenter: usize,
    vm_locations: BTreeMap<u32, u32>,
    created_vms: Vec<u32>,
    pending_vm_acks: usize,
    submitted_cloudlets: BTreeMap<u32, u32>,

    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Broker {
    pub fn new(ctx: SimulationContext, sim_config: Rc<SimulationConfig>) -> Self {
        Self {
            id: ctx.id(),
            vms: Vec::new(),
            cloudlets: Vec::new(),
            bindings: IndexMap::new(),
            received: Vec::new(),
            datacenters: Vec::new(),
            characteristics: BTreeMap::new(),
            next_datacenter: 0,
            vm_locations: BTreeMap::new(),
            created_vms: Vec::new(),
            pending_vm_acks: 0,
            submitted_cloudlets: BTreeMap::new(),
            ctx,
            sim_config,
        }
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    /// Adds VMs to be created on start. The broker becomes the owner of the VMs.
    pub fn submit_vm_list(&mut self, vms: Vec<Vm>) {
        for mut vm in vms {
            vm.set_owner(self.id);
            self.vms.push(vm);
        }
    }

    /// Adds cloudlets to be submitted after VMs are created.
    pub fn submit_cloudlet_list(&mut self, cloudlets: Vec<Cloudlet>) {
        for mut cloudlet in cloudlets {
            cloudlet.set_owner(self.id);
            self.cloudlets.push(cloudlet);
        }
    }

    /// Requests cloudlet to run on the specified VM.
    pub fn bind_cloudlet_to_vm(&mut self, cloudlet_id: u32, vm_id: u32) {
        self.bindings.insert(cloudlet_id, vm_id);
    }

    /// Cancels the execution of cloudlet.
    ///
    /// A cloudlet which was not submitted yet is canceled immediately, otherwise the cancel request is sent to the
    /// datacenter. The request has no effect if the cloudlet completes before the request is processed.
    /// Returns false if the cloudlet is unknown or already returned.
    pub fn cancel_cloudlet(&mut self, cloudlet_id: u32) -> bool {
        if let Some(index) = self.cloudlets.iter().position(|c| c.id == cloudlet_id) {
            let mut cloudlet = self.cloudlets.remove(index);
            cloudlet.set_status(CloudletStatus::Canceled, self.ctx.time());
            log_info!(self.ctx, "cloudlet #{} canceled before submission", cloudlet_id);
            self.received.push(cloudlet);
            return true;
        }
        match self.cloudlet_location(cloudlet_id) {
            Some((vm_id, datacenter_id)) => {
                self.ctx.emit(
                    CloudletCancel {
                        cloudlet_id,
                        vm_id,
                        owner_id: self.id,
                    },
                    datacenter_id,
                    self.sim_config.message_delay,
                );
                true
            }
            None => false,
        }
    }

    /// Suspends the execution of submitted cloudlet. Returns false if the cloudlet is not running.
    pub fn pause_cloudlet(&mut self, cloudlet_id: u32) -> bool {
        match self.cloudlet_location(cloudlet_id) {
            Some((vm_id, datacenter_id)) => {
                self.ctx.emit(
                    CloudletPause {
                        cloudlet_id,
                        vm_id,
                        owner_id: self.id,
                    },
                    datacenter_id,
                    self.sim_config.message_delay,
                );
                true
            }
            None => false,
        }
    }

    /// Resumes the execution of paused cloudlet. Returns false if the cloudlet is not running.
    pub fn resume_cloudlet(&mut self, cloudlet_id: u32) -> bool {
        match self.cloudlet_location(cloudlet_id) {
            Some((vm_id, datacenter_id)) => {
                self.ctx.emit(
                    CloudletResume {
                        cloudlet_id,
                        vm_id,
                        owner_id: self.id,
                    },
                    datacenter_id,
                    self.sim_config.message_delay,
                );
                true
            }
            None => false,
        }
    }

    /// Destroys created VM. The cloudlets still running on the VM are returned by datacenter as failed.
    ///
    /// Returns false if the VM is not running.
    pub fn destroy_vm(&mut self, vm_id: u32) -> bool {
        let datacenter_id = match self.vm_locations.remove(&vm_id) {
            Some(datacenter_id) => datacenter_id,
            None => return false,
        };
        log_debug!(self.ctx, "destroying vm #{} in {}", vm_id, self.ctx.lookup_name(datacenter_id));
        self.ctx.emit(
            VmDestroyRequest {
                vm_id,
                owner_id: self.id,
                ack: false,
            },
            datacenter_id,
            self.sim_config.message_delay,
        );
        if let Some(vm) = self.vm_mut(vm_id) {
            vm.set_status(VmStatus::Destroyed);
            vm.set_host(None);
        }
        true
    }

    /// Returns the cloudlets in terminal status in the order of their arrival.
    pub fn cloudlet_received_list(&self) -> &[Cloudlet] {
        &self.received
    }

    pub fn vm_list(&self) -> &[Vm] {
        &self.vms
    }

    /// Returns ids of created VMs in the order of creation.
    pub fn created_vm_ids(&self) -> &[u32] {
        &self.created_vms
    }

    pub fn datacenter_characteristics(&self, datacenter_id: u32) -> Option<&DatacenterCharacteristics> {
        self.characteristics.get(&datacenter_id)
    }

    /// Returns true if there are no cloudlets waiting for submission or return.
    pub fn is_done(&self) -> bool {
        self.cloudlets.is_empty() && self.submitted_cloudlets.is_empty()
    }

    fn cloudlet_location(&self, cloudlet_id: u32) -> Option<(u32, u32)> {
        let vm_id = *self.submitted_cloudlets.get(&cloudlet_id)?;
        let datacenter_id = *self.vm_locations.get(&vm_id)?;
        Some((vm_id, datacenter_id))
    }

    fn vm_mut(&mut self, vm_id: u32) -> Option<&mut Vm> {
        self.vms.iter_mut().find(|vm| vm.id == vm_id)
    }

    fn on_start(&mut self, datacenters: Vec<u32>) {
        log_info!(
            self.ctx,
            "started with {} vms and {} cloudlets",
            self.vms.len(),
            self.cloudlets.len()
        );
        self.datacenters = datacenters;
        if self.datacenters.is_empty() {
            self.create_vms_in_next_datacenter();
            return;
        }
        for &datacenter_id in self.datacenters.iter() {
            self.ctx
                .emit(CharacteristicsRequest {}, datacenter_id, self.sim_config.message_delay);
        }
    }

    fn on_characteristics_reply(&mut self, characteristics: DatacenterCharacteristics, src: u32) {
        log_debug!(self.ctx, "received characteristics of {}", self.ctx.lookup_name(src));
        self.characteristics.insert(src, characteristics);
        if self.characteristics.len() == self.datacenters.len() {
            self.create_vms_in_next_datacenter();
        }
    }

    fn create_vms_in_next_datacenter(&mut self) {
        let pending: Vec<Vm> = self
            .vms
            .iter()
            .filter(|vm| vm.status() == VmStatus::Pending)
            .cloned()
            .collect();
        if pending.is_empty() {
            self.submit_cloudlets();
            return;
        }
        match self.datacenters.get(self.next_datacenter).copied() {
            Some(datacenter_id) => {
                self.next_datacenter += 1;
                log_debug!(
                    self.ctx,
                    "trying to create {} vms in {}",
                    pending.len(),
                    self.ctx.lookup_name(datacenter_id)
                );
                for vm in pending {
                    self.pending_vm_acks += 1;
                    self.ctx.emit(
                        VmCreateRequest { vm, ack: true },
                        datacenter_id,
                        self.sim_config.message_delay,
                    );
                }
            }
            None => {
                for vm in self.vms.iter_mut().filter(|vm| vm.status() == VmStatus::Pending) {
                    vm.set_status(VmStatus::Failed);
                    log_warn!(self.ctx, "vm #{} failed: no datacenter can host it", vm.id);
                }
                self.submit_cloudlets();
            }
        }
    }

    fn on_vm_create_ack(&mut self, vm_id: u32, host_id: Option<u32>, src: u32) {
        self.pending_vm_acks -= 1;
        match host_id {
            Some(host_id) => {
                log_debug!(
                    self.ctx,
                    "vm #{} created in {} on host #{}",
                    vm_id,
                    self.ctx.lookup_name(src),
                    host_id
                );
                if let Some(vm) = self.vm_mut(vm_id) {
                    vm.set_status(VmStatus::Running);
                    vm.set_host(Some(host_id));
                    vm.set_datacenter(Some(src));
                }
                self.vm_locations.insert(vm_id, src);
                self.created_vms.push(vm_id);
            }
            None => {
                log_debug!(self.ctx, "creation of vm #{} in {} failed", vm_id, self.ctx.lookup_name(src));
            }
        }
        if self.pending_vm_acks == 0 {
            self.create_vms_in_next_datacenter();
        }
    }

    fn submit_cloudlets(&mut self) {
        let mut next_vm = 0;
        let running_vms: Vec<u32> = self
            .created_vms
            .iter()
            .copied()
            .filter(|vm_id| self.vm_locations.contains_key(vm_id))
            .collect();
        for mut cloudlet in std::mem::take(&mut self.cloudlets) {
            let vm_id = match self.bindings.get(&cloudlet.id) {
                Some(&vm_id) => Some(vm_id),
                None if !running_vms.is_empty() => {
                    let vm_id = running_vms[next_vm % running_vms.len()];
                    next_vm += 1;
                    self.bindings.insert(cloudlet.id, vm_id);
                    Some(vm_id)
                }
                None => None,
            };
            if let Some(vm_id) = vm_id {
                cloudlet.set_vm(vm_id);
            }
            match vm_id.and_then(|vm_id| self.vm_locations.get(&vm_id).copied()) {
                Some(datacenter_id) => {
                    log_debug!(
                        self.ctx,
                        "sending cloudlet #{} to vm #{}",
                        cloudlet.id,
                        vm_id.unwrap_or_default()
                    );
                    self.submitted_cloudlets.insert(cloudlet.id, vm_id.unwrap_or_default());
                    self.ctx.emit(
                        CloudletSubmit { cloudlet, ack: false },
                        datacenter_id,
                        self.sim_config.message_delay,
                    );
                }
                None => {
                    log_warn!(self.ctx, "cloudlet #{} failed: vm {:?} is not running", cloudlet.id, vm_id);
                    cloudlet.set_status(CloudletStatus::Failed, self.ctx.time());
                    self.received.push(cloudlet);
                }
            }
        }
        if self.submitted_cloudlets.is_empty() {
            self.finish();
        }
    }

    fn on_cloudlet_return(&mut self, cloudlet: Cloudlet) {
        log_debug!(self.ctx, "cloudlet #{} returned with status {}", cloudlet.id, cloudlet.status());
        self.submitted_cloudlets.remove(&cloudlet.id);
        self.received.push(cloudlet);
        if self.is_done() {
            self.finish();
        }
    }

    fn finish(&mut self) {
        log_info!(
            self.ctx,
            "all {} cloudlets are received, destroying vms",
            self.received.len()
        );
        for vm_id in self.created_vms.clone() {
            self.destroy_vm(vm_id);
        }
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            BrokerStart { datacenters } => {
                self.on_start(datacenters);
            }
            CharacteristicsReply {
                characteristics,
                host_count: _,
                pe_count: _,
                total_mips: _,
            } => {
                self.on_characteristics_reply(characteristics, event.src);
            }
            VmCreateAck {
                vm_id,
                owner_id: _,
                host_id,
            } => {
                self.on_vm_create_ack(vm_id, host_id, event.src);
            }
            CloudletReturn { cloudlet } => {
                self.on_cloudlet_return(cloudlet);
            }
        })
    }
}
