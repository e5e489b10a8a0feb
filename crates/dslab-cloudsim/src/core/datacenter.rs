//! Datacenter component.

use std::collections::BTreeMap;
use std::rc::Rc;

use dslab_core::cast;
use dslab_core::context::SimulationContext;
use dslab_core::event::{Event, EventId};
use dslab_core::handler::EventHandler;
use dslab_core::{log_debug, log_info, log_trace, log_warn};

use crate::core::characteristics::DatacenterCharacteristics;
use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::config::SimulationConfig;
use crate::core::events::cloudlet::{
    CloudletCancel, CloudletPause, CloudletResume, CloudletReturn, CloudletSubmit, CloudletSubmitAck,
};
use crate::core::events::datacenter::{CharacteristicsReply, CharacteristicsRequest, UpdateProcessing};
use crate::core::events::vm::{VmCreateAck, VmCreateRequest, VmDestroyAck, VmDestroyRequest};
use crate::core::host::Host;
use crate::core::vm::{Vm, VmStatus, VmUid};
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Datacenter owns hosts and VMs placed on them, and processes the VM lifecycle and cloudlet events.
///
/// VMs are identified by their owner and id, so several users can run VMs with the same ids.
///
/// The progress of cloudlets is updated lazily: before each change of datacenter state the cloudlets are advanced
/// to the current time, and after the change the next update is planned at the time of the earliest cloudlet
/// completion. There is at most one pending update event, and no updates are planned while there are no active
/// cloudlets. Cloudlets which can not progress because their VM has no processing capacity are returned as failed.
pub struct Datacenter {
    pub id: u32,
    characteristics: DatacenterCharacteristics,
    hosts: Vec<Host>,
    allocation_policy: VmAllocationPolicy,
    vms: BTreeMap<VmUid, Vm>,
    next_update: Option<(EventId, f64)>,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Datacenter {
    pub fn new(
        hosts: Vec<Host>,
        characteristics: DatacenterCharacteristics,
        allocation_policy: VmAllocationPolicy,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            id: ctx.id(),
            characteristics,
            hosts,
            allocation_policy,
            vms: BTreeMap::new(),
            next_update: None,
            ctx,
            sim_config,
        }
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn characteristics(&self) -> &DatacenterCharacteristics {
        &self.characteristics
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.iter().find(|host| host.id == host_id)
    }

    pub fn vm(&self, vm: VmUid) -> Option<&Vm> {
        self.vms.get(&vm)
    }

    pub fn vm_uids(&self) -> Vec<VmUid> {
        self.vms.keys().copied().collect()
    }

    pub fn host_of(&self, vm: VmUid) -> Option<u32> {
        self.allocation_policy.host_of(vm)
    }

    /// Returns true if some cloudlets are executed or wait for execution.
    pub fn has_active_cloudlets(&self) -> bool {
        self.vms.values().any(|vm| !vm.cloudlet_scheduler().is_idle())
    }

    /// Advances cloudlets to the current time and returns the finished ones to their owners.
    ///
    /// Returns the time of the next cloudlet completion.
    fn update_cloudlet_processing(&mut self) -> Option<f64> {
        let time = self.ctx.time();
        let mut next_time: Option<f64> = None;
        for host in self.hosts.iter_mut() {
            if let Some(completion) = host.update_vms_processing(time, &mut self.vms) {
                next_time = Some(next_time.map_or(completion, |t| t.min(completion)));
            }
        }

        let mut finished = Vec::new();
        for vm in self.vms.values_mut() {
            while let Some(cloudlet) = vm.cloudlet_scheduler_mut().next_finished_cloudlet() {
                finished.push(cloudlet);
            }
        }
        for cloudlet in finished {
            log_debug!(
                self.ctx,
                "cloudlet #{} finished on vm #{}",
                cloudlet.id,
                cloudlet.vm_id().unwrap_or_default()
            );
            self.return_cloudlet(cloudlet);
        }
        next_time
    }

    /// Returns the executing and queued cloudlets of VMs without processing capacity as failed.
    fn fail_stalled_cloudlets(&mut self) {
        let time = self.ctx.time();
        let mut stalled = Vec::new();
        for vm in self.vms.values_mut() {
            if !vm.cloudlet_scheduler().is_idle() {
                let uid = vm.uid();
                for cloudlet in vm.cloudlet_scheduler_mut().take_active_cloudlets() {
                    stalled.push((uid, cloudlet));
                }
            }
        }
        for (uid, mut cloudlet) in stalled {
            log_warn!(self.ctx, "cloudlet #{} failed: vm #{} has no processing capacity", cloudlet.id, uid);
            cloudlet.set_status(CloudletStatus::Failed, time);
            self.return_cloudlet(cloudlet);
        }
    }

    fn return_cloudlet(&mut self, cloudlet: Cloudlet) {
        let owner = cloudlet.owner_id();
        self.ctx
            .emit(CloudletReturn { cloudlet }, owner, self.sim_config.message_delay);
    }

    /// Brings cloudlets up to date after state change and plans the next update.
    fn update_and_plan(&mut self) {
        let next_time = self.update_cloudlet_processing();
        self.plan_next_update(next_time);
    }

    fn plan_next_update(&mut self, next_completion: Option<f64>) {
        // no active cloudlet will ever complete
        if next_completion.is_none() && self.has_active_cloudlets() {
            self.fail_stalled_cloudlets();
        }
        let now = self.ctx.time();
        let mut next_time = next_completion.unwrap_or(f64::INFINITY);
        if self.has_active_cloudlets() && self.sim_config.scheduling_interval > 0. {
            next_time = next_time.min(now + self.sim_config.scheduling_interval);
        }
        if !self.has_active_cloudlets() || next_time.is_infinite() {
            if let Some((event_id, _)) = self.next_update.take() {
                self.ctx.cancel_event(event_id);
            }
            return;
        }
        next_time = next_time.max(now + self.sim_config.min_time_between_events);

        if let Some((event_id, time)) = self.next_update {
            if time == next_time {
                return;
            }
            self.ctx.cancel_event(event_id);
        }
        let event_id = self.ctx.emit_self(UpdateProcessing {}, next_time - now);
        self.next_update = Some((event_id, next_time));
        log_trace!(self.ctx, "next processing update at {:.3}", next_time);
    }

    fn on_characteristics_request(&mut self, src: u32) {
        let reply = CharacteristicsReply {
            characteristics: self.characteristics.clone(),
            host_count: self.hosts.len() as u32,
            pe_count: self.hosts.iter().map(|host| host.pe_count()).sum(),
            total_mips: self.hosts.iter().map(|host| host.total_mips()).sum(),
        };
        self.ctx.emit(reply, src, self.sim_config.message_delay);
    }

    fn on_vm_create_request(&mut self, mut vm: Vm, ack: bool, src: u32) {
        self.update_cloudlet_processing();

        let uid = vm.uid();
        let host_id = if self.vms.contains_key(&uid) {
            log_warn!(self.ctx, "vm #{} already exists", uid);
            None
        } else {
            match self.allocation_policy.allocate_host_for_vm(&mut vm, &mut self.hosts) {
                Ok(host_id) => {
                    log_debug!(self.ctx, "vm #{} created on host #{}", uid, host_id);
                    vm.set_status(VmStatus::Running);
                    vm.set_datacenter(Some(self.id));
                    self.vms.insert(uid, vm);
                    Some(host_id)
                }
                Err(e) => {
                    log_info!(self.ctx, "failed to create vm #{}: {}", uid, e);
                    None
                }
            }
        };
        if ack {
            self.ctx.emit(
                VmCreateAck {
                    vm_id: uid.vm_id,
                    owner_id: uid.owner_id,
                    host_id,
                },
                src,
                self.sim_config.message_delay,
            );
        }
        self.update_and_plan();
    }

    fn on_vm_destroy_request(&mut self, uid: VmUid, ack: bool, src: u32) {
        self.update_cloudlet_processing();

        match self.vms.remove(&uid) {
            Some(mut vm) => {
                self.allocation_policy.deallocate_host_for_vm(&mut vm, &mut self.hosts);
                vm.set_status(VmStatus::Destroyed);
                let time = self.ctx.time();
                for mut cloudlet in vm.cloudlet_scheduler_mut().take_all_cloudlets() {
                    log_info!(self.ctx, "cloudlet #{} failed: vm #{} is destroyed", cloudlet.id, uid);
                    cloudlet.set_status(CloudletStatus::Failed, time);
                    self.return_cloudlet(cloudlet);
                }
                log_debug!(self.ctx, "vm #{} destroyed", uid);
            }
            None => {
                log_warn!(self.ctx, "can't destroy vm #{}: no such vm", uid);
            }
        }
        if ack {
            self.ctx.emit(
                VmDestroyAck {
                    vm_id: uid.vm_id,
                    owner_id: uid.owner_id,
                },
                src,
                self.sim_config.message_delay,
            );
        }
        self.update_and_plan();
    }

    /// Explains why the cloudlet can not be executed here.
    fn rejection_reason(&self, cloudlet: &Cloudlet) -> Option<String> {
        let uid = match cloudlet.vm_id() {
            Some(vm_id) => VmUid::new(cloudlet.owner_id(), vm_id),
            None => return Some("it is not bound to vm".to_string()),
        };
        match self.vms.get(&uid) {
            None => Some(format!("vm #{} is not found", uid)),
            Some(vm) if !vm.cloudlet_scheduler().can_execute(cloudlet, vm.pes()) => Some(format!(
                "it needs {} pes, vm #{} has {}",
                cloudlet.pes(),
                uid,
                vm.pes()
            )),
            Some(_) => None,
        }
    }

    fn on_cloudlet_submit(&mut self, mut cloudlet: Cloudlet, ack: bool, src: u32) {
        self.update_cloudlet_processing();

        let time = self.ctx.time();
        let cloudlet_id = cloudlet.id;
        let vm_id = cloudlet.vm_id();
        let uid = vm_id.map(|vm_id| VmUid::new(cloudlet.owner_id(), vm_id));
        cloudlet.set_resource_params(
            self.id,
            self.characteristics.cost_per_sec,
            self.characteristics.cost_per_bw,
            time,
        );
        let rejection = self.rejection_reason(&cloudlet);
        if let Some(reason) = &rejection {
            log_warn!(self.ctx, "cloudlet #{} failed: {}", cloudlet_id, reason);
            cloudlet.set_status(CloudletStatus::Failed, time);
            self.return_cloudlet(cloudlet);
        } else if let Some(vm) = uid.and_then(|uid| self.vms.get_mut(&uid)) {
            let estimated_finish = vm.submit_cloudlet(cloudlet, time);
            log_debug!(
                self.ctx,
                "cloudlet #{} submitted to vm #{}, estimated finish time: {:.3}",
                cloudlet_id,
                vm.uid(),
                estimated_finish.unwrap_or(f64::INFINITY)
            );
        }
        let accepted = rejection.is_none();
        if ack {
            self.ctx.emit(
                CloudletSubmitAck {
                    cloudlet_id,
                    vm_id,
                    accepted,
                },
                src,
                self.sim_config.message_delay,
            );
        }
        self.update_and_plan();
    }

    fn on_cloudlet_cancel(&mut self, cloudlet_id: u32, uid: VmUid) {
        self.update_cloudlet_processing();

        let time = self.ctx.time();
        let canceled = self
            .vms
            .get_mut(&uid)
            .and_then(|vm| vm.cloudlet_scheduler_mut().cloudlet_cancel(cloudlet_id, time));
        match canceled {
            Some(cloudlet) => {
                log_debug!(self.ctx, "cloudlet #{} canceled", cloudlet_id);
                self.return_cloudlet(cloudlet);
            }
            None => {
                log_debug!(self.ctx, "can't cancel cloudlet #{}: not running on vm #{}", cloudlet_id, uid);
            }
        }
        self.update_and_plan();
    }

    fn on_cloudlet_pause(&mut self, cloudlet_id: u32, uid: VmUid) {
        self.update_cloudlet_processing();

        let time = self.ctx.time();
        let paused = self
            .vms
            .get_mut(&uid)
            .map_or(false, |vm| vm.cloudlet_scheduler_mut().cloudlet_pause(cloudlet_id, time));
        if paused {
            log_debug!(self.ctx, "cloudlet #{} paused", cloudlet_id);
        } else {
            log_debug!(self.ctx, "can't pause cloudlet #{}: not running on vm #{}", cloudlet_id, uid);
        }
        self.update_and_plan();
    }

    fn on_cloudlet_resume(&mut self, cloudlet_id: u32, uid: VmUid) {
        self.update_cloudlet_processing();

        let time = self.ctx.time();
        let resumed = self
            .vms
            .get_mut(&uid)
            .map_or(false, |vm| vm.cloudlet_scheduler_mut().cloudlet_resume(cloudlet_id, time));
        if resumed {
            log_debug!(self.ctx, "cloudlet #{} resumed", cloudlet_id);
        } else {
            log_debug!(self.ctx, "can't resume cloudlet #{}: not paused on vm #{}", cloudlet_id, uid);
        }
        self.update_and_plan();
    }

    fn on_update_processing(&mut self) {
        self.next_update = None;
        self.update_and_plan();
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            CharacteristicsRequest {} => {
                self.on_characteristics_request(event.src);
            }
            VmCreateRequest { vm, ack } => {
                self.on_vm_create_request(vm, ack, event.src);
            }
            VmDestroyRequest { vm_id, owner_id, ack } => {
                self.on_vm_destroy_request(VmUid::new(owner_id, vm_id), ack, event.src);
            }
            CloudletSubmit { cloudlet, ack } => {
                self.on_cloudlet_submit(cloudlet, ack, event.src);
            }
            CloudletCancel {
                cloudlet_id,
                vm_id,
                owner_id,
            } => {
                self.on_cloudlet_cancel(cloudlet_id, VmUid::new(owner_id, vm_id));
            }
            CloudletPause {
                cloudlet_id,
                vm_id,
                owner_id,
            } => {
                self.on_cloudlet_pause(cloudlet_id, VmUid::new(owner_id, vm_id));
            }
            CloudletResume {
                cloudlet_id,
                vm_id,
                owner_id,
            } => {
                self.on_cloudlet_resume(cloudlet_id, VmUid::new(owner_id, vm_id));
            }
            UpdateProcessing {} => {
                self.on_update_processing();
            }
        })
    }
}
