//! Time-shared cloudlet scheduler.

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::{
    collect_finished, earliest_completion, share_capacity, take_cloudlet, CloudletScheduler,
};

/// Runs all submitted cloudlets simultaneously, sharing the VM capacity equally between their PEs.
///
/// Each cloudlet PE gets the average capacity of VM PEs. If cloudlets demand more PEs than VM has,
/// the total capacity is split between all demanded PEs instead.
#[derive(Clone, Default)]
pub struct CloudletSchedulerTimeShared {
    exec: Vec<Cloudlet>,
    paused: Vec<Cloudlet>,
    finished: Vec<Cloudlet>,
    mips_share: Vec<f64>,
    previous_time: f64,
}

impl CloudletSchedulerTimeShared {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the capacity (MIPS) available to a single cloudlet PE.
    fn capacity(&self) -> f64 {
        let (total, cpus) = share_capacity(&self.mips_share);
        let pes_in_use: u32 = self.exec.iter().map(|c| c.pes()).sum();
        if pes_in_use as usize > cpus {
            total / pes_in_use as f64
        } else if cpus > 0 {
            total / cpus as f64
        } else {
            0.
        }
    }
}

impl CloudletScheduler for CloudletSchedulerTimeShared {
    fn cloudlet_submit(&mut self, mut cloudlet: Cloudlet, time: f64) -> Option<f64> {
        cloudlet.set_status(CloudletStatus::InExec, time);
        let remaining = cloudlet.remaining_length();
        let pes = cloudlet.pes() as f64;
        self.exec.push(cloudlet);
        let capacity = self.capacity();
        if capacity > 0. {
            Some(time + remaining / (capacity * pes))
        } else {
            None
        }
    }

    fn update_vm_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        let elapsed = (time - self.previous_time).max(0.);
        let capacity = self.capacity();
        for cloudlet in self.exec.iter_mut() {
            cloudlet.add_finished_length(capacity * cloudlet.pes() as f64 * elapsed);
        }
        self.mips_share = mips_share.to_vec();
        self.previous_time = time;

        collect_finished(&mut self.exec, &mut self.finished, time);

        earliest_completion(self.exec.iter(), time, self.capacity())
    }

    fn cloudlet_cancel(&mut self, cloudlet_id: u32, time: f64) -> Option<Cloudlet> {
        let mut cloudlet =
            take_cloudlet(&mut self.exec, cloudlet_id).or_else(|| take_cloudlet(&mut self.paused, cloudlet_id))?;
        cloudlet.set_status(CloudletStatus::Canceled, time);
        Some(cloudlet)
    }

    fn cloudlet_pause(&mut self, cloudlet_id: u32, time: f64) -> bool {
        match take_cloudlet(&mut self.exec, cloudlet_id) {
            Some(mut cloudlet) => {
                cloudlet.set_status(CloudletStatus::Paused, time);
                self.paused.push(cloudlet);
                true
            }
            None => false,
        }
    }

    fn cloudlet_resume(&mut self, cloudlet_id: u32, time: f64) -> bool {
        match take_cloudlet(&mut self.paused, cloudlet_id) {
            Some(mut cloudlet) => {
                cloudlet.set_status(CloudletStatus::InExec, time);
                self.exec.push(cloudlet);
                true
            }
            None => false,
        }
    }

    fn next_finished_cloudlet(&mut self) -> Option<Cloudlet> {
        if self.finished.is_empty() {
            None
        } else {
            Some(self.finished.remove(0))
        }
    }

    fn cloudlet_status(&self, cloudlet_id: u32) -> Option<CloudletStatus> {
        self.exec
            .iter()
            .chain(self.paused.iter())
            .chain(self.finished.iter())
            .find(|c| c.id == cloudlet_id)
            .map(|c| c.status())
    }

    fn running_cloudlets(&self) -> usize {
        self.exec.len()
    }

    fn is_idle(&self) -> bool {
        self.exec.is_empty()
    }

    fn total_utilization_of_cpu(&self, time: f64) -> f64 {
        self.exec.iter().map(|c| c.utilization_of_cpu(time)).sum()
    }

    fn take_all_cloudlets(&mut self) -> Vec<Cloudlet> {
        let mut cloudlets: Vec<Cloudlet> = self.exec.drain(..).collect();
        cloudlets.append(&mut self.paused);
        cloudlets
    }

    fn take_active_cloudlets(&mut self) -> Vec<Cloudlet> {
        self.exec.drain(..).collect()
    }
}
