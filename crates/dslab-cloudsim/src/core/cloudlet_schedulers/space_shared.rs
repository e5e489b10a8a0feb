//! Space-shared cloudlet scheduler.

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::{
    collect_finished, earliest_completion, share_capacity, take_cloudlet, CloudletScheduler,
};

/// Runs a cloudlet only when the VM has enough free PEs for it, other cloudlets wait in FIFO queue.
///
/// Each running cloudlet exclusively uses its PEs, so its speed does not depend on other cloudlets.
#[derive(Clone, Default)]
pub struct CloudletSchedulerSpaceShared {
    exec: Vec<Cloudlet>,
    waiting: Vec<Cloudlet>,
    paused: Vec<Cloudlet>,
    finished: Vec<Cloudlet>,
    mips_share: Vec<f64>,
    previous_time: f64,
}

impl CloudletSchedulerSpaceShared {
    pub fn new() -> Self {
        Self::default()
    }

    fn capacity(&self) -> f64 {
        let (total, cpus) = share_capacity(&self.mips_share);
        if cpus > 0 {
            total / cpus as f64
        } else {
            0.
        }
    }

    fn free_pes(&self) -> u32 {
        let (_, cpus) = share_capacity(&self.mips_share);
        let used: u32 = self.exec.iter().map(|c| c.pes()).sum();
        (cpus as u32).saturating_sub(used)
    }

    /// Starts waiting cloudlets which fit into free PEs, preserving the queue order.
    fn start_waiting(&mut self, time: f64) {
        let mut index = 0;
        while index < self.waiting.len() {
            if self.waiting[index].pes() <= self.free_pes() {
                let mut cloudlet = self.waiting.remove(index);
                cloudlet.set_status(CloudletStatus::InExec, time);
                self.exec.push(cloudlet);
            } else {
                index += 1;
            }
        }
    }

    fn enqueue(&mut self, mut cloudlet: Cloudlet, time: f64) {
        if self.waiting.is_empty() && cloudlet.pes() <= self.free_pes() {
            cloudlet.set_status(CloudletStatus::InExec, time);
            self.exec.push(cloudlet);
        } else {
            cloudlet.set_status(CloudletStatus::Queued, time);
            self.waiting.push(cloudlet);
        }
    }
}

impl CloudletScheduler for CloudletSchedulerSpaceShared {
    fn cloudlet_submit(&mut self, cloudlet: Cloudlet, time: f64) -> Option<f64> {
        let id = cloudlet.id;
        self.enqueue(cloudlet, time);
        let capacity = self.capacity();
        self.exec
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| earliest_completion(std::iter::once(c), time, capacity))
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
        self.start_waiting(time);
        // cloudlets of zero length complete right after start
        collect_finished(&mut self.exec, &mut self.finished, time);

        earliest_completion(self.exec.iter(), time, self.capacity())
    }

    fn cloudlet_cancel(&mut self, cloudlet_id: u32, time: f64) -> Option<Cloudlet> {
        let mut cloudlet = take_cloudlet(&mut self.exec, cloudlet_id)
            .or_else(|| take_cloudlet(&mut self.waiting, cloudlet_id))
            .or_else(|| take_cloudlet(&mut self.paused, cloudlet_id))?;
        cloudlet.set_status(CloudletStatus::Canceled, time);
        self.start_waiting(time);
        Some(cloudlet)
    }

    fn cloudlet_pause(&mut self, cloudlet_id: u32, time: f64) -> bool {
        let cloudlet =
            take_cloudlet(&mut self.exec, cloudlet_id).or_else(|| take_cloudlet(&mut self.waiting, cloudlet_id));
        match cloudlet {
            Some(mut cloudlet) => {
                cloudlet.set_status(CloudletStatus::Paused, time);
                self.paused.push(cloudlet);
                self.start_waiting(time);
                true
            }
            None => false,
        }
    }

    fn cloudlet_resume(&mut self, cloudlet_id: u32, time: f64) -> bool {
        match take_cloudlet(&mut self.paused, cloudlet_id) {
            Some(cloudlet) => {
                self.enqueue(cloudlet, time);
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
            .chain(self.waiting.iter())
            .chain(self.paused.iter())
            .chain(self.finished.iter())
            .find(|c| c.id == cloudlet_id)
            .map(|c| c.status())
    }

    fn running_cloudlets(&self) -> usize {
        self.exec.len()
    }

    fn is_idle(&self) -> bool {
        self.exec.is_empty() && self.waiting.is_empty()
    }

    fn total_utilization_of_cpu(&self, time: f64) -> f64 {
        self.exec.iter().map(|c| c.utilization_of_cpu(time)).sum()
    }

    fn take_all_cloudlets(&mut self) -> Vec<Cloudlet> {
        let mut cloudlets: Vec<Cloudlet> = self.exec.drain(..).collect();
        cloudlets.append(&mut self.waiting);
        cloudlets.append(&mut self.paused);
        cloudlets
    }

    fn take_active_cloudlets(&mut self) -> Vec<Cloudlet> {
        let mut cloudlets: Vec<Cloudlet> = self.exec.drain(..).collect();
        cloudlets.append(&mut self.waiting);
        cloudlets
    }

    /// Cloudlet which needs more PEs than VM has would wait in the queue forever.
    fn can_execute(&self, cloudlet: &Cloudlet, vm_pes: u32) -> bool {
        cloudlet.pes() <= vm_pes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waiting_cloudlet_starts_after_completion() {
        let mut scheduler = CloudletSchedulerSpaceShared::new();
        scheduler.update_vm_processing(0., &[1000.]);
        assert_eq!(
            scheduler.cloudlet_submit(Cloudlet::with_full_utilization(0, 10000., 1, 0, 0), 0.),
            Some(10.)
        );
        assert_eq!(
            scheduler.cloudlet_submit(Cloudlet::with_full_utilization(1, 5000., 1, 0, 0), 0.),
            None
        );
        assert_eq!(scheduler.cloudlet_status(1), Some(CloudletStatus::Queued));
        assert_eq!(scheduler.running_cloudlets(), 1);

        assert_eq!(scheduler.update_vm_processing(10., &[1000.]), Some(15.));
        let first = scheduler.next_finished_cloudlet().unwrap();
        assert_eq!(first.id, 0);
        assert_eq!(first.finish_time(), Some(10.));
        assert_eq!(scheduler.cloudlet_status(1), Some(CloudletStatus::InExec));

        assert_eq!(scheduler.update_vm_processing(15., &[1000.]), None);
        let second = scheduler.next_finished_cloudlet().unwrap();
        assert_eq!(second.start_time(), Some(10.));
        assert_eq!(second.actual_cpu_time(), Some(5.));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_cloudlet_wider_than_vm() {
        let mut scheduler = CloudletSchedulerSpaceShared::new();
        let wide = Cloudlet::with_full_utilization(0, 10000., 2, 0, 0);
        assert!(!scheduler.can_execute(&wide, 1));
        assert!(scheduler.can_execute(&wide, 2));

        scheduler.update_vm_processing(0., &[1000.]);
        scheduler.cloudlet_submit(Cloudlet::with_full_utilization(1, 10000., 1, 0, 0), 0.);
        scheduler.cloudlet_submit(Cloudlet::with_full_utilization(2, 10000., 1, 0, 0), 0.);
        scheduler.cloudlet_pause(2, 0.);
        let active = scheduler.take_active_cloudlets();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 1);
        assert_eq!(scheduler.cloudlet_status(2), Some(CloudletStatus::Paused));
        assert!(scheduler.is_idle());
    }
}
