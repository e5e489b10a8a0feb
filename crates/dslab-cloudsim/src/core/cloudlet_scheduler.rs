//! VM-level scheduling of cloudlets.

use dyn_clone::{clone_trait_object, DynClone};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};

/// Executed length (in MI) below which a cloudlet is considered completed.
pub const COMPLETION_TOLERANCE: f64 = 1e-6;

/// Trait for implementation of policies which share the processing capacity of VM among its cloudlets.
///
/// The scheduler is updated lazily: the owner calls [`update_vm_processing`](CloudletScheduler::update_vm_processing)
/// whenever the time advances or the capacity share of VM changes, and the scheduler advances the resident cloudlets
/// according to the share which was valid since the previous update. The returned time of the next completion
/// allows the owner to schedule the next update without periodic polling.
pub trait CloudletScheduler: DynClone {
    /// Accepts cloudlet for execution and returns its estimated finish time
    /// (`None` if the VM has no capacity at the moment).
    ///
    /// The caller is expected to bring the scheduler up to date at `time` before submitting.
    fn cloudlet_submit(&mut self, cloudlet: Cloudlet, time: f64) -> Option<f64>;

    /// Advances the resident cloudlets to `time` and stores the new capacity share of VM (MIPS per VM PE).
    ///
    /// Returns the absolute time of the earliest expected cloudlet completion.
    fn update_vm_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64>;

    /// Removes unfinished cloudlet and returns it in `Canceled` status.
    fn cloudlet_cancel(&mut self, cloudlet_id: u32, time: f64) -> Option<Cloudlet>;

    /// Suspends execution of cloudlet. Returns false if there is no such unfinished cloudlet.
    fn cloudlet_pause(&mut self, cloudlet_id: u32, time: f64) -> bool;

    /// Resumes paused cloudlet. Returns false if there is no such paused cloudlet.
    fn cloudlet_resume(&mut self, cloudlet_id: u32, time: f64) -> bool;

    /// Pops the next completed cloudlet in the order of completion.
    fn next_finished_cloudlet(&mut self) -> Option<Cloudlet>;

    fn cloudlet_status(&self, cloudlet_id: u32) -> Option<CloudletStatus>;

    /// Returns the number of executing cloudlets.
    fn running_cloudlets(&self) -> usize;

    /// Returns true if there are no executing or queued cloudlets.
    fn is_idle(&self) -> bool;

    fn total_utilization_of_cpu(&self, time: f64) -> f64;

    /// Removes all unfinished cloudlets (executing, queued and paused) from the scheduler.
    fn take_all_cloudlets(&mut self) -> Vec<Cloudlet>;

    /// Removes executing and queued cloudlets, paused ones are kept.
    fn take_active_cloudlets(&mut self) -> Vec<Cloudlet>;

    /// Checks whether the cloudlet can ever be executed on VM with the given number of PEs.
    fn can_execute(&self, _cloudlet: &Cloudlet, _vm_pes: u32) -> bool {
        true
    }
}

clone_trait_object!(CloudletScheduler);

/// Returns the total capacity and the number of processing elements with non-zero share.
pub(crate) fn share_capacity(mips_share: &[f64]) -> (f64, usize) {
    mips_share
        .iter()
        .filter(|&&mips| mips > 0.)
        .fold((0., 0), |(total, cpus), mips| (total + mips, cpus + 1))
}

/// Removes cloudlet with specified id from the list.
pub(crate) fn take_cloudlet(list: &mut Vec<Cloudlet>, cloudlet_id: u32) -> Option<Cloudlet> {
    list.iter()
        .position(|c| c.id == cloudlet_id)
        .map(|index| list.remove(index))
}

/// Moves completed cloudlets from the list to the finished queue.
pub(crate) fn collect_finished(list: &mut Vec<Cloudlet>, finished: &mut Vec<Cloudlet>, time: f64) {
    let mut index = 0;
    while index < list.len() {
        if list[index].remaining_length() <= COMPLETION_TOLERANCE {
            let mut cloudlet = list.remove(index);
            cloudlet.set_status(CloudletStatus::Success, time);
            finished.push(cloudlet);
        } else {
            index += 1;
        }
    }
}

/// Returns the earliest completion time of cloudlets progressing with the given speed per PE.
pub(crate) fn earliest_completion<'a, I>(cloudlets: I, time: f64, capacity: f64) -> Option<f64>
where
    I: Iterator<Item = &'a Cloudlet>,
{
    if capacity <= 0. {
        return None;
    }
    cloudlets
        .map(|c| time + c.remaining_length() / (capacity * c.pes() as f64))
        .min_by(|a, b| a.total_cmp(b))
}
