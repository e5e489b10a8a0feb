//! Representation of cloudlet (application workload) and its status.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::core::utilization_model::{FullUtilization, UtilizationModel};

/// Status of cloudlet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CloudletStatus {
    /// Created but not submitted yet.
    Instantiated,
    /// Waiting for free processing elements of the VM.
    Queued,
    InExec,
    Paused,
    Success,
    Failed,
    Canceled,
}

impl CloudletStatus {
    /// Returns true for statuses after which the cloudlet does not progress anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CloudletStatus::Success | CloudletStatus::Failed | CloudletStatus::Canceled
        )
    }
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Instantiated => write!(f, "instantiated"),
            CloudletStatus::Queued => write!(f, "queued"),
            CloudletStatus::InExec => write!(f, "in_exec"),
            CloudletStatus::Paused => write!(f, "paused"),
            CloudletStatus::Success => write!(f, "success"),
            CloudletStatus::Failed => write!(f, "failed"),
            CloudletStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Represents cloudlet, i.e. a unit of work submitted by broker for execution on a VM.
///
/// Cloudlet is characterized by its length in millions of instructions (MI), the number of required
/// processing elements, input and output file sizes and resource utilization models.
/// Request fields are fixed at creation, while the progress fields are updated by the cloudlet scheduler
/// of the VM which runs the cloudlet.
#[derive(Clone, Serialize)]
pub struct Cloudlet {
    pub id: u32,
    owner_id: u32,
    length: f64,
    pes: u32,
    file_size: u64,
    output_size: u64,
    #[serde(skip)]
    cpu_model: Box<dyn UtilizationModel>,
    #[serde(skip)]
    ram_model: Box<dyn UtilizationModel>,
    #[serde(skip)]
    bw_model: Box<dyn UtilizationModel>,

    status: CloudletStatus,
    vm_id: Option<u32>,
    datacenter_id: Option<u32>,
    submission_time: Option<f64>,
    start_time: Option<f64>,
    finish_time: Option<f64>,
    finished_length: f64,
    cost_per_sec: f64,
    cost_per_bw: f64,
}

impl Cloudlet {
    /// Creates cloudlet with specified parameters.
    pub fn new(
        id: u32,
        length: f64,
        pes: u32,
        file_size: u64,
        output_size: u64,
        cpu_model: Box<dyn UtilizationModel>,
        ram_model: Box<dyn UtilizationModel>,
        bw_model: Box<dyn UtilizationModel>,
    ) -> Self {
        Self {
            id,
            owner_id: 0,
            length: length.max(0.),
            pes: pes.max(1),
            file_size,
            output_size,
            cpu_model,
            ram_model,
            bw_model,
            status: CloudletStatus::Instantiated,
            vm_id: None,
            datacenter_id: None,
            submission_time: None,
            start_time: None,
            finish_time: None,
            finished_length: 0.,
            cost_per_sec: 0.,
            cost_per_bw: 0.,
        }
    }

    /// Creates cloudlet which fully utilizes the requested resources.
    pub fn with_full_utilization(id: u32, length: f64, pes: u32, file_size: u64, output_size: u64) -> Self {
        Self::new(
            id,
            length,
            pes,
            file_size,
            output_size,
            Box::new(FullUtilization),
            Box::new(FullUtilization),
            Box::new(FullUtilization),
        )
    }

    pub fn owner_id(&self) -> u32 {
        self.owner_id
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn pes(&self) -> u32 {
        self.pes
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn output_size(&self) -> u64 {
        self.output_size
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    pub fn vm_id(&self) -> Option<u32> {
        self.vm_id
    }

    pub fn datacenter_id(&self) -> Option<u32> {
        self.datacenter_id
    }

    pub fn submission_time(&self) -> Option<f64> {
        self.submission_time
    }

    /// Returns the time when cloudlet started its execution for the first time.
    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// Returns the executed part of cloudlet length (in MI).
    pub fn finished_length(&self) -> f64 {
        self.finished_length
    }

    pub fn remaining_length(&self) -> f64 {
        (self.length - self.finished_length).max(0.)
    }

    /// Returns the time passed between the start and the end of cloudlet execution.
    pub fn actual_cpu_time(&self) -> Option<f64> {
        match (self.start_time, self.finish_time) {
            (Some(start), Some(finish)) => Some(finish - start),
            _ => None,
        }
    }

    /// Returns the cost of cloudlet processing according to the rates of datacenter where it was executed.
    ///
    /// Consists of the CPU time cost and the cost of transferring the input and output files.
    pub fn processing_cost(&self) -> f64 {
        self.cost_per_sec * self.actual_cpu_time().unwrap_or(0.)
            + self.cost_per_bw * (self.file_size + self.output_size) as f64
    }

    pub fn utilization_of_cpu(&self, time: f64) -> f64 {
        self.cpu_model.utilization(time)
    }

    pub fn utilization_of_ram(&self, time: f64) -> f64 {
        self.ram_model.utilization(time)
    }

    pub fn utilization_of_bw(&self, time: f64) -> f64 {
        self.bw_model.utilization(time)
    }

    /// Sets the component which receives the cloudlet upon completion.
    pub fn set_owner(&mut self, owner_id: u32) {
        self.owner_id = owner_id;
    }

    pub fn set_vm(&mut self, vm_id: u32) {
        self.vm_id = Some(vm_id);
    }

    /// Stamps cloudlet with the datacenter parameters upon its arrival.
    pub(crate) fn set_resource_params(&mut self, datacenter_id: u32, cost_per_sec: f64, cost_per_bw: f64, time: f64) {
        self.datacenter_id = Some(datacenter_id);
        self.cost_per_sec = cost_per_sec;
        self.cost_per_bw = cost_per_bw;
        self.submission_time = Some(time);
    }

    pub(crate) fn set_status(&mut self, status: CloudletStatus, time: f64) {
        if status == CloudletStatus::InExec && self.start_time.is_none() {
            self.start_time = Some(time);
        }
        if status.is_terminal() {
            self.finish_time = Some(time);
        }
        self.status = status;
    }

    pub(crate) fn add_finished_length(&mut self, length: f64) {
        self.finished_length = (self.finished_length + length).min(self.length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_cost() {
        let mut cloudlet = Cloudlet::with_full_utilization(0, 1000., 1, 300, 300);
        cloudlet.set_resource_params(2, 3., 0.5, 1.);
        cloudlet.set_status(CloudletStatus::InExec, 10.);
        cloudlet.set_status(CloudletStatus::Paused, 12.);
        cloudlet.set_status(CloudletStatus::InExec, 14.);
        cloudlet.add_finished_length(1500.);
        cloudlet.set_status(CloudletStatus::Success, 20.);
        assert_eq!(cloudlet.start_time(), Some(10.));
        assert_eq!(cloudlet.actual_cpu_time(), Some(10.));
        assert_eq!(cloudlet.processing_cost(), 3. * 10. + 0.5 * 600.);
        assert_eq!(cloudlet.remaining_length(), 0.);
    }
}
