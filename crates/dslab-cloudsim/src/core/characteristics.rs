//! Static description of datacenter.

use serde::{Deserialize, Serialize};

/// Holds the properties of datacenter resources and the prices of their usage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatacenterCharacteristics {
    /// Architecture of hosts.
    pub architecture: String,
    /// Operating system of hosts.
    pub os: String,
    /// Virtual machine monitor.
    pub vmm: String,
    pub time_zone: f64,
    /// Price of using processing per second.
    pub cost_per_sec: f64,
    /// Price of using memory per MB.
    pub cost_per_mem: f64,
    /// Price of using storage per MB.
    pub cost_per_storage: f64,
    /// Price of transferring data per MB.
    pub cost_per_bw: f64,
}

impl Default for DatacenterCharacteristics {
    fn default() -> Self {
        Self {
            architecture: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "Xen".to_string(),
            time_zone: 10.,
            cost_per_sec: 3.,
            cost_per_mem: 0.05,
            cost_per_storage: 0.001,
            cost_per_bw: 0.,
        }
    }
}
