//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::core::characteristics::DatacenterCharacteristics;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub min_time_between_events: Option<f64>,
    pub scheduling_interval: Option<f64>,
    pub message_delay: Option<f64>,
    pub trace_events: Option<bool>,
    pub datacenters: Option<Vec<DatacenterConfig>>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Host name prefix.
    /// Full name is produced by appending host instance number to the prefix.
    pub name_prefix: Option<String>,
    /// Number of processing elements.
    pub pes: u32,
    /// Capacity of a single processing element in MIPS.
    pub mips: f64,
    /// Memory capacity in MB.
    pub ram: u64,
    /// Bandwidth capacity.
    pub bw: u64,
    /// Storage capacity in MB.
    pub storage: u64,
    /// VM scheduler used by host(s), `TimeShared` by default.
    pub vm_scheduler: Option<String>,
    /// Number of such hosts.
    pub count: Option<u32>,
}

/// Holds configuration of a datacenter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct DatacenterConfig {
    pub name: String,
    pub characteristics: Option<DatacenterCharacteristics>,
    /// VM placement algorithm, `FirstFit` by default.
    pub vm_allocation: Option<String>,
    pub hosts: Vec<HostConfig>,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Minimal delay in seconds between consecutive processing updates of datacenter.
    pub min_time_between_events: f64,
    /// Period in seconds of processing updates while cloudlets are running, 0 disables periodic updates.
    pub scheduling_interval: f64,
    /// Message delay in seconds for communications between brokers and datacenters.
    pub message_delay: f64,
    /// Whether to record the trace of processed events.
    pub trace_events: bool,
    /// Configurations of datacenters.
    pub datacenters: Vec<DatacenterConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::from_raw(RawSimulationConfig::default())
    }
}

impl SimulationConfig {
    fn from_raw(raw: RawSimulationConfig) -> Self {
        Self {
            min_time_between_events: raw.min_time_between_events.unwrap_or(0.01),
            scheduling_interval: raw.scheduling_interval.unwrap_or(0.),
            message_delay: raw.message_delay.unwrap_or(0.),
            trace_events: raw.trace_events.unwrap_or(false),
            datacenters: raw.datacenters.unwrap_or_default(),
        }
    }

    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Self {
        let raw: RawSimulationConfig = serde_yaml::from_str(
            &std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
        .unwrap_or_else(|e| panic!("Can't parse YAML from file {}: {}", file_name, e));
        Self::from_raw(raw)
    }

    /// Creates simulation config from YAML string.
    pub fn from_yaml_str(yaml: &str) -> Self {
        let raw: RawSimulationConfig =
            serde_yaml::from_str(yaml).unwrap_or_else(|e| panic!("Can't parse YAML config: {}", e));
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::from_yaml_str("message_delay: 0.5");
        assert_eq!(config.message_delay, 0.5);
        assert_eq!(config.min_time_between_events, 0.01);
        assert_eq!(config.scheduling_interval, 0.);
        assert!(!config.trace_events);
        assert!(config.datacenters.is_empty());
    }

    #[test]
    fn test_datacenters() {
        let config = SimulationConfig::from_yaml_str(
            r#"
datacenters:
  - name: dc0
    vm_allocation: BestFit
    characteristics:
      cost_per_sec: 2.5
    hosts:
      - pes: 4
        mips: 2000
        ram: 4096
        bw: 10000
        storage: 1000000
        count: 2
"#,
        );
        let dc = &config.datacenters[0];
        assert_eq!(dc.name, "dc0");
        assert_eq!(dc.vm_allocation.as_deref(), Some("BestFit"));
        let characteristics = dc.characteristics.clone().unwrap();
        assert_eq!(characteristics.cost_per_sec, 2.5);
        assert_eq!(characteristics.vmm, "Xen");
        assert_eq!(dc.hosts[0].count, Some(2));
        assert_eq!(dc.hosts[0].vm_scheduler, None);
    }

    #[test]
    #[should_panic(expected = "Can't parse YAML")]
    fn test_invalid_yaml() {
        SimulationConfig::from_yaml_str("datacenters: 5");
    }
}
