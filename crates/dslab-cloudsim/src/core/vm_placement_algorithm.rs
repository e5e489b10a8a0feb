//! Virtual machine placement algorithms.

use crate::core::config::options::parse_config_value;
use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_placement_algorithms::best_fit::BestFit;
use crate::core::vm_placement_algorithms::first_fit::FirstFit;
use crate::core::vm_placement_algorithms::worst_fit::WorstFit;

/// Trait for implementation of VM placement algorithms.
///
/// The algorithm is defined as a function of VM and current state of datacenter hosts, which returns an
/// ID of host selected for VM placement or `None` if there is not suitable host.
///
/// It is possible to implement arbitrary placement algorithm and use it in datacenter.
pub trait VmPlacementAlgorithm {
    fn select_host(&self, vm: &Vm, hosts: &[Host]) -> Option<u32>;
}

pub fn placement_algorithm_resolver(config_str: &str) -> Box<dyn VmPlacementAlgorithm> {
    let (algorithm_name, _options) = parse_config_value(config_str);
    match algorithm_name.as_str() {
        "FirstFit" => Box::new(FirstFit::new()),
        "BestFit" => Box::new(BestFit::new()),
        "WorstFit" => Box::new(WorstFit::new()),
        _ => panic!("Can't resolve: {}", config_str),
    }
}
