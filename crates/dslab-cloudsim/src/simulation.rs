//! Main entry point for building and running cloud simulations.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use sugars::{rc, refcell};

use dslab_core::context::SimulationContext;
use dslab_core::log_info;
use dslab_core::simulation::{RunState, Simulation, TraceEntry};

use crate::core::broker::Broker;
use crate::core::characteristics::DatacenterCharacteristics;
use crate::core::config::SimulationConfig;
use crate::core::datacenter::Datacenter;
use crate::core::events::broker::BrokerStart;
use crate::core::host::Host;
use crate::core::pe::pe_list;
use crate::core::vm_allocation_policy::VmAllocationPolicy;
use crate::core::vm_placement_algorithm::{placement_algorithm_resolver, VmPlacementAlgorithm};
use crate::core::vm_scheduler::vm_scheduler_resolver;
use crate::custom_component::CustomComponent;

/// Represents a cloud simulation with datacenters and brokers.
pub struct CloudSimulation {
    datacenters: BTreeMap<u32, Rc<RefCell<Datacenter>>>,
    brokers: BTreeMap<u32, Rc<RefCell<Broker>>>,
    components: BTreeMap<u32, Rc<RefCell<dyn CustomComponent>>>,
    started: bool,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl CloudSimulation {
    /// Creates a simulation without datacenters.
    pub fn new(mut sim: Simulation, sim_config: SimulationConfig) -> Self {
        if sim_config.trace_events {
            sim.enable_trace();
        }
        let ctx = sim.create_context("simulation");
        Self {
            datacenters: BTreeMap::new(),
            brokers: BTreeMap::new(),
            components: BTreeMap::new(),
            started: false,
            sim,
            ctx,
            sim_config: rc!(sim_config),
        }
    }

    /// Creates a simulation with datacenters described in the config.
    pub fn from_config(sim: Simulation, sim_config: SimulationConfig) -> Self {
        let mut cloud_sim = Self::new(sim, sim_config);
        let config = cloud_sim.sim_config.clone();
        for dc_config in config.datacenters.iter() {
            let mut hosts = Vec::new();
            for host_config in dc_config.hosts.iter() {
                let count = host_config.count.unwrap_or(1);
                for i in 0..count {
                    let id = hosts.len() as u32;
                    let vm_scheduler = vm_scheduler_resolver(host_config.vm_scheduler.as_deref().unwrap_or("TimeShared"));
                    let mut host = Host::new(
                        id,
                        pe_list(host_config.pes, host_config.mips),
                        host_config.ram,
                        host_config.bw,
                        host_config.storage,
                        vm_scheduler,
                    );
                    if let Some(prefix) = &host_config.name_prefix {
                        host = host.with_name(&format!("{}{}", prefix, i));
                    }
                    hosts.push(host);
                }
            }
            cloud_sim.add_datacenter(
                &dc_config.name,
                hosts,
                dc_config.characteristics.clone().unwrap_or_default(),
                placement_algorithm_resolver(dc_config.vm_allocation.as_deref().unwrap_or("FirstFit")),
            );
        }
        cloud_sim
    }

    /// Adds datacenter with specified hosts and VM placement algorithm, returns the datacenter id.
    pub fn add_datacenter(
        &mut self,
        name: &str,
        hosts: Vec<Host>,
        characteristics: DatacenterCharacteristics,
        placement_algorithm: Box<dyn VmPlacementAlgorithm>,
    ) -> u32 {
        let datacenter = rc!(refcell!(Datacenter::new(
            hosts,
            characteristics,
            VmAllocationPolicy::new(placement_algorithm),
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        let id = self.sim.add_handler(name, datacenter.clone());
        self.datacenters.insert(id, datacenter);
        id
    }

    /// Adds broker, returns the broker id.
    pub fn add_broker(&mut self, name: &str) -> u32 {
        let broker = rc!(refcell!(Broker::new(self.sim.create_context(name), self.sim_config.clone())));
        let id = self.sim.add_handler(name, broker.clone());
        self.brokers.insert(id, broker);
        id
    }

    /// Creates user-defined component and registers it in the simulation.
    pub fn build_custom_component<Component: 'static + CustomComponent>(
        &mut self,
        name: &str,
    ) -> Rc<RefCell<Component>> {
        let component = rc!(refcell!(Component::new(self.sim.create_context(name))));
        let id = self.sim.add_handler(name, component.clone());
        self.components.insert(id, component.clone());
        component
    }

    /// Returns ids of custom components in the order of their creation.
    pub fn custom_component_ids(&self) -> Vec<u32> {
        self.components.keys().copied().collect()
    }

    /// Returns datacenter by its id.
    ///
    /// Panics if there is no such datacenter.
    pub fn datacenter(&self, id: u32) -> Rc<RefCell<Datacenter>> {
        self.datacenters.get(&id).unwrap().clone()
    }

    /// Returns broker by its id.
    ///
    /// Panics if there is no such broker.
    pub fn broker(&self, id: u32) -> Rc<RefCell<Broker>> {
        self.brokers.get(&id).unwrap().clone()
    }

    /// Returns ids of datacenters in the order of their creation.
    pub fn datacenter_ids(&self) -> Vec<u32> {
        self.datacenters.keys().copied().collect()
    }

    pub fn broker_ids(&self) -> Vec<u32> {
        self.brokers.keys().copied().collect()
    }

    /// Sends the start event to each broker.
    fn start_brokers(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let datacenters = self.datacenter_ids();
        log_info!(
            self.ctx,
            "starting {} brokers with {} datacenters",
            self.brokers.len(),
            datacenters.len()
        );
        for &broker_id in self.brokers.keys() {
            self.ctx.emit_now(
                BrokerStart {
                    datacenters: datacenters.clone(),
                },
                broker_id,
            );
        }
    }

    /// Runs the simulation until there are no pending events or the stop is requested,
    /// returns the final simulation time.
    pub fn start_simulation(&mut self) -> f64 {
        self.start_brokers();
        self.sim.run();
        log_info!(self.ctx, "simulation finished");
        self.sim.time()
    }

    /// Stops the simulation, the pending events are not processed anymore.
    pub fn stop_simulation(&mut self) {
        self.sim.stop();
    }

    pub fn run_state(&self) -> RunState {
        self.sim.run_state()
    }

    /// Performs the specified number of steps through the simulation (starts the brokers on the first call).
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        self.start_brokers();
        self.sim.steps(step_count)
    }

    /// Steps through the simulation with duration limit (starts the brokers on the first call).
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.start_brokers();
        self.sim.step_for_duration(duration)
    }

    /// Returns the current simulation time.
    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    /// Returns the total number of created events.
    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    /// Returns the processed events, if the trace is enabled in config.
    pub fn trace(&self) -> &[TraceEntry] {
        self.sim.trace()
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }

    /// Returns a random number in the specified range
    /// using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.sim.gen_range(range)
    }
}
