//! Simulation configuration and execution.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::Level::Trace;
use log::{debug, log_enabled, trace};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;
use serde::Serialize;
use serde_json::json;
use serde_type_name::type_name;

use crate::component::Id;
use crate::context::SimulationContext;
use crate::handler::EventHandler;
use crate::log::log_undelivered_event;
use crate::state::SimulationState;
use crate::Event;

/// Run state of the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// No events were processed yet.
    NotStarted,
    /// Events are being processed.
    Running,
    /// Simulation is stopped, no more events will be processed.
    Stopped,
}

/// Record about the processed event, see [`Simulation::enable_trace()`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TraceEntry {
    /// Event identifier.
    pub id: u64,
    /// Event time.
    pub time: f64,
    /// Event source.
    pub src: Id,
    /// Event destination.
    pub dst: Id,
    /// Name of event payload type.
    pub event_type: String,
}

/// Represents a simulation, provides methods for its configuration and execution.
///
/// Simulation owns the event queue and the clock. Several simulations can coexist in a single process,
/// since the state is not shared between them.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    name_to_id: HashMap<String, Id>,
    names: Rc<RefCell<Vec<String>>>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
    run_state: RunState,
    trace: Option<Vec<TraceEntry>>,
}

impl Simulation {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed))),
            name_to_id: HashMap::new(),
            names: Rc::new(RefCell::new(Vec::new())),
            handlers: Vec::new(),
            run_state: RunState::NotStarted,
            trace: None,
        }
    }

    fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.name_to_id.len() as Id;
        self.name_to_id.insert(name.to_owned(), id);
        self.names.borrow_mut().push(name.to_owned());
        self.handlers.push(None);
        id
    }

    /// Returns the identifier of component by its name.
    ///
    /// Panics if component with such name does not exist.
    pub fn lookup_id(&self, name: &str) -> Id {
        *self.name_to_id.get(name).unwrap()
    }

    /// Returns the name of component by its identifier.
    ///
    /// Panics if component with such Id does not exist.
    pub fn lookup_name(&self, id: Id) -> String {
        self.names.borrow()[id as usize].clone()
    }

    /// Creates a new simulation context with specified name.
    ///
    /// Component ids are assigned sequentially starting from 0.
    /// Contexts can be created at any moment, including the processing of events.
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        let ctx = SimulationContext::new(
            self.register(name.as_ref()),
            name.as_ref(),
            self.sim_state.clone(),
            self.names.clone(),
        );
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Created context: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": ctx.name(), "id": ctx.id()})
        );
        ctx
    }

    /// Registers the event handler implementation for component with specified name, returns the component Id.
    ///
    /// If the context for this component was created before, its Id is reused.
    pub fn add_handler<S>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        self.handlers[id as usize] = Some(handler);
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Added handler: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
        id
    }

    /// Removes the event handler for component with specified name.
    ///
    /// This finishes the component: pending events destined for it are cancelled.
    pub fn remove_handler<S>(&mut self, name: S)
    where
        S: AsRef<str>,
    {
        let id = self.lookup_id(name.as_ref());
        self.handlers[id as usize] = None;
        self.sim_state.borrow_mut().cancel_events(|e| e.dst == id);
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Removed handler: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Returns the current run state.
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Performs a single step through the simulation.
    ///
    /// Takes the next event from the queue, advances the simulation time to event time and processes it
    /// by invoking the [`EventHandler::on()`](crate::EventHandler::on()) method of the corresponding event handler.
    /// If there is no handler registered for component with Id `event.dst`, logs the undelivered event
    /// and halts the simulation by panicking.
    ///
    /// Returns `true` if some pending event was processed and `false` otherwise. The latter means that
    /// there are no pending events or the simulation is stopped, so no progress can be made.
    pub fn step(&mut self) -> bool {
        if self.run_state == RunState::Stopped {
            return false;
        }
        if self.sim_state.borrow().is_stop_requested() {
            self.stop();
            return false;
        }
        let next = self.sim_state.borrow_mut().next_event();
        if let Some(event) = next {
            self.run_state = RunState::Running;
            if let Some(trace) = self.trace.as_mut() {
                trace.push(TraceEntry {
                    id: event.id,
                    time: event.time,
                    src: event.src,
                    dst: event.dst,
                    event_type: type_name(&event.data).unwrap_or("unknown").to_owned(),
                });
            }
            match self.handlers.get(event.dst as usize) {
                Some(Some(handler)) => {
                    if log_enabled!(Trace) {
                        let src_name = self.lookup_name(event.src);
                        let dst_name = self.lookup_name(event.dst);
                        trace!(
                            target: &dst_name,
                            "[{:.3} {} {}] {}",
                            event.time,
                            crate::log::get_colored("EVENT", colored::Color::BrightBlack),
                            dst_name,
                            json!({"type": type_name(&event.data).unwrap(), "data": event.data, "src": src_name})
                        );
                    }
                    handler.clone().borrow_mut().on(event);
                }
                _ => {
                    log_undelivered_event(&event);
                    panic!("Event {} has no handler at destination component {}", event.id, event.dst);
                }
            }
            true
        } else {
            false
        }
    }

    /// Performs the specified number of steps through the simulation.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Steps through the simulation until there are no pending events left or the stop is requested.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Runs the simulation until there are no pending events left or the stop is requested,
    /// after that the simulation is stopped.
    pub fn run(&mut self) {
        if self.run_state == RunState::Stopped {
            return;
        }
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Simulation is started",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
        );
        self.step_until_no_events();
        self.stop();
    }

    /// Stops the simulation. The pending events are not processed anymore.
    pub fn stop(&mut self) {
        if self.run_state != RunState::Stopped {
            self.run_state = RunState::Stopped;
            debug!(
                target: "simulation",
                "[{:.3} {} simulation] Simulation is stopped: {}",
                self.time(),
                crate::log::get_colored("DEBUG", colored::Color::Blue),
                json!({"events": self.event_count(), "pending": self.sim_state.borrow().pending_event_count()})
            );
        }
    }

    /// Steps through the simulation with duration limit.
    ///
    /// Processes events until the next event time is above the specified threshold (`current_time + duration`)
    /// or there are no pending events left.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.sim_state.borrow().time() + duration;
        loop {
            if let Some(event) = self.sim_state.borrow_mut().peek_event() {
                if event.time > end_time {
                    return true;
                }
            } else {
                return false;
            }
            if !self.step() {
                return false;
            }
        }
    }

    /// Enables recording of processed events, see [`trace()`](Self::trace()).
    pub fn enable_trace(&mut self) {
        if self.trace.is_none() {
            self.trace = Some(Vec::new());
        }
    }

    /// Returns the records about processed events in processing order (empty if trace is not enabled).
    pub fn trace(&self) -> &[TraceEntry] {
        self.trace.as_deref().unwrap_or(&[])
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range
    /// using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution
    /// using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        self.sim_state.borrow_mut().sample_from_distribution(dist)
    }

    /// Returns the total number of created events.
    ///
    /// Note that cancelled events are also counted here.
    pub fn event_count(&self) -> u64 {
        self.sim_state.borrow().event_count()
    }

    /// Returns the number of pending (not cancelled) events.
    pub fn pending_event_count(&self) -> usize {
        self.sim_state.borrow().pending_event_count()
    }

    /// Cancels events that satisfy the given predicate function.
    ///
    /// Note that already processed events cannot be cancelled.
    pub fn cancel_events<F>(&mut self, pred: F)
    where
        F: Fn(&Event) -> bool,
    {
        self.sim_state.borrow_mut().cancel_events(pred);
    }
}
