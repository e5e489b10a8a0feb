//! Accessing simulation from components.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;

use crate::component::Id;
use crate::event::{EventData, EventId, InvalidEventTime};
use crate::state::SimulationState;

/// A facade for accessing the simulation state and producing events from simulation components.
pub struct SimulationContext {
    id: Id,
    name: String,
    sim_state: Rc<RefCell<SimulationState>>,
    names: Rc<RefCell<Vec<String>>>,
}

impl SimulationContext {
    pub(crate) fn new(
        id: Id,
        name: &str,
        sim_state: Rc<RefCell<SimulationState>>,
        names: Rc<RefCell<Vec<String>>>,
    ) -> Self {
        Self {
            id,
            name: name.to_owned(),
            sim_state,
            names,
        }
    }

    /// Returns the identifier of component associated with this context.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the name of component associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
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

    /// Creates new event with specified payload, destination and delay.
    ///
    /// Panics if the delay is negative, i.e. the event is scheduled in the past.
    pub fn emit<T>(&mut self, data: T, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.emit_as(data, self.id, dst, delay)
    }

    /// Creates new immediate (zero-delay) event with specified payload and destination.
    pub fn emit_now<T>(&mut self, data: T, dst: Id) -> EventId
    where
        T: EventData,
    {
        self.emit_as(data, self.id, dst, 0.)
    }

    /// Creates new event for itself with specified payload and delay.
    pub fn emit_self<T>(&mut self, data: T, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.emit_as(data, self.id, self.id, delay)
    }

    /// Creates new immediate event for itself with specified payload.
    pub fn emit_self_now<T>(&mut self, data: T) -> EventId
    where
        T: EventData,
    {
        self.emit_as(data, self.id, self.id, 0.)
    }

    /// Creates new event with specified payload and destination at the specified absolute time.
    ///
    /// Panics if the time is before the current simulation time.
    pub fn emit_at<T>(&mut self, data: T, dst: Id, time: f64) -> EventId
    where
        T: EventData,
    {
        let delay = time - self.time();
        self.emit_as(data, self.id, dst, delay)
    }

    /// Creates new event with specified payload, source, destination and delay.
    ///
    /// Panics if the delay is negative.
    pub fn emit_as<T>(&mut self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        match self.try_emit_as(data, src, dst, delay) {
            Ok(event_id) => event_id,
            Err(err) => panic!("{}", err),
        }
    }

    /// Same as [`emit`](Self::emit()), but returns an error instead of panicking on negative delay.
    pub fn try_emit<T>(&mut self, data: T, dst: Id, delay: f64) -> Result<EventId, InvalidEventTime>
    where
        T: EventData,
    {
        self.try_emit_as(data, self.id, dst, delay)
    }

    /// Same as [`emit_at`](Self::emit_at()), but returns an error instead of panicking on time from the past.
    pub fn try_emit_at<T>(&mut self, data: T, dst: Id, time: f64) -> Result<EventId, InvalidEventTime>
    where
        T: EventData,
    {
        let delay = time - self.time();
        self.try_emit_as(data, self.id, dst, delay)
    }

    fn try_emit_as<T>(&mut self, data: T, src: Id, dst: Id, delay: f64) -> Result<EventId, InvalidEventTime>
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, src, dst, delay)
    }

    /// Cancels the specified event.
    pub fn cancel_event(&mut self, id: EventId) {
        self.sim_state.borrow_mut().cancel_event(id);
    }

    /// Requests the simulation to stop after the current event is processed.
    ///
    /// The pending events are kept, but are not processed anymore.
    pub fn stop_simulation(&mut self) {
        self.sim_state.borrow_mut().request_stop();
    }

    /// Lookup component name by its identifier.
    pub fn lookup_name(&self, id: Id) -> String {
        self.names.borrow()[id as usize].clone()
    }
}
