//! Simulation events.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Event identifier.
///
/// Identifiers are assigned sequentially in the order of event creation,
/// which also defines the processing order of events with equal time.
pub type EventId = u64;

/// Trait that should be implemented by event payload.
///
/// It is automatically implemented for any serializable `'static` type.
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// Representation of event.
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Time of event occurrence.
    pub time: f64,
    /// Identifier of event source.
    pub src: Id,
    /// Identifier of event destination.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted to be used with max-heap: earlier time first, then earlier creation.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Error returned when an event is scheduled at time before the current simulation time.
#[derive(Clone, Debug, PartialEq)]
pub struct InvalidEventTime {
    /// Requested event time.
    pub time: f64,
    /// Simulation time at the moment of request.
    pub clock: f64,
}

impl Display for InvalidEventTime {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "invalid event time {:.3}: events from the past are not allowed (current time is {:.3})",
            self.time, self.clock
        )
    }
}

impl std::error::Error for InvalidEventTime {}
