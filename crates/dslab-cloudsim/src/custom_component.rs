//! Interface of user-defined components added to cloud simulation.

use dslab_core::context::SimulationContext;
use dslab_core::handler::EventHandler;

/// Component which interacts with datacenters and brokers directly via events,
/// e.g. a custom broker or a workload generator.
pub trait CustomComponent: EventHandler {
    /// Creates component with the given simulation context.
    fn new(ctx: SimulationContext) -> Self
    where
        Self: Sized;

    /// Initializes component by emitting its first events.
    fn init(&mut self);
}
