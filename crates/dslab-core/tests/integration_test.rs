use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use dslab_core::{cast, Event, EventHandler, Id, RunState, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct Ping {
    round: u32,
}

#[derive(Clone, Serialize)]
struct Unknown {}

struct Player {
    peer: Id,
    rounds: u32,
    received: Vec<(f64, u32)>,
    ctx: SimulationContext,
}

impl Player {
    fn new(peer: Id, rounds: u32, ctx: SimulationContext) -> Self {
        Self {
            peer,
            rounds,
            received: Vec::new(),
            ctx,
        }
    }
}

impl EventHandler for Player {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Ping { round } => {
                self.received.push((self.ctx.time(), round));
                if round < self.rounds {
                    self.ctx.emit(Ping { round: round + 1 }, self.peer, 1.5);
                }
            }
        })
    }
}

fn ping_pong(seed: u64) -> (Simulation, Rc<RefCell<Player>>, Rc<RefCell<Player>>) {
    let mut sim = Simulation::new(seed);
    let ctx1 = sim.create_context("player1");
    let ctx2 = sim.create_context("player2");
    let p1 = Rc::new(RefCell::new(Player::new(ctx2.id(), 5, ctx1)));
    let p2 = Rc::new(RefCell::new(Player::new(p1.borrow().ctx.id(), 5, ctx2)));
    sim.add_handler("player1", p1.clone());
    sim.add_handler("player2", p2.clone());
    let mut client = sim.create_context("client");
    client.emit(Ping { round: 0 }, p1.borrow().ctx.id(), 0.5);
    (sim, p1, p2)
}

#[test]
fn test_ping_pong_run() {
    let (mut sim, p1, p2) = ping_pong(123);
    assert_eq!(sim.run_state(), RunState::NotStarted);
    sim.run();
    assert_eq!(sim.run_state(), RunState::Stopped);
    assert_eq!(sim.time(), 8.);
    assert_eq!(p1.borrow().received, vec![(0.5, 0), (3.5, 2), (6.5, 4)]);
    assert_eq!(p2.borrow().received, vec![(2., 1), (5., 3), (8., 5)]);
    assert_eq!(sim.event_count(), 6);
}

#[test]
fn test_stopped_simulation_does_not_process_events() {
    let (mut sim, p1, _) = ping_pong(123);
    assert!(sim.step());
    assert_eq!(sim.run_state(), RunState::Running);
    sim.stop();
    assert!(!sim.step());
    sim.run();
    assert_eq!(p1.borrow().received.len(), 1);
    assert_eq!(sim.pending_event_count(), 1);
}

struct Stopper {
    ctx: SimulationContext,
}

#[derive(Clone, Serialize)]
struct EndOfSimulation {}

impl EventHandler for Stopper {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            EndOfSimulation {} => {
                self.ctx.stop_simulation();
            }
        })
    }
}

#[test]
fn test_stop_requested_by_component() {
    let (mut sim, p1, p2) = ping_pong(123);
    let stopper_ctx = sim.create_context("stopper");
    let mut stopper = Stopper { ctx: stopper_ctx };
    stopper.ctx.emit_self(EndOfSimulation {}, 4.);
    sim.add_handler("stopper", Rc::new(RefCell::new(stopper)));
    sim.run();
    assert_eq!(sim.run_state(), RunState::Stopped);
    assert_eq!(sim.time(), 4.);
    assert_eq!(p1.borrow().received.len(), 2);
    assert_eq!(p2.borrow().received.len(), 1);
}

#[test]
fn test_components_added_between_steps() {
    let (mut sim, p1, _) = ping_pong(123);
    sim.step_for_duration(2.);
    assert_eq!(sim.time(), 2.);
    let ctx3 = sim.create_context("player3");
    let p3 = Rc::new(RefCell::new(Player::new(p1.borrow().ctx.id(), 0, ctx3)));
    let p3_id = sim.add_handler("player3", p3.clone());
    assert_eq!(p3_id, 3);
    p1.borrow_mut().ctx.emit(Ping { round: 100 }, p3_id, 1.);
    sim.run();
    assert_eq!(p3.borrow().received, vec![(3., 100)]);
}

#[test]
#[should_panic(expected = "Unhandled event")]
fn test_unhandled_event_halts_simulation() {
    let (mut sim, p1, _) = ping_pong(123);
    let mut client = sim.create_context("client2");
    client.emit(Unknown {}, p1.borrow().ctx.id(), 0.1);
    sim.run();
}

#[test]
#[should_panic(expected = "has no handler")]
fn test_undelivered_event_halts_simulation() {
    let mut sim = Simulation::new(123);
    let mut ctx = sim.create_context("sender");
    let orphan = sim.create_context("orphan");
    ctx.emit(Unknown {}, orphan.id(), 1.);
    sim.run();
}

#[test]
fn test_removed_handler_does_not_receive_events() {
    let (mut sim, p1, p2) = ping_pong(123);
    sim.step();
    // player2 finishes before receiving the first ping
    sim.remove_handler("player2");
    sim.run();
    assert_eq!(p1.borrow().received.len(), 1);
    assert!(p2.borrow().received.is_empty());
}
