//! Logging facilities.
//!
//! Component messages have the form `[time LEVEL component] message` and use the component name as log target,
//! so the output of particular components can be filtered via `RUST_LOG`.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::error;
use serde_json::json;
use serde_type_name::type_name;

use crate::event::Event;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

/// Formats the component message and passes it to the `log` macro of the specified level.
///
/// Used internally by [`log_info!`](crate::log_info!) and other component logging macros.
#[doc(hidden)]
#[macro_export]
macro_rules! log_component_message {
    ($level:ident, $tag:expr, $color:ident, $pad:expr, $ctx:expr, $format:expr, $($arg:tt)+) => (
        log::$level!(
            target: $ctx.name(),
            concat!("[{:.3} {}", $pad, "{}] ", $format),
            $ctx.time(), $crate::log::get_colored($tag, $crate::colored::Color::$color), $ctx.name(), $($arg)+
        )
    );
}

/// Logs a message at the info level.
///
/// # Examples
///
/// ```rust
/// use std::io::Write;
/// use env_logger::Builder;
/// use dslab_core::{log_info, Simulation, SimulationContext};
///
/// struct Component {
///     ctx: SimulationContext,
/// }
///
/// impl Component {
///     fn start(&self) {
///         log_info!(self.ctx, "started");
///         log_info!(self.ctx, "{} workers", 4);
///     }
/// }
///
/// Builder::from_default_env()
///     .format(|buf, record| writeln!(buf, "{}", record.args()))
///     .init();
///
/// let mut sim = Simulation::new(123);
/// let comp = Component { ctx: sim.create_context("comp") };
/// comp.start();
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $msg:expr) => (
        $crate::log_component_message!(info, "INFO", Green, "  ", $ctx, "{}", $msg)
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $crate::log_component_message!(info, "INFO", Green, "  ", $ctx, $format, $($arg)+)
    );
}

/// Logs a message at the debug level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $msg:expr) => (
        $crate::log_component_message!(debug, "DEBUG", Blue, " ", $ctx, "{}", $msg)
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $crate::log_component_message!(debug, "DEBUG", Blue, " ", $ctx, $format, $($arg)+)
    );
}

/// Logs a message at the trace level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $msg:expr) => (
        $crate::log_component_message!(trace, "TRACE", Cyan, " ", $ctx, "{}", $msg)
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $crate::log_component_message!(trace, "TRACE", Cyan, " ", $ctx, $format, $($arg)+)
    );
}

/// Logs a message at the warn level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $msg:expr) => (
        $crate::log_component_message!(warn, "WARN", Yellow, "  ", $ctx, "{}", $msg)
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $crate::log_component_message!(warn, "WARN", Yellow, "  ", $ctx, $format, $($arg)+)
    );
}

/// Logs a message at the error level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $msg:expr) => (
        $crate::log_component_message!(error, "ERROR", Red, " ", $ctx, "{}", $msg)
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $crate::log_component_message!(error, "ERROR", Red, " ", $ctx, $format, $($arg)+)
    );
}

fn log_event_error(event: &Event, problem: &str) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] {}: {}",
        event.time,
        get_colored("ERROR", Color::Red),
        problem,
        json!({"type": type_name(&event.data).unwrap_or("unknown"), "data": event.data, "src": event.src, "dst": event.dst})
    );
}

/// Logs an unhandled event and halts the simulation.
///
/// Used internally by [`cast!`](crate::cast!). An event which is not matched by the handler of its destination
/// means that the modeled system is misconfigured, so the simulation cannot proceed.
pub fn log_unhandled_event(event: Event) -> ! {
    log_event_error(&event, "Unhandled event");
    panic!(
        "Unhandled event {} from component {} to component {}",
        type_name(&event.data).unwrap_or("unknown"),
        event.src,
        event.dst
    );
}

pub(crate) fn log_undelivered_event(event: &Event) {
    log_event_error(event, "Undelivered event");
}

pub(crate) fn log_incorrect_event(event: Event, msg: &str) {
    log_event_error(&event, &format!("Incorrect event ({})", msg));
}
