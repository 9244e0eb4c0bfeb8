//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules of the door controller: keeping the WiFi
//! link and the broker session alive, routing HTTP and MQTT commands, and
//! guarding the relay against overlapping cycles.  All interaction with
//! hardware and the network happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod actuator;
pub mod commands;
pub mod events;
pub mod link;
pub mod payload;
pub mod ports;
pub mod router;
pub mod service;
pub mod session;

/// Result of one non-blocking supervisor step.
///
/// `Wait(ms)` asks the caller to yield through
/// [`Clock::delay_ms`](ports::Clock::delay_ms) before stepping again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ready,
    Wait(u32),
}
