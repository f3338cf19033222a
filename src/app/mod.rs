//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the warning badge:
//! alarm-state synchronisation, link and session recovery, telemetry
//! cadence and the scheduled restart.  All interaction with the radio,
//! the broker and the screen happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod messages;
pub mod ports;
pub mod router;
pub mod service;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod transport;
