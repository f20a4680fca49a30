//! Application core — pure domain logic, zero I/O.
//!
//! The automation engine facade, its inbound commands, outbound log
//! records, and change detection for status push.  All interaction with
//! hardware, clocks, and storage happens through the **port traits** in
//! [`ports`], keeping this layer testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod status;
