//! RelayCtl firmware library.
//!
//! The automation and arbitration engine of a relay controller: schedule
//! scenarios, sequential timers, sensor-triggered actions, and on/off or
//! PID temperature control, all competing for the same output relays.
//! Exposes every module for integration testing.  ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod model;
pub mod pins;
pub mod scheduler;
pub mod sensors;
pub mod tick;
