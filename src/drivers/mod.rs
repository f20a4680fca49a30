//! Pin setup, output writing, probe protocols, and raw peripheral access.

pub mod dht;
pub mod hw_init;
pub mod outputs;
pub mod pins;
