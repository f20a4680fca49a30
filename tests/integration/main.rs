//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the engine against mock
//! adapters.  All tests run on the host (x86_64) with no real hardware
//! required.

mod engine_tests;
mod mock_hw;
mod pacing_tests;
mod persistence_tests;
