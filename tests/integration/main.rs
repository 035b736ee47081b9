//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the Brick lifecycle against
//! the mock platform in [`mock_hw`].  All tests run on the host (x86_64)
//! with no real hardware required.

mod activator_tests;
mod lifecycle_tests;
mod mock_hw;
mod reset_circuit_tests;
mod update_tests;
