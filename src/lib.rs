//! Brick OS runtime kernel.
//!
//! Exposes the lifecycle, persistence, network and safety modules for
//! integration testing.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; every adapter has a
//! host simulation backend.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod features;
pub mod net;
pub mod persist;
pub mod pins;
pub mod safety;
pub mod setup;
pub mod update;

pub mod adapters;
pub mod drivers;
