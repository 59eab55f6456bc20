//! VPCM Test Harness - Lifecycle validation under interleaving and contention
//!
//! This crate provides:
//! - A harness wiring a probed platform to the simulated voice service
//! - A reference model of one session's dual-path lifecycle
//! - A seeded lifecycle fuzzer, one thread per session
//! - Cross-session contention checks
//! - End-to-end scenarios

pub mod harness;
pub mod model;
pub mod fuzzer;
pub mod contention;
pub mod scenarios;

pub use harness::*;
pub use model::*;
pub use fuzzer::*;
pub use contention::*;
pub use scenarios::*;
