//! VPCM Core - Fundamental types for voice call session coordination
//!
//! This crate defines the types shared by every VPCM crate:
//! - Call identifiers and the session catalog (SessionKind, SessionTarget)
//! - Stream directions, trigger events and local call hold modes
//! - Control parameter domains (ramp durations, TTY modes, version strings)
//! - Detection event envelopes and the detection relay
//! - The voice-control service interface and a simulated service
//! - Error types

pub mod id;
pub mod kind;
pub mod stream;
pub mod control;
pub mod detection;
pub mod service;
pub mod simulated;
pub mod error;

pub use id::*;
pub use kind::*;
pub use stream::*;
pub use control::*;
pub use detection::*;
pub use service::*;
pub use simulated::*;
pub use error::*;
