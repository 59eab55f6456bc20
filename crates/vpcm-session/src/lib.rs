//! VPCM Session - Voice session records and stream lifecycle
//!
//! This crate tracks the voice sessions a stream framework drives:
//! - One lock-guarded record per session kind, held in a fixed registry
//! - Path bookkeeping: open count, per-direction active flags, path handles
//! - The lifecycle engine that turns open, prepare, trigger and close
//!   into call control requests on the voice service

pub mod record;
pub mod registry;
pub mod lifecycle;

pub use record::*;
pub use registry::*;
pub use lifecycle::*;
