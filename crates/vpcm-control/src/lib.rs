//! VPCM Control - Voice parameter dispatch
//!
//! Parameter changes do not depend on lifecycle state. They are validated
//! locally, resolved to a session through the catalog and forwarded to the
//! voice service:
//! - `ControlDispatcher`: typed setters and getters
//! - `VoiceControl`: the named mixer controls, decoding raw value vectors

pub mod dispatch;
pub mod mixer;

pub use dispatch::*;
pub use mixer::*;
