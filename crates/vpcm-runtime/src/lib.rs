//! VPCM Runtime - Platform wiring
//!
//! Brings the voice PCM platform up the way a probe would:
//! 1. Load configuration
//! 2. Install logging
//! 3. Check the voice service is ready and allocate calibration memory
//! 4. Apply platform flags
//! 5. Build the session registry, lifecycle engine and control dispatcher
//!
//! Each opened capture path gets a `MixerEventQueue` that receives
//! tone detection events.

pub mod config;
pub mod logging;
pub mod queue;
pub mod platform;

pub use config::*;
pub use logging::*;
pub use queue::*;
pub use platform::*;
