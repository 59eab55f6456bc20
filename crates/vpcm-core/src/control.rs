//! Control parameter domains
//!
//! Raw control values arrive as signed integers. The constructors here are
//! the only way to obtain the validated forms the voice service accepts.

use std::fmt;

use crate::{VoiceError, VoiceResult};

/// Longest mute/volume ramp the service accepts, in milliseconds
pub const MAX_RAMP_DURATION: u32 = 5000;

/// Size of the service version string buffer
pub const CVD_VERSION_STRING_MAX_SIZE: usize = 31;

/// Version reported when the service cannot provide one
pub const CVD_VERSION_DEFAULT: &str = "0.0";

/// Validated ramp duration in `[0, MAX_RAMP_DURATION]` milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct RampDuration(u32);

impl RampDuration {
    pub const ZERO: RampDuration = RampDuration(0);

    pub fn new(ms: i64) -> VoiceResult<Self> {
        match u32::try_from(ms) {
            Ok(ms) if ms <= MAX_RAMP_DURATION => Ok(RampDuration(ms)),
            _ => Err(VoiceError::InvalidArgument {
                name: "ramp_duration",
                value: ms,
            }),
        }
    }

    #[inline]
    pub fn as_millis(self) -> u32 {
        self.0
    }
}

/// Parse a strict boolean control value: only 0 and 1 are accepted
pub fn strict_flag(name: &'static str, value: i64) -> VoiceResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(VoiceError::InvalidArgument { name, value }),
    }
}

/// Volume step index; negative values are rejected
pub fn volume_step(value: i64) -> VoiceResult<u32> {
    u32::try_from(value).map_err(|_| VoiceError::InvalidArgument {
        name: "volume",
        value,
    })
}

/// TTY mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TtyMode {
    #[default]
    Off = 0,
    /// Hearing carry-over
    Hco = 1,
    /// Voice carry-over
    Vco = 2,
    Full = 3,
}

impl TtyMode {
    pub const LABELS: [&'static str; 4] = ["OFF", "HCO", "VCO", "FULL"];

    pub fn from_index(index: i64) -> VoiceResult<Self> {
        match index {
            0 => Ok(TtyMode::Off),
            1 => Ok(TtyMode::Hco),
            2 => Ok(TtyMode::Vco),
            3 => Ok(TtyMode::Full),
            _ => Err(VoiceError::InvalidArgument {
                name: "tty_mode",
                value: index,
            }),
        }
    }

    #[inline]
    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn label(self) -> &'static str {
        Self::LABELS[self as usize]
    }
}

impl fmt::Display for TtyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Direction of a device mute, as the service names it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VolumeDirection {
    Tx,
    Rx,
}

/// Post-processing modules that can be toggled per session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PpModule {
    SlowTalk,
}

/// Fixed-size, NUL-padded service version string
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CvdVersion([u8; CVD_VERSION_STRING_MAX_SIZE]);

impl CvdVersion {
    /// Copy a version string, truncating so the last byte stays NUL
    pub fn from_str_truncated(version: &str) -> Self {
        let mut buf = [0u8; CVD_VERSION_STRING_MAX_SIZE];
        let len = version.len().min(CVD_VERSION_STRING_MAX_SIZE - 1);
        buf[..len].copy_from_slice(&version.as_bytes()[..len]);
        CvdVersion(buf)
    }

    pub fn as_bytes(&self) -> &[u8; CVD_VERSION_STRING_MAX_SIZE] {
        &self.0
    }

    /// Text up to the first NUL. Truncation may split a multi-byte
    /// character; the incomplete tail is dropped.
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(self.0.len());
        match std::str::from_utf8(&self.0[..end]) {
            Ok(s) => s,
            Err(e) => {
                let valid = e.valid_up_to();
                std::str::from_utf8(&self.0[..valid]).unwrap_or_default()
            }
        }
    }
}

impl Default for CvdVersion {
    fn default() -> Self {
        Self::from_str_truncated(CVD_VERSION_DEFAULT)
    }
}

impl fmt::Debug for CvdVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CvdVersion({:?})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_duration_bounds() {
        assert_eq!(RampDuration::new(0).unwrap().as_millis(), 0);
        assert_eq!(RampDuration::new(5000).unwrap().as_millis(), 5000);
        assert!(RampDuration::new(5001).is_err());
        assert!(RampDuration::new(-1).is_err());
    }

    #[test]
    fn test_strict_flag() {
        assert!(!strict_flag("mute", 0).unwrap());
        assert!(strict_flag("mute", 1).unwrap());
        assert!(matches!(
            strict_flag("mute", 2),
            Err(VoiceError::InvalidArgument { name: "mute", value: 2 })
        ));
        assert!(strict_flag("mute", -1).is_err());
    }

    #[test]
    fn test_volume_step_rejects_negative() {
        assert_eq!(volume_step(7).unwrap(), 7);
        assert!(volume_step(-3).is_err());
    }

    #[test]
    fn test_tty_mode_labels() {
        assert_eq!(TtyMode::from_index(2).unwrap(), TtyMode::Vco);
        assert_eq!(TtyMode::Vco.label(), "VCO");
        assert_eq!(TtyMode::Full.index(), 3);
        assert!(TtyMode::from_index(4).is_err());
    }

    #[test]
    fn test_cvd_version_default_and_truncation() {
        let default = CvdVersion::default();
        assert_eq!(default.as_str(), "0.0");
        assert_eq!(default.as_bytes()[3], 0);

        let long = "x".repeat(64);
        let version = CvdVersion::from_str_truncated(&long);
        assert_eq!(version.as_str().len(), CVD_VERSION_STRING_MAX_SIZE - 1);
        assert_eq!(version.as_bytes()[CVD_VERSION_STRING_MAX_SIZE - 1], 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_version_stays_nul_terminated(version in ".{0,64}") {
                let cvd = CvdVersion::from_str_truncated(&version);
                prop_assert_eq!(cvd.as_bytes()[CVD_VERSION_STRING_MAX_SIZE - 1], 0);
                prop_assert!(version.starts_with(cvd.as_str()));
            }

            #[test]
            fn prop_ramp_accepts_exactly_the_range(ms in any::<i64>()) {
                let in_range = (0..=i64::from(MAX_RAMP_DURATION)).contains(&ms);
                prop_assert_eq!(RampDuration::new(ms).is_ok(), in_range);
            }
        }
    }
}
