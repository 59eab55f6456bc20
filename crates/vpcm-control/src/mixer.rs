//! Named mixer controls
//!
//! Each control carries a fixed number of integer values. Session-scoped
//! controls put the call id in one of those values; `put` decodes the
//! vector and hands it to the dispatcher.
//!
//! | Control                               | Values                | Access |
//! |---------------------------------------|-----------------------|--------|
//! | Voice Rx Device Mute                  | mute, call id, ramp   | write  |
//! | Voice Tx Device Mute                  | mute, call id, ramp   | write  |
//! | Voice Tx Mute                         | mute, call id, ramp   | write  |
//! | Voice Rx Gain                         | volume, call id, ramp | write  |
//! | TTY Mode                              | mode                  | rw     |
//! | Slowtalk Enable                       | enable, call id       | write  |
//! | Voice Topology Disable                | disable, call id      | write  |
//! | HD Voice Enable                       | enable, call id       | write  |
//! | DTMF_Detect Rx VSID enable            | call id, enable       | write  |
//! | DTMF_Detect Rx Callback VSID enable   | call id, enable       | write  |
//! | CVD Version                           | 31 bytes              | read   |
//! | Voice Sidetone Enable                 | enable                | rw     |

use std::fmt;

use tracing::debug;
use vpcm_core::{
    CallId, VoiceError, VoiceResult, VolumeDirection, CVD_VERSION_STRING_MAX_SIZE,
};

use crate::ControlDispatcher;

/// Named voice controls
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoiceControl {
    RxDeviceMute,
    TxDeviceMute,
    TxMute,
    RxGain,
    TtyMode,
    SlowTalk,
    TopologyDisable,
    HdVoice,
    DetectionEnable,
    DetectionCallback,
    CvdVersion,
    Sidetone,
}

impl VoiceControl {
    pub const ALL: [VoiceControl; 12] = [
        VoiceControl::RxDeviceMute,
        VoiceControl::TxDeviceMute,
        VoiceControl::TxMute,
        VoiceControl::RxGain,
        VoiceControl::TtyMode,
        VoiceControl::SlowTalk,
        VoiceControl::TopologyDisable,
        VoiceControl::HdVoice,
        VoiceControl::DetectionEnable,
        VoiceControl::DetectionCallback,
        VoiceControl::CvdVersion,
        VoiceControl::Sidetone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VoiceControl::RxDeviceMute => "Voice Rx Device Mute",
            VoiceControl::TxDeviceMute => "Voice Tx Device Mute",
            VoiceControl::TxMute => "Voice Tx Mute",
            VoiceControl::RxGain => "Voice Rx Gain",
            VoiceControl::TtyMode => "TTY Mode",
            VoiceControl::SlowTalk => "Slowtalk Enable",
            VoiceControl::TopologyDisable => "Voice Topology Disable",
            VoiceControl::HdVoice => "HD Voice Enable",
            VoiceControl::DetectionEnable => "DTMF_Detect Rx VSID enable",
            VoiceControl::DetectionCallback => "DTMF_Detect Rx Callback VSID enable",
            VoiceControl::CvdVersion => "CVD Version",
            VoiceControl::Sidetone => "Voice Sidetone Enable",
        }
    }

    pub fn from_name(name: &str) -> VoiceResult<Self> {
        Self::ALL
            .into_iter()
            .find(|control| control.name() == name)
            .ok_or_else(|| VoiceError::UnknownControl(name.to_string()))
    }

    /// Number of integer values the control carries (0 for byte controls)
    pub fn value_count(self) -> usize {
        match self {
            VoiceControl::RxDeviceMute
            | VoiceControl::TxDeviceMute
            | VoiceControl::TxMute
            | VoiceControl::RxGain => 3,
            VoiceControl::SlowTalk
            | VoiceControl::TopologyDisable
            | VoiceControl::HdVoice
            | VoiceControl::DetectionEnable
            | VoiceControl::DetectionCallback => 2,
            VoiceControl::TtyMode | VoiceControl::Sidetone => 1,
            VoiceControl::CvdVersion => 0,
        }
    }

    pub fn is_readable(self) -> bool {
        matches!(
            self,
            VoiceControl::TtyMode | VoiceControl::CvdVersion | VoiceControl::Sidetone
        )
    }

    pub fn is_writable(self) -> bool {
        self != VoiceControl::CvdVersion
    }

    /// Decode `values` and apply them. Extra values are ignored.
    pub fn put(self, dispatcher: &ControlDispatcher, values: &[i64]) -> VoiceResult<()> {
        if !self.is_writable() {
            return Err(VoiceError::ReadOnlyControl(self.name()));
        }
        let expected = self.value_count();
        if values.len() < expected {
            return Err(VoiceError::MissingValues {
                control: self.name(),
                expected,
                actual: values.len(),
            });
        }
        debug!(control = self.name(), ?values, "put");

        let id = |i: usize| CallId::from_control_value(values[i]);
        match self {
            VoiceControl::RxDeviceMute => {
                dispatcher.set_device_mute(id(1), VolumeDirection::Rx, values[0], values[2])
            }
            VoiceControl::TxDeviceMute => {
                dispatcher.set_device_mute(id(1), VolumeDirection::Tx, values[0], values[2])
            }
            VoiceControl::TxMute => dispatcher.set_tx_mute(id(1), values[0], values[2]),
            VoiceControl::RxGain => dispatcher.set_rx_volume(id(1), values[0], values[2]),
            VoiceControl::TtyMode => dispatcher.set_tty_mode(values[0]),
            VoiceControl::SlowTalk => dispatcher.set_slow_talk(id(1), values[0]),
            VoiceControl::TopologyDisable => dispatcher.set_topology_disable(id(1), values[0]),
            VoiceControl::HdVoice => dispatcher.set_hd_voice(id(1), values[0]),
            VoiceControl::DetectionEnable => dispatcher.enable_detection(id(0), values[1]),
            VoiceControl::DetectionCallback => {
                dispatcher.register_detection_callback(id(0), values[1])
            }
            VoiceControl::Sidetone => dispatcher.set_sidetone(values[0]),
            VoiceControl::CvdVersion => Err(VoiceError::ReadOnlyControl(self.name())),
        }
    }

    /// Read the control's current value
    pub fn get(self, dispatcher: &ControlDispatcher) -> VoiceResult<ControlValue> {
        match self {
            VoiceControl::TtyMode => Ok(ControlValue::Integers(vec![dispatcher.tty_mode().index()])),
            VoiceControl::Sidetone => {
                Ok(ControlValue::Integers(vec![i64::from(dispatcher.sidetone())]))
            }
            VoiceControl::CvdVersion => Ok(ControlValue::Bytes(*dispatcher.cvd_version().as_bytes())),
            _ => Err(VoiceError::WriteOnlyControl(self.name())),
        }
    }
}

impl fmt::Display for VoiceControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value read from a control
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlValue {
    Integers(Vec<i64>),
    Bytes([u8; CVD_VERSION_STRING_MAX_SIZE]),
}

impl ControlDispatcher {
    /// Write a control by name
    pub fn put(&self, name: &str, values: &[i64]) -> VoiceResult<()> {
        VoiceControl::from_name(name)?.put(self, values)
    }

    /// Read a control by name
    pub fn get(&self, name: &str) -> VoiceResult<ControlValue> {
        VoiceControl::from_name(name)?.get(self)
    }

    /// Write a control by name, reporting the result as 0 or a negative errno
    pub fn put_errno(&self, name: &str, values: &[i64]) -> i32 {
        match self.put(name, values) {
            Ok(()) => 0,
            Err(e) => e.errno(),
        }
    }
}
