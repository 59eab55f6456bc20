//! Call identifiers
//!
//! Identifiers are assigned by the voice-control service, not by VPCM.
//! The constants below are the identifiers the service hands out for each
//! session kind, plus the broadcast identifier that addresses all of them.

use std::fmt;

/// External call identifier (voice system id)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct CallId(pub u32);

impl CallId {
    /// No identifier assigned
    pub const NONE: CallId = CallId(0);
    pub const VOICE: CallId = CallId(0x10C0_1000);
    pub const VOICE2: CallId = CallId(0x10DC_1000);
    pub const VOLTE: CallId = CallId(0x10C0_2000);
    pub const QCHAT: CallId = CallId(0x1080_3000);
    pub const VOWLAN: CallId = CallId(0x1000_2000);
    pub const VOICEMMODE1: CallId = CallId(0x11C0_5000);
    pub const VOICEMMODE2: CallId = CallId(0x11DC_5000);
    /// Broadcast identifier, addresses every session
    pub const ALL: CallId = CallId(0xFFFF_FFFF);

    #[inline]
    pub fn new(id: u32) -> Self {
        CallId(id)
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_broadcast(self) -> bool {
        self == CallId::ALL
    }

    /// Interpret a mixer control integer as a call id.
    /// Values that do not fit in 32 bits become `NONE`.
    pub fn from_control_value(value: i64) -> Self {
        u32::try_from(value).map(CallId).unwrap_or(CallId::NONE)
    }
}

impl fmt::Debug for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Call({:#010x})", self.0)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
