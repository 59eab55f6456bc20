//! Session catalog
//!
//! VPCM knows a closed set of session kinds, one per call variant:
//! - Primary: the main circuit-switched voice line
//! - Secondary: the second voice line
//! - CarrierVoLTE / CarrierVoWLAN: carrier-assisted packet voice
//! - Chat: push-to-talk chat mode
//! - MultiMode1 / MultiMode2: generic multi-mode voice lines
//!
//! Each kind owns exactly one registry slot. The broadcast selector
//! (`SessionTarget::All`) never does.

use std::fmt;

use crate::CallId;

/// Session kind - index into the session registry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SessionKind {
    Primary = 0,
    Secondary = 1,
    CarrierVoLTE = 2,
    Chat = 3,
    CarrierVoWLAN = 4,
    MultiMode1 = 5,
    MultiMode2 = 6,
}

impl SessionKind {
    /// Number of registry slots
    pub const COUNT: usize = 7;

    /// Every kind, in registry order
    pub const ALL: [SessionKind; Self::COUNT] = [
        SessionKind::Primary,
        SessionKind::Secondary,
        SessionKind::CarrierVoLTE,
        SessionKind::Chat,
        SessionKind::CarrierVoWLAN,
        SessionKind::MultiMode1,
        SessionKind::MultiMode2,
    ];

    /// Kinds that follow the global TTY mode. Chat is not part of it.
    pub const TTY_KINDS: [SessionKind; 6] = [
        SessionKind::Primary,
        SessionKind::Secondary,
        SessionKind::CarrierVoLTE,
        SessionKind::CarrierVoWLAN,
        SessionKind::MultiMode1,
        SessionKind::MultiMode2,
    ];

    /// Stream-name prefixes, checked in this order before falling back to Primary
    const PREFIX_ORDER: [SessionKind; 6] = [
        SessionKind::CarrierVoLTE,
        SessionKind::Secondary,
        SessionKind::Chat,
        SessionKind::CarrierVoWLAN,
        SessionKind::MultiMode1,
        SessionKind::MultiMode2,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Name the voice-control service knows this session by
    pub fn session_name(self) -> &'static str {
        match self {
            SessionKind::Primary => "Voice session",
            SessionKind::Secondary => "Voice2 session",
            SessionKind::CarrierVoLTE => "VoLTE session",
            SessionKind::Chat => "QCHAT session",
            SessionKind::CarrierVoWLAN => "VoWLAN session",
            SessionKind::MultiMode1 => "VoiceMMode1",
            SessionKind::MultiMode2 => "VoiceMMode2",
        }
    }

    /// Identifier the service assigns to this kind by default
    pub fn well_known_call_id(self) -> CallId {
        match self {
            SessionKind::Primary => CallId::VOICE,
            SessionKind::Secondary => CallId::VOICE2,
            SessionKind::CarrierVoLTE => CallId::VOLTE,
            SessionKind::Chat => CallId::QCHAT,
            SessionKind::CarrierVoWLAN => CallId::VOWLAN,
            SessionKind::MultiMode1 => CallId::VOICEMMODE1,
            SessionKind::MultiMode2 => CallId::VOICEMMODE2,
        }
    }

    /// Prefix a stream's symbolic name carries for this kind.
    /// Primary has none: it is the fallback.
    pub fn stream_prefix(self) -> Option<&'static str> {
        match self {
            SessionKind::Primary => None,
            SessionKind::Secondary => Some("Voice2"),
            SessionKind::CarrierVoLTE => Some("VoLTE"),
            SessionKind::Chat => Some("QCHAT"),
            SessionKind::CarrierVoWLAN => Some("VoWLAN"),
            SessionKind::MultiMode1 => Some("VoiceMMode1"),
            SessionKind::MultiMode2 => Some("VoiceMMode2"),
        }
    }

    /// Resolve an external call identifier.
    /// Returns None for anything outside the recognized set, including
    /// zero and the broadcast identifier.
    pub fn from_call_id(id: CallId) -> Option<Self> {
        match id {
            CallId::VOICE => Some(SessionKind::Primary),
            CallId::VOICE2 => Some(SessionKind::Secondary),
            CallId::VOLTE => Some(SessionKind::CarrierVoLTE),
            CallId::QCHAT => Some(SessionKind::Chat),
            CallId::VOWLAN => Some(SessionKind::CarrierVoWLAN),
            CallId::VOICEMMODE1 => Some(SessionKind::MultiMode1),
            CallId::VOICEMMODE2 => Some(SessionKind::MultiMode2),
            _ => None,
        }
    }

    /// Resolve a stream's symbolic name. Unmatched names map to Primary.
    pub fn from_stream_name(name: &str) -> Self {
        Self::PREFIX_ORDER
            .into_iter()
            .find(|kind| kind.stream_prefix().is_some_and(|p| name.starts_with(p)))
            .unwrap_or(SessionKind::Primary)
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionKind::Primary => "Voice",
            SessionKind::Secondary => "Voice2",
            SessionKind::CarrierVoLTE => "VoLTE",
            SessionKind::Chat => "QCHAT",
            SessionKind::CarrierVoWLAN => "VoWLAN",
            SessionKind::MultiMode1 => "VoiceMMode1",
            SessionKind::MultiMode2 => "VoiceMMode2",
        };
        f.write_str(label)
    }
}

/// Target of a control operation: one session, or all of them
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionTarget {
    Single(SessionKind),
    All,
}

impl SessionTarget {
    /// Resolve a call identifier, recognizing the broadcast id
    pub fn resolve(id: CallId) -> Option<Self> {
        if id.is_broadcast() {
            return Some(SessionTarget::All);
        }
        SessionKind::from_call_id(id).map(SessionTarget::Single)
    }

    pub fn kind(self) -> Option<SessionKind> {
        match self {
            SessionTarget::Single(kind) => Some(kind),
            SessionTarget::All => None,
        }
    }
}
