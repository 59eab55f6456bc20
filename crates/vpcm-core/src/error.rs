//! Error types for VPCM

use thiserror::Error;

use crate::{CallId, Direction, SessionKind};

/// Failures reported by the voice-control service itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("request rejected (code {0})")]
    Rejected(i32),

    #[error("service not initialized")]
    NotReady,

    #[error("service asked to defer")]
    Deferred,

    #[error("request timed out")]
    Timeout,
}

/// Result type for voice service calls
pub type ServiceResult<T = ()> = Result<T, ServiceError>;

/// Core VPCM errors
#[derive(Error, Debug)]
pub enum VoiceError {
    // Validation errors
    #[error("Invalid argument {name}: {value}")]
    InvalidArgument { name: &'static str, value: i64 },

    #[error("Control {control} expects {expected} values, got {actual}")]
    MissingValues {
        control: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Control {0} is read-only")]
    ReadOnlyControl(&'static str),

    #[error("Control {0} is write-only")]
    WriteOnlyControl(&'static str),

    #[error("Unknown control: {0}")]
    UnknownControl(String),

    // Session errors
    #[error("Invalid session id: {0}")]
    InvalidSession(CallId),

    // Precondition errors
    #[error("No capture path open for {0} session")]
    NoCapturePath(SessionKind),

    #[error("{direction} path already open for {kind} session")]
    PathBusy {
        kind: SessionKind,
        direction: Direction,
    },

    // External service errors
    #[error("Voice service {op} failed for {call_id}: {source}")]
    Service {
        op: &'static str,
        call_id: CallId,
        #[source]
        source: ServiceError,
    },

    // Platform errors
    #[error("Probe deferred: {0}")]
    ProbeDeferred(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event delivery failed: {0}")]
    Delivery(String),
}

/// Error taxonomy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Argument outside its declared domain
    Validation,
    /// Unrecognized call identifier
    InvalidSession,
    /// Operation not allowed in the current session state
    Precondition,
    /// Voice service reported failure; local state is kept
    ExternalService,
    /// Probe or configuration problem
    Platform,
    /// Consumer refused a detection event
    Delivery,
}

const EINVAL: i32 = 22;
const EIO: i32 = 5;
const ENODEV: i32 = 19;
const EBUSY: i32 = 16;
const ETIMEDOUT: i32 = 110;
const EPROBE_DEFER: i32 = 517;
const ENOSPC: i32 = 28;

impl VoiceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            VoiceError::InvalidArgument { .. }
            | VoiceError::MissingValues { .. }
            | VoiceError::ReadOnlyControl(_)
            | VoiceError::WriteOnlyControl(_)
            | VoiceError::UnknownControl(_) => ErrorClass::Validation,
            VoiceError::InvalidSession(_) => ErrorClass::InvalidSession,
            VoiceError::NoCapturePath(_) | VoiceError::PathBusy { .. } => ErrorClass::Precondition,
            VoiceError::Service { .. } => ErrorClass::ExternalService,
            VoiceError::ProbeDeferred(_) | VoiceError::Config(_) => ErrorClass::Platform,
            VoiceError::Delivery(_) => ErrorClass::Delivery,
        }
    }

    /// Negative errno for the mixer layer
    pub fn errno(&self) -> i32 {
        match self {
            VoiceError::InvalidArgument { .. }
            | VoiceError::MissingValues { .. }
            | VoiceError::ReadOnlyControl(_)
            | VoiceError::WriteOnlyControl(_)
            | VoiceError::UnknownControl(_)
            | VoiceError::InvalidSession(_)
            | VoiceError::Config(_) => -EINVAL,
            VoiceError::NoCapturePath(_) => -ENODEV,
            VoiceError::PathBusy { .. } => -EBUSY,
            VoiceError::Service { source, .. } => match source {
                ServiceError::Rejected(code) if *code < 0 => *code,
                ServiceError::Timeout => -ETIMEDOUT,
                ServiceError::Deferred => -EPROBE_DEFER,
                _ => -EIO,
            },
            VoiceError::ProbeDeferred(_) => -EPROBE_DEFER,
            VoiceError::Delivery(_) => -ENOSPC,
        }
    }

    /// Wrap a service failure with the operation and call it concerned
    pub fn service(op: &'static str, call_id: CallId) -> impl FnOnce(ServiceError) -> VoiceError {
        move |source| VoiceError::Service {
            op,
            call_id,
            source,
        }
    }
}

/// Result type for VPCM operations
pub type VoiceResult<T> = Result<T, VoiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let err = VoiceError::InvalidArgument {
            name: "mute",
            value: 3,
        };
        assert_eq!(err.class(), ErrorClass::Validation);
        assert_eq!(err.errno(), -22);

        let err = VoiceError::NoCapturePath(SessionKind::Primary);
        assert_eq!(err.class(), ErrorClass::Precondition);
        assert_eq!(err.errno(), -19);
    }

    #[test]
    fn test_service_error_errno() {
        let wrap = VoiceError::service("start", CallId::VOICE);
        let err = wrap(ServiceError::Rejected(-12));
        assert_eq!(err.class(), ErrorClass::ExternalService);
        assert_eq!(err.errno(), -12);

        let err = VoiceError::service("end", CallId::VOICE)(ServiceError::Rejected(7));
        assert_eq!(err.errno(), -5);

        let err = VoiceError::service("end", CallId::VOICE)(ServiceError::Timeout);
        assert_eq!(err.errno(), -110);
    }

    #[test]
    fn test_service_error_message() {
        let err = VoiceError::service("standby", CallId::VOLTE)(ServiceError::NotReady);
        assert_eq!(
            err.to_string(),
            "Voice service standby failed for 0x10c02000: service not initialized"
        );
    }
}
