//! Voice-control service interface
//!
//! The DSP voice-control service owns the calls themselves. VPCM only
//! decides when to start, resume, hold and end them, and forwards
//! parameter changes. Every method is synchronous and returns a definite
//! result; timeouts and retries belong to the implementation.

use crate::{
    CallId, DetectionRelay, LchMode, PpModule, RampDuration, ServiceResult, SessionKind, TtyMode,
    VolumeDirection,
};

pub trait VoiceService: Send + Sync {
    /// Call identifier the service currently assigns to a session name.
    /// `CallId::NONE` when it has none.
    fn session_id(&self, session_name: &str) -> CallId;

    /// Call identifier for a session kind
    fn call_identifier_for(&self, kind: SessionKind) -> CallId {
        self.session_id(kind.session_name())
    }

    // Call control

    fn start_voice_call(&self, call_id: CallId) -> ServiceResult;

    fn resume_voice_call(&self, call_id: CallId) -> ServiceResult;

    /// Hold call state on the DSP without tearing it down. Idempotent.
    fn standby_voice_call(&self, call_id: CallId) -> ServiceResult;

    fn end_voice_call(&self, call_id: CallId) -> ServiceResult;

    fn set_lch(&self, call_id: CallId, mode: LchMode) -> ServiceResult;

    // Parameters

    fn set_tx_mute(&self, call_id: CallId, mute: bool, ramp: RampDuration) -> ServiceResult;

    fn set_device_mute(
        &self,
        call_id: CallId,
        direction: VolumeDirection,
        mute: bool,
        ramp: RampDuration,
    ) -> ServiceResult;

    fn set_rx_volume_step(&self, call_id: CallId, volume: u32, ramp: RampDuration)
        -> ServiceResult;

    fn set_tty_mode(&self, call_id: CallId, mode: TtyMode) -> ServiceResult;

    fn tty_mode(&self, call_id: CallId) -> TtyMode;

    fn set_pp_enable(&self, call_id: CallId, module: PpModule, enable: bool) -> ServiceResult;

    fn set_hd_enable(&self, call_id: CallId, enable: bool) -> ServiceResult;

    fn disable_topology(&self, call_id: CallId, disable: bool) -> ServiceResult;

    fn set_afe_sidetone(&self, call_id: CallId, enable: bool) -> ServiceResult;

    fn afe_sidetone(&self) -> bool;

    // Tone detection

    fn enable_dtmf_rx_detection(&self, call_id: CallId, enable: bool) -> ServiceResult;

    /// Install (Some) or clear (None) the detection relay for a call
    fn register_dtmf_rx_detection(
        &self,
        call_id: CallId,
        relay: Option<DetectionRelay>,
    ) -> ServiceResult;

    fn cvd_version(&self) -> ServiceResult<String>;

    // Platform

    /// Whether the service finished its own initialization
    fn is_initialized(&self) -> bool {
        true
    }

    /// Allocate calibration memory. `ServiceError::Deferred` asks the
    /// platform to retry the probe later.
    fn alloc_cal_shared_memory(&self) -> ServiceResult {
        Ok(())
    }

    fn set_destroy_cvd_flag(&self, _destroy: bool) {}

    fn set_vote_bms_flag(&self, _vote: bool) {}
}
