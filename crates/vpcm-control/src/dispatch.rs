//! Control dispatch - validated parameter changes routed to the voice service
//!
//! Every setter checks its value ranges and resolves the call id before
//! making exactly one service request. Nothing here touches lifecycle state,
//! except detection registration which reads the capture path under the
//! session's record lock.

use std::sync::Arc;

use tracing::{debug, error, warn};
use vpcm_core::{
    strict_flag, volume_step, CallId, CvdVersion, DetectionRelay, PpModule, RampDuration,
    SessionKind, SessionTarget, TtyMode, VoiceError, VoiceResult, VoiceService, VolumeDirection,
};
use vpcm_session::SessionRegistry;

/// Routes parameter changes to the voice service
pub struct ControlDispatcher {
    registry: Arc<SessionRegistry>,
    service: Arc<dyn VoiceService>,
}

impl ControlDispatcher {
    pub fn new(registry: Arc<SessionRegistry>, service: Arc<dyn VoiceService>) -> Self {
        ControlDispatcher { registry, service }
    }

    /// Resolve a call id for a session-scoped control.
    /// The broadcast id passes through; the service fans it out.
    fn target(&self, call_id: CallId) -> VoiceResult<SessionTarget> {
        SessionTarget::resolve(call_id).ok_or_else(|| {
            error!(%call_id, "invalid session id");
            VoiceError::InvalidSession(call_id)
        })
    }

    /// Mute or unmute the uplink of a call
    pub fn set_tx_mute(&self, call_id: CallId, mute: i64, ramp_ms: i64) -> VoiceResult<()> {
        let mute = strict_flag("mute", mute)?;
        let ramp = RampDuration::new(ramp_ms)?;
        self.target(call_id)?;

        debug!(%call_id, mute, ramp_ms = ramp.as_millis(), "tx mute");
        self.service
            .set_tx_mute(call_id, mute, ramp)
            .map_err(VoiceError::service("set_tx_mute", call_id))
    }

    /// Mute or unmute the device on one side of a call
    pub fn set_device_mute(
        &self,
        call_id: CallId,
        direction: VolumeDirection,
        mute: i64,
        ramp_ms: i64,
    ) -> VoiceResult<()> {
        let mute = strict_flag("mute", mute)?;
        let ramp = RampDuration::new(ramp_ms)?;
        self.target(call_id)?;

        debug!(%call_id, ?direction, mute, ramp_ms = ramp.as_millis(), "device mute");
        self.service
            .set_device_mute(call_id, direction, mute, ramp)
            .map_err(VoiceError::service("set_device_mute", call_id))
    }

    /// Set the downlink volume step
    pub fn set_rx_volume(&self, call_id: CallId, volume: i64, ramp_ms: i64) -> VoiceResult<()> {
        let volume = volume_step(volume)?;
        let ramp = RampDuration::new(ramp_ms)?;
        self.target(call_id)?;

        debug!(%call_id, volume, ramp_ms = ramp.as_millis(), "rx volume");
        self.service
            .set_rx_volume_step(call_id, volume, ramp)
            .map_err(VoiceError::service("set_rx_volume_step", call_id))
    }

    /// Set the TTY mode on every TTY capable session.
    ///
    /// All sessions are attempted; the first failure is returned.
    pub fn set_tty_mode(&self, mode: i64) -> VoiceResult<()> {
        let mode = TtyMode::from_index(mode)?;
        debug!(%mode, "tty mode");

        let mut first_err = None;
        for kind in SessionKind::TTY_KINDS {
            let call_id = self.service.call_identifier_for(kind);
            if let Err(e) = self.service.set_tty_mode(call_id, mode) {
                warn!(%kind, %call_id, "failed to set tty mode: {}", e);
                first_err.get_or_insert(VoiceError::service("set_tty_mode", call_id)(e));
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// TTY mode as reported for the primary session
    pub fn tty_mode(&self) -> TtyMode {
        let call_id = self.service.call_identifier_for(SessionKind::Primary);
        self.service.tty_mode(call_id)
    }

    /// Enable or disable slow talk; any non-zero value enables
    pub fn set_slow_talk(&self, call_id: CallId, enable: i64) -> VoiceResult<()> {
        self.target(call_id)?;
        let enable = enable != 0;

        debug!(%call_id, enable, "slow talk");
        self.service
            .set_pp_enable(call_id, PpModule::SlowTalk, enable)
            .map_err(VoiceError::service("set_pp_enable", call_id))
    }

    /// Enable or disable HD voice; any non-zero value enables
    pub fn set_hd_voice(&self, call_id: CallId, enable: i64) -> VoiceResult<()> {
        self.target(call_id)?;
        let enable = enable != 0;

        debug!(%call_id, enable, "hd voice");
        self.service
            .set_hd_enable(call_id, enable)
            .map_err(VoiceError::service("set_hd_enable", call_id))
    }

    pub fn set_topology_disable(&self, call_id: CallId, disable: i64) -> VoiceResult<()> {
        let disable = strict_flag("topology_disable", disable)?;
        self.target(call_id)?;

        debug!(%call_id, disable, "topology disable");
        self.service
            .disable_topology(call_id, disable)
            .map_err(VoiceError::service("disable_topology", call_id))
    }

    /// Sidetone is global: always sent with the broadcast id
    pub fn set_sidetone(&self, enable: i64) -> VoiceResult<()> {
        let enable = enable != 0;
        debug!(enable, "sidetone");
        self.service
            .set_afe_sidetone(CallId::ALL, enable)
            .map_err(VoiceError::service("set_afe_sidetone", CallId::ALL))
    }

    pub fn sidetone(&self) -> bool {
        self.service.afe_sidetone()
    }

    /// Enable tone detection on the downlink; non-zero is coerced to 1
    pub fn enable_detection(&self, call_id: CallId, enable: i64) -> VoiceResult<()> {
        self.target(call_id)?;
        let enable = enable != 0;

        debug!(%call_id, enable, "tone detection");
        self.service
            .enable_dtmf_rx_detection(call_id, enable)
            .map_err(VoiceError::service("enable_dtmf_rx_detection", call_id))
    }

    /// Route tone detections of one session to its capture path consumer.
    ///
    /// Needs the capture path open. Holding the record lock across the
    /// service request keeps a concurrent close from racing the install.
    /// `enable == 0` removes the relay.
    pub fn register_detection_callback(&self, call_id: CallId, enable: i64) -> VoiceResult<()> {
        let kind = match self.target(call_id)? {
            SessionTarget::Single(kind) => kind,
            SessionTarget::All => {
                error!(%call_id, "detection callback needs a single session");
                return Err(VoiceError::InvalidSession(call_id));
            }
        };

        let record = self.registry.record_for(kind);
        let state = record.lock();
        let Some(consumer) = state.capture_consumer() else {
            error!(%kind, %call_id, "no capture path for detection callback");
            return Err(VoiceError::NoCapturePath(kind));
        };

        let relay = (enable != 0).then(|| DetectionRelay::new(call_id, consumer));
        debug!(%kind, %call_id, installed = relay.is_some(), "detection callback");
        self.service
            .register_dtmf_rx_detection(call_id, relay)
            .map_err(VoiceError::service("register_dtmf_rx_detection", call_id))
    }

    /// Service version, or the placeholder when it cannot be read
    pub fn cvd_version(&self) -> CvdVersion {
        match self.service.cvd_version() {
            Ok(version) => CvdVersion::from_str_truncated(&version),
            Err(e) => {
                warn!("failed to read cvd version: {}", e);
                CvdVersion::default()
            }
        }
    }
}
