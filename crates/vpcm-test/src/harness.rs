//! Test harness - a probed platform over the simulated voice service

use std::sync::Arc;

use vpcm_control::ControlDispatcher;
use vpcm_core::{
    CallId, Direction, ServiceOp, SessionKind, SimulatedVoiceService, VoiceResult, VoiceService,
};
use vpcm_runtime::{MixerEventQueue, PlatformConfig, VoicePlatform};
use vpcm_session::{SessionSnapshot, StreamHandle, StreamLifecycle};

/// Both halves of an opened session
pub struct DuplexStream {
    pub playback: StreamHandle,
    pub capture: StreamHandle,
    pub playback_queue: Arc<MixerEventQueue>,
    pub capture_queue: Arc<MixerEventQueue>,
}

/// Call control counts for one call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub starts: usize,
    pub resumes: usize,
    pub standbys: usize,
    pub ends: usize,
}

/// Platform plus the simulated service behind it
pub struct VoiceTestHarness {
    service: Arc<SimulatedVoiceService>,
    platform: VoicePlatform,
}

impl VoiceTestHarness {
    pub fn new() -> Self {
        Self::with_config(PlatformConfig::default())
    }

    pub fn with_config(config: PlatformConfig) -> Self {
        let service = Arc::new(SimulatedVoiceService::new());
        Self::with_service(config, service)
    }

    /// Probe over a prepared service.
    ///
    /// # Panics
    /// If the probe fails; harness setup is not under test.
    pub fn with_service(config: PlatformConfig, service: Arc<SimulatedVoiceService>) -> Self {
        let platform = match VoicePlatform::probe(config, service.clone()) {
            Ok(platform) => platform,
            Err(e) => panic!("probe failed: {}", e),
        };
        VoiceTestHarness { service, platform }
    }

    pub fn service(&self) -> &Arc<SimulatedVoiceService> {
        &self.service
    }

    pub fn platform(&self) -> &VoicePlatform {
        &self.platform
    }

    pub fn lifecycle(&self) -> &StreamLifecycle {
        self.platform.lifecycle()
    }

    pub fn controls(&self) -> &ControlDispatcher {
        self.platform.controls()
    }

    pub fn open(
        &self,
        stream_name: &str,
        direction: Direction,
    ) -> VoiceResult<(StreamHandle, Arc<MixerEventQueue>)> {
        self.platform.open_stream(stream_name, direction)
    }

    /// Open both directions, capture first
    pub fn open_duplex(&self, stream_name: &str) -> VoiceResult<DuplexStream> {
        let (capture, capture_queue) = self.open(stream_name, Direction::Capture)?;
        let (playback, playback_queue) = self.open(stream_name, Direction::Playback)?;
        Ok(DuplexStream {
            playback,
            capture,
            playback_queue,
            capture_queue,
        })
    }

    /// Open and prepare both directions
    pub fn start_duplex(&self, stream_name: &str) -> VoiceResult<DuplexStream> {
        let duplex = self.open_duplex(stream_name)?;
        self.lifecycle().prepare(&duplex.capture)?;
        self.lifecycle().prepare(&duplex.playback)?;
        Ok(duplex)
    }

    /// Close both directions, playback first. Both are closed even if the
    /// first close reports an error.
    pub fn close_duplex(&self, duplex: DuplexStream) -> VoiceResult<()> {
        let playback = self.lifecycle().close(duplex.playback);
        let capture = self.lifecycle().close(duplex.capture);
        playback.and(capture)
    }

    pub fn snapshot(&self, kind: SessionKind) -> SessionSnapshot {
        self.lifecycle().snapshot(kind)
    }

    /// Call id the service assigns to a kind
    pub fn call_id(&self, kind: SessionKind) -> CallId {
        self.service.call_identifier_for(kind)
    }

    pub fn counts(&self, kind: SessionKind) -> CallCounts {
        let call_id = self.call_id(kind);
        CallCounts {
            starts: self.service.count_for(ServiceOp::Start, call_id),
            resumes: self.service.count_for(ServiceOp::Resume, call_id),
            standbys: self.service.count_for(ServiceOp::Standby, call_id),
            ends: self.service.count_for(ServiceOp::End, call_id),
        }
    }
}

impl Default for VoiceTestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpcm_session::SessionState;

    #[test]
    fn test_start_and_close_duplex() {
        let harness = VoiceTestHarness::new();
        let duplex = harness.start_duplex("VoLTE").unwrap();
        assert_eq!(harness.snapshot(SessionKind::CarrierVoLTE).state, SessionState::CallActive);
        assert!(harness.service().is_running(CallId::VOLTE));

        harness.close_duplex(duplex).unwrap();
        assert_eq!(
            harness.counts(SessionKind::CarrierVoLTE),
            CallCounts {
                starts: 1,
                ends: 1,
                ..Default::default()
            }
        );
        assert!(!harness.service().is_running(CallId::VOLTE));
    }

    #[test]
    fn test_counts_are_per_call() {
        let harness = VoiceTestHarness::new();
        let _voice = harness.start_duplex("CS-Voice").unwrap();
        assert_eq!(harness.counts(SessionKind::Primary).starts, 1);
        assert_eq!(harness.counts(SessionKind::Secondary).starts, 0);
    }
}
