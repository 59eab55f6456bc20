//! Voice platform - probe-time wiring of the session coordinator

use std::sync::Arc;

use tracing::{error, info, warn};
use vpcm_control::ControlDispatcher;
use vpcm_core::{
    DetectionSink, Direction, ServiceError, VoiceError, VoiceResult, VoiceService,
};
use vpcm_session::{SessionRegistry, StreamHandle, StreamLifecycle};

use crate::{MixerEventQueue, PlatformConfig};

/// A probed voice platform
pub struct VoicePlatform {
    config: PlatformConfig,
    service: Arc<dyn VoiceService>,
    registry: Arc<SessionRegistry>,
    lifecycle: StreamLifecycle,
    dispatcher: ControlDispatcher,
}

impl VoicePlatform {
    /// Bring the platform up on top of a voice service.
    ///
    /// Fails with `ProbeDeferred` while the service is not ready; the
    /// caller should probe again later. A calibration memory failure other
    /// than a deferral is logged and the probe continues.
    pub fn probe(config: PlatformConfig, service: Arc<dyn VoiceService>) -> VoiceResult<Self> {
        config.validate()?;

        if !service.is_initialized() {
            warn!("voice service not initialized, deferring probe");
            return Err(VoiceError::ProbeDeferred("voice service not initialized"));
        }

        match service.alloc_cal_shared_memory() {
            Ok(()) => {}
            Err(ServiceError::Deferred) => {
                warn!("calibration memory not available yet, deferring probe");
                return Err(VoiceError::ProbeDeferred("calibration memory"));
            }
            Err(e) => error!("calibration memory allocation failed: {}", e),
        }

        service.set_destroy_cvd_flag(config.destroy_cvd);
        service.set_vote_bms_flag(config.vote_bms);

        let registry = Arc::new(SessionRegistry::new());
        let lifecycle = StreamLifecycle::new(registry.clone(), service.clone());
        let dispatcher = ControlDispatcher::new(registry.clone(), service.clone());

        info!(
            destroy_cvd = config.destroy_cvd,
            vote_bms = config.vote_bms,
            "voice platform probed"
        );

        Ok(VoicePlatform {
            config,
            service,
            registry,
            lifecycle,
            dispatcher,
        })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<dyn VoiceService> {
        &self.service
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn lifecycle(&self) -> &StreamLifecycle {
        &self.lifecycle
    }

    pub fn controls(&self) -> &ControlDispatcher {
        &self.dispatcher
    }

    /// Open a stream path with a fresh event queue sized from the config
    pub fn open_stream(
        &self,
        stream_name: &str,
        direction: Direction,
    ) -> VoiceResult<(StreamHandle, Arc<MixerEventQueue>)> {
        let queue = Arc::new(MixerEventQueue::new(self.config.detection_queue_depth));
        let consumer: Arc<dyn DetectionSink> = queue.clone();
        let handle = self.lifecycle.open(stream_name, direction, consumer)?;
        Ok((handle, queue))
    }
}
