//! Stream lifecycle - drives session records from stream framework events
//!
//! Each event is handled under the target record's lock:
//! 1. Resolve the session kind (from the stream name on open)
//! 2. Apply the transition to the record
//! 3. Perform the call control action it produced, still under the lock
//!
//! A failed call control request does not roll the record back. The voice
//! service is authoritative for whether a call actually runs, and a path
//! stays usable even when the DSP call did not start.

use std::sync::Arc;

use tracing::{debug, error, info};
use vpcm_core::{
    DetectionSink, Direction, LchMode, SessionKind, TriggerEvent, VoiceError, VoiceResult,
    VoiceService,
};

use crate::{CallAction, PathHandle, PathId, SessionRegistry, SessionSnapshot};

/// Handle given to the stream framework for one opened path.
///
/// Not cloneable: closing consumes it.
#[derive(Debug)]
pub struct StreamHandle {
    kind: SessionKind,
    direction: Direction,
    path: PathId,
    name: String,
}

impl StreamHandle {
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn path_id(&self) -> PathId {
        self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Lifecycle engine
pub struct StreamLifecycle {
    registry: Arc<SessionRegistry>,
    service: Arc<dyn VoiceService>,
}

impl StreamLifecycle {
    pub fn new(registry: Arc<SessionRegistry>, service: Arc<dyn VoiceService>) -> Self {
        StreamLifecycle { registry, service }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Open a path. The session kind comes from the stream's name.
    pub fn open(
        &self,
        stream_name: &str,
        direction: Direction,
        consumer: Arc<dyn DetectionSink>,
    ) -> VoiceResult<StreamHandle> {
        let kind = SessionKind::from_stream_name(stream_name);
        let record = self.registry.record_for(kind);
        let path = self.registry.next_path_id();

        {
            let mut state = record.lock();
            let handle = PathHandle::new(path, stream_name, Arc::clone(&consumer));
            if state.attach(direction, handle).is_err() {
                error!(%kind, %direction, stream = stream_name, "path already open");
                return Err(VoiceError::PathBusy { kind, direction });
            }
            debug!(
                %kind,
                %direction,
                stream = stream_name,
                open_count = state.open_count(),
                "opened path"
            );
        }

        consumer.attach();

        Ok(StreamHandle {
            kind,
            direction,
            path,
            name: stream_name.to_string(),
        })
    }

    /// Buffer parameters are the transport's business; accepted as is
    pub fn hw_params(&self, stream: &StreamHandle) -> VoiceResult<()> {
        debug!(kind = %stream.kind, direction = %stream.direction, "hw_params");
        Ok(())
    }

    /// Mark the path ready; starts the call once both paths are ready
    pub fn prepare(&self, stream: &StreamHandle) -> VoiceResult<()> {
        let record = self.registry.record_for(stream.kind);
        let mut state = record.lock();
        let action = state.prepare(stream.direction);
        debug!(kind = %stream.kind, direction = %stream.direction, ?action, "prepare");
        self.perform(stream.kind, action)
    }

    /// Handle a trigger command
    pub fn trigger(&self, stream: &StreamHandle, event: TriggerEvent) -> VoiceResult<()> {
        if !event.is_resume() && !event.is_hold() {
            debug!(kind = %stream.kind, ?event, "start and stop are not handled in trigger");
            return Ok(());
        }

        let record = self.registry.record_for(stream.kind);
        let mut state = record.lock();
        let action = if event.is_resume() {
            state.resume(stream.direction)
        } else {
            state.hold(stream.direction)
        };
        debug!(kind = %stream.kind, direction = %stream.direction, ?event, ?action, "trigger");
        self.perform(stream.kind, action)
    }

    /// Handle a raw trigger command code
    pub fn trigger_raw(&self, stream: &StreamHandle, cmd: i32) -> VoiceResult<()> {
        let event = TriggerEvent::from_raw(cmd).ok_or(VoiceError::InvalidArgument {
            name: "trigger",
            value: i64::from(cmd),
        })?;
        self.trigger(stream, event)
    }

    /// Close a path. Ends the call once neither direction is active.
    ///
    /// The path is released even when ending the call fails.
    pub fn close(&self, stream: StreamHandle) -> VoiceResult<()> {
        let record = self.registry.record_for(stream.kind);
        let (closed, result) = {
            let mut state = record.lock();
            let (closed, action) = state.detach(stream.direction);
            debug!(
                kind = %stream.kind,
                direction = %stream.direction,
                open_count = state.open_count(),
                ?action,
                "closed path"
            );
            (closed, self.perform(stream.kind, action))
        };

        if let Some(path) = closed {
            path.consumer().detach();
        }
        result
    }

    /// Local call hold for the stream's session
    pub fn set_local_call_hold(&self, stream: &StreamHandle, mode: LchMode) -> VoiceResult<()> {
        let call_id = self.service.call_identifier_for(stream.kind);
        debug!(stream = %stream.name, %call_id, ?mode, "local call hold");
        self.service
            .set_lch(call_id, mode)
            .map_err(VoiceError::service("set_lch", call_id))
    }

    /// Local call hold from a raw mode value
    pub fn set_local_call_hold_raw(&self, stream: &StreamHandle, mode: i32) -> VoiceResult<()> {
        let mode = LchMode::from_raw(mode).ok_or(VoiceError::InvalidArgument {
            name: "lch_mode",
            value: i64::from(mode),
        })?;
        self.set_local_call_hold(stream, mode)
    }

    pub fn snapshot(&self, kind: SessionKind) -> SessionSnapshot {
        self.registry.record_for(kind).snapshot()
    }

    /// Issue the call control request for an action. Runs under the
    /// caller's record lock.
    fn perform(&self, kind: SessionKind, action: CallAction) -> VoiceResult<()> {
        let op = match action {
            CallAction::None => return Ok(()),
            CallAction::Start => "start",
            CallAction::Resume => "resume",
            CallAction::Standby => "standby",
            CallAction::End => "end",
        };

        let call_id = self.service.call_identifier_for(kind);
        if call_id.is_none() {
            debug!(%kind, op, "no call id assigned, skipping");
            return Ok(());
        }

        let result = match action {
            CallAction::Start => self.service.start_voice_call(call_id),
            CallAction::Resume => self.service.resume_voice_call(call_id),
            CallAction::Standby => self.service.standby_voice_call(call_id),
            CallAction::End => self.service.end_voice_call(call_id),
            CallAction::None => Ok(()),
        };

        match result {
            Ok(()) => {
                info!(%kind, %call_id, op, "voice call {}", op);
                Ok(())
            }
            Err(e) => {
                error!(%kind, %call_id, op, "voice call request failed: {}", e);
                Err(VoiceError::service(op, call_id)(e))
            }
        }
    }
}
