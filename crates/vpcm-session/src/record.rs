//! Session record - per-kind path bookkeeping and transition rules
//!
//! A record tracks the two half-duplex paths of one session. The
//! transition methods only update local state and report which call
//! control action the caller must perform; they never talk to the voice
//! service themselves. Callers hold the record lock across both.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use vpcm_core::{
    DetectionEventEnvelope, DetectionSink, Direction, SessionKind, VoiceError, VoiceResult,
};

/// Identity of one opened path
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PathId(pub u64);

/// Consumer binding owned by one open path.
///
/// Relays only ever hold a weak reference to the binding, so they lose the
/// consumer when the path closes even if the stream framework keeps the
/// consumer itself alive. A relay that upgraded just before close is turned
/// away by the `live` flag: once `detach` returns, no delivery is in flight
/// and none reaches the consumer.
struct PathBinding {
    inner: Arc<dyn DetectionSink>,
    live: Mutex<bool>,
}

impl DetectionSink for PathBinding {
    fn attach(&self) {
        let mut live = self.live.lock();
        *live = true;
        self.inner.attach();
    }

    fn detach(&self) {
        let mut live = self.live.lock();
        *live = false;
        self.inner.detach();
    }

    fn deliver(&self, envelope: DetectionEventEnvelope) -> VoiceResult<()> {
        let live = self.live.lock();
        if !*live {
            return Err(VoiceError::Delivery("capture path is closed".to_string()));
        }
        self.inner.deliver(envelope)
    }
}

/// An opened half-duplex path, owned by its record until close
pub struct PathHandle {
    pub(crate) id: PathId,
    pub(crate) name: String,
    pub(crate) consumer: Arc<dyn DetectionSink>,
}

impl PathHandle {
    pub fn new(id: PathId, name: impl Into<String>, consumer: Arc<dyn DetectionSink>) -> Self {
        PathHandle {
            id,
            name: name.into(),
            consumer: Arc::new(PathBinding {
                inner: consumer,
                live: Mutex::new(true),
            }),
        }
    }

    pub fn id(&self) -> PathId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn consumer(&self) -> &Arc<dyn DetectionSink> {
        &self.consumer
    }
}

impl fmt::Debug for PathHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Call control action decided by a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallAction {
    None,
    Start,
    Resume,
    Standby,
    End,
}

/// Lifecycle state, derived from the record fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No path open
    Idle,
    /// One path open
    HalfOpen,
    /// Both paths open, not both active
    FullyOpen,
    /// Both paths active, call running
    CallActive,
    /// Both paths open, call put on standby by a pause or suspend
    Paused,
}

/// Mutable state of one session, guarded by the record lock
#[derive(Debug, Default)]
pub struct PathState {
    playback_active: bool,
    capture_active: bool,
    open_count: u8,
    playback_path: Option<PathHandle>,
    capture_path: Option<PathHandle>,
    /// Start or resume was issued and no end since
    call_running: bool,
    /// Standby was issued while the call was running
    standby: bool,
    /// An end is owed: set on open and whenever a direction goes active,
    /// cleared when end fires
    end_pending: bool,
}

impl PathState {
    pub fn is_active(&self, direction: Direction) -> bool {
        match direction {
            Direction::Playback => self.playback_active,
            Direction::Capture => self.capture_active,
        }
    }

    pub fn both_active(&self) -> bool {
        self.playback_active && self.capture_active
    }

    pub fn open_count(&self) -> u8 {
        self.open_count
    }

    pub fn path(&self, direction: Direction) -> Option<&PathHandle> {
        match direction {
            Direction::Playback => self.playback_path.as_ref(),
            Direction::Capture => self.capture_path.as_ref(),
        }
    }

    /// Consumer of the capture path, if that path is open
    pub fn capture_consumer(&self) -> Option<&Arc<dyn DetectionSink>> {
        self.capture_path.as_ref().map(PathHandle::consumer)
    }

    pub fn call_running(&self) -> bool {
        self.call_running
    }

    pub fn state(&self) -> SessionState {
        if self.both_active() {
            SessionState::CallActive
        } else {
            match self.open_count {
                0 => SessionState::Idle,
                1 => SessionState::HalfOpen,
                _ if self.standby && self.call_running => SessionState::Paused,
                _ => SessionState::FullyOpen,
            }
        }
    }

    fn active_mut(&mut self, direction: Direction) -> &mut bool {
        match direction {
            Direction::Playback => &mut self.playback_active,
            Direction::Capture => &mut self.capture_active,
        }
    }

    fn slot_mut(&mut self, direction: Direction) -> &mut Option<PathHandle> {
        match direction {
            Direction::Playback => &mut self.playback_path,
            Direction::Capture => &mut self.capture_path,
        }
    }

    /// Store a newly opened path. Hands the path back if the slot is taken.
    pub(crate) fn attach(&mut self, direction: Direction, path: PathHandle) -> Result<(), PathHandle> {
        let slot = self.slot_mut(direction);
        if slot.is_some() {
            return Err(path);
        }
        *slot = Some(path);
        self.open_count += 1;
        self.end_pending = true;
        Ok(())
    }

    /// Mark a direction ready. Starts the call on the rising edge of
    /// both-active. Does not require the direction to be open.
    pub(crate) fn prepare(&mut self, direction: Direction) -> CallAction {
        if self.raise(direction) {
            self.call_running = true;
            self.standby = false;
            CallAction::Start
        } else {
            CallAction::None
        }
    }

    /// Resume or pause-release: like prepare, but resumes the call
    pub(crate) fn resume(&mut self, direction: Direction) -> CallAction {
        if self.raise(direction) {
            self.call_running = true;
            self.standby = false;
            CallAction::Resume
        } else {
            CallAction::None
        }
    }

    /// Suspend or pause-push: the direction goes inactive and the call is
    /// put on standby whatever the previous state was
    pub(crate) fn hold(&mut self, direction: Direction) -> CallAction {
        *self.active_mut(direction) = false;
        if self.call_running {
            self.standby = true;
        }
        CallAction::Standby
    }

    /// Remove a closing path. Ends the call when neither direction is
    /// active any more and an end is still owed.
    pub(crate) fn detach(&mut self, direction: Direction) -> (Option<PathHandle>, CallAction) {
        *self.active_mut(direction) = false;
        let path = self.slot_mut(direction).take();
        if path.is_some() {
            self.open_count -= 1;
        }

        let action = if !self.playback_active && !self.capture_active && self.end_pending {
            self.end_pending = false;
            self.call_running = false;
            self.standby = false;
            CallAction::End
        } else {
            CallAction::None
        };
        (path, action)
    }

    /// Set a direction active; true on the rising edge of both-active.
    /// Any direction going active owes an end again.
    fn raise(&mut self, direction: Direction) -> bool {
        let was_both = self.both_active();
        let active = self.active_mut(direction);
        if !*active {
            *active = true;
            self.end_pending = true;
        }
        !was_both && self.both_active()
    }
}

/// Read-only view of a record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub kind: SessionKind,
    pub state: SessionState,
    pub playback_active: bool,
    pub capture_active: bool,
    pub open_count: u8,
    pub playback_open: bool,
    pub capture_open: bool,
    pub call_running: bool,
}

/// One registry slot: a session kind and its lock-guarded state
#[derive(Debug)]
pub struct SessionRecord {
    kind: SessionKind,
    state: Mutex<PathState>,
}

impl SessionRecord {
    pub fn new(kind: SessionKind) -> Self {
        SessionRecord {
            kind,
            state: Mutex::new(PathState::default()),
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Acquire the record lock
    pub fn lock(&self) -> MutexGuard<'_, PathState> {
        self.state.lock()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            kind: self.kind,
            state: state.state(),
            playback_active: state.playback_active,
            capture_active: state.capture_active,
            open_count: state.open_count,
            playback_open: state.playback_path.is_some(),
            capture_open: state.capture_path.is_some(),
            call_running: state.call_running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpcm_core::{CallId, DetectionRelay, RelayOutcome};

    struct NullSink;

    impl DetectionSink for NullSink {
        fn deliver(&self, _envelope: DetectionEventEnvelope) -> VoiceResult<()> {
            Ok(())
        }
    }

    fn path(id: u64) -> PathHandle {
        PathHandle::new(PathId(id), "CS-Voice", Arc::new(NullSink))
    }

    #[test]
    fn test_attach_counts_paths() {
        let mut state = PathState::default();
        state.attach(Direction::Capture, path(1)).unwrap();
        assert_eq!(state.open_count(), 1);
        assert_eq!(state.state(), SessionState::HalfOpen);

        state.attach(Direction::Playback, path(2)).unwrap();
        assert_eq!(state.open_count(), 2);
        assert_eq!(state.state(), SessionState::FullyOpen);
    }

    #[test]
    fn test_attach_rejects_busy_slot() {
        let mut state = PathState::default();
        state.attach(Direction::Capture, path(1)).unwrap();
        let rejected = state.attach(Direction::Capture, path(2)).unwrap_err();
        assert_eq!(rejected.id(), PathId(2));
        assert_eq!(state.open_count(), 1);
        assert_eq!(state.path(Direction::Capture).unwrap().id(), PathId(1));
    }

    #[test]
    fn test_prepare_starts_on_rising_edge_only() {
        let mut state = PathState::default();
        assert_eq!(state.prepare(Direction::Capture), CallAction::None);
        assert_eq!(state.prepare(Direction::Playback), CallAction::Start);
        assert_eq!(state.prepare(Direction::Playback), CallAction::None);
        assert_eq!(state.prepare(Direction::Capture), CallAction::None);
        assert_eq!(state.state(), SessionState::CallActive);
    }

    #[test]
    fn test_hold_always_standby() {
        let mut state = PathState::default();
        assert_eq!(state.hold(Direction::Playback), CallAction::Standby);
        assert!(!state.is_active(Direction::Playback));
    }

    #[test]
    fn test_pause_and_resume() {
        let mut state = PathState::default();
        state.attach(Direction::Playback, path(1)).unwrap();
        state.attach(Direction::Capture, path(2)).unwrap();
        state.prepare(Direction::Playback);
        state.prepare(Direction::Capture);

        assert_eq!(state.hold(Direction::Capture), CallAction::Standby);
        assert_eq!(state.state(), SessionState::Paused);

        assert_eq!(state.resume(Direction::Capture), CallAction::Resume);
        assert_eq!(state.state(), SessionState::CallActive);
        assert_eq!(state.resume(Direction::Capture), CallAction::None);
    }

    #[test]
    fn test_resume_with_one_direction_does_nothing() {
        let mut state = PathState::default();
        state.attach(Direction::Playback, path(1)).unwrap();
        assert_eq!(state.resume(Direction::Playback), CallAction::None);
        assert!(!state.call_running());
    }

    #[test]
    fn test_detach_ends_once() {
        let mut state = PathState::default();
        state.attach(Direction::Playback, path(1)).unwrap();
        state.attach(Direction::Capture, path(2)).unwrap();

        let (closed, action) = state.detach(Direction::Playback);
        assert!(closed.is_some());
        assert_eq!(action, CallAction::End);
        assert_eq!(state.open_count(), 1);

        let (closed, action) = state.detach(Direction::Capture);
        assert!(closed.is_some());
        assert_eq!(action, CallAction::None);
        assert_eq!(state.open_count(), 0);
        assert_eq!(state.state(), SessionState::Idle);
    }

    #[test]
    fn test_detach_keeps_call_while_other_direction_active() {
        let mut state = PathState::default();
        state.attach(Direction::Playback, path(1)).unwrap();
        state.attach(Direction::Capture, path(2)).unwrap();
        state.prepare(Direction::Playback);
        state.prepare(Direction::Capture);

        let (_, action) = state.detach(Direction::Playback);
        assert_eq!(action, CallAction::None);
        assert!(state.call_running());

        let (_, action) = state.detach(Direction::Capture);
        assert_eq!(action, CallAction::End);
        assert!(!state.call_running());
    }

    #[test]
    fn test_reactivation_after_end_owes_end() {
        let mut state = PathState::default();
        state.attach(Direction::Capture, path(1)).unwrap();
        state.attach(Direction::Playback, path(2)).unwrap();

        let (_, action) = state.detach(Direction::Playback);
        assert_eq!(action, CallAction::End);

        assert_eq!(state.prepare(Direction::Capture), CallAction::None);
        let (_, action) = state.detach(Direction::Capture);
        assert_eq!(action, CallAction::End);
        assert_eq!(state.state(), SessionState::Idle);
    }

    #[test]
    fn test_binding_rejects_delivery_after_detach() {
        let consumer: Arc<dyn DetectionSink> = Arc::new(NullSink);
        let handle = PathHandle::new(PathId(1), "CS-Voice", consumer);
        let binding = Arc::clone(handle.consumer());
        let relay = DetectionRelay::new(CallId::VOICE, &binding);

        assert_eq!(relay.relay(Some(&[1, 2, 3, 4])), RelayOutcome::Delivered);
        binding.detach();
        // The relay still reaches the binding, which turns the event away
        assert!(relay.is_connected());
        assert_eq!(relay.relay(Some(&[1, 2, 3, 4])), RelayOutcome::DeliveryFailed);
        assert!(binding.deliver(DetectionEventEnvelope::new([0; 4])).is_err());
    }

    #[test]
    fn test_binding_dies_with_path() {
        let consumer: Arc<dyn DetectionSink> = Arc::new(NullSink);
        let mut state = PathState::default();
        state
            .attach(
                Direction::Capture,
                PathHandle::new(PathId(1), "CS-Voice", Arc::clone(&consumer)),
            )
            .unwrap();

        let relay = DetectionRelay::new(CallId::VOICE, state.capture_consumer().unwrap());
        assert_eq!(relay.relay(Some(&[1, 2, 3, 4])), RelayOutcome::Delivered);

        let (closed, _) = state.detach(Direction::Capture);
        drop(closed);
        // The caller still owns the consumer, but the path binding is gone
        assert!(!relay.is_connected());
        assert_eq!(relay.relay(Some(&[1, 2, 3, 4])), RelayOutcome::MissingConsumer);
        assert_eq!(Arc::strong_count(&consumer), 1);
    }

    #[test]
    fn test_detach_of_unopened_direction_keeps_count() {
        let mut state = PathState::default();
        state.attach(Direction::Capture, path(1)).unwrap();
        let (closed, action) = state.detach(Direction::Playback);
        assert!(closed.is_none());
        assert_eq!(action, CallAction::End);
        assert_eq!(state.open_count(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn direction(playback: bool) -> Direction {
            if playback {
                Direction::Playback
            } else {
                Direction::Capture
            }
        }

        proptest! {
            #[test]
            fn prop_open_count_matches_paths(
                ops in proptest::collection::vec((0u8..5, any::<bool>()), 0..64)
            ) {
                let mut state = PathState::default();
                let mut next = 0u64;
                for (op, playback) in ops {
                    let dir = direction(playback);
                    match op {
                        0 => {
                            next += 1;
                            let _ = state.attach(dir, path(next));
                        }
                        1 => {
                            state.prepare(dir);
                        }
                        2 => {
                            state.resume(dir);
                        }
                        3 => {
                            state.hold(dir);
                        }
                        _ => {
                            state.detach(dir);
                        }
                    }
                    let paths = usize::from(state.path(Direction::Playback).is_some())
                        + usize::from(state.path(Direction::Capture).is_some());
                    prop_assert_eq!(usize::from(state.open_count()), paths);
                }
            }

            #[test]
            fn prop_start_only_on_rising_edge(
                ops in proptest::collection::vec((0u8..3, any::<bool>()), 0..64)
            ) {
                let mut state = PathState::default();
                for (op, playback) in ops {
                    let dir = direction(playback);
                    let before = state.both_active();
                    let action = match op {
                        0 => state.prepare(dir),
                        1 => state.resume(dir),
                        _ => state.hold(dir),
                    };
                    let rising = !before && state.both_active();
                    let started = matches!(action, CallAction::Start | CallAction::Resume);
                    prop_assert_eq!(started, rising);
                }
            }
        }
    }
}
