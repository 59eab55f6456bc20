//! Simulated voice-control service
//!
//! In-memory stand-in for the DSP service. It records every request in
//! order, tracks which calls are running, and can be told to fail chosen
//! operations or to park callers for a given call id.

use std::collections::{HashMap, HashSet};

use parking_lot::{Condvar, Mutex};

use crate::{
    CallId, DetectionRelay, LchMode, PpModule, RampDuration, RelayOutcome, ServiceError,
    ServiceResult, SessionKind, TtyMode, VoiceService, VolumeDirection,
};

/// Operation class, used for failure injection and call counting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceOp {
    Start,
    Resume,
    Standby,
    End,
    Lch,
    TxMute,
    DeviceMute,
    RxVolume,
    TtyMode,
    PpEnable,
    HdEnable,
    Topology,
    Sidetone,
    DetectionEnable,
    DetectionRegister,
    Version,
}

/// One recorded request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceCall {
    Start(CallId),
    Resume(CallId),
    Standby(CallId),
    End(CallId),
    Lch(CallId, LchMode),
    TxMute {
        call_id: CallId,
        mute: bool,
        ramp_ms: u32,
    },
    DeviceMute {
        call_id: CallId,
        direction: VolumeDirection,
        mute: bool,
        ramp_ms: u32,
    },
    RxVolume {
        call_id: CallId,
        volume: u32,
        ramp_ms: u32,
    },
    TtyMode(CallId, TtyMode),
    PpEnable {
        call_id: CallId,
        module: PpModule,
        enable: bool,
    },
    HdEnable(CallId, bool),
    Topology(CallId, bool),
    Sidetone(CallId, bool),
    DetectionEnable(CallId, bool),
    DetectionRegister {
        call_id: CallId,
        installed: bool,
    },
    Version,
}

impl ServiceCall {
    pub fn op(&self) -> ServiceOp {
        match self {
            ServiceCall::Start(_) => ServiceOp::Start,
            ServiceCall::Resume(_) => ServiceOp::Resume,
            ServiceCall::Standby(_) => ServiceOp::Standby,
            ServiceCall::End(_) => ServiceOp::End,
            ServiceCall::Lch(..) => ServiceOp::Lch,
            ServiceCall::TxMute { .. } => ServiceOp::TxMute,
            ServiceCall::DeviceMute { .. } => ServiceOp::DeviceMute,
            ServiceCall::RxVolume { .. } => ServiceOp::RxVolume,
            ServiceCall::TtyMode(..) => ServiceOp::TtyMode,
            ServiceCall::PpEnable { .. } => ServiceOp::PpEnable,
            ServiceCall::HdEnable(..) => ServiceOp::HdEnable,
            ServiceCall::Topology(..) => ServiceOp::Topology,
            ServiceCall::Sidetone(..) => ServiceOp::Sidetone,
            ServiceCall::DetectionEnable(..) => ServiceOp::DetectionEnable,
            ServiceCall::DetectionRegister { .. } => ServiceOp::DetectionRegister,
            ServiceCall::Version => ServiceOp::Version,
        }
    }

    /// Call the request was made for; None for the version query
    pub fn call_id(&self) -> Option<CallId> {
        match self {
            ServiceCall::Start(id)
            | ServiceCall::Resume(id)
            | ServiceCall::Standby(id)
            | ServiceCall::End(id)
            | ServiceCall::Lch(id, _)
            | ServiceCall::TtyMode(id, _)
            | ServiceCall::HdEnable(id, _)
            | ServiceCall::Topology(id, _)
            | ServiceCall::Sidetone(id, _)
            | ServiceCall::DetectionEnable(id, _) => Some(*id),
            ServiceCall::TxMute { call_id, .. }
            | ServiceCall::DeviceMute { call_id, .. }
            | ServiceCall::RxVolume { call_id, .. }
            | ServiceCall::PpEnable { call_id, .. }
            | ServiceCall::DetectionRegister { call_id, .. } => Some(*call_id),
            ServiceCall::Version => None,
        }
    }
}

#[derive(Default)]
struct SimState {
    calls: Vec<ServiceCall>,
    failing: HashSet<ServiceOp>,
    session_ids: HashMap<String, CallId>,
    running: HashSet<CallId>,
    standby: HashSet<CallId>,
    tty: HashMap<CallId, TtyMode>,
    sidetone: bool,
    relays: HashMap<CallId, DetectionRelay>,
    version: Option<String>,
    uninitialized: bool,
    cal_memory_error: Option<ServiceError>,
    destroy_cvd: bool,
    vote_bms: bool,
}

#[derive(Default)]
struct Gate {
    held: HashSet<CallId>,
    waiting: usize,
}

/// Simulated voice-control service
#[derive(Default)]
pub struct SimulatedVoiceService {
    state: Mutex<SimState>,
    gate: Mutex<Gate>,
    released: Condvar,
}

impl SimulatedVoiceService {
    pub fn new() -> Self {
        SimulatedVoiceService::default()
    }

    /// All requests so far, in order
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.state.lock().calls.clone()
    }

    /// Requests of one operation class, in order
    pub fn calls_of(&self, op: ServiceOp) -> Vec<ServiceCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.op() == op)
            .cloned()
            .collect()
    }

    pub fn count(&self, op: ServiceOp) -> usize {
        self.state.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Requests of one class made for one call
    pub fn count_for(&self, op: ServiceOp, call_id: CallId) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.op() == op && c.call_id() == Some(call_id))
            .count()
    }

    /// Make every later request of this class fail
    pub fn fail(&self, op: ServiceOp) {
        self.state.lock().failing.insert(op);
    }

    pub fn recover(&self, op: ServiceOp) {
        self.state.lock().failing.remove(&op);
    }

    /// Override the id handed out for a session name
    pub fn assign_session_id(&self, session_name: &str, call_id: CallId) {
        self.state
            .lock()
            .session_ids
            .insert(session_name.to_string(), call_id);
    }

    pub fn is_running(&self, call_id: CallId) -> bool {
        self.state.lock().running.contains(&call_id)
    }

    pub fn is_on_standby(&self, call_id: CallId) -> bool {
        self.state.lock().standby.contains(&call_id)
    }

    pub fn set_version(&self, version: Option<&str>) {
        self.state.lock().version = version.map(str::to_string);
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.state.lock().uninitialized = !initialized;
    }

    pub fn set_cal_memory_error(&self, error: Option<ServiceError>) {
        self.state.lock().cal_memory_error = error;
    }

    pub fn destroy_cvd(&self) -> bool {
        self.state.lock().destroy_cvd
    }

    pub fn vote_bms(&self) -> bool {
        self.state.lock().vote_bms
    }

    pub fn relay_for(&self, call_id: CallId) -> Option<DetectionRelay> {
        self.state.lock().relays.get(&call_id).cloned()
    }

    /// Emit a detection for a call, as the service thread would.
    /// None when no relay is registered.
    pub fn emit_detection(&self, call_id: CallId, packet: Option<&[u8]>) -> Option<RelayOutcome> {
        let relay = self.relay_for(call_id)?;
        Some(relay.relay(packet))
    }

    /// Park call-control requests for `call_id` until released
    pub fn hold_calls(&self, call_id: CallId) {
        self.gate.lock().held.insert(call_id);
    }

    pub fn release_calls(&self, call_id: CallId) {
        self.gate.lock().held.remove(&call_id);
        self.released.notify_all();
    }

    /// Number of requests currently parked
    pub fn parked(&self) -> usize {
        self.gate.lock().waiting
    }

    fn wait_if_held(&self, call_id: CallId) {
        let mut gate = self.gate.lock();
        if !gate.held.contains(&call_id) {
            return;
        }
        gate.waiting += 1;
        while gate.held.contains(&call_id) {
            self.released.wait(&mut gate);
        }
        gate.waiting -= 1;
    }

    /// Record a request and apply `effect` unless the class is failing
    fn record(&self, call: ServiceCall, effect: impl FnOnce(&mut SimState)) -> ServiceResult {
        let mut state = self.state.lock();
        let op = call.op();
        state.calls.push(call);
        if state.failing.contains(&op) {
            return Err(ServiceError::Rejected(-5));
        }
        effect(&mut state);
        Ok(())
    }

    fn call_control(
        &self,
        call: ServiceCall,
        call_id: CallId,
        effect: impl FnOnce(&mut SimState),
    ) -> ServiceResult {
        self.wait_if_held(call_id);
        self.record(call, effect)
    }
}

impl VoiceService for SimulatedVoiceService {
    fn session_id(&self, session_name: &str) -> CallId {
        if let Some(id) = self.state.lock().session_ids.get(session_name) {
            return *id;
        }
        SessionKind::ALL
            .into_iter()
            .find(|kind| kind.session_name() == session_name)
            .map(SessionKind::well_known_call_id)
            .unwrap_or(CallId::NONE)
    }

    fn start_voice_call(&self, call_id: CallId) -> ServiceResult {
        self.call_control(ServiceCall::Start(call_id), call_id, |s| {
            s.running.insert(call_id);
            s.standby.remove(&call_id);
        })
    }

    fn resume_voice_call(&self, call_id: CallId) -> ServiceResult {
        self.call_control(ServiceCall::Resume(call_id), call_id, |s| {
            s.running.insert(call_id);
            s.standby.remove(&call_id);
        })
    }

    fn standby_voice_call(&self, call_id: CallId) -> ServiceResult {
        self.call_control(ServiceCall::Standby(call_id), call_id, |s| {
            if s.running.contains(&call_id) {
                s.standby.insert(call_id);
            }
        })
    }

    fn end_voice_call(&self, call_id: CallId) -> ServiceResult {
        self.call_control(ServiceCall::End(call_id), call_id, |s| {
            s.running.remove(&call_id);
            s.standby.remove(&call_id);
        })
    }

    fn set_lch(&self, call_id: CallId, mode: LchMode) -> ServiceResult {
        self.record(ServiceCall::Lch(call_id, mode), |_| {})
    }

    fn set_tx_mute(&self, call_id: CallId, mute: bool, ramp: RampDuration) -> ServiceResult {
        let call = ServiceCall::TxMute {
            call_id,
            mute,
            ramp_ms: ramp.as_millis(),
        };
        self.record(call, |_| {})
    }

    fn set_device_mute(
        &self,
        call_id: CallId,
        direction: VolumeDirection,
        mute: bool,
        ramp: RampDuration,
    ) -> ServiceResult {
        let call = ServiceCall::DeviceMute {
            call_id,
            direction,
            mute,
            ramp_ms: ramp.as_millis(),
        };
        self.record(call, |_| {})
    }

    fn set_rx_volume_step(
        &self,
        call_id: CallId,
        volume: u32,
        ramp: RampDuration,
    ) -> ServiceResult {
        let call = ServiceCall::RxVolume {
            call_id,
            volume,
            ramp_ms: ramp.as_millis(),
        };
        self.record(call, |_| {})
    }

    fn set_tty_mode(&self, call_id: CallId, mode: TtyMode) -> ServiceResult {
        self.record(ServiceCall::TtyMode(call_id, mode), |s| {
            s.tty.insert(call_id, mode);
        })
    }

    fn tty_mode(&self, call_id: CallId) -> TtyMode {
        self.state.lock().tty.get(&call_id).copied().unwrap_or_default()
    }

    fn set_pp_enable(&self, call_id: CallId, module: PpModule, enable: bool) -> ServiceResult {
        let call = ServiceCall::PpEnable {
            call_id,
            module,
            enable,
        };
        self.record(call, |_| {})
    }

    fn set_hd_enable(&self, call_id: CallId, enable: bool) -> ServiceResult {
        self.record(ServiceCall::HdEnable(call_id, enable), |_| {})
    }

    fn disable_topology(&self, call_id: CallId, disable: bool) -> ServiceResult {
        self.record(ServiceCall::Topology(call_id, disable), |_| {})
    }

    fn set_afe_sidetone(&self, call_id: CallId, enable: bool) -> ServiceResult {
        self.record(ServiceCall::Sidetone(call_id, enable), |s| {
            s.sidetone = enable;
        })
    }

    fn afe_sidetone(&self) -> bool {
        self.state.lock().sidetone
    }

    fn enable_dtmf_rx_detection(&self, call_id: CallId, enable: bool) -> ServiceResult {
        self.record(ServiceCall::DetectionEnable(call_id, enable), |_| {})
    }

    fn register_dtmf_rx_detection(
        &self,
        call_id: CallId,
        relay: Option<DetectionRelay>,
    ) -> ServiceResult {
        let call = ServiceCall::DetectionRegister {
            call_id,
            installed: relay.is_some(),
        };
        self.record(call, |s| match relay {
            Some(relay) => {
                s.relays.insert(call_id, relay);
            }
            None => {
                s.relays.remove(&call_id);
            }
        })
    }

    fn cvd_version(&self) -> ServiceResult<String> {
        let mut state = self.state.lock();
        state.calls.push(ServiceCall::Version);
        if state.failing.contains(&ServiceOp::Version) {
            return Err(ServiceError::Rejected(-5));
        }
        state.version.clone().ok_or(ServiceError::NotReady)
    }

    fn is_initialized(&self) -> bool {
        !self.state.lock().uninitialized
    }

    fn alloc_cal_shared_memory(&self) -> ServiceResult {
        match &self.state.lock().cal_memory_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn set_destroy_cvd_flag(&self, destroy: bool) {
        self.state.lock().destroy_cvd = destroy;
    }

    fn set_vote_bms_flag(&self, vote: bool) {
        self.state.lock().vote_bms = vote;
    }
}
