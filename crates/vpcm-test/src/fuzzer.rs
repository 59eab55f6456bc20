//! Lifecycle fuzzer - random interleavings checked against the model
//!
//! Every fuzzed session runs on its own thread with its own seeded RNG, so
//! sessions interleave freely while each one's sequence stays reproducible.
//! After every operation the record snapshot must match the model; at the
//! end the service's call control counts must match as well.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vpcm_core::{Direction, SessionKind, TriggerEvent, VoiceError};
use vpcm_session::StreamHandle;

use crate::{CallCounts, LifecycleOp, SessionModel, VoiceTestHarness};

const TRIGGERS: [TriggerEvent; 6] = [
    TriggerEvent::Stop,
    TriggerEvent::Start,
    TriggerEvent::PausePush,
    TriggerEvent::PauseRelease,
    TriggerEvent::Suspend,
    TriggerEvent::Resume,
];

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Sessions fuzzed in parallel, taken from the front of the catalog
    pub session_count: usize,
    /// Operations per session
    pub op_count: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            session_count: 3,
            op_count: 200,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            session_count: 2,
            op_count: 50,
            seed: 42,
        }
    }

    /// Every session kind at once
    pub fn heavy() -> Self {
        FuzzerConfig {
            session_count: SessionKind::COUNT,
            op_count: 2000,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Fuzzing outcome
#[derive(Debug, Default)]
pub struct FuzzResult {
    pub ops_applied: usize,
    pub ops_skipped: usize,
    pub counts: Vec<(SessionKind, CallCounts)>,
    pub violations: Vec<String>,
}

impl FuzzResult {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Stream name that resolves to a kind
pub fn stream_name_for(kind: SessionKind) -> &'static str {
    kind.stream_prefix().unwrap_or("CS-Voice")
}

fn random_op(rng: &mut StdRng) -> LifecycleOp {
    let direction = if rng.gen_bool(0.5) {
        Direction::Playback
    } else {
        Direction::Capture
    };
    match rng.gen_range(0..4) {
        0 => LifecycleOp::Open(direction),
        1 => LifecycleOp::Prepare(direction),
        2 => LifecycleOp::Trigger(direction, TRIGGERS[rng.gen_range(0..TRIGGERS.len())]),
        _ => LifecycleOp::Close(direction),
    }
}

/// Real handles of one session, by direction
#[derive(Default)]
struct Handles {
    playback: Option<StreamHandle>,
    capture: Option<StreamHandle>,
}

impl Handles {
    fn slot(&mut self, direction: Direction) -> &mut Option<StreamHandle> {
        match direction {
            Direction::Playback => &mut self.playback,
            Direction::Capture => &mut self.capture,
        }
    }
}

/// Lifecycle fuzzer
pub struct LifecycleFuzzer {
    config: FuzzerConfig,
    harness: VoiceTestHarness,
}

impl LifecycleFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        LifecycleFuzzer {
            config,
            harness: VoiceTestHarness::new(),
        }
    }

    pub fn harness(&self) -> &VoiceTestHarness {
        &self.harness
    }

    /// Run one thread per session and collect the outcome
    pub fn run(&self) -> FuzzResult {
        let result = Mutex::new(FuzzResult::default());
        let kinds = SessionKind::ALL
            .into_iter()
            .take(self.config.session_count.min(SessionKind::COUNT));

        std::thread::scope(|scope| {
            for kind in kinds {
                let result = &result;
                scope.spawn(move || {
                    let session = self.run_session(kind);
                    let mut result = result.lock();
                    result.ops_applied += session.ops_applied;
                    result.ops_skipped += session.ops_skipped;
                    result.counts.extend(session.counts);
                    result.violations.extend(session.violations);
                });
            }
        });

        let mut result = result.into_inner();
        result.counts.sort_by_key(|(kind, _)| kind.index());
        result
    }

    fn run_session(&self, kind: SessionKind) -> FuzzResult {
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(kind.index() as u64));
        let mut model = SessionModel::new();
        let mut handles = Handles::default();
        let mut result = FuzzResult::default();

        for step in 0..self.config.op_count {
            let op = random_op(&mut rng);
            let applied = self.apply(kind, op, &mut handles, &mut result);
            if applied {
                result.ops_applied += 1;
            } else {
                result.ops_skipped += 1;
            }
            if model.apply(op) != applied {
                result.violations.push(format!(
                    "{} step {} ({:?}): engine applied {}, model disagrees",
                    kind, step, op, applied
                ));
            }
            self.check_snapshot(kind, step, op, &model, &mut result);
            if result.violations.len() > 16 {
                break;
            }
        }

        // Tear down whatever is left
        for direction in Direction::BOTH {
            if let Some(handle) = handles.slot(direction).take() {
                if let Err(e) = self.harness.lifecycle().close(handle) {
                    result.violations.push(format!("{} teardown close failed: {}", kind, e));
                }
                model.apply(LifecycleOp::Close(direction));
            }
        }

        let actual = self.harness.counts(kind);
        if actual != model.counts {
            result.violations.push(format!(
                "{} call counts differ: engine {:?}, model {:?}",
                kind, actual, model.counts
            ));
        }
        result.counts.push((kind, actual));
        result
    }

    /// Issue `op` on the engine. False when there was nothing to issue it
    /// on, or the open was refused as busy.
    fn apply(
        &self,
        kind: SessionKind,
        op: LifecycleOp,
        handles: &mut Handles,
        result: &mut FuzzResult,
    ) -> bool {
        let lifecycle = self.harness.lifecycle();
        let direction = op.direction();
        let slot = handles.slot(direction);

        let outcome = match op {
            LifecycleOp::Open(_) => match self.harness.open(stream_name_for(kind), direction) {
                Ok((handle, _queue)) => {
                    if slot.replace(handle).is_some() {
                        result
                            .violations
                            .push(format!("{} {} opened twice", kind, direction));
                    }
                    Ok(())
                }
                Err(VoiceError::PathBusy { .. }) if slot.is_some() => return false,
                Err(e) => Err(e),
            },
            LifecycleOp::Close(_) => match slot.take() {
                Some(handle) => lifecycle.close(handle),
                None => return false,
            },
            LifecycleOp::Prepare(_) => match slot.as_ref() {
                Some(handle) => lifecycle.prepare(handle),
                None => return false,
            },
            LifecycleOp::Trigger(_, event) => match slot.as_ref() {
                Some(handle) => lifecycle.trigger(handle, event),
                None => return false,
            },
        };

        if let Err(e) = outcome {
            result.violations.push(format!("{} {:?} failed: {}", kind, op, e));
        }
        true
    }

    fn check_snapshot(
        &self,
        kind: SessionKind,
        step: usize,
        op: LifecycleOp,
        model: &SessionModel,
        result: &mut FuzzResult,
    ) {
        let snapshot = self.harness.snapshot(kind);
        let open_paths = u8::from(snapshot.playback_open) + u8::from(snapshot.capture_open);
        if snapshot.open_count != open_paths {
            result.violations.push(format!(
                "{} step {} ({:?}): open_count {} with {} paths",
                kind, step, op, snapshot.open_count, open_paths
            ));
        }
        if snapshot.open_count != model.open_count()
            || snapshot.playback_open != model.playback_open
            || snapshot.capture_open != model.capture_open
            || snapshot.playback_active != model.playback_active
            || snapshot.capture_active != model.capture_active
        {
            result.violations.push(format!(
                "{} step {} ({:?}): engine {:?}, model {:?}",
                kind, step, op, snapshot, model
            ));
        }
    }
}

/// Fuzz with the light preset
pub fn fuzz_light() -> FuzzResult {
    LifecycleFuzzer::new(FuzzerConfig::light()).run()
}

/// Fuzz every session kind concurrently
pub fn fuzz_heavy() -> FuzzResult {
    LifecycleFuzzer::new(FuzzerConfig::heavy()).run()
}
