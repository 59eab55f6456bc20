//! Cross-session contention checks
//!
//! A call control request parked inside the voice service keeps its own
//! session's record locked. Lifecycle operations and parameter changes on
//! other sessions must still complete.

use std::thread;
use std::time::{Duration, Instant};

use vpcm_core::{CallId, Direction, SessionKind, VoiceResult};

use crate::VoiceTestHarness;

/// Outcome of a contention run
#[derive(Debug, Clone, Default)]
pub struct ContentionReport {
    /// The held session's start was parked while the others ran
    pub held_was_parked: bool,
    /// Sessions that started a call while the held one was parked
    pub started_meanwhile: Vec<SessionKind>,
    /// Parameter change on the held session completed while parked
    pub control_completed: bool,
    /// The held session's call started after release
    pub held_started_after_release: bool,
}

impl ContentionReport {
    pub fn passed(&self, others: usize) -> bool {
        self.held_was_parked
            && self.started_meanwhile.len() == others
            && self.control_completed
            && self.held_started_after_release
    }
}

/// Wait until `cond` holds, polling. False on timeout.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Park `held`'s call start inside the service, then start every kind in
/// `others` and change a parameter on `held` from this thread.
pub fn run_contention(
    harness: &VoiceTestHarness,
    held: SessionKind,
    others: &[SessionKind],
) -> VoiceResult<ContentionReport> {
    let service = harness.service();
    let held_id = harness.call_id(held);
    service.hold_calls(held_id);

    let mut report = ContentionReport::default();

    thread::scope(|scope| -> VoiceResult<()> {
        let held_name = crate::stream_name_for(held);
        let blocked = scope.spawn(move || harness.start_duplex(held_name));

        report.held_was_parked = wait_until(Duration::from_secs(5), || service.parked() == 1);

        let others_result = others.iter().try_for_each(|&kind| {
            let duplex = harness.start_duplex(crate::stream_name_for(kind))?;
            if service.is_running(harness.call_id(kind)) {
                report.started_meanwhile.push(kind);
            }
            harness.close_duplex(duplex)
        });

        report.control_completed = harness.controls().set_tx_mute(held_id, 1, 0).is_ok();

        // Release before propagating anything so the parked thread can finish
        service.release_calls(held_id);
        let held_duplex = match blocked.join() {
            Ok(result) => result?,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        report.held_started_after_release = service.is_running(held_id);
        harness.close_duplex(held_duplex)?;
        others_result
    })?;

    tracing::debug!(?report, "contention run finished");
    Ok(report)
}

/// Park the primary session and run every other kind against it
pub fn contention_all_sessions() -> VoiceResult<ContentionReport> {
    let harness = VoiceTestHarness::new();
    let others: Vec<_> = SessionKind::ALL
        .into_iter()
        .filter(|kind| *kind != SessionKind::Primary)
        .collect();
    run_contention(&harness, SessionKind::Primary, &others)
}

/// Closing a path of a session whose end is parked does not hold up
/// opening the same direction on another session
pub fn parked_end_does_not_block_open() -> VoiceResult<bool> {
    let harness = VoiceTestHarness::new();
    let (capture, _queue) = harness.open("VoLTE", Direction::Capture)?;
    harness.service().hold_calls(CallId::VOLTE);

    thread::scope(|scope| -> VoiceResult<bool> {
        let closing = scope.spawn(|| harness.lifecycle().close(capture));
        let parked = wait_until(Duration::from_secs(5), || harness.service().parked() == 1);

        let opened = harness.open("VoWLAN", Direction::Capture);

        harness.service().release_calls(CallId::VOLTE);
        let closed = match closing.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        let (other, _other_queue) = opened?;
        closed?;
        harness.lifecycle().close(other)?;
        Ok(parked)
    })
}
