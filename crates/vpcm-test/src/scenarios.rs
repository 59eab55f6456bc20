//! End-to-end scenarios over a probed platform

use vpcm_core::{CallId, ServiceOp, SessionKind, TriggerEvent, TtyMode, VoiceResult};

use crate::{CallCounts, VoiceTestHarness};

/// Full duplex call on the primary session: open, prepare, close.
/// Returns the call control counts and the final open count.
pub fn primary_full_duplex() -> VoiceResult<(CallCounts, u8)> {
    let harness = VoiceTestHarness::new();
    let duplex = harness.start_duplex("CS-Voice")?;
    harness.close_duplex(duplex)?;
    let snapshot = harness.snapshot(SessionKind::Primary);
    Ok((harness.counts(SessionKind::Primary), snapshot.open_count))
}

/// Hold and resume a running call from the playback side
pub fn hold_and_resume(stream_name: &str) -> VoiceResult<CallCounts> {
    let harness = VoiceTestHarness::new();
    let kind = SessionKind::from_stream_name(stream_name);
    let duplex = harness.start_duplex(stream_name)?;

    let lifecycle = harness.lifecycle();
    lifecycle.trigger(&duplex.playback, TriggerEvent::PausePush)?;
    lifecycle.trigger(&duplex.playback, TriggerEvent::PauseRelease)?;
    lifecycle.trigger(&duplex.capture, TriggerEvent::Suspend)?;
    lifecycle.trigger(&duplex.capture, TriggerEvent::Resume)?;
    harness.close_duplex(duplex)?;
    Ok(harness.counts(kind))
}

/// Set TTY VCO mode and report the call ids that received it
pub fn tty_vco_broadcast() -> VoiceResult<Vec<CallId>> {
    let harness = VoiceTestHarness::new();
    harness.controls().set_tty_mode(TtyMode::Vco.index())?;
    Ok(harness
        .service()
        .calls_of(ServiceOp::TtyMode)
        .iter()
        .filter_map(|call| call.call_id())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vpcm_core::{Direction, ErrorClass, RelayOutcome, ServiceCall, VoiceError};
    use vpcm_session::SessionState;

    #[test]
    fn test_primary_full_duplex() {
        let (counts, open_count) = primary_full_duplex().unwrap();
        assert_eq!(
            counts,
            CallCounts {
                starts: 1,
                ends: 1,
                ..Default::default()
            }
        );
        assert_eq!(open_count, 0);
    }

    #[test]
    fn test_hold_and_resume() {
        let counts = hold_and_resume("VoiceMMode2").unwrap();
        assert_eq!(
            counts,
            CallCounts {
                starts: 1,
                resumes: 2,
                standbys: 2,
                ends: 1
            }
        );
    }

    #[test]
    fn test_tty_vco_reaches_six_sessions() {
        let ids = tty_vco_broadcast().unwrap();
        let expected: Vec<_> = SessionKind::TTY_KINDS
            .iter()
            .map(|kind| kind.well_known_call_id())
            .collect();
        assert_eq!(ids, expected);
        assert!(!ids.contains(&CallId::QCHAT));
    }

    #[test]
    fn test_end_fires_regardless_of_open_count() {
        let harness = VoiceTestHarness::new();
        let duplex = harness.start_duplex("Voice2").unwrap();
        let lifecycle = harness.lifecycle();

        // Both directions inactive while both stay open, then one closes
        lifecycle.trigger(&duplex.capture, TriggerEvent::Suspend).unwrap();
        lifecycle.trigger(&duplex.playback, TriggerEvent::Suspend).unwrap();
        lifecycle.close(duplex.playback).unwrap();
        assert_eq!(harness.counts(SessionKind::Secondary).ends, 1);
        assert_eq!(harness.snapshot(SessionKind::Secondary).open_count, 1);

        // The other close owes nothing more
        lifecycle.close(duplex.capture).unwrap();
        assert_eq!(harness.counts(SessionKind::Secondary).ends, 1);
    }

    #[test]
    fn test_reactivated_path_ends_again_in_engine_and_model() {
        let harness = VoiceTestHarness::new();
        let lifecycle = harness.lifecycle();
        let mut model = crate::SessionModel::new();

        let (capture, _queue) = harness.open("VoLTE", Direction::Capture).unwrap();
        let (playback, _playback_queue) = harness.open("VoLTE", Direction::Playback).unwrap();
        model.apply(crate::LifecycleOp::Open(Direction::Capture));
        model.apply(crate::LifecycleOp::Open(Direction::Playback));

        lifecycle.close(playback).unwrap();
        model.apply(crate::LifecycleOp::Close(Direction::Playback));
        lifecycle.prepare(&capture).unwrap();
        model.apply(crate::LifecycleOp::Prepare(Direction::Capture));
        lifecycle.close(capture).unwrap();
        model.apply(crate::LifecycleOp::Close(Direction::Capture));

        let counts = harness.counts(SessionKind::CarrierVoLTE);
        assert_eq!(counts.ends, 2);
        assert_eq!(counts, model.counts);
    }

    #[test]
    fn test_half_open_resume_never_starts() {
        let harness = VoiceTestHarness::new();
        let (capture, _queue) = harness.open("QCHAT", Direction::Capture).unwrap();
        harness.lifecycle().prepare(&capture).unwrap();
        harness
            .lifecycle()
            .trigger(&capture, TriggerEvent::PauseRelease)
            .unwrap();
        assert_eq!(harness.snapshot(SessionKind::Chat).state, SessionState::HalfOpen);
        assert_eq!(harness.counts(SessionKind::Chat), CallCounts::default());
    }

    #[test]
    fn test_no_rollback_on_resume_failure() {
        let harness = VoiceTestHarness::new();
        let duplex = harness.start_duplex("CS-Voice").unwrap();
        let lifecycle = harness.lifecycle();

        lifecycle.trigger(&duplex.capture, TriggerEvent::PausePush).unwrap();
        harness.service().fail(ServiceOp::Resume);
        let err = lifecycle
            .trigger(&duplex.capture, TriggerEvent::PauseRelease)
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::ExternalService);

        let snapshot = harness.snapshot(SessionKind::Primary);
        assert!(snapshot.capture_active && snapshot.playback_active);
        assert!(harness.service().is_on_standby(CallId::VOICE));
    }

    #[test]
    fn test_detection_without_capture_path() {
        let harness = VoiceTestHarness::new();
        let (_playback, _queue) = harness.open("VoLTE", Direction::Playback).unwrap();

        let err = harness
            .controls()
            .register_detection_callback(CallId::VOLTE, 1)
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Precondition);
        assert!(harness.service().calls().is_empty());
    }

    #[test]
    fn test_relay_after_capture_close() {
        let harness = VoiceTestHarness::new();
        let duplex = harness.start_duplex("VoWLAN").unwrap();
        harness
            .controls()
            .register_detection_callback(CallId::VOWLAN, 1)
            .unwrap();

        let service = harness.service();
        assert_eq!(
            service.emit_detection(CallId::VOWLAN, Some(&[1, 2, 3, 4])),
            Some(RelayOutcome::Delivered)
        );
        assert_eq!(
            service.emit_detection(CallId::VOWLAN, None),
            Some(RelayOutcome::MissingPayload)
        );
        assert_eq!(
            service.emit_detection(CallId::VOWLAN, Some(&[1, 2])),
            Some(RelayOutcome::ShortPayload)
        );
        assert_eq!(duplex.capture_queue.len(), 1);
        assert!(duplex.playback_queue.is_empty());

        let capture_queue = duplex.capture_queue.clone();
        harness.close_duplex(duplex).unwrap();
        assert_eq!(
            service.emit_detection(CallId::VOWLAN, Some(&[5, 6, 7, 8])),
            Some(RelayOutcome::MissingConsumer)
        );
        assert!(capture_queue.is_empty());
    }

    #[test]
    fn test_relay_delivery_failure_is_swallowed() {
        let harness = VoiceTestHarness::with_config(vpcm_runtime::PlatformConfig {
            detection_queue_depth: 1,
            ..Default::default()
        });
        let (_capture, queue) = harness.open("CS-Voice", Direction::Capture).unwrap();
        harness
            .controls()
            .register_detection_callback(CallId::VOICE, 1)
            .unwrap();

        let service = harness.service();
        assert_eq!(
            service.emit_detection(CallId::VOICE, Some(&[1, 0, 2, 0])),
            Some(RelayOutcome::Delivered)
        );
        assert_eq!(
            service.emit_detection(CallId::VOICE, Some(&[3, 0, 4, 0])),
            Some(RelayOutcome::DeliveryFailed)
        );
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn test_controls_independent_of_lifecycle() {
        let harness = VoiceTestHarness::new();
        let controls = harness.controls();
        controls
            .put("Voice Rx Gain", &[3, i64::from(CallId::VOICEMMODE1.0), 40])
            .unwrap();
        controls
            .put("Voice Tx Device Mute", &[1, i64::from(CallId::VOICEMMODE1.0), 5001])
            .unwrap_err();
        assert_eq!(
            harness.service().calls(),
            vec![ServiceCall::RxVolume {
                call_id: CallId::VOICEMMODE1,
                volume: 3,
                ramp_ms: 40
            }]
        );
        assert_eq!(harness.snapshot(SessionKind::MultiMode1).state, SessionState::Idle);
    }

    #[test]
    fn test_local_call_hold_uses_session_id() {
        let harness = VoiceTestHarness::new();
        let (playback, _queue) = harness.open("Voice2", Direction::Playback).unwrap();
        harness.lifecycle().set_local_call_hold_raw(&playback, 1).unwrap();
        harness.lifecycle().set_local_call_hold_raw(&playback, 2).unwrap();
        assert!(matches!(
            harness.lifecycle().set_local_call_hold_raw(&playback, 0),
            Err(VoiceError::InvalidArgument { .. })
        ));
        assert_eq!(harness.service().count_for(ServiceOp::Lch, CallId::VOICE2), 2);
    }

    #[tokio::test]
    async fn test_detection_awaited_from_queue() {
        let harness = VoiceTestHarness::new();
        let duplex = harness.start_duplex("CS-Voice").unwrap();
        harness
            .controls()
            .register_detection_callback(CallId::VOICE, 1)
            .unwrap();

        let service = harness.service().clone();
        let emitter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            service.emit_detection(CallId::VOICE, Some(&[0x97, 0x02, 0xB9, 0x04]))
        });

        let event = tokio::time::timeout(Duration::from_secs(5), duplex.capture_queue.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.payload, [0x97, 0x02, 0xB9, 0x04]);
        assert_eq!(&event.encode()[..8], &[0u8, 0, 0, 0, 4, 0, 0, 0]);
        assert_eq!(emitter.join().unwrap(), Some(RelayOutcome::Delivered));

        harness.close_duplex(duplex).unwrap();
    }

    mod properties {
        use super::*;
        use crate::{LifecycleOp, SessionModel};
        use proptest::prelude::*;
        use vpcm_session::StreamHandle;

        fn op_strategy() -> impl Strategy<Value = LifecycleOp> {
            let direction = prop_oneof![Just(Direction::Playback), Just(Direction::Capture)];
            let event = prop_oneof![
                Just(TriggerEvent::Stop),
                Just(TriggerEvent::Start),
                Just(TriggerEvent::PausePush),
                Just(TriggerEvent::PauseRelease),
                Just(TriggerEvent::Suspend),
                Just(TriggerEvent::Resume),
            ];
            (0u8..4, direction, event).prop_map(|(op, direction, event)| match op {
                0 => LifecycleOp::Open(direction),
                1 => LifecycleOp::Prepare(direction),
                2 => LifecycleOp::Trigger(direction, event),
                _ => LifecycleOp::Close(direction),
            })
        }

        proptest! {
            #[test]
            fn prop_engine_matches_model(ops in proptest::collection::vec(op_strategy(), 0..80)) {
                let harness = VoiceTestHarness::new();
                let lifecycle = harness.lifecycle();
                let mut model = SessionModel::new();
                let mut playback: Option<StreamHandle> = None;
                let mut capture: Option<StreamHandle> = None;

                for op in ops {
                    let slot = match op.direction() {
                        Direction::Playback => &mut playback,
                        Direction::Capture => &mut capture,
                    };
                    if model.apply(op) {
                        match op {
                            LifecycleOp::Open(d) => {
                                let (handle, _queue) = harness.open("VoLTE", d).unwrap();
                                *slot = Some(handle);
                            }
                            LifecycleOp::Prepare(_) => {
                                lifecycle.prepare(slot.as_ref().unwrap()).unwrap();
                            }
                            LifecycleOp::Trigger(_, event) => {
                                lifecycle.trigger(slot.as_ref().unwrap(), event).unwrap();
                            }
                            LifecycleOp::Close(_) => {
                                lifecycle.close(slot.take().unwrap()).unwrap();
                            }
                        }
                    }

                    let snapshot = harness.snapshot(SessionKind::CarrierVoLTE);
                    let paths = u8::from(snapshot.playback_open) + u8::from(snapshot.capture_open);
                    prop_assert_eq!(snapshot.open_count, paths);
                    prop_assert_eq!(snapshot.open_count, model.open_count());
                    prop_assert_eq!(snapshot.playback_active, model.playback_active);
                    prop_assert_eq!(snapshot.capture_active, model.capture_active);
                }

                prop_assert_eq!(harness.counts(SessionKind::CarrierVoLTE), model.counts);
            }

            #[test]
            fn prop_bad_ramps_never_reach_service(
                ramp in prop_oneof![i64::MIN..0i64, 5001i64..i64::MAX],
                mute in 0i64..2
            ) {
                let harness = VoiceTestHarness::new();
                let controls = harness.controls();
                prop_assert!(controls.set_tx_mute(CallId::VOICE, mute, ramp).is_err());
                prop_assert!(controls
                    .set_device_mute(CallId::VOICE, vpcm_core::VolumeDirection::Tx, mute, ramp)
                    .is_err());
                prop_assert!(controls.set_rx_volume(CallId::VOICE, mute, ramp).is_err());
                prop_assert!(harness.service().calls().is_empty());
            }
        }
    }
}
