//! Detection event relay
//!
//! The voice service reports in-band tone detections from its own thread.
//! The relay copies the raw payload into an envelope and hands it to the
//! consumer registered for the session's capture path. The payload is
//! never interpreted here.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::{CallId, VoiceResult};

/// Size of a tone detection payload (two u16 tone frequencies)
pub const DETECTION_PAYLOAD_SIZE: usize = 4;

/// Event tag for stream post-processing events
pub const STREAM_PP_EVENT: u32 = 0;

/// Detection event as delivered to the consumer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectionEventEnvelope {
    pub event_type: u32,
    pub payload: [u8; DETECTION_PAYLOAD_SIZE],
}

impl DetectionEventEnvelope {
    /// Encoded size: tag(4) + length(4) + payload
    pub const WIRE_SIZE: usize = 8 + DETECTION_PAYLOAD_SIZE;

    pub fn new(payload: [u8; DETECTION_PAYLOAD_SIZE]) -> Self {
        DetectionEventEnvelope {
            event_type: STREAM_PP_EVENT,
            payload,
        }
    }

    #[inline]
    pub fn payload_len(&self) -> u32 {
        DETECTION_PAYLOAD_SIZE as u32
    }

    /// Little-endian encoding: tag, payload length, payload
    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0..4].copy_from_slice(&self.event_type.to_le_bytes());
        buf[4..8].copy_from_slice(&self.payload_len().to_le_bytes());
        buf[8..].copy_from_slice(&self.payload);
        buf
    }
}

/// Event delivery interface of a path's control-plane consumer
pub trait DetectionSink: Send + Sync {
    /// The owning path was opened
    fn attach(&self) {}

    /// The owning path was closed.
    ///
    /// A relay may already be inside `deliver` when this runs, so a sink
    /// without its own attached state can still see one late event. The
    /// session layer wraps every consumer in a binding that refuses
    /// deliveries once detached.
    fn detach(&self) {}

    /// Deliver one event
    fn deliver(&self, envelope: DetectionEventEnvelope) -> VoiceResult<()>;
}

/// What happened to one relayed detection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    MissingPayload,
    ShortPayload,
    MissingConsumer,
    DeliveryFailed,
}

/// Relay registered with the voice service for one session.
///
/// Holds the consumer weakly: the capture path owns it, and once that path
/// closes events are dropped instead of reaching a stale consumer.
#[derive(Clone)]
pub struct DetectionRelay {
    call_id: CallId,
    consumer: Weak<dyn DetectionSink>,
}

impl DetectionRelay {
    pub fn new(call_id: CallId, consumer: &Arc<dyn DetectionSink>) -> Self {
        DetectionRelay {
            call_id,
            consumer: Arc::downgrade(consumer),
        }
    }

    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    /// Whether the consumer is still alive
    pub fn is_connected(&self) -> bool {
        self.consumer.strong_count() > 0
    }

    /// Forward a raw detection packet. Never fails towards the caller.
    pub fn relay(&self, packet: Option<&[u8]>) -> RelayOutcome {
        let Some(packet) = packet else {
            tracing::error!(call_id = %self.call_id, "detection packet is missing");
            return RelayOutcome::MissingPayload;
        };

        let Some(consumer) = self.consumer.upgrade() else {
            tracing::error!(call_id = %self.call_id, "detection consumer is gone");
            return RelayOutcome::MissingConsumer;
        };

        let Some(raw) = packet.get(..DETECTION_PAYLOAD_SIZE) else {
            tracing::error!(
                call_id = %self.call_id,
                len = packet.len(),
                "detection packet too short"
            );
            return RelayOutcome::ShortPayload;
        };

        let mut payload = [0u8; DETECTION_PAYLOAD_SIZE];
        payload.copy_from_slice(raw);

        match consumer.deliver(DetectionEventEnvelope::new(payload)) {
            Ok(()) => RelayOutcome::Delivered,
            Err(e) => {
                tracing::error!(call_id = %self.call_id, "failed to deliver detection event: {}", e);
                RelayOutcome::DeliveryFailed
            }
        }
    }
}

impl fmt::Debug for DetectionRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionRelay")
            .field("call_id", &self.call_id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VoiceError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        events: Mutex<Vec<DetectionEventEnvelope>>,
        refuse: bool,
    }

    impl DetectionSink for CollectingSink {
        fn deliver(&self, envelope: DetectionEventEnvelope) -> VoiceResult<()> {
            if self.refuse {
                return Err(VoiceError::Delivery("queue full".into()));
            }
            self.events.lock().push(envelope);
            Ok(())
        }
    }

    fn sink_pair(refuse: bool) -> (Arc<CollectingSink>, Arc<dyn DetectionSink>) {
        let sink = Arc::new(CollectingSink {
            refuse,
            ..Default::default()
        });
        let dyn_sink: Arc<dyn DetectionSink> = sink.clone();
        (sink, dyn_sink)
    }

    #[test]
    fn test_envelope_encoding() {
        let envelope = DetectionEventEnvelope::new([0xB0, 0x02, 0x4D, 0x05]);
        let bytes = envelope.encode();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[4, 0, 0, 0]);
        assert_eq!(&bytes[8..], &[0xB0, 0x02, 0x4D, 0x05]);
    }

    #[test]
    fn test_relay_copies_payload_verbatim() {
        let (sink, dyn_sink) = sink_pair(false);
        let relay = DetectionRelay::new(CallId::VOICE, &dyn_sink);

        // Trailing bytes past the fixed payload are ignored
        let outcome = relay.relay(Some(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(outcome, RelayOutcome::Delivered);

        let events = sink.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, [1, 2, 3, 4]);
        assert_eq!(events[0].event_type, STREAM_PP_EVENT);
    }

    #[test]
    fn test_relay_rejects_missing_payload() {
        let (sink, dyn_sink) = sink_pair(false);
        let relay = DetectionRelay::new(CallId::VOICE, &dyn_sink);

        assert_eq!(relay.relay(None), RelayOutcome::MissingPayload);
        assert_eq!(relay.relay(Some(&[1, 2])), RelayOutcome::ShortPayload);
        assert!(sink.events.lock().is_empty());
    }

    #[test]
    fn test_relay_after_consumer_dropped() {
        let (sink, dyn_sink) = sink_pair(false);
        let relay = DetectionRelay::new(CallId::VOLTE, &dyn_sink);
        drop(dyn_sink);
        drop(sink);

        assert!(!relay.is_connected());
        assert_eq!(relay.relay(Some(&[1, 2, 3, 4])), RelayOutcome::MissingConsumer);
    }

    #[test]
    fn test_relay_swallows_delivery_failure() {
        let (_sink, dyn_sink) = sink_pair(true);
        let relay = DetectionRelay::new(CallId::VOICE, &dyn_sink);

        assert_eq!(relay.relay(Some(&[1, 2, 3, 4])), RelayOutcome::DeliveryFailed);
    }
}
