//! Mixer event queue - per capture path detection event buffer
//!
//! The voice service thread delivers events with `deliver`; control-plane
//! readers drain them with `pop` or await them with `next`. The queue is
//! bounded and refuses events while its path is closed.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use vpcm_core::{DetectionEventEnvelope, DetectionSink, VoiceError, VoiceResult};

struct QueueInner {
    events: VecDeque<DetectionEventEnvelope>,
    attached: bool,
    /// Events refused because the queue was full or detached
    dropped: u64,
}

/// Bounded detection event queue for one capture path
pub struct MixerEventQueue {
    inner: Mutex<QueueInner>,
    capacity: usize,
    wake: Notify,
}

impl MixerEventQueue {
    pub fn new(capacity: usize) -> Self {
        MixerEventQueue {
            inner: Mutex::new(QueueInner {
                events: VecDeque::with_capacity(capacity),
                attached: false,
                dropped: 0,
            }),
            capacity,
            wake: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().events.is_empty()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().attached
    }

    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }

    /// Take the oldest event without waiting
    pub fn pop(&self) -> Option<DetectionEventEnvelope> {
        self.inner.lock().events.pop_front()
    }

    /// Wait for the next event. None once the queue is detached and drained.
    pub async fn next(&self) -> Option<DetectionEventEnvelope> {
        loop {
            // Register before checking so a wakeup in between is not lost
            let notified = self.wake.notified();
            {
                let mut inner = self.inner.lock();
                if let Some(event) = inner.events.pop_front() {
                    return Some(event);
                }
                if !inner.attached {
                    return None;
                }
            }
            notified.await;
        }
    }
}

impl DetectionSink for MixerEventQueue {
    fn attach(&self) {
        let mut inner = self.inner.lock();
        inner.attached = true;
        inner.events.clear();
    }

    fn detach(&self) {
        {
            let mut inner = self.inner.lock();
            inner.attached = false;
            inner.events.clear();
        }
        self.wake.notify_waiters();
    }

    fn deliver(&self, envelope: DetectionEventEnvelope) -> VoiceResult<()> {
        {
            let mut inner = self.inner.lock();
            if !inner.attached {
                inner.dropped += 1;
                return Err(VoiceError::Delivery("event queue is detached".to_string()));
            }
            if inner.events.len() >= self.capacity {
                inner.dropped += 1;
                return Err(VoiceError::Delivery(format!(
                    "event queue full ({} events)",
                    self.capacity
                )));
            }
            inner.events.push_back(envelope);
        }
        self.wake.notify_one();
        Ok(())
    }
}
