//! Lifecycle events and their subscribers
//!
//! Every subscriber owns two bounded queues: one for the per-tick presence
//! events (`Receiving`/`NoSignal`) and one for the signal transitions
//! (`Started`/`Stopped`). A consumer that stops draining presence events
//! still finds every transition waiting in its own queue.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timecode::Timecode;

/// Kind of lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncEventKind {
    /// First decoded frame after the signal was absent
    Started,
    /// Decode timeout: the signal is gone
    Stopped,
    /// Per tick while the signal is present
    Receiving,
    /// Per tick while the signal is absent
    NoSignal,
}

impl SyncEventKind {
    /// Whether this is a signal transition rather than a per-tick report
    pub fn is_transition(self) -> bool {
        matches!(self, SyncEventKind::Started | SyncEventKind::Stopped)
    }
}

impl fmt::Display for SyncEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncEventKind::Started => "started",
            SyncEventKind::Stopped => "stopped",
            SyncEventKind::Receiving => "receiving",
            SyncEventKind::NoSignal => "no-signal",
        };
        f.write_str(name)
    }
}

/// Lifecycle event raised by the sync engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncEvent {
    pub kind: SyncEventKind,
    /// Output timecode; for `Started`, the decoded timecode
    pub timecode: Timecode,
    /// Output clock in timecode seconds
    pub output_seconds: f64,
    pub signal_present: bool,
    pub signal_level: f32,
}

/// Receiving side of one subscription
#[derive(Debug, Clone)]
pub struct EventSubscription {
    /// `Started` and `Stopped`
    pub transitions: Receiver<SyncEvent>,
    /// `Receiving` and `NoSignal`, one per tick
    pub presence: Receiver<SyncEvent>,
}

/// Sending side of one subscription; a queue is set to `None` once its
/// receiver is dropped
#[derive(Debug)]
struct Subscriber {
    transitions: Option<Sender<SyncEvent>>,
    presence: Option<Sender<SyncEvent>>,
}

impl Subscriber {
    fn is_closed(&self) -> bool {
        self.transitions.is_none() && self.presence.is_none()
    }
}

/// Fan-out of events to bounded per-subscriber queues
///
/// Events for a full queue are dropped; subscribers whose receivers are all
/// gone are removed.
#[derive(Debug)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    capacity: usize,
    dropped: u64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Vec::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&mut self) -> EventSubscription {
        let (transitions_tx, transitions_rx) = bounded(self.capacity);
        let (presence_tx, presence_rx) = bounded(self.capacity);
        self.subscribers.push(Subscriber {
            transitions: Some(transitions_tx),
            presence: Some(presence_tx),
        });
        EventSubscription {
            transitions: transitions_rx,
            presence: presence_rx,
        }
    }

    pub fn publish(&mut self, event: SyncEvent) {
        for subscriber in self.subscribers.iter_mut() {
            let queue = if event.kind.is_transition() {
                &mut subscriber.transitions
            } else {
                &mut subscriber.presence
            };
            let Some(tx) = queue.as_ref() else {
                continue;
            };
            match tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped += 1;
                    tracing::trace!("Subscriber queue full, dropped {} event", event.kind);
                }
                Err(TrySendError::Disconnected(_)) => *queue = None,
            }
        }
        self.subscribers.retain(|subscriber| !subscriber.is_closed());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Events lost to full subscriber queues
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::FrameRate;

    fn event(kind: SyncEventKind) -> SyncEvent {
        SyncEvent {
            kind,
            timecode: Timecode::zero(FrameRate::Fps30),
            output_seconds: 0.0,
            signal_present: false,
            signal_level: 0.0,
        }
    }

    #[test]
    fn test_every_subscriber_receives() {
        let mut bus = EventBus::new(8);
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(event(SyncEventKind::Started));
        bus.publish(event(SyncEventKind::Receiving));

        assert_eq!(a.transitions.try_recv().unwrap().kind, SyncEventKind::Started);
        assert_eq!(b.transitions.try_recv().unwrap().kind, SyncEventKind::Started);
        assert_eq!(a.presence.try_recv().unwrap().kind, SyncEventKind::Receiving);
        assert!(a.transitions.try_recv().is_err());
    }

    #[test]
    fn test_full_presence_queue_drops() {
        let mut bus = EventBus::new(2);
        let sub = bus.subscribe();
        for _ in 0..5 {
            bus.publish(event(SyncEventKind::NoSignal));
        }

        assert_eq!(sub.presence.try_iter().count(), 2);
        assert_eq!(bus.dropped(), 3);
    }

    #[test]
    fn test_transitions_survive_full_presence_queue() {
        let mut bus = EventBus::new(4);
        let sub = bus.subscribe();

        bus.publish(event(SyncEventKind::Started));
        for _ in 0..100 {
            bus.publish(event(SyncEventKind::Receiving));
        }
        bus.publish(event(SyncEventKind::Stopped));

        let kinds: Vec<SyncEventKind> = sub.transitions.try_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![SyncEventKind::Started, SyncEventKind::Stopped]);
    }

    #[test]
    fn test_disconnected_subscribers_are_removed() {
        let mut bus = EventBus::new(2);
        let sub = bus.subscribe();
        let EventSubscription { transitions, presence } = sub;

        drop(presence);
        bus.publish(event(SyncEventKind::NoSignal));
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(event(SyncEventKind::Stopped));
        assert_eq!(transitions.try_recv().unwrap().kind, SyncEventKind::Stopped);

        drop(transitions);
        bus.publish(event(SyncEventKind::Started));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
