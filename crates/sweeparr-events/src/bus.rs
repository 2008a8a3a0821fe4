//! In-process broadcast bus with a bounded replay journal.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};

/// Live feed handed to subscribers.
pub type EventStream = BroadcastStream<EventEnvelope>;

/// Ids and retained envelopes share one lock so the journal stays ordered.
struct Journal {
    next_id: EventId,
    retained: VecDeque<EventEnvelope>,
}

/// Cloneable handle to the shared bus.
#[derive(Clone)]
pub struct EventBus {
    live: broadcast::Sender<EventEnvelope>,
    journal: Arc<Mutex<Journal>>,
    capacity: usize,
}

impl EventBus {
    /// Bus retaining the last `capacity` envelopes (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (live, _) = broadcast::channel(capacity);
        Self {
            live,
            journal: Arc::new(Mutex::new(Journal {
                next_id: 1,
                retained: VecDeque::with_capacity(capacity),
            })),
            capacity,
        }
    }

    /// Bus retaining [`DEFAULT_REPLAY_CAPACITY`] envelopes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Stream of envelopes published after this call.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.live.subscribe())
    }

    /// Stamp `event`, retain it, and fan it out. Returns the assigned id.
    pub fn publish(&self, event: Event) -> EventId {
        let envelope = {
            let mut journal = self.lock();
            let envelope = EventEnvelope {
                id: journal.next_id,
                timestamp: Utc::now(),
                event,
            };
            journal.next_id = journal.next_id.saturating_add(1);
            if journal.retained.len() >= self.capacity {
                journal.retained.pop_front();
            }
            journal.retained.push_back(envelope.clone());
            envelope
        };
        let id = envelope.id;
        // No receivers is fine.
        let _ = self.live.send(envelope);
        id
    }

    /// Retained envelopes with an id greater than `after`, oldest first.
    #[must_use]
    pub fn backlog_since(&self, after: EventId) -> Vec<EventEnvelope> {
        self.lock()
            .retained
            .iter()
            .skip_while(|envelope| envelope.id <= after)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;

    fn search(items: usize) -> Event {
        Event::SearchTriggered {
            instance: "sonarr".into(),
            items,
        }
    }

    #[test]
    fn ids_increase_and_backlog_skips_seen() {
        let bus = EventBus::with_capacity(8);
        let ids: Vec<_> = (1..=3).map(|items| bus.publish(search(items))).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let backlog = bus.backlog_since(1);
        assert_eq!(
            backlog.iter().map(|envelope| envelope.id).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert!(bus.backlog_since(3).is_empty());
    }

    #[test]
    fn journal_keeps_only_newest() {
        let bus = EventBus::with_capacity(0);
        bus.publish(search(1));
        bus.publish(Event::HealthChanged {
            degraded: vec!["deluge".into()],
        });
        let backlog = bus.backlog_since(0);
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].id, 2);
    }

    #[tokio::test]
    async fn subscribers_see_later_events_only() {
        let bus = EventBus::new();
        bus.publish(search(1));
        let mut stream = bus.subscribe();
        let id = bus.publish(Event::FilesBlocked {
            hash: "abc".into(),
            name: "demo".into(),
            blocked: 2,
        });

        let envelope = stream
            .next()
            .await
            .expect("stream open")
            .expect("not lagged");
        assert_eq!(envelope.id, id);
        assert!(matches!(envelope.event, Event::FilesBlocked { blocked: 2, .. }));
    }
}
