use log::debug;
use parking_lot::Mutex;
use std::{
    fmt::Debug,
    ops::Range,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crate::components::{grid::GridGeometry, resource::SourceRef};

/// Kinds of event a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Data availability changed.
    Content,
    /// Grid geometry changed.
    Model,
    /// Sources were added or removed.
    Aggregation,
}

/// Sources and output bands affected by a mutation.
#[derive(Debug, Clone)]
pub enum AggregationChange {
    Added {
        sources: Vec<SourceRef>,
        bands: Range<usize>,
    },
    /// `bands` are the indexes dropped, as they were before the removal.
    Removed {
        sources: Vec<SourceRef>,
        bands: Vec<usize>,
    },
}

#[derive(Debug, Clone)]
pub enum AggregateEvent {
    ContentChanged,
    ModelChanged { geometry: Option<GridGeometry> },
    Aggregation(AggregationChange),
}

impl AggregateEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AggregateEvent::ContentChanged => EventKind::Content,
            AggregateEvent::ModelChanged { .. } => EventKind::Model,
            AggregateEvent::Aggregation(_) => EventKind::Aggregation,
        }
    }
}

pub type Listener = Arc<dyn Fn(&AggregateEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    listener: Listener,
}

/// Listeners per [EventKind], called in subscription order.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.subscriptions.lock().len())
            .finish()
    }
}

impl Listeners {
    pub fn subscribe(
        &self,
        kind: EventKind,
        listener: impl Fn(&AggregateEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.lock().push(Subscription {
            id,
            kind,
            listener: Arc::new(listener),
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        before != subscriptions.len()
    }

    /// Delivers each event, in order, to the listeners of its kind.
    ///
    /// Listeners run without the registry lock held, so they may subscribe or unsubscribe.
    pub fn notify(&self, events: &[AggregateEvent]) {
        for event in events {
            let listeners: Vec<Listener> = self
                .subscriptions
                .lock()
                .iter()
                .filter(|subscription| subscription.kind == event.kind())
                .map(|subscription| Arc::clone(&subscription.listener))
                .collect();
            debug!("notifying {} listeners of {:?}", listeners.len(), event.kind());
            for listener in listeners {
                listener(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_follows_kind_and_subscription_order() {
        let listeners = Listeners::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (name, kind) in [
            ("model", EventKind::Model),
            ("content-1", EventKind::Content),
            ("content-2", EventKind::Content),
        ] {
            let log = Arc::clone(&log);
            listeners.subscribe(kind, move |_| log.lock().push(name));
        }
        listeners.notify(&[
            AggregateEvent::ContentChanged,
            AggregateEvent::ModelChanged { geometry: None },
        ]);
        assert_eq!(*log.lock(), vec!["content-1", "content-2", "model"]);
    }

    #[test]
    fn unsubscribed_listener_is_silent() {
        let listeners = Listeners::default();
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let id = listeners.subscribe(EventKind::Content, move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        listeners.notify(&[AggregateEvent::ContentChanged]);
        assert!(listeners.unsubscribe(id));
        assert!(!listeners.unsubscribe(id));
        listeners.notify(&[AggregateEvent::ContentChanged]);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
