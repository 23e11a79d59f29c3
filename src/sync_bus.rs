//! Sequence-numbered broadcast channel shared by the charts of one group.

use crate::data_types::{CachedRange, ChartId, SyncMessage, SyncPayload, ViewportRange};
use crate::subscription::Subscription;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Source of message sequence numbers. Must be strictly increasing.
pub trait SequenceSource {
    fn next_sequence(&self) -> u64;
}

/// Counter starting after a given value.
#[derive(Debug, Default)]
pub struct MonotonicSequence {
    last: Cell<u64>,
}

impl MonotonicSequence {
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: Cell::new(last),
        }
    }
}

impl SequenceSource for MonotonicSequence {
    fn next_sequence(&self) -> u64 {
        let next = self.last.get() + 1;
        self.last.set(next);
        next
    }
}

type Handler = Rc<RefCell<dyn FnMut(&SyncMessage)>>;

struct BusInner {
    sequence: Box<dyn SequenceSource>,
    subscribers: RefCell<Vec<(u64, Handler)>>,
    next_subscriber: Cell<u64>,
    queue: RefCell<VecDeque<SyncMessage>>,
    dispatching: Cell<bool>,
    last_range: RefCell<Option<CachedRange>>,
}

impl BusInner {
    fn remove(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
    }
}

/// Broadcasts [`SyncMessage`]s and holds the "last known range" slot.
///
/// Delivery is synchronous and run-to-completion: a handler that publishes
/// while a message is being delivered gets its message queued behind the
/// current one, so handlers never re-enter.
#[derive(Clone)]
pub struct ViewportSyncBus {
    inner: Rc<BusInner>,
}

impl Default for ViewportSyncBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportSyncBus {
    pub fn new() -> Self {
        Self::with_sequence(MonotonicSequence::default())
    }

    pub fn with_sequence(sequence: impl SequenceSource + 'static) -> Self {
        Self {
            inner: Rc::new(BusInner {
                sequence: Box::new(sequence),
                subscribers: RefCell::new(Vec::new()),
                next_subscriber: Cell::new(0),
                queue: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                last_range: RefCell::new(None),
            }),
        }
    }

    /// Stamps `payload` with the next sequence number and broadcasts it.
    /// Range changes also refresh the cache.
    pub fn publish(&self, source_id: &ChartId, payload: SyncPayload) -> u64 {
        let sequence = self.inner.sequence.next_sequence();
        if let SyncPayload::RangeChange(range) = &payload {
            *self.inner.last_range.borrow_mut() = Some(CachedRange {
                range: *range,
                source_id: source_id.clone(),
                sequence,
            });
        }
        let message = SyncMessage {
            source_id: source_id.clone(),
            sequence,
            payload,
        };
        trace!(source = %message.source_id, sequence, kind = ?message.kind(), "publish");
        self.inner.queue.borrow_mut().push_back(message);
        self.drain();
        sequence
    }

    fn drain(&self) {
        if self.inner.dispatching.replace(true) {
            return;
        }
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(message) = next else { break };

            let handlers: Vec<(u64, Handler)> = self.inner.subscribers.borrow().clone();
            for (id, handler) in handlers {
                // Skip handlers removed by an earlier handler of this round.
                let still_subscribed = self
                    .inner
                    .subscribers
                    .borrow()
                    .iter()
                    .any(|(sid, _)| *sid == id);
                if !still_subscribed {
                    continue;
                }
                if let Ok(mut handler) = handler.try_borrow_mut() {
                    (&mut *handler)(&message);
                }
            }
        }
        self.inner.dispatching.set(false);
    }

    pub fn subscribe(&self, handler: impl FnMut(&SyncMessage) + 'static) -> Subscription {
        let id = self.inner.next_subscriber.get() + 1;
        self.inner.next_subscriber.set(id);
        let handler: Handler = Rc::new(RefCell::new(handler));
        self.inner.subscribers.borrow_mut().push((id, handler));

        let weak: Weak<BusInner> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(id);
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    pub fn last_range(&self) -> Option<CachedRange> {
        self.inner.last_range.borrow().clone()
    }

    /// Stores a range without broadcasting it. Still consumes a sequence
    /// number so that the cache entry orders against real messages.
    pub fn seed_range(&self, source_id: &ChartId, range: ViewportRange) -> u64 {
        let sequence = self.inner.sequence.next_sequence();
        *self.inner.last_range.borrow_mut() = Some(CachedRange {
            range,
            source_id: source_id.clone(),
            sequence,
        });
        sequence
    }

    pub fn clear_range(&self) {
        self.inner.last_range.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_from_handler_is_queued() {
        let bus = ViewportSyncBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let a = ChartId::from("a");

        let republisher = bus.clone();
        let id = a.clone();
        let _s1 = bus.subscribe(move |msg| {
            if matches!(msg.payload, SyncPayload::RangeRequest) {
                republisher.publish(&id, SyncPayload::CrosshairMove { time: None });
            }
        });
        let log = seen.clone();
        let _s2 = bus.subscribe(move |msg| log.borrow_mut().push(msg.sequence));

        bus.publish(&a, SyncPayload::RangeRequest);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let bus = ViewportSyncBus::new();
        let sub = bus.subscribe(|_| {});
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
