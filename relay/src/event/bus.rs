//! In-process event bus: one producer (the turn worker) and one consumer
//! (whatever is streaming the turn to its caller), decoupled by a
//! `Mutex<VecDeque<Event>>` plus `Condvar`.
//!
//! Grounded on the same "shared deque behind a lock, monotonic counter"
//! shape used for streaming envelopes elsewhere in this codebase, adapted so
//! the consumer can block on `events_live` instead of polling.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use super::envelope::Event;
use super::kind::EventKind;

#[derive(Debug)]
struct Inner {
    queue: Mutex<VecDeque<Event>>,
    condvar: Condvar,
    next_seq: AtomicU64,
    closed: std::sync::atomic::AtomicBool,
}

/// Handle shared between the turn worker (emits) and its consumer (drains).
/// Cloning shares the same underlying queue.
#[derive(Clone, Debug)]
pub struct EventBus {
    inner: Arc<Inner>,
    turn_id: String,
}

impl EventBus {
    pub fn new(turn_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                condvar: Condvar::new(),
                next_seq: AtomicU64::new(1),
                closed: std::sync::atomic::AtomicBool::new(false),
            }),
            turn_id: turn_id.into(),
        }
    }

    /// Enqueues one event kind, stamping it with the next monotonic `seq`
    /// for this turn. `seq` assignment happens inside the same lock as the
    /// enqueue so concurrent producers can't interleave out of order.
    pub fn emit(&self, kind: EventKind) {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
        let event = Event::new(self.turn_id.clone(), seq, kind);
        let mut queue = self.inner.queue.lock().unwrap();
        queue.push_back(event);
        self.inner.condvar.notify_all();
    }

    /// Marks the bus closed; `events_live` returns `None` once it is closed
    /// and drained.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.condvar.notify_all();
    }

    /// Blocks until an event is available, the bus closes with an empty
    /// queue, or `is_done` reports the producer has stopped without closing
    /// (e.g. the worker thread panicked).
    pub fn events_live(&self, is_done: impl Fn() -> bool) -> Option<Event> {
        let mut queue = self.inner.queue.lock().unwrap();
        loop {
            if let Some(event) = queue.pop_front() {
                return Some(event);
            }
            if self.inner.closed.load(Ordering::SeqCst) || is_done() {
                return None;
            }
            let (guard, timeout) = self
                .inner
                .condvar
                .wait_timeout(queue, std::time::Duration::from_millis(50))
                .unwrap();
            queue = guard;
            let _ = timeout;
        }
    }

    /// Non-blocking drain of whatever is currently queued (used after
    /// `close()` to flush remaining events, and in tests).
    pub fn events(&self) -> Vec<Event> {
        let mut queue = self.inner.queue.lock().unwrap();
        queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_assigns_monotonically_increasing_seq_starting_at_one() {
        let bus = EventBus::new("t1");
        bus.emit(EventKind::TurnStart {
            user_text: "hi".into(),
            provider: "scripted".into(),
            models: serde_json::json!({}),
        });
        bus.emit(EventKind::TurnEndOk { duration_ms: 5 });
        let events = bus.events();
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[1].seq, 2);
        assert_eq!(events[0].turn_id, "t1");
    }

    #[test]
    fn events_live_returns_none_once_closed_and_drained() {
        let bus = EventBus::new("t1");
        bus.emit(EventKind::TurnEndOk { duration_ms: 0 });
        bus.close();
        assert!(bus.events_live(|| true).is_some());
        assert!(bus.events_live(|| true).is_none());
    }

    #[test]
    fn events_live_blocks_until_emitted_from_another_thread() {
        let bus = EventBus::new("t1");
        let bus2 = bus.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            bus2.emit(EventKind::TurnEndOk { duration_ms: 1 });
            bus2.close();
        });
        let event = bus
            .events_live(|| false)
            .expect("event eventually emitted");
        assert_eq!(event.kind.name(), "turn_end_ok");
        handle.join().unwrap();
    }
}
