//! Combat event router: the single process-wide hub fanning game events out
//! to subscribers with bitmask filtering.
//!
//! ## Data access
//! - Reads/writes subscriber tables under `subscriptions: RwLock<...>` — a
//!   reader lock during `dispatch`, a writer lock during `subscribe`/`unsubscribe`.
//! - `queue` takes a short `Mutex` on the pending buffer; `drain` (tick
//!   thread only) drains it without holding that mutex during fan-out.
//! - Stats are relaxed-ordering atomics, advisory only.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use crate::event::{CombatEvent, EventKindMask};
use crate::ids::EntityId;

/// Overflow policy applied by `queue` once the bound is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    DropOldest,
    DropNewest,
}

/// Anything that wants combat events. `subscriber_id` must be stable and
/// unique for the lifetime of the registration (the router uses it only to
/// support `unsubscribe`).
pub trait EventSubscriber: Send + Sync {
    fn subscriber_id(&self) -> EntityId;

    /// Dispatch priority: higher values are notified first within a kind.
    fn priority(&self) -> i32 {
        0
    }

    /// Fine-grained filter evaluated after the kind-mask check. Default
    /// accepts everything the subscription mask already allows.
    fn should_receive(&self, _event: &CombatEvent) -> bool {
        true
    }

    /// Must return in well under 1ms (§5 Suspension) — heavy work should be
    /// deferred by queuing an internal follow-up message instead of doing it
    /// here.
    fn on_event(&self, event: &CombatEvent);
}

struct Registration {
    subscriber_id: EntityId,
    priority: i32,
    kinds: EventKindMask,
    subscriber: std::sync::Arc<dyn EventSubscriber>,
}

/// Lock-free dispatch counters, one slot per bit position, plus process-wide
/// totals. Advisory — reads may race a concurrent dispatch.
#[derive(Default)]
pub struct RouterStats {
    per_kind_dispatched: [AtomicU64; 32],
    total_dispatched: AtomicU64,
    total_queued: AtomicU64,
    total_dropped: AtomicU64,
}

impl RouterStats {
    fn record_dispatch(&self, kind: EventKindMask) {
        self.total_dispatched.fetch_add(1, Ordering::Relaxed);
        for bit in kind.iter_bits() {
            self.per_kind_dispatched[bit as usize].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dispatched_for_bit(&self, bit: u32) -> u64 {
        self.per_kind_dispatched[bit as usize].load(Ordering::Relaxed)
    }

    pub fn total_dispatched(&self) -> u64 {
        self.total_dispatched.load(Ordering::Relaxed)
    }

    pub fn total_queued(&self) -> u64 {
        self.total_queued.load(Ordering::Relaxed)
    }

    pub fn total_dropped(&self) -> u64 {
        self.total_dropped.load(Ordering::Relaxed)
    }
}

/// The router itself. Construct one per `CoordinationCore`; it is `Send +
/// Sync` and meant to be shared behind an `Arc`.
pub struct EventRouter {
    max_queue_size: usize,
    overflow_policy: OverflowPolicy,
    subscriptions: RwLock<Vec<Registration>>,
    pending: Mutex<Vec<CombatEvent>>,
    pub stats: RouterStats,
}

impl EventRouter {
    pub fn new(max_queue_size: usize, overflow_policy: OverflowPolicy) -> Self {
        Self {
            max_queue_size,
            overflow_policy,
            subscriptions: RwLock::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            stats: RouterStats::default(),
        }
    }

    /// Register `subscriber` for `kinds`. Re-subscribing the same id merges
    /// masks rather than duplicating the registration.
    pub fn subscribe(&self, subscriber: std::sync::Arc<dyn EventSubscriber>, kinds: EventKindMask) {
        let id = subscriber.subscriber_id();
        let priority = subscriber.priority();
        let mut table = self.subscriptions.write().unwrap();
        if let Some(existing) = table.iter_mut().find(|r| r.subscriber_id == id) {
            existing.kinds |= kinds;
            return;
        }
        table.push(Registration { subscriber_id: id, priority, kinds, subscriber });
        table.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// O(subscribers) removal — a router is expected to have at most a few
    /// hundred live subscribers, so a linear scan under the writer lock is
    /// simpler and fast enough.
    pub fn unsubscribe(&self, subscriber_id: EntityId) {
        let mut table = self.subscriptions.write().unwrap();
        table.retain(|r| r.subscriber_id != subscriber_id);
    }

    /// Synchronous fan-out on the caller's thread. Tick-thread only (or any
    /// thread for `IMMEDIATE`-class events, per §5).
    pub fn dispatch(&self, event: CombatEvent) {
        self.stats.record_dispatch(event.kind);
        let table = self.subscriptions.read().unwrap();
        for reg in table.iter() {
            if !reg.kinds.intersects(event.kind) {
                continue;
            }
            if !reg.subscriber.should_receive(&event) {
                continue;
            }
            let subscriber = &reg.subscriber;
            let result = catch_unwind(AssertUnwindSafe(|| subscriber.on_event(&event)));
            if result.is_err() {
                log::error!("subscriber {} panicked handling event kind {:?}", reg.subscriber_id, event.kind);
            }
        }
    }

    /// Thread-safe enqueue. Subject to `max_queue_size` and the configured
    /// overflow policy.
    pub fn queue(&self, event: CombatEvent) {
        let mut pending = self.pending.lock().unwrap();
        if pending.len() >= self.max_queue_size {
            self.stats.total_dropped.fetch_add(1, Ordering::Relaxed);
            match self.overflow_policy {
                OverflowPolicy::DropNewest => {
                    log::warn!("router queue full, dropping newest event");
                    return;
                }
                OverflowPolicy::DropOldest => {
                    log::warn!("router queue full, dropping oldest event");
                    pending.remove(0);
                }
            }
        }
        self.stats.total_queued.fetch_add(1, Ordering::Relaxed);
        pending.push(event);
    }

    /// Processes all queued events in FIFO order on the tick thread. Events
    /// are drained out of the mutex first so dispatch never holds it.
    pub fn drain(&self) {
        let events = {
            let mut pending = self.pending.lock().unwrap();
            std::mem::take(&mut *pending)
        };
        for event in events {
            self.dispatch(event);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().unwrap().len()
    }
}

#[derive(Default)]
struct CountingSubscriber {
    id: EntityId,
    priority: i32,
    count: AtomicUsize,
}

impl EventSubscriber for CountingSubscriber {
    fn subscriber_id(&self) -> EntityId {
        self.id
    }
    fn priority(&self) -> i32 {
        self.priority
    }
    fn on_event(&self, _event: &CombatEvent) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
