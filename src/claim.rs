//! Claim resolver: serialises mutually-exclusive intents across a short
//! window so that racing agents converge on one winner deterministically
//! (§4.3). One mutex guards active claims, pending claims, and the callback
//! table — traffic here is low-volume and latency-sensitive, not
//! high-throughput, so coarse locking is the right tradeoff.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::ids::{EntityId, TimeMs};
use crate::message::{ClaimPriority, Message, MessageKind};

/// Identifies a claimable resource: a kind of exclusive action on a target,
/// keyed additionally by spell-or-aura id (e.g. "interrupt this cast" keys
/// on the spell id; "dispel this aura" keys on the aura id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClaimKey {
    pub kind: MessageKind,
    pub target: EntityId,
    pub spell_or_aura_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Granted,
    Denied,
    Pending,
    Expired,
    Released,
}

/// Callback invoked when a claim's status resolves asynchronously (override,
/// window close, or expiry). The resolver never blocks on this — a caller
/// supplying a slow callback violates the <1ms contract the same way a
/// router subscriber would.
pub trait ClaimCallback: Send + Sync {
    fn on_resolved(&self, claimer: EntityId, key: ClaimKey, status: ClaimStatus);
}

struct ActiveClaim {
    claimer: EntityId,
    group: EntityId,
    priority: ClaimPriority,
    submitted_at: TimeMs,
    expiry: TimeMs,
    message_id: u64,
    callback: Option<std::sync::Arc<dyn ClaimCallback>>,
}

struct PendingClaim {
    claimer: EntityId,
    group: EntityId,
    priority: ClaimPriority,
    arrived_at: TimeMs,
    message_id: u64,
    callback: Option<std::sync::Arc<dyn ClaimCallback>>,
}

#[derive(Default)]
struct Tables {
    active: HashMap<ClaimKey, ActiveClaim>,
    pending: HashMap<ClaimKey, Vec<PendingClaim>>,
}

pub struct ClaimResolver {
    claim_window_ms: u64,
    tables: Mutex<Tables>,
}

impl ClaimResolver {
    pub fn new(claim_window_ms: u64) -> Self {
        Self { claim_window_ms, tables: Mutex::new(Tables::default()) }
    }

    /// Submit a claim message. Callable from any thread.
    pub fn submit(
        &self,
        msg: &Message,
        now: TimeMs,
        callback: Option<std::sync::Arc<dyn ClaimCallback>>,
    ) -> ClaimStatus {
        let Some(key) = msg.claim_key() else {
            return ClaimStatus::Denied;
        };
        let mut tables = self.tables.lock().unwrap();

        if let Some(active) = tables.active.get(&key) {
            if active.expiry > now {
                if msg.claim_priority < active.priority {
                    // Strictly higher priority (lower number): override.
                    let denied_cb = tables.active.remove(&key).unwrap();
                    if let Some(cb) = denied_cb.callback {
                        cb.on_resolved(denied_cb.claimer, key, ClaimStatus::Denied);
                    }
                    tables.active.insert(
                        key,
                        ActiveClaim {
                            claimer: msg.sender,
                            group: msg.group,
                            priority: msg.claim_priority,
                            submitted_at: now,
                            expiry: msg.expiry,
                            message_id: msg.id,
                            callback,
                        },
                    );
                    return ClaimStatus::Granted;
                }
                return ClaimStatus::Denied;
            }
            // Expired active claim: fall through to pending-queue path below
            // by removing it first so a fresh window can open.
            tables.active.remove(&key);
        }

        tables.pending.entry(key).or_default().push(PendingClaim {
            claimer: msg.sender,
            group: msg.group,
            priority: msg.claim_priority,
            arrived_at: now,
            message_id: msg.id,
            callback,
        });
        ClaimStatus::Pending
    }

    pub fn status(&self, claimer: EntityId, key: ClaimKey) -> ClaimStatus {
        let tables = self.tables.lock().unwrap();
        if let Some(active) = tables.active.get(&key) {
            if active.claimer == claimer {
                return ClaimStatus::Granted;
            }
        }
        if let Some(list) = tables.pending.get(&key) {
            if list.iter().any(|p| p.claimer == claimer) {
                return ClaimStatus::Pending;
            }
        }
        ClaimStatus::Denied
    }

    pub fn is_claimed(&self, key: ClaimKey) -> bool {
        self.tables.lock().unwrap().active.contains_key(&key)
    }

    pub fn current_claimer(&self, key: ClaimKey) -> Option<EntityId> {
        self.tables.lock().unwrap().active.get(&key).map(|a| a.claimer)
    }

    pub fn release(&self, claimer: EntityId, key: ClaimKey) {
        let mut tables = self.tables.lock().unwrap();
        if tables.active.get(&key).map(|a| a.claimer) == Some(claimer) {
            if let Some(active) = tables.active.remove(&key) {
                if let Some(cb) = active.callback {
                    cb.on_resolved(claimer, key, ClaimStatus::Released);
                }
            }
        }
        if let Some(list) = tables.pending.get_mut(&key) {
            list.retain(|p| p.claimer != claimer);
        }
    }

    pub fn release_all(&self, claimer: EntityId) {
        let mut tables = self.tables.lock().unwrap();
        let keys: Vec<ClaimKey> = tables
            .active
            .iter()
            .filter(|(_, a)| a.claimer == claimer)
            .map(|(k, _)| *k)
            .collect();
        for key in keys {
            if let Some(active) = tables.active.remove(&key) {
                if let Some(cb) = active.callback {
                    cb.on_resolved(claimer, key, ClaimStatus::Released);
                }
            }
        }
        for list in tables.pending.values_mut() {
            list.retain(|p| p.claimer != claimer);
        }
    }

    /// Resolve any pending key whose oldest arrival is at least
    /// `claim_window_ms` old. Winner: highest priority, ties by earliest
    /// arrival.
    pub fn process_pending(&self, now: TimeMs) {
        let mut tables = self.tables.lock().unwrap();
        let ready_keys: Vec<ClaimKey> = tables
            .pending
            .iter()
            .filter_map(|(k, list)| {
                let oldest = list.iter().map(|p| p.arrived_at).min()?;
                (oldest + self.claim_window_ms <= now).then_some(*k)
            })
            .collect();

        for key in ready_keys {
            let mut list = tables.pending.remove(&key).unwrap();
            if list.is_empty() {
                continue;
            }
            list.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.arrived_at.cmp(&b.arrived_at)));
            let winner = list.remove(0);
            let winner_expiry = now + 200; // claims always resolve to a fresh 200ms window
            if let Some(cb) = &winner.callback {
                cb.on_resolved(winner.claimer, key, ClaimStatus::Granted);
            }
            for loser in &list {
                if let Some(cb) = &loser.callback {
                    cb.on_resolved(loser.claimer, key, ClaimStatus::Denied);
                }
            }
            tables.active.insert(
                key,
                ActiveClaim {
                    claimer: winner.claimer,
                    group: winner.group,
                    priority: winner.priority,
                    submitted_at: now,
                    expiry: winner_expiry,
                    message_id: winner.message_id,
                    callback: winner.callback,
                },
            );
        }
    }

    /// Drop active claims past expiry, notifying `Expired`.
    pub fn cleanup_expired(&self, now: TimeMs) {
        let mut tables = self.tables.lock().unwrap();
        let expired: Vec<ClaimKey> = tables
            .active
            .iter()
            .filter(|(_, a)| a.expiry <= now)
            .map(|(k, _)| *k)
            .collect();
        for key in expired {
            if let Some(active) = tables.active.remove(&key) {
                if let Some(cb) = active.callback {
                    cb.on_resolved(active.claimer, key, ClaimStatus::Expired);
                }
            }
        }
    }
}
