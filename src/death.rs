//! Death-safety subsystem (§4.7): avoids a use-after-free-shaped race in the
//! host simulator between its object-publication pass and ordinary deletion
//! of a corpse immediately after death.
//!
//! Two paths:
//! - **Corpse-creation prevention**: agents skip corpse creation entirely,
//!   dropping straight to an alive-ghost posture at the graveyard.
//! - **Safe deletion**: anything else that dies gets a corpse registered with
//!   a reference-counted tracker; removal is denied while a scoped guard
//!   (standing in for the publication pass) holds a reference.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::ids::{EntityId, TimeMs};

/// Hooks the host wires into the death pipeline. All but
/// `on_pre_corpse_remove` are notifications; only that one can veto.
pub trait DeathHooks: Send + Sync {
    fn on_pre_death(&self, _dying: EntityId) {}
    fn on_corpse_created(&self, _corpse: EntityId, _owner: EntityId) {}
    /// Return `false` to deny removal. Default permits.
    fn on_pre_corpse_remove(&self, _corpse: EntityId) -> bool {
        true
    }
    fn on_pre_resurrect(&self, _agent: EntityId) {}
    fn on_post_resurrect(&self, _agent: EntityId) {}
}

/// Outcome of routing a death through the subsystem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeathOutcome {
    /// Corpse creation was skipped; the agent is alive at 1 HP at the
    /// graveyard location given.
    GhostAtGraveyard { agent: EntityId, location: (f32, f32) },
    /// A corpse was created and registered with the tracker.
    CorpseCreated { corpse: EntityId, location: (f32, f32) },
}

struct CorpseRecord {
    owner: EntityId,
    death_location: (f32, f32),
    created_at: TimeMs,
    /// Includes a baseline count of 1 for the corpse's own existence; a
    /// scoped guard adds on top of that. Removal requires this back at 1
    /// (no outstanding guards) and `marked_safe`.
    refcount: u32,
    marked_safe: bool,
}

/// Reference-counted corpse registry gating the pre-remove hook.
pub struct CorpseTracker {
    expiry_ms: u64,
    records: RwLock<HashMap<EntityId, CorpseRecord>>,
}

impl CorpseTracker {
    pub fn new(expiry_minutes: u64) -> Self {
        Self { expiry_ms: expiry_minutes * 60_000, records: RwLock::new(HashMap::new()) }
    }

    pub fn register_corpse(&self, corpse: EntityId, owner: EntityId, death_location: (f32, f32), now: TimeMs) {
        self.records.write().unwrap().insert(
            corpse,
            CorpseRecord { owner, death_location, created_at: now, refcount: 1, marked_safe: true },
        );
    }

    pub fn mark_safe(&self, corpse: EntityId, safe: bool) {
        if let Some(rec) = self.records.write().unwrap().get_mut(&corpse) {
            rec.marked_safe = safe;
        }
    }

    pub fn death_location(&self, corpse: EntityId) -> Option<(f32, f32)> {
        self.records.read().unwrap().get(&corpse).map(|r| r.death_location)
    }

    fn acquire(&self, corpse: EntityId) -> bool {
        if let Some(rec) = self.records.write().unwrap().get_mut(&corpse) {
            rec.refcount += 1;
            true
        } else {
            false
        }
    }

    fn release(&self, corpse: EntityId) {
        if let Some(rec) = self.records.write().unwrap().get_mut(&corpse) {
            rec.refcount = rec.refcount.saturating_sub(1);
        }
    }

    /// Acquire a scoped reference spanning a publication pass. `None` if the
    /// corpse is already gone.
    pub fn scoped_guard(&self, corpse: EntityId) -> Option<CorpseGuard<'_>> {
        self.acquire(corpse).then_some(CorpseGuard { tracker: self, corpse })
    }

    /// The pre-remove hook: denies while a guard is outstanding or the
    /// corpse hasn't been marked safe; otherwise removes the record and
    /// permits the host to delete the object.
    pub fn try_remove(&self, corpse: EntityId) -> bool {
        let mut records = self.records.write().unwrap();
        match records.get(&corpse) {
            Some(rec) if rec.refcount <= 1 && rec.marked_safe => {
                records.remove(&corpse);
                true
            }
            Some(_) => false,
            None => false,
        }
    }

    /// Sweep corpses with no outstanding guard older than the configured
    /// expiry. Returns the number reaped.
    pub fn reap_expired(&self, now: TimeMs) -> u32 {
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|_, rec| rec.refcount > 1 || now.saturating_sub(rec.created_at) <= self.expiry_ms);
        (before - records.len()) as u32
    }

    pub fn is_tracked(&self, corpse: EntityId) -> bool {
        self.records.read().unwrap().contains_key(&corpse)
    }
}

/// RAII handle standing in for the host's publication-pass walk over a
/// corpse. Dropping it releases the reference.
pub struct CorpseGuard<'a> {
    tracker: &'a CorpseTracker,
    corpse: EntityId,
}

impl Drop for CorpseGuard<'_> {
    fn drop(&mut self) {
        self.tracker.release(self.corpse);
    }
}

/// Routes a death through the corpse-creation-prevention path for agents or
/// the safe-deletion path for everything else. The death location is cached
/// up front so later resurrection/corpse-run logic never needs to read the
/// (possibly already-gone) corpse object.
pub fn resolve_death(
    is_agent: bool,
    dying: EntityId,
    corpse_id: EntityId,
    death_location: (f32, f32),
    now: TimeMs,
    hooks: &dyn DeathHooks,
    tracker: &CorpseTracker,
) -> DeathOutcome {
    hooks.on_pre_death(dying);
    if is_agent {
        DeathOutcome::GhostAtGraveyard { agent: dying, location: death_location }
    } else {
        tracker.register_corpse(corpse_id, dying, death_location, now);
        hooks.on_corpse_created(corpse_id, dying);
        DeathOutcome::CorpseCreated { corpse: corpse_id, location: death_location }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHooks;
    impl DeathHooks for NoopHooks {}

    #[test]
    fn agent_death_skips_corpse_creation() {
        let tracker = CorpseTracker::new(30);
        let outcome = resolve_death(true, EntityId(1), EntityId(2), (10.0, 20.0), 0, &NoopHooks, &tracker);
        assert_eq!(outcome, DeathOutcome::GhostAtGraveyard { agent: EntityId(1), location: (10.0, 20.0) });
        assert!(!tracker.is_tracked(EntityId(2)));
    }

    #[test]
    fn scoped_guard_blocks_removal_until_released() {
        // Mirrors the "safe corpse" scenario: corpse created, publication
        // pass takes a scoped reference, removal is denied until it drops.
        let tracker = CorpseTracker::new(30);
        let corpse = EntityId(5);
        tracker.register_corpse(corpse, EntityId(1), (0.0, 0.0), 0);

        let guard = tracker.scoped_guard(corpse).unwrap();
        assert!(!tracker.try_remove(corpse));

        drop(guard);
        assert!(tracker.try_remove(corpse));
        assert!(!tracker.is_tracked(corpse));
    }

    #[test]
    fn unmarked_safe_corpse_cannot_be_removed() {
        let tracker = CorpseTracker::new(30);
        let corpse = EntityId(5);
        tracker.register_corpse(corpse, EntityId(1), (0.0, 0.0), 0);
        tracker.mark_safe(corpse, false);

        assert!(!tracker.try_remove(corpse));
        tracker.mark_safe(corpse, true);
        assert!(tracker.try_remove(corpse));
    }

    #[test]
    fn reap_expired_only_sweeps_unreferenced_old_corpses() {
        let tracker = CorpseTracker::new(30); // 30 min -> 1_800_000 ms
        let old = EntityId(1);
        let fresh = EntityId(2);
        let held = EntityId(3);
        tracker.register_corpse(old, EntityId(10), (0.0, 0.0), 0);
        tracker.register_corpse(fresh, EntityId(11), (0.0, 0.0), 1_800_000);
        tracker.register_corpse(held, EntityId(12), (0.0, 0.0), 0);
        let _guard = tracker.scoped_guard(held).unwrap();

        let reaped = tracker.reap_expired(1_800_001);
        assert_eq!(reaped, 1);
        assert!(!tracker.is_tracked(old));
        assert!(tracker.is_tracked(fresh));
        assert!(tracker.is_tracked(held));
    }
}
