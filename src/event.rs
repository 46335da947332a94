//! Combat events: the single value type the router fans out.
//!
//! Rather than a sum type over 32 kinds, this follows the source design's
//! choice of one flat struct with a kind bitmask and zeroed/default
//! kind-irrelevant fields (§9: "Event payload variance") — friendlier to the
//! `queue`-then-`drain` pattern and to stat tables indexed by bit position.

use crate::ids::{EntityId, TimeMs};
use bitflags::bitflags;

bitflags! {
    /// One bit per event kind. `dispatch`/`queue`/`subscribe` all operate in
    /// terms of this mask so filtering is an O(1) bitwise test.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventKindMask: u32 {
        const DAMAGE               = 1 << 0;
        const HEAL                 = 1 << 1;
        const CAST_START           = 1 << 2;
        const CAST_SUCCESS         = 1 << 3;
        const CAST_INTERRUPTED     = 1 << 4;
        const AURA_APPLIED         = 1 << 5;
        const AURA_REMOVED         = 1 << 6;
        const AURA_STACK_CHANGED   = 1 << 7;
        const THREAT_CHANGED       = 1 << 8;
        const UNIT_DIED            = 1 << 9;
        const COMBAT_STARTED       = 1 << 10;
        const COMBAT_ENDED         = 1 << 11;
        const ENCOUNTER_START      = 1 << 12;
        const ENCOUNTER_END        = 1 << 13;
        const PHASE_CHANGED        = 1 << 14;
        const RESURRECTED          = 1 << 15;
        const POSITION_CHANGED     = 1 << 16;
        const OBJECTIVE_CAPTURED   = 1 << 17;
        const FLAG_PICKED_UP       = 1 << 18;
        const FLAG_DROPPED         = 1 << 19;
        const FLAG_CAPTURED        = 1 << 20;
        const FLAG_RETURNED        = 1 << 21;
        const GATE_DESTROYED       = 1 << 22;
        const CART_MOVED           = 1 << 23;
        const PACK_PULLED          = 1 << 24;
        const PACK_CLEARED         = 1 << 25;
        const BOSS_ENRAGE          = 1 << 26;
        const KEYSTONE_STARTED     = 1 << 27;
        const COOLDOWN_USED        = 1 << 28;
        const COOLDOWN_READY       = 1 << 29;
        const WORLD_STATE_CHANGED  = 1 << 30;
        const CUSTOM               = 1 << 31;

        /// Kinds that demand `dispatch` (immediate, same-thread fan-out)
        /// rather than `queue`: interrupt latency cannot survive a tick of
        /// buffering.
        const IMMEDIATE = Self::CAST_START.bits();
    }
}

impl EventKindMask {
    pub const ALL_KINDS: u32 = 32;

    /// Iterate the set bit positions (0..32) for stat indexing.
    pub fn iter_bits(self) -> impl Iterator<Item = u32> {
        (0..Self::ALL_KINDS).filter(move |i| self.bits() & (1 << i) != 0)
    }
}

/// Spell metadata the event carries a reference to. The core treats this as
/// an opaque lookup result from an external spell database.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpellDescriptor {
    pub spell_id: u32,
    /// Cached "is this an interrupt-worthy cast" bit, looked up once by the
    /// adapter so the router/coordinators never touch the spell database.
    pub interruptible: bool,
}

/// Aura (buff/debuff) metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AuraDescriptor {
    pub aura_id: u32,
    pub stacks: u8,
    pub remaining_ms: u32,
}

/// A single combat event. `Copy` — freely passed by value through the
/// router's queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatEvent {
    pub kind: EventKindMask,
    pub timestamp: TimeMs,
    pub source: EntityId,
    pub target: EntityId,
    pub amount: f32,
    pub spell: SpellDescriptor,
    pub aura: AuraDescriptor,
    pub threat_delta: f32,
    pub encounter_id: EntityId,
    pub phase: u8,
}

impl Default for CombatEvent {
    fn default() -> Self {
        Self {
            kind: EventKindMask::empty(),
            timestamp: 0,
            source: EntityId::EMPTY,
            target: EntityId::EMPTY,
            amount: 0.0,
            spell: SpellDescriptor::default(),
            aura: AuraDescriptor::default(),
            threat_delta: 0.0,
            encounter_id: EntityId::EMPTY,
            phase: 0,
        }
    }
}

impl CombatEvent {
    pub fn new(kind: EventKindMask, timestamp: TimeMs, source: EntityId, target: EntityId) -> Self {
        Self { kind, timestamp, source, target, ..Default::default() }
    }

    pub fn damage(timestamp: TimeMs, source: EntityId, target: EntityId, amount: f32) -> Self {
        Self { amount, ..Self::new(EventKindMask::DAMAGE, timestamp, source, target) }
    }

    pub fn heal(timestamp: TimeMs, source: EntityId, target: EntityId, amount: f32) -> Self {
        Self { amount, ..Self::new(EventKindMask::HEAL, timestamp, source, target) }
    }

    pub fn cast_start(timestamp: TimeMs, source: EntityId, target: EntityId, spell: SpellDescriptor) -> Self {
        Self { spell, ..Self::new(EventKindMask::CAST_START, timestamp, source, target) }
    }

    pub fn unit_died(timestamp: TimeMs, source: EntityId) -> Self {
        Self::new(EventKindMask::UNIT_DIED, timestamp, source, EntityId::EMPTY)
    }

    /// True for kinds whose latency budget requires `dispatch` instead of
    /// `queue` (see `EventKindMask::IMMEDIATE`).
    pub fn requires_immediate_dispatch(&self) -> bool {
        self.kind.intersects(EventKindMask::IMMEDIATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_iteration_matches_popcount() {
        let mask = EventKindMask::DAMAGE | EventKindMask::HEAL | EventKindMask::UNIT_DIED;
        assert_eq!(mask.iter_bits().count() as u32, mask.bits().count_ones());
    }

    #[test]
    fn cast_start_is_immediate() {
        let e = CombatEvent::cast_start(0, EntityId(1), EntityId(2), SpellDescriptor::default());
        assert!(e.requires_immediate_dispatch());
        let d = CombatEvent::damage(0, EntityId(1), EntityId(2), 10.0);
        assert!(!d.requires_immediate_dispatch());
    }
}
