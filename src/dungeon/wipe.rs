//! Wipe recovery (§4.6): rez-queue ordering and the six-phase recovery FSM.

use crate::ids::{EntityId, Role};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipePhase {
    Waiting,
    Releasing,
    RunningBack,
    Rezzing,
    Rebuffing,
    ManaRegen,
    Ready,
}

#[derive(Debug, Clone, Copy)]
pub struct GroupMember {
    pub agent: EntityId,
    pub role: Role,
    pub has_battle_rez: bool,
}

const MANA_THRESHOLD: f32 = 0.80;
const READY_TIMEOUT_MS: u64 = 60_000;

/// Priority: healers with battle-rez, then other healers, then tank, then
/// battle-rez capable DPS, then the rest.
fn rez_priority(m: &GroupMember) -> u8 {
    match (m.role, m.has_battle_rez) {
        (Role::Healer, true) => 0,
        (Role::Healer, false) => 1,
        (Role::Tank, _) => 2,
        (Role::Dps, true) => 3,
        (Role::Dps, false) => 4,
    }
}

#[derive(Default)]
pub struct WipeRecoveryManager {
    pub phase: WipePhase,
    rez_queue: Vec<EntityId>,
    arrived: Vec<EntityId>,
    rezzed: Vec<EntityId>,
    phase_elapsed_ms: u64,
    mana_fraction: f32,
}

impl Default for WipePhase {
    fn default() -> Self {
        WipePhase::Ready
    }
}

impl WipeRecoveryManager {
    pub fn new() -> Self {
        Self { phase: WipePhase::Ready, ..Default::default() }
    }

    pub fn start(&mut self, group: &[GroupMember]) {
        let mut sorted = group.to_vec();
        sorted.sort_by_key(rez_priority);
        self.rez_queue = sorted.into_iter().map(|m| m.agent).collect();
        self.arrived.clear();
        self.rezzed.clear();
        self.phase = WipePhase::Waiting;
        self.phase_elapsed_ms = 0;
        self.mana_fraction = 0.0;
    }

    pub fn release(&mut self) {
        if self.phase == WipePhase::Waiting {
            self.phase = WipePhase::Releasing;
            self.phase_elapsed_ms = 0;
        }
    }

    pub fn begin_run_back(&mut self) {
        if self.phase == WipePhase::Releasing {
            self.phase = WipePhase::RunningBack;
            self.phase_elapsed_ms = 0;
        }
    }

    /// An agent reaching the corpse/instance enters the rez queue; the next
    /// un-rezzed member in priority order is who gets rezzed.
    pub fn member_arrived(&mut self, agent: EntityId) {
        if self.phase == WipePhase::RunningBack || self.phase == WipePhase::Rezzing {
            if !self.arrived.contains(&agent) {
                self.arrived.push(agent);
            }
            self.phase = WipePhase::Rezzing;
        }
    }

    pub fn next_to_rez(&self) -> Option<EntityId> {
        self.rez_queue.iter().find(|a| self.arrived.contains(a) && !self.rezzed.contains(a)).copied()
    }

    pub fn rez_complete(&mut self, agent: EntityId) {
        if !self.rezzed.contains(&agent) {
            self.rezzed.push(agent);
        }
        if self.rezzed.len() == self.rez_queue.len() {
            self.phase = WipePhase::Rebuffing;
            self.phase_elapsed_ms = 0;
        }
    }

    pub fn rebuffs_done(&mut self) {
        if self.phase == WipePhase::Rebuffing {
            self.phase = WipePhase::ManaRegen;
            self.phase_elapsed_ms = 0;
        }
    }

    /// Advances the clock and reports readiness once average mana clears the
    /// 80% threshold, or after a one-minute timeout regardless of mana.
    pub fn update(&mut self, dt_ms: u64, group_mana_fraction: f32) -> bool {
        self.phase_elapsed_ms += dt_ms;
        self.mana_fraction = group_mana_fraction;
        if self.phase != WipePhase::ManaRegen {
            return false;
        }
        if group_mana_fraction >= MANA_THRESHOLD || self.phase_elapsed_ms >= READY_TIMEOUT_MS {
            self.phase = WipePhase::Ready;
            true
        } else {
            false
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == WipePhase::Ready
    }
}
