//! Boss encounter management (§4.6): per-boss mechanics table, phase
//! transitions, interrupt classification, tank-swap tracking.

use std::collections::{HashMap, HashSet};

use crate::ids::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MechanicResponse {
    TankSwap,
    Spread,
    Stack,
    MoveOut,
    MoveIn,
    Interrupt,
    Dispel,
    DodgeAoe,
    Soak,
    Kite,
    SwitchTarget,
    Bloodlust,
    DefensiveCd,
}

#[derive(Debug, Clone)]
pub struct BossStrategy {
    /// Health fractions, descending, at which a new phase begins.
    pub phase_thresholds: Vec<f32>,
    pub mechanics: HashMap<u32, MechanicResponse>,
    pub must_interrupt: HashSet<u32>,
    pub should_interrupt: HashSet<u32>,
    pub tank_swap_stack_threshold: u32,
    pub bloodlust_health_fraction: f32,
}

impl Default for BossStrategy {
    /// A strategy-less boss is passive: no mechanics, no forced responses.
    fn default() -> Self {
        Self {
            phase_thresholds: Vec::new(),
            mechanics: HashMap::new(),
            must_interrupt: HashSet::new(),
            should_interrupt: HashSet::new(),
            tank_swap_stack_threshold: 3,
            bloodlust_health_fraction: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptPriority {
    Must,
    Should,
    None,
}

#[derive(Default)]
pub struct BossEncounterManager {
    pub boss: Option<EntityId>,
    pub strategy: BossStrategy,
    pub phase: usize,
    pub bloodlust_used: bool,
    tank_stacks: HashMap<EntityId, u32>,
}

impl BossEncounterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, boss: EntityId, strategy: BossStrategy) {
        self.boss = Some(boss);
        self.strategy = strategy;
        self.phase = 0;
        self.bloodlust_used = false;
        self.tank_stacks.clear();
    }

    /// Advances `phase` as `health_fraction` drops below each threshold in
    /// order; returns `true` exactly on a transition.
    pub fn update_phase(&mut self, health_fraction: f32) -> bool {
        if self.phase >= self.strategy.phase_thresholds.len() {
            return false;
        }
        if health_fraction <= self.strategy.phase_thresholds[self.phase] {
            self.phase += 1;
            true
        } else {
            false
        }
    }

    pub fn classify_interrupt(&self, spell_id: u32) -> InterruptPriority {
        if self.strategy.must_interrupt.contains(&spell_id) {
            InterruptPriority::Must
        } else if self.strategy.should_interrupt.contains(&spell_id) {
            InterruptPriority::Should
        } else {
            InterruptPriority::None
        }
    }

    pub fn on_event(&self, spell_id: u32) -> Option<MechanicResponse> {
        self.strategy.mechanics.get(&spell_id).copied()
    }

    /// Returns `Some(tank)` when that tank's stack count crossed the swap
    /// threshold and should hand off the boss.
    pub fn apply_tank_debuff(&mut self, tank: EntityId) -> Option<EntityId> {
        let count = self.tank_stacks.entry(tank).or_insert(0);
        *count += 1;
        if *count >= self.strategy.tank_swap_stack_threshold {
            Some(tank)
        } else {
            None
        }
    }

    pub fn complete_swap(&mut self, old_tank: EntityId) {
        self.tank_stacks.insert(old_tank, 0);
    }

    /// Bloodlust is only sanctioned on the first pull, or once boss health
    /// drops to the configured fraction (whichever the raid didn't already use).
    pub fn should_bloodlust(&mut self, is_first_pull: bool, health_fraction: f32) -> bool {
        if self.bloodlust_used {
            return false;
        }
        let eligible = is_first_pull || health_fraction <= self.strategy.bloodlust_health_fraction;
        if eligible {
            self.bloodlust_used = true;
        }
        eligible
    }
}
