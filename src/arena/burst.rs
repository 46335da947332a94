//! Burst-window coordination (§4.4): a phase machine gating when the team
//! commits cooldowns onto the current kill target.

use crate::ids::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BurstPhase {
    None,
    Preparing,
    Executing,
    Sustaining,
    Retreating,
}

#[derive(Debug, Clone)]
pub struct BurstWindow {
    pub target: EntityId,
    pub phase: BurstPhase,
    pub participants: Vec<EntityId>,
    phase_elapsed_ms: u64,
    lowest_hp_seen_during_executing: f32,
}

impl BurstWindow {
    /// Per §9's resolved Open Question: a burst succeeded iff the target's
    /// health dropped below 30% at some point during `Executing`.
    pub fn was_successful(&self) -> bool {
        self.lowest_hp_seen_during_executing < 0.30
    }
}

pub const PREPARING_MS: u64 = 2_000;
pub const EXECUTING_MS: u64 = 6_000;
pub const SUSTAINING_MS: u64 = 4_000;
pub const RETREATING_MS: u64 = 2_000;

pub struct BurstCoordinator {
    min_bursters: u32,
    max_duration_ms: u64,
    window: Option<BurstWindow>,
}

impl BurstCoordinator {
    pub fn new(min_bursters: u32, max_duration_ms: u64) -> Self {
        Self { min_bursters, max_duration_ms, window: None }
    }

    /// Whether a burst window on `target` would be viable right now.
    pub fn is_viable(&self, trinket_down: bool, ready_bursters: u32, hp_fraction: f32, is_cced: bool, defensives_down: bool) -> bool {
        trinket_down
            && ready_bursters >= self.min_bursters
            && (hp_fraction < 0.5 || is_cced || defensives_down)
    }

    pub fn try_start(&mut self, target: EntityId, participants: Vec<EntityId>) -> bool {
        if self.window.is_some() {
            return false;
        }
        self.window = Some(BurstWindow {
            target,
            phase: BurstPhase::Preparing,
            participants,
            phase_elapsed_ms: 0,
            lowest_hp_seen_during_executing: 1.0,
        });
        true
    }

    /// Advances the phase machine. Returns `true` exactly on the
    /// Preparing→Executing transition, when `AnnounceBurstWindow` should fire.
    pub fn update(
        &mut self,
        dt_ms: u64,
        target_dead: bool,
        target_hp_fraction: f32,
        defensives_came_up: bool,
        critical_teammate_down: bool,
    ) -> bool {
        let Some(window) = &mut self.window else { return false };

        if target_dead || critical_teammate_down || (window.phase == BurstPhase::Executing && defensives_came_up) {
            self.window = None;
            return false;
        }

        window.phase_elapsed_ms += dt_ms;
        if window.phase == BurstPhase::Executing {
            window.lowest_hp_seen_during_executing = window.lowest_hp_seen_during_executing.min(target_hp_fraction);
        }

        let total_elapsed: u64 = match window.phase {
            BurstPhase::Preparing => window.phase_elapsed_ms,
            BurstPhase::Executing => PREPARING_MS + window.phase_elapsed_ms,
            BurstPhase::Sustaining => PREPARING_MS + EXECUTING_MS + window.phase_elapsed_ms,
            BurstPhase::Retreating => PREPARING_MS + EXECUTING_MS + SUSTAINING_MS + window.phase_elapsed_ms,
            BurstPhase::None => 0,
        };
        if total_elapsed >= self.max_duration_ms {
            self.window = None;
            return false;
        }

        let mut announce = false;
        match window.phase {
            BurstPhase::Preparing if window.phase_elapsed_ms >= PREPARING_MS => {
                window.phase = BurstPhase::Executing;
                window.phase_elapsed_ms = 0;
                announce = true;
            }
            BurstPhase::Executing if window.phase_elapsed_ms >= EXECUTING_MS => {
                window.phase = BurstPhase::Sustaining;
                window.phase_elapsed_ms = 0;
            }
            BurstPhase::Sustaining if window.phase_elapsed_ms >= SUSTAINING_MS => {
                window.phase = BurstPhase::Retreating;
                window.phase_elapsed_ms = 0;
            }
            BurstPhase::Retreating if window.phase_elapsed_ms >= RETREATING_MS => {
                self.window = None;
            }
            _ => {}
        }
        announce
    }

    pub fn phase(&self) -> BurstPhase {
        self.window.as_ref().map(|w| w.phase).unwrap_or(BurstPhase::None)
    }

    pub fn window(&self) -> Option<&BurstWindow> {
        self.window.as_ref()
    }
}
