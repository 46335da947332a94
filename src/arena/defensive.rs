//! Defensive-state tracking and peel assignment (§4.4).

use std::collections::HashMap;

use crate::ids::{EntityId, TimeMs};

const DAMAGE_RATE_WINDOW_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DefensiveState {
    Healthy,
    Pressured,
    Danger,
    Critical,
}

struct DamageSample {
    at: TimeMs,
    amount: f32,
}

#[derive(Default)]
struct TeammateDefense {
    state: Option<DefensiveState>,
    samples: Vec<DamageSample>,
}

#[derive(Debug, Clone, Copy)]
pub struct PeelAssignment {
    pub peeler: EntityId,
    pub protected: EntityId,
    pub threat: EntityId,
    pub expires_at: TimeMs,
}

pub struct DefensiveCoordinator {
    health_thresholds: (f32, f32, f32),
    peel_duration_ms: u64,
    damage_rate_threshold: f32,
    teammates: HashMap<EntityId, TeammateDefense>,
    peels: Vec<PeelAssignment>,
}

impl DefensiveCoordinator {
    pub fn new(health_thresholds: (f32, f32, f32), peel_duration_ms: u64, damage_rate_threshold: f32) -> Self {
        Self {
            health_thresholds,
            peel_duration_ms,
            damage_rate_threshold,
            teammates: HashMap::new(),
            peels: Vec::new(),
        }
    }

    pub fn record_damage(&mut self, teammate: EntityId, amount: f32, now: TimeMs) {
        let entry = self.teammates.entry(teammate).or_default();
        entry.samples.push(DamageSample { at: now, amount });
        entry.samples.retain(|s| now.saturating_sub(s.at) <= DAMAGE_RATE_WINDOW_MS);
    }

    fn damage_rate_per_second(&self, teammate: EntityId) -> f32 {
        self.teammates
            .get(&teammate)
            .map(|t| t.samples.iter().map(|s| s.amount).sum::<f32>() / (DAMAGE_RATE_WINDOW_MS as f32 / 1_000.0))
            .unwrap_or(0.0)
    }

    /// Escalates (never silently de-escalates past a higher damage-rate
    /// reading in the same call) a teammate's defensive state for this tick.
    pub fn update_state(&mut self, teammate: EntityId, hp_fraction: f32) -> DefensiveState {
        let (hi, mid, lo) = self.health_thresholds;
        let hp_state = if hp_fraction >= hi {
            DefensiveState::Healthy
        } else if hp_fraction >= mid {
            DefensiveState::Pressured
        } else if hp_fraction >= lo {
            DefensiveState::Danger
        } else {
            DefensiveState::Critical
        };

        let rate = self.damage_rate_per_second(teammate);
        let state = if rate >= self.damage_rate_threshold && hp_state < DefensiveState::Danger {
            DefensiveState::Danger
        } else {
            hp_state
        };

        self.teammates.entry(teammate).or_default().state = Some(state);
        state
    }

    pub fn state_of(&self, teammate: EntityId) -> DefensiveState {
        self.teammates.get(&teammate).and_then(|t| t.state).unwrap_or(DefensiveState::Healthy)
    }

    /// Assigns `peeler` to protect `protected` from `threat` for the
    /// configured duration; replaces any existing assignment for the same
    /// protected teammate.
    pub fn assign_peel(&mut self, peeler: EntityId, protected: EntityId, threat: EntityId, now: TimeMs) {
        self.peels.retain(|p| p.protected != protected);
        self.peels.push(PeelAssignment { peeler, protected, threat, expires_at: now + self.peel_duration_ms });
    }

    pub fn expire_peels(&mut self, now: TimeMs) {
        self.peels.retain(|p| p.expires_at > now);
    }

    pub fn active_peels(&self) -> &[PeelAssignment] {
        &self.peels
    }

    pub fn needs_external_cooldown(&self, teammate: EntityId) -> bool {
        self.state_of(teammate) == DefensiveState::Danger
    }

    pub fn should_recommend_trinket(&self, teammate: EntityId, is_cced: bool) -> bool {
        self.state_of(teammate) == DefensiveState::Critical && is_cced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_thresholds_drive_base_state() {
        let mut coord = DefensiveCoordinator::new((0.80, 0.50, 0.30), 5_000, 10_000.0);
        assert_eq!(coord.update_state(EntityId(1), 0.9), DefensiveState::Healthy);
        assert_eq!(coord.update_state(EntityId(1), 0.6), DefensiveState::Pressured);
        assert_eq!(coord.update_state(EntityId(1), 0.4), DefensiveState::Danger);
        assert_eq!(coord.update_state(EntityId(1), 0.1), DefensiveState::Critical);
    }

    #[test]
    fn high_damage_rate_escalates_pressured_to_danger() {
        let mut coord = DefensiveCoordinator::new((0.80, 0.50, 0.30), 5_000, 1_000.0);
        coord.record_damage(EntityId(1), 5_000.0, 0); // 1000/s over the 5s window
        assert_eq!(coord.update_state(EntityId(1), 0.6), DefensiveState::Danger);
    }

    #[test]
    fn peel_expires_after_duration() {
        let mut coord = DefensiveCoordinator::new((0.80, 0.50, 0.30), 5_000, 10_000.0);
        coord.assign_peel(EntityId(2), EntityId(1), EntityId(99), 0);
        assert_eq!(coord.active_peels().len(), 1);
        coord.expire_peels(5_001);
        assert!(coord.active_peels().is_empty());
    }

    #[test]
    fn danger_requests_cooldown_critical_cced_recommends_trinket() {
        let mut coord = DefensiveCoordinator::new((0.80, 0.50, 0.30), 5_000, 10_000.0);
        coord.update_state(EntityId(1), 0.4);
        assert!(coord.needs_external_cooldown(EntityId(1)));

        coord.update_state(EntityId(1), 0.1);
        assert!(coord.should_recommend_trinket(EntityId(1), true));
        assert!(!coord.should_recommend_trinket(EntityId(1), false));
    }
}
