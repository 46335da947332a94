//! Kill-target selection (§4.4): re-scored on a fixed interval, switching
//! gated by a relative-improvement threshold plus a minimum focus time.

use crate::ids::EntityId;

/// Snapshot of an enemy's state as observed this tick; supplied by the host
/// adapter, not computed here.
#[derive(Debug, Clone, Copy)]
pub struct EnemyStatus {
    pub id: EntityId,
    pub hp_fraction: f32,
    pub trinket_down: bool,
    pub defensives_down: bool,
    pub is_healer: bool,
    pub in_range_and_los: bool,
    pub recent_damage_to_target: f32,
    pub is_cced: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct KillTargetWeights {
    pub low_health: f32,
    pub cooldown: f32,
    pub role: f32,
    pub position: f32,
    pub momentum: f32,
    pub cc_penalty: f32,
}

impl Default for KillTargetWeights {
    fn default() -> Self {
        Self { low_health: 3.0, cooldown: 1.5, role: 2.0, position: 1.0, momentum: 0.5, cc_penalty: 1000.0 }
    }
}

const REEVAL_INTERVAL_MS: u64 = 500;

pub struct KillTargetManager {
    weights: KillTargetWeights,
    switch_threshold: f32,
    min_time_on_target_ms: u64,
    current_target: Option<EntityId>,
    time_since_switch_ms: u64,
    time_since_eval_ms: u64,
}

impl KillTargetManager {
    pub fn new(switch_threshold: f32, min_time_on_target_ms: u64) -> Self {
        Self {
            weights: KillTargetWeights::default(),
            switch_threshold,
            min_time_on_target_ms,
            current_target: None,
            time_since_switch_ms: 0,
            time_since_eval_ms: REEVAL_INTERVAL_MS, // evaluate immediately on the first tick
        }
    }

    fn score(&self, e: &EnemyStatus) -> f32 {
        let w = &self.weights;
        let cooldowns = (e.trinket_down as u8 + e.defensives_down as u8) as f32;
        let mut s = w.low_health * (1.0 - e.hp_fraction)
            + w.cooldown * cooldowns
            + w.role * (e.is_healer as u8 as f32)
            + w.position * (e.in_range_and_los as u8 as f32)
            + w.momentum * e.recent_damage_to_target;
        if e.is_cced {
            s -= w.cc_penalty;
        }
        s
    }

    /// `forced_switch` models the public "call switch" command, which
    /// bypasses both the improvement and focus-time gates.
    pub fn update(&mut self, dt_ms: u64, enemies: &[EnemyStatus], forced_switch: Option<EntityId>) {
        self.time_since_eval_ms += dt_ms;
        self.time_since_switch_ms += dt_ms;

        if let Some(target) = forced_switch {
            self.current_target = Some(target);
            self.time_since_switch_ms = 0;
            return;
        }

        if enemies.is_empty() || self.time_since_eval_ms < REEVAL_INTERVAL_MS {
            return;
        }
        self.time_since_eval_ms = 0;

        let best = enemies.iter().max_by(|a, b| self.score(a).partial_cmp(&self.score(b)).unwrap()).unwrap();

        match self.current_target {
            None => {
                self.current_target = Some(best.id);
                self.time_since_switch_ms = 0;
            }
            Some(current_id) if current_id != best.id => {
                let current_score =
                    enemies.iter().find(|e| e.id == current_id).map(|e| self.score(e)).unwrap_or(f32::MIN);
                let best_score = self.score(best);
                let improved_enough = current_score <= 0.0 || best_score >= current_score * self.switch_threshold;
                if improved_enough && self.time_since_switch_ms >= self.min_time_on_target_ms {
                    self.current_target = Some(best.id);
                    self.time_since_switch_ms = 0;
                }
            }
            _ => {}
        }
    }

    pub fn current_target(&self) -> Option<EntityId> {
        self.current_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy(id: u64, hp: f32) -> EnemyStatus {
        EnemyStatus {
            id: EntityId(id),
            hp_fraction: hp,
            trinket_down: false,
            defensives_down: false,
            is_healer: false,
            in_range_and_los: true,
            recent_damage_to_target: 0.0,
            is_cced: false,
        }
    }

    #[test]
    fn picks_best_scored_target_initially() {
        let mut mgr = KillTargetManager::new(1.5, 3_000);
        let enemies = vec![enemy(1, 0.9), enemy(2, 0.2)];
        mgr.update(0, &enemies, None);
        assert_eq!(mgr.current_target(), Some(EntityId(2)));
    }

    #[test]
    fn switch_requires_both_score_margin_and_focus_time() {
        let mut mgr = KillTargetManager::new(1.5, 3_000);
        let mut enemies = vec![enemy(1, 0.9), enemy(2, 0.85)];
        mgr.update(0, &enemies, None);
        assert_eq!(mgr.current_target(), Some(EntityId(1)));

        // Enemy 2 becomes only marginally better — should NOT switch, gate fails.
        enemies[1].hp_fraction = 0.7;
        mgr.update(500, &enemies, None);
        assert_eq!(mgr.current_target(), Some(EntityId(1)));

        // Enemy 2 becomes dramatically better, but not enough time has passed on current target.
        enemies[1].hp_fraction = 0.0;
        mgr.update(500, &enemies, None);
        assert_eq!(mgr.current_target(), Some(EntityId(1)), "focus-time gate should still hold");

        // After min_time_on_target_ms elapses, the switch goes through.
        mgr.update(2_500, &enemies, None);
        assert_eq!(mgr.current_target(), Some(EntityId(2)));
    }

    #[test]
    fn forced_switch_bypasses_all_gates() {
        let mut mgr = KillTargetManager::new(1.5, 3_000);
        mgr.update(0, &[enemy(1, 0.5)], None);
        mgr.update(10, &[enemy(1, 0.5)], Some(EntityId(99)));
        assert_eq!(mgr.current_target(), Some(EntityId(99)));
    }
}
