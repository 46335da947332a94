//! Arena coordinator (§4.4): small-scale PvP team play.

pub mod burst;
pub mod cc_chain;
pub mod defensive;
pub mod kill_target;
pub mod positioning;

pub use burst::{BurstCoordinator, BurstPhase, BurstWindow};
pub use cc_chain::{CCChainManager, CcChain, CcLink};
pub use defensive::{DefensiveCoordinator, DefensiveState, PeelAssignment};
pub use kill_target::{EnemyStatus, KillTargetManager};
pub use positioning::{ArenaPositioning, Pillar, PositionGoal};

use crate::config::CoreConfig;
use crate::dr::DrTracker;
use crate::ids::TimeMs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ArenaState {
    Idle,
    Preparation,
    Combat,
    Finished,
}

/// Owns every arena sub-manager and the match-lifecycle state machine.
pub struct ArenaCoordinator {
    pub state: ArenaState,
    pub kill_target: KillTargetManager,
    pub burst: BurstCoordinator,
    pub cc_chain: CCChainManager,
    pub defensive: DefensiveCoordinator,
    pub positioning: ArenaPositioning,
    pub dr: DrTracker,
}

impl ArenaCoordinator {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            state: ArenaState::Idle,
            kill_target: KillTargetManager::new(config.arena_switch_threshold, config.arena_min_time_on_target_ms),
            burst: BurstCoordinator::new(config.arena_burst_min_bursters, config.arena_burst_max_duration_ms),
            cc_chain: CCChainManager::new(config.arena_cc_overlap_window_ms),
            defensive: DefensiveCoordinator::new(config.arena_defensive_health_thresholds, config.arena_peel_duration_ms, 3_000.0),
            positioning: ArenaPositioning::new(),
            dr: DrTracker::new(),
        }
    }

    pub fn start_gate_countdown(&mut self) {
        if self.state == ArenaState::Idle {
            self.state = ArenaState::Preparation;
        }
    }

    pub fn open_gates(&mut self) {
        if self.state == ArenaState::Preparation {
            self.state = ArenaState::Combat;
        }
    }

    pub fn finish(&mut self) {
        if self.state == ArenaState::Combat {
            self.state = ArenaState::Finished;
        }
    }

    /// Steps sub-managers that run on a fixed cadence rather than in direct
    /// response to events. Called once per coordinator `step`.
    pub fn update(&mut self, now: TimeMs, dt_ms: u64, enemies: &[EnemyStatus]) {
        if self.state != ArenaState::Combat {
            return;
        }
        self.kill_target.update(dt_ms, enemies, None);
        self.defensive.expire_peels(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_follows_idle_preparation_combat_finished() {
        let config = CoreConfig::default();
        let mut arena = ArenaCoordinator::new(&config);
        assert_eq!(arena.state, ArenaState::Idle);
        arena.start_gate_countdown();
        assert_eq!(arena.state, ArenaState::Preparation);
        arena.open_gates();
        assert_eq!(arena.state, ArenaState::Combat);
        arena.finish();
        assert_eq!(arena.state, ArenaState::Finished);
    }

    #[test]
    fn update_is_a_no_op_outside_combat() {
        let config = CoreConfig::default();
        let mut arena = ArenaCoordinator::new(&config);
        arena.update(0, 1_000, &[]);
        assert!(arena.kill_target.current_target().is_none());
    }
}
