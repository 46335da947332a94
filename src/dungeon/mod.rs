//! Dungeon coordinator (§4.6): five-man instance flow from entry through
//! trash, boss encounters, wipe recovery, and keystone timing.

pub mod boss;
pub mod mythic_plus;
pub mod trash;
pub mod wipe;

pub use boss::{BossEncounterManager, BossStrategy, InterruptPriority, MechanicResponse};
pub use mythic_plus::{Affix, ChestTier, MythicPlusManager};
pub use trash::{Marker, PullPlan, TrashPack, TrashPullManager};
pub use wipe::{GroupMember, WipePhase, WipeRecoveryManager};

use crate::config::CoreConfig;
use crate::ids::{EntityId, TimeMs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DungeonState {
    Idle,
    Entering,
    ReadyCheck,
    ClearingTrash,
    PreBoss,
    BossCombat,
    PostBoss,
    Wiped,
    Recovering,
    Completed,
}

pub struct DungeonCoordinator {
    pub state: DungeonState,
    pub trash: TrashPullManager,
    pub boss: BossEncounterManager,
    pub wipe: WipeRecoveryManager,
    pub mythic_plus: Option<MythicPlusManager>,
    ready_check_elapsed_ms: u64,
    ready_check_timeout_ms: u64,
}

impl DungeonCoordinator {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            state: DungeonState::Idle,
            trash: TrashPullManager::new(),
            boss: BossEncounterManager::new(),
            wipe: WipeRecoveryManager::new(),
            mythic_plus: None,
            ready_check_elapsed_ms: 0,
            ready_check_timeout_ms: config.dungeon_ready_check_timeout_ms,
        }
    }

    pub fn enable_mythic_plus(&mut self, mgr: MythicPlusManager) {
        self.mythic_plus = Some(mgr);
    }

    pub fn enter(&mut self) {
        if self.state == DungeonState::Idle {
            self.state = DungeonState::Entering;
        }
    }

    pub fn begin_ready_check(&mut self) {
        if self.state == DungeonState::Entering {
            self.state = DungeonState::ReadyCheck;
            self.ready_check_elapsed_ms = 0;
        }
    }

    /// Returns `true` once the ready check resolves (all ready, or timeout
    /// elapsed and the group proceeds anyway).
    pub fn update_ready_check(&mut self, dt_ms: u64, all_ready: bool) -> bool {
        if self.state != DungeonState::ReadyCheck {
            return false;
        }
        self.ready_check_elapsed_ms += dt_ms;
        if all_ready || self.ready_check_elapsed_ms >= self.ready_check_timeout_ms {
            self.state = DungeonState::ClearingTrash;
            true
        } else {
            false
        }
    }

    pub fn approach_boss(&mut self) {
        if self.state == DungeonState::ClearingTrash {
            self.state = DungeonState::PreBoss;
        }
    }

    pub fn engage_boss(&mut self, boss: EntityId, strategy: BossStrategy) {
        if self.state == DungeonState::PreBoss {
            self.boss.load(boss, strategy);
            self.state = DungeonState::BossCombat;
        }
    }

    pub fn boss_killed(&mut self) {
        if self.state == DungeonState::BossCombat {
            self.state = DungeonState::PostBoss;
        }
    }

    pub fn resume_trash(&mut self) {
        if self.state == DungeonState::PostBoss {
            self.state = DungeonState::ClearingTrash;
        }
    }

    pub fn complete(&mut self) {
        self.state = DungeonState::Completed;
    }

    /// A wipe can occur during trash or boss combat; begins the recovery FSM.
    pub fn wipe(&mut self, group: &[GroupMember]) {
        if matches!(self.state, DungeonState::ClearingTrash | DungeonState::PreBoss | DungeonState::BossCombat) {
            self.state = DungeonState::Wiped;
            self.wipe.start(group);
        }
    }

    pub fn begin_recovery(&mut self) {
        if self.state == DungeonState::Wiped {
            self.state = DungeonState::Recovering;
            self.wipe.release();
        }
    }

    pub fn update(&mut self, now: TimeMs, dt_ms: u64, group_mana_fraction: f32) {
        let _ = now;
        if self.state == DungeonState::Recovering && self.wipe.update(dt_ms, group_mana_fraction) {
            self.state = DungeonState::ClearingTrash;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Role;

    fn config() -> CoreConfig {
        CoreConfig::default()
    }

    #[test]
    fn lifecycle_runs_through_trash_boss_and_completion() {
        let mut dc = DungeonCoordinator::new(&config());
        dc.enter();
        dc.begin_ready_check();
        assert!(dc.update_ready_check(1_000, true));
        assert_eq!(dc.state, DungeonState::ClearingTrash);

        dc.approach_boss();
        assert_eq!(dc.state, DungeonState::PreBoss);
        dc.engage_boss(EntityId(1), BossStrategy::default());
        assert_eq!(dc.state, DungeonState::BossCombat);
        dc.boss_killed();
        assert_eq!(dc.state, DungeonState::PostBoss);
        dc.complete();
        assert_eq!(dc.state, DungeonState::Completed);
    }

    #[test]
    fn ready_check_proceeds_on_timeout_even_if_not_all_ready() {
        let mut dc = DungeonCoordinator::new(&config());
        dc.enter();
        dc.begin_ready_check();
        assert!(!dc.update_ready_check(10_000, false));
        assert!(dc.update_ready_check(25_000, false));
        assert_eq!(dc.state, DungeonState::ClearingTrash);
    }

    #[test]
    fn wipe_during_boss_combat_enters_recovery_and_returns_to_trash() {
        let mut dc = DungeonCoordinator::new(&config());
        dc.enter();
        dc.begin_ready_check();
        dc.update_ready_check(1_000, true);
        dc.approach_boss();
        dc.engage_boss(EntityId(1), BossStrategy::default());

        let group = vec![
            GroupMember { agent: EntityId(1), role: Role::Tank, has_battle_rez: false },
            GroupMember { agent: EntityId(2), role: Role::Healer, has_battle_rez: true },
        ];
        dc.wipe(&group);
        assert_eq!(dc.state, DungeonState::Wiped);
        dc.begin_recovery();
        assert_eq!(dc.state, DungeonState::Recovering);

        dc.wipe.begin_run_back();
        dc.wipe.member_arrived(EntityId(2));
        dc.wipe.rez_complete(EntityId(2));
        dc.wipe.member_arrived(EntityId(1));
        dc.wipe.rez_complete(EntityId(1));
        dc.wipe.rebuffs_done();

        dc.update(0, 5_000, 0.9);
        assert_eq!(dc.state, DungeonState::ClearingTrash);
    }
}
