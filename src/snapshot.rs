//! Serializable snapshot of a `CoordinationCore` tick, for handing state to
//! a host UI or overlay.

use serde::{Deserialize, Serialize};

use crate::arena::{ArenaState, BurstPhase};
use crate::battleground::{BattlegroundState, Strategy};
use crate::config::CoreError;
use crate::dungeon::DungeonState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaSnapshot {
    pub state: ArenaState,
    pub kill_target: Option<u64>,
    pub burst_phase: BurstPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattlegroundSnapshot {
    pub state: BattlegroundState,
    pub strategy: Strategy,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DungeonSnapshot {
    pub state: DungeonState,
    pub boss_phase: usize,
}

/// Complete coordination-core state snapshot for a host UI or overlay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub time: f32,
    pub arena: Option<ArenaSnapshot>,
    pub battleground: Option<BattlegroundSnapshot>,
    pub dungeon: Option<DungeonSnapshot>,
}

impl Default for ArenaSnapshot {
    fn default() -> Self {
        Self { state: ArenaState::Idle, kill_target: None, burst_phase: BurstPhase::None }
    }
}

impl Default for BattlegroundSnapshot {
    fn default() -> Self {
        Self { state: BattlegroundState::Idle, strategy: Strategy::Balanced, confidence: 0.5 }
    }
}

impl Default for DungeonSnapshot {
    fn default() -> Self {
        Self { state: DungeonState::Idle, boss_phase: 0 }
    }
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let snap = Snapshot {
            tick: 42,
            time: 1.5,
            arena: Some(ArenaSnapshot { state: ArenaState::Combat, kill_target: Some(7), burst_phase: BurstPhase::Executing }),
            battleground: None,
            dungeon: None,
        };
        let json = snap.to_json().unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tick, 42);
        assert_eq!(back.arena.unwrap().kill_target, Some(7));
    }
}
