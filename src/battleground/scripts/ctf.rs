//! Capture-the-flag script: flag pickup/drop/capture/return, carrier
//! debuff escalation, and sudden-death overtime tie-breaking.

use std::collections::HashMap;

use crate::battleground::{BgRole, Objective, ObjectiveKind, ObjectiveState, Script, Strategy, StrategicDecision, Team};
use crate::ids::EntityId;

pub struct CtfScript {
    map_id: u32,
    flag_a: EntityId,
    flag_b: EntityId,
}

impl CtfScript {
    pub fn new(map_id: u32, flag_a: EntityId, flag_b: EntityId) -> Self {
        Self { map_id, flag_a, flag_b }
    }

    /// 0 = no debuff, 1 = after 10 minutes carried, 2 = after 15 minutes.
    pub fn carrier_debuff_tier(carry_duration_ms: u64) -> u8 {
        if carry_duration_ms >= 15 * 60_000 {
            2
        } else if carry_duration_ms >= 10 * 60_000 {
            1
        } else {
            0
        }
    }

    /// `None` when scores are still tied and sudden death continues.
    pub fn overtime_tiebreak(alliance_score: u32, horde_score: u32) -> Option<Team> {
        use std::cmp::Ordering::*;
        match alliance_score.cmp(&horde_score) {
            Greater => Some(Team::Alliance),
            Less => Some(Team::Horde),
            Equal => None,
        }
    }

    fn flag_key(&self, flag: EntityId) -> String {
        format!("flag_{}_state", flag.0)
    }
}

impl Script for CtfScript {
    fn map_id(&self) -> u32 {
        self.map_id
    }

    fn initial_objectives(&self) -> Vec<Objective> {
        vec![
            Objective {
                id: self.flag_a,
                kind: ObjectiveKind::Flag,
                state: ObjectiveState::AllianceControlled,
                position: (0.0, 0.0),
                capture_progress: 0.0,
                strategic_weight: 1.0,
            },
            Objective {
                id: self.flag_b,
                kind: ObjectiveKind::Flag,
                state: ObjectiveState::HordeControlled,
                position: (100.0, 100.0),
                capture_progress: 0.0,
                strategic_weight: 1.0,
            },
        ]
    }

    fn spawn_positions(&self, team: Team) -> Vec<(f32, f32)> {
        match team {
            Team::Alliance => vec![(0.0, 0.0)],
            Team::Horde => vec![(100.0, 100.0)],
        }
    }

    fn graveyard_positions(&self, team: Team) -> Vec<(f32, f32)> {
        match team {
            Team::Alliance => vec![(-10.0, -10.0)],
            Team::Horde => vec![(110.0, 110.0)],
        }
    }

    fn initial_world_state(&self) -> HashMap<String, i64> {
        let mut m = HashMap::new();
        m.insert(self.flag_key(self.flag_a), 0);
        m.insert(self.flag_key(self.flag_b), 0);
        m.insert("alliance_score".into(), 0);
        m.insert("horde_score".into(), 0);
        m
    }

    fn interpret_world_state_delta(&self, key: &str, value: i64) -> Option<(EntityId, ObjectiveState)> {
        let flag_id = if key == self.flag_key(self.flag_a) {
            self.flag_a
        } else if key == self.flag_key(self.flag_b) {
            self.flag_b
        } else {
            return None;
        };
        let state = match value {
            0 => ObjectiveState::Neutral,
            1 => ObjectiveState::AllianceControlled,
            2 => ObjectiveState::HordeControlled,
            3 => ObjectiveState::Contested,
            _ => ObjectiveState::Destroyed,
        };
        Some((flag_id, state))
    }

    fn extract_score(&self, world_state: &HashMap<String, i64>) -> (u32, u32) {
        let a = (*world_state.get("alliance_score").unwrap_or(&0)).max(0) as u32;
        let h = (*world_state.get("horde_score").unwrap_or(&0)).max(0) as u32;
        (a, h)
    }

    fn recommend_roles(&self, decision: &StrategicDecision) -> HashMap<BgRole, u32> {
        let mut m = HashMap::new();
        match decision.strategy {
            Strategy::Aggressive | Strategy::AllIn => {
                m.insert(BgRole::FlagHunter, 4);
                m.insert(BgRole::FlagCarrier, 1);
                m.insert(BgRole::FlagEscort, 2);
                m.insert(BgRole::HealerOffense, 2);
            }
            Strategy::Defensive | Strategy::Turtle => {
                m.insert(BgRole::NodeDefender, 4);
                m.insert(BgRole::HealerDefense, 2);
                m.insert(BgRole::Roamer, 2);
            }
            _ => {
                m.insert(BgRole::FlagHunter, 2);
                m.insert(BgRole::NodeDefender, 2);
                m.insert(BgRole::FlagCarrier, 1);
                m.insert(BgRole::Roamer, 3);
            }
        }
        m
    }

    fn adjust_strategy(&self, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> Strategy {
        if score_advantage <= -5 && control_fraction < 0.3 {
            Strategy::Defensive
        } else if score_advantage >= 5 && control_fraction > 0.6 {
            Strategy::Aggressive
        } else if time_remaining_ms < 60_000 && score_advantage < 0 {
            Strategy::Comeback
        } else if time_remaining_ms < 60_000 && score_advantage > 0 {
            Strategy::Stall
        } else {
            Strategy::Balanced
        }
    }

    fn attack_priority(&self, objectives: &[Objective]) -> Vec<EntityId> {
        objectives.iter().filter(|o| o.state != ObjectiveState::Destroyed).map(|o| o.id).collect()
    }

    fn defend_priority(&self, objectives: &[Objective]) -> Vec<EntityId> {
        objectives.iter().filter(|o| o.id == self.flag_a).map(|o| o.id).collect()
    }

    fn win_probability(&self, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> f32 {
        let _ = time_remaining_ms;
        (0.5 + score_advantage as f32 * 0.03 + (control_fraction - 0.5) * 0.4).clamp(0.0, 1.0)
    }
}
