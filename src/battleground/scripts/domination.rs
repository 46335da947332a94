//! Domination script: node capture with progress bars, tick-scored by count
//! of controlled nodes, with an "optimal count" below full control.

use std::collections::HashMap;

use crate::battleground::{BgRole, Objective, ObjectiveKind, ObjectiveState, Script, Strategy, StrategicDecision, Team};
use crate::ids::EntityId;

pub struct DominationScript {
    map_id: u32,
    nodes: Vec<EntityId>,
    /// Nodes needed for efficient scoring without overextending (e.g. 3 of 5).
    optimal_count: usize,
    points_per_node_per_tick: u32,
}

impl DominationScript {
    pub fn new(map_id: u32, nodes: Vec<EntityId>, optimal_count: usize) -> Self {
        Self { map_id, nodes, optimal_count, points_per_node_per_tick: 1 }
    }

    pub fn score_per_tick(&self, nodes_controlled: usize) -> u32 {
        nodes_controlled as u32 * self.points_per_node_per_tick
    }

    pub fn is_overextended(&self, nodes_held: usize) -> bool {
        nodes_held > self.optimal_count
    }

    fn node_key(&self, node: EntityId) -> String {
        format!("node_{}_state", node.0)
    }

    /// Nearest uncontrolled node to `from`, used to route the next push.
    pub fn next_route_target(&self, objectives: &[Objective], from: (f32, f32)) -> Option<EntityId> {
        objectives
            .iter()
            .filter(|o| o.kind == ObjectiveKind::Node && o.state != ObjectiveState::AllianceControlled)
            .min_by(|a, b| dist(from, a.position).partial_cmp(&dist(from, b.position)).unwrap())
            .map(|o| o.id)
    }
}

fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

impl Script for DominationScript {
    fn map_id(&self) -> u32 {
        self.map_id
    }

    fn initial_objectives(&self) -> Vec<Objective> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, &id)| Objective {
                id,
                kind: ObjectiveKind::Node,
                state: ObjectiveState::Neutral,
                position: (i as f32 * 50.0, 0.0),
                capture_progress: 0.0,
                strategic_weight: 1.0,
            })
            .collect()
    }

    fn spawn_positions(&self, team: Team) -> Vec<(f32, f32)> {
        match team {
            Team::Alliance => vec![(-50.0, 0.0)],
            Team::Horde => vec![(self.nodes.len() as f32 * 50.0 + 50.0, 0.0)],
        }
    }

    fn graveyard_positions(&self, team: Team) -> Vec<(f32, f32)> {
        self.spawn_positions(team)
    }

    fn initial_world_state(&self) -> HashMap<String, i64> {
        let mut m = HashMap::new();
        for &node in &self.nodes {
            m.insert(self.node_key(node), 0);
        }
        m.insert("alliance_score".into(), 0);
        m.insert("horde_score".into(), 0);
        m
    }

    fn interpret_world_state_delta(&self, key: &str, value: i64) -> Option<(EntityId, ObjectiveState)> {
        let node = *self.nodes.iter().find(|n| self.node_key(**n) == key)?;
        let state = match value {
            0 => ObjectiveState::Neutral,
            1 => ObjectiveState::AllianceControlled,
            2 => ObjectiveState::HordeControlled,
            _ => ObjectiveState::Contested,
        };
        Some((node, state))
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
                m.insert(BgRole::NodeAttacker, 5);
                m.insert(BgRole::HealerOffense, 2);
            }
            Strategy::Defensive | Strategy::Turtle => {
                m.insert(BgRole::NodeDefender, self.optimal_count as u32);
                m.insert(BgRole::HealerDefense, 2);
            }
            _ => {
                m.insert(BgRole::NodeAttacker, 2);
                m.insert(BgRole::NodeDefender, (self.optimal_count as u32).saturating_sub(1));
                m.insert(BgRole::Roamer, 2);
            }
        }
        m
    }

    fn adjust_strategy(&self, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> Strategy {
        if control_fraction > 0.8 {
            Strategy::Turtle // overextended control invites a defensive consolidation
        } else if score_advantage <= -5 && time_remaining_ms < 120_000 {
            Strategy::AllIn
        } else if score_advantage >= 5 {
            Strategy::Defensive
        } else {
            Strategy::Balanced
        }
    }

    fn attack_priority(&self, objectives: &[Objective]) -> Vec<EntityId> {
        objectives.iter().filter(|o| o.state != ObjectiveState::AllianceControlled).map(|o| o.id).collect()
    }

    fn defend_priority(&self, objectives: &[Objective]) -> Vec<EntityId> {
        objectives.iter().filter(|o| o.state == ObjectiveState::AllianceControlled).map(|o| o.id).collect()
    }

    fn win_probability(&self, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> f32 {
        let _ = time_remaining_ms;
        (0.5 + score_advantage as f32 * 0.02 + (control_fraction - 0.5) * 0.5).clamp(0.0, 1.0)
    }
}
