//! Battleground coordinator (§4.5): large-scale objective PvP, with
//! map-specific logic factored into a `Script`.

pub mod script;
pub mod scripts;

pub use script::{Script, ScriptRegistry};

use std::collections::HashMap;

use crate::ids::{EntityId, TimeMs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BattlegroundState {
    Idle,
    Gates,
    Active,
    Overtime,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Alliance,
    Horde,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveKind {
    Node,
    Flag,
    Gate,
    Cart,
    Orb,
    Relic,
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveState {
    Neutral,
    AllianceControlled,
    HordeControlled,
    Contested,
    Destroyed,
}

#[derive(Debug, Clone, Copy)]
pub struct Objective {
    pub id: EntityId,
    pub kind: ObjectiveKind,
    pub state: ObjectiveState,
    pub position: (f32, f32),
    pub capture_progress: f32,
    pub strategic_weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Strategy {
    Balanced,
    Aggressive,
    Defensive,
    Turtle,
    AllIn,
    Stall,
    Comeback,
}

#[derive(Debug, Clone)]
pub struct StrategicDecision {
    pub strategy: Strategy,
    pub attack_targets: Vec<EntityId>,
    pub defend_targets: Vec<EntityId>,
    pub offense_allocation_pct: u8,
    pub defense_allocation_pct: u8,
    pub reasoning: String,
    pub confidence: f32,
}

impl Default for StrategicDecision {
    fn default() -> Self {
        Self {
            strategy: Strategy::Balanced,
            attack_targets: Vec::new(),
            defend_targets: Vec::new(),
            offense_allocation_pct: 50,
            defense_allocation_pct: 50,
            reasoning: "initial".into(),
            confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BgRole {
    FlagCarrier,
    FlagEscort,
    FlagHunter,
    NodeAttacker,
    NodeDefender,
    Roamer,
    HealerOffense,
    HealerDefense,
    VehicleDriver,
    VehicleGunner,
    CartPusher,
    TurretOperator,
    OrbCarrier,
    BossAssault,
}

/// An agent's suitability inputs for role assignment, supplied by the host.
#[derive(Debug, Clone, Copy)]
pub struct AgentCapability {
    pub agent: EntityId,
    pub role: crate::ids::Role,
    pub mobility: f32,
}

/// Greedy assignment of agents to the role-distribution a script
/// recommends. Not optimal matching — adequate for bounded ≤40-agent groups
/// re-evaluated every strategy cycle.
#[derive(Default)]
pub struct RoleManager {
    assignments: HashMap<EntityId, BgRole>,
}

impl RoleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, capabilities: &[AgentCapability], required: &HashMap<BgRole, u32>) {
        self.assignments.clear();
        let mut remaining = required.clone();
        let mut pool: Vec<&AgentCapability> = capabilities.iter().collect();
        pool.sort_by(|a, b| b.mobility.partial_cmp(&a.mobility).unwrap());

        for role in required.keys() {
            let count = remaining.get(role).copied().unwrap_or(0);
            let mut filled = 0u32;
            while filled < count {
                let Some(pos) = pool.iter().position(|c| suits(c.role, *role)) else { break };
                let candidate = pool.remove(pos);
                self.assignments.insert(candidate.agent, *role);
                filled += 1;
            }
        }
        for leftover in pool {
            self.assignments.entry(leftover.agent).or_insert(BgRole::Roamer);
        }
    }

    pub fn role_of(&self, agent: EntityId) -> Option<BgRole> {
        self.assignments.get(&agent).copied()
    }
}

fn suits(role: crate::ids::Role, bg_role: BgRole) -> bool {
    use crate::ids::Role;
    match bg_role {
        BgRole::HealerOffense | BgRole::HealerDefense => role == Role::Healer,
        BgRole::NodeDefender | BgRole::FlagEscort | BgRole::VehicleGunner => role == Role::Tank,
        _ => true,
    }
}

const STRATEGY_REEVAL_MS: u64 = 5_000;
const STRATEGY_MIN_INTERVAL_MS: u64 = 30_000;
const STRATEGY_SWITCH_MARGIN: f32 = 1.20;

/// How strongly current conditions justify *some* strategy change, used as
/// the comparison basis for the 20% switch margin. Independent of the
/// per-script `win_probability` estimator, which answers a different
/// question (chance of winning the match, not confidence in a strategy).
fn strategy_confidence(score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> f32 {
    let urgency = (score_advantage.unsigned_abs() as f32 / 10.0).min(1.0);
    let control_skew = (control_fraction - 0.5).abs() * 2.0;
    let time_pressure = if time_remaining_ms < 60_000 { 0.3 } else { 0.0 };
    (0.4 + 0.3 * urgency + 0.2 * control_skew + time_pressure).min(1.0)
}

pub struct BattlegroundCoordinator {
    pub state: BattlegroundState,
    pub objectives: Vec<Objective>,
    pub script: Option<Box<dyn Script>>,
    pub decision: StrategicDecision,
    pub world_state: HashMap<String, i64>,
    pub role_manager: RoleManager,
    time_since_strategy_change_ms: u64,
    time_since_strategy_eval_ms: u64,
}

impl BattlegroundCoordinator {
    pub fn new() -> Self {
        Self {
            state: BattlegroundState::Idle,
            objectives: Vec::new(),
            script: None,
            decision: StrategicDecision::default(),
            world_state: HashMap::new(),
            role_manager: RoleManager::new(),
            time_since_strategy_change_ms: 0,
            time_since_strategy_eval_ms: STRATEGY_REEVAL_MS,
        }
    }

    pub fn load_script(&mut self, script: Box<dyn Script>) {
        self.world_state = script.initial_world_state();
        self.objectives = script.initial_objectives();
        self.script = Some(script);
        self.state = BattlegroundState::Gates;
    }

    pub fn open(&mut self) {
        if self.state == BattlegroundState::Gates {
            self.state = BattlegroundState::Active;
        }
    }

    pub fn enter_overtime(&mut self) {
        if self.state == BattlegroundState::Active {
            self.state = BattlegroundState::Overtime;
        }
    }

    pub fn finish(&mut self) {
        self.state = BattlegroundState::Finished;
    }

    pub fn apply_world_state_delta(&mut self, key: &str, value: i64) {
        self.world_state.insert(key.to_string(), value);
        if let Some(script) = &self.script {
            if let Some((objective_id, new_state)) = script.interpret_world_state_delta(key, value) {
                if let Some(obj) = self.objectives.iter_mut().find(|o| o.id == objective_id) {
                    obj.state = new_state;
                }
            }
        }
    }

    /// Re-evaluates strategy on a 5s cadence; a candidate only replaces the
    /// current strategy if it scores ≥20% higher AND ≥30s have passed since
    /// the last change.
    pub fn update_strategy(&mut self, dt_ms: u64, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) {
        self.time_since_strategy_eval_ms += dt_ms;
        self.time_since_strategy_change_ms += dt_ms;
        if self.time_since_strategy_eval_ms < STRATEGY_REEVAL_MS {
            return;
        }
        self.time_since_strategy_eval_ms = 0;

        let Some(script) = &self.script else { return };
        let candidate_strategy = script.adjust_strategy(score_advantage, control_fraction, time_remaining_ms);
        let candidate_score = strategy_confidence(score_advantage, control_fraction, time_remaining_ms);

        if candidate_strategy == self.decision.strategy {
            self.decision.confidence = candidate_score;
            return;
        }
        if self.time_since_strategy_change_ms < STRATEGY_MIN_INTERVAL_MS {
            return;
        }
        if candidate_score >= self.decision.confidence * STRATEGY_SWITCH_MARGIN {
            self.decision.strategy = candidate_strategy;
            self.decision.confidence = candidate_score;
            self.time_since_strategy_change_ms = 0;
        }
    }

    pub fn update(&mut self, now: TimeMs, dt_ms: u64, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) {
        if self.state != BattlegroundState::Active && self.state != BattlegroundState::Overtime {
            return;
        }
        let _ = now;
        if let Some(script) = &self.script {
            script.on_tick(dt_ms);
        }
        self.update_strategy(dt_ms, score_advantage, control_fraction, time_remaining_ms);
    }
}

impl Default for BattlegroundCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
