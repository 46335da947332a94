//! Siege script: a gate chain guards a boss that only becomes attackable
//! once every gate in the chain is breached, vehicles crew a
//! driver/gunner pair, and attacker/defender sides swap between a fixed
//! number of rounds, the second round's clock benchmarked against the
//! first's.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::battleground::{BgRole, Objective, ObjectiveKind, ObjectiveState, Script, Strategy, StrategicDecision, Team};
use crate::ids::EntityId;

/// Outcome of a completed round, comparing its clock against round one's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundOutcome {
    /// Round one: no prior benchmark to compare against.
    Baseline { elapsed_ms: u64 },
    FasterThanRoundOne { elapsed_ms: u64, round_one_ms: u64 },
    SlowerThanRoundOne { elapsed_ms: u64, round_one_ms: u64 },
}

struct RoundState {
    round: u8,
    attacking_team: Team,
    elapsed_ms: u64,
    round_one_ms: Option<u64>,
}

pub struct SiegeScript {
    map_id: u32,
    gates: Vec<EntityId>,
    boss: EntityId,
    total_rounds: u8,
    round: Mutex<RoundState>,
}

impl SiegeScript {
    pub fn new(map_id: u32, gates: Vec<EntityId>, boss: EntityId, total_rounds: u8, first_attacker: Team) -> Self {
        Self {
            map_id,
            gates,
            boss,
            total_rounds,
            round: Mutex::new(RoundState { round: 1, attacking_team: first_attacker, elapsed_ms: 0, round_one_ms: None }),
        }
    }

    pub fn current_round(&self) -> u8 {
        self.round.lock().unwrap().round
    }

    pub fn attacking_team(&self) -> Team {
        self.round.lock().unwrap().attacking_team
    }

    /// Gates are breached strictly in chain order; a gate later in the list
    /// can't fall before the ones ahead of it, mirroring the beach-to-relic
    /// layout the destruction order is grounded on.
    pub fn gate_destruction_order(&self) -> &[EntityId] {
        &self.gates
    }

    pub fn destroyed_gate_count(&self, objectives: &[Objective]) -> u32 {
        self.gates
            .iter()
            .filter(|&&g| objectives.iter().any(|o| o.id == g && o.state == ObjectiveState::Destroyed))
            .count() as u32
    }

    /// The boss only becomes reachable once every gate in the chain is down.
    pub fn can_attack_boss(&self, objectives: &[Objective]) -> bool {
        self.destroyed_gate_count(objectives) as usize == self.gates.len()
    }

    pub fn boss_defeated(&self, objectives: &[Objective]) -> bool {
        objectives.iter().any(|o| o.id == self.boss && o.state == ObjectiveState::Destroyed)
    }

    pub fn advance_round_clock(&self, dt_ms: u64) {
        self.round.lock().unwrap().elapsed_ms += dt_ms;
    }

    /// Ends the current round, records it against round one's clock, and
    /// flips which side attacks next. Returns `None` once `total_rounds`
    /// have already been played.
    pub fn finish_round(&self) -> Option<RoundOutcome> {
        let mut state = self.round.lock().unwrap();
        if state.round > self.total_rounds {
            return None;
        }
        let elapsed_ms = state.elapsed_ms;
        let outcome = match state.round_one_ms {
            None => {
                state.round_one_ms = Some(elapsed_ms);
                RoundOutcome::Baseline { elapsed_ms }
            }
            Some(round_one_ms) if elapsed_ms < round_one_ms => {
                RoundOutcome::FasterThanRoundOne { elapsed_ms, round_one_ms }
            }
            Some(round_one_ms) => RoundOutcome::SlowerThanRoundOne { elapsed_ms, round_one_ms },
        };
        state.round += 1;
        state.elapsed_ms = 0;
        state.attacking_team = match state.attacking_team {
            Team::Alliance => Team::Horde,
            Team::Horde => Team::Alliance,
        };
        Some(outcome)
    }

    fn gate_key(&self, gate: EntityId) -> String {
        format!("gate_{}_destroyed", gate.0)
    }

    fn boss_key(&self) -> String {
        "boss_defeated".into()
    }
}

impl Script for SiegeScript {
    fn map_id(&self) -> u32 {
        self.map_id
    }

    fn initial_objectives(&self) -> Vec<Objective> {
        let mut objectives: Vec<Objective> = self
            .gates
            .iter()
            .enumerate()
            .map(|(i, &id)| Objective {
                id,
                kind: ObjectiveKind::Gate,
                state: ObjectiveState::Neutral,
                position: (i as f32 * 60.0, 0.0),
                capture_progress: 0.0,
                strategic_weight: 1.0,
            })
            .collect();
        objectives.push(Objective {
            id: self.boss,
            kind: ObjectiveKind::Boss,
            state: ObjectiveState::Neutral,
            position: (self.gates.len() as f32 * 60.0 + 30.0, 0.0),
            capture_progress: 0.0,
            strategic_weight: 2.0,
        });
        objectives
    }

    fn spawn_positions(&self, team: Team) -> Vec<(f32, f32)> {
        if team == self.attacking_team() {
            vec![(-40.0, 0.0)]
        } else {
            vec![(self.gates.len() as f32 * 60.0 + 80.0, 0.0)]
        }
    }

    fn graveyard_positions(&self, team: Team) -> Vec<(f32, f32)> {
        self.spawn_positions(team)
    }

    fn initial_world_state(&self) -> HashMap<String, i64> {
        let mut m = HashMap::new();
        for &gate in &self.gates {
            m.insert(self.gate_key(gate), 0);
        }
        m.insert(self.boss_key(), 0);
        m.insert("alliance_score".into(), 0);
        m.insert("horde_score".into(), 0);
        m
    }

    fn interpret_world_state_delta(&self, key: &str, value: i64) -> Option<(EntityId, ObjectiveState)> {
        if key == self.boss_key() {
            let state = if value != 0 { ObjectiveState::Destroyed } else { ObjectiveState::Neutral };
            return Some((self.boss, state));
        }
        let gate = *self.gates.iter().find(|g| self.gate_key(**g) == key)?;
        let state = if value != 0 { ObjectiveState::Destroyed } else { ObjectiveState::Neutral };
        Some((gate, state))
    }

    fn extract_score(&self, world_state: &HashMap<String, i64>) -> (u32, u32) {
        let a = (*world_state.get("alliance_score").unwrap_or(&0)).max(0) as u32;
        let h = (*world_state.get("horde_score").unwrap_or(&0)).max(0) as u32;
        (a, h)
    }

    /// Attackers crew vehicles and push the gate chain; defenders man
    /// turrets and hold the line. Once the chain is down, a slice of the
    /// attack force peels off to assault the boss.
    fn recommend_roles(&self, decision: &StrategicDecision) -> HashMap<BgRole, u32> {
        let mut m = HashMap::new();
        let attacking = matches!(decision.strategy, Strategy::Aggressive | Strategy::AllIn | Strategy::Comeback);
        if attacking {
            m.insert(BgRole::VehicleDriver, 2);
            m.insert(BgRole::VehicleGunner, 2);
            m.insert(BgRole::NodeAttacker, 4);
            m.insert(BgRole::HealerOffense, 2);
            if decision.strategy == Strategy::AllIn {
                m.insert(BgRole::BossAssault, 3);
            }
        } else {
            m.insert(BgRole::NodeDefender, 4);
            m.insert(BgRole::TurretOperator, 2);
            m.insert(BgRole::HealerDefense, 2);
            m.insert(BgRole::Roamer, 2);
        }
        m
    }

    /// `control_fraction` stands in for fraction of the gate chain breached;
    /// rushing the boss once it's fully open outranks everything else.
    fn adjust_strategy(&self, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> Strategy {
        if control_fraction >= 1.0 {
            Strategy::AllIn
        } else if control_fraction < 0.2 && time_remaining_ms < 120_000 {
            Strategy::Comeback
        } else if score_advantage <= -5 {
            Strategy::Aggressive
        } else {
            Strategy::Balanced
        }
    }

    fn attack_priority(&self, objectives: &[Objective]) -> Vec<EntityId> {
        let mut order: Vec<EntityId> =
            self.gates.iter().copied().filter(|&g| objectives.iter().any(|o| o.id == g && o.state != ObjectiveState::Destroyed)).collect();
        if self.can_attack_boss(objectives) && !self.boss_defeated(objectives) {
            order.push(self.boss);
        }
        order
    }

    fn defend_priority(&self, objectives: &[Objective]) -> Vec<EntityId> {
        // The front-most standing gate is the line that matters; everything
        // behind it is moot until it falls.
        self.gates
            .iter()
            .copied()
            .find(|&g| objectives.iter().any(|o| o.id == g && o.state != ObjectiveState::Destroyed))
            .into_iter()
            .collect()
    }

    fn win_probability(&self, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> f32 {
        let _ = time_remaining_ms;
        (0.5 + score_advantage as f32 * 0.02 + (control_fraction - 0.5) * 0.5).clamp(0.0, 1.0)
    }

    fn on_tick(&self, dt_ms: u64) {
        self.advance_round_clock(dt_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> SiegeScript {
        SiegeScript::new(4, vec![EntityId(1), EntityId(2), EntityId(3)], EntityId(99), 2, Team::Alliance)
    }

    fn objectives_with_gates_destroyed(s: &SiegeScript, count: usize) -> Vec<Objective> {
        let mut objectives = s.initial_objectives();
        for o in objectives.iter_mut().take(count) {
            o.state = ObjectiveState::Destroyed;
        }
        objectives
    }

    #[test]
    fn boss_is_unreachable_until_every_gate_falls() {
        let s = script();
        assert!(!s.can_attack_boss(&objectives_with_gates_destroyed(&s, 2)));
        assert!(s.can_attack_boss(&objectives_with_gates_destroyed(&s, 3)));
    }

    #[test]
    fn attack_priority_appends_boss_only_once_chain_is_down() {
        let s = script();
        let partial = objectives_with_gates_destroyed(&s, 2);
        assert!(!s.attack_priority(&partial).contains(&EntityId(99)));

        let full = objectives_with_gates_destroyed(&s, 3);
        assert_eq!(s.attack_priority(&full), vec![EntityId(99)]);
    }

    #[test]
    fn round_one_sets_the_benchmark_round_two_is_measured_against() {
        let s = script();
        s.advance_round_clock(90_000);
        let first = s.finish_round().unwrap();
        assert_eq!(first, RoundOutcome::Baseline { elapsed_ms: 90_000 });
        assert_eq!(s.attacking_team(), Team::Horde, "sides swap after round one");

        s.advance_round_clock(60_000);
        let second = s.finish_round().unwrap();
        assert_eq!(second, RoundOutcome::FasterThanRoundOne { elapsed_ms: 60_000, round_one_ms: 90_000 });
    }

    #[test]
    fn full_gate_control_pushes_to_all_in() {
        let s = script();
        assert_eq!(s.adjust_strategy(0, 1.0, 300_000), Strategy::AllIn);
    }
}
