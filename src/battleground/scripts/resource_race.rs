//! Resource-race script: carts haul progress along a track toward each
//! faction's depot, track direction at an intersection follows whichever
//! faction controls it, and carts are contestable while in transit.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::battleground::{BgRole, Objective, ObjectiveKind, ObjectiveState, Script, Strategy, StrategicDecision, Team};
use crate::ids::EntityId;

#[derive(Clone, Copy)]
struct CartState {
    progress: f32,
    controller: Option<Team>,
    contested: bool,
}

impl Default for CartState {
    fn default() -> Self {
        Self { progress: 0.0, controller: None, contested: false }
    }
}

pub struct ResourceRaceScript {
    map_id: u32,
    carts: Vec<EntityId>,
    intersection_count: u32,
    points_per_capture: u32,
    state: Mutex<Vec<CartState>>,
    intersection_control: Mutex<Vec<Option<Team>>>,
}

impl ResourceRaceScript {
    pub fn new(map_id: u32, carts: Vec<EntityId>, intersection_count: u32, points_per_capture: u32) -> Self {
        let state = Mutex::new(vec![CartState::default(); carts.len()]);
        let intersection_control = Mutex::new(vec![None; intersection_count as usize]);
        Self { map_id, carts, intersection_count, points_per_capture, state, intersection_control }
    }

    pub fn points_per_capture(&self) -> u32 {
        self.points_per_capture
    }

    fn cart_index(&self, cart: EntityId) -> Option<usize> {
        self.carts.iter().position(|&c| c == cart)
    }

    pub fn cart_progress(&self, cart: EntityId) -> f32 {
        self.cart_index(cart).map(|i| self.state.lock().unwrap()[i].progress).unwrap_or(0.0)
    }

    pub fn cart_controller(&self, cart: EntityId) -> Option<Team> {
        self.cart_index(cart).and_then(|i| self.state.lock().unwrap()[i].controller)
    }

    pub fn is_cart_contested(&self, cart: EntityId) -> bool {
        self.cart_index(cart).map(|i| self.state.lock().unwrap()[i].contested).unwrap_or(false)
    }

    pub fn update_cart_state(&self, cart: EntityId, progress: f32, controller: Option<Team>, contested: bool) {
        if let Some(i) = self.cart_index(cart) {
            let mut state = self.state.lock().unwrap();
            state[i] = CartState { progress, controller, contested };
        }
    }

    /// Carts currently controlled by `team`, out of the total track count.
    pub fn carts_controlled_by(&self, team: Team) -> u32 {
        self.state.lock().unwrap().iter().filter(|c| c.controller == Some(team)).count() as u32
    }

    pub fn average_cart_progress(&self) -> f32 {
        let state = self.state.lock().unwrap();
        if state.is_empty() {
            return 0.0;
        }
        state.iter().map(|c| c.progress).sum::<f32>() / state.len() as f32
    }

    /// The cart closest to delivering, used to decide what to escort or
    /// intercept first.
    pub fn most_progressed_cart(&self) -> Option<EntityId> {
        let state = self.state.lock().unwrap();
        state
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.progress.partial_cmp(&b.1.progress).unwrap())
            .map(|(i, _)| self.carts[i])
    }

    pub fn most_contested_cart(&self) -> Option<EntityId> {
        let state = self.state.lock().unwrap();
        state.iter().position(|c| c.contested).map(|i| self.carts[i])
    }

    pub fn set_intersection_controller(&self, intersection: u32, team: Option<Team>) {
        if let Some(slot) = self.intersection_control.lock().unwrap().get_mut(intersection as usize) {
            *slot = team;
        }
    }

    /// The faction a cart stopped at `intersection` should roll toward next;
    /// `None` while the intersection is neutral or contested, in which case
    /// the cart holds position rather than picking a track.
    pub fn next_direction(&self, intersection: u32) -> Option<Team> {
        self.intersection_control.lock().unwrap().get(intersection as usize).copied().flatten()
    }

    fn cart_key(&self, cart: EntityId) -> String {
        format!("cart_{}_progress", cart.0)
    }
}

impl Script for ResourceRaceScript {
    fn map_id(&self) -> u32 {
        self.map_id
    }

    fn initial_objectives(&self) -> Vec<Objective> {
        self.carts
            .iter()
            .enumerate()
            .map(|(i, &id)| Objective {
                id,
                kind: ObjectiveKind::Cart,
                state: ObjectiveState::Neutral,
                position: (i as f32 * 40.0, 0.0),
                capture_progress: 0.0,
                strategic_weight: 1.0,
            })
            .collect()
    }

    fn spawn_positions(&self, team: Team) -> Vec<(f32, f32)> {
        match team {
            Team::Alliance => vec![(-60.0, 0.0)],
            Team::Horde => vec![(self.carts.len() as f32 * 40.0 + 60.0, 0.0)],
        }
    }

    fn strategic_positions(&self) -> Vec<(f32, f32)> {
        (0..self.intersection_count).map(|i| (i as f32 * 40.0 + 20.0, 10.0)).collect()
    }

    fn graveyard_positions(&self, team: Team) -> Vec<(f32, f32)> {
        self.spawn_positions(team)
    }

    fn initial_world_state(&self) -> HashMap<String, i64> {
        let mut m = HashMap::new();
        for &cart in &self.carts {
            m.insert(self.cart_key(cart), 0);
        }
        m.insert("alliance_score".into(), 0);
        m.insert("horde_score".into(), 0);
        m
    }

    fn interpret_world_state_delta(&self, key: &str, value: i64) -> Option<(EntityId, ObjectiveState)> {
        let cart = *self.carts.iter().find(|c| self.cart_key(**c) == key)?;
        let state = match value {
            0 => ObjectiveState::Neutral,
            1 => ObjectiveState::AllianceControlled,
            2 => ObjectiveState::HordeControlled,
            _ => ObjectiveState::Contested,
        };
        Some((cart, state))
    }

    fn extract_score(&self, world_state: &HashMap<String, i64>) -> (u32, u32) {
        let a = (*world_state.get("alliance_score").unwrap_or(&0)).max(0) as u32;
        let h = (*world_state.get("horde_score").unwrap_or(&0)).max(0) as u32;
        (a, h)
    }

    fn recommend_roles(&self, decision: &StrategicDecision) -> HashMap<BgRole, u32> {
        let mut m = HashMap::new();
        match decision.strategy {
            Strategy::Aggressive => {
                m.insert(BgRole::CartPusher, 4);
                m.insert(BgRole::NodeAttacker, 3);
                m.insert(BgRole::Roamer, 2);
                m.insert(BgRole::NodeDefender, 1);
            }
            Strategy::Defensive | Strategy::Turtle => {
                m.insert(BgRole::CartPusher, 5);
                m.insert(BgRole::NodeDefender, 2);
                m.insert(BgRole::Roamer, 1);
                m.insert(BgRole::NodeAttacker, 1);
            }
            Strategy::AllIn => {
                m.insert(BgRole::CartPusher, 3);
                m.insert(BgRole::NodeAttacker, 4);
                m.insert(BgRole::Roamer, 2);
            }
            _ => {
                m.insert(BgRole::CartPusher, 3);
                m.insert(BgRole::NodeAttacker, 2);
                m.insert(BgRole::NodeDefender, 2);
                m.insert(BgRole::Roamer, 2);
            }
        }
        m
    }

    /// Mirrors the cart-control comparison: escort a cart lead, contest when
    /// behind on carts, and go all-in once behind on score with little time
    /// left. `control_fraction` here is the fraction of tracked carts this
    /// faction currently controls.
    fn adjust_strategy(&self, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> Strategy {
        if control_fraction >= 0.66 && score_advantage > 0 {
            Strategy::Defensive
        } else if control_fraction < 0.34 {
            Strategy::Aggressive
        } else if score_advantage <= -5 && time_remaining_ms < 180_000 {
            Strategy::AllIn
        } else {
            Strategy::Balanced
        }
    }

    fn attack_priority(&self, objectives: &[Objective]) -> Vec<EntityId> {
        let state = self.state.lock().unwrap();
        let mut carts: Vec<&Objective> = objectives.iter().filter(|o| o.kind == ObjectiveKind::Cart).collect();
        carts.sort_by(|a, b| {
            let pa = self.cart_index(a.id).map(|i| state[i].progress).unwrap_or(0.0);
            let pb = self.cart_index(b.id).map(|i| state[i].progress).unwrap_or(0.0);
            pb.partial_cmp(&pa).unwrap()
        });
        carts.into_iter().map(|o| o.id).collect()
    }

    fn defend_priority(&self, objectives: &[Objective]) -> Vec<EntityId> {
        self.attack_priority(objectives)
    }

    fn win_probability(&self, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> f32 {
        let _ = time_remaining_ms;
        (0.5 + score_advantage as f32 * 0.025 + (control_fraction - 0.5) * 0.45).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> ResourceRaceScript {
        ResourceRaceScript::new(3, vec![EntityId(1), EntityId(2), EntityId(3)], 2, 200)
    }

    #[test]
    fn cart_control_count_tracks_updates() {
        let s = script();
        s.update_cart_state(EntityId(1), 0.4, Some(Team::Alliance), false);
        s.update_cart_state(EntityId(2), 0.1, Some(Team::Horde), false);
        assert_eq!(s.carts_controlled_by(Team::Alliance), 1);
        assert_eq!(s.carts_controlled_by(Team::Horde), 1);
    }

    #[test]
    fn most_progressed_cart_picks_the_furthest_along() {
        let s = script();
        s.update_cart_state(EntityId(1), 0.2, Some(Team::Alliance), false);
        s.update_cart_state(EntityId(2), 0.9, Some(Team::Alliance), false);
        s.update_cart_state(EntityId(3), 0.5, None, true);
        assert_eq!(s.most_progressed_cart(), Some(EntityId(2)));
        assert_eq!(s.most_contested_cart(), Some(EntityId(3)));
    }

    #[test]
    fn intersection_direction_follows_its_controller() {
        let s = script();
        assert_eq!(s.next_direction(0), None);
        s.set_intersection_controller(0, Some(Team::Horde));
        assert_eq!(s.next_direction(0), Some(Team::Horde));
    }

    #[test]
    fn low_cart_control_recommends_contesting() {
        let s = script();
        assert_eq!(s.adjust_strategy(0, 0.2, 600_000), Strategy::Aggressive);
        assert_eq!(s.adjust_strategy(2, 0.8, 600_000), Strategy::Defensive);
    }
}
