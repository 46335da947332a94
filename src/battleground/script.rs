//! Map-script interface (§4.5) and the explicit registry that replaces the
//! static-init auto-registration the original source relied on (§9).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::event::CombatEvent;
use crate::ids::EntityId;

use super::{BgRole, Objective, Strategy, StrategicDecision, Team};

/// Everything a concrete map (CTF, Domination, ...) supplies to the
/// coordinator. Each script owns its own world-state key interpretation —
/// the registry never shares key namespaces across scripts (§9).
pub trait Script: Send + Sync {
    fn map_id(&self) -> u32;
    fn player_limit(&self) -> u32 {
        40
    }
    fn initial_objectives(&self) -> Vec<Objective>;
    fn spawn_positions(&self, team: Team) -> Vec<(f32, f32)>;
    fn strategic_positions(&self) -> Vec<(f32, f32)> {
        Vec::new()
    }
    fn graveyard_positions(&self, team: Team) -> Vec<(f32, f32)>;
    fn initial_world_state(&self) -> HashMap<String, i64> {
        HashMap::new()
    }
    /// Interprets a raw world-state key/value delta as an objective state
    /// change, or `None` if the key isn't one this script recognises.
    fn interpret_world_state_delta(&self, key: &str, value: i64) -> Option<(EntityId, crate::battleground::ObjectiveState)>;
    /// (own_score, enemy_score).
    fn extract_score(&self, world_state: &HashMap<String, i64>) -> (u32, u32);
    fn recommend_roles(&self, decision: &StrategicDecision) -> HashMap<BgRole, u32>;
    fn adjust_strategy(&self, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> Strategy;
    fn attack_priority(&self, objectives: &[Objective]) -> Vec<EntityId>;
    fn defend_priority(&self, objectives: &[Objective]) -> Vec<EntityId>;
    fn win_probability(&self, score_advantage: i32, control_fraction: f32, time_remaining_ms: u64) -> f32;
    fn on_tick(&self, _dt_ms: u64) {}
    fn on_event(&self, _event: &CombatEvent) {}
}

type Factory = Arc<dyn Fn() -> Box<dyn Script> + Send + Sync>;

/// Map id → script factory. Populated explicitly by the host at subsystem
/// init; there is no `inventory`/`ctor`-style auto-registration here.
#[derive(Default)]
pub struct ScriptRegistry {
    factories: Mutex<HashMap<u32, Factory>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, map_id: u32, factory: F)
    where
        F: Fn() -> Box<dyn Script> + Send + Sync + 'static,
    {
        self.factories.lock().unwrap().insert(map_id, Arc::new(factory));
    }

    pub fn create(&self, map_id: u32) -> Option<Box<dyn Script>> {
        self.factories.lock().unwrap().get(&map_id).map(|f| f())
    }

    pub fn is_registered(&self, map_id: u32) -> bool {
        self.factories.lock().unwrap().contains_key(&map_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battleground::scripts::ctf::CtfScript;

    #[test]
    fn registry_creates_script_by_map_id() {
        let registry = ScriptRegistry::new();
        registry.register(1, || Box::new(CtfScript::new(1, EntityId(100), EntityId(200))));
        assert!(registry.is_registered(1));
        let script = registry.create(1).unwrap();
        assert_eq!(script.map_id(), 1);
        assert!(registry.create(2).is_none());
    }
}
