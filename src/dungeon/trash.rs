//! Trash-pull planning (§4.6): CC need detection, kill-order/CC assignment,
//! and the `IsSafeToPull` gate.

use crate::ids::EntityId;

#[derive(Debug, Clone)]
pub struct TrashPack {
    pub id: EntityId,
    pub members: Vec<EntityId>,
    pub elite_modifier: f32,
    pub casters: Vec<EntityId>,
    pub healers: Vec<EntityId>,
    pub linked_packs: Vec<EntityId>,
    pub position: (f32, f32),
}

/// Marker assigned to a CC target, reusing familiar raid-marker names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Skull,
    Cross,
    Diamond,
    Moon,
    Square,
}

#[derive(Debug, Clone)]
pub struct PullPlan {
    pub pack_id: EntityId,
    pub kill_order: Vec<(EntityId, Marker)>,
    pub cc_assignments: Vec<(EntityId, Marker)>,
    pub puller: EntityId,
}

const ROLE_CAPACITY: f32 = 2.0; // one tank + one CC-capable dps/healer handled without extra CC

#[derive(Default)]
pub struct TrashPullManager;

impl TrashPullManager {
    pub fn new() -> Self {
        Self
    }

    pub fn needs_cc(&self, pack: &TrashPack) -> bool {
        (pack.members.len() as f32 * pack.elite_modifier) > ROLE_CAPACITY
    }

    /// `tank` pulls from melee range, or a ranged `fallback_puller` from
    /// behind LOS when no tank is supplied.
    pub fn build_plan(&self, pack: &TrashPack, tank: Option<EntityId>, fallback_puller: EntityId) -> PullPlan {
        let puller = tank.unwrap_or(fallback_puller);

        let highest_threat_non_caster = pack
            .members
            .iter()
            .find(|m| !pack.casters.contains(m))
            .copied()
            .unwrap_or(pack.members[0]);

        let mut kill_order = vec![(highest_threat_non_caster, Marker::Skull)];
        for &caster in &pack.casters {
            kill_order.push((caster, Marker::Cross));
        }
        for &m in &pack.members {
            if m != highest_threat_non_caster && !pack.casters.contains(&m) && !kill_order.iter().any(|(id, _)| *id == m) {
                kill_order.push((m, Marker::Square));
            }
        }

        let cc_markers = [Marker::Diamond, Marker::Moon, Marker::Square];
        let cc_assignments = if self.needs_cc(pack) {
            pack.casters
                .iter()
                .chain(pack.healers.iter())
                .enumerate()
                .map(|(i, &id)| (id, cc_markers[i % cc_markers.len()]))
                .collect()
        } else {
            Vec::new()
        };

        PullPlan { pack_id: pack.id, kill_order, cc_assignments, puller }
    }

    /// §4.6: group not in combat, tank/healer mana above threshold, all
    /// alive, no wandering patrols within pull range.
    pub fn is_safe_to_pull(
        &self,
        group_in_combat: bool,
        tank_mana_fraction: f32,
        healer_mana_fraction: f32,
        all_alive: bool,
        wandering_patrols_nearby: bool,
    ) -> bool {
        !group_in_combat
            && tank_mana_fraction >= 0.50
            && healer_mana_fraction >= 0.80
            && all_alive
            && !wandering_patrols_nearby
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack() -> TrashPack {
        TrashPack {
            id: EntityId(1),
            members: vec![EntityId(10), EntityId(11), EntityId(12)],
            elite_modifier: 1.0,
            casters: vec![EntityId(11)],
            healers: vec![],
            linked_packs: vec![],
            position: (0.0, 0.0),
        }
    }

    #[test]
    fn plan_marks_skull_on_non_caster_and_cross_on_caster() {
        let mgr = TrashPullManager::new();
        let plan = mgr.build_plan(&pack(), Some(EntityId(99)), EntityId(98));
        assert_eq!(plan.puller, EntityId(99));
        assert!(plan.kill_order.contains(&(EntityId(10), Marker::Skull)));
        assert!(plan.kill_order.contains(&(EntityId(11), Marker::Cross)));
    }

    #[test]
    fn small_pack_needs_no_cc() {
        let mgr = TrashPullManager::new();
        let p = pack();
        assert!(!mgr.needs_cc(&p));
        let plan = mgr.build_plan(&p, None, EntityId(98));
        assert!(plan.cc_assignments.is_empty());
        assert_eq!(plan.puller, EntityId(98));
    }

    #[test]
    fn safe_to_pull_requires_all_gates() {
        let mgr = TrashPullManager::new();
        assert!(mgr.is_safe_to_pull(false, 0.6, 0.9, true, false));
        assert!(!mgr.is_safe_to_pull(true, 0.6, 0.9, true, false)); // in combat
        assert!(!mgr.is_safe_to_pull(false, 0.4, 0.9, true, false)); // tank mana low
        assert!(!mgr.is_safe_to_pull(false, 0.6, 0.7, true, false)); // healer mana low
        assert!(!mgr.is_safe_to_pull(false, 0.6, 0.9, false, false)); // someone dead
        assert!(!mgr.is_safe_to_pull(false, 0.6, 0.9, true, true)); // patrol nearby
    }
}
