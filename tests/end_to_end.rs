//! End-to-end scenarios exercising the public API across module boundaries.

use std::sync::Arc;

use botcoord_core::arena::{CCChainManager, EnemyStatus, KillTargetManager};
use botcoord_core::battleground::{scripts::ctf::CtfScript, BattlegroundCoordinator, Strategy};
use botcoord_core::claim::{ClaimCallback, ClaimKey, ClaimResolver, ClaimStatus};
use botcoord_core::death::CorpseTracker;
use botcoord_core::dr::{CcCategory, DrTracker};
use botcoord_core::dungeon::{GroupMember, WipePhase, WipeRecoveryManager};
use botcoord_core::ids::{EntityId, Role};
use botcoord_core::message::{ClaimPriority, MessageBuilder, MessageIdGen, MessageKind};

struct RecordingCallback {
    results: std::sync::Mutex<Vec<(EntityId, ClaimStatus)>>,
}

impl ClaimCallback for RecordingCallback {
    fn on_resolved(&self, claimer: EntityId, _key: ClaimKey, status: ClaimStatus) {
        self.results.lock().unwrap().push((claimer, status));
    }
}

/// Scenario 1: three DPS submit competing interrupt claims at staggered
/// times with descending priority; only the highest-priority submission is
/// granted once the claim window closes.
#[test]
fn interrupt_race_grants_only_the_critical_priority_claim() {
    let resolver = ClaimResolver::new(200);
    let ids = MessageIdGen::default();
    let group = EntityId(1);
    let target = EntityId(2); // the caster E being interrupted
    let spell_id = 555;

    let agent_a = EntityId(10);
    let agent_b = EntityId(11);
    let agent_c = EntityId(12);

    let callback = Arc::new(RecordingCallback { results: std::sync::Mutex::new(Vec::new()) });

    let msg_a = MessageBuilder::new(&ids, MessageKind::ClaimInterrupt, agent_a, group, 5)
        .target(target)
        .spell_id(spell_id)
        .priority(ClaimPriority::CRITICAL)
        .build();
    let msg_b = MessageBuilder::new(&ids, MessageKind::ClaimInterrupt, agent_b, group, 10)
        .target(target)
        .spell_id(spell_id)
        .priority(ClaimPriority::HIGH)
        .build();
    let msg_c = MessageBuilder::new(&ids, MessageKind::ClaimInterrupt, agent_c, group, 30)
        .target(target)
        .spell_id(spell_id)
        .priority(ClaimPriority::MEDIUM)
        .build();

    assert_eq!(resolver.submit(&msg_a, 5, Some(callback.clone())), ClaimStatus::Pending);
    assert_eq!(resolver.submit(&msg_b, 10, Some(callback.clone())), ClaimStatus::Pending);
    assert_eq!(resolver.submit(&msg_c, 30, Some(callback.clone())), ClaimStatus::Pending);

    resolver.process_pending(200);

    let key = msg_a.claim_key().unwrap();
    assert_eq!(resolver.current_claimer(key), Some(agent_a));

    let results = callback.results.lock().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results.iter().find(|(a, _)| *a == agent_a).unwrap().1, ClaimStatus::Granted);
    assert_eq!(results.iter().find(|(a, _)| *a == agent_b).unwrap().1, ClaimStatus::Denied);
    assert_eq!(results.iter().find(|(a, _)| *a == agent_c).unwrap().1, ClaimStatus::Denied);
}

/// Scenario 2: a focus target 2.5x better-scored than the current one is
/// vetoed before the minimum focus time elapses, then accepted once it has.
#[test]
fn kill_target_switch_is_vetoed_until_minimum_focus_time_elapses() {
    let mut manager = KillTargetManager::new(1.5, 3_000);
    let e1 = EnemyStatus {
        id: EntityId(1),
        hp_fraction: 0.6,
        trinket_down: false,
        defensives_down: false,
        is_healer: false,
        in_range_and_los: true,
        recent_damage_to_target: 0.0,
        is_cced: false,
    };
    manager.update(0, &[e1], None);
    assert_eq!(manager.current_target(), Some(e1.id));

    let e2 = EnemyStatus {
        id: EntityId(2),
        hp_fraction: 0.05,
        trinket_down: true,
        defensives_down: true,
        is_healer: true,
        in_range_and_los: true,
        recent_damage_to_target: 0.0,
        is_cced: false,
    };

    // E2 clears the re-eval cadence and the score-margin threshold on the
    // very next tick, but only 600ms have passed on the current target.
    manager.update(600, &[e1, e2], None);
    assert_eq!(manager.current_target(), Some(e1.id), "switch vetoed before 3s minimum focus time");

    // Still short of 3s cumulative focus time.
    manager.update(2_000, &[e1, e2], None);
    assert_eq!(manager.current_target(), Some(e1.id), "switch still vetoed at 2.6s on target");

    // Cumulative 3.1s on target clears the focus-time gate.
    manager.update(500, &[e1, e2], None);
    assert_eq!(manager.current_target(), Some(e2.id), "switch accepted once gates clear");
}

/// Scenario 3: successive fear applications on the same target halve
/// expected duration each time until the sub-500ms immunity gate rejects it.
#[test]
fn dr_chain_halves_then_refuses_a_near_immune_application() {
    let mut dr = DrTracker::new();
    let mut cc = CCChainManager::new(0);
    let target = EntityId(1);
    cc.start_chain(target);

    let link_a = cc.plan_next(&mut dr, EntityId(10), CcCategory::Fear, 1, 4_000, 0).unwrap();
    assert_eq!(link_a.expected_duration_ms, 4_000);

    let link_b = cc.plan_next(&mut dr, EntityId(11), CcCategory::Fear, 2, 4_000, 3_000).unwrap();
    assert_eq!(link_b.expected_duration_ms, 2_000);

    let link_c = cc.plan_next(&mut dr, EntityId(12), CcCategory::Fear, 3, 4_000, 6_000).unwrap();
    assert_eq!(link_c.expected_duration_ms, 1_000);

    let link_d = cc.plan_next(&mut dr, EntityId(13), CcCategory::Fear, 4, 4_000, 9_000);
    assert!(link_d.is_none(), "fourth application's 500ms expected duration is below the minimum gate");
}

/// Scenario 4: once a carrier's debuff reaches the configured critical
/// stacks, the coordinator's strategy shifts toward pressuring the break.
#[test]
fn flag_standoff_shifts_strategy_once_carrier_debuff_escalates() {
    assert_eq!(CtfScript::carrier_debuff_tier(0), 0);
    assert_eq!(CtfScript::carrier_debuff_tier(10 * 60_000), 1);

    let mut bg = BattlegroundCoordinator::new();
    bg.load_script(Box::new(CtfScript::new(1, EntityId(1), EntityId(2))));
    bg.open();
    bg.decision.strategy = Strategy::Balanced;
    bg.decision.confidence = 0.5;

    // Strong lead and majority map control recommend Aggressive immediately,
    // but the 30s min-interval still gates the very first switch attempt.
    bg.update_strategy(5_000, 6, 0.7, 600_000);
    assert_eq!(bg.decision.strategy, Strategy::Balanced);

    bg.update_strategy(30_000, 6, 0.7, 570_000);
    assert_eq!(bg.decision.strategy, Strategy::Aggressive);
}

/// Scenario 5: a full group wipe recovers through every phase in order,
/// rezzing healer-with-battle-rez before tank before remaining DPS.
#[test]
fn wipe_recovery_runs_every_phase_in_order_to_ready() {
    let mut mgr = WipeRecoveryManager::new();
    let group = vec![
        GroupMember { agent: EntityId(1), role: Role::Tank, has_battle_rez: false },
        GroupMember { agent: EntityId(2), role: Role::Healer, has_battle_rez: true },
        GroupMember { agent: EntityId(3), role: Role::Dps, has_battle_rez: false },
        GroupMember { agent: EntityId(4), role: Role::Dps, has_battle_rez: false },
        GroupMember { agent: EntityId(5), role: Role::Healer, has_battle_rez: false },
    ];
    mgr.start(&group);
    assert_eq!(mgr.phase, WipePhase::Waiting);

    mgr.release();
    assert_eq!(mgr.phase, WipePhase::Releasing);
    mgr.begin_run_back();
    assert_eq!(mgr.phase, WipePhase::RunningBack);

    let expected_order = [EntityId(2), EntityId(5), EntityId(1), EntityId(3), EntityId(4)];
    for agent in expected_order {
        mgr.member_arrived(agent);
        assert_eq!(mgr.next_to_rez(), Some(agent));
        mgr.rez_complete(agent);
    }
    assert_eq!(mgr.phase, WipePhase::Rebuffing);

    mgr.rebuffs_done();
    assert_eq!(mgr.phase, WipePhase::ManaRegen);
    assert!(!mgr.update(30_000, 0.5));
    assert!(mgr.update(5_000, 0.85));
    assert!(mgr.is_ready());
}

/// Scenario 6: a corpse held by a scoped reference cannot be removed until
/// the reference is released, matching the publication-pass race the
/// subsystem exists to avoid.
#[test]
fn safe_corpse_removal_is_denied_while_a_scoped_reference_is_outstanding() {
    let tracker = CorpseTracker::new(30);
    let owner = EntityId(1);
    let corpse = EntityId(2);
    tracker.register_corpse(corpse, owner, (5.0, 5.0), 0);

    let guard = tracker.scoped_guard(corpse).unwrap();
    assert!(!tracker.try_remove(corpse), "publication pass still holds a reference");

    drop(guard);
    assert!(tracker.try_remove(corpse));
    assert!(!tracker.is_tracked(corpse));
}
