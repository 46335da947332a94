//! Basic demonstration of the coordination core.
//!
//! Run with: cargo run --example basic_demo

use botcoord_core::arena::EnemyStatus;
use botcoord_core::ids::EntityId;
use botcoord_core::{CoordinationCore, CoreConfig};

fn main() {
    println!("=== botcoord_core - Coordination Core Demo ===\n");

    let mut core = CoordinationCore::new(CoreConfig::default());

    core.arena.start_gate_countdown();
    core.arena.open_gates();
    println!("Arena state after gates open: {:?}\n", core.arena.state);

    let enemies = vec![
        EnemyStatus {
            id: EntityId(100),
            hp_fraction: 0.9,
            trinket_down: false,
            defensives_down: true,
            is_healer: true,
            in_range_and_los: true,
            recent_damage_to_target: 500.0,
            is_cced: false,
        },
        EnemyStatus {
            id: EntityId(101),
            hp_fraction: 0.4,
            trinket_down: true,
            defensives_down: true,
            is_healer: false,
            in_range_and_los: true,
            recent_damage_to_target: 200.0,
            is_cced: false,
        },
    ];

    println!("Running simulation for 100 ticks (5 seconds at 20 ticks/sec)...\n");
    for tick in 0..100 {
        core.step(1.0 / 20.0, &enemies);

        if (tick + 1) % 20 == 0 {
            println!(
                "--- Tick {} (t={:.1}s) --- kill target: {:?}",
                core.tick_count(),
                core.time_secs(),
                core.arena.kill_target.current_target()
            );
        }
    }

    core.arena.finish();
    println!("\n=== Final arena state: {:?} ===", core.arena.state);
}
