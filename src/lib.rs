//! botcoord_core — coordination core for cooperative MMO bot teams.
//!
//! A deterministic, fixed-timestep coordination layer: a combat event
//! router, a group-scoped message bus with claim resolution, and three
//! domain coordinators (arena, battleground, dungeon) built on top of them.

pub mod arena;
pub mod battleground;
pub mod bus;
pub mod claim;
pub mod config;
pub mod core;
pub mod death;
pub mod dr;
pub mod dungeon;
pub mod event;
pub mod ids;
pub mod message;
pub mod profiler;
pub mod router;
pub mod snapshot;

pub use config::{CoreConfig, CoreError};
pub use core::CoordinationCore;
pub use snapshot::Snapshot;
