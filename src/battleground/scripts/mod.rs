//! Concrete map scripts, one per battleground base: CTF, Domination,
//! Resource-race, and Siege. Epic remains a trait-level extension point (§9)
//! — a concrete Epic script adds no mechanic these four don't already cover
//! at the base level, so it is left for a host that wants one.

pub mod ctf;
pub mod domination;
pub mod resource_race;
pub mod siege;
