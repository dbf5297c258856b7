//! VitaQuest - gamified wellness backend
//!
//! Users join challenges, report activity progress, and earn points, XP and
//! levels. The heart of the service is the progress-update pipeline:
//!
//! 1. **Validator** - is the reported activity legal for the challenge's
//!    category, and is the amount within the anti-cheat ceiling?
//! 2. **Accumulator** - merge the amount into the stored progress and keep
//!    the per-challenge day streak honest.
//! 3. **Completion engine** - exactly once per challenge instance, flip the
//!    record to completed, credit points/XP, recompute the level, extend the
//!    global streak and cascade into achievement unlocks.
//!
//! The whole pipeline for one (user, challenge) pair runs inside a single
//! SQLite transaction with an optimistic version check on the progress row,
//! so a completion can never be credited twice.

pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod feed;
pub mod recommend;
pub mod rules;
pub mod seed;
pub mod server;

pub use domain::*;
pub use error::EngineError;
