#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # Kickoff HQ
//!
//! Timed-progress core for Kickoff Club HQ: building upgrades, practice-field
//! drills, squad training, missions and energy regeneration.
//!
//! This library re-exports the workspace crates and hosts the pieces the
//! `kickoff` binary is built from.

pub use kickoff_backend;
pub use kickoff_core;
pub use kickoff_poller;
pub use kickoff_timing;

pub mod cli;
pub mod config;
pub mod progress;
pub mod simulate;

pub use config::KickoffConfig;
