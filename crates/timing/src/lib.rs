//! Timed progress model for Kickoff HQ.
//!
//! Building upgrades, practice-field drills, squad training, mission expiry
//! and energy regeneration all reduce to the same computation: given a start,
//! a duration or deadline, and `now`, how far along is it and how long is left.
//!
//! - [`Window`] unifies duration-based and deadline-based timestamps
//! - [`compute_progress`] turns a window and `now` into a [`Progress`]
//! - [`TimedResource`] adds identity, kind and lifecycle on top
//! - [`format_remaining`] renders countdown labels
//! - [`Clock`] abstracts the wall clock so callers can inject time
//!
//! # Example
//!
//! ```
//! use chrono::{DateTime, TimeDelta, Utc};
//! use kickoff_timing::{compute_progress, format_remaining};
//!
//! let start: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap_or_default();
//! let now = start + TimeDelta::seconds(150);
//! let p = compute_progress(start, TimeDelta::minutes(5), now);
//! assert_eq!(p.elapsed_fraction, Some(0.5));
//! assert_eq!(format_remaining(p.remaining_ms), "2m 30s");
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod clock;
pub mod energy;
pub mod format;
pub mod resource;
pub mod types;
pub mod window;

pub use clock::{Clock, ManualClock, ScaledClock, SystemClock};
pub use energy::{EnergyMeter, EnergyReading};
pub use format::{READY_LABEL, RemainingStyle, format_remaining, format_remaining_with};
pub use resource::TimedResource;
pub use types::{PollCadence, ResourceId, ResourceKind, ResourceState};
pub use window::{Progress, Window, compute_progress, remaining_until};
