//! Countdown poller for timed resources.
//!
//! A single reusable poller watches a set of [`TimedResource`]s on a fixed
//! cadence and reports to a [`CountdownSink`]:
//!
//! - `render` every tick with the current [`TickView`]
//! - `on_ready` exactly once per resource, on its ready edge
//! - `on_terminal` once when a resource is collected, expires or withers,
//!   after which it is no longer polled
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kickoff_poller::{ChannelSink, CountdownPoller, PollerConfig};
//! use kickoff_timing::SystemClock;
//!
//! let (sink, mut events) = ChannelSink::new();
//! let handle = CountdownPoller::new(PollerConfig::single_item(), Arc::new(SystemClock))
//!     .spawn(resources, Arc::new(sink))?;
//!
//! while let Some(event) = events.recv().await {
//!     // update the screen, reload on ready, ...
//! }
//! handle.shutdown().await?;
//! ```
//!
//! [`TimedResource`]: kickoff_timing::TimedResource

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod board;
pub mod edge;
pub mod poller;
pub mod sink;

pub use board::{CountdownBoard, Evaluation};
pub use edge::ReadyEdge;
pub use poller::{CountdownPoller, PollerConfig, PollerHandle};
pub use sink::{ChannelSink, CountdownSink, PollerEvent, TickView};
