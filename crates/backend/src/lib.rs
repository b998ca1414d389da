//! Backend contract and collect client for Kickoff HQ.
//!
//! The backend owns timers, balances, and rewards. The client advises on
//! readiness; the backend decides.
//!
//! - [`Backend`] is the async contract; [`InMemoryBackend`] implements it
//!   for tests and the simulator, [`TracingBackend`] wraps any backend with
//!   tracing
//! - [`CollectClient`] performs collects with a timeout and a single retry,
//!   then refreshes the cached listing and balance
//! - [`ResourceRecord`] and [`CollectRecord`] are the wire shapes

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod backend;
pub mod collect;
pub mod memory;
pub mod record;
pub mod types;

pub use backend::{Backend, TracingBackend};
pub use collect::{CollectClient, CollectConfig, CollectReport, calculate_backoff, jittered_backoff};
pub use memory::InMemoryBackend;
pub use record::{CollectRecord, ResourceRecord, into_resources};
pub use types::{Balance, BalanceDelta, Cost, Reward, StartRequest};
