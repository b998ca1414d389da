//! Core error and result types for Kickoff HQ.
//!
//! All fallible operations across the workspace return [`Result`], and every
//! [`Error`] is recoverable: callers surface [`Error::user_message`] and reload.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod result;

pub use error::Error;
pub use result::{Result, ResultExt};
