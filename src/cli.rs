//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use kickoff_timing::RemainingStyle;

/// Kickoff HQ - timed progress for building upgrades, drills, training and missions
#[derive(Parser, Debug)]
#[command(name = "kickoff")]
#[command(version)]
#[command(about = "Countdowns, readiness polling, and collection for Kickoff Club HQ")]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute progress for one countdown
    Progress {
        /// When the activity started (RFC 3339)
        #[arg(long)]
        started_at: DateTime<Utc>,

        /// Total duration in milliseconds
        #[arg(long, conflicts_with = "completes_at", required_unless_present = "completes_at")]
        duration_ms: Option<i64>,

        /// When the countdown reaches zero (RFC 3339)
        #[arg(long)]
        completes_at: Option<DateTime<Utc>>,

        /// Evaluate at this instant instead of the current time (RFC 3339)
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Label style
        #[arg(long, value_enum, default_value_t = StyleArg::Ready)]
        style: StyleArg,

        /// Output as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Run an in-memory HQ session on an accelerated clock
    Simulate {
        /// Simulated seconds per real second (overrides the config)
        #[arg(short, long)]
        speed: Option<u32>,
    },
}

/// Countdown label style.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleArg {
    /// `1m 30s`, `Ready!` at zero
    Ready,
    /// `1m 30s`, `0s` at zero
    Building,
    /// `01:30`
    Clock,
}

impl From<StyleArg> for RemainingStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Ready => Self::ReadyLabel,
            StyleArg::Building => Self::Building,
            StyleArg::Clock => Self::Clock,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_progress_with_duration() {
        let cli = Cli::try_parse_from([
            "kickoff",
            "progress",
            "--started-at",
            "2024-01-01T12:00:00Z",
            "--duration-ms",
            "300000",
            "--style",
            "clock",
        ])
        .unwrap();
        match cli.command {
            Commands::Progress {
                duration_ms, style, ..
            } => {
                assert_eq!(duration_ms, Some(300_000));
                assert_eq!(RemainingStyle::from(style), RemainingStyle::Clock);
            }
            Commands::Simulate { .. } => panic!("expected progress"),
        }
    }

    #[test]
    fn test_progress_needs_an_end() {
        let result =
            Cli::try_parse_from(["kickoff", "progress", "--started-at", "2024-01-01T12:00:00Z"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duration_and_deadline_conflict() {
        let result = Cli::try_parse_from([
            "kickoff",
            "progress",
            "--started-at",
            "2024-01-01T12:00:00Z",
            "--duration-ms",
            "1000",
            "--completes-at",
            "2024-01-01T12:00:01Z",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_simulate_with_global_config() {
        let cli = Cli::try_parse_from([
            "kickoff", "simulate", "--speed", "600", "--config", "hq.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("hq.toml")));
        assert!(matches!(cli.command, Commands::Simulate { speed: Some(600) }));
    }
}
