//! # Kickoff HQ
//!
//! Entry point for the `kickoff` binary.
//!
//! - `kickoff progress` computes one countdown and prints it
//! - `kickoff simulate` runs an in-memory HQ session on an accelerated clock
//!
//! Configuration is loaded first so its logging filter can seed the tracing
//! subscriber; `RUST_LOG` still overrides it.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use kickoff::cli::{Cli, Commands};
use kickoff::config::KickoffConfig;
use kickoff::progress;
use kickoff::simulate::{self, Outcome};
use kickoff_timing::ScaledClock;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => KickoffConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => KickoffConfig::default(),
    };

    init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Progress {
            started_at,
            duration_ms,
            completes_at,
            now,
            style,
            json,
        } => {
            let report = progress::report(
                started_at,
                duration_ms,
                completes_at,
                now.unwrap_or_else(Utc::now),
                style.into(),
            )
            .context("Invalid countdown")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to encode report")?
                );
            } else {
                println!("{report}");
            }
        }
        Commands::Simulate { speed } => {
            if let Some(speed) = speed {
                config.simulation.speed = speed;
                config.validate().context("Invalid simulation speed")?;
            }

            info!(speed = config.simulation.speed, "Starting simulated HQ session");
            let clock = Arc::new(ScaledClock::new(Utc::now(), config.simulation.speed));
            let summary = simulate::run(&config, clock)
                .await
                .context("Simulation failed")?;

            for (kind, outcome) in &summary.outcomes {
                let kind = kind.to_string();
                match outcome {
                    Outcome::Collected(reward) if reward.withered => {
                        println!("{kind:<16} withered (no reward)");
                    }
                    Outcome::Collected(reward) => println!(
                        "{kind:<16} +{} coins +{} xp +{} skill +{} knowledge",
                        reward.coins, reward.xp, reward.skill_points, reward.knowledge_points
                    ),
                    Outcome::Expired => println!("{kind:<16} expired"),
                    Outcome::Failed(reason) => println!("{kind:<16} failed: {reason}"),
                }
            }
            if let Some(balance) = &summary.balance {
                println!(
                    "balance: {} coins, {} energy, {} xp, {} skill, {} knowledge",
                    balance.coins,
                    balance.energy,
                    balance.xp,
                    balance.skill_points,
                    balance.knowledge_points
                );
            }
            if summary.unfinished > 0 {
                println!("{} activities still running", summary.unfinished);
            }
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
