//! Simulated HQ session end-to-end.
//!
//! Runs a full session on a heavily accelerated clock and checks that every
//! started activity reaches an outcome and rewards land in the balance.

// Integration tests allow unwrap/panic for assertions
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(clippy::arithmetic_side_effects)]

use std::sync::Arc;

use chrono::Utc;
use kickoff::config::KickoffConfig;
use kickoff::simulate::{self, Outcome};
use kickoff_timing::{ResourceKind, ScaledClock};

fn fast_config() -> KickoffConfig {
    let config = KickoffConfig::from_toml_str(
        r#"
        [poller]
        single_interval_ms = 10
        list_interval_ms = 10

        [simulation]
        speed = 10000
        max_wall_ms = 10000
        "#,
    );
    match config {
        Ok(config) => config,
        Err(e) => panic!("config should be valid: {e}"),
    }
}

#[tokio::test]
async fn session_collects_every_activity() {
    let config = fast_config();
    let clock = Arc::new(ScaledClock::new(Utc::now(), config.simulation.speed));

    let summary = match simulate::run(&config, clock).await {
        Ok(summary) => summary,
        Err(e) => panic!("session should run: {e}"),
    };

    assert_eq!(summary.unfinished, 0);
    assert_eq!(summary.outcomes.len(), 4);
    assert!(
        summary
            .outcomes
            .iter()
            .all(|(_, outcome)| matches!(outcome, Outcome::Collected(_)))
    );

    // The mission is claimed straight away, before anything else completes.
    assert!(matches!(
        summary.outcomes.first(),
        Some((ResourceKind::Mission, Outcome::Collected(reward))) if reward.coins == 50
    ));

    // 500 starting coins, 100 spent on the upgrade; the drill's 30 coins
    // only arrive if it was collected before withering.
    let coins = summary.balance.map(|b| b.coins).unwrap_or_default();
    assert!(coins == 460 || coins == 490, "unexpected coins: {coins}");
    assert!(summary.rewarded() >= 3);
}

#[tokio::test]
async fn session_spends_energy() {
    let config = fast_config();
    let clock = Arc::new(ScaledClock::new(Utc::now(), config.simulation.speed));
    let summary = simulate::run(&config, clock).await.unwrap();

    // Three points spent on the drill and training; at 10000x a regen
    // interval of 600 s passes in 60 ms, so some may have come back.
    assert!(summary.energy.energy >= 7);
    assert!(summary.energy.energy <= summary.energy.max);
}
