//! Configuration for the kickoff binary.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::Path;
use std::time::Duration;

use chrono::TimeDelta;
use kickoff_backend::{CollectConfig, Cost, Reward, StartRequest};
use kickoff_core::{Error, Result};
use kickoff_poller::PollerConfig;
use kickoff_timing::{PollCadence, ResourceKind};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KickoffConfig {
    #[serde(default)]
    pub poller: PollerSection,
    #[serde(default)]
    pub collect: CollectSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

impl KickoffConfig {
    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigRead` if the file cannot be read, `ConfigParse` if it
    /// is not valid TOML for this schema, or `InvalidConfig` if validation
    /// fails.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| Error::config_read(path, e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParse` or `InvalidConfig`.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.poller.single_interval_ms == 0 {
            return Err(Error::invalid_config(
                "poller.single_interval_ms must be greater than 0",
            ));
        }
        if self.poller.list_interval_ms == 0 {
            return Err(Error::invalid_config(
                "poller.list_interval_ms must be greater than 0",
            ));
        }
        if self.collect.timeout_ms == 0 {
            return Err(Error::invalid_config(
                "collect.timeout_ms must be greater than 0",
            ));
        }
        if self.collect.max_backoff_ms < self.collect.retry_backoff_ms {
            return Err(Error::invalid_config(
                "collect.max_backoff_ms must be at least collect.retry_backoff_ms",
            ));
        }
        self.simulation.validate()
    }

    /// Poller settings for a cadence.
    #[must_use]
    pub const fn poller_config(&self, cadence: PollCadence) -> PollerConfig {
        let interval_ms = match cadence {
            PollCadence::Single => self.poller.single_interval_ms,
            PollCadence::List => self.poller.list_interval_ms,
        };
        PollerConfig::for_cadence(cadence).with_tick_interval(Duration::from_millis(interval_ms))
    }

    /// Collect client settings.
    #[must_use]
    pub const fn collect_config(&self) -> CollectConfig {
        CollectConfig {
            timeout: Duration::from_millis(self.collect.timeout_ms),
            max_retries: self.collect.max_retries,
            retry_backoff: Duration::from_millis(self.collect.retry_backoff_ms),
            max_backoff: Duration::from_millis(self.collect.max_backoff_ms),
        }
    }
}

/// `[poller]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerSection {
    /// Tick interval for a single countdown.
    #[serde(default = "default_single_interval_ms")]
    pub single_interval_ms: u64,

    /// Tick interval for lists and grids.
    #[serde(default = "default_list_interval_ms")]
    pub list_interval_ms: u64,
}

impl Default for PollerSection {
    fn default() -> Self {
        Self {
            single_interval_ms: default_single_interval_ms(),
            list_interval_ms: default_list_interval_ms(),
        }
    }
}

/// `[collect]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectSection {
    /// Per-call timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts after a transient failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Cap on any retry delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for CollectSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

/// `[simulation]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Simulated seconds per real second.
    #[serde(default = "default_speed")]
    pub speed: u32,

    /// Give up after this much real time.
    #[serde(default = "default_max_wall_ms")]
    pub max_wall_ms: u64,

    #[serde(default = "default_starting_coins")]
    pub starting_coins: u64,

    #[serde(default = "default_energy_max")]
    pub energy_max: u32,

    #[serde(default = "default_energy_regen_secs")]
    pub energy_regen_secs: u64,

    #[serde(default = "default_building_secs")]
    pub building_secs: u64,

    #[serde(default = "default_building_cost_coins")]
    pub building_cost_coins: u64,

    #[serde(default = "default_drill_secs")]
    pub drill_secs: u64,

    /// How long a ready drill waits before withering.
    #[serde(default = "default_drill_wither_secs")]
    pub drill_wither_secs: u64,

    #[serde(default = "default_drill_cost_energy")]
    pub drill_cost_energy: u32,

    #[serde(default = "default_training_secs")]
    pub training_secs: u64,

    #[serde(default = "default_training_cost_energy")]
    pub training_cost_energy: u32,

    /// Claim window for the daily mission.
    #[serde(default = "default_mission_window_secs")]
    pub mission_window_secs: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            max_wall_ms: default_max_wall_ms(),
            starting_coins: default_starting_coins(),
            energy_max: default_energy_max(),
            energy_regen_secs: default_energy_regen_secs(),
            building_secs: default_building_secs(),
            building_cost_coins: default_building_cost_coins(),
            drill_secs: default_drill_secs(),
            drill_wither_secs: default_drill_wither_secs(),
            drill_cost_energy: default_drill_cost_energy(),
            training_secs: default_training_secs(),
            training_cost_energy: default_training_cost_energy(),
            mission_window_secs: default_mission_window_secs(),
        }
    }
}

impl SimulationSection {
    /// Validate the simulation settings.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero speed, a zero energy cap or regen
    /// interval, or a duration too large to represent.
    pub fn validate(&self) -> Result<()> {
        if self.speed == 0 {
            return Err(Error::invalid_config("simulation.speed must be greater than 0"));
        }
        if self.energy_max == 0 || self.energy_regen_secs == 0 {
            return Err(Error::invalid_config(
                "simulation.energy_max and simulation.energy_regen_secs must be greater than 0",
            ));
        }
        if self.drill_wither_secs == 0 {
            return Err(Error::invalid_config(
                "simulation.drill_wither_secs must be greater than 0",
            ));
        }
        for (name, value) in [
            ("energy_regen_secs", self.energy_regen_secs),
            ("building_secs", self.building_secs),
            ("drill_secs", self.drill_secs),
            ("drill_wither_secs", self.drill_wither_secs),
            ("training_secs", self.training_secs),
            ("mission_window_secs", self.mission_window_secs),
        ] {
            seconds(name, value)?;
        }
        Ok(())
    }

    /// Energy regen interval.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the interval cannot be represented.
    pub fn energy_regen(&self) -> Result<TimeDelta> {
        seconds("energy_regen_secs", self.energy_regen_secs)
    }

    /// The activities a session starts, in order: a building upgrade, a
    /// drill, a training session, and a mission.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a duration cannot be represented.
    pub fn plan(&self) -> Result<Vec<StartRequest>> {
        Ok(vec![
            StartRequest::new(
                ResourceKind::BuildingUpgrade,
                seconds("building_secs", self.building_secs)?,
            )
            .with_cost(Cost::new(self.building_cost_coins, 0))
            .with_reward(Reward::new(0, 120)),
            StartRequest::new(ResourceKind::Drill, seconds("drill_secs", self.drill_secs)?)
                .with_cost(Cost::new(0, self.drill_cost_energy))
                .with_reward(Reward::new(30, 15).with_skill_points(1))
                .with_wither_after(seconds("drill_wither_secs", self.drill_wither_secs)?),
            StartRequest::new(
                ResourceKind::Training,
                seconds("training_secs", self.training_secs)?,
            )
            .with_cost(Cost::new(0, self.training_cost_energy))
            .with_reward(Reward::new(10, 40).with_knowledge_points(2)),
            StartRequest::new(
                ResourceKind::Mission,
                seconds("mission_window_secs", self.mission_window_secs)?,
            )
            .with_reward(Reward::new(50, 25)),
        ])
    }
}

fn seconds(name: &str, value: u64) -> Result<TimeDelta> {
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| Error::invalid_config(format!("simulation.{name} is out of range")))
}

// Default value functions
const fn default_single_interval_ms() -> u64 {
    1000
}

const fn default_list_interval_ms() -> u64 {
    10_000
}

const fn default_timeout_ms() -> u64 {
    8000
}

const fn default_max_retries() -> u32 {
    1
}

const fn default_retry_backoff_ms() -> u64 {
    250
}

const fn default_max_backoff_ms() -> u64 {
    2000
}

fn default_filter() -> String {
    "info".to_string()
}

const fn default_speed() -> u32 {
    60
}

const fn default_max_wall_ms() -> u64 {
    120_000
}

const fn default_starting_coins() -> u64 {
    500
}

const fn default_energy_max() -> u32 {
    10
}

const fn default_energy_regen_secs() -> u64 {
    600
}

const fn default_building_secs() -> u64 {
    300
}

const fn default_building_cost_coins() -> u64 {
    100
}

const fn default_drill_secs() -> u64 {
    600
}

const fn default_drill_wither_secs() -> u64 {
    600
}

const fn default_drill_cost_energy() -> u32 {
    1
}

const fn default_training_secs() -> u64 {
    180
}

const fn default_training_cost_energy() -> u32 {
    2
}

const fn default_mission_window_secs() -> u64 {
    86_400
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = KickoffConfig::from_toml_str("").unwrap();
        assert_eq!(config, KickoffConfig::default());
        assert_eq!(config.collect_config(), CollectConfig::default());
        assert_eq!(
            config.poller_config(PollCadence::Single),
            PollerConfig::single_item()
        );
        assert_eq!(config.poller_config(PollCadence::List), PollerConfig::list());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = KickoffConfig::from_toml_str(
            r#"
            [poller]
            single_interval_ms = 250

            [logging]
            filter = "kickoff=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.poller.single_interval_ms, 250);
        assert_eq!(config.poller.list_interval_ms, 10_000);
        assert_eq!(config.logging.filter, "kickoff=debug");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = KickoffConfig::from_toml_str("[poller]\nlist_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_zero_wither_window_rejected() {
        let err =
            KickoffConfig::from_toml_str("[simulation]\ndrill_wither_secs = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert!(err.to_string().contains("drill_wither_secs"));
    }

    #[test]
    fn test_drill_grid_polls_with_list_preset() {
        let config = KickoffConfig::default();
        let drill = config.poller_config(ResourceKind::Drill.poll_cadence());
        assert_eq!(drill, PollerConfig::list());
        assert_eq!(drill.tick_interval, Duration::from_millis(10_000));
        assert_eq!(drill.style, kickoff_timing::RemainingStyle::ReadyLabel);
        assert_eq!(
            config.poller_config(ResourceKind::Mission.poll_cadence()),
            PollerConfig::list()
        );
        assert_eq!(
            config.poller_config(ResourceKind::Training.poll_cadence()),
            PollerConfig::single_item()
        );
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = KickoffConfig::from_toml_str("[collect\ntimeout_ms = 1").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[collect]\ntimeout_ms = 3000\nmax_retries = 2").unwrap();

        let config = KickoffConfig::load(file.path()).unwrap();
        assert_eq!(config.collect.timeout_ms, 3000);
        assert_eq!(config.collect_config().max_retries, 2);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = KickoffConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_plan_starts_all_four_kinds() {
        let plan = SimulationSection::default().plan().unwrap();
        let kinds: Vec<_> = plan.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::BuildingUpgrade,
                ResourceKind::Drill,
                ResourceKind::Training,
                ResourceKind::Mission,
            ]
        );
        assert!(plan.iter().any(|r| r.wither_after.is_some()));
    }
}
