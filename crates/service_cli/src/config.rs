//! CLI configuration management
//!
//! Configuration comes from, lowest priority first: defaults, a TOML file,
//! then `WEALTH_*` environment variables. Validation reports every problem
//! found rather than stopping at the first.
//!
//! ```toml
//! log_level = "info"
//! threads = 8
//!
//! [simulation]
//! num_scenarios = 5000
//! num_periods = 120
//! random_seed = 7
//!
//! [report]
//! risk_free_rate = 0.02
//! stress_presets = ["equity_crash", "rate_shock"]
//! ```

use crate::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use wealth_risk::report::DEFAULT_RISK_FREE_RATE;
use wealth_risk::stress::StressPreset;
use wealth_simulation::config::SimulationConfig;

/// Environment variable overriding the random seed.
pub const ENV_SEED: &str = "WEALTH_SEED";
/// Environment variable overriding the scenario count.
pub const ENV_SCENARIOS: &str = "WEALTH_SCENARIOS";
/// Environment variable overriding the period count.
pub const ENV_PERIODS: &str = "WEALTH_PERIODS";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "WEALTH_LOG_LEVEL";

/// Log levels accepted by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace
    Trace,
    /// Debug
    Debug,
    /// Info
    #[default]
    Info,
    /// Warn
    Warn,
    /// Error
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!(
                "invalid log level '{s}': must be one of trace, debug, info, warn, error"
            )),
        }
    }
}

impl LogLevel {
    /// Tracing filter directive.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

/// Risk report settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Annual risk-free rate for Sharpe and Sortino ratios
    pub risk_free_rate: f64,
    /// Preset stress scenarios applied to ending holdings
    pub stress_presets: Vec<StressPreset>,
    /// Evaluate each client's goals
    pub goals: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            stress_presets: StressPreset::ALL.to_vec(),
            goals: true,
        }
    }
}

/// Full CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Default log level when `RUST_LOG` is unset
    pub log_level: LogLevel,
    /// Worker threads; rayon's default when unset
    pub threads: Option<usize>,
    /// Simulation run settings
    pub simulation: SimulationConfig,
    /// Risk report settings
    pub report: ReportConfig,
}

impl CliConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CliError::Parse {
            path: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Loads `path`, falling back to defaults when the file is absent.
    pub fn from_file_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(path.display().to_string(), e))?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// Applies overrides from `lookup`, keyed by `WEALTH_*` variable name.
    ///
    /// Unparseable values are collected and reported together.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();
        if let Some(v) = lookup(ENV_SEED) {
            match v.trim().parse() {
                Ok(seed) => self.simulation.random_seed = seed,
                Err(_) => problems.push(format!("{ENV_SEED}='{v}' is not an unsigned integer")),
            }
        }
        if let Some(v) = lookup(ENV_SCENARIOS) {
            match v.trim().parse() {
                Ok(n) => self.simulation.num_scenarios = n,
                Err(_) => problems.push(format!("{ENV_SCENARIOS}='{v}' is not a count")),
            }
        }
        if let Some(v) = lookup(ENV_PERIODS) {
            match v.trim().parse() {
                Ok(n) => self.simulation.num_periods = n,
                Err(_) => problems.push(format!("{ENV_PERIODS}='{v}' is not a count")),
            }
        }
        if let Some(v) = lookup(ENV_LOG_LEVEL) {
            match v.parse() {
                Ok(level) => self.log_level = level,
                Err(msg) => problems.push(format!("{ENV_LOG_LEVEL}: {msg}")),
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(CliError::Config(problems))
        }
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Validates every section, collecting all problems.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if let Err(e) = self.simulation.validate() {
            problems.push(e.to_string());
        }
        if self.threads == Some(0) {
            problems.push("threads must be at least 1".to_string());
        }
        if !self.report.risk_free_rate.is_finite() || self.report.risk_free_rate.abs() > 1.0 {
            problems.push(format!(
                "report.risk_free_rate {} must be finite and within [-1, 1]",
                self.report.risk_free_rate
            ));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(CliError::Config(problems))
        }
    }

    /// Loads, overrides and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file_or_default(path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.threads, None);
        assert_eq!(config.simulation.num_scenarios, 1_000);
        assert_eq!(config.report.stress_presets.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_sections() {
        let text = r#"
            log_level = "debug"
            threads = 4

            [simulation]
            num_scenarios = 250
            random_seed = 9

            [report]
            risk_free_rate = 0.03
            stress_presets = ["rate_shock"]
        "#;
        let config = CliConfig::from_toml_str(text, "inline").unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.simulation.num_scenarios, 250);
        assert_eq!(config.simulation.random_seed, 9);
        assert_eq!(config.simulation.num_periods, 12);
        assert_eq!(config.report.stress_presets, vec![StressPreset::RateShock]);
        assert!(config.report.goals);
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = CliConfig::from_toml_str(include_str!("../../../wealth.toml"), "wealth.toml")
            .unwrap();
        assert_eq!(config.simulation.num_periods, 120);
        assert!(matches!(
            config.simulation.rebalance,
            wealth_simulation::rebalance::RebalancePolicy::DriftTriggered { .. }
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = CliConfig::default();
        config
            .apply_overrides(lookup(&[
                (ENV_SEED, "123"),
                (ENV_SCENARIOS, "50"),
                (ENV_PERIODS, "24"),
                (ENV_LOG_LEVEL, "WARN"),
            ]))
            .unwrap();
        assert_eq!(config.simulation.random_seed, 123);
        assert_eq!(config.simulation.num_scenarios, 50);
        assert_eq!(config.simulation.num_periods, 24);
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_bad_overrides_reported_together() {
        let mut config = CliConfig::default();
        let err = config
            .apply_overrides(lookup(&[(ENV_SEED, "abc"), (ENV_LOG_LEVEL, "loud")]))
            .unwrap_err();
        match err {
            CliError::Config(problems) => assert_eq!(problems.len(), 2),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_validation_collects_all_problems() {
        let mut config = CliConfig::default();
        config.simulation.num_scenarios = 0;
        config.threads = Some(0);
        config.report.risk_free_rate = f64::NAN;
        match config.validate().unwrap_err() {
            CliError::Config(problems) => {
                assert_eq!(problems.len(), 3);
                assert!(problems[0].contains("scenario count"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }
}
