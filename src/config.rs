use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::domain::TimeRange;
use crate::optimizer::SolverKind;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EesrepConfig {
    #[validate(nested)]
    pub time_range: TimeRangeConfig,
    #[serde(default)]
    #[validate(nested)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub scenario: Option<ScenarioConfig>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TimeRangeConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub step_duration: f64,
    #[validate(range(min = 1))]
    pub window_steps: usize,
    #[validate(range(min = 1))]
    pub horizon_steps: usize,
    #[validate(range(min = 1))]
    pub iterations: usize,
    pub total_steps: Option<usize>,
}

impl TimeRangeConfig {
    pub fn to_time_range(&self) -> crate::error::Result<TimeRange> {
        let range = TimeRange::new(
            self.step_duration,
            self.window_steps,
            self.horizon_steps,
            self.iterations,
        )?;
        match self.total_steps {
            Some(total) => range.with_total_steps(total),
            None => Ok(range),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: SolverKind,
    /// Branch and bound node limit
    #[validate(range(min = 1))]
    pub max_nodes: usize,
    #[validate(range(exclusive_min = 0.0, max = 0.5))]
    pub integrality_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverKind::MiniLp,
            max_nodes: 10_000,
            integrality_tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Dam and bus demo scenario run by the binary
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub data_file: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_time_column")]
    pub time_column: String,
    pub load_column: String,
    pub inflow_column: String,
    pub output_file: PathBuf,
    pub dam: DamScenario,
    pub unsupplied_cost: f64,
    pub spilled_cost: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DamScenario {
    pub efficiency: f64,
    pub turbine_power: f64,
    #[serde(default)]
    pub pump_power: f64,
    pub capacity: f64,
    pub initial_storage: f64,
    pub storage_min: Option<f64>,
    pub storage_max: Option<f64>,
}

fn default_delimiter() -> char {
    ';'
}

fn default_time_column() -> String {
    "time".to_string()
}

impl EesrepConfig {
    /// `config/default.toml` overridden by `EESREP__`-prefixed variables
    pub fn load() -> Result<Self> {
        Self::from_path("config/default.toml")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("EESREP__").split("__"));
        let config: Self = figment
            .extract()
            .with_context(|| format!("loading configuration from {}", path.as_ref().display()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_with_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "eesrep.toml",
                r#"
                [time_range]
                step_duration = 3600.0
                window_steps = 24
                horizon_steps = 48
                iterations = 3

                [solver]
                max_nodes = 500
                "#,
            )?;
            jail.set_env("EESREP__TIME_RANGE__ITERATIONS", "5");

            let config = EesrepConfig::from_path("eesrep.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.time_range.iterations, 5);
            assert_eq!(config.solver.max_nodes, 500);
            assert_eq!(config.solver.backend, SolverKind::MiniLp);
            assert_eq!(config.logging.filter, "info");
            assert!(config.scenario.is_none());

            let range = config.time_range.to_time_range().map_err(|e| e.to_string())?;
            assert_eq!(range.total_steps(), 4 * 24 + 48);
            Ok(())
        });
    }

    #[test]
    fn test_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "eesrep.toml",
                r#"
                [time_range]
                step_duration = 0.0
                window_steps = 1
                horizon_steps = 1
                iterations = 1
                "#,
            )?;
            assert!(EesrepConfig::from_path("eesrep.toml").is_err());
            Ok(())
        });
    }
}
