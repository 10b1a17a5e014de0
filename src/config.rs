//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::capacity::ChargingParams;
use crate::controller::strategy::STRATEGIES;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the regular (no-bidding) scenario.
/// Load from TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation-wide parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Physical fleet constants.
    #[serde(default)]
    pub fleet: FleetConfig,
    /// Bidding-controller parameters.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Synthetic demo-data parameters, used when no data files are given.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Simulation-wide parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Master random seed for synthetic demo data.
    pub seed: u64,
    /// Whether plugged-in vehicles gain charge linearly each tick.
    pub sim_charging: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            sim_charging: true,
        }
    }
}

/// Physical fleet constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    /// Charger power (kW).
    pub charging_speed_kw: f32,
    /// Vehicle battery capacity (kWh).
    pub battery_capacity_kwh: f32,
    /// Vehicle range on a full battery (km).
    pub ev_range_km: f32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            charging_speed_kw: 3.6,
            battery_capacity_kwh: 16.5,
            ev_range_km: 20.0,
        }
    }
}

/// Bidding-controller parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Strategy: `"regular"`, `"balancing"`, `"intraday"`, or `"integrated"`.
    pub strategy: String,
    /// Fixed grid tariff outside market participation (EUR/MWh).
    pub industry_tariff_eur_mwh: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            strategy: "regular".to_string(),
            industry_tariff_eur_mwh: 45.0,
        }
    }
}

/// Synthetic demo-data parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Number of vehicles to generate.
    pub vehicles: u32,
    /// Number of days to generate.
    pub days: u32,
    /// First trip-table timestamp (epoch seconds, 5-minute aligned).
    pub start_time: i64,
    /// Mean synthetic clearing price (EUR/MWh).
    pub base_price_eur_mwh: f32,
    /// Daily price swing amplitude (EUR/MWh).
    pub price_amplitude_eur_mwh: f32,
    /// Price noise standard deviation (EUR/MWh).
    pub price_noise_std: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            vehicles: 40,
            days: 3,
            // 2017-01-01 00:00:00 UTC.
            start_time: 1_483_228_800,
            base_price_eur_mwh: 38.0,
            price_amplitude_eur_mwh: 8.0,
            price_noise_std: 1.5,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"fleet.charging_speed_kw"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {} — {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Available preset names, one per bidding strategy.
    pub const PRESETS: &[&str] = &["regular", "balancing", "intraday", "integrated"];

    /// Returns the default scenario with the given bidding strategy.
    fn with_strategy(strategy: &str) -> Self {
        Self {
            simulation: SimulationConfig::default(),
            fleet: FleetConfig::default(),
            controller: ControllerConfig {
                strategy: strategy.to_string(),
                ..ControllerConfig::default()
            },
            demo: DemoConfig::default(),
        }
    }

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        if Self::PRESETS.contains(&name) {
            Ok(Self::with_strategy(name))
        } else {
            Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            })
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is
    /// invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown
    /// fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Charging parameters derived from the fleet section.
    pub fn charging_params(&self) -> ChargingParams {
        ChargingParams::new(
            self.fleet.charging_speed_kw,
            self.fleet.battery_capacity_kwh,
            self.simulation.sim_charging,
        )
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let fleet = &self.fleet;
        if fleet.charging_speed_kw <= 0.0 {
            errors.push(ConfigError {
                field: "fleet.charging_speed_kw".into(),
                message: "must be > 0".into(),
            });
        }
        if fleet.battery_capacity_kwh <= 0.0 {
            errors.push(ConfigError {
                field: "fleet.battery_capacity_kwh".into(),
                message: "must be > 0".into(),
            });
        }
        if fleet.ev_range_km <= 0.0 {
            errors.push(ConfigError {
                field: "fleet.ev_range_km".into(),
                message: "must be > 0".into(),
            });
        }

        let ctl = &self.controller;
        if !STRATEGIES.contains(&ctl.strategy.as_str()) {
            errors.push(ConfigError {
                field: "controller.strategy".into(),
                message: format!(
                    "must be one of {}, got \"{}\"",
                    STRATEGIES.join(", "),
                    ctl.strategy
                ),
            });
        }
        if ctl.industry_tariff_eur_mwh <= 0.0 {
            errors.push(ConfigError {
                field: "controller.industry_tariff_eur_mwh".into(),
                message: "must be > 0".into(),
            });
        }

        let demo = &self.demo;
        if demo.vehicles == 0 {
            errors.push(ConfigError {
                field: "demo.vehicles".into(),
                message: "must be > 0".into(),
            });
        }
        if demo.days == 0 {
            errors.push(ConfigError {
                field: "demo.days".into(),
                message: "must be > 0".into(),
            });
        }
        if demo.start_time % 300 != 0 {
            errors.push(ConfigError {
                field: "demo.start_time".into(),
                message: "must be aligned to the 5-minute grid".into(),
            });
        }

        errors
    }
}
