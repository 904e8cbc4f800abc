//! Конфигурация симуляции (RON)
//!
//! Все настраиваемые константы поведения собраны в per-agent компонентах
//! (WanderConfig, CombatConfig, FollowConfig, AvoidanceConfig). SimulationConfig
//! собирает их значения по умолчанию для спавна + seed и частоту тика.
//! Отсутствующие поля берутся из Default.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::{CombatConfig, FollowConfig, WanderConfig};
use crate::steering::AvoidanceConfig;

/// Ошибки загрузки и валидации конфигурации
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse RON config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("distance_to_resume_formation ({resume}) must be < max_distance_before_catchup ({catchup})")]
    FollowHysteresis { resume: f32, catchup: f32 },
    #[error("{field}: min ({min}) > max ({max})")]
    InvertedRange { field: &'static str, min: f32, max: f32 },
    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: f32 },
    #[error("{0} must be positive")]
    NonPositive(&'static str),
}

/// Resource: конфигурация симуляции
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Частота FixedUpdate (Hz)
    pub tick_hz: f64,
    pub wander: WanderConfig,
    pub combat: CombatConfig,
    pub follow: FollowConfig,
    pub avoidance: AvoidanceConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_hz: 60.0,
            wander: WanderConfig::default(),
            combat: CombatConfig::default(),
            follow: FollowConfig::default(),
            avoidance: AvoidanceConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Парсинг + валидация
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_hz.is_finite() && self.tick_hz > 0.0) {
            return Err(ConfigError::NonPositive("tick_hz"));
        }
        validate_wander(&self.wander)?;
        validate_combat(&self.combat)?;
        self.follow.validate()?;
        validate_avoidance(&self.avoidance)?;
        Ok(())
    }
}

fn ordered(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::InvertedRange { field, min, max });
    }
    Ok(())
}

fn fraction(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}

fn validate_wander(config: &WanderConfig) -> Result<(), ConfigError> {
    ordered("wait", config.min_wait, config.max_wait)?;
    ordered("wander_distance", config.min_wander_distance, config.max_wander_distance)?;
    if config.min_wander_distance <= 0.0 {
        return Err(ConfigError::NonPositive("min_wander_distance"));
    }
    fraction("early_stop_chance", config.early_stop_chance)?;
    fraction("inward_bias_threshold", config.inward_bias_threshold)?;
    fraction("inward_bias_weight", config.inward_bias_weight)?;
    fraction("waypoint_safety_fraction", config.waypoint_safety_fraction)?;
    fraction("snap_fraction", config.snap_fraction)?;
    if config.waypoint_attempts == 0 {
        return Err(ConfigError::NonPositive("waypoint_attempts"));
    }
    Ok(())
}

fn validate_combat(config: &CombatConfig) -> Result<(), ConfigError> {
    if config.min_attack_distance <= 0.0 || config.detection_radius <= 0.0 {
        return Err(ConfigError::NonPositive("min_attack_distance/detection_radius"));
    }
    if config.attack_exit_factor < 1.0 {
        return Err(ConfigError::OutOfRange {
            field: "attack_exit_factor",
            value: config.attack_exit_factor,
        });
    }
    ordered("leash", config.return_buffer, config.max_distance_from_territory)?;
    fraction("return_complete_fraction", config.return_complete_fraction)?;
    Ok(())
}

fn validate_avoidance(config: &AvoidanceConfig) -> Result<(), ConfigError> {
    if config.max_blend >= 1.0 || config.max_blend < 0.0 {
        return Err(ConfigError::OutOfRange {
            field: "max_blend",
            value: config.max_blend,
        });
    }
    Ok(())
}
