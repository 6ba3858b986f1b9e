use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::terrain::ClimateZone;

fn default_width() -> u32 {
    5
}

fn default_height() -> u32 {
    5
}

fn default_resource_max() -> f64 {
    1000.0
}

fn default_base_regen() -> f64 {
    5.0
}

fn default_initial_fraction() -> f64 {
    0.8
}

fn default_food_per_capita() -> f64 {
    0.1
}

fn default_water_per_capita() -> f64 {
    0.12
}

fn default_initial_population() -> u64 {
    50
}

fn default_max_population() -> u64 {
    500
}

fn default_q_bins() -> u8 {
    5
}

fn default_history_len() -> usize {
    6
}

fn default_queue_capacity() -> usize {
    8
}

/// Top-level simulation configuration. Every section falls back to the
/// built-in defaults so a partial YAML file is enough.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub rl: RlConfig,
    #[serde(default)]
    pub heuristic: HeuristicConfig,
    #[serde(default)]
    pub climate: ClimateConfig,
    #[serde(default)]
    pub actions: ActionConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    #[serde(default = "default_resource_max")]
    pub food_max: f64,
    #[serde(default = "default_resource_max")]
    pub water_max: f64,
    #[serde(default = "default_base_regen")]
    pub food_regen: f64,
    #[serde(default = "default_base_regen")]
    pub water_regen: f64,
    /// Fraction of `max` each pool starts with.
    #[serde(default = "default_initial_fraction")]
    pub initial_fraction: f64,
    #[serde(default = "default_food_per_capita")]
    pub food_per_capita: f64,
    #[serde(default = "default_water_per_capita")]
    pub water_per_capita: f64,
    pub min_regen_multiplier: f64,
    pub max_regen_multiplier: f64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            food_max: default_resource_max(),
            water_max: default_resource_max(),
            food_regen: default_base_regen(),
            water_regen: default_base_regen(),
            initial_fraction: default_initial_fraction(),
            food_per_capita: default_food_per_capita(),
            water_per_capita: default_water_per_capita(),
            min_regen_multiplier: 0.5,
            max_regen_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub initial: u64,
    pub max: u64,
    pub base_birth_rate: f64,
    pub base_death_rate: f64,
    pub starvation_death_rate: f64,
    pub dehydration_death_rate: f64,
    pub low_health_death_rate: f64,
    pub health_decay_no_food: f64,
    pub health_decay_no_water: f64,
    pub health_regen_rate: f64,
    pub migration_threshold: f64,
    pub migration_rate: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_population(),
            max: default_max_population(),
            base_birth_rate: 0.02,
            base_death_rate: 0.01,
            starvation_death_rate: 0.05,
            dehydration_death_rate: 0.08,
            low_health_death_rate: 0.02,
            health_decay_no_food: 0.03,
            health_decay_no_water: 0.05,
            health_regen_rate: 0.01,
            migration_threshold: 0.3,
            migration_rate: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RlConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub epsilon: f64,
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    #[serde(default = "default_q_bins")]
    pub bins: u8,
    pub growth_weight: f64,
    pub health_weight: f64,
    pub collapse_penalty: f64,
}

impl Default for RlConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.95,
            epsilon: 0.15,
            epsilon_decay: 0.999,
            epsilon_min: 0.01,
            bins: default_q_bins(),
            growth_weight: 10.0,
            health_weight: 5.0,
            collapse_penalty: -100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    #[serde(default = "default_history_len")]
    pub history_len: usize,
    /// Maximum consecutive aggressive actions before conflict is suppressed.
    pub aggressive_streak_cap: usize,
    /// Ticks per full oscillator cycle.
    pub oscillator_period: f64,
    pub oscillator_amplitude: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            history_len: default_history_len(),
            aggressive_streak_cap: 2,
            oscillator_period: 40.0,
            oscillator_amplitude: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub event_probability: f64,
    pub min_severity: f64,
    pub max_severity: f64,
    pub min_duration: u32,
    pub max_duration: u32,
    /// Scales the per-intensity effect table into a fraction of pool max.
    pub effect_scale: f64,
    /// Climate zones assigned by latitude, top row first.
    pub zones: Vec<ClimateZone>,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            event_probability: 0.05,
            min_severity: 0.2,
            max_severity: 0.8,
            min_duration: 3,
            max_duration: 12,
            effect_scale: 0.05,
            zones: ClimateZone::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub focus_step: f64,
    pub focus_penalty: f64,
    pub trade_fraction: f64,
    pub ration_cut: f64,
    pub ration_health_cost: f64,
    pub expand_cost: f64,
    pub steal_fraction: f64,
    pub unrest_food_drain: f64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            focus_step: 0.1,
            focus_penalty: 0.05,
            trade_fraction: 0.05,
            ration_cut: 0.2,
            ration_health_cost: 0.005,
            expand_cost: 0.05,
            steal_fraction: 0.08,
            unrest_food_drain: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentMix {
    Tabular,
    Heuristic,
    #[default]
    Mixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Fraction of collapsed regions that ends the run.
    pub collapse_threshold: f64,
    pub agent_mix: AgentMix,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            collapse_threshold: 0.8,
            agent_mix: AgentMix::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub tick_interval_ms: u64,
    pub broadcast_interval_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Per-subscriber outbound buffer; a full buffer prunes the subscriber.
    pub subscriber_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            broadcast_interval_ms: 500,
            queue_capacity: default_queue_capacity(),
            subscriber_buffer: 16,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid.width == 0 || self.grid.height == 0 {
            bail!(
                "grid must be at least 1x1 (got {}x{})",
                self.grid.width,
                self.grid.height
            );
        }
        if self.climate.min_severity > self.climate.max_severity {
            bail!("climate.min_severity exceeds climate.max_severity");
        }
        if self.climate.min_duration > self.climate.max_duration {
            bail!("climate.min_duration exceeds climate.max_duration");
        }
        if self.climate.min_duration == 0 {
            bail!("climate.min_duration must be at least 1");
        }
        for (name, value) in [
            ("climate.event_probability", self.climate.event_probability),
            ("world.collapse_threshold", self.world.collapse_threshold),
            ("rl.epsilon", self.rl.epsilon),
            ("rl.epsilon_min", self.rl.epsilon_min),
            ("population.migration_rate", self.population.migration_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be within [0, 1] (got {value})");
            }
        }
        if !(self.rl.epsilon_decay > 0.0 && self.rl.epsilon_decay <= 1.0) {
            bail!(
                "rl.epsilon_decay must be within (0, 1] (got {})",
                self.rl.epsilon_decay
            );
        }
        if self.rl.epsilon < self.rl.epsilon_min {
            bail!(
                "rl.epsilon ({}) is below rl.epsilon_min ({})",
                self.rl.epsilon,
                self.rl.epsilon_min
            );
        }
        if self.resources.min_regen_multiplier > self.resources.max_regen_multiplier {
            bail!("resources.min_regen_multiplier exceeds resources.max_regen_multiplier");
        }
        if self.rl.bins == 0 {
            bail!("rl.bins must be at least 1");
        }
        if self.runtime.queue_capacity == 0 {
            bail!("runtime.queue_capacity must be at least 1");
        }
        if self.climate.zones.is_empty() {
            bail!("climate.zones must list at least one zone");
        }
        Ok(())
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<SimConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: SimConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }
}
