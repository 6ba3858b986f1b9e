use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    agent::{Action, DecisionAgent},
    population::Population,
    resource::ResourcePool,
    terrain::{ClimateZone, TerrainType},
};

/// Grid coordinates of a region; ordering is column-major by `x` then `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionKey {
    pub x: u32,
    pub y: u32,
}

impl RegionKey {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Stable integer identity used to decorrelate per-region randomness.
    pub fn identity(self) -> u64 {
        ((self.x as u64) << 32) | self.y as u64
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.x, self.y)
    }
}

/// One grid cell with its pools, people and governing agent.
#[derive(Debug, Clone)]
pub struct Region {
    pub key: RegionKey,
    pub terrain: TerrainType,
    pub zone: ClimateZone,
    pub food: ResourcePool,
    pub water: ResourcePool,
    pub population: Population,
    pub agent: DecisionAgent,
    pub last_action: Option<Action>,
    pub unrest: f64,
    pub unrest_baseline: f64,
    pub migration_requested: bool,
    pub rationing: bool,
    pub trades: u64,
    pub conflicts: u64,
    /// Tick the population reached zero, once it has.
    pub collapsed_at: Option<u64>,
}

impl Region {
    pub fn is_collapsed(&self) -> bool {
        self.population.is_collapsed()
    }

    /// Mean fill fraction of the food and water pools.
    pub fn stock_avg(&self) -> f64 {
        (self.food.pct() + self.water.pct()) / 2.0
    }

    pub fn pool(&self, kind: ResourceKind) -> &ResourcePool {
        match kind {
            ResourceKind::Food => &self.food,
            ResourceKind::Water => &self.water,
        }
    }

    pub fn pool_mut(&mut self, kind: ResourceKind) -> &mut ResourcePool {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Water => &mut self.water,
        }
    }

    /// The pool with the lower fill fraction; ties go to water.
    pub fn scarcest(&self) -> ResourceKind {
        if self.food.pct() < self.water.pct() {
            ResourceKind::Food
        } else {
            ResourceKind::Water
        }
    }

    pub fn adjust_unrest(&mut self, delta: f64) {
        self.unrest = (self.unrest + delta).clamp(0.0, 1.0);
    }

    /// Clears the flags and counters that describe a single tick.
    pub fn begin_tick(&mut self) {
        self.migration_requested = false;
        self.rationing = false;
        self.population.reset_counters();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Water,
}

impl ResourceKind {
    pub fn other(self) -> Self {
        match self {
            ResourceKind::Food => ResourceKind::Water,
            ResourceKind::Water => ResourceKind::Food,
        }
    }
}
