//! Immutable, serializable views of the world.
//!
//! A [`WorldSnapshot`] is captured after every tick and handed across the
//! concurrency bridge; nothing in it borrows from the live world.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    agent::{Action, AgentKind, AgentView, Policy},
    climate::{ClimateEvent, ClimateEventKind},
    region::Region,
    resource::ResourcePool,
    terrain::{ClimateZone, TerrainType},
    world::World,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub value: f64,
    pub max: f64,
    pub pct: f64,
    pub is_critical: bool,
    pub regen_multiplier: f64,
}

impl From<&ResourcePool> for ResourceSnapshot {
    fn from(pool: &ResourcePool) -> Self {
        Self {
            value: pool.value(),
            max: pool.max(),
            pct: pool.pct(),
            is_critical: pool.is_critical(),
            regen_multiplier: pool.regen_multiplier(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcesSnapshot {
    pub food: ResourceSnapshot,
    pub water: ResourceSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub count: u64,
    pub health: f64,
    pub capacity: u64,
    pub density: f64,
    pub births: u64,
    pub deaths: u64,
    pub migrants_in: u64,
    pub migrants_out: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateEventSnapshot {
    pub kind: ClimateEventKind,
    pub severity: f64,
    pub ticks_remaining: u32,
    pub initial_duration: u32,
    pub intensity: f64,
}

impl From<&ClimateEvent> for ClimateEventSnapshot {
    fn from(event: &ClimateEvent) -> Self {
        Self {
            kind: event.kind,
            severity: event.severity,
            ticks_remaining: event.ticks_remaining,
            initial_duration: event.initial_duration,
            intensity: event.intensity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub key: String,
    pub x: u32,
    pub y: u32,
    pub terrain: TerrainType,
    pub climate_zone: ClimateZone,
    pub resources: ResourcesSnapshot,
    pub population: PopulationSnapshot,
    pub agent: AgentView,
    pub last_action: Option<Action>,
    pub unrest: f64,
    pub trades: u64,
    pub conflicts: u64,
    pub collapsed: bool,
    pub climate_events: Vec<ClimateEventSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub running: bool,
    pub ended: bool,
    pub width: u32,
    pub height: u32,
    pub total_population: u64,
    pub alive_regions: usize,
    pub total_regions: usize,
    pub active_events: usize,
    pub regions: Vec<RegionSnapshot>,
}

impl WorldSnapshot {
    pub fn capture(world: &World, running: bool) -> Self {
        let regions: Vec<RegionSnapshot> = world
            .regions
            .values()
            .map(|region| region_snapshot(world, region))
            .collect();
        let alive_regions = regions.iter().filter(|region| !region.collapsed).count();
        Self {
            tick: world.tick(),
            running,
            ended: world.is_ended(),
            width: world.width(),
            height: world.height(),
            total_population: world.total_population(),
            alive_regions,
            total_regions: regions.len(),
            active_events: world.climate.active_count(),
            regions,
        }
    }

    pub fn region(&self, key: &str) -> Option<&RegionSnapshot> {
        self.regions.iter().find(|region| region.key == key)
    }
}

fn region_snapshot(world: &World, region: &Region) -> RegionSnapshot {
    let population = &region.population;
    RegionSnapshot {
        key: region.key.to_string(),
        x: region.key.x,
        y: region.key.y,
        terrain: region.terrain,
        climate_zone: region.zone,
        resources: ResourcesSnapshot {
            food: (&region.food).into(),
            water: (&region.water).into(),
        },
        population: PopulationSnapshot {
            count: population.count,
            health: population.health,
            capacity: population.capacity,
            density: population.density(),
            births: population.births,
            deaths: population.deaths,
            migrants_in: population.migrants_in,
            migrants_out: population.migrants_out,
        },
        agent: region.agent.view(),
        last_action: region.last_action,
        unrest: region.unrest,
        trades: region.trades,
        conflicts: region.conflicts,
        collapsed: region.is_collapsed(),
        climate_events: world
            .climate
            .events_for(region.key)
            .iter()
            .map(ClimateEventSnapshot::from)
            .collect(),
    }
}

/// Static description of a region, stable across ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionListing {
    pub key: String,
    pub x: u32,
    pub y: u32,
    pub terrain: TerrainType,
    pub climate_zone: ClimateZone,
    pub agent_kind: AgentKind,
    pub strategy_label: String,
}

pub fn region_listing(world: &World) -> Vec<RegionListing> {
    world
        .regions
        .values()
        .map(|region| {
            let view = region.agent.view();
            RegionListing {
                key: region.key.to_string(),
                x: region.key.x,
                y: region.key.y,
                terrain: region.terrain,
                climate_zone: region.zone,
                agent_kind: view.kind,
                strategy_label: view.strategy_label,
            }
        })
        .collect()
}

/// Writes pretty JSON snapshots to disk every `interval` ticks.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn maybe_write(&self, snapshot: &WorldSnapshot) -> Result<Option<PathBuf>> {
        if self.interval == 0 || snapshot.tick % self.interval != 0 {
            return Ok(None);
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create snapshot dir {}", self.dir.display()))?;
        let path = self.dir.join(format!("tick_{:06}.json", snapshot.tick));
        let json = serde_json::to_string_pretty(snapshot).context("Failed to encode snapshot")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(Some(path))
    }
}
