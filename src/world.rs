use std::collections::BTreeMap;

use crate::{
    agent::{DecisionAgent, Observation, Personality, PersonalityPolicy, RewardWeights, TabularAgent},
    climate::ClimateSystem,
    config::{AgentMix, SimConfig},
    population::Population,
    region::{Region, RegionKey},
    resource::ResourcePool,
    terrain,
};

const TABULAR_UNREST_BASELINE: f64 = 0.2;

/// Authoritative simulation state: every region plus the climate system.
#[derive(Debug, Clone)]
pub struct World {
    width: u32,
    height: u32,
    tick: u64,
    terrain_seed: u64,
    ended: bool,
    pub regions: BTreeMap<RegionKey, Region>,
    pub climate: ClimateSystem,
}

impl World {
    /// Builds a fresh world from terrain generation outward.
    pub fn generate(config: &SimConfig, seed: u64) -> Self {
        let grid = terrain::generate(
            config.grid.width,
            config.grid.height,
            seed,
            &config.climate.zones,
        );
        let resources = &config.resources;
        let reward = RewardWeights::from_config(&config.rl);
        let mut regions = BTreeMap::new();

        for (index, (x, y, cell)) in grid.cells().enumerate() {
            let key = RegionKey::new(x, y);
            let modifiers = cell.terrain.modifiers();
            let food = ResourcePool::new(
                resources.food_max * resources.initial_fraction,
                resources.food_max,
                resources.food_regen * modifiers.food,
            )
            .with_multiplier_bounds(resources.min_regen_multiplier, resources.max_regen_multiplier);
            let water = ResourcePool::new(
                resources.water_max * resources.initial_fraction,
                resources.water_max,
                resources.water_regen * modifiers.water,
            )
            .with_multiplier_bounds(resources.min_regen_multiplier, resources.max_regen_multiplier);
            let capacity = ((config.population.max as f64 * modifiers.capacity).round() as u64).max(1);
            let population = Population::new(config.population.initial, capacity);

            let tabular = match config.world.agent_mix {
                AgentMix::Tabular => true,
                AgentMix::Heuristic => false,
                AgentMix::Mixed => index % 2 == 0,
            };
            let (agent, unrest_baseline) = if tabular {
                (
                    DecisionAgent::Tabular(TabularAgent::new(&config.rl)),
                    TABULAR_UNREST_BASELINE,
                )
            } else {
                let slot = match config.world.agent_mix {
                    AgentMix::Mixed => index / 2,
                    _ => index,
                };
                let personality = Personality::preset(slot);
                let baseline = personality.unrest_baseline;
                let policy = PersonalityPolicy::new(
                    personality,
                    &config.heuristic,
                    reward,
                    seed ^ key.identity(),
                );
                (DecisionAgent::Heuristic(policy), baseline)
            };

            regions.insert(
                key,
                Region {
                    key,
                    terrain: cell.terrain,
                    zone: cell.zone,
                    food,
                    water,
                    population,
                    agent,
                    last_action: None,
                    unrest: unrest_baseline,
                    unrest_baseline,
                    migration_requested: false,
                    rationing: false,
                    trades: 0,
                    conflicts: 0,
                    collapsed_at: None,
                },
            );
        }

        Self {
            width: config.grid.width,
            height: config.grid.height,
            tick: 0,
            terrain_seed: seed,
            ended: false,
            regions,
            climate: ClimateSystem::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn terrain_seed(&self) -> u64 {
        self.terrain_seed
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn mark_ended(&mut self) {
        self.ended = true;
    }

    pub fn region(&self, key: RegionKey) -> Option<&Region> {
        self.regions.get(&key)
    }

    pub fn region_mut(&mut self, key: RegionKey) -> Option<&mut Region> {
        self.regions.get_mut(&key)
    }

    pub fn alive_keys(&self) -> Vec<RegionKey> {
        self.regions
            .values()
            .filter(|region| !region.is_collapsed())
            .map(|region| region.key)
            .collect()
    }

    /// 4-connected neighbors that exist on the grid.
    pub fn neighbors(&self, key: RegionKey) -> Vec<RegionKey> {
        let mut out = Vec::with_capacity(4);
        if key.x > 0 {
            out.push(RegionKey::new(key.x - 1, key.y));
        }
        if key.x + 1 < self.width {
            out.push(RegionKey::new(key.x + 1, key.y));
        }
        if key.y > 0 {
            out.push(RegionKey::new(key.x, key.y - 1));
        }
        if key.y + 1 < self.height {
            out.push(RegionKey::new(key.x, key.y + 1));
        }
        out.retain(|neighbor| self.regions.contains_key(neighbor));
        out
    }

    pub fn alive_neighbors(&self, key: RegionKey) -> Vec<RegionKey> {
        self.neighbors(key)
            .into_iter()
            .filter(|neighbor| {
                self.regions
                    .get(neighbor)
                    .is_some_and(|region| !region.is_collapsed())
            })
            .collect()
    }

    pub fn total_population(&self) -> u64 {
        self.regions.values().map(|region| region.population.count).sum()
    }

    pub fn collapsed_fraction(&self) -> f64 {
        if self.regions.is_empty() {
            return 0.0;
        }
        let collapsed = self
            .regions
            .values()
            .filter(|region| region.is_collapsed())
            .count();
        collapsed as f64 / self.regions.len() as f64
    }

    /// Mean stock fraction over living regions, 0 when none remain.
    pub fn global_stock_avg(&self) -> f64 {
        let alive: Vec<f64> = self
            .regions
            .values()
            .filter(|region| !region.is_collapsed())
            .map(Region::stock_avg)
            .collect();
        if alive.is_empty() {
            0.0
        } else {
            alive.iter().sum::<f64>() / alive.len() as f64
        }
    }

    pub fn observe(&self, key: RegionKey) -> Option<Observation> {
        let region = self.regions.get(&key)?;
        let neighbors = self.alive_neighbors(key);
        let neighbor_avg = if neighbors.is_empty() {
            region.stock_avg()
        } else {
            neighbors
                .iter()
                .filter_map(|neighbor| self.regions.get(neighbor))
                .map(Region::stock_avg)
                .sum::<f64>()
                / neighbors.len() as f64
        };
        Some(Observation {
            tick: self.tick,
            food_pct: region.food.pct(),
            water_pct: region.water.pct(),
            health: region.population.health,
            density: region.population.density(),
            count: region.population.count,
            capacity: region.population.capacity,
            neighbor_avg,
            global_avg: self.global_stock_avg(),
            threat: region.unrest,
            weather: self.climate.peak_intensity(key),
        })
    }
}
