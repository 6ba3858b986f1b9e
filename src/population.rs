use serde::{Deserialize, Serialize};

use crate::config::PopulationConfig;

/// Headcount, health and per-tick demographic counters of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    pub count: u64,
    pub health: f64,
    pub capacity: u64,
    base_capacity: u64,
    pub births: u64,
    pub deaths: u64,
    pub migrants_in: u64,
    pub migrants_out: u64,
}

/// Food and water actually eaten during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Consumption {
    pub food: f64,
    pub water: f64,
}

impl Population {
    pub fn new(count: u64, capacity: u64) -> Self {
        Self {
            count: count.min(capacity),
            health: 1.0,
            capacity,
            base_capacity: capacity,
            births: 0,
            deaths: 0,
            migrants_in: 0,
            migrants_out: 0,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.count == 0
    }

    pub fn density(&self) -> f64 {
        self.count as f64 / self.capacity.max(1) as f64
    }

    pub fn headroom(&self) -> u64 {
        self.capacity.saturating_sub(self.count)
    }

    pub fn reset_counters(&mut self) {
        self.births = 0;
        self.deaths = 0;
        self.migrants_in = 0;
        self.migrants_out = 0;
    }

    /// Grows capacity by `fraction`, never beyond twice the starting value.
    /// Returns whether anything changed.
    pub fn expand_capacity(&mut self, fraction: f64) -> bool {
        let ceiling = self.base_capacity.saturating_mul(2);
        let grown = ((self.capacity as f64) * (1.0 + fraction)).ceil() as u64;
        let next = grown.min(ceiling);
        let changed = next > self.capacity;
        self.capacity = next;
        changed
    }

    /// Advances births, deaths and health by one tick given the supply on
    /// hand and the demand of the current headcount.
    pub fn tick(
        &mut self,
        config: &PopulationConfig,
        food_available: f64,
        water_available: f64,
        food_needed: f64,
        water_needed: f64,
    ) -> Consumption {
        if self.is_collapsed() {
            self.health = 0.0;
            self.births = 0;
            self.deaths = 0;
            return Consumption::default();
        }

        let food_ratio = (food_available.max(0.0) / food_needed.max(1.0)).min(1.0);
        let water_ratio = (water_available.max(0.0) / water_needed.max(1.0)).min(1.0);

        let mut health = self.health;
        if food_ratio < 0.5 {
            health -= config.health_decay_no_food * (1.0 - food_ratio);
        }
        if water_ratio < 0.5 {
            health -= config.health_decay_no_water * (1.0 - water_ratio);
        }
        if food_ratio > 0.7 && water_ratio > 0.7 {
            health += config.health_regen_rate;
        }
        self.health = health.clamp(0.0, 1.0);

        let mut death_rate = config.base_death_rate;
        if food_ratio < 0.3 {
            death_rate += config.starvation_death_rate * (1.0 - food_ratio);
        }
        if water_ratio < 0.3 {
            death_rate += config.dehydration_death_rate * (1.0 - water_ratio);
        }
        if self.health < 0.3 {
            death_rate += config.low_health_death_rate * (1.0 - self.health);
        }

        let density = self.density();
        let birth_rate = config.base_birth_rate
            * self.health
            * food_ratio.min(water_ratio)
            * (1.0 - density * density).max(0.0);

        let births = (self.count as f64 * birth_rate).floor().max(0.0) as u64;
        let deaths = (self.count as f64 * death_rate).floor().max(0.0) as u64;
        self.births = births;
        self.deaths = deaths;
        self.count = (self.count + births).saturating_sub(deaths);
        if self.count == 0 {
            self.health = 0.0;
        }

        Consumption {
            food: food_available.max(0.0).min(food_needed.max(0.0)),
            water: water_available.max(0.0).min(water_needed.max(0.0)),
        }
    }

    /// Removes up to `n` residents, always leaving one behind.
    pub fn emigrate(&mut self, n: u64) -> u64 {
        let leaving = n.min(self.count.saturating_sub(1));
        self.count -= leaving;
        self.migrants_out += leaving;
        leaving
    }

    /// Accepts up to the remaining capacity headroom.
    pub fn immigrate(&mut self, n: u64) -> u64 {
        let arriving = n.min(self.headroom());
        self.count += arriving;
        self.migrants_in += arriving;
        arriving
    }
}
