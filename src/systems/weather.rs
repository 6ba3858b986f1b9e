use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Rolls new climate events and applies the summed pressure of active ones.
pub struct WeatherSystem;

impl WeatherSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeatherSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for WeatherSystem {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut SystemRng<'_>) {
        let climate = &ctx.config.climate;
        let system = &mut world.climate;
        for (key, region) in world.regions.iter_mut() {
            if region.is_collapsed() {
                system.clear_region(*key);
                continue;
            }
            if let Some(kind) = system.maybe_spawn(*key, region.zone, climate, rng) {
                debug!(region = %key, event = %kind, tick = ctx.tick, "climate event started");
            }
            let delta = system.advance(*key, climate.effect_scale);
            let food_shock = delta.food * region.food.max();
            let water_shock = delta.water * region.water.max();
            region.food.apply_shock(food_shock);
            region.water.apply_shock(water_shock);
        }
    }
}
