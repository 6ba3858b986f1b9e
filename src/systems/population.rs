use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Births, deaths and health for every living region, paid for out of the
/// region's own pools.
pub struct PopulationSystem;

impl PopulationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PopulationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PopulationSystem {
    fn name(&self) -> &'static str {
        "population"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng<'_>) {
        let resources = &ctx.config.resources;
        let ration_cut = ctx.config.actions.ration_cut;
        for key in world.alive_keys() {
            let Some(region) = world.region_mut(key) else {
                continue;
            };
            let share = if region.rationing {
                1.0 - ration_cut
            } else {
                1.0
            };
            let count = region.population.count as f64;
            let food_needed = count * resources.food_per_capita * share;
            let water_needed = count * resources.water_per_capita * share;
            let eaten = region.population.tick(
                &ctx.config.population,
                region.food.value(),
                region.water.value(),
                food_needed,
                water_needed,
            );
            region.food.consume(eaten.food);
            region.water.consume(eaten.water);
        }
    }
}
