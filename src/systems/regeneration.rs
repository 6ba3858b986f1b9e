use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

pub struct RegenerationSystem;

impl RegenerationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RegenerationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for RegenerationSystem {
    fn name(&self) -> &'static str {
        "regeneration"
    }

    fn run(&mut self, _ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng<'_>) {
        for region in world.regions.values_mut() {
            region.food.regenerate();
            region.water.regenerate();
        }
    }
}
