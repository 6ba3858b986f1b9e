use tracing::info;

use crate::{
    agent::Policy,
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Closes out newly collapsed regions and latches the end of the run once
/// the collapsed share reaches the configured threshold.
pub struct CollapseSystem;

impl CollapseSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CollapseSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CollapseSystem {
    fn name(&self) -> &'static str {
        "collapse"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng<'_>) {
        let newly_collapsed: Vec<_> = world
            .regions
            .values()
            .filter(|region| region.is_collapsed() && region.collapsed_at.is_none())
            .map(|region| region.key)
            .collect();
        for key in newly_collapsed {
            let observation = world.observe(key);
            world.climate.clear_region(key);
            if let Some(region) = world.region_mut(key) {
                region.collapsed_at = Some(ctx.tick);
                region.population.health = 0.0;
                if let Some(observation) = observation {
                    region.agent.on_collapse(&observation);
                }
                info!(region = %key, tick = ctx.tick, "region collapsed");
            }
        }

        let collapsed = world.collapsed_fraction();
        if !world.is_ended() && collapsed > 0.0 && collapsed >= ctx.config.world.collapse_threshold
        {
            world.mark_ended();
            info!(
                tick = ctx.tick,
                collapsed_fraction = collapsed,
                "collapse threshold reached, simulation ended"
            );
        }
    }
}
