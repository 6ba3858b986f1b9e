use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    region::RegionKey,
    rng::SystemRng,
    world::World,
};

/// Moves people out of failing or migrating regions into the best-supplied
/// living neighbor that still has room. Every move is capped by the
/// target's headroom, so the pair's total headcount is conserved.
pub struct MigrationSystem;

impl MigrationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MigrationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MigrationSystem {
    fn name(&self) -> &'static str {
        "migration"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng<'_>) {
        let threshold = ctx.config.population.migration_threshold;
        let rate = ctx.config.population.migration_rate;
        for key in world.alive_keys() {
            let Some(region) = world.region(key) else {
                continue;
            };
            if region.population.health >= threshold && !region.migration_requested {
                continue;
            }
            let wanted = (region.population.count as f64 * rate).floor() as u64;
            if wanted == 0 {
                continue;
            }
            let Some(target) = best_destination(world, key) else {
                continue;
            };
            let moved = migrate(world, key, target, wanted);
            if moved > 0 {
                debug!(from = %key, to = %target, moved, "migration");
            }
        }
    }
}

/// Living neighbor with the most food and water per head among those below
/// capacity.
fn best_destination(world: &World, key: RegionKey) -> Option<RegionKey> {
    world
        .alive_neighbors(key)
        .into_iter()
        .filter_map(|neighbor| world.region(neighbor))
        .filter(|neighbor| neighbor.population.headroom() > 0)
        .map(|neighbor| {
            let per_capita = (neighbor.food.value() + neighbor.water.value())
                / neighbor.population.count.max(1) as f64;
            (neighbor.key, per_capita)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key)
}

/// Transfers up to `wanted` people from `from` to `to` and returns how many
/// moved.
pub fn migrate(world: &mut World, from: RegionKey, to: RegionKey, wanted: u64) -> u64 {
    let headroom = match world.region(to) {
        Some(target) => target.population.headroom(),
        None => return 0,
    };
    let leaving = match world.region_mut(from) {
        Some(source) => source.population.emigrate(wanted.min(headroom)),
        None => return 0,
    };
    match world.region_mut(to) {
        Some(target) => target.population.immigrate(leaving),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SimConfig, engine::EngineBuilder};

    /// Every region holds 100 of 500 people at full health with `stock`
    /// food and water.
    fn level_world(stock: f64) -> World {
        let mut world = World::generate(&SimConfig::default(), 8);
        for region in world.regions.values_mut() {
            region.population.capacity = 500;
            region.population.count = 100;
            region.population.health = 1.0;
            for pool in [&mut region.food, &mut region.water] {
                let max = pool.max();
                pool.apply_shock(-max);
                pool.apply_shock(stock);
            }
        }
        world
    }

    fn stock(world: &mut World, key: RegionKey, value: f64) {
        let region = world.region_mut(key).unwrap();
        for pool in [&mut region.food, &mut region.water] {
            let max = pool.max();
            pool.apply_shock(-max);
            pool.apply_shock(value);
        }
    }

    fn run_migration(world: &mut World) {
        let config = SimConfig::default();
        let mut engine = EngineBuilder::new(Some(1))
            .with_system(MigrationSystem::new())
            .build();
        engine.run_tick(&config, world);
    }

    fn count(world: &World, key: RegionKey) -> u64 {
        world.region(key).unwrap().population.count
    }

    #[test]
    fn sick_region_moves_a_share_to_the_richest_open_neighbor() {
        let mut world = level_world(100.0);
        let source = RegionKey::new(1, 1);
        let full = RegionKey::new(2, 1);
        let open = RegionKey::new(1, 2);
        world.region_mut(source).unwrap().population.health = 0.1;
        stock(&mut world, full, 900.0);
        stock(&mut world, open, 600.0);
        world.region_mut(full).unwrap().population.count = 500;

        run_migration(&mut world);

        let rate = SimConfig::default().population.migration_rate;
        let expected = (100.0 * rate).floor() as u64;
        assert_eq!(count(&world, source), 100 - expected);
        assert_eq!(count(&world, open), 100 + expected);
        assert_eq!(count(&world, full), 500);
        for other in [RegionKey::new(0, 1), RegionKey::new(1, 0)] {
            assert_eq!(count(&world, other), 100);
        }
    }

    #[test]
    fn requested_migration_moves_people_from_a_healthy_region() {
        let mut world = level_world(100.0);
        let source = RegionKey::new(3, 3);
        let target = RegionKey::new(3, 4);
        stock(&mut world, target, 700.0);
        world.region_mut(source).unwrap().migration_requested = true;

        run_migration(&mut world);

        assert_eq!(count(&world, source), 90);
        assert_eq!(count(&world, target), 110);
        assert_eq!(world.region(target).unwrap().population.migrants_in, 10);
    }

    #[test]
    fn healthy_regions_stay_put() {
        let mut world = level_world(100.0);
        let before = world.total_population();
        run_migration(&mut world);
        assert!(world
            .regions
            .values()
            .all(|region| region.population.count == 100));
        assert_eq!(world.total_population(), before);
    }

    #[test]
    fn migration_conserves_the_pair_total() {
        let mut world = World::generate(&SimConfig::default(), 8);
        let from = RegionKey::new(0, 0);
        let to = RegionKey::new(1, 0);
        let total_before = world.region(from).unwrap().population.count
            + world.region(to).unwrap().population.count;
        let moved = migrate(&mut world, from, to, 20);
        assert!(moved > 0);
        let total_after = world.region(from).unwrap().population.count
            + world.region(to).unwrap().population.count;
        assert_eq!(total_before, total_after);
        assert_eq!(world.region(to).unwrap().population.migrants_in, moved);
        assert_eq!(world.region(from).unwrap().population.migrants_out, moved);
    }

    #[test]
    fn full_target_accepts_nobody() {
        let mut world = World::generate(&SimConfig::default(), 8);
        let from = RegionKey::new(0, 0);
        let to = RegionKey::new(1, 0);
        {
            let target = world.region_mut(to).unwrap();
            target.population.count = target.population.capacity;
        }
        let before = world.region(from).unwrap().population.count;
        assert_eq!(migrate(&mut world, from, to, 20), 0);
        assert_eq!(world.region(from).unwrap().population.count, before);
    }
}
