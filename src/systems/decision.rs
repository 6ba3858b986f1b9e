use rand::Rng;
use tracing::trace;

use crate::{
    agent::{Action, Policy},
    config::ActionConfig,
    engine::{System, SystemContext},
    region::{ResourceKind, RegionKey},
    rng::SystemRng,
    world::World,
};

/// Share of the stolen or traded amount that survives the transfer.
const TRANSFER_EFFICIENCY: f64 = 0.8;
const HIGH_UNREST: f64 = 0.7;

/// Every living region's agent observes, decides and acts.
pub struct DecisionSystem;

impl DecisionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DecisionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DecisionSystem {
    fn name(&self) -> &'static str {
        "decision"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut SystemRng<'_>) {
        let actions = &ctx.config.actions;
        for key in world.alive_keys() {
            if let Some(region) = world.region_mut(key) {
                let noise: f64 = rng.gen_range(-0.01..=0.01);
                let pull = 0.01 * (region.unrest_baseline - region.unrest);
                region.adjust_unrest(pull + noise);
                if region.unrest > HIGH_UNREST {
                    let drain = region.food.value() * actions.unrest_food_drain;
                    region.food.consume(drain);
                }
            }

            let Some(observation) = world.observe(key) else {
                continue;
            };
            let Some(region) = world.region_mut(key) else {
                continue;
            };
            let action = region.agent.decide(&observation, rng);
            region.last_action = Some(action);
            trace!(region = %key, action = %action, "agent decided");
            apply_action(world, key, action, actions, rng);
        }
    }
}

/// Applies the direct effects of `action` taken by the region at `key`.
pub fn apply_action<R: Rng + ?Sized>(
    world: &mut World,
    key: RegionKey,
    action: Action,
    config: &ActionConfig,
    rng: &mut R,
) {
    match action {
        Action::FocusFood => focus(world, key, ResourceKind::Food, config),
        Action::FocusWater => focus(world, key, ResourceKind::Water, config),
        Action::Balance => {
            if let Some(region) = world.region_mut(key) {
                region.food.relax_multiplier(0.25);
                region.water.relax_multiplier(0.25);
            }
        }
        Action::Trade => trade(world, key, config),
        Action::Migrate => {
            if let Some(region) = world.region_mut(key) {
                region.migration_requested = true;
            }
        }
        Action::Stockpile => stockpile(world, key, config),
        Action::Expand => expand(world, key, config),
        Action::Conflict => conflict(world, key, config, rng),
    }
}

fn focus(world: &mut World, key: RegionKey, kind: ResourceKind, config: &ActionConfig) {
    if let Some(region) = world.region_mut(key) {
        region.pool_mut(kind).adjust_multiplier(config.focus_step);
        region.pool_mut(kind.other()).adjust_multiplier(-config.focus_penalty);
    }
}

fn stockpile(world: &mut World, key: RegionKey, config: &ActionConfig) {
    if let Some(region) = world.region_mut(key) {
        region.rationing = true;
        region.population.health =
            (region.population.health - config.ration_health_cost).clamp(0.0, 1.0);
        region.adjust_unrest(-0.01);
    }
}

fn expand(world: &mut World, key: RegionKey, config: &ActionConfig) {
    let Some(region) = world.region_mut(key) else {
        return;
    };
    let food_cost = region.food.max() * config.expand_cost;
    let water_cost = region.water.max() * config.expand_cost;
    if region.food.value() < food_cost || region.water.value() < water_cost {
        stockpile(world, key, config);
        return;
    }
    region.food.consume(food_cost);
    region.water.consume(water_cost);
    region.population.expand_capacity(0.05);
    region.adjust_unrest(0.01);
}

/// Swaps part of the region's more abundant pool for the scarcer one with
/// the living neighbor holding the most of it.
fn trade(world: &mut World, key: RegionKey, config: &ActionConfig) {
    let Some(region) = world.region(key) else {
        return;
    };
    let want = region.scarcest();
    let give = want.other();
    let offer = region.pool(give).max() * config.trade_fraction;
    let partner = world
        .alive_neighbors(key)
        .into_iter()
        .filter_map(|neighbor| world.region(neighbor))
        .max_by(|a, b| a.pool(want).value().total_cmp(&b.pool(want).value()))
        .map(|partner| partner.key);
    let Some(partner) = partner else {
        return;
    };

    let given = match world.region_mut(key) {
        Some(region) => region.pool_mut(give).consume(offer),
        None => return,
    };
    let paid = match world.region_mut(partner) {
        Some(partner) => {
            let paid = partner.pool_mut(want).consume(given);
            partner.pool_mut(give).deposit(given * TRANSFER_EFFICIENCY);
            partner.trades += 1;
            paid
        }
        None => 0.0,
    };
    if let Some(region) = world.region_mut(key) {
        region.pool_mut(want).deposit(paid);
        region.trades += 1;
        region.adjust_unrest(-0.01);
    }
}

/// Raids the weakest living neighbor.
fn conflict<R: Rng + ?Sized>(world: &mut World, key: RegionKey, config: &ActionConfig, rng: &mut R) {
    let target = world
        .alive_neighbors(key)
        .into_iter()
        .filter_map(|neighbor| world.region(neighbor))
        .min_by(|a, b| a.stock_avg().total_cmp(&b.stock_avg()))
        .map(|target| target.key);
    let Some(target) = target else {
        return;
    };
    let Some(unrest) = world.region(key).map(|region| region.unrest) else {
        return;
    };

    let success = rng.gen_bool((0.45 + 0.35 * unrest).clamp(0.0, 1.0));
    if success {
        let loot = match world.region_mut(target) {
            Some(victim) => {
                let richer = if victim.food.value() >= victim.water.value() {
                    ResourceKind::Food
                } else {
                    ResourceKind::Water
                };
                let amount = victim.pool(richer).max() * config.steal_fraction;
                let taken = victim.pool_mut(richer).consume(amount);
                victim.adjust_unrest(0.03);
                Some((richer, taken))
            }
            None => None,
        };
        if let (Some((kind, taken)), Some(region)) = (loot, world.region_mut(key)) {
            region.pool_mut(kind).deposit(taken * TRANSFER_EFFICIENCY);
            region.adjust_unrest(0.01);
            region.conflicts += 1;
        }
    } else if let Some(region) = world.region_mut(key) {
        let loss = region.food.max() * config.steal_fraction / 2.0;
        region.food.consume(loss);
        region.adjust_unrest(0.02);
        region.conflicts += 1;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::config::SimConfig;

    fn world() -> World {
        World::generate(&SimConfig::default(), 17)
    }

    #[test]
    fn focus_shifts_multipliers() {
        let mut world = world();
        let key = RegionKey::new(0, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        apply_action(&mut world, key, Action::FocusWater, &ActionConfig::default(), &mut rng);
        let region = world.region(key).unwrap();
        assert!((region.water.regen_multiplier() - 1.1).abs() < 1e-9);
        assert!((region.food.regen_multiplier() - 0.95).abs() < 1e-9);
    }

    #[test]
    fn trade_moves_scarce_resource_in() {
        let mut world = world();
        let key = RegionKey::new(0, 0);
        world.region_mut(key).unwrap().water.apply_shock(-700.0);
        let water_before = world.region(key).unwrap().water.value();
        let food_before = world.region(key).unwrap().food.value();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        apply_action(&mut world, key, Action::Trade, &ActionConfig::default(), &mut rng);
        let region = world.region(key).unwrap();
        assert!(region.water.value() > water_before);
        assert!(region.food.value() < food_before);
        assert_eq!(region.trades, 1);
    }

    #[test]
    fn expand_without_stock_falls_back_to_rationing() {
        let mut world = world();
        let key = RegionKey::new(1, 1);
        {
            let region = world.region_mut(key).unwrap();
            region.food.apply_shock(-1_000.0);
        }
        let capacity = world.region(key).unwrap().population.capacity;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        apply_action(&mut world, key, Action::Expand, &ActionConfig::default(), &mut rng);
        let region = world.region(key).unwrap();
        assert_eq!(region.population.capacity, capacity);
        assert!(region.rationing);
    }

    #[test]
    fn conflict_keeps_pools_in_bounds() {
        let mut world = world();
        let key = RegionKey::new(2, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        for _ in 0..40 {
            apply_action(&mut world, key, Action::Conflict, &ActionConfig::default(), &mut rng);
        }
        for region in world.regions.values() {
            assert!(region.food.value() >= 0.0 && region.food.value() <= region.food.max());
            assert!(region.water.value() >= 0.0 && region.water.value() <= region.water.max());
            assert!((0.0..=1.0).contains(&region.unrest));
        }
        assert_eq!(world.region(key).unwrap().conflicts, 40);
    }
}
