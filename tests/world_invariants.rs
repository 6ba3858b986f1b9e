use worldsim::{
    agent::{Action, AgentKind, Personality, Policy},
    config::{AgentMix, ConfigLoader, SimConfig},
    engine::EngineBuilder,
    model::{StepOutcome, WorldModel},
    region::RegionKey,
    systems::{standard_pipeline, PopulationSystem},
    world::World,
};

fn config(seed: u64) -> SimConfig {
    SimConfig {
        seed: Some(seed),
        ..SimConfig::default()
    }
}

fn stormy_config(seed: u64) -> SimConfig {
    let mut config = config(seed);
    config.climate.event_probability = 0.6;
    config.climate.effect_scale = 0.5;
    config
}

fn assert_bounds(world: &World) {
    for region in world.regions.values() {
        for pool in [&region.food, &region.water] {
            assert!(pool.value() >= 0.0, "{} pool below zero", region.key);
            assert!(pool.value() <= pool.max(), "{} pool above max", region.key);
        }
        assert!((0.0..=1.0).contains(&region.population.health));
        assert!((0.0..=1.0).contains(&region.unrest));
    }
}

#[test]
fn bundled_config_loads() {
    let loader = ConfigLoader::new(env!("CARGO_MANIFEST_DIR"));
    let config = loader.load("scenarios/default.yaml").unwrap();
    assert_eq!(config.grid.width, 5);
    assert_eq!(config.world.agent_mix, AgentMix::Mixed);
    assert_eq!(config.runtime.queue_capacity, 8);
}

#[test]
fn pools_and_health_stay_bounded_under_harsh_weather() {
    let config = stormy_config(3);
    let mut model = WorldModel::new(config);
    model.start().unwrap();
    for _ in 0..300 {
        let outcome = model.step();
        assert_bounds(model.world());
        if matches!(outcome, StepOutcome::Ended { .. }) {
            break;
        }
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let mut a = WorldModel::new(config(11));
    let mut b = WorldModel::new(config(11));
    a.start().unwrap();
    b.start().unwrap();
    for _ in 0..50 {
        a.step();
        b.step();
    }
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn starving_region_loses_health() {
    let config = config(5);
    let mut world = World::generate(&config, 5);
    let key = RegionKey::new(0, 0);
    {
        let region = world.region_mut(key).unwrap();
        region.food.apply_shock(-10_000.0);
    }
    let mut engine = EngineBuilder::new(Some(5))
        .with_system(PopulationSystem::new())
        .build();
    engine.run_tick(&config, &mut world);
    let region = world.region(key).unwrap();
    assert!(region.population.health < 1.0);
    assert_eq!(region.food.value(), 0.0);
}

#[test]
fn ended_model_ignores_step() {
    let mut config = config(9);
    config.world.collapse_threshold = 0.04;
    let mut model = WorldModel::new(config);
    model.start().unwrap();
    {
        let world = model.world_mut();
        let region = world.region_mut(RegionKey::new(2, 2)).unwrap();
        region.population.count = 0;
    }
    let outcome = model.step();
    assert!(matches!(outcome, StepOutcome::Ended { tick: 1 }));
    assert!(model.is_ended());
    assert!(!model.is_running());

    let frozen = model.snapshot();
    assert!(matches!(model.step(), StepOutcome::Idle));
    assert!(model.start().is_err());
    assert!(matches!(model.step(), StepOutcome::Idle));
    assert_eq!(model.snapshot(), frozen);
}

#[test]
fn paused_model_does_not_advance() {
    let mut model = WorldModel::new(config(2));
    assert!(matches!(model.step(), StepOutcome::Idle));
    model.start().unwrap();
    model.step();
    model.pause();
    let tick = model.tick();
    model.step();
    assert_eq!(model.tick(), tick);
    assert_eq!(tick, 1);
}

#[test]
fn reset_discards_everything() {
    let mut model = WorldModel::new(config(4));
    let seed_before = model.world().terrain_seed();
    {
        let world = model.world_mut();
        for _ in 0..137 {
            world.advance_tick();
        }
        world.mark_ended();
    }
    assert_eq!(model.tick(), 137);
    assert!(model.is_ended());

    model.reset();
    assert_eq!(model.tick(), 0);
    assert!(!model.is_ended());
    assert!(!model.is_running());
    assert_ne!(model.world().terrain_seed(), seed_before);
    for region in model.world().regions.values() {
        assert_eq!(region.agent.view().decisions, 0);
        assert!(region.last_action.is_none());
    }
    assert!(model.start().is_ok());
}

#[test]
fn collapsed_regions_stay_collapsed() {
    let mut model = WorldModel::new(config(12));
    model.start().unwrap();
    let key = RegionKey::new(1, 1);
    model.world_mut().region_mut(key).unwrap().population.count = 0;
    for _ in 0..30 {
        model.step();
        let region = model.world().region(key).unwrap();
        assert_eq!(region.population.count, 0);
        assert_eq!(region.population.migrants_in, 0);
    }
    let region = model.world().region(key).unwrap();
    assert_eq!(region.collapsed_at, Some(0));
    assert!(model.world().climate.events_for(key).is_empty());
}

#[test]
fn agents_decide_every_tick() {
    let mut model = WorldModel::new(config(21));
    model.start().unwrap();
    for _ in 0..10 {
        model.step();
    }
    let snapshot = model.snapshot();
    for region in &snapshot.regions {
        assert_eq!(region.agent.decisions, 10, "region {}", region.key);
        let action = region.last_action.expect("decided");
        if region.agent.kind == AgentKind::Tabular {
            assert!(Action::LEARNED.contains(&action));
            assert!(region.agent.epsilon.unwrap() < 0.15);
            assert!(region.agent.score.is_none());
        } else {
            assert!(region.agent.score.is_some());
            assert!(region.agent.epsilon.is_none());
        }
    }

    let json = serde_json::to_value(&snapshot).unwrap();
    let tabular = &json["regions"][0]["agent"];
    let heuristic = &json["regions"][1]["agent"];
    assert_eq!(tabular["kind"], "tabular");
    assert!(tabular["epsilon"].is_f64());
    assert_eq!(heuristic["kind"], "heuristic");
    assert!(heuristic["score"].is_f64());

    let region = snapshot.region("0-1").expect("listed region");
    assert_eq!(region.agent.kind, AgentKind::Heuristic);
    assert!((0..5).any(|slot| Personality::preset(slot).label == region.agent.strategy_label));
}

#[test]
fn pipeline_runs_stages_in_order() {
    let engine = standard_pipeline(EngineBuilder::new(Some(1))).build();
    assert_eq!(
        engine.system_names(),
        vec!["decision", "population", "weather", "regeneration", "migration", "collapse"]
    );
}
