use std::time::Instant;

use crate::{
    config::SimConfig,
    rng::{RngManager, SystemRng},
    world::World,
};

pub struct EngineBuilder {
    seed: Option<u64>,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.seed),
            systems: self.systems,
        }
    }
}

/// Runs the registered stage systems in order, one tick at a time.
pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
}

impl Engine {
    pub fn run_tick(&mut self, config: &SimConfig, world: &mut World) -> TickSummary {
        let current_tick = world.tick();
        let mut system_reports = Vec::with_capacity(self.systems.len());
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name());
            let ctx = SystemContext {
                tick: current_tick,
                config,
            };
            let start = Instant::now();
            system.run(&ctx, world, &mut rng_stream);
            system_reports.push(SystemRunReport {
                name: system.name(),
                duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
            });
        }
        world.advance_tick();
        TickSummary {
            tick: world.tick(),
            system_reports,
        }
    }

    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|system| system.name()).collect()
    }

    /// Seed for a regenerated world, drawn from the engine's master stream.
    pub fn next_world_seed(&mut self) -> u64 {
        self.rng.next_seed()
    }
}

#[derive(Clone, Debug)]
pub struct SystemRunReport {
    pub name: &'static str,
    pub duration_ms: f64,
}

#[derive(Clone, Debug)]
pub struct TickSummary {
    pub tick: u64,
    pub system_reports: Vec<SystemRunReport>,
}

impl TickSummary {
    pub fn total_ms(&self) -> f64 {
        self.system_reports.iter().map(|report| report.duration_ms).sum()
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub config: &'a SimConfig,
}

/// One ordered stage of the tick pipeline.
pub trait System: Send {
    fn name(&self) -> &'static str;
    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut SystemRng<'_>);
}
