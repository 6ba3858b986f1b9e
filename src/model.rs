use tracing::{debug, info};

use crate::{
    config::SimConfig,
    engine::{Engine, EngineBuilder, TickSummary},
    error::ControlError,
    snapshot::WorldSnapshot,
    systems::standard_pipeline,
    world::World,
};

#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// A tick ran and the world is still live.
    Advanced(TickSummary),
    /// The model is paused or already ended; nothing changed.
    Idle,
    /// This tick crossed the collapse threshold.
    Ended { tick: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Started,
    AlreadyRunning,
    Paused,
    AlreadyPaused,
    Reset,
}

impl ControlOutcome {
    pub fn message(self) -> &'static str {
        match self {
            ControlOutcome::Started => "simulation started",
            ControlOutcome::AlreadyRunning => "simulation already running",
            ControlOutcome::Paused => "simulation paused",
            ControlOutcome::AlreadyPaused => "simulation already paused",
            ControlOutcome::Reset => "simulation reset",
        }
    }
}

/// Lifecycle owner of the world: `running` gates ticking and the world's
/// `ended` latch is cleared only by [`WorldModel::reset`].
pub struct WorldModel {
    config: SimConfig,
    world: World,
    engine: Engine,
    running: bool,
}

impl WorldModel {
    pub fn new(config: SimConfig) -> Self {
        let mut engine = standard_pipeline(EngineBuilder::new(config.seed)).build();
        let world = World::generate(&config, engine.next_world_seed());
        info!(
            width = world.width(),
            height = world.height(),
            regions = world.regions.len(),
            "world generated"
        );
        Self {
            config,
            world,
            engine,
            running: false,
        }
    }

    pub fn step(&mut self) -> StepOutcome {
        if !self.running || self.world.is_ended() {
            return StepOutcome::Idle;
        }
        for region in self.world.regions.values_mut() {
            region.begin_tick();
        }
        let summary = self.engine.run_tick(&self.config, &mut self.world);
        debug!(
            tick = summary.tick,
            elapsed_ms = summary.total_ms(),
            population = self.world.total_population(),
            "tick complete"
        );
        if self.world.is_ended() {
            self.running = false;
            return StepOutcome::Ended { tick: summary.tick };
        }
        StepOutcome::Advanced(summary)
    }

    pub fn start(&mut self) -> Result<ControlOutcome, ControlError> {
        if self.world.is_ended() {
            return Err(ControlError::Ended);
        }
        if self.running {
            return Ok(ControlOutcome::AlreadyRunning);
        }
        self.running = true;
        info!(tick = self.world.tick(), "simulation started");
        Ok(ControlOutcome::Started)
    }

    pub fn pause(&mut self) -> ControlOutcome {
        if !self.running {
            return ControlOutcome::AlreadyPaused;
        }
        self.running = false;
        info!(tick = self.world.tick(), "simulation paused");
        ControlOutcome::Paused
    }

    /// Rebuilds the world from fresh terrain. Tick count, agent learning and
    /// climate state are all discarded.
    pub fn reset(&mut self) -> ControlOutcome {
        let seed = self.engine.next_world_seed();
        let previous_tick = self.world.tick();
        self.world = World::generate(&self.config, seed);
        self.running = false;
        info!(previous_tick, "simulation reset");
        ControlOutcome::Reset
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.world, self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_ended(&self) -> bool {
        self.world.is_ended()
    }

    pub fn tick(&self) -> u64 {
        self.world.tick()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
