pub mod agent;
pub mod bridge;
pub mod climate;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod population;
pub mod protocol;
pub mod region;
pub mod resource;
pub mod rng;
pub mod snapshot;
pub mod systems;
pub mod terrain;
pub mod web;
pub mod world;

pub use config::{ConfigLoader, SimConfig};
pub use engine::{Engine, EngineBuilder, TickSummary};
pub use model::{StepOutcome, WorldModel};
pub use snapshot::WorldSnapshot;
