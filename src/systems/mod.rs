mod collapse;
mod decision;
mod migration;
mod population;
mod regeneration;
mod weather;

pub use collapse::CollapseSystem;
pub use decision::{apply_action, DecisionSystem};
pub use migration::{migrate, MigrationSystem};
pub use population::PopulationSystem;
pub use regeneration::RegenerationSystem;
pub use weather::WeatherSystem;

use crate::engine::EngineBuilder;

/// Registers the stages in tick order.
pub fn standard_pipeline(builder: EngineBuilder) -> EngineBuilder {
    builder
        .with_system(DecisionSystem::new())
        .with_system(PopulationSystem::new())
        .with_system(WeatherSystem::new())
        .with_system(RegenerationSystem::new())
        .with_system(MigrationSystem::new())
        .with_system(CollapseSystem::new())
}
