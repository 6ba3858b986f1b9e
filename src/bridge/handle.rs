use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};

use super::broadcast::BroadcastPipeline;
use crate::{
    config::RuntimeConfig,
    error::ControlError,
    model::{ControlOutcome, StepOutcome, WorldModel},
    protocol::ControlAction,
    snapshot::{region_listing, RegionListing, WorldSnapshot},
};

/// Shared owner of the model. Every mutation, whether a tick or a control
/// command, goes through the one model lock.
pub struct SimHandle {
    model: Mutex<WorldModel>,
    pipeline: Arc<BroadcastPipeline>,
    resume: Notify,
    started_at: DateTime<Utc>,
    runtime: RuntimeConfig,
}

impl SimHandle {
    pub fn new(model: WorldModel) -> Arc<Self> {
        let runtime = model.config().runtime.clone();
        let pipeline = Arc::new(BroadcastPipeline::new(
            runtime.queue_capacity,
            runtime.subscriber_buffer,
        ));
        pipeline.publish(model.snapshot());
        Arc::new(Self {
            model: Mutex::new(model),
            pipeline,
            resume: Notify::new(),
            started_at: Utc::now(),
            runtime,
        })
    }

    pub fn pipeline(&self) -> &Arc<BroadcastPipeline> {
        &self.pipeline
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub async fn start(&self) -> Result<ControlOutcome, ControlError> {
        let outcome = self.model.lock().await.start()?;
        self.resume.notify_one();
        Ok(outcome)
    }

    pub async fn pause(&self) -> ControlOutcome {
        self.model.lock().await.pause()
    }

    /// Rebuilds the world and makes the fresh state the only buffered
    /// snapshot, so the next drain shows observers the reset.
    pub async fn reset(&self) -> ControlOutcome {
        let mut model = self.model.lock().await;
        let outcome = model.reset();
        self.pipeline.replace(model.snapshot());
        outcome
    }

    pub async fn control(&self, action: ControlAction) -> Result<ControlOutcome, ControlError> {
        match action {
            ControlAction::Start => self.start().await,
            ControlAction::Pause => Ok(self.pause().await),
            ControlAction::Reset => Ok(self.reset().await),
        }
    }

    pub async fn snapshot(&self) -> WorldSnapshot {
        self.model.lock().await.snapshot()
    }

    pub async fn regions(&self) -> Vec<RegionListing> {
        region_listing(self.model.lock().await.world())
    }

    pub async fn is_running(&self) -> bool {
        self.model.lock().await.is_running()
    }

    /// (running, ended, tick) read under one lock.
    pub async fn status(&self) -> (bool, bool, u64) {
        let model = self.model.lock().await;
        (model.is_running(), model.is_ended(), model.tick())
    }

    /// Advances one tick and publishes the resulting snapshot.
    pub async fn tick_once(&self) -> StepOutcome {
        let mut model = self.model.lock().await;
        let outcome = model.step();
        if !matches!(outcome, StepOutcome::Idle) {
            self.pipeline.publish(model.snapshot());
        }
        outcome
    }

    /// Resolves once `start` has been called since the last wait.
    pub async fn resumed(&self) {
        self.resume.notified().await;
    }

    /// Direct access for tests and headless drivers.
    pub async fn with_model<T>(&self, f: impl FnOnce(&mut WorldModel) -> T) -> T {
        let mut model = self.model.lock().await;
        f(&mut model)
    }
}
