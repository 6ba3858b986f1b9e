//! Stochastic per-region climate events.

use std::collections::BTreeMap;
use std::fmt;

use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};
use serde::{Deserialize, Serialize};

use crate::{config::ClimateConfig, region::RegionKey, terrain::ClimateZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateEventKind {
    Drought,
    Flood,
    Heatwave,
    Frost,
    Storm,
}

impl ClimateEventKind {
    pub const ALL: [ClimateEventKind; 5] = [
        ClimateEventKind::Drought,
        ClimateEventKind::Flood,
        ClimateEventKind::Heatwave,
        ClimateEventKind::Frost,
        ClimateEventKind::Storm,
    ];

    /// Per-unit-intensity change as a fraction of pool max: (food, water).
    pub fn effect(self) -> (f64, f64) {
        match self {
            ClimateEventKind::Drought => (-0.4, -0.8),
            ClimateEventKind::Flood => (-0.3, 0.5),
            ClimateEventKind::Heatwave => (-0.5, -0.6),
            ClimateEventKind::Frost => (-0.7, -0.2),
            ClimateEventKind::Storm => (-0.2, 0.2),
        }
    }

    /// Spawn weights for a zone, in `ClimateEventKind::ALL` order.
    fn zone_weights(zone: ClimateZone) -> [f64; 5] {
        match zone {
            ClimateZone::Tropical => [0.10, 0.35, 0.25, 0.05, 0.25],
            ClimateZone::Arid => [0.45, 0.05, 0.30, 0.05, 0.15],
            ClimateZone::Temperate => [0.15, 0.20, 0.15, 0.20, 0.30],
            ClimateZone::Continental => [0.15, 0.15, 0.15, 0.35, 0.20],
            ClimateZone::Polar => [0.05, 0.10, 0.05, 0.50, 0.30],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClimateEventKind::Drought => "drought",
            ClimateEventKind::Flood => "flood",
            ClimateEventKind::Heatwave => "heatwave",
            ClimateEventKind::Frost => "frost",
            ClimateEventKind::Storm => "storm",
        }
    }
}

impl fmt::Display for ClimateEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateEvent {
    pub kind: ClimateEventKind,
    pub severity: f64,
    pub ticks_remaining: u32,
    pub initial_duration: u32,
}

/// Summed climate pressure on a region for one tick, as fractions of max.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateDelta {
    pub food: f64,
    pub water: f64,
}

impl ClimateEvent {
    pub fn new(kind: ClimateEventKind, severity: f64, duration: u32) -> Self {
        Self {
            kind,
            severity,
            ticks_remaining: duration,
            initial_duration: duration,
        }
    }

    /// Severity scaled by the remaining share of the event's lifetime.
    pub fn intensity(&self) -> f64 {
        if self.initial_duration == 0 {
            return 0.0;
        }
        self.severity * self.ticks_remaining as f64 / self.initial_duration as f64
    }

    pub fn is_expired(&self) -> bool {
        self.ticks_remaining == 0
    }

    /// Emits this tick's effect at the current intensity, then counts down.
    pub fn tick(&mut self) -> ClimateDelta {
        let intensity = self.intensity();
        let (food, water) = self.kind.effect();
        self.ticks_remaining = self.ticks_remaining.saturating_sub(1);
        ClimateDelta {
            food: food * intensity,
            water: water * intensity,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ClimateSystem {
    active: BTreeMap<RegionKey, Vec<ClimateEvent>>,
}

impl ClimateSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rolls the spawn chance for one region and records the new event.
    pub fn maybe_spawn<R: Rng>(
        &mut self,
        key: RegionKey,
        zone: ClimateZone,
        config: &ClimateConfig,
        rng: &mut R,
    ) -> Option<ClimateEventKind> {
        if !rng.gen_bool(config.event_probability.clamp(0.0, 1.0)) {
            return None;
        }
        let weights = WeightedIndex::new(ClimateEventKind::zone_weights(zone)).ok()?;
        let kind = ClimateEventKind::ALL[weights.sample(rng)];
        let severity = if config.max_severity > config.min_severity {
            rng.gen_range(config.min_severity..=config.max_severity)
        } else {
            config.min_severity
        };
        let duration = rng.gen_range(config.min_duration..=config.max_duration.max(config.min_duration));
        self.active
            .entry(key)
            .or_default()
            .push(ClimateEvent::new(kind, severity, duration));
        Some(kind)
    }

    pub fn insert(&mut self, key: RegionKey, event: ClimateEvent) {
        self.active.entry(key).or_default().push(event);
    }

    /// Ticks every event of the region, drops the expired ones and returns
    /// the summed delta scaled by `effect_scale`.
    pub fn advance(&mut self, key: RegionKey, effect_scale: f64) -> ClimateDelta {
        let Some(events) = self.active.get_mut(&key) else {
            return ClimateDelta::default();
        };
        let mut total = ClimateDelta::default();
        for event in events.iter_mut() {
            let delta = event.tick();
            total.food += delta.food * effect_scale;
            total.water += delta.water * effect_scale;
        }
        events.retain(|event| !event.is_expired());
        if events.is_empty() {
            self.active.remove(&key);
        }
        total
    }

    pub fn events_for(&self, key: RegionKey) -> &[ClimateEvent] {
        self.active.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Largest current intensity affecting the region.
    pub fn peak_intensity(&self, key: RegionKey) -> f64 {
        self.events_for(key)
            .iter()
            .map(ClimateEvent::intensity)
            .fold(0.0, f64::max)
    }

    pub fn clear_region(&mut self, key: RegionKey) {
        self.active.remove(&key);
    }

    pub fn active_count(&self) -> usize {
        self.active.values().map(Vec::len).sum()
    }

    pub fn reset(&mut self) {
        self.active.clear();
    }
}
