//! Per-region decision making.
//!
//! Both agent variants map an [`Observation`] of their region to an
//! [`Action`]; the world applies the action's effects the same way no matter
//! which variant chose it.

mod heuristic;
mod tabular;

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::RlConfig;

pub use heuristic::{Personality, PersonalityPolicy};
pub use tabular::{StateKey, TabularAgent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    FocusFood,
    FocusWater,
    Balance,
    Trade,
    Migrate,
    Stockpile,
    Expand,
    Conflict,
}

impl Action {
    /// Action set of the learning governor, indexed by Q-table column.
    pub const LEARNED: [Action; 6] = [
        Action::FocusFood,
        Action::FocusWater,
        Action::Balance,
        Action::Trade,
        Action::Migrate,
        Action::Stockpile,
    ];

    pub fn is_aggressive(self) -> bool {
        matches!(self, Action::Conflict)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::FocusFood => "focus_food",
            Action::FocusWater => "focus_water",
            Action::Balance => "balance",
            Action::Trade => "trade",
            Action::Migrate => "migrate",
            Action::Stockpile => "stockpile",
            Action::Expand => "expand",
            Action::Conflict => "conflict",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an agent sees of its region and surroundings at decision time.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub tick: u64,
    pub food_pct: f64,
    pub water_pct: f64,
    pub health: f64,
    pub density: f64,
    pub count: u64,
    pub capacity: u64,
    /// Mean stock fraction of living neighbors.
    pub neighbor_avg: f64,
    /// Mean stock fraction across every living region.
    pub global_avg: f64,
    /// Unrest of the region in `[0, 1]`.
    pub threat: f64,
    /// Strongest climate intensity currently affecting the region.
    pub weather: f64,
}

impl Observation {
    pub fn own_avg(&self) -> f64 {
        (self.food_pct + self.water_pct) / 2.0
    }

    pub fn scarcest(&self) -> f64 {
        self.food_pct.min(self.water_pct)
    }
}

/// Scoring of a transition between consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardWeights {
    pub growth: f64,
    pub health: f64,
    pub collapse_penalty: f64,
}

impl RewardWeights {
    pub fn from_config(config: &RlConfig) -> Self {
        Self {
            growth: config.growth_weight,
            health: config.health_weight,
            collapse_penalty: config.collapse_penalty,
        }
    }

    pub fn transition(&self, previous: &Observation, next: &Observation) -> f64 {
        let capacity = previous.capacity.max(1) as f64;
        let growth = (next.count as f64 - previous.count as f64) / capacity;
        let mut reward = self.growth * growth + self.health * (next.health - previous.health);
        if next.count == 0 {
            reward += self.collapse_penalty;
        }
        reward
    }
}

/// Decision-making capability shared by every agent variant.
pub trait Policy {
    fn decide<R: Rng + ?Sized>(&mut self, observation: &Observation, rng: &mut R) -> Action;

    /// Closes the episode when the region's population reaches zero.
    fn on_collapse(&mut self, observation: &Observation);

    fn view(&self) -> AgentView;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Tabular,
    Heuristic,
}

/// Serializable summary of an agent for snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub kind: AgentKind,
    pub strategy_label: String,
    pub last_action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_states: Option<usize>,
    pub total_reward: f64,
    pub decisions: u64,
}

#[derive(Debug, Clone)]
pub enum DecisionAgent {
    Tabular(TabularAgent),
    Heuristic(PersonalityPolicy),
}

impl DecisionAgent {
    pub fn kind(&self) -> AgentKind {
        match self {
            DecisionAgent::Tabular(_) => AgentKind::Tabular,
            DecisionAgent::Heuristic(_) => AgentKind::Heuristic,
        }
    }
}

impl Policy for DecisionAgent {
    fn decide<R: Rng + ?Sized>(&mut self, observation: &Observation, rng: &mut R) -> Action {
        match self {
            DecisionAgent::Tabular(agent) => agent.decide(observation, rng),
            DecisionAgent::Heuristic(agent) => agent.decide(observation, rng),
        }
    }

    fn on_collapse(&mut self, observation: &Observation) {
        match self {
            DecisionAgent::Tabular(agent) => agent.on_collapse(observation),
            DecisionAgent::Heuristic(agent) => agent.on_collapse(observation),
        }
    }

    fn view(&self) -> AgentView {
        match self {
            DecisionAgent::Tabular(agent) => agent.view(),
            DecisionAgent::Heuristic(agent) => agent.view(),
        }
    }
}

#[cfg(test)]
pub(crate) fn observation(food_pct: f64, water_pct: f64, health: f64, density: f64) -> Observation {
    Observation {
        tick: 0,
        food_pct,
        water_pct,
        health,
        density,
        count: (density * 100.0) as u64,
        capacity: 100,
        neighbor_avg: 0.5,
        global_avg: 0.5,
        threat: 0.0,
        weather: 0.0,
    }
}
