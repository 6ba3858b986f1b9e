use std::collections::VecDeque;
use std::f64::consts::TAU;

use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};

use super::{Action, AgentKind, AgentView, Observation, Policy, RewardWeights};
use crate::config::HeuristicConfig;

/// Threshold and weight record that gives a heuristic policy its character.
#[derive(Debug, Clone, PartialEq)]
pub struct Personality {
    pub label: &'static str,
    pub threat_threshold: f64,
    pub critical_threshold: f64,
    pub scarcity_threshold: f64,
    pub surplus_threshold: f64,
    pub envy_threshold: f64,
    pub surplus_action: Action,
    /// Base weights for stockpile, trade, expand and conflict.
    pub weights: [f64; 4],
    /// Level unrest drifts back toward.
    pub unrest_baseline: f64,
}

const FALLBACK_ACTIONS: [Action; 4] = [
    Action::Stockpile,
    Action::Trade,
    Action::Expand,
    Action::Conflict,
];

impl Personality {
    pub fn hoarder() -> Self {
        Self {
            label: "hoarder",
            threat_threshold: 0.7,
            critical_threshold: 0.25,
            scarcity_threshold: 0.3,
            surplus_threshold: 0.6,
            envy_threshold: 0.25,
            surplus_action: Action::Stockpile,
            weights: [0.5, 0.2, 0.2, 0.1],
            unrest_baseline: 0.3,
        }
    }

    pub fn sustainist() -> Self {
        Self {
            label: "sustainist",
            threat_threshold: 0.75,
            critical_threshold: 0.2,
            scarcity_threshold: 0.35,
            surplus_threshold: 0.7,
            envy_threshold: 0.5,
            surplus_action: Action::Stockpile,
            weights: [0.3, 0.5, 0.15, 0.05],
            unrest_baseline: 0.15,
        }
    }

    pub fn industrialist() -> Self {
        Self {
            label: "industrialist",
            threat_threshold: 0.7,
            critical_threshold: 0.25,
            scarcity_threshold: 0.3,
            surplus_threshold: 0.65,
            envy_threshold: 0.3,
            surplus_action: Action::Expand,
            weights: [0.1, 0.25, 0.5, 0.15],
            unrest_baseline: 0.35,
        }
    }

    pub fn opportunist() -> Self {
        Self {
            label: "opportunist",
            threat_threshold: 0.6,
            critical_threshold: 0.3,
            scarcity_threshold: 0.25,
            surplus_threshold: 0.75,
            envy_threshold: 0.15,
            surplus_action: Action::Expand,
            weights: [0.15, 0.3, 0.2, 0.35],
            unrest_baseline: 0.5,
        }
    }

    pub fn integrator() -> Self {
        Self {
            label: "integrator",
            threat_threshold: 0.8,
            critical_threshold: 0.2,
            scarcity_threshold: 0.4,
            surplus_threshold: 0.7,
            envy_threshold: 0.6,
            surplus_action: Action::Expand,
            weights: [0.2, 0.6, 0.15, 0.05],
            unrest_baseline: 0.1,
        }
    }

    /// Presets cycle with the index.
    pub fn preset(index: usize) -> Self {
        match index % 5 {
            0 => Self::hoarder(),
            1 => Self::sustainist(),
            2 => Self::industrialist(),
            3 => Self::opportunist(),
            _ => Self::integrator(),
        }
    }
}

/// Ordered priority rules falling through to a weighted random choice.
#[derive(Debug, Clone)]
pub struct PersonalityPolicy {
    personality: Personality,
    history: VecDeque<Action>,
    history_len: usize,
    streak_cap: usize,
    phase: f64,
    period: f64,
    amplitude: f64,
    reward: RewardWeights,
    last_observation: Option<Observation>,
    last_action: Option<Action>,
    total_reward: f64,
    /// Exponential moving average of per-tick rewards.
    score: f64,
    decisions: u64,
}

const SCORE_SMOOTHING: f64 = 0.1;

impl PersonalityPolicy {
    /// `identity` seeds the oscillator phase so neighbors drift out of step.
    pub fn new(
        personality: Personality,
        config: &HeuristicConfig,
        reward: RewardWeights,
        identity: u64,
    ) -> Self {
        let mixed = identity
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .rotate_left(17);
        let phase = (mixed % 10_000) as f64 / 10_000.0 * TAU;
        Self {
            personality,
            history: VecDeque::with_capacity(config.history_len),
            history_len: config.history_len.max(1),
            streak_cap: config.aggressive_streak_cap,
            phase,
            period: config.oscillator_period.max(1.0),
            amplitude: config.oscillator_amplitude,
            reward,
            last_observation: None,
            last_action: None,
            total_reward: 0.0,
            score: 0.0,
            decisions: 0,
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &Action> {
        self.history.iter()
    }

    fn drift(&self, tick: u64) -> f64 {
        self.amplitude * (TAU * tick as f64 / self.period + self.phase).sin()
    }

    fn aggressive_streak(&self) -> usize {
        self.history
            .iter()
            .rev()
            .take_while(|action| action.is_aggressive())
            .count()
    }

    fn streak_capped(&self) -> bool {
        self.aggressive_streak() >= self.streak_cap
    }

    fn pick_rule(&self, observation: &Observation) -> Option<Action> {
        let p = &self.personality;
        let escalate = if self.streak_capped() {
            Action::Trade
        } else {
            Action::Conflict
        };
        if observation.threat > p.threat_threshold && observation.scarcest() < p.critical_threshold
        {
            return Some(escalate);
        }
        if observation.scarcest() < p.scarcity_threshold {
            return Some(Action::Trade);
        }
        // Surplus is judged against the rest of the world as well as the
        // personality's own bar.
        if observation.own_avg() > p.surplus_threshold
            && observation.own_avg() >= observation.global_avg
        {
            return Some(p.surplus_action);
        }
        if observation.neighbor_avg - observation.own_avg() > p.envy_threshold {
            return Some(escalate);
        }
        None
    }

    fn weighted_choice<R: Rng + ?Sized>(&self, observation: &Observation, rng: &mut R) -> Action {
        let drift = self.drift(observation.tick);
        let capped = self.streak_capped();
        let weights: Vec<f64> = FALLBACK_ACTIONS
            .iter()
            .zip(self.personality.weights)
            .map(|(action, base)| {
                let mut weight = match action {
                    Action::Conflict | Action::Expand => base * (1.0 + drift),
                    Action::Trade => base * (1.0 - drift),
                    _ => base,
                };
                if *action == Action::Stockpile {
                    weight *= 1.0 + 2.0 * observation.weather;
                }
                let repeats = self.history.iter().filter(|past| *past == action).count();
                weight *= 0.5_f64.powi(repeats as i32);
                if capped && action.is_aggressive() {
                    0.0
                } else {
                    weight.max(1e-3)
                }
            })
            .collect();
        match WeightedIndex::new(&weights) {
            Ok(index) => FALLBACK_ACTIONS[index.sample(rng)],
            Err(_) => Action::Trade,
        }
    }

    fn record_transition(&mut self, observation: &Observation) {
        if let Some(previous) = self.last_observation.take() {
            let reward = self.reward.transition(&previous, observation);
            self.total_reward += reward;
            self.score += SCORE_SMOOTHING * (reward - self.score);
        }
    }

    fn remember(&mut self, action: Action) {
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(action);
    }
}

impl Policy for PersonalityPolicy {
    fn decide<R: Rng + ?Sized>(&mut self, observation: &Observation, rng: &mut R) -> Action {
        self.record_transition(observation);
        let action = match self.pick_rule(observation) {
            Some(action) => action,
            None => self.weighted_choice(observation, rng),
        };
        self.remember(action);
        self.last_action = Some(action);
        self.last_observation = Some(observation.clone());
        self.decisions += 1;
        action
    }

    fn on_collapse(&mut self, observation: &Observation) {
        self.record_transition(observation);
        self.history.clear();
    }

    fn view(&self) -> AgentView {
        AgentView {
            kind: AgentKind::Heuristic,
            strategy_label: self.personality.label.to_string(),
            last_action: self.last_action,
            epsilon: None,
            score: Some(self.score),
            q_states: None,
            total_reward: self.total_reward,
            decisions: self.decisions,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::{agent::observation, config::RlConfig};

    fn policy(personality: Personality) -> PersonalityPolicy {
        PersonalityPolicy::new(
            personality,
            &HeuristicConfig::default(),
            RewardWeights::from_config(&RlConfig::default()),
            42,
        )
    }

    #[test]
    fn threatened_and_starving_retaliates_until_capped() {
        let mut agent = policy(Personality::hoarder());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut obs = observation(0.1, 0.5, 0.8, 0.5);
        obs.threat = 0.9;
        assert_eq!(agent.decide(&obs, &mut rng), Action::Conflict);
        assert_eq!(agent.decide(&obs, &mut rng), Action::Conflict);
        assert_eq!(agent.decide(&obs, &mut rng), Action::Trade);
        assert_eq!(agent.decide(&obs, &mut rng), Action::Conflict);
    }

    #[test]
    fn scarcity_triggers_trade() {
        let mut agent = policy(Personality::sustainist());
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert_eq!(
            agent.decide(&observation(0.2, 0.9, 0.9, 0.5), &mut rng),
            Action::Trade
        );
    }

    #[test]
    fn surplus_uses_personality_action() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let rich = observation(0.95, 0.95, 1.0, 0.5);
        assert_eq!(
            policy(Personality::hoarder()).decide(&rich, &mut rng),
            Action::Stockpile
        );
        assert_eq!(
            policy(Personality::industrialist()).decide(&rich, &mut rng),
            Action::Expand
        );
    }

    #[test]
    fn surplus_below_world_average_is_not_surplus() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut obs = observation(0.7, 0.7, 1.0, 0.5);
        assert_eq!(
            policy(Personality::hoarder()).decide(&obs, &mut rng),
            Action::Stockpile
        );
        obs.global_avg = 0.9;
        obs.neighbor_avg = 0.7;
        let mut agent = policy(Personality::industrialist());
        let choices: Vec<Action> = (0..20).map(|_| agent.decide(&obs, &mut rng)).collect();
        assert!(choices.iter().any(|action| *action != Action::Expand));
    }

    #[test]
    fn richer_neighbors_provoke_escalation_until_capped() {
        let mut agent = policy(Personality::hoarder());
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut obs = observation(0.5, 0.5, 0.9, 0.5);
        obs.neighbor_avg = 0.9;
        assert_eq!(agent.decide(&obs, &mut rng), Action::Conflict);
        assert_eq!(agent.decide(&obs, &mut rng), Action::Conflict);
        assert_eq!(agent.decide(&obs, &mut rng), Action::Trade);

        obs.neighbor_avg = 0.6;
        assert_eq!(policy(Personality::hoarder()).pick_rule(&obs), None);
    }

    #[test]
    fn severe_weather_favors_stockpiling() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let mut stockpiles = |weather: f64| {
            let mut obs = observation(0.5, 0.5, 0.9, 0.5);
            obs.weather = weather;
            (0..500)
                .filter(|_| {
                    policy(Personality::hoarder()).decide(&obs, &mut rng) == Action::Stockpile
                })
                .count()
        };
        let calm = stockpiles(0.0);
        let stormy = stockpiles(1.0);
        assert!(stormy > calm + 50, "calm {calm}, stormy {stormy}");
    }

    #[test]
    fn score_follows_rewards() {
        let mut agent = policy(Personality::sustainist());
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        assert_eq!(agent.view().score, Some(0.0));
        agent.decide(&observation(0.5, 0.5, 0.5, 0.5), &mut rng);
        agent.decide(&observation(0.5, 0.5, 0.8, 0.6), &mut rng);
        let view = agent.view();
        assert!(view.score.unwrap() > 0.0);
        assert!(view.score.unwrap() < view.total_reward);
        assert!(view.epsilon.is_none());
    }

    #[test]
    fn history_is_bounded() {
        let mut agent = policy(Personality::opportunist());
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for tick in 0..50 {
            let mut obs = observation(0.5, 0.5, 0.9, 0.5);
            obs.tick = tick;
            agent.decide(&obs, &mut rng);
        }
        assert_eq!(agent.history().count(), HeuristicConfig::default().history_len);
        assert_eq!(agent.view().decisions, 50);
    }

    #[test]
    fn fallback_never_exceeds_streak_cap() {
        let mut agent = policy(Personality::opportunist());
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let cap = HeuristicConfig::default().aggressive_streak_cap;
        let mut streak = 0;
        for tick in 0..500 {
            let mut obs = observation(0.5, 0.5, 0.9, 0.5);
            obs.tick = tick;
            if agent.decide(&obs, &mut rng) == Action::Conflict {
                streak += 1;
            } else {
                streak = 0;
            }
            assert!(streak <= cap);
        }
    }

    #[test]
    fn presets_cycle() {
        assert_eq!(Personality::preset(0).label, "hoarder");
        assert_eq!(Personality::preset(4).label, "integrator");
        assert_eq!(Personality::preset(5).label, "hoarder");
    }
}
