use std::collections::HashMap;

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use super::{Action, AgentKind, AgentView, Observation, Policy, RewardWeights};
use crate::config::RlConfig;

const N_ACTIONS: usize = Action::LEARNED.len();

/// Bucket indices of (food pct, water pct, health, density).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey(pub [u8; 4]);

impl StateKey {
    pub fn from_observation(observation: &Observation, bins: u8) -> Self {
        let bucket = |value: f64| -> u8 {
            let bins = bins.max(1);
            let scaled = (value.clamp(0.0, 1.0) * bins as f64).floor() as u8;
            scaled.min(bins - 1)
        };
        StateKey([
            bucket(observation.food_pct),
            bucket(observation.water_pct),
            bucket(observation.health),
            bucket(observation.density),
        ])
    }
}

/// Epsilon-greedy governor learning a lazily grown Q-table.
#[derive(Debug, Clone)]
pub struct TabularAgent {
    q_table: HashMap<StateKey, [f64; N_ACTIONS]>,
    epsilon: f64,
    epsilon_min: f64,
    epsilon_decay: f64,
    learning_rate: f64,
    discount: f64,
    bins: u8,
    reward: RewardWeights,
    last_state: Option<StateKey>,
    last_action: Option<usize>,
    last_observation: Option<Observation>,
    total_reward: f64,
    decisions: u64,
}

impl TabularAgent {
    /// Epsilon starts no lower than its floor and the decay factor is kept
    /// in `[0, 1]`, so exploration never grows.
    pub fn new(config: &RlConfig) -> Self {
        Self {
            q_table: HashMap::new(),
            epsilon: config.epsilon.max(config.epsilon_min),
            epsilon_min: config.epsilon_min,
            epsilon_decay: config.epsilon_decay.clamp(0.0, 1.0),
            learning_rate: config.learning_rate,
            discount: config.discount_factor,
            bins: config.bins,
            reward: RewardWeights::from_config(config),
            last_state: None,
            last_action: None,
            last_observation: None,
            total_reward: 0.0,
            decisions: 0,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn q_values(&self, state: &StateKey) -> Option<&[f64; N_ACTIONS]> {
        self.q_table.get(state)
    }

    fn choose<R: Rng + ?Sized>(&mut self, state: StateKey, rng: &mut R) -> usize {
        if rng.gen::<f64>() < self.epsilon {
            return rng.gen_range(0..N_ACTIONS);
        }
        let row = self.q_table.entry(state).or_insert([0.0; N_ACTIONS]);
        let best = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ties: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|(_, value)| (**value - best).abs() <= f64::EPSILON)
            .map(|(index, _)| index)
            .collect();
        ties.choose(rng).copied().unwrap_or(0)
    }

    /// One-step Q update; `next == None` marks a terminal transition.
    fn update(&mut self, state: StateKey, action: usize, reward: f64, next: Option<StateKey>) {
        let future = next
            .map(|next| {
                let row = self.q_table.entry(next).or_insert([0.0; N_ACTIONS]);
                row.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            })
            .unwrap_or(0.0);
        let row = self.q_table.entry(state).or_insert([0.0; N_ACTIONS]);
        let current = row[action];
        row[action] = current + self.learning_rate * (reward + self.discount * future - current);
        self.total_reward += reward;
    }

    fn decay_epsilon(&mut self) {
        if self.epsilon > self.epsilon_min {
            self.epsilon = (self.epsilon * self.epsilon_decay).max(self.epsilon_min);
        }
    }
}

impl Policy for TabularAgent {
    fn decide<R: Rng + ?Sized>(&mut self, observation: &Observation, rng: &mut R) -> Action {
        let state = StateKey::from_observation(observation, self.bins);
        if let (Some(previous_state), Some(action), Some(previous)) =
            (self.last_state, self.last_action, self.last_observation.take())
        {
            let reward = self.reward.transition(&previous, observation);
            self.update(previous_state, action, reward, Some(state));
        }

        let action = self.choose(state, rng);
        self.decay_epsilon();
        self.last_state = Some(state);
        self.last_action = Some(action);
        self.last_observation = Some(observation.clone());
        self.decisions += 1;
        Action::LEARNED[action]
    }

    fn on_collapse(&mut self, observation: &Observation) {
        if let (Some(state), Some(action), Some(previous)) =
            (self.last_state, self.last_action, self.last_observation.take())
        {
            let reward = self.reward.transition(&previous, observation);
            self.update(state, action, reward, None);
        }
        self.last_state = None;
        self.last_action = None;
    }

    fn view(&self) -> AgentView {
        AgentView {
            kind: AgentKind::Tabular,
            strategy_label: "q_learning".to_string(),
            last_action: self.last_action.map(|index| Action::LEARNED[index]),
            epsilon: Some(self.epsilon),
            score: None,
            q_states: Some(self.q_table.len()),
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
    use crate::agent::observation;

    #[test]
    fn discretization_puts_full_values_in_last_bin() {
        let key = StateKey::from_observation(&observation(1.0, 0.0, 0.55, 0.19), 5);
        assert_eq!(key, StateKey([4, 0, 2, 0]));
    }

    #[test]
    fn epsilon_is_monotone_and_floored() {
        let config = RlConfig {
            epsilon: 0.5,
            epsilon_decay: 0.9,
            epsilon_min: 0.05,
            ..RlConfig::default()
        };
        let mut agent = TabularAgent::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut previous = agent.epsilon();
        for _ in 0..200 {
            agent.decide(&observation(0.5, 0.5, 0.5, 0.5), &mut rng);
            assert!(agent.epsilon() <= previous);
            assert!(agent.epsilon() >= config.epsilon_min);
            previous = agent.epsilon();
        }
        assert_eq!(agent.epsilon(), config.epsilon_min);
    }

    #[test]
    fn out_of_range_settings_cannot_raise_or_undercut_epsilon() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let obs = observation(0.5, 0.5, 0.5, 0.5);

        let growing = RlConfig {
            epsilon_decay: 1.5,
            ..RlConfig::default()
        };
        let mut agent = TabularAgent::new(&growing);
        let before = agent.epsilon();
        agent.decide(&obs, &mut rng);
        assert!(agent.epsilon() <= before);

        let underfloor = RlConfig {
            epsilon: 0.001,
            epsilon_min: 0.01,
            ..RlConfig::default()
        };
        let mut agent = TabularAgent::new(&underfloor);
        assert_eq!(agent.epsilon(), 0.01);
        agent.decide(&obs, &mut rng);
        assert!(agent.epsilon() >= underfloor.epsilon_min);
    }

    #[test]
    fn greedy_choice_follows_learned_values() {
        let config = RlConfig {
            epsilon: 0.0,
            epsilon_min: 0.0,
            ..RlConfig::default()
        };
        let mut agent = TabularAgent::new(&config);
        let obs = observation(0.3, 0.3, 0.9, 0.4);
        let state = StateKey::from_observation(&obs, config.bins);
        agent.q_table.insert(state, [0.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(agent.decide(&obs, &mut rng), Action::Trade);
    }

    #[test]
    fn positive_transition_raises_q_value() {
        let config = RlConfig {
            epsilon: 0.0,
            epsilon_min: 0.0,
            ..RlConfig::default()
        };
        let mut agent = TabularAgent::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let before = observation(0.5, 0.5, 0.5, 0.5);
        let state = StateKey::from_observation(&before, config.bins);
        let action = agent.decide(&before, &mut rng);
        let column = Action::LEARNED.iter().position(|a| *a == action).unwrap();
        agent.decide(&observation(0.5, 0.5, 0.7, 0.6), &mut rng);
        assert!(agent.q_values(&state).unwrap()[column] > 0.0);
        assert!(agent.view().total_reward > 0.0);
    }

    #[test]
    fn collapse_applies_terminal_penalty() {
        let config = RlConfig::default();
        let mut agent = TabularAgent::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let before = observation(0.1, 0.1, 0.1, 0.1);
        let state = StateKey::from_observation(&before, config.bins);
        let action = agent.decide(&before, &mut rng);
        let column = Action::LEARNED.iter().position(|a| *a == action).unwrap();
        agent.on_collapse(&observation(0.0, 0.0, 0.0, 0.0));
        assert!(agent.q_values(&state).unwrap()[column] < -9.0);
        assert!(agent.view().total_reward < -99.0);
    }
}
