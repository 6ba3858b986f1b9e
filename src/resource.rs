use serde::{Deserialize, Serialize};

/// Fraction of `max` below which a pool counts as critical.
pub const CRITICAL_FRACTION: f64 = 0.20;

/// Bounded regenerating quantity. `value` stays within `[0, max]` after every
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    value: f64,
    max: f64,
    base_regen: f64,
    regen_multiplier: f64,
    min_multiplier: f64,
    max_multiplier: f64,
}

impl ResourcePool {
    pub fn new(value: f64, max: f64, base_regen: f64) -> Self {
        let max = max.max(0.0);
        Self {
            value: value.clamp(0.0, max),
            max,
            base_regen: base_regen.max(0.0),
            regen_multiplier: 1.0,
            min_multiplier: 0.5,
            max_multiplier: 2.0,
        }
    }

    pub fn with_multiplier_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_multiplier = min;
        self.max_multiplier = max.max(min);
        self.regen_multiplier = self.regen_multiplier.clamp(self.min_multiplier, self.max_multiplier);
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn regen_multiplier(&self) -> f64 {
        self.regen_multiplier
    }

    pub fn effective_regen(&self) -> f64 {
        self.base_regen * self.regen_multiplier
    }

    pub fn pct(&self) -> f64 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.value / self.max
        }
    }

    pub fn is_critical(&self) -> bool {
        self.pct() < CRITICAL_FRACTION
    }

    /// Removes up to `amount` and returns what was actually taken.
    pub fn consume(&mut self, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.value);
        self.value -= taken;
        taken
    }

    /// Adds up to the remaining headroom and returns what was accepted.
    pub fn deposit(&mut self, amount: f64) -> f64 {
        let accepted = amount.max(0.0).min(self.max - self.value);
        self.value += accepted;
        accepted
    }

    pub fn regenerate(&mut self) -> f64 {
        self.deposit(self.effective_regen())
    }

    /// Signed change clamped into `[0, max]`.
    pub fn apply_shock(&mut self, delta: f64) {
        self.value = (self.value + delta).clamp(0.0, self.max);
    }

    pub fn adjust_multiplier(&mut self, delta: f64) {
        self.regen_multiplier =
            (self.regen_multiplier + delta).clamp(self.min_multiplier, self.max_multiplier);
    }

    /// Moves the multiplier a fraction of the way back toward 1.0.
    pub fn relax_multiplier(&mut self, fraction: f64) {
        let delta = (1.0 - self.regen_multiplier) * fraction.clamp(0.0, 1.0);
        self.adjust_multiplier(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_is_capped_at_value() {
        let mut pool = ResourcePool::new(30.0, 100.0, 5.0);
        assert_eq!(pool.consume(50.0), 30.0);
        assert_eq!(pool.value(), 0.0);
        assert_eq!(pool.consume(-10.0), 0.0);
    }

    #[test]
    fn regenerate_never_exceeds_max() {
        let mut pool = ResourcePool::new(98.0, 100.0, 5.0);
        assert_eq!(pool.regenerate(), 2.0);
        assert_eq!(pool.value(), 100.0);
        assert_eq!(pool.regenerate(), 0.0);
    }

    #[test]
    fn shocks_clamp_both_ways() {
        let mut pool = ResourcePool::new(50.0, 100.0, 0.0);
        pool.apply_shock(-500.0);
        assert_eq!(pool.value(), 0.0);
        pool.apply_shock(500.0);
        assert_eq!(pool.value(), 100.0);
    }

    #[test]
    fn critical_below_twenty_percent() {
        let pool = ResourcePool::new(19.0, 100.0, 0.0);
        assert!(pool.is_critical());
        let pool = ResourcePool::new(20.0, 100.0, 0.0);
        assert!(!pool.is_critical());
    }

    #[test]
    fn multiplier_stays_in_bounds() {
        let mut pool = ResourcePool::new(0.0, 100.0, 4.0).with_multiplier_bounds(0.5, 2.0);
        for _ in 0..30 {
            pool.adjust_multiplier(0.1);
        }
        assert!((pool.regen_multiplier() - 2.0).abs() < 1e-9);
        assert!((pool.effective_regen() - 8.0).abs() < 1e-9);
        pool.relax_multiplier(0.5);
        assert!((pool.regen_multiplier() - 1.5).abs() < 1e-9);
    }
}
