// src/sim/scheduler.rs
//! Fixed-timestep accumulation
//!
//! Decouples the simulation rate from the render frame rate: wall-clock
//! deltas are accumulated and consumed in whole fixed steps, with the
//! remainder carried into the next tick. Catch-up is uncapped, so a long
//! stall produces a burst of substeps rather than slow motion.

/// Running remainder of unconsumed wall-clock time
#[derive(Clone, Debug)]
pub struct StepAccumulator {
    fixed_step: f32,
    accumulated: f32,
}

impl StepAccumulator {
    pub fn new(fixed_step: f32) -> Self {
        assert!(fixed_step > 0.0, "fixed step must be positive");
        Self {
            fixed_step,
            accumulated: 0.0,
        }
    }

    /// Adds a wall-clock delta and returns how many fixed steps to run now
    ///
    /// The count comes from a division rather than repeated subtraction:
    /// once the backlog grows past the point where one f32 ulp exceeds the
    /// step itself, subtracting would no-op and never terminate. Truly
    /// astronomical backlogs saturate at `u32::MAX` steps.
    pub fn accumulate(&mut self, delta: f32) -> u32 {
        self.accumulated += delta;
        if !(self.accumulated > self.fixed_step) {
            return 0;
        }
        let ratio = self.accumulated / self.fixed_step;
        // Consumption requires strictly more than a whole step, so an
        // exact multiple leaves one step banked.
        let steps = if ratio == ratio.floor() {
            ratio - 1.0
        } else {
            ratio.floor()
        };
        self.accumulated = (self.accumulated - steps * self.fixed_step).max(0.0);
        steps as u32
    }

    /// The fixed step consumed per substep, in seconds
    pub fn fixed_step(&self) -> f32 {
        self.fixed_step
    }

    /// Leftover time waiting for the next tick, in seconds
    pub fn remainder(&self) -> f32 {
        self.accumulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn catch_up_accounting() {
        let mut acc = StepAccumulator::new(0.003);
        assert_eq!(acc.accumulate(0.01), 3);
        assert!((acc.remainder() - 0.001).abs() < 1e-6);
        // A zero-delta tick issues no substeps and keeps the remainder.
        assert_eq!(acc.accumulate(0.0), 0);
        assert!((acc.remainder() - 0.001).abs() < 1e-6);
    }

    #[test]
    fn sub_step_deltas_do_not_step() {
        let mut acc = StepAccumulator::new(1.0 / 300.0);
        assert_eq!(acc.accumulate(0.001), 0);
        assert_eq!(acc.accumulate(0.001), 0);
        assert_eq!(acc.accumulate(0.001), 0);
        // 4 ms banked now; one more millisecond crosses the threshold.
        assert_eq!(acc.accumulate(0.001), 1);
    }

    #[test]
    fn stall_produces_uncapped_burst() {
        // 0.25 and 300.0 are binary-exact, so the arithmetic is too. An
        // exact multiple leaves one step banked because consumption
        // requires strictly more than a whole step.
        let mut acc = StepAccumulator::new(0.25);
        assert_eq!(acc.accumulate(300.0), 1199);
        assert_eq!(acc.remainder(), 0.25);
    }

    #[test]
    fn backlog_beyond_f32_resolution_terminates() {
        // At 1e5 seconds banked, one ulp is larger than a 3 ms step, so
        // repeated subtraction would round back to the same value forever.
        let mut acc = StepAccumulator::new(0.003);
        let steps = acc.accumulate(1.0e5);
        let expected = 1.0e5f64 / 0.003f64;
        assert!((steps as f64 - expected).abs() / expected < 1e-3);
        assert!(acc.remainder() >= 0.0);
    }

    #[test]
    fn identical_tick_sequences_are_deterministic() {
        let mut rng = rand::rng();
        let deltas: Vec<f32> = (0..200).map(|_| rng.random_range(0.0..0.05)).collect();

        let mut a = StepAccumulator::new(0.003);
        let mut b = StepAccumulator::new(0.003);
        for &delta in &deltas {
            assert_eq!(a.accumulate(delta), b.accumulate(delta));
            assert_eq!(a.remainder().to_bits(), b.remainder().to_bits());
        }
    }
}
