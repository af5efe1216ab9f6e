//! Injected-current generation: named patterns, noise, and miniature events

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Named stimulus patterns
///
/// Each pattern maps `(time, neuron index, population size)` to a current in
/// picoamps. "No pattern" is represented as `Option::None` on the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InputPattern {
    /// Sparse uniform kicks: p=0.1 per neuron, U(0, 50) pA
    Random,
    /// Poisson-like arrivals: p=0.05 per neuron, U(20, 50) pA
    Poisson,
    /// Slow sine gate driving the first two neurons at 40 pA
    Rhythmic,
    /// 100 ms period, 5 ms pulses of 60 pA into the first three neurons
    PulseTrain,
    /// Travelling sine wave across the population, up to 30 pA
    Wave,
    /// 500 ms period, 50 ms bursts of 80 pA into neuron 0
    Burst,
}

impl InputPattern {
    /// Canonical display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Poisson => "poisson",
            Self::Rhythmic => "rhythmic",
            Self::PulseTrain => "pulse-train",
            Self::Wave => "wave",
            Self::Burst => "burst",
        }
    }

    /// Look up a pattern by name (case-insensitive, separator-tolerant).
    /// `None` for unrecognized names and for the literal "none".
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .to_ascii_lowercase()
            .replace([' ', '_'], "-");
        match key.as_str() {
            "random" => Some(Self::Random),
            "poisson" => Some(Self::Poisson),
            "rhythmic" => Some(Self::Rhythmic),
            "pulse-train" => Some(Self::PulseTrain),
            "wave" => Some(Self::Wave),
            "burst" => Some(Self::Burst),
            _ => None,
        }
    }

    fn sample(&self, time_ms: f32, index: usize, size: usize, rng: &mut StdRng) -> f32 {
        match self {
            Self::Random => {
                if rng.gen_bool(0.1) {
                    rng.gen_range(0.0..50.0)
                } else {
                    0.0
                }
            }
            Self::Poisson => {
                if rng.gen_bool(0.05) {
                    rng.gen_range(20.0..50.0)
                } else {
                    0.0
                }
            }
            Self::Rhythmic => {
                if index < 2 && (0.02 * time_ms).sin() > 0.5 {
                    40.0
                } else {
                    0.0
                }
            }
            Self::PulseTrain => {
                if index < 3 && time_ms.rem_euclid(100.0) < 5.0 {
                    60.0
                } else {
                    0.0
                }
            }
            Self::Wave => {
                let phase = 0.01 * time_ms + index as f32 * std::f32::consts::PI / size as f32;
                phase.sin().max(0.0) * 30.0
            }
            Self::Burst => {
                if index == 0 && time_ms.rem_euclid(500.0) < 50.0 {
                    80.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Miniature spontaneous-release events added on top of the pattern.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MiniConfig {
    /// Per-neuron per-step probability of a mini
    pub probability: f64,
    /// Smallest mini amplitude (pA)
    pub min_amplitude: f32,
    /// Largest mini amplitude (pA)
    pub max_amplitude: f32,
}

impl Default for MiniConfig {
    fn default() -> Self {
        Self {
            probability: 0.01,
            min_amplitude: 2.0,
            max_amplitude: 10.0,
        }
    }
}

/// Produces the per-neuron injected-current vector for each step
///
/// Pipeline per neuron: pattern sample, times the global strength, plus
/// Gaussian noise (`noise_level * 10` pA standard deviation, Box-Muller),
/// plus miniature events per [`MiniConfig`].
#[derive(Debug)]
pub struct InputGenerator {
    pattern: Option<InputPattern>,
    strength: f32,
    noise_level: f32,
    minis: MiniConfig,
    rng: StdRng,
    gauss_spare: Option<f32>,
}

impl InputGenerator {
    /// Generator with no pattern, unit strength, no noise, default minis.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            pattern: None,
            strength: 1.0,
            noise_level: 0.0,
            minis: MiniConfig::default(),
            rng,
            gauss_spare: None,
        }
    }

    /// Active pattern, if any.
    pub fn pattern(&self) -> Option<InputPattern> {
        self.pattern
    }

    /// Select the active pattern (`None` for silence).
    pub fn set_pattern(&mut self, pattern: Option<InputPattern>) {
        self.pattern = pattern;
    }

    /// Select a pattern by name. Unrecognized names degrade to "no pattern"
    /// with a diagnostic, per the engine's error policy.
    pub fn set_pattern_by_name(&mut self, name: &str) {
        match InputPattern::from_name(name) {
            Some(p) => self.pattern = Some(p),
            None => {
                if !name.trim().eq_ignore_ascii_case("none") {
                    log::warn!("unrecognized input pattern {:?}, injecting zeros", name);
                }
                self.pattern = None;
            }
        }
    }

    /// Global multiplier applied to the pattern output.
    pub fn set_strength(&mut self, strength: f32) {
        self.strength = strength.max(0.0);
    }

    /// Noise level; Gaussian noise has standard deviation `level * 10` pA.
    pub fn set_noise_level(&mut self, level: f32) {
        self.noise_level = level.max(0.0);
    }

    /// Replace the miniature-event configuration.
    pub fn set_minis(&mut self, minis: MiniConfig) {
        self.minis = minis;
    }

    /// Produce the injected-current vector (pA) for `size` neurons at
    /// `time_ms`.
    pub fn generate(&mut self, time_ms: f32, size: usize) -> Vec<f32> {
        let mut currents = vec![0.0f32; size];

        if let Some(pattern) = self.pattern {
            for (i, c) in currents.iter_mut().enumerate() {
                *c = pattern.sample(time_ms, i, size, &mut self.rng) * self.strength;
            }
        }

        if self.noise_level > 0.0 {
            let sd = self.noise_level * 10.0;
            for c in currents.iter_mut() {
                *c += sd * self.standard_normal();
            }
        }

        if self.minis.probability > 0.0 {
            let lo = self.minis.min_amplitude;
            let hi = self.minis.max_amplitude.max(lo);
            for c in currents.iter_mut() {
                if self.rng.gen_bool(self.minis.probability.min(1.0)) {
                    *c += self.rng.gen_range(lo..=hi);
                }
            }
        }

        currents
    }

    /// Standard normal deviate via the Box-Muller transform, keeping the
    /// spare from each pair of uniforms.
    fn standard_normal(&mut self) -> f32 {
        if let Some(z) = self.gauss_spare.take() {
            return z;
        }
        let u1: f32 = 1.0 - self.rng.gen::<f32>(); // (0, 1]
        let u2: f32 = self.rng.gen();
        let mag = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f32::consts::PI * u2;
        self.gauss_spare = Some(mag * theta.sin());
        mag * theta.cos()
    }
}

impl Default for InputGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_generator(seed: u64) -> InputGenerator {
        let mut gen = InputGenerator::with_seed(seed);
        gen.set_minis(MiniConfig {
            probability: 0.0,
            ..MiniConfig::default()
        });
        gen
    }

    #[test]
    fn test_no_pattern_is_silent() {
        let mut gen = quiet_generator(1);
        let currents = gen.generate(42.0, 8);
        assert_eq!(currents, vec![0.0; 8]);
    }

    #[test]
    fn test_from_name_round_trip() {
        for pattern in [
            InputPattern::Random,
            InputPattern::Poisson,
            InputPattern::Rhythmic,
            InputPattern::PulseTrain,
            InputPattern::Wave,
            InputPattern::Burst,
        ] {
            assert_eq!(InputPattern::from_name(pattern.name()), Some(pattern));
        }
        assert_eq!(InputPattern::from_name("Pulse Train"), Some(InputPattern::PulseTrain));
        assert_eq!(InputPattern::from_name("sawtooth"), None);
    }

    #[test]
    fn test_unknown_name_degrades_to_silence() {
        let mut gen = quiet_generator(2);
        gen.set_pattern(Some(InputPattern::Burst));
        gen.set_pattern_by_name("sawtooth");
        assert_eq!(gen.pattern(), None);
    }

    #[test]
    fn test_pulse_train_timing() {
        let mut gen = quiet_generator(3);
        gen.set_pattern(Some(InputPattern::PulseTrain));

        // Inside the 5ms pulse at the start of each 100ms period
        let on = gen.generate(102.0, 6);
        assert_eq!(&on[..3], &[60.0, 60.0, 60.0]);
        assert_eq!(&on[3..], &[0.0, 0.0, 0.0]);

        let off = gen.generate(50.0, 6);
        assert_eq!(off, vec![0.0; 6]);
    }

    #[test]
    fn test_burst_targets_first_neuron() {
        let mut gen = quiet_generator(4);
        gen.set_pattern(Some(InputPattern::Burst));
        let on = gen.generate(520.0, 4);
        assert_eq!(on[0], 80.0);
        assert_eq!(&on[1..], &[0.0, 0.0, 0.0]);
        let off = gen.generate(400.0, 4);
        assert_eq!(off, vec![0.0; 4]);
    }

    #[test]
    fn test_rhythmic_gate() {
        let mut gen = quiet_generator(5);
        gen.set_pattern(Some(InputPattern::Rhythmic));
        // sin(0.02 * 78) ~ sin(1.56) ~ 1.0, gate open
        let on = gen.generate(78.0, 4);
        assert_eq!(&on[..2], &[40.0, 40.0]);
        assert_eq!(&on[2..], &[0.0, 0.0]);
        // Gate closed at t=0
        let off = gen.generate(0.0, 4);
        assert_eq!(off, vec![0.0; 4]);
    }

    #[test]
    fn test_wave_is_nonnegative_and_bounded() {
        let mut gen = quiet_generator(6);
        gen.set_pattern(Some(InputPattern::Wave));
        for t in [0.0, 37.0, 111.0, 999.0] {
            for &c in &gen.generate(t, 16) {
                assert!((0.0..=30.0).contains(&c));
            }
        }
    }

    #[test]
    fn test_strength_scales_pattern() {
        let mut gen = quiet_generator(7);
        gen.set_pattern(Some(InputPattern::Burst));
        gen.set_strength(2.5);
        let currents = gen.generate(10.0, 2);
        assert_eq!(currents[0], 200.0);
    }

    #[test]
    fn test_noise_perturbs_zero_baseline() {
        let mut gen = quiet_generator(8);
        gen.set_noise_level(1.0); // sd = 10pA
        let currents = gen.generate(0.0, 1000);
        let nonzero = currents.iter().filter(|c| **c != 0.0).count();
        assert!(nonzero > 900);
        let mean: f32 = currents.iter().sum::<f32>() / currents.len() as f32;
        assert!(mean.abs() < 2.0, "mean {} should be near zero", mean);
        assert!(currents.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_minis_respect_probability() {
        let mut gen = quiet_generator(9);
        assert_eq!(gen.generate(0.0, 500), vec![0.0; 500]);

        gen.set_minis(MiniConfig {
            probability: 1.0,
            min_amplitude: 2.0,
            max_amplitude: 10.0,
        });
        let currents = gen.generate(0.0, 500);
        assert!(currents.iter().all(|&c| (2.0..=10.0).contains(&c)));
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = InputGenerator::with_seed(42);
        let mut b = InputGenerator::with_seed(42);
        a.set_pattern(Some(InputPattern::Random));
        b.set_pattern(Some(InputPattern::Random));
        assert_eq!(a.generate(5.0, 32), b.generate(5.0, 32));
    }
}
