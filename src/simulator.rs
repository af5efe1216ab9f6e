//! Drives the engine against wall-clock time
//!
//! The simulator batches many engine steps per visual frame and notifies an
//! observer once per batch. Pacing happens only at the frame boundary; inside
//! a batch the loop holds the thread until all steps complete.

use std::time::{Duration, Instant};

use crate::error::*;
use crate::input::{InputGenerator, InputPattern, MiniConfig};
use crate::network::Network;

/// Visual frame cadence the simulator paces against (~60 Hz).
pub const FRAME_INTERVAL_MS: f32 = 1000.0 / 60.0;
/// Slowest playback speed.
pub const SPEED_MIN: f32 = 1.0;
/// Fastest playback speed.
pub const SPEED_MAX: f32 = 100.0;
/// Playback speed corresponding to roughly real time.
pub const SPEED_REALTIME: f32 = 10.0;
/// Upper bound on engine steps executed per frame.
const MAX_STEPS_PER_FRAME: usize = 100;

/// Receives the network after each batch of steps.
///
/// Invoked synchronously on the engine thread; implementations must not
/// block. Closures `FnMut(&Network, f32)` implement this automatically.
pub trait SimulationObserver {
    /// Called once per batch with the network and its current time (ms).
    fn on_batch(&mut self, network: &Network, time_ms: f32);
}

impl<F: FnMut(&Network, f32)> SimulationObserver for F {
    fn on_batch(&mut self, network: &Network, time_ms: f32) {
        self(network, time_ms)
    }
}

/// Paces a [`Network`] against the wall clock and feeds it input currents.
#[derive(Debug)]
pub struct Simulator<O> {
    network: Network,
    observer: O,
    input: InputGenerator,
    speed: f32,
    running: bool,
}

impl<O: SimulationObserver> Simulator<O> {
    /// Wrap a network. `speed` must lie in `[SPEED_MIN, SPEED_MAX]`, where
    /// 10 is roughly real time.
    pub fn new(network: Network, observer: O, speed: f32) -> Result<Self> {
        if !speed.is_finite() || !(SPEED_MIN..=SPEED_MAX).contains(&speed) {
            return Err(EngineError::invalid_parameter(
                "speed",
                speed.to_string(),
                format!("in [{}, {}]", SPEED_MIN, SPEED_MAX),
            ));
        }
        Ok(Self {
            network,
            observer,
            input: InputGenerator::new(),
            speed,
            running: false,
        })
    }

    /// Start ticking. Idempotent.
    pub fn play(&mut self) {
        if !self.running {
            log::debug!("simulation playing at speed {}", self.speed);
            self.running = true;
        }
    }

    /// Stop ticking. Idempotent; a tick in progress completes first.
    pub fn pause(&mut self) {
        if self.running {
            log::debug!("simulation paused at t={:.1}ms", self.network.current_time());
            self.running = false;
        }
    }

    /// Whether ticks currently advance the simulation.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Pause and restore the network to its initial state.
    pub fn reset(&mut self) {
        self.pause();
        self.network.reset();
    }

    /// Playback speed; clamped into `[SPEED_MIN, SPEED_MAX]`. Takes effect
    /// on the next tick.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = if speed.is_finite() {
            speed.clamp(SPEED_MIN, SPEED_MAX)
        } else {
            SPEED_REALTIME
        };
    }

    /// Current playback speed.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Select the input pattern (`None` for silence).
    pub fn set_input_pattern(&mut self, pattern: Option<InputPattern>) {
        self.input.set_pattern(pattern);
    }

    /// Select the input pattern by name; unknown names degrade to silence
    /// with a logged diagnostic.
    pub fn set_input_pattern_by_name(&mut self, name: &str) {
        self.input.set_pattern_by_name(name);
    }

    /// Global input strength multiplier.
    pub fn set_input_strength(&mut self, strength: f32) {
        self.input.set_strength(strength);
    }

    /// Noise level (Gaussian noise standard deviation is `level * 10` pA).
    pub fn set_noise_level(&mut self, level: f32) {
        self.input.set_noise_level(level);
    }

    /// Miniature-event configuration.
    pub fn set_minis(&mut self, minis: MiniConfig) {
        self.input.set_minis(minis);
    }

    /// Replace the input generator, e.g. with a seeded one.
    pub fn set_input_generator(&mut self, input: InputGenerator) {
        self.input = input;
    }

    /// The simulated network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Mutable access for inter-tick configuration.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// The observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Engine steps executed per frame at the current speed and step size.
    pub fn steps_per_frame(&self) -> usize {
        let ideal = FRAME_INTERVAL_MS * (self.speed / SPEED_REALTIME) / self.network.dt_ms();
        (ideal.round() as usize).clamp(1, MAX_STEPS_PER_FRAME)
    }

    /// Run one batch: generate inputs, inject, and step, `steps_per_frame`
    /// times, then notify the observer once. No-op while paused; returns
    /// whether a batch ran.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        let count = self.network.neurons().len();
        for _ in 0..self.steps_per_frame() {
            let currents = self.input.generate(self.network.current_time(), count);
            self.network.inject(&currents);
            self.network.step();
        }
        self.observer
            .on_batch(&self.network, self.network.current_time());
        true
    }

    /// Tick at the frame cadence until `wall` elapses or the simulator is
    /// paused. Returns the number of batches run.
    pub fn run_for(&mut self, wall: Duration) -> usize {
        let deadline = Instant::now() + wall;
        let frame = Duration::from_secs_f32(FRAME_INTERVAL_MS / 1000.0);
        let mut batches = 0;
        while self.running && Instant::now() < deadline {
            let frame_start = Instant::now();
            if self.tick() {
                batches += 1;
            }
            if let Some(rest) = frame.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::NeuronParams;

    struct Recorder {
        batches: usize,
        last_time: f32,
    }

    impl SimulationObserver for Recorder {
        fn on_batch(&mut self, _network: &Network, time_ms: f32) {
            self.batches += 1;
            self.last_time = time_ms;
        }
    }

    fn recorder() -> Recorder {
        Recorder {
            batches: 0,
            last_time: -1.0,
        }
    }

    #[test]
    fn test_new_validates_speed() {
        assert!(Simulator::new(Network::new(), recorder(), 0.5).is_err());
        assert!(Simulator::new(Network::new(), recorder(), 101.0).is_err());
        assert!(Simulator::new(Network::new(), recorder(), 10.0).is_ok());
    }

    #[test]
    fn test_steps_per_frame_clamped() {
        let mut sim = Simulator::new(Network::new(), recorder(), 1.0).unwrap();
        // 16.67ms * 0.1 / 0.1ms ~ 17 steps
        assert_eq!(sim.steps_per_frame(), 17);

        sim.set_speed(100.0);
        assert_eq!(sim.steps_per_frame(), 100);

        // Coarse step: 16.67ms * 0.1 / 1.0ms rounds to 2
        sim.set_speed(1.0);
        sim.network_mut().set_dt_ms(1.0).unwrap();
        assert_eq!(sim.steps_per_frame(), 2);

        // Never below one step per frame
        sim.network_mut().set_dt_ms(50.0).unwrap();
        assert_eq!(sim.steps_per_frame(), 1);
    }

    #[test]
    fn test_tick_noop_while_paused() {
        let mut net = Network::new();
        net.add_neuron(NeuronParams::default()).unwrap();
        let mut sim = Simulator::new(net, recorder(), 10.0).unwrap();

        assert!(!sim.tick());
        assert_eq!(sim.network().current_time(), 0.0);
        assert_eq!(sim.observer().batches, 0);
    }

    #[test]
    fn test_tick_advances_batch_and_notifies() {
        let mut net = Network::new();
        net.add_neuron(NeuronParams::default()).unwrap();
        let mut sim = Simulator::new(net, recorder(), 10.0).unwrap();

        sim.play();
        let steps = sim.steps_per_frame();
        assert!(sim.tick());

        let expected = steps as f32 * sim.network().dt_ms();
        assert!((sim.network().current_time() - expected).abs() < 1e-4);
        assert_eq!(sim.observer().batches, 1);
        assert!((sim.observer().last_time - expected).abs() < 1e-4);
    }

    #[test]
    fn test_speed_changes_take_effect_next_tick() {
        let mut sim = Simulator::new(Network::new(), recorder(), 1.0).unwrap();
        sim.play();
        sim.tick();
        sim.set_speed(100.0);
        assert_eq!(sim.steps_per_frame(), 100);
        sim.set_speed(f32::NAN);
        assert_eq!(sim.speed(), SPEED_REALTIME);
    }

    #[test]
    fn test_reset_pauses_and_zeroes() {
        let mut net = Network::new();
        net.add_neuron(NeuronParams::default()).unwrap();
        let mut sim = Simulator::new(net, recorder(), 10.0).unwrap();

        sim.play();
        sim.tick();
        assert!(sim.network().current_time() > 0.0);

        sim.reset();
        assert!(!sim.is_running());
        assert_eq!(sim.network().current_time(), 0.0);
    }

    #[test]
    fn test_unknown_pattern_is_silent() {
        let mut net = Network::new();
        net.add_neuron(NeuronParams::default()).unwrap();
        let mut sim = Simulator::new(net, recorder(), 10.0).unwrap();
        sim.set_minis(MiniConfig {
            probability: 0.0,
            ..MiniConfig::default()
        });
        sim.set_input_pattern_by_name("definitely-not-a-pattern");

        sim.play();
        for _ in 0..10 {
            sim.tick();
        }
        // Zero input: the membrane never leaves rest
        let neuron = &sim.network().neurons()[0];
        assert_eq!(neuron.membrane_potential(), neuron.params.v_rest);
        assert_eq!(neuron.total_spikes(), 0);
    }

    #[test]
    fn test_run_for_paces_and_stops() {
        let mut net = Network::new();
        net.add_neuron(NeuronParams::default()).unwrap();
        let mut sim = Simulator::new(net, recorder(), 10.0).unwrap();

        // Paused: returns immediately with no batches
        assert_eq!(sim.run_for(Duration::from_millis(30)), 0);

        sim.play();
        let batches = sim.run_for(Duration::from_millis(50));
        assert!(batches >= 1);
        assert_eq!(sim.observer().batches, batches);
        assert!(sim.network().current_time() > 0.0);
    }
}
