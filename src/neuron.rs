//! Leaky integrate-and-fire neuron with adaptation and bounded histories

use crate::error::*;
use crate::history::BoundedHistory;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Entries retained in per-neuron spike and voltage histories.
pub const HISTORY_CAPACITY: usize = 200;

/// Spike-history entries consulted when estimating the instantaneous rate.
const RATE_WINDOW_SPIKES: usize = 10;

/// Upper clamp applied to the membrane potential after integration so that
/// pathological inputs stay finite instead of propagating NaN/Inf. The
/// lower bound is the neuron's reset potential.
const V_CEIL_MV: f32 = 1.0e4;

/// Parameters for leaky integrate-and-fire neurons
///
/// Units are part of the engine contract: potentials in mV, times in ms,
/// capacitance in pF, resistance in MΩ, currents in pA.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronParams {
    /// Threshold potential (mV)
    pub v_thresh: f32,
    /// Resting potential (mV)
    pub v_rest: f32,
    /// Reset potential (mV)
    pub v_reset: f32,
    /// Membrane time constant (ms)
    pub tau_m: f32,
    /// Refractory period (ms)
    pub t_refrac: f32,
    /// Membrane capacitance (pF)
    pub c_m: f32,
    /// Membrane resistance (MΩ)
    pub r_m: f32,
    /// Adaptation current time constant (ms)
    pub tau_adapt: f32,
    /// Adaptation current increment per spike (pA)
    pub adapt_increment: f32,
}

impl Default for NeuronParams {
    fn default() -> Self {
        Self {
            v_thresh: -50.0,     // -50mV threshold
            v_rest: -70.0,       // -70mV resting potential
            v_reset: -70.0,      // -70mV reset potential
            tau_m: 20.0,         // 20ms membrane time constant
            t_refrac: 2.0,       // 2ms refractory period
            c_m: 100.0,          // 100pF capacitance
            r_m: 200.0,          // 200MΩ resistance
            tau_adapt: 100.0,    // 100ms adaptation decay
            adapt_increment: 0.0, // adaptation disabled unless configured
        }
    }
}

impl NeuronParams {
    /// Validate parameters, enforcing `v_reset <= v_rest <= v_thresh` and
    /// positive time constants.
    pub fn validate(&self) -> Result<()> {
        if self.tau_m <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "tau_m",
                self.tau_m.to_string(),
                "> 0.0",
            ));
        }
        if self.v_thresh <= self.v_rest {
            return Err(EngineError::invalid_parameter(
                "v_thresh",
                format!("{} (with v_rest={})", self.v_thresh, self.v_rest),
                "> v_rest",
            ));
        }
        if self.v_reset > self.v_rest {
            return Err(EngineError::invalid_parameter(
                "v_reset",
                format!("{} (with v_rest={})", self.v_reset, self.v_rest),
                "<= v_rest",
            ));
        }
        if self.t_refrac < 0.0 {
            return Err(EngineError::invalid_parameter(
                "t_refrac",
                self.t_refrac.to_string(),
                ">= 0.0",
            ));
        }
        if self.c_m <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "c_m",
                self.c_m.to_string(),
                "> 0.0",
            ));
        }
        if self.r_m <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "r_m",
                self.r_m.to_string(),
                "> 0.0",
            ));
        }
        if self.tau_adapt <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "tau_adapt",
                self.tau_adapt.to_string(),
                "> 0.0",
            ));
        }
        if self.adapt_increment < 0.0 {
            return Err(EngineError::invalid_parameter(
                "adapt_increment",
                self.adapt_increment.to_string(),
                ">= 0.0",
            ));
        }
        Ok(())
    }

    /// Minimum sustained current (pA) that can drive the membrane to
    /// threshold: `(v_thresh - v_rest) / r_m`, converted from nA.
    pub fn rheobase_pa(&self) -> f32 {
        (self.v_thresh - self.v_rest) / self.r_m * 1000.0
    }
}

/// A single-compartment LIF neuron
///
/// Holds the live membrane state plus the bounded spike-time and voltage
/// histories the learning rule and the dashboards read back.
#[derive(Debug, Clone)]
pub struct Neuron {
    /// Immutable construction parameters (threshold lives separately so
    /// homeostasis can move it without touching the configured baseline)
    pub params: NeuronParams,
    threshold: f32,
    v: f32,
    adaptation: f32,
    fired_this_step: bool,
    refractory_until: f32,
    last_spike: Option<f32>,
    total_spikes: u64,
    spike_history: BoundedHistory<f32>,
    voltage_history: BoundedHistory<f32>,
}

impl Neuron {
    /// Create a neuron at rest from validated parameters.
    pub fn new(params: NeuronParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            threshold: params.v_thresh,
            v: params.v_rest,
            adaptation: 0.0,
            fired_this_step: false,
            refractory_until: 0.0,
            last_spike: None,
            total_spikes: 0,
            spike_history: BoundedHistory::new(HISTORY_CAPACITY),
            voltage_history: BoundedHistory::new(HISTORY_CAPACITY),
            params,
        })
    }

    /// Advance one time step.
    ///
    /// `input_pa` is the summed injected plus synaptic current for this step.
    /// Returns true when the neuron fired. While refractory the membrane is
    /// held at the reset potential and no integration happens.
    pub fn step(&mut self, input_pa: f32, dt_ms: f32, now_ms: f32) -> bool {
        self.fired_this_step = false;

        if now_ms < self.refractory_until {
            self.v = self.params.v_reset;
            return false;
        }

        let i_eff = input_pa - self.adaptation;

        // Forward Euler: leak toward rest plus capacitive drive (pA/pF = mV/ms)
        let dv_dt = (self.params.v_rest - self.v) / self.params.tau_m + i_eff / self.params.c_m;
        self.v += dv_dt * dt_ms;
        self.v = self.v.max(self.params.v_reset).min(V_CEIL_MV);

        self.adaptation *= (-dt_ms / self.params.tau_adapt).exp();

        self.voltage_history.push(self.v);

        if self.v >= self.threshold {
            self.fired_this_step = true;
            self.last_spike = Some(now_ms);
            self.refractory_until = now_ms + self.params.t_refrac;
            self.v = self.params.v_reset;
            self.adaptation += self.params.adapt_increment;
            self.total_spikes += 1;
            self.spike_history.push(now_ms);
        }

        self.fired_this_step
    }

    /// Restore construction-time state: membrane at rest, histories empty,
    /// counters zeroed, threshold back at the configured baseline.
    pub fn reset(&mut self) {
        self.threshold = self.params.v_thresh;
        self.v = self.params.v_rest;
        self.adaptation = 0.0;
        self.fired_this_step = false;
        self.refractory_until = 0.0;
        self.last_spike = None;
        self.total_spikes = 0;
        self.spike_history.clear();
        self.voltage_history.clear();
    }

    /// Firing rate (Hz) estimated from the mean inter-spike interval of the
    /// last up-to-10 recorded spikes. Zero when fewer than two spikes exist.
    pub fn instantaneous_firing_rate(&self) -> f32 {
        let recent: Vec<f32> = self.spike_history.recent(RATE_WINDOW_SPIKES).copied().collect();
        if recent.len() < 2 {
            return 0.0;
        }
        let span = recent[recent.len() - 1] - recent[0];
        let intervals = (recent.len() - 1) as f32;
        let mean_isi = span / intervals;
        if mean_isi <= 0.0 {
            return 0.0;
        }
        1000.0 / mean_isi
    }

    /// Membrane potential mapped to `[0, 1]` between rest and threshold.
    pub fn membrane_potential_normalized(&self) -> f32 {
        let span = self.threshold - self.params.v_rest;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.v - self.params.v_rest) / span).clamp(0.0, 1.0)
    }

    /// True while `t` falls inside the refractory window.
    pub fn is_in_refractory_period(&self, t_ms: f32) -> bool {
        t_ms < self.refractory_until
    }

    /// Current membrane potential (mV).
    pub fn membrane_potential(&self) -> f32 {
        self.v
    }

    /// Live firing threshold (mV); moves under homeostasis.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Overwrite the live threshold. Used by the homeostatic controller.
    pub fn set_threshold(&mut self, mv: f32) {
        self.threshold = mv;
    }

    /// Current adaptation current (pA).
    pub fn adaptation_current(&self) -> f32 {
        self.adaptation
    }

    /// Whether the neuron fired on the most recent step.
    pub fn fired_this_step(&self) -> bool {
        self.fired_this_step
    }

    /// Time of the most recent spike, if any.
    pub fn last_spike_time(&self) -> Option<f32> {
        self.last_spike
    }

    /// Cumulative spikes since construction or the last reset.
    pub fn total_spikes(&self) -> u64 {
        self.total_spikes
    }

    /// Recorded spike times, oldest first.
    pub fn spike_history(&self) -> &BoundedHistory<f32> {
        &self.spike_history
    }

    /// Recorded membrane potentials, oldest first.
    pub fn voltage_history(&self) -> &BoundedHistory<f32> {
        &self.voltage_history
    }
}
