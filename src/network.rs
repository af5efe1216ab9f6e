//! The network: owns neurons, synapses and in-flight events, and advances
//! the simulation one step at a time
//!
//! A step is one indivisible sequence: drain due events, integrate every
//! neuron against the accumulated input, emit delayed events for the spikes,
//! then housekeeping (activity history, synchrony, periodic homeostasis).
//! The engine is strictly single-threaded; nothing here suspends.

use std::collections::HashMap;

use crate::error::*;
use crate::event::{EventQueue, SpikeEvent};
use crate::history::BoundedHistory;
use crate::neuron::{Neuron, NeuronParams};
use crate::plasticity::{self, StdpMode};
use crate::synapse::{Synapse, SynapseId, SynapseSpec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default integration step (ms).
pub const DEFAULT_DT_MS: f32 = 0.1;
/// Entries retained in the spikes-per-step activity history.
pub const ACTIVITY_HISTORY_CAPACITY: usize = 1000;
/// Trailing activity entries feeding the synchrony index.
const SYNCHRONY_WINDOW: usize = 10;
/// Interval between homeostatic threshold updates (ms).
pub const HOMEOSTASIS_INTERVAL_MS: f32 = 100.0;
/// Gain of the homeostatic controller (mV per Hz of rate error).
const HOMEOSTASIS_GAIN: f32 = 0.001;
/// Rate error below which homeostasis leaves the threshold alone (Hz).
const HOMEOSTASIS_DEADBAND_HZ: f32 = 1.0;
/// Homeostatic threshold floor (mV).
pub const THRESHOLD_MIN_MV: f32 = -60.0;
/// Homeostatic threshold ceiling (mV).
pub const THRESHOLD_MAX_MV: f32 = -40.0;
/// Window for counting a neuron as recently active (ms).
const ACTIVE_WINDOW_MS: f32 = 100.0;

/// Outcome of one [`Network::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    /// Neurons that fired this step
    pub fired: usize,
    /// Spike events delivered this step
    pub delivered: usize,
}

/// Aggregate statistics snapshot for dashboards.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkStats {
    /// Cumulative spikes across all neurons
    pub total_spikes: u64,
    /// Mean instantaneous firing rate across neurons (Hz)
    pub avg_firing_rate: f32,
    /// Number of synapses
    pub total_synapses: usize,
    /// Mean synaptic weight
    pub avg_weight: f32,
    /// Fraction of possible directed edges present
    pub connectivity: f32,
    /// Neurons that spiked within the trailing 100 ms
    pub active_neurons: usize,
    /// Variance-to-mean ratio of recent population activity
    pub synchrony_index: f32,
    /// Current simulation time (ms)
    pub current_time: f32,
}

/// A spiking neural network advanced in discrete time steps
///
/// Owns the neuron and synapse collections and the event queue; their
/// lifetimes equal the network's. Neurons are addressed by their index into
/// an append-only vector, synapses by a stable [`SynapseId`].
#[derive(Debug)]
pub struct Network {
    neurons: Vec<Neuron>,
    synapses: Vec<Synapse>,
    synapse_index: HashMap<SynapseId, usize>,
    queue: EventQueue,
    injected: Vec<f32>,
    steps: u64,
    dt_ms: f32,
    next_synapse_id: u64,
    activity: BoundedHistory<u32>,
    synchrony_index: f32,
    last_homeostasis_ms: f32,
    /// Master switch for STDP across all synapses
    pub plasticity_enabled: bool,
    /// Whether the homeostatic threshold controller runs
    pub homeostasis_enabled: bool,
    /// Firing rate the homeostatic controller steers toward (Hz)
    pub target_firing_rate: f32,
    /// Which STDP semantics to apply
    pub stdp_mode: StdpMode,
}

impl Network {
    /// Create an empty network with the default 0.1 ms step.
    pub fn new() -> Self {
        Self {
            neurons: Vec::new(),
            synapses: Vec::new(),
            synapse_index: HashMap::new(),
            queue: EventQueue::new(),
            injected: Vec::new(),
            steps: 0,
            dt_ms: DEFAULT_DT_MS,
            next_synapse_id: 0,
            activity: BoundedHistory::new(ACTIVITY_HISTORY_CAPACITY),
            synchrony_index: 0.0,
            last_homeostasis_ms: 0.0,
            plasticity_enabled: true,
            homeostasis_enabled: false,
            target_firing_rate: 10.0,
            stdp_mode: StdpMode::default(),
        }
    }

    /// Current simulation time (ms). Derived from the step counter so long
    /// runs do not accumulate summation drift.
    pub fn current_time(&self) -> f32 {
        self.steps as f32 * self.dt_ms
    }

    /// Integration step size (ms).
    pub fn dt_ms(&self) -> f32 {
        self.dt_ms
    }

    /// Change the integration step size. Fails on non-positive values.
    pub fn set_dt_ms(&mut self, dt_ms: f32) -> Result<()> {
        if dt_ms <= 0.0 || !dt_ms.is_finite() {
            return Err(EngineError::invalid_parameter(
                "dt_ms",
                dt_ms.to_string(),
                "> 0.0 and finite",
            ));
        }
        self.dt_ms = dt_ms;
        Ok(())
    }

    /// Add a neuron, returning its index. Indices are stable for the
    /// lifetime of the network.
    pub fn add_neuron(&mut self, params: NeuronParams) -> Result<usize> {
        let neuron = Neuron::new(params)?;
        self.neurons.push(neuron);
        self.injected.push(0.0);
        Ok(self.neurons.len() - 1)
    }

    /// Add a synapse, returning its stable id. Fails fast on invalid
    /// endpoints or out-of-range parameters; network state is untouched on
    /// error.
    pub fn add_synapse(&mut self, spec: SynapseSpec) -> Result<SynapseId> {
        let count = self.neurons.len();
        if spec.from >= count {
            return Err(EngineError::neuron_not_found(spec.from, count));
        }
        if spec.to >= count {
            return Err(EngineError::neuron_not_found(spec.to, count));
        }

        let id = SynapseId(self.next_synapse_id);
        let synapse = Synapse::new(id, spec)?;
        self.next_synapse_id += 1;
        self.synapse_index.insert(id, self.synapses.len());
        self.synapses.push(synapse);
        Ok(id)
    }

    /// Convenience wrapper over [`Network::add_synapse`] with default
    /// plasticity.
    pub fn connect(&mut self, from: usize, to: usize, weight: f32, delay_ms: u32) -> Result<SynapseId> {
        self.add_synapse(SynapseSpec::new(from, to, weight, delay_ms))
    }

    /// Neurons, index-addressed.
    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    /// Mutable access to one neuron, for inter-step configuration.
    pub fn neuron_mut(&mut self, index: usize) -> Result<&mut Neuron> {
        let count = self.neurons.len();
        self.neurons
            .get_mut(index)
            .ok_or(EngineError::NeuronNotFound { index, count })
    }

    /// Synapses, in insertion order.
    pub fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }

    /// Look up a synapse by its stable id.
    pub fn synapse(&self, id: SynapseId) -> Option<&Synapse> {
        self.synapse_index.get(&id).map(|&i| &self.synapses[i])
    }

    /// In-flight spike events.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Spikes-per-step history, oldest first.
    pub fn activity(&self) -> &BoundedHistory<u32> {
        &self.activity
    }

    /// Variance-to-mean ratio of recent population activity.
    pub fn synchrony_index(&self) -> f32 {
        self.synchrony_index
    }

    /// Accumulate external currents (pA), one entry per neuron, consumed by
    /// the next [`Network::step`]. Extra entries are ignored.
    pub fn inject(&mut self, currents: &[f32]) {
        for (slot, &c) in self.injected.iter_mut().zip(currents) {
            *slot += c;
        }
    }

    /// Accumulate external current (pA) into a single neuron.
    pub fn apply_input(&mut self, index: usize, current_pa: f32) -> Result<()> {
        let count = self.neurons.len();
        match self.injected.get_mut(index) {
            Some(slot) => {
                *slot += current_pa;
                Ok(())
            }
            None => Err(EngineError::neuron_not_found(index, count)),
        }
    }

    /// Advance the simulation by one step.
    ///
    /// Ordering within the step is part of the contract: time advances,
    /// due events deliver (driving STDP), neurons integrate, new spikes
    /// enqueue delayed events, then activity/synchrony/homeostasis
    /// housekeeping runs.
    pub fn step(&mut self) -> StepReport {
        self.steps += 1;
        let now = self.current_time();
        let dt = self.dt_ms;

        // Per-neuron input accumulator, seeded with externally injected
        // current and zeroing the injection buffer for the next step.
        let mut inputs: Vec<f32> = Vec::with_capacity(self.neurons.len());
        inputs.extend(self.injected.iter().copied());
        for slot in self.injected.iter_mut() {
            *slot = 0.0;
        }

        // Drain due events: accumulate currents and run STDP per delivery.
        let due = self.queue.drain_due(now);
        let delivered = due.len();
        for event in due {
            if let Some(slot) = inputs.get_mut(event.target) {
                *slot += event.weight_at_emission;
            }
            if let Some(&syn_idx) = self.synapse_index.get(&event.synapse_id) {
                self.apply_stdp_on_delivery(syn_idx, event.source, event.target, now);
            }
        }

        // Integrate every neuron against the accumulated input.
        let mut fired = 0;
        for (i, neuron) in self.neurons.iter_mut().enumerate() {
            if neuron.step(inputs[i], dt, now) {
                fired += 1;
            }
        }

        // Emission pass: enqueue delayed events for every outgoing synapse
        // of a fired neuron; in trace mode a fired target also potentiates
        // its incoming synapses.
        let traces = self.stdp_enabled_mode() == Some(StdpMode::Traces);
        for syn_idx in 0..self.synapses.len() {
            let (from, to) = (self.synapses[syn_idx].from, self.synapses[syn_idx].to);
            if self.neurons[from].fired_this_step() {
                let syn = &self.synapses[syn_idx];
                self.queue.enqueue(SpikeEvent {
                    source: from,
                    target: to,
                    weight_at_emission: syn.weight(),
                    arrival_time: now + syn.delay_ms as f32,
                    synapse_id: syn.id,
                });
            }
            if traces && self.neurons[to].fired_this_step() {
                let syn = &mut self.synapses[syn_idx];
                if syn.plasticity.enabled {
                    let delta = plasticity::trace_on_post_spike(syn, now);
                    syn.apply_weight_delta(delta, now);
                }
            }
        }

        self.activity.push(fired as u32);
        self.update_synchrony();

        if self.homeostasis_enabled && now - self.last_homeostasis_ms >= HOMEOSTASIS_INTERVAL_MS {
            self.run_homeostasis();
            self.last_homeostasis_ms = now;
        }

        StepReport { fired, delivered }
    }

    fn stdp_enabled_mode(&self) -> Option<StdpMode> {
        if self.plasticity_enabled {
            Some(self.stdp_mode)
        } else {
            None
        }
    }

    fn apply_stdp_on_delivery(&mut self, syn_idx: usize, source: usize, target: usize, now: f32) {
        let Some(mode) = self.stdp_enabled_mode() else {
            return;
        };
        if !self.synapses[syn_idx].plasticity.enabled {
            return;
        }
        let delta = match mode {
            StdpMode::Pairwise => plasticity::pairwise_delta(
                self.neurons[source].spike_history(),
                self.neurons[target].spike_history(),
                &self.synapses[syn_idx].plasticity,
                now,
            ),
            StdpMode::Traces => plasticity::trace_on_pre_delivery(&mut self.synapses[syn_idx], now),
        };
        self.synapses[syn_idx].apply_weight_delta(delta, now);
    }

    /// Synchrony is the variance-to-mean ratio of the last ten activity
    /// entries; zero until ten entries exist.
    fn update_synchrony(&mut self) {
        if self.activity.len() < SYNCHRONY_WINDOW {
            self.synchrony_index = 0.0;
            return;
        }
        let window: Vec<f32> = self
            .activity
            .recent(SYNCHRONY_WINDOW)
            .map(|&a| a as f32)
            .collect();
        let mean = window.iter().sum::<f32>() / window.len() as f32;
        let variance =
            window.iter().map(|a| (a - mean) * (a - mean)).sum::<f32>() / window.len() as f32;
        self.synchrony_index = variance / (mean + 0.001);
    }

    /// Homeostatic threshold adaptation, stabilizing direction: firing above
    /// target raises the threshold, firing below lowers it. Thresholds stay
    /// inside `[THRESHOLD_MIN_MV, THRESHOLD_MAX_MV]`.
    fn run_homeostasis(&mut self) {
        for neuron in self.neurons.iter_mut() {
            let rate = neuron.instantaneous_firing_rate();
            let error = rate - self.target_firing_rate;
            if error.abs() > HOMEOSTASIS_DEADBAND_HZ {
                let adjusted = (neuron.threshold() + HOMEOSTASIS_GAIN * error)
                    .clamp(THRESHOLD_MIN_MV, THRESHOLD_MAX_MV);
                neuron.set_threshold(adjusted);
            }
        }
    }

    /// Restore every neuron to rest and every synapse to its construction
    /// weight; zero the clock, drop queued events and histories. The
    /// topology itself is untouched.
    pub fn reset(&mut self) {
        self.steps = 0;
        self.queue.clear();
        self.activity.clear();
        self.synchrony_index = 0.0;
        self.last_homeostasis_ms = 0.0;
        for slot in self.injected.iter_mut() {
            *slot = 0.0;
        }
        for neuron in self.neurons.iter_mut() {
            neuron.reset();
        }
        for synapse in self.synapses.iter_mut() {
            synapse.reset();
        }
    }

    /// Remove all neurons, synapses and in-flight events and zero the
    /// clock. Topology constructors call this before rebuilding.
    pub fn clear(&mut self) {
        self.neurons.clear();
        self.synapses.clear();
        self.synapse_index.clear();
        self.queue.clear();
        self.injected.clear();
        self.activity.clear();
        self.synchrony_index = 0.0;
        self.last_homeostasis_ms = 0.0;
        self.steps = 0;
        self.next_synapse_id = 0;
    }

    /// Aggregate statistics snapshot.
    pub fn stats(&self) -> NetworkStats {
        let n = self.neurons.len();
        let now = self.current_time();

        let total_spikes = self.neurons.iter().map(|nr| nr.total_spikes()).sum();
        let avg_firing_rate = if n > 0 {
            self.neurons
                .iter()
                .map(|nr| nr.instantaneous_firing_rate())
                .sum::<f32>()
                / n as f32
        } else {
            0.0
        };
        let avg_weight = if self.synapses.is_empty() {
            0.0
        } else {
            self.synapses.iter().map(|s| s.weight()).sum::<f32>() / self.synapses.len() as f32
        };
        let connectivity = if n > 1 {
            self.synapses.len() as f32 / (n * (n - 1)) as f32
        } else {
            0.0
        };
        let active_neurons = self
            .neurons
            .iter()
            .filter(|nr| {
                nr.last_spike_time()
                    .map(|t| now - t <= ACTIVE_WINDOW_MS)
                    .unwrap_or(false)
            })
            .count();

        NetworkStats {
            total_spikes,
            avg_firing_rate,
            total_synapses: self.synapses.len(),
            avg_weight,
            connectivity,
            active_neurons,
            synchrony_index: self.synchrony_index,
            current_time: now,
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}
