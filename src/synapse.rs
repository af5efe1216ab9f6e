//! Directed, delayed, plastic synapses

use crate::error::*;
use crate::history::BoundedHistory;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lower bound on synaptic weight.
pub const WEIGHT_MIN: f32 = 0.0;
/// Upper bound on synaptic weight.
pub const WEIGHT_MAX: f32 = 2.0;
/// Weight changes smaller than this are applied but not recorded.
pub const WEIGHT_RECORD_EPSILON: f32 = 0.001;
/// Entries retained in the per-synapse weight history.
pub const WEIGHT_HISTORY_CAPACITY: usize = 100;

/// Stable identifier for a synapse, issued by the owning network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SynapseId(pub u64);

impl std::fmt::Display for SynapseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Per-edge STDP parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlasticityParams {
    /// Whether this edge participates in STDP at all
    pub enabled: bool,
    /// Learning rate for potentiation (weight increase)
    pub a_plus: f32,
    /// Learning rate for depression (weight decrease)
    pub a_minus: f32,
    /// Time constant for potentiation (ms)
    pub tau_plus: f32,
    /// Time constant for depression (ms)
    pub tau_minus: f32,
}

impl Default for PlasticityParams {
    fn default() -> Self {
        Self {
            enabled: true,
            a_plus: 0.01,   // 1% potentiation rate
            a_minus: 0.012, // 1.2% depression rate (slightly stronger)
            tau_plus: 20.0, // 20ms potentiation window
            tau_minus: 20.0, // 20ms depression window
        }
    }
}

impl PlasticityParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.a_plus < 0.0 {
            return Err(EngineError::invalid_parameter(
                "a_plus",
                self.a_plus.to_string(),
                ">= 0.0",
            ));
        }
        if self.a_minus < 0.0 {
            return Err(EngineError::invalid_parameter(
                "a_minus",
                self.a_minus.to_string(),
                ">= 0.0",
            ));
        }
        if self.tau_plus <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "tau_plus",
                self.tau_plus.to_string(),
                "> 0.0",
            ));
        }
        if self.tau_minus <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "tau_minus",
                self.tau_minus.to_string(),
                "> 0.0",
            ));
        }
        Ok(())
    }
}

/// Specification for a synapse to be added to a network
#[derive(Debug, Clone)]
pub struct SynapseSpec {
    /// Pre-synaptic neuron index
    pub from: usize,
    /// Post-synaptic neuron index
    pub to: usize,
    /// Initial weight, in `[WEIGHT_MIN, WEIGHT_MAX]`
    pub weight: f32,
    /// Axonal delay in whole milliseconds, at least 1
    pub delay_ms: u32,
    /// STDP parameters for this edge
    pub plasticity: PlasticityParams,
}

impl SynapseSpec {
    /// Create a spec with default plasticity parameters.
    pub fn new(from: usize, to: usize, weight: f32, delay_ms: u32) -> Self {
        Self {
            from,
            to,
            weight,
            delay_ms,
            plasticity: PlasticityParams::default(),
        }
    }

    /// Replace the plasticity parameters.
    pub fn with_plasticity(mut self, plasticity: PlasticityParams) -> Self {
        self.plasticity = plasticity;
        self
    }
}

/// A directed weighted edge with axonal delay and plasticity state
///
/// Only the owning [`Network`](crate::network::Network) mutates the weight;
/// every recorded change larger than [`WEIGHT_RECORD_EPSILON`] is appended to
/// the bounded weight history. The construction weight is kept aside so reset
/// can restore it even after the history has evicted old entries.
#[derive(Debug, Clone)]
pub struct Synapse {
    /// Stable identifier
    pub id: SynapseId,
    /// Pre-synaptic neuron index
    pub from: usize,
    /// Post-synaptic neuron index
    pub to: usize,
    /// Axonal delay (ms)
    pub delay_ms: u32,
    /// Per-edge STDP parameters
    pub plasticity: PlasticityParams,
    /// Time of the last recorded weight change (ms)
    pub last_update_ms: f32,
    weight: f32,
    initial_weight: f32,
    weight_history: BoundedHistory<f32>,
    // Exponential STDP traces, decayed lazily to `trace_time`
    pub(crate) pre_trace: f32,
    pub(crate) post_trace: f32,
    pub(crate) trace_time: f32,
}

impl Synapse {
    /// Build a synapse from a validated spec. Endpoint indices are checked
    /// by the network, not here.
    pub fn new(id: SynapseId, spec: SynapseSpec) -> Result<Self> {
        spec.plasticity.validate()?;
        if !(WEIGHT_MIN..=WEIGHT_MAX).contains(&spec.weight) {
            return Err(EngineError::invalid_parameter(
                "weight",
                spec.weight.to_string(),
                format!("in [{}, {}]", WEIGHT_MIN, WEIGHT_MAX),
            ));
        }
        if spec.delay_ms < 1 {
            return Err(EngineError::invalid_parameter(
                "delay_ms",
                spec.delay_ms.to_string(),
                ">= 1",
            ));
        }

        let mut weight_history = BoundedHistory::new(WEIGHT_HISTORY_CAPACITY);
        weight_history.push(spec.weight);

        Ok(Self {
            id,
            from: spec.from,
            to: spec.to,
            delay_ms: spec.delay_ms,
            plasticity: spec.plasticity,
            last_update_ms: 0.0,
            weight: spec.weight,
            initial_weight: spec.weight,
            weight_history,
            pre_trace: 0.0,
            post_trace: 0.0,
            trace_time: 0.0,
        })
    }

    /// Current weight.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Weight the synapse was constructed with.
    pub fn initial_weight(&self) -> f32 {
        self.initial_weight
    }

    /// Recorded weight values, oldest retained first.
    pub fn weight_history(&self) -> &BoundedHistory<f32> {
        &self.weight_history
    }

    /// Apply a weight change, clamping into `[WEIGHT_MIN, WEIGHT_MAX]`.
    /// Changes larger than [`WEIGHT_RECORD_EPSILON`] are recorded with a
    /// timestamp.
    pub(crate) fn apply_weight_delta(&mut self, delta: f32, now_ms: f32) {
        if delta == 0.0 {
            return;
        }
        let old = self.weight;
        let new = (old + delta).clamp(WEIGHT_MIN, WEIGHT_MAX);
        self.weight = new;
        if (new - old).abs() > WEIGHT_RECORD_EPSILON {
            self.weight_history.push(new);
            self.last_update_ms = now_ms;
        }
    }

    /// Restore the construction weight and truncate the history to it.
    pub(crate) fn reset(&mut self) {
        self.weight = self.initial_weight;
        self.weight_history.clear();
        self.weight_history.push(self.initial_weight);
        self.last_update_ms = 0.0;
        self.pre_trace = 0.0;
        self.post_trace = 0.0;
        self.trace_time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(weight: f32, delay: u32) -> Synapse {
        Synapse::new(SynapseId(0), SynapseSpec::new(0, 1, weight, delay)).unwrap()
    }

    #[test]
    fn test_spec_validation() {
        assert!(Synapse::new(SynapseId(0), SynapseSpec::new(0, 1, 2.5, 1)).is_err());
        assert!(Synapse::new(SynapseId(0), SynapseSpec::new(0, 1, -0.1, 1)).is_err());
        assert!(Synapse::new(SynapseId(0), SynapseSpec::new(0, 1, 0.5, 0)).is_err());
        assert!(Synapse::new(SynapseId(0), SynapseSpec::new(0, 1, 0.5, 1)).is_ok());
    }

    #[test]
    fn test_plasticity_params_validation() {
        let mut p = PlasticityParams::default();
        assert!(p.validate().is_ok());
        p.tau_plus = 0.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_history_starts_with_construction_weight() {
        let syn = make(0.7, 2);
        assert_eq!(syn.weight_history().to_vec(), vec![0.7]);
        assert_eq!(syn.initial_weight(), 0.7);
    }

    #[test]
    fn test_delta_clamps_and_records() {
        let mut syn = make(1.9, 1);
        syn.apply_weight_delta(0.5, 12.0);
        assert_eq!(syn.weight(), WEIGHT_MAX);
        assert_eq!(syn.last_update_ms, 12.0);
        assert_eq!(syn.weight_history().to_vec(), vec![1.9, 2.0]);

        syn.apply_weight_delta(-5.0, 13.0);
        assert_eq!(syn.weight(), WEIGHT_MIN);
        assert_eq!(syn.weight_history().last(), Some(&0.0));
    }

    #[test]
    fn test_tiny_delta_not_recorded() {
        let mut syn = make(0.5, 1);
        syn.apply_weight_delta(0.0005, 5.0);
        assert!((syn.weight() - 0.5005).abs() < 1e-6);
        assert_eq!(syn.weight_history().len(), 1);
        assert_eq!(syn.last_update_ms, 0.0);
    }

    #[test]
    fn test_reset_restores_initial_weight() {
        let mut syn = make(0.5, 1);
        for k in 0..200 {
            syn.apply_weight_delta(0.005, k as f32);
        }
        // History is bounded, but reset still restores the construction weight
        assert!(syn.weight() > 0.5);
        syn.reset();
        assert_eq!(syn.weight(), 0.5);
        assert_eq!(syn.weight_history().to_vec(), vec![0.5]);
        assert_eq!(syn.last_update_ms, 0.0);
    }
}
