//! Spike-timing-dependent plasticity rules
//!
//! Two semantics are offered. [`StdpMode::Pairwise`] sums over every
//! pre/post spike pair in the trailing window on each delivery, which is the
//! historical sandbox behavior. [`StdpMode::Traces`] keeps exponential pre-
//! and post-synaptic traces on each synapse, updated once per spike; it is
//! the default because its cost is constant per spike and a pair is never
//! counted twice across repeated deliveries.

use crate::history::BoundedHistory;
use crate::synapse::{PlasticityParams, Synapse};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trailing window consulted by the pairwise rule (ms).
pub const STDP_WINDOW_MS: f32 = 100.0;

/// Which STDP semantics the network applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StdpMode {
    /// All pre/post pairs in the trailing window, evaluated at delivery
    Pairwise,
    /// Exponential per-synapse traces, updated once per spike
    #[default]
    Traces,
}

/// Weight change from all pre/post spike pairs inside the trailing window.
///
/// For each pair with `dt = t_post - t_pre`: potentiation `a_plus *
/// exp(-dt/tau_plus)` when the post spike follows the pre spike, depression
/// `a_minus * exp(dt/tau_minus)` when it precedes it. Simultaneous spikes
/// contribute nothing.
pub fn pairwise_delta(
    pre_spikes: &BoundedHistory<f32>,
    post_spikes: &BoundedHistory<f32>,
    params: &PlasticityParams,
    now_ms: f32,
) -> f32 {
    let cutoff = now_ms - STDP_WINDOW_MS;
    let mut delta = 0.0;

    for &t_pre in pre_spikes.iter().filter(|&&t| t > cutoff) {
        for &t_post in post_spikes.iter().filter(|&&t| t > cutoff) {
            let dt = t_post - t_pre;
            if dt > 0.0 {
                delta += params.a_plus * (-dt / params.tau_plus).exp();
            } else if dt < 0.0 {
                delta -= params.a_minus * (dt / params.tau_minus).exp();
            }
        }
    }

    delta
}

/// Decay a synapse's traces forward to `now_ms`.
fn decay_traces(syn: &mut Synapse, now_ms: f32) {
    let dt = now_ms - syn.trace_time;
    if dt > 0.0 {
        syn.pre_trace *= (-dt / syn.plasticity.tau_plus).exp();
        syn.post_trace *= (-dt / syn.plasticity.tau_minus).exp();
    }
    syn.trace_time = now_ms;
}

/// Trace update for a pre-synaptic spike arriving at the synapse.
///
/// Returns the depression to apply (non-positive) and bumps the pre trace.
pub(crate) fn trace_on_pre_delivery(syn: &mut Synapse, now_ms: f32) -> f32 {
    decay_traces(syn, now_ms);
    let delta = -syn.plasticity.a_minus * syn.post_trace;
    syn.pre_trace += 1.0;
    delta
}

/// Trace update for the post-synaptic neuron firing.
///
/// Returns the potentiation to apply (non-negative) and bumps the post trace.
pub(crate) fn trace_on_post_spike(syn: &mut Synapse, now_ms: f32) -> f32 {
    decay_traces(syn, now_ms);
    let delta = syn.plasticity.a_plus * syn.pre_trace;
    syn.post_trace += 1.0;
    delta
}
