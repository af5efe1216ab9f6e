//! Named topology constructors
//!
//! Each constructor replaces the network's neurons, synapses and queued
//! events wholesale and zeroes the clock. Randomized variants draw from the
//! builder's own RNG so runs can be made reproducible with
//! [`TopologyBuilder::with_seed`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::*;
use crate::network::Network;
use crate::neuron::NeuronParams;
use crate::synapse::{PlasticityParams, SynapseSpec};

/// Default layer sizes for the cortical column variant.
pub const DEFAULT_COLUMN_LAYERS: [usize; 4] = [4, 6, 4, 2];

/// Constructs neuron populations and synapse sets for named topologies.
#[derive(Debug)]
pub struct TopologyBuilder {
    rng: StdRng,
    neuron_params: NeuronParams,
    plasticity: PlasticityParams,
}

impl TopologyBuilder {
    /// Builder with entropy-seeded randomness and default parameters.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic builder for reproducible topologies.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            neuron_params: NeuronParams::default(),
            plasticity: PlasticityParams::default(),
        }
    }

    /// Base parameters applied to constructed neurons.
    pub fn neuron_params(mut self, params: NeuronParams) -> Self {
        self.neuron_params = params;
        self
    }

    /// Plasticity parameters applied to constructed synapses.
    pub fn plasticity(mut self, plasticity: PlasticityParams) -> Self {
        self.plasticity = plasticity;
        self
    }

    /// Erdős–Rényi style topology: each ordered pair `i != j` is connected
    /// with probability `p`; weights U(0.2, 1.0), delays U{1..5}.
    pub fn random(&mut self, net: &mut Network, size: usize, p: f64) -> Result<()> {
        validate_size(size, 1)?;
        validate_probability("p", p)?;
        net.clear();
        let params = self.neuron_params.clone();
        self.add_population(net, size, &params)?;

        for i in 0..size {
            for j in 0..size {
                if i != j && self.rng.gen_bool(p) {
                    let weight = self.rng.gen_range(0.2..1.0);
                    let delay = self.rng.gen_range(1..=5);
                    self.add_edge(net, i, j, weight, delay)?;
                }
            }
        }
        Ok(())
    }

    /// Three feedforward layers of roughly `size / 3` neurons; each neuron
    /// connects to each neuron of the next layer with p=0.5; weights
    /// U(0.5, 1.0), delays U{1..5}.
    pub fn feedforward(&mut self, net: &mut Network, size: usize) -> Result<()> {
        validate_size(size, 3)?;
        net.clear();
        let params = self.neuron_params.clone();
        self.add_population(net, size, &params)?;

        let third = size / 3;
        let bounds = [0, third, 2 * third, size];
        for layer in 0..2 {
            for i in bounds[layer]..bounds[layer + 1] {
                for j in bounds[layer + 1]..bounds[layer + 2] {
                    if self.rng.gen_bool(0.5) {
                        let weight = self.rng.gen_range(0.5..1.0);
                        let delay = self.rng.gen_range(1..=5);
                        self.add_edge(net, i, j, weight, delay)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Directed ring: `i -> (i + 1) mod size`, weight 0.8, delay 2 ms.
    pub fn ring(&mut self, net: &mut Network, size: usize) -> Result<()> {
        validate_size(size, 2)?;
        net.clear();
        let params = self.neuron_params.clone();
        self.add_population(net, size, &params)?;
        for i in 0..size {
            self.add_edge(net, i, (i + 1) % size, 0.8, 2)?;
        }
        Ok(())
    }

    /// Watts–Strogatz style rewiring of the ring: each ring edge is rewired
    /// with probability `rewire_p` to a random other target, preserving its
    /// source, weight and delay.
    pub fn small_world(&mut self, net: &mut Network, size: usize, rewire_p: f64) -> Result<()> {
        validate_size(size, 2)?;
        validate_probability("rewire_p", rewire_p)?;
        net.clear();
        let params = self.neuron_params.clone();
        self.add_population(net, size, &params)?;

        for i in 0..size {
            let mut target = (i + 1) % size;
            if self.rng.gen_bool(rewire_p) {
                // Any neuron but the source itself
                loop {
                    target = self.rng.gen_range(0..size);
                    if target != i {
                        break;
                    }
                }
            }
            self.add_edge(net, i, target, 0.8, 2)?;
        }
        Ok(())
    }

    /// Cortical column: feedforward layers with within-layer recurrence.
    /// Deeper layers get slightly higher thresholds and slower membranes.
    /// Inter-layer connection probability is 0.8 out of layer 0, 0.6
    /// elsewhere; recurrent probability 0.1 with no self-loops.
    pub fn cortical_column(&mut self, net: &mut Network, layer_sizes: &[usize]) -> Result<()> {
        if layer_sizes.is_empty() {
            return Err(EngineError::topology("layer list must not be empty"));
        }
        if layer_sizes.iter().any(|&s| s == 0) {
            return Err(EngineError::topology("every layer needs at least one neuron"));
        }

        net.clear();
        let mut offsets = Vec::with_capacity(layer_sizes.len() + 1);
        offsets.push(0);
        for (depth, &layer_size) in layer_sizes.iter().enumerate() {
            let mut params = self.neuron_params.clone();
            params.v_thresh += depth as f32;
            params.tau_m += 5.0 * depth as f32;
            self.add_population(net, layer_size, &params)?;
            offsets.push(offsets[depth] + layer_size);
        }

        for layer in 0..layer_sizes.len() {
            let (start, end) = (offsets[layer], offsets[layer + 1]);

            // Feedforward projection to the next layer
            if layer + 1 < layer_sizes.len() {
                let p_forward = if layer == 0 { 0.8 } else { 0.6 };
                for i in start..end {
                    for j in offsets[layer + 1]..offsets[layer + 2] {
                        if self.rng.gen_bool(p_forward) {
                            let weight = self.rng.gen_range(0.3..0.7);
                            let delay = self.rng.gen_range(1..=3);
                            self.add_edge(net, i, j, weight, delay)?;
                        }
                    }
                }
            }

            // Sparse within-layer recurrence
            for i in start..end {
                for j in start..end {
                    if i != j && self.rng.gen_bool(0.1) {
                        let weight = self.rng.gen_range(0.1..0.3);
                        self.add_edge(net, i, j, weight, 1)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn add_population(&mut self, net: &mut Network, size: usize, params: &NeuronParams) -> Result<()> {
        for _ in 0..size {
            net.add_neuron(params.clone())?;
        }
        Ok(())
    }

    fn add_edge(
        &mut self,
        net: &mut Network,
        from: usize,
        to: usize,
        weight: f32,
        delay_ms: u32,
    ) -> Result<()> {
        net.add_synapse(
            SynapseSpec::new(from, to, weight, delay_ms).with_plasticity(self.plasticity.clone()),
        )?;
        Ok(())
    }
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_size(size: usize, min: usize) -> Result<()> {
    if size < min {
        return Err(EngineError::topology(format!(
            "population of {} is too small (need at least {})",
            size, min
        )));
    }
    Ok(())
}

fn validate_probability(name: &str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(EngineError::invalid_parameter(
            name,
            p.to_string(),
            "in [0, 1]",
        ));
    }
    Ok(())
}

impl Network {
    /// Rebuild as a random topology. See [`TopologyBuilder::random`].
    pub fn create_random(&mut self, size: usize, p: f64) -> Result<()> {
        TopologyBuilder::new().random(self, size, p)
    }

    /// Rebuild as a three-layer feedforward topology.
    /// See [`TopologyBuilder::feedforward`].
    pub fn create_feedforward(&mut self, size: usize) -> Result<()> {
        TopologyBuilder::new().feedforward(self, size)
    }

    /// Rebuild as a directed ring. See [`TopologyBuilder::ring`].
    pub fn create_ring(&mut self, size: usize) -> Result<()> {
        TopologyBuilder::new().ring(self, size)
    }

    /// Rebuild as a rewired ring. See [`TopologyBuilder::small_world`].
    pub fn create_small_world(&mut self, size: usize, rewire_p: f64) -> Result<()> {
        TopologyBuilder::new().small_world(self, size, rewire_p)
    }

    /// Rebuild as a cortical column. See [`TopologyBuilder::cortical_column`].
    pub fn create_cortical_column(&mut self, layer_sizes: &[usize]) -> Result<()> {
        TopologyBuilder::new().cortical_column(self, layer_sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_structure() {
        let mut net = Network::new();
        TopologyBuilder::with_seed(1).ring(&mut net, 8).unwrap();

        assert_eq!(net.neurons().len(), 8);
        assert_eq!(net.synapses().len(), 8);
        for (i, syn) in net.synapses().iter().enumerate() {
            assert_eq!(syn.from, i);
            assert_eq!(syn.to, (i + 1) % 8);
            assert_eq!(syn.weight(), 0.8);
            assert_eq!(syn.delay_ms, 2);
        }
    }

    #[test]
    fn test_random_edge_properties() {
        let mut net = Network::new();
        TopologyBuilder::with_seed(2).random(&mut net, 20, 0.3).unwrap();

        assert_eq!(net.neurons().len(), 20);
        assert!(!net.synapses().is_empty());
        for syn in net.synapses() {
            assert_ne!(syn.from, syn.to, "no self-loops");
            assert!((0.2..1.0).contains(&syn.weight()));
            assert!((1..=5).contains(&syn.delay_ms));
        }
        // ~0.3 * 380 possible edges; loose bounds to stay seed-robust
        let count = net.synapses().len();
        assert!((60..170).contains(&count), "unexpected edge count {}", count);
    }

    #[test]
    fn test_random_extremes() {
        let mut net = Network::new();
        TopologyBuilder::with_seed(3).random(&mut net, 6, 0.0).unwrap();
        assert!(net.synapses().is_empty());

        TopologyBuilder::with_seed(3).random(&mut net, 6, 1.0).unwrap();
        assert_eq!(net.synapses().len(), 30);
    }

    #[test]
    fn test_feedforward_layering() {
        let mut net = Network::new();
        TopologyBuilder::with_seed(4).feedforward(&mut net, 30).unwrap();

        assert_eq!(net.neurons().len(), 30);
        for syn in net.synapses() {
            let from_layer = syn.from / 10;
            let to_layer = syn.to / 10;
            assert_eq!(to_layer, from_layer + 1, "edges only cross to the next layer");
            assert!((0.5..1.0).contains(&syn.weight()));
        }
    }

    #[test]
    fn test_small_world_preserves_edge_count() {
        let mut net = Network::new();
        TopologyBuilder::with_seed(5)
            .small_world(&mut net, 16, 0.5)
            .unwrap();

        assert_eq!(net.synapses().len(), 16);
        let mut rewired = 0;
        for (i, syn) in net.synapses().iter().enumerate() {
            assert_eq!(syn.from, i);
            assert_ne!(syn.from, syn.to);
            assert_eq!(syn.weight(), 0.8);
            assert_eq!(syn.delay_ms, 2);
            if syn.to != (i + 1) % 16 {
                rewired += 1;
            }
        }
        assert!(rewired > 0, "seed should produce at least one rewire");
    }

    #[test]
    fn test_small_world_zero_rewire_is_ring() {
        let mut net = Network::new();
        TopologyBuilder::with_seed(6)
            .small_world(&mut net, 10, 0.0)
            .unwrap();
        for (i, syn) in net.synapses().iter().enumerate() {
            assert_eq!(syn.to, (i + 1) % 10);
        }
    }

    #[test]
    fn test_cortical_column_layers() {
        let mut net = Network::new();
        TopologyBuilder::with_seed(7)
            .cortical_column(&mut net, &DEFAULT_COLUMN_LAYERS)
            .unwrap();

        assert_eq!(net.neurons().len(), 16);

        // Deeper layers are less excitable and slower
        let l0 = &net.neurons()[0];
        let l3 = &net.neurons()[15];
        assert!(l3.threshold() > l0.threshold());
        assert!(l3.params.tau_m > l0.params.tau_m);

        for syn in net.synapses() {
            assert_ne!(syn.from, syn.to);
            assert!((1..=3).contains(&syn.delay_ms));
        }
    }

    #[test]
    fn test_cortical_column_rejects_bad_layers() {
        let mut net = Network::new();
        let mut builder = TopologyBuilder::with_seed(8);
        assert!(builder.cortical_column(&mut net, &[]).is_err());
        assert!(builder.cortical_column(&mut net, &[4, 0, 2]).is_err());
    }

    #[test]
    fn test_constructors_reset_clock_and_queue() {
        let mut net = Network::new();
        net.create_ring(4).unwrap();
        for _ in 0..50 {
            net.apply_input(0, 1000.0).unwrap();
            net.step();
        }
        assert!(net.current_time() > 0.0);

        net.create_random(5, 0.5).unwrap();
        assert_eq!(net.current_time(), 0.0);
        assert!(net.queue().is_empty());
        assert_eq!(net.neurons().len(), 5);
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let mut net = Network::new();
        assert!(TopologyBuilder::with_seed(9).random(&mut net, 4, 1.5).is_err());
    }
}
