//! Core simulation engine for an interactive spiking neural network sandbox
//!
//! A discrete-time, event-driven simulator of leaky integrate-and-fire
//! neurons connected by delayed, plastic synapses, with spike-timing
//! dependent plasticity and homeostatic threshold regulation. The engine is
//! strictly single-threaded; visual front ends drive it forward in time,
//! read back state and statistics, and mutate configuration between steps.
//!
//! Units are part of the contract: time in milliseconds, voltage in
//! millivolts, current in picoamps.
//!
//! ```
//! use spiking_sandbox::{Network, Simulator, TopologyBuilder};
//!
//! let mut network = Network::new();
//! TopologyBuilder::with_seed(7).ring(&mut network, 8).unwrap();
//!
//! let mut simulator = Simulator::new(
//!     network,
//!     |net: &spiking_sandbox::Network, t: f32| {
//!         let _ = (net.stats(), t);
//!     },
//!     10.0,
//! )
//! .unwrap();
//!
//! simulator.set_input_pattern_by_name("pulse-train");
//! simulator.play();
//! simulator.tick();
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod history;
pub mod input;
pub mod network;
pub mod neuron;
pub mod plasticity;
pub mod simulator;
pub mod synapse;
pub mod topology;

pub use error::{EngineError, Result};
pub use event::{EventQueue, SpikeEvent};
pub use history::BoundedHistory;
pub use input::{InputGenerator, InputPattern, MiniConfig};
pub use network::{Network, NetworkStats, StepReport, DEFAULT_DT_MS};
pub use neuron::{Neuron, NeuronParams};
pub use plasticity::StdpMode;
pub use simulator::{SimulationObserver, Simulator};
pub use synapse::{PlasticityParams, Synapse, SynapseId, SynapseSpec};
pub use topology::TopologyBuilder;
