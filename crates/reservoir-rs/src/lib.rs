//! # Liquid Reservoir: Astrocyte-Modulated Spiking Liquid
//!
//! A recurrently connected reservoir of leaky integrate-and-fire neurons whose
//! synapses learn under STDP, with the depression strength set by a population
//! of astrocyte-like regulatory units.
//!
//! Per tick, in this fixed order:
//! - Neurons integrate external drive plus the previous tick's synaptic currents
//! - Synapses filter presynaptic spike history into current and update weights
//! - Astrocytes compare windowed liquid spiking with windowed input drive
//!
//! Entities live in per-population arenas and refer to each other by index
//! (`NeuronId`, `SynapseId`, `AstrocyteId`).
//!
//! ```no_run
//! use liquid_core::Condition;
//! use liquid_reservoir::{Reservoir, ReservoirConfig};
//!
//! let mut reservoir = Reservoir::from_config(ReservoirConfig::default())?;
//! reservoir.run(Condition::Stimulus, true)?;
//! reservoir.run(Condition::Rest, true)?;
//! println!("{} ticks recorded", reservoir.history().len());
//! # Ok::<(), liquid_core::LiquidError>(())
//! ```

pub mod astrocyte;
pub mod config;
pub mod connectivity;
pub mod filter;
pub mod history;
pub mod neuron;
pub mod reservoir;
pub mod synapse;

pub use astrocyte::{Astrocyte, AstrocyteId, AstrocyteParams, AstrocytePopulation, Rates};
pub use config::ReservoirConfig;
pub use connectivity::{
    build_synapses, place_neurons, ConnectionProfile, ConnectionType, ConnectivityStats,
    FalloffKernel,
};
pub use filter::{FilterKind, FilterParams, SynapticFilter};
pub use history::{History, Recorder};
pub use neuron::{LifParams, Neuron, NeuronId, NeuronPopulation};
pub use reservoir::{Reservoir, RunSummary};
pub use synapse::{StdpParams, Synapse, SynapseId, SynapsePopulation, WeightCap};
