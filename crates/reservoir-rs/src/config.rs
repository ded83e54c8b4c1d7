//! Reservoir construction parameters.

use std::fs;
use std::path::Path;

use liquid_core::{GridKind, LiquidError, Result, SimulationParams, StimulusParams};
use serde::{Deserialize, Serialize};

use crate::astrocyte::AstrocyteParams;
use crate::connectivity::ConnectionProfile;
use crate::filter::FilterParams;
use crate::neuron::LifParams;
use crate::synapse::StdpParams;

/// Everything needed to build and run a reservoir
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservoirConfig {
    pub n_inputs: usize,
    pub n_neurons: usize,
    /// "cubic" or "hex"; parsed at construction
    pub topology: String,
    pub grid_spacing: f64,
    pub excitatory_fraction: f64,
    pub n_astrocytes: usize,
    pub synapses_per_astrocyte: usize,
    /// Ticks averaged by the astrocyte input window
    pub astro_t_avg: usize,
    pub simulation: SimulationParams,
    pub seed: u64,
    /// Ticks between progress lines
    pub log_every: usize,
    pub lif: LifParams,
    pub stdp: StdpParams,
    pub filter: FilterParams,
    pub astrocyte: AstrocyteParams,
    pub connections: ConnectionProfile,
    pub stimulus: StimulusParams,
    pub rest: StimulusParams,
}

impl Default for ReservoirConfig {
    fn default() -> Self {
        Self {
            n_inputs: 64,
            n_neurons: 125,
            topology: "hex".into(),
            grid_spacing: 1.0,
            excitatory_fraction: 0.8,
            n_astrocytes: 10,
            synapses_per_astrocyte: 20,
            astro_t_avg: 10,
            simulation: SimulationParams::default(),
            seed: 42,
            log_every: 100,
            lif: LifParams::default(),
            stdp: StdpParams::default(),
            filter: FilterParams::default(),
            astrocyte: AstrocyteParams::default(),
            connections: ConnectionProfile::default(),
            stimulus: StimulusParams::stimulus(),
            rest: StimulusParams::rest(),
        }
    }
}

impl ReservoirConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn grid_kind(&self) -> Result<GridKind> {
        self.topology.parse()
    }

    /// Reject configurations that cannot produce a valid reservoir.
    pub fn validate(&self) -> Result<()> {
        self.grid_kind()?;

        if self.n_neurons == 0 {
            return Err(LiquidError::InvalidParameter("reservoir needs at least one neuron".into()));
        }
        if self.n_inputs > self.n_neurons {
            return Err(LiquidError::InvalidParameter(format!(
                "{} input channels exceed {} neurons",
                self.n_inputs, self.n_neurons
            )));
        }
        if self.astro_t_avg == 0 {
            return Err(LiquidError::InvalidParameter("astro_t_avg must be at least 1".into()));
        }
        if self.simulation.dt <= 0.0 || !self.simulation.dt.is_finite() {
            return Err(LiquidError::InvalidParameter(format!(
                "dt must be positive, got {}",
                self.simulation.dt
            )));
        }
        if !(0.0..=1.0).contains(&self.excitatory_fraction) {
            return Err(LiquidError::InvalidParameter(format!(
                "excitatory fraction must lie in [0, 1], got {}",
                self.excitatory_fraction
            )));
        }
        if self.lif.tau_v <= 0.0 {
            return Err(LiquidError::InvalidParameter("tau_v must be positive".into()));
        }

        self.stdp.validate()?;
        self.astrocyte.validate()?;
        self.connections.validate()?;
        self.stimulus.validate("stimulus")?;
        self.rest.validate("rest")?;
        self.filter.build()?;
        Ok(())
    }
}
