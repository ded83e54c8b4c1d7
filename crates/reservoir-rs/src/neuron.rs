//! Leaky integrate-and-fire population.

use liquid_core::{Position, Time, Voltage};
use serde::{Deserialize, Serialize};

use crate::synapse::{SynapseId, SynapsePopulation};

/// Index of a neuron in the population arena
pub type NeuronId = usize;

/// LIF parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifParams {
    pub threshold: f64,            // Firing threshold
    pub tau_v: f64,                // Membrane time constant
    pub refractory: Time,          // Absolute refractory period
    pub v_min: Voltage,            // Lower membrane clamp
    pub v_ceiling: Voltage,        // Upper clamp is threshold + v_ceiling
    pub excitatory_amplitude: f64, // Emitted value of an excitatory spike
    pub inhibitory_amplitude: f64, // Emitted value of an inhibitory spike (negative)
}

impl Default for LifParams {
    fn default() -> Self {
        Self {
            threshold: 20.0,
            tau_v: 64.0,
            refractory: 2.0,
            v_min: -4.0,
            v_ceiling: 1.0,
            excitatory_amplitude: 1.0,
            inhibitory_amplitude: -1.0,
        }
    }
}

/// Single LIF neuron
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neuron {
    pub v: Voltage,
    pub threshold: f64,
    /// Signed spike amplitude; positive is excitatory
    pub amplitude: f64,
    pub outgoing: Vec<SynapseId>,
    pub incoming: Vec<SynapseId>,
    pub last_spike: Time,
    /// One entry per simulated tick: 0 when silent, `amplitude` when spiking
    pub spikes: Vec<f64>,
    pub position: Position,
}

impl Neuron {
    pub fn new(amplitude: f64, threshold: f64, position: Position) -> Self {
        Self {
            v: 0.0,
            threshold,
            amplitude,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            last_spike: f64::NEG_INFINITY,
            spikes: Vec::new(),
            position,
        }
    }

    pub fn is_excitatory(&self) -> bool {
        self.amplitude > 0.0
    }

    /// Value emitted on the most recent tick
    pub fn last_output(&self) -> f64 {
        self.spikes.last().copied().unwrap_or(0.0)
    }

    pub fn is_refractory(&self, t: Time, params: &LifParams) -> bool {
        t - self.last_spike < params.refractory
    }

    /// Input integrated this tick: zero while refractory
    pub fn effective_input(&self, drive: f64, synaptic: f64, t: Time, params: &LifParams) -> f64 {
        if self.is_refractory(t, params) {
            0.0
        } else {
            drive + synaptic
        }
    }

    /// Advance one Euler step. Returns the value appended to the spike history.
    ///
    /// The spike decision reads the potential before integration; the
    /// `-threshold` term is the only reset.
    pub fn step(&mut self, sigma: f64, t: Time, dt: Time, params: &LifParams) -> f64 {
        let fired = self.v >= self.threshold;
        let internal_spike = if fired { 1.0 } else { 0.0 };

        self.v += (-self.v / params.tau_v + sigma - self.threshold * internal_spike) * dt;
        self.v = self.v.clamp(params.v_min, self.threshold + params.v_ceiling);

        let emitted = if fired {
            self.last_spike = t;
            self.amplitude
        } else {
            0.0
        };
        self.spikes.push(emitted);
        emitted
    }
}

/// All reservoir neurons, advanced in lock-step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuronPopulation {
    pub params: LifParams,
    pub neurons: Vec<Neuron>,
    /// Effective input each neuron integrated on the last tick
    pub last_input: Vec<f64>,
}

impl NeuronPopulation {
    pub fn new(params: LifParams, neurons: Vec<Neuron>) -> Self {
        let n = neurons.len();
        Self {
            params,
            neurons,
            last_input: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn get(&self, id: NeuronId) -> &Neuron {
        &self.neurons[id]
    }

    /// Ticks simulated so far; identical for every neuron
    pub fn history_len(&self) -> usize {
        self.neurons.first().map_or(0, |n| n.spikes.len())
    }

    /// Sum of the current filtered outputs of `neuron`'s incoming synapses
    pub fn synaptic_input(&self, id: NeuronId, synapses: &SynapsePopulation) -> f64 {
        self.neurons[id]
            .incoming
            .iter()
            .map(|&s| synapses.get(s).current)
            .sum()
    }

    /// Advance every neuron one tick. Missing drive entries count as zero.
    ///
    /// Synaptic currents are read from `synapses`, which is not mutated in
    /// this stage, so every neuron sees the previous tick's currents.
    /// Returns the number of neurons that spiked.
    pub fn step(&mut self, drive: &[f64], synapses: &SynapsePopulation, t: Time, dt: Time) -> usize {
        let mut fired = 0;

        for id in 0..self.neurons.len() {
            let synaptic = self.synaptic_input(id, synapses);
            let external = drive.get(id).copied().unwrap_or(0.0);

            let neuron = &mut self.neurons[id];
            let sigma = neuron.effective_input(external, synaptic, t, &self.params);
            self.last_input[id] = sigma;

            if neuron.step(sigma, t, dt, &self.params) != 0.0 {
                fired += 1;
            }
        }

        fired
    }

    pub fn potentials(&self) -> Vec<Voltage> {
        self.neurons.iter().map(|n| n.v).collect()
    }

    pub fn excitatory_count(&self) -> usize {
        self.neurons.iter().filter(|n| n.is_excitatory()).count()
    }
}
