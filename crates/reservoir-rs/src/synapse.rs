//! Plastic synapses: conduction filtering plus astrocyte-modulated STDP.

use std::collections::VecDeque;
use std::sync::Arc;

use liquid_core::{LiquidError, Result, Time};
use serde::{Deserialize, Serialize};

use crate::astrocyte::AstrocyteId;
use crate::filter::SynapticFilter;
use crate::neuron::{Neuron, NeuronId, NeuronPopulation};

/// Index of a synapse in the population arena
pub type SynapseId = usize;

/// Inclusive weight bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightCap {
    pub lo: f64,
    pub hi: f64,
}

impl Default for WeightCap {
    fn default() -> Self {
        Self { lo: 0.0, hi: 2.0 }
    }
}

impl WeightCap {
    pub fn clamp(&self, w: f64) -> f64 {
        w.clamp(self.lo, self.hi)
    }

    pub fn contains(&self, w: f64) -> bool {
        w >= self.lo && w <= self.hi
    }
}

/// Spike-timing-dependent plasticity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StdpParams {
    pub tau_plus: f64,           // Presynaptic trace time constant
    pub tau_minus: f64,          // Postsynaptic trace time constant
    pub a_plus: f64,             // Presynaptic trace increment
    pub a_minus: f64,            // Postsynaptic trace increment
    pub potentiation: f64,       // LTP coefficient (A+)
    pub default_depression: f64, // LTD coefficient (A-) without linked astrocytes
    pub weight_cap: WeightCap,
    pub spike_window: usize,     // Presynaptic history seen by the filter
}

impl Default for StdpParams {
    fn default() -> Self {
        Self {
            tau_plus: 10.0,
            tau_minus: 10.0,
            a_plus: 0.1,
            a_minus: 0.1,
            potentiation: 0.15,
            default_depression: 0.15,
            weight_cap: WeightCap::default(),
            spike_window: 100,
        }
    }
}

impl StdpParams {
    pub fn validate(&self) -> Result<()> {
        if self.tau_plus <= 0.0 || self.tau_minus <= 0.0 {
            return Err(LiquidError::InvalidParameter(
                "STDP time constants must be positive".into(),
            ));
        }
        if self.weight_cap.lo > self.weight_cap.hi {
            return Err(LiquidError::InvalidParameter(format!(
                "weight cap is inverted: [{}, {}]",
                self.weight_cap.lo, self.weight_cap.hi
            )));
        }
        if self.spike_window == 0 {
            return Err(LiquidError::InvalidParameter(
                "spike window must hold at least one tick".into(),
            ));
        }
        Ok(())
    }
}

/// Directed synapse between two neurons
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synapse {
    pub pre: NeuronId,
    pub post: NeuronId,
    pub weight: f64,
    pub cap: WeightCap,
    pub trace_pre: f64,
    pub trace_post: f64,
    /// Weighted filter output delivered to `post` on the next tick
    pub current: f64,
    pub filter: Arc<SynapticFilter>,
    /// Recent unweighted filter outputs, newest last
    pub outputs: VecDeque<f64>,
    pub astrocytes: Vec<AstrocyteId>,
}

impl Synapse {
    pub fn new(
        pre: NeuronId,
        post: NeuronId,
        weight: f64,
        cap: WeightCap,
        filter: Arc<SynapticFilter>,
    ) -> Self {
        Self {
            pre,
            post,
            weight: cap.clamp(weight),
            cap,
            trace_pre: 0.0,
            trace_post: 0.0,
            current: 0.0,
            filter,
            outputs: VecDeque::new(),
            astrocytes: Vec::new(),
        }
    }

    /// Convolve the kernel with the trailing presynaptic window.
    pub fn filter_current(&mut self, pre: &Neuron, window: usize) {
        let start = pre.spikes.len().saturating_sub(window);
        let sample = self.filter.response(&pre.spikes[start..]);

        self.current = self.weight * sample;

        self.outputs.push_back(sample);
        while self.outputs.len() > window {
            self.outputs.pop_front();
        }
    }

    /// Leaky traces plus pair-based weight update for the current tick.
    ///
    /// Potentiation and depression may both apply; the clamp runs last.
    pub fn plasticity(
        &mut self,
        pre_spike: f64,
        post_spike: f64,
        depression: f64,
        dt: Time,
        params: &StdpParams,
    ) {
        let pre_mag = pre_spike.abs();
        let post_mag = post_spike.abs();

        self.trace_pre += (-self.trace_pre + params.a_plus * pre_mag) * dt / params.tau_plus;
        self.trace_post += (-self.trace_post + params.a_minus * post_mag) * dt / params.tau_minus;

        if post_spike != 0.0 {
            self.weight += params.potentiation * self.trace_pre * post_mag * dt;
        }
        if pre_spike != 0.0 {
            self.weight -= depression * self.trace_post * pre_mag * dt;
        }

        self.weight = self.cap.clamp(self.weight);
    }
}

/// All reservoir synapses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynapsePopulation {
    pub params: StdpParams,
    pub synapses: Vec<Synapse>,
}

impl SynapsePopulation {
    pub fn new(params: StdpParams) -> Self {
        Self {
            params,
            synapses: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.synapses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synapses.is_empty()
    }

    pub fn get(&self, id: SynapseId) -> &Synapse {
        &self.synapses[id]
    }

    pub fn push(&mut self, synapse: Synapse) -> SynapseId {
        self.synapses.push(synapse);
        self.synapses.len() - 1
    }

    /// LTD coefficient: mean linked astrocyte activity, or the default.
    pub fn depression(&self, id: SynapseId, astro_activity: &[f64]) -> f64 {
        let linked = &self.synapses[id].astrocytes;
        if linked.is_empty() {
            return self.params.default_depression;
        }
        linked.iter().map(|&a| astro_activity[a]).sum::<f64>() / linked.len() as f64
    }

    /// Advance every synapse one tick.
    ///
    /// Reads this tick's spike trains from `neurons` and the previous tick's
    /// astrocyte activity; neither is mutated here.
    pub fn step(&mut self, neurons: &NeuronPopulation, astro_activity: &[f64], dt: Time) {
        for id in 0..self.synapses.len() {
            let depression = self.depression(id, astro_activity);

            let params = &self.params;
            let syn = &mut self.synapses[id];
            let pre = neurons.get(syn.pre);
            let post = neurons.get(syn.post);

            syn.filter_current(pre, params.spike_window);
            syn.plasticity(pre.last_output(), post.last_output(), depression, dt, params);
        }
    }

    pub fn weights(&self) -> Vec<f64> {
        self.synapses.iter().map(|s| s.weight).collect()
    }
}
