//! Astrocyte population: leaky integration of liquid vs. input activity.
//!
//! Each astrocyte watches a fixed random subset of synapses. Per tick it
//! compares how much the presynaptic neurons of those synapses spiked
//! (`liquid_rate`) with how often the same neurons received external drive
//! (`input_rate`), both averaged over the trailing window:
//!
//! ```text
//! dA/dt = (-A * decay + gain * (liquid_rate - input_rate) + bias) / tau
//! ```
//!
//! The activity is unbounded and feeds back as the synapses' LTD coefficient.

use std::collections::VecDeque;

use liquid_core::{LiquidError, Result, Stats, Time};
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::neuron::NeuronPopulation;
use crate::synapse::{SynapseId, SynapsePopulation};

/// Index of an astrocyte in the population arena
pub type AstrocyteId = usize;

/// LIM parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstrocyteParams {
    pub tau: f64,              // Time constant
    pub gain: f64,             // Weight on liquid_rate - input_rate
    pub bias: f64,             // Constant drive
    pub decay: f64,            // Leak gain
    pub initial_activity: f64,
}

impl Default for AstrocyteParams {
    fn default() -> Self {
        Self {
            tau: 10.0,
            gain: 0.01,
            bias: 0.15,
            decay: 1.0,
            initial_activity: 0.15,
        }
    }
}

impl AstrocyteParams {
    pub fn validate(&self) -> Result<()> {
        if self.tau <= 0.0 {
            return Err(LiquidError::InvalidParameter(format!(
                "astrocyte tau must be positive, got {}",
                self.tau
            )));
        }
        Ok(())
    }
}

/// Windowed rates seen by one astrocyte
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    pub input: f64,
    pub liquid: f64,
}

/// Single regulatory unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Astrocyte {
    pub activity: f64,
    pub tau: f64,
    pub gain: f64,
    pub bias: f64,
    pub decay: f64,
    pub synapses: Vec<SynapseId>,
}

impl Astrocyte {
    pub fn new(params: &AstrocyteParams, synapses: Vec<SynapseId>) -> Self {
        Self {
            activity: params.initial_activity,
            tau: params.tau,
            gain: params.gain,
            bias: params.bias,
            decay: params.decay,
            synapses,
        }
    }

    /// Window-normalized rates over the linked synapses' presynaptic neurons.
    ///
    /// `drive_window` holds the most recent drive vectors, newest last, and is
    /// aligned with the tail of every neuron's spike history. A drive entry
    /// counts once when nonzero; a spike counts its absolute amplitude.
    pub fn rates(
        &self,
        drive_window: &VecDeque<Vec<f64>>,
        neurons: &NeuronPopulation,
        synapses: &SynapsePopulation,
    ) -> Rates {
        let history = neurons.history_len();
        let width = drive_window.len().min(history);
        if width == 0 || self.synapses.is_empty() {
            return Rates { input: 0.0, liquid: 0.0 };
        }

        let skip = drive_window.len() - width;
        let first_tick = history - width;
        let mut input = 0.0;
        let mut liquid = 0.0;

        for (offset, drive) in drive_window.iter().skip(skip).enumerate() {
            for &s in &self.synapses {
                let pre = synapses.get(s).pre;
                if drive.get(pre).map_or(false, |&v| v != 0.0) {
                    input += 1.0;
                }
                liquid += neurons.get(pre).spikes[first_tick + offset].abs();
            }
        }

        Rates {
            input: input / width as f64,
            liquid: liquid / width as f64,
        }
    }

    pub fn derivative(&self, rates: Rates) -> f64 {
        (-self.activity * self.decay + self.gain * (rates.liquid - rates.input) + self.bias)
            / self.tau
    }

    pub fn step(&mut self, rates: Rates, dt: Time) {
        self.activity += self.derivative(rates) * dt;
    }
}

/// All astrocytes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstrocytePopulation {
    pub params: AstrocyteParams,
    pub astrocytes: Vec<Astrocyte>,
}

impl AstrocytePopulation {
    /// Create `n` astrocytes, each linked to a random subset of `per_astrocyte`
    /// synapses, and register the back-references on the synapses.
    pub fn linked<R: Rng>(
        params: AstrocyteParams,
        n: usize,
        per_astrocyte: usize,
        synapses: &mut SynapsePopulation,
        rng: &mut R,
    ) -> Self {
        let amount = per_astrocyte.min(synapses.len());
        let mut astrocytes = Vec::with_capacity(n);

        for id in 0..n {
            let mut picked: Vec<SynapseId> = index::sample(rng, synapses.len(), amount).into_vec();
            picked.sort_unstable();

            for &s in &picked {
                synapses.synapses[s].astrocytes.push(id);
            }
            astrocytes.push(Astrocyte::new(&params, picked));
        }

        Self { params, astrocytes }
    }

    pub fn len(&self) -> usize {
        self.astrocytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.astrocytes.is_empty()
    }

    /// Advance every astrocyte one tick.
    ///
    /// Rates are computed for all units before any activity changes.
    pub fn step(
        &mut self,
        drive_window: &VecDeque<Vec<f64>>,
        neurons: &NeuronPopulation,
        synapses: &SynapsePopulation,
        dt: Time,
    ) {
        let rates: Vec<Rates> = self
            .astrocytes
            .iter()
            .map(|a| a.rates(drive_window, neurons, synapses))
            .collect();

        for (astro, r) in self.astrocytes.iter_mut().zip(rates) {
            astro.step(r, dt);
        }
    }

    pub fn activities(&self) -> Vec<f64> {
        self.astrocytes.iter().map(|a| a.activity).collect()
    }

    pub fn stats(&self) -> Option<Stats> {
        Stats::of(&self.activities())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SynapticFilter;
    use crate::neuron::{LifParams, Neuron};
    use crate::synapse::{StdpParams, Synapse, WeightCap};
    use liquid_core::Position;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn chain(n: usize) -> (NeuronPopulation, SynapsePopulation) {
        let neurons = (0..n)
            .map(|i| Neuron::new(1.0, 20.0, Position::new(i as f64, 0.0, 0.0)))
            .collect();
        let neurons = NeuronPopulation::new(LifParams::default(), neurons);

        let filter = Arc::new(SynapticFilter::alpha(2.0, 5));
        let mut synapses = SynapsePopulation::new(StdpParams::default());
        for i in 0..n - 1 {
            synapses.push(Synapse::new(i, i + 1, 1.0, WeightCap::default(), filter.clone()));
        }
        (neurons, synapses)
    }

    #[test]
    fn test_linking_is_bidirectional() {
        let (_, mut synapses) = chain(10);
        let mut rng = StdRng::seed_from_u64(3);
        let astros = AstrocytePopulation::linked(AstrocyteParams::default(), 4, 3, &mut synapses, &mut rng);

        assert_eq!(astros.len(), 4);
        for (id, astro) in astros.astrocytes.iter().enumerate() {
            assert_eq!(astro.synapses.len(), 3);
            for &s in &astro.synapses {
                assert!(synapses.get(s).astrocytes.contains(&id));
            }
        }
    }

    #[test]
    fn test_link_count_capped_by_synapses() {
        let (_, mut synapses) = chain(3);
        let mut rng = StdRng::seed_from_u64(3);
        let astros = AstrocytePopulation::linked(AstrocyteParams::default(), 1, 10, &mut synapses, &mut rng);
        assert_eq!(astros.astrocytes[0].synapses.len(), 2);
    }

    #[test]
    fn test_rates_normalized_by_window() {
        let (mut neurons, synapses) = chain(3);
        for n in neurons.neurons.iter_mut() {
            n.spikes = vec![1.0, 0.0, 1.0, 1.0];
        }

        let astro = Astrocyte::new(&AstrocyteParams::default(), vec![0, 1]);

        // window of 2: last two ticks, both pre neurons spike on both
        let window: VecDeque<Vec<f64>> = vec![vec![5.0, 0.0, 0.0], vec![5.0, 5.0, 0.0]].into();
        let rates = astro.rates(&window, &neurons, &synapses);
        assert!((rates.liquid - 2.0).abs() < 1e-12);
        assert!((rates.input - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_window_clipped_at_start() {
        let (mut neurons, synapses) = chain(2);
        for n in neurons.neurons.iter_mut() {
            n.spikes = vec![-1.0];
        }
        let astro = Astrocyte::new(&AstrocyteParams::default(), vec![0]);

        let window: VecDeque<Vec<f64>> = vec![vec![0.0], vec![0.0], vec![0.0]].into();
        let rates = astro.rates(&window, &neurons, &synapses);
        assert_eq!(rates.liquid, 1.0);
        assert_eq!(rates.input, 0.0);
    }

    #[test]
    fn test_activity_rises_when_liquid_exceeds_input() {
        let params = AstrocyteParams {
            bias: 0.0,
            decay: 0.0,
            initial_activity: 0.0,
            ..Default::default()
        };
        let mut astro = Astrocyte::new(&params, vec![0]);

        let mut prev = astro.activity;
        for _ in 0..20 {
            astro.step(Rates { input: 0.0, liquid: 1.0 }, 1.0);
            assert!(astro.activity > prev);
            prev = astro.activity;
        }

        astro.step(Rates { input: 2.0, liquid: 0.0 }, 1.0);
        assert!(astro.activity < prev);
    }

    #[test]
    fn test_steady_state_at_bias_over_decay() {
        let params = AstrocyteParams::default();
        let mut astro = Astrocyte::new(&params, vec![]);
        for _ in 0..500 {
            astro.step(Rates { input: 0.0, liquid: 0.0 }, 1.0);
        }
        assert!((astro.activity - params.bias / params.decay).abs() < 1e-9);
    }
}
