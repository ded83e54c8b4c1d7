//! Spatial, cell-type dependent wiring.

use std::fmt;
use std::sync::Arc;

use liquid_core::{LiquidError, Position, Result};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use rand_distr::{Distribution, LogNormal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::filter::SynapticFilter;
use crate::neuron::{LifParams, Neuron, NeuronPopulation};
use crate::synapse::{StdpParams, Synapse, SynapsePopulation};

// ============================================================================
// CONNECTION TYPES
// ============================================================================

/// Pre/post polarity pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    EE,
    EI,
    IE,
    II,
}

impl ConnectionType {
    pub fn of(pre: &Neuron, post: &Neuron) -> Self {
        match (pre.is_excitatory(), post.is_excitatory()) {
            (true, true) => ConnectionType::EE,
            (true, false) => ConnectionType::EI,
            (false, true) => ConnectionType::IE,
            (false, false) => ConnectionType::II,
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionType::EE => "EE",
            ConnectionType::EI => "EI",
            ConnectionType::IE => "IE",
            ConnectionType::II => "II",
        };
        write!(f, "{}", s)
    }
}

/// Distance falloff of the connection probability
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FalloffKernel {
    /// c * exp(-(d/lambda)^2)
    Gaussian { lambda: f64 },
    /// c * exp(-d/lambda)
    Exponential { lambda: f64 },
}

impl FalloffKernel {
    /// Probability in [0, 1], non-increasing in `distance`
    pub fn eval(&self, distance: f64, constant: f64) -> f64 {
        let p = match self {
            Self::Gaussian { lambda } => constant * (-(distance / lambda).powi(2)).exp(),
            Self::Exponential { lambda } => constant * (-distance / lambda).exp(),
        };
        p.clamp(0.0, 1.0)
    }

    fn lambda(&self) -> f64 {
        match self {
            Self::Gaussian { lambda } | Self::Exponential { lambda } => *lambda,
        }
    }
}

/// Per-type base constants and weight initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub ee: f64,
    pub ei: f64,
    pub ie: f64,
    pub ii: f64,
    pub falloff: FalloffKernel,
    /// Quantile at which heavy-tailed initial weights are clipped
    pub weight_clip_quantile: f64,
}

impl Default for ConnectionProfile {
    fn default() -> Self {
        Self {
            ee: 0.2,
            ei: 0.1,
            ie: 0.05,
            ii: 0.3,
            falloff: FalloffKernel::Gaussian { lambda: 2.0 },
            weight_clip_quantile: 0.99,
        }
    }
}

impl ConnectionProfile {
    pub fn constant(&self, ty: ConnectionType) -> f64 {
        match ty {
            ConnectionType::EE => self.ee,
            ConnectionType::EI => self.ei,
            ConnectionType::IE => self.ie,
            ConnectionType::II => self.ii,
        }
    }

    pub fn probability(&self, ty: ConnectionType, distance: f64) -> f64 {
        self.falloff.eval(distance, self.constant(ty))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, c) in [("EE", self.ee), ("EI", self.ei), ("IE", self.ie), ("II", self.ii)] {
            if !(0.0..=1.0).contains(&c) {
                return Err(LiquidError::InvalidParameter(format!(
                    "{} connection constant must lie in [0, 1], got {}",
                    name, c
                )));
            }
        }
        if self.falloff.lambda() <= 0.0 {
            return Err(LiquidError::InvalidParameter(
                "falloff lambda must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.weight_clip_quantile) {
            return Err(LiquidError::InvalidParameter(format!(
                "weight clip quantile must lie in [0, 1], got {}",
                self.weight_clip_quantile
            )));
        }
        Ok(())
    }
}

/// Synapse counts per connection type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityStats {
    pub ee: usize,
    pub ei: usize,
    pub ie: usize,
    pub ii: usize,
}

impl ConnectivityStats {
    pub fn record(&mut self, ty: ConnectionType) {
        match ty {
            ConnectionType::EE => self.ee += 1,
            ConnectionType::EI => self.ei += 1,
            ConnectionType::IE => self.ie += 1,
            ConnectionType::II => self.ii += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ee + self.ei + self.ie + self.ii
    }
}

// ============================================================================
// NEURON PLACEMENT
// ============================================================================

/// Place `n` neurons on distinct positions drawn from `positions`.
///
/// A random `excitatory_fraction` of them gets the excitatory amplitude, the
/// rest the inhibitory one.
pub fn place_neurons<R: Rng>(
    positions: &[Position],
    n: usize,
    excitatory_fraction: f64,
    params: &LifParams,
    rng: &mut R,
) -> Result<Vec<Neuron>> {
    if positions.len() < n {
        return Err(LiquidError::InsufficientPositions {
            requested: n,
            available: positions.len(),
        });
    }

    let chosen = index::sample(rng, positions.len(), n);
    let n_exc = (n as f64 * excitatory_fraction).round() as usize;

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let mut excitatory = vec![false; n];
    for &i in order.iter().take(n_exc) {
        excitatory[i] = true;
    }

    Ok(chosen
        .iter()
        .zip(excitatory)
        .map(|(p, exc)| {
            let amplitude = if exc {
                params.excitatory_amplitude
            } else {
                params.inhibitory_amplitude
            };
            Neuron::new(amplitude, params.threshold, positions[p])
        })
        .collect())
}

// ============================================================================
// SYNAPSE CONSTRUCTION
// ============================================================================

/// Heavy-tailed weights: log-normal samples clipped at `quantile`, shuffled
/// and scaled so the largest equals `max_weight`.
pub fn initial_weights<R: Rng>(count: usize, max_weight: f64, quantile: f64, rng: &mut R) -> Result<Vec<f64>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let dist = LogNormal::new(0.0, 1.0)
        .map_err(|e| LiquidError::InvalidParameter(format!("weight distribution: {}", e)))?;
    let mut samples: Vec<f64> = (0..count).map(|_| dist.sample(rng)).collect();

    let mut sorted = samples.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let ceiling = sorted[((count - 1) as f64 * quantile).floor() as usize];

    for s in samples.iter_mut() {
        *s = s.min(ceiling);
    }
    samples.shuffle(rng);

    let scale = if ceiling > 0.0 { max_weight / ceiling } else { 0.0 };
    Ok(samples.into_iter().map(|s| s * scale).collect())
}

/// Wire every ordered pair of distinct neurons with probability
/// `P(type, distance)` and register each synapse on both endpoints.
pub fn build_synapses<R: Rng>(
    neurons: &mut NeuronPopulation,
    profile: &ConnectionProfile,
    stdp: &StdpParams,
    filter: Arc<SynapticFilter>,
    rng: &mut R,
) -> Result<(SynapsePopulation, ConnectivityStats)> {
    let n = neurons.len();
    let mut pairs = Vec::new();
    let mut stats = ConnectivityStats::default();

    for pre in 0..n {
        for post in 0..n {
            if pre == post {
                continue;
            }
            let a = &neurons.neurons[pre];
            let b = &neurons.neurons[post];
            let ty = ConnectionType::of(a, b);
            let distance = nalgebra::distance(&a.position, &b.position);

            if rng.gen::<f64>() < profile.probability(ty, distance) {
                pairs.push((pre, post));
                stats.record(ty);
            }
        }
    }

    let cap = stdp.weight_cap;
    let weights = initial_weights(pairs.len(), cap.hi, profile.weight_clip_quantile, rng)?;

    let mut synapses = SynapsePopulation::new(stdp.clone());
    for ((pre, post), w) in pairs.into_iter().zip(weights) {
        let id = synapses.push(Synapse::new(pre, post, w, cap, filter.clone()));
        neurons.neurons[pre].outgoing.push(id);
        neurons.neurons[post].incoming.push(id);
    }

    debug!(
        target: "liquid-reservoir",
        "wired {} synapses (EE {}, EI {}, IE {}, II {})",
        stats.total(), stats.ee, stats.ei, stats.ie, stats.ii
    );

    Ok((synapses, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use liquid_core::{grid_for, GridKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lattice_population(n: usize, seed: u64) -> NeuronPopulation {
        let mut rng = StdRng::seed_from_u64(seed);
        let positions = grid_for(GridKind::Cubic, n, 1.0).unwrap();
        let params = LifParams::default();
        let neurons = place_neurons(&positions, n, 0.8, &params, &mut rng).unwrap();
        NeuronPopulation::new(params, neurons)
    }

    #[test]
    fn test_falloff_monotone() {
        for kernel in [
            FalloffKernel::Gaussian { lambda: 2.0 },
            FalloffKernel::Exponential { lambda: 2.0 },
        ] {
            let mut prev = kernel.eval(0.0, 0.3);
            assert!((prev - 0.3).abs() < 1e-12);
            for step in 1..50 {
                let p = kernel.eval(step as f64 * 0.25, 0.3);
                assert!(p <= prev);
                prev = p;
            }
        }
    }

    #[test]
    fn test_connection_type_constants() {
        let profile = ConnectionProfile::default();
        assert_eq!(profile.probability(ConnectionType::EE, 0.0), 0.2);
        assert_eq!(profile.probability(ConnectionType::EI, 0.0), 0.1);
        assert_eq!(profile.probability(ConnectionType::IE, 0.0), 0.05);
        assert_eq!(profile.probability(ConnectionType::II, 0.0), 0.3);
    }

    #[test]
    fn test_place_neurons_polarity() {
        let pop = lattice_population(50, 7);
        assert_eq!(pop.len(), 50);
        assert_eq!(pop.excitatory_count(), 40);

        for (i, a) in pop.neurons.iter().enumerate() {
            for b in pop.neurons.iter().skip(i + 1) {
                assert!(nalgebra::distance(&a.position, &b.position) > 1e-9);
            }
        }
    }

    #[test]
    fn test_insufficient_positions() {
        let mut rng = StdRng::seed_from_u64(0);
        let positions = vec![Position::origin(); 3];
        let err = place_neurons(&positions, 4, 0.8, &LifParams::default(), &mut rng);
        assert!(matches!(
            err,
            Err(LiquidError::InsufficientPositions { requested: 4, available: 3 })
        ));
    }

    #[test]
    fn test_build_synapses_registers_endpoints() {
        let mut neurons = lattice_population(64, 11);
        let mut rng = StdRng::seed_from_u64(11);
        let filter = Arc::new(SynapticFilter::alpha(2.0, 10));
        let stdp = StdpParams::default();

        let (synapses, stats) =
            build_synapses(&mut neurons, &ConnectionProfile::default(), &stdp, filter, &mut rng).unwrap();

        assert!(!synapses.is_empty());
        assert_eq!(stats.total(), synapses.len());

        for (id, syn) in synapses.synapses.iter().enumerate() {
            assert_ne!(syn.pre, syn.post);
            assert!(neurons.get(syn.pre).outgoing.contains(&id));
            assert!(neurons.get(syn.post).incoming.contains(&id));
            assert!(stdp.weight_cap.contains(syn.weight));

            let ty = ConnectionType::of(neurons.get(syn.pre), neurons.get(syn.post));
            assert!(ConnectionProfile::default().constant(ty) > 0.0);
        }

        let out_total: usize = neurons.neurons.iter().map(|n| n.outgoing.len()).sum();
        assert_eq!(out_total, synapses.len());
    }

    #[test]
    fn test_build_is_deterministic() {
        let build = || {
            let mut neurons = lattice_population(27, 5);
            let mut rng = StdRng::seed_from_u64(5);
            let filter = Arc::new(SynapticFilter::alpha(2.0, 10));
            let (synapses, _) = build_synapses(
                &mut neurons,
                &ConnectionProfile::default(),
                &StdpParams::default(),
                filter,
                &mut rng,
            )
            .unwrap();
            synapses
                .synapses
                .iter()
                .map(|s| (s.pre, s.post, s.weight))
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_initial_weights_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let weights = initial_weights(500, 2.0, 0.99, &mut rng).unwrap();
        assert_eq!(weights.len(), 500);
        assert!(weights.iter().all(|&w| (0.0..=2.0 + 1e-12).contains(&w)));

        let at_cap = weights.iter().filter(|&&w| (w - 2.0).abs() < 1e-9).count();
        assert!(at_cap >= 5);

        assert!(initial_weights(0, 2.0, 0.99, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_built_connection_frequency_falls_with_distance() {
        // equal constants so only distance separates the bins
        let profile = ConnectionProfile {
            ee: 1.0,
            ei: 1.0,
            ie: 1.0,
            ii: 1.0,
            ..Default::default()
        };
        let mut neurons = lattice_population(216, 99);
        let mut rng = StdRng::seed_from_u64(99);
        let filter = Arc::new(SynapticFilter::alpha(2.0, 10));
        let (synapses, _) =
            build_synapses(&mut neurons, &profile, &StdpParams::default(), filter, &mut rng).unwrap();

        let bin = |pre: usize, post: usize| {
            let d = nalgebra::distance(&neurons.get(pre).position, &neurons.get(post).position);
            d.floor() as usize
        };

        let mut pairs = [0usize; 5];
        let mut built = [0usize; 5];
        for pre in 0..neurons.len() {
            for post in 0..neurons.len() {
                let b = bin(pre, post);
                if pre != post && b < 5 {
                    pairs[b] += 1;
                }
            }
        }
        for syn in &synapses.synapses {
            let b = bin(syn.pre, syn.post);
            if b < 5 {
                built[b] += 1;
            }
        }

        // unit lattice spacing leaves bin 0 empty
        assert_eq!(pairs[0], 0);
        let freqs: Vec<f64> = (1..5).map(|b| built[b] as f64 / pairs[b] as f64).collect();
        for w in freqs.windows(2) {
            assert!(w[1] < w[0], "{:?}", freqs);
        }
        assert!(freqs[0] > 0.4);
    }
}
