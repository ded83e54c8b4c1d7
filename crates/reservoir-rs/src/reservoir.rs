//! Reservoir orchestrator: owns the three populations and global time.

use std::collections::VecDeque;
use std::sync::Arc;

use liquid_core::{
    grid_for, BernoulliStimulus, Condition, LiquidError, Result, Stats, Stimulus,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::astrocyte::AstrocytePopulation;
use crate::config::ReservoirConfig;
use crate::connectivity::{build_synapses, place_neurons, ConnectivityStats};
use crate::history::{History, Recorder};
use crate::neuron::NeuronPopulation;
use crate::synapse::SynapsePopulation;

/// Outcome of one call to a run method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub first_tick: usize,
    pub last_tick: usize,
    pub spikes: usize,
    /// Spikes per neuron per tick
    pub mean_rate: f64,
    pub astrocytes: Option<Stats>,
}

impl RunSummary {
    pub fn ticks(&self) -> usize {
        if self.last_tick < self.first_tick {
            0
        } else {
            self.last_tick - self.first_tick + 1
        }
    }
}

/// Astrocyte-modulated liquid reservoir
#[derive(Debug)]
pub struct Reservoir {
    pub config: ReservoirConfig,
    pub neurons: NeuronPopulation,
    pub synapses: SynapsePopulation,
    pub astrocytes: AstrocytePopulation,
    /// Trailing drive vectors seen by the astrocytes, newest last
    drive_window: VecDeque<Vec<f64>>,
    stimulus: Box<dyn Stimulus>,
    rest: Box<dyn Stimulus>,
    history: History,
    connectivity: ConnectivityStats,
}

impl Reservoir {
    /// Build with Bernoulli generators taken from the configuration.
    pub fn from_config(config: ReservoirConfig) -> Result<Self> {
        let stimulus = BernoulliStimulus::new(config.n_inputs, &config.stimulus);
        let rest = BernoulliStimulus::new(config.n_inputs, &config.rest);
        Self::new(config, Box::new(stimulus), Box::new(rest))
    }

    /// Build neurons, synapses and astrocytes from `config`.
    ///
    /// Fails before any state exists on an unknown topology, too few grid
    /// positions or otherwise invalid parameters.
    pub fn new(
        config: ReservoirConfig,
        stimulus: Box<dyn Stimulus>,
        rest: Box<dyn Stimulus>,
    ) -> Result<Self> {
        config.validate()?;
        let kind = config.grid_kind()?;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let positions = grid_for(kind, config.n_neurons, config.grid_spacing)?;
        let placed = place_neurons(
            &positions,
            config.n_neurons,
            config.excitatory_fraction,
            &config.lif,
            &mut rng,
        )?;
        let mut neurons = NeuronPopulation::new(config.lif.clone(), placed);

        let filter = Arc::new(config.filter.build()?);
        let (mut synapses, connectivity) =
            build_synapses(&mut neurons, &config.connections, &config.stdp, filter, &mut rng)?;

        let astrocytes = AstrocytePopulation::linked(
            config.astrocyte.clone(),
            config.n_astrocytes,
            config.synapses_per_astrocyte,
            &mut synapses,
            &mut rng,
        );

        info!(
            target: "liquid-reservoir",
            "built {} reservoir: {} neurons ({} excitatory), {} synapses, {} astrocytes",
            kind,
            neurons.len(),
            neurons.excitatory_count(),
            synapses.len(),
            astrocytes.len()
        );

        let history = History::new(neurons.len(), synapses.len(), astrocytes.len());

        Ok(Self {
            config,
            neurons,
            synapses,
            astrocytes,
            drive_window: VecDeque::new(),
            stimulus,
            rest,
            history,
            connectivity,
        })
    }

    /// Ticks simulated so far
    pub fn global_time(&self) -> usize {
        self.neurons.history_len()
    }

    /// Absolute index of the next tick (1-based)
    pub fn next_tick(&self) -> usize {
        self.global_time() + 1
    }

    pub fn generator(&self, condition: Condition) -> &dyn Stimulus {
        match condition {
            Condition::Stimulus => self.stimulus.as_ref(),
            Condition::Rest => self.rest.as_ref(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Clear recorded history; live state is untouched.
    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    pub fn connectivity(&self) -> ConnectivityStats {
        self.connectivity
    }

    pub fn astrocyte_stats(&self) -> Option<Stats> {
        self.astrocytes.stats()
    }

    /// Advance one lock-step tick: neurons, then synapses, then astrocytes.
    ///
    /// Short drive vectors are zero padded; a vector with more channels than
    /// `n_inputs` is rejected before any state changes. Returns the number of
    /// neurons that spiked.
    pub fn tick(&mut self, drive: &[f64]) -> Result<usize> {
        let n = self.neurons.len();
        if drive.len() > self.config.n_inputs {
            return Err(LiquidError::DimensionMismatch {
                expected: self.config.n_inputs,
                got: drive.len(),
            });
        }
        if drive.len() < self.config.n_inputs {
            warn!(
                target: "liquid-reservoir",
                "drive has {} channels, expected {}; padding with zeros",
                drive.len(),
                self.config.n_inputs
            );
        }

        let mut padded = drive.to_vec();
        padded.resize(n, 0.0);

        let tick = self.next_tick();
        let dt = self.config.simulation.dt;
        let t = self.config.simulation.time_of(tick);

        let spikes = self.neurons.step(&padded, &self.synapses, t, dt);

        let activity = self.astrocytes.activities();
        self.synapses.step(&self.neurons, &activity, dt);

        self.drive_window.push_back(padded);
        while self.drive_window.len() > self.config.astro_t_avg {
            self.drive_window.pop_front();
        }
        self.astrocytes
            .step(&self.drive_window, &self.neurons, &self.synapses, dt);

        debug!(target: "liquid-reservoir", "tick {}: {} spikes", tick, spikes);
        Ok(spikes)
    }

    /// Run `config.simulation.ticks` ticks under `condition`.
    pub fn run(&mut self, condition: Condition, record: bool) -> Result<RunSummary> {
        self.run_for(condition, self.config.simulation.ticks, record)
    }

    pub fn run_for(&mut self, condition: Condition, ticks: usize, record: bool) -> Result<RunSummary> {
        info!(
            target: "liquid-reservoir",
            "running {} ticks of {} from tick {}",
            ticks,
            condition,
            self.next_tick()
        );
        self.run_driven(ticks, record, |r, t| r.generator(condition).drive(t))
    }

    /// Run with an arbitrary generator evaluated at absolute ticks.
    pub fn run_with(&mut self, stimulus: &dyn Stimulus, ticks: usize, record: bool) -> Result<RunSummary> {
        self.run_driven(ticks, record, |_, t| stimulus.drive(t))
    }

    fn run_driven<F>(&mut self, ticks: usize, record: bool, mut drive: F) -> Result<RunSummary>
    where
        F: FnMut(&Self, usize) -> Vec<f64>,
    {
        let first_tick = self.next_tick();
        let mut recorder = if record { Some(Recorder::new()) } else { None };
        let mut spikes = 0;

        for _ in 0..ticks {
            let tick = self.next_tick();
            let input = drive(self, tick);
            spikes += self.tick(&input)?;

            if let Some(rec) = recorder.as_mut() {
                rec.record(tick, &self.neurons, &self.synapses, &self.astrocytes);
            }

            if self.config.log_every > 0 && tick % self.config.log_every == 0 {
                match self.astrocytes.stats() {
                    Some(s) => info!(
                        target: "liquid-reservoir",
                        "tick {}: astrocyte activity mean {:.4} min {:.4} max {:.4}, {} spikes so far",
                        tick, s.mean, s.min, s.max, spikes
                    ),
                    None => info!(target: "liquid-reservoir", "tick {}: {} spikes so far", tick, spikes),
                }
            }
        }

        if let Some(rec) = recorder {
            let run = rec.finish(self.neurons.len(), self.synapses.len(), self.astrocytes.len());
            self.history.append(run)?;
        }

        let denominator = (self.neurons.len() * ticks) as f64;
        let summary = RunSummary {
            first_tick,
            last_tick: first_tick + ticks - 1,
            spikes,
            mean_rate: if denominator > 0.0 { spikes as f64 / denominator } else { 0.0 },
            astrocytes: self.astrocytes.stats(),
        };

        info!(
            target: "liquid-reservoir",
            "finished ticks {}..={}: {} spikes, rate {:.4}",
            summary.first_tick,
            summary.last_tick,
            summary.spikes,
            summary.mean_rate
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liquid_core::ConstantStimulus;

    fn small_config() -> ReservoirConfig {
        let mut config = ReservoirConfig {
            n_inputs: 8,
            n_neurons: 27,
            topology: "cubic".into(),
            n_astrocytes: 3,
            synapses_per_astrocyte: 5,
            astro_t_avg: 4,
            log_every: 0,
            ..Default::default()
        };
        config.simulation.ticks = 20;
        config
    }

    #[test]
    fn test_unknown_topology_fails() {
        let config = ReservoirConfig {
            topology: "mobius".into(),
            ..small_config()
        };
        let err = Reservoir::from_config(config).unwrap_err();
        assert!(matches!(err, LiquidError::UnknownTopology(_)));
    }

    #[test]
    fn test_run_advances_global_time() {
        let mut reservoir = Reservoir::from_config(small_config()).unwrap();
        assert_eq!(reservoir.global_time(), 0);

        let summary = reservoir.run(Condition::Stimulus, false).unwrap();
        assert_eq!(summary.first_tick, 1);
        assert_eq!(summary.last_tick, 20);
        assert_eq!(summary.ticks(), 20);
        assert_eq!(reservoir.global_time(), 20);

        let summary = reservoir.run_for(Condition::Rest, 5, false).unwrap();
        assert_eq!(summary.first_tick, 21);
        assert_eq!(reservoir.global_time(), 25);
        assert!(reservoir.neurons.neurons.iter().all(|n| n.spikes.len() == 25));
        assert!(reservoir.history().is_empty());
    }

    #[test]
    fn test_record_appends_history() {
        let mut reservoir = Reservoir::from_config(small_config()).unwrap();

        reservoir.run_for(Condition::Stimulus, 6, true).unwrap();
        reservoir.run_for(Condition::Rest, 3, false).unwrap();
        reservoir.run_for(Condition::Rest, 4, true).unwrap();

        let history = reservoir.history();
        assert_eq!(history.len(), 10);
        assert_eq!(history.ticks[5], 6);
        assert_eq!(history.ticks[6], 10);
        assert_eq!(history.potentials.nrows(), 27);
        assert_eq!(history.weights.nrows(), reservoir.synapses.len());
        assert_eq!(history.activities.nrows(), 3);

        let last = history.potentials.column(9);
        for (i, n) in reservoir.neurons.neurons.iter().enumerate() {
            assert_eq!(last[i], n.v);
        }

        reservoir.reset_history();
        assert!(reservoir.history().is_empty());
        assert_eq!(reservoir.global_time(), 13);
    }

    #[test]
    fn test_long_drive_rejected_without_mutation() {
        let mut reservoir = Reservoir::from_config(small_config()).unwrap();
        let before = reservoir.neurons.potentials();

        let err = reservoir.tick(&vec![1.0; 28]).unwrap_err();
        assert!(matches!(err, LiquidError::DimensionMismatch { expected: 8, got: 28 }));
        assert_eq!(reservoir.global_time(), 0);
        assert_eq!(reservoir.neurons.potentials(), before);
    }

    #[test]
    fn test_drive_wider_than_inputs_rejected() {
        let mut reservoir = Reservoir::from_config(small_config()).unwrap();
        let before = reservoir.neurons.potentials();

        // fits the population but not the input layer
        let err = reservoir.tick(&vec![1.0; 9]).unwrap_err();
        assert!(matches!(err, LiquidError::DimensionMismatch { expected: 8, got: 9 }));
        assert_eq!(reservoir.global_time(), 0);
        assert_eq!(reservoir.neurons.potentials(), before);

        reservoir.tick(&vec![1.0; 8]).unwrap();
        assert_eq!(reservoir.global_time(), 1);
    }

    #[test]
    fn test_short_drive_padded() {
        let mut reservoir = Reservoir::from_config(small_config()).unwrap();
        reservoir.tick(&[3.0]).unwrap();

        assert_eq!(reservoir.neurons.neurons[0].v, 3.0);
        assert!(reservoir.neurons.neurons[1..].iter().all(|n| n.v == 0.0));
    }

    #[test]
    fn test_run_with_constant_drive() {
        let mut reservoir = Reservoir::from_config(small_config()).unwrap();
        let drive = ConstantStimulus::uniform(8, 25.0);

        let summary = reservoir.run_with(&drive, 10, false).unwrap();
        assert!(summary.spikes > 0);
        assert!(summary.mean_rate > 0.0 && summary.mean_rate <= 1.0);
    }

    #[test]
    fn test_drive_window_bounded() {
        let mut reservoir = Reservoir::from_config(small_config()).unwrap();
        reservoir.run_for(Condition::Stimulus, 10, false).unwrap();
        assert_eq!(reservoir.drive_window.len(), 4);
    }
}
