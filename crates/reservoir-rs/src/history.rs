//! Recorded state trajectories.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use liquid_core::{LiquidError, Result};
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::astrocyte::AstrocytePopulation;
use crate::neuron::NeuronPopulation;
use crate::synapse::SynapsePopulation;

/// Three time-series matrices; rows are entities, columns are ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    /// Absolute tick of every column
    pub ticks: Vec<usize>,
    pub potentials: Array2<f64>,
    pub weights: Array2<f64>,
    pub activities: Array2<f64>,
}

impl History {
    pub fn new(n_neurons: usize, n_synapses: usize, n_astrocytes: usize) -> Self {
        Self {
            ticks: Vec::new(),
            potentials: Array2::zeros((n_neurons, 0)),
            weights: Array2::zeros((n_synapses, 0)),
            activities: Array2::zeros((n_astrocytes, 0)),
        }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Column-concatenate a run onto this history.
    pub fn append(&mut self, run: History) -> Result<()> {
        let join = |a: &Array2<f64>, b: &Array2<f64>, name: &str| {
            concatenate(Axis(1), &[a.view(), b.view()]).map_err(|e| {
                LiquidError::Simulation(format!("cannot append {} history: {}", name, e))
            })
        };

        self.potentials = join(&self.potentials, &run.potentials, "potential")?;
        self.weights = join(&self.weights, &run.weights, "weight")?;
        self.activities = join(&self.activities, &run.activities, "activity")?;
        self.ticks.extend(run.ticks);
        Ok(())
    }

    /// Drop every recorded column, keeping the row counts.
    pub fn clear(&mut self) {
        *self = Self::new(
            self.potentials.nrows(),
            self.weights.nrows(),
            self.activities.nrows(),
        );
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

/// Per-run snapshot buffer
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    ticks: Vec<usize>,
    potentials: Vec<f64>,
    weights: Vec<f64>,
    activities: Vec<f64>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        tick: usize,
        neurons: &NeuronPopulation,
        synapses: &SynapsePopulation,
        astrocytes: &AstrocytePopulation,
    ) {
        self.ticks.push(tick);
        self.potentials.extend(neurons.neurons.iter().map(|n| n.v));
        self.weights.extend(synapses.synapses.iter().map(|s| s.weight));
        self.activities.extend(astrocytes.astrocytes.iter().map(|a| a.activity));
    }

    pub fn finish(self, n_neurons: usize, n_synapses: usize, n_astrocytes: usize) -> History {
        let cols = self.ticks.len();
        let to_matrix = |data: &[f64], rows: usize| {
            Array2::from_shape_fn((rows, cols), |(r, c)| data[c * rows + r])
        };

        History {
            potentials: to_matrix(&self.potentials, n_neurons),
            weights: to_matrix(&self.weights, n_synapses),
            activities: to_matrix(&self.activities, n_astrocytes),
            ticks: self.ticks,
        }
    }
}
