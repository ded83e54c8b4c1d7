//! # Liquid Core
//!
//! Shared types and utilities for the astrocyte-modulated liquid reservoir.
//!
//! ## Contents
//!
//! | Module | Role |
//! |--------|------|
//! | (root) | Error taxonomy, scalar aliases, timing parameters |
//! | `grid` | Cubic / hexagonal-prism lattices used to place neurons |
//! | `stimulus` | Per-tick drive generators ("stimulus" and "rest") |
//!
//! ## Design Philosophy
//!
//! 1. Explicit Euler integration in double precision
//! 2. Every construction failure is reported before any state exists
//! 3. Generators are pure functions of the absolute tick

pub mod grid;
pub mod stimulus;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use grid::{generate_grid, grid_for, GridKind};
pub use stimulus::{BernoulliStimulus, Condition, ConstantStimulus, Stimulus, StimulusParams};

/// Common errors
#[derive(Debug, Error)]
pub enum LiquidError {
    #[error("Unknown topology: {0} (expected \"cubic\" or \"hex\")")]
    UnknownTopology(String),

    #[error("Insufficient grid positions: requested {requested}, available {available}")]
    InsufficientPositions { requested: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Dimension mismatch: expected at most {expected} values, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LiquidError>;

/// Time stamp (simulation time units)
pub type Time = f64;

/// Membrane potential (dimensionless units, threshold-relative)
pub type Voltage = f64;

/// Position of a neuron in 3-D space
pub type Position = Point3<f64>;

/// Integration parameters shared by every population
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Euler time step
    pub dt: Time,
    /// Ticks per run
    pub ticks: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            dt: 1.0,
            ticks: 1000,
        }
    }
}

impl SimulationParams {
    /// Time stamp of an absolute (1-based) tick index
    pub fn time_of(&self, tick: usize) -> Time {
        tick as f64 * self.dt
    }
}

/// Summary statistics over a slice of values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Stats {
    /// Returns `None` for an empty slice.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        Some(Self {
            mean: sum / values.len() as f64,
            min,
            max,
        })
    }
}
