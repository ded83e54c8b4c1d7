//! Drive generators.
//!
//! A generator maps an absolute tick index to one drive value per input
//! channel. Evaluating the same tick twice yields the same vector, which is
//! what lets a resumed run reproduce a single long run.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{LiquidError, Result};

/// Per-tick drive source
pub trait Stimulus: fmt::Debug {
    /// Number of input channels
    fn channels(&self) -> usize;

    /// Drive vector for absolute tick `t`
    fn drive(&self, t: usize) -> Vec<f64>;
}

/// Which of the reservoir's two named generators to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// High-drive condition
    Stimulus,
    /// Low-drive condition
    Rest,
}

impl FromStr for Condition {
    type Err = LiquidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stimulus" | "stim" => Ok(Condition::Stimulus),
            "rest" => Ok(Condition::Rest),
            other => Err(LiquidError::InvalidParameter(format!(
                "unknown condition: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Stimulus => write!(f, "stimulus"),
            Condition::Rest => write!(f, "rest"),
        }
    }
}

/// Bernoulli generator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StimulusParams {
    /// Per-channel activation probability per tick
    pub probability: f64,
    /// Drive value of an active channel
    pub amplitude: f64,
    pub seed: u64,
}

impl StimulusParams {
    pub fn stimulus() -> Self {
        Self {
            probability: 0.3,
            amplitude: 25.0,
            seed: 1,
        }
    }

    pub fn rest() -> Self {
        Self {
            probability: 0.05,
            amplitude: 25.0,
            seed: 2,
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(LiquidError::InvalidParameter(format!(
                "{} probability must lie in [0, 1], got {}",
                name, self.probability
            )));
        }
        Ok(())
    }
}

impl Default for StimulusParams {
    fn default() -> Self {
        Self::stimulus()
    }
}

/// Channels independently switch on with a fixed probability each tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BernoulliStimulus {
    pub channels: usize,
    pub probability: f64,
    pub amplitude: f64,
    pub seed: u64,
}

impl BernoulliStimulus {
    pub fn new(channels: usize, params: &StimulusParams) -> Self {
        Self {
            channels,
            probability: params.probability,
            amplitude: params.amplitude,
            seed: params.seed,
        }
    }

    fn rng_for(&self, t: usize) -> StdRng {
        // splitmix-style mixing keeps neighbouring ticks decorrelated
        let mixed = self.seed ^ (t as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        StdRng::seed_from_u64(mixed)
    }
}

impl Stimulus for BernoulliStimulus {
    fn channels(&self) -> usize {
        self.channels
    }

    fn drive(&self, t: usize) -> Vec<f64> {
        let mut rng = self.rng_for(t);
        (0..self.channels)
            .map(|_| {
                if rng.gen::<f64>() < self.probability {
                    self.amplitude
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// Same drive vector on every tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantStimulus {
    pub values: Vec<f64>,
}

impl ConstantStimulus {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn uniform(channels: usize, value: f64) -> Self {
        Self::new(vec![value; channels])
    }
}

impl Stimulus for ConstantStimulus {
    fn channels(&self) -> usize {
        self.values.len()
    }

    fn drive(&self, _t: usize) -> Vec<f64> {
        self.values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bernoulli_is_pure_in_tick() {
        let stim = BernoulliStimulus::new(50, &StimulusParams::stimulus());
        assert_eq!(stim.drive(17), stim.drive(17));
        assert_eq!(stim.drive(17).len(), 50);
    }

    #[test]
    fn test_bernoulli_values() {
        let stim = BernoulliStimulus::new(200, &StimulusParams::stimulus());
        let drive = stim.drive(3);
        assert!(drive.iter().all(|&v| v == 0.0 || v == 25.0));

        let active = drive.iter().filter(|&&v| v > 0.0).count();
        assert!(active > 20 && active < 100);
    }

    #[test]
    fn test_bernoulli_extremes() {
        let never = BernoulliStimulus {
            channels: 10,
            probability: 0.0,
            amplitude: 1.0,
            seed: 0,
        };
        assert!(never.drive(5).iter().all(|&v| v == 0.0));

        let always = BernoulliStimulus { probability: 1.0, ..never };
        assert!(always.drive(5).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_condition_parse() {
        assert_eq!("rest".parse::<Condition>().unwrap(), Condition::Rest);
        assert_eq!("Stimulus".parse::<Condition>().unwrap(), Condition::Stimulus);
        assert!("sleep".parse::<Condition>().is_err());
    }

    #[test]
    fn test_params_validate() {
        let mut params = StimulusParams::rest();
        assert!(params.validate("rest").is_ok());
        params.probability = 1.5;
        assert!(params.validate("rest").is_err());
    }
}
