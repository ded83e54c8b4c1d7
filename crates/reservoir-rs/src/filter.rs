//! Causal synaptic filter kernels.

use serde::{Deserialize, Serialize};

use liquid_core::{LiquidError, Result};

/// Kernel shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// k[n] = (n/tau) * exp(1 - n/tau), peaks at n = tau
    Alpha,
    /// k[n] = exp(-n/tau)
    Exponential,
}

/// Filter parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterParams {
    pub kind: FilterKind,
    pub tau: f64,      // Kernel time constant (ticks)
    pub length: usize, // Number of taps
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            kind: FilterKind::Alpha,
            tau: 2.0,
            length: 20,
        }
    }
}

impl FilterParams {
    pub fn build(&self) -> Result<SynapticFilter> {
        if self.tau <= 0.0 || self.length == 0 {
            return Err(LiquidError::InvalidParameter(format!(
                "filter needs tau > 0 and at least one tap (tau = {}, length = {})",
                self.tau, self.length
            )));
        }
        Ok(match self.kind {
            FilterKind::Alpha => SynapticFilter::alpha(self.tau, self.length),
            FilterKind::Exponential => SynapticFilter::exponential(self.tau, self.length),
        })
    }
}

/// Finite impulse response applied to presynaptic spike history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynapticFilter {
    pub coefficients: Vec<f64>,
}

impl SynapticFilter {
    pub fn from_coefficients(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    pub fn alpha(tau: f64, length: usize) -> Self {
        let coefficients = (0..length)
            .map(|n| {
                let x = n as f64 / tau;
                x * (1.0 - x).exp()
            })
            .collect();
        Self { coefficients }
    }

    pub fn exponential(tau: f64, length: usize) -> Self {
        let coefficients = (0..length).map(|n| (-(n as f64) / tau).exp()).collect();
        Self { coefficients }
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Last sample of the causal convolution of the kernel with `signal`.
    ///
    /// `signal` is ordered oldest first; its last element is the current tick.
    pub fn response(&self, signal: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(signal.iter().rev())
            .map(|(k, x)| k * x)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_kernel_peak() {
        let filter = SynapticFilter::alpha(2.0, 10);
        assert_eq!(filter.coefficients[0], 0.0);
        assert!((filter.coefficients[2] - 1.0).abs() < 1e-12);
        assert!(filter.coefficients[1] < filter.coefficients[2]);
        assert!(filter.coefficients[3] < filter.coefficients[2]);
    }

    #[test]
    fn test_response_is_causal() {
        let filter = SynapticFilter::from_coefficients(vec![0.5, 0.25, 0.125]);

        // spike two ticks ago
        assert_eq!(filter.response(&[1.0, 0.0, 0.0]), 0.125);
        // spike on the current tick
        assert_eq!(filter.response(&[0.0, 0.0, 1.0]), 0.5);
        // older than the kernel
        assert_eq!(filter.response(&[1.0, 0.0, 0.0, 0.0]), 0.0);
        // history shorter than the kernel
        assert_eq!(filter.response(&[-1.0]), -0.5);
        assert_eq!(filter.response(&[]), 0.0);
    }

    #[test]
    fn test_invalid_params() {
        let params = FilterParams { tau: 0.0, ..Default::default() };
        assert!(params.build().is_err());
    }
}
