//! Learning-rate and neighborhood-radius decay schedules.
//!
//! A run precomputes one alpha and one sigma per step. The shape of the
//! fall-off is a [`DecayFn`] strategy so alternatives can be swapped in
//! without touching winner search or the update rule.

use crate::config::DecayKind;
use crate::error::{Result, SomError};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A monotone decay from 1 at `t = 0` toward a small positive value at `t = 1`.
pub trait DecayFn: Debug + Send + Sync {
    /// Returns the decay factor in `(0, 1]` for progress `t` in `[0, 1]`.
    fn factor(&self, t: f64) -> f64;
}

/// Hill function `1 / (1 + (t / 0.5)^4)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HillDecay;

impl DecayFn for HillDecay {
    #[inline]
    fn factor(&self, t: f64) -> f64 {
        1.0 / (1.0 + (t / 0.5).powi(4))
    }
}

/// Linear decay from 1 at `t = 0` to `floor` at `t = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDecay {
    floor: f64,
}

impl LinearDecay {
    /// Creates a linear decay ending at `floor`, clamped to `(0, 1]`.
    pub fn new(floor: f64) -> Self {
        Self {
            floor: floor.clamp(f64::MIN_POSITIVE, 1.0),
        }
    }
}

impl Default for LinearDecay {
    /// Ends where the Hill function ends (1/17).
    fn default() -> Self {
        Self::new(1.0 / 17.0)
    }
}

impl DecayFn for LinearDecay {
    #[inline]
    fn factor(&self, t: f64) -> f64 {
        1.0 - (1.0 - self.floor) * t
    }
}

impl DecayKind {
    /// Returns the strategy for this kind.
    pub fn strategy(self) -> Box<dyn DecayFn> {
        match self {
            DecayKind::Hill => Box::new(HillDecay),
            DecayKind::Linear => Box::new(LinearDecay::default()),
        }
    }
}

/// Per-step learning rates and neighborhood radii for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayTable {
    alphas: Vec<f64>,
    sigmas: Vec<f64>,
}

impl DecayTable {
    /// Precomputes `epochs` entries.
    ///
    /// Progress values are evenly spaced over `[0, 1]` with both ends
    /// included, or a single `0` when `epochs == 1`.
    pub fn build(
        epochs: usize,
        alpha_start: f64,
        sigma_start: f64,
        decay: &dyn DecayFn,
    ) -> Result<Self> {
        if epochs == 0 {
            return Err(SomError::Config(
                "Decay schedule needs at least one epoch".to_string(),
            ));
        }

        let denom = (epochs - 1).max(1) as f64;
        let mut alphas = Vec::with_capacity(epochs);
        let mut sigmas = Vec::with_capacity(epochs);

        for i in 0..epochs {
            let t = i as f64 / denom;
            let f = decay.factor(t);
            if !f.is_finite() || f <= 0.0 || f > 1.0 {
                return Err(SomError::Config(format!(
                    "Decay factor {} at t={:.4} is outside (0, 1]",
                    f, t
                )));
            }
            alphas.push(alpha_start * f);
            sigmas.push(sigma_start * f);
        }

        Ok(Self { alphas, sigmas })
    }

    /// Number of steps covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.alphas.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.alphas.is_empty()
    }

    /// Returns `(alpha, sigma)` for step `step` of the run.
    pub fn get(&self, step: usize) -> Result<(f64, f64)> {
        match (self.alphas.get(step), self.sigmas.get(step)) {
            (Some(&alpha), Some(&sigma)) => Ok((alpha, sigma)),
            _ => Err(SomError::ScheduleExhausted {
                step,
                len: self.len(),
            }),
        }
    }

    /// Learning rate per step.
    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    /// Neighborhood radius per step.
    pub fn sigmas(&self) -> &[f64] {
        &self.sigmas
    }
}
