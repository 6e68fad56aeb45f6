//! Configuration for the Toroid SOM engine.

use crate::error::{Result, SomError};
use serde::{Deserialize, Serialize};

/// Built-in decay strategies selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayKind {
    /// Hill function `1 / (1 + (t / 0.5)^4)`.
    Hill,
    /// Straight line from 1 down to a small floor.
    Linear,
}

impl Default for DecayKind {
    fn default() -> Self {
        DecayKind::Hill
    }
}

/// Self-Organizing Map configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SomConfig {
    /// Grid width (number of rows).
    /// Default: 10.
    pub x: usize,

    /// Grid height (number of columns).
    /// Default: 10.
    pub y: usize,

    /// Initial learning rate.
    /// Default: 0.6.
    pub alpha_start: f64,

    /// Initial neighborhood radius.
    /// Default: None (half of the larger grid dimension).
    pub sigma_start: Option<f64>,

    /// Random seed for initialization and sample draws.
    /// Default: 42.
    pub seed: u64,

    /// Decay applied to alpha and sigma over a run.
    /// Default: Hill.
    pub decay: DecayKind,

    /// Search the winner with rayon instead of a sequential scan.
    /// Default: false.
    pub parallel_search: bool,
}

impl Default for SomConfig {
    fn default() -> Self {
        Self {
            x: 10,
            y: 10,
            alpha_start: crate::DEFAULT_ALPHA_START,
            sigma_start: None,
            seed: crate::DEFAULT_SEED,
            decay: DecayKind::Hill,
            parallel_search: false,
        }
    }
}

impl SomConfig {
    /// Creates a configuration for an `x` by `y` grid with default hyperparameters.
    pub fn new(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    /// Sets the initial learning rate.
    pub fn with_alpha_start(mut self, alpha_start: f64) -> Self {
        self.alpha_start = alpha_start;
        self
    }

    /// Sets the initial neighborhood radius.
    pub fn with_sigma_start(mut self, sigma_start: f64) -> Self {
        self.sigma_start = Some(sigma_start);
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the decay strategy.
    pub fn with_decay(mut self, decay: DecayKind) -> Self {
        self.decay = decay;
        self
    }

    /// Enables or disables parallel winner search.
    pub fn with_parallel_search(mut self, parallel: bool) -> Self {
        self.parallel_search = parallel;
        self
    }

    /// Returns the total number of neurons in the grid.
    #[inline]
    pub fn total_neurons(&self) -> usize {
        self.x * self.y
    }

    /// Returns the neighborhood radius used at the start of a run.
    #[inline]
    pub fn initial_sigma(&self) -> f64 {
        self.sigma_start
            .unwrap_or_else(|| self.x.max(self.y) as f64 / 2.0)
    }

    /// Checks that the grid and hyperparameters are usable.
    pub fn validate(&self) -> Result<()> {
        if self.x == 0 || self.y == 0 {
            return Err(SomError::Config(format!(
                "Grid dimensions must be positive, got {}x{}",
                self.x, self.y
            )));
        }
        if !self.alpha_start.is_finite() || self.alpha_start <= 0.0 {
            return Err(SomError::Config(format!(
                "alpha_start must be a positive finite number, got {}",
                self.alpha_start
            )));
        }
        let sigma = self.initial_sigma();
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(SomError::Config(format!(
                "sigma_start must be a positive finite number, got {}",
                sigma
            )));
        }
        Ok(())
    }
}
