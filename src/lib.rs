//! # Toroid - Self-Organizing Map training
//!
//! Toroid trains a Self-Organizing Map (SOM): a 2-D grid of prototype
//! vectors that adapts to a data distribution so that neighboring cells
//! represent similar inputs.
//!
//! ## Overview
//!
//! The grid wraps around at its edges (a torus), so distances between cells
//! are toroidal Manhattan distances and no neuron sits on a boundary. Each
//! presented sample picks a winner by squared Euclidean distance and pulls
//! every neuron toward the sample, weighted by a Gaussian of its grid
//! distance to the winner. Learning rate and neighborhood radius shrink along
//! a precomputed decay schedule.
//!
//! ## Quick Start
//!
//! ```rust
//! use toroid::{SomConfig, SomTrainer};
//!
//! let data = vec![vec![0.0, 0.1], vec![0.9, 1.0], vec![0.5, 0.4]];
//! let labels = vec!["a", "b", "c"];
//!
//! let mut trainer = SomTrainer::new(SomConfig::new(4, 4).with_seed(42))?;
//! trainer.fit(&data, &labels, 0)?;
//!
//! let som = trainer.som().expect("initialized by fit");
//! let winners = som.winner_neurons(&data)?;
//! assert_eq!(winners.len(), 3);
//! assert_eq!(trainer.history().len(), 1);
//! # Ok::<(), toroid::SomError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - Grid size and hyperparameters
//! - [`error`] - Error types
//! - [`som`] - Grid, distance metric, decay schedule and training loop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod som;

// Re-export commonly used types
pub use config::{DecayKind, SomConfig};
pub use error::{Result, SomError};
pub use som::{
    toroidal_distance, CoordinateIndex, DecayFn, DecayTable, GridCoord, HillDecay, LinearDecay,
    Som, SomTrainer, TrainingState, TrainingStep,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default initial learning rate.
pub const DEFAULT_ALPHA_START: f64 = 0.6;

/// Default random seed.
pub const DEFAULT_SEED: u64 = 42;
