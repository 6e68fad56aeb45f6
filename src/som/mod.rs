//! Self-Organizing Map (SOM) module.
//!
//! - **Grid**: weight storage, winner search and the update rule (map.rs)
//! - **Coordinates**: cell positions and toroidal distance (coord.rs)
//! - **Decay**: per-step learning rate and radius (decay.rs)
//! - **Training**: the sample loop and epoch bookkeeping (training.rs)

mod coord;
mod map;
pub mod decay;
pub mod simd;
pub mod training;

pub use coord::{toroidal_distance, CoordinateIndex, GridCoord};
pub use decay::{DecayFn, DecayTable, HillDecay, LinearDecay};
pub use map::{validate_data, Som};
pub use training::{draw_indices, SomTrainer, TrainingState, TrainingStep};
