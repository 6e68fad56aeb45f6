//! SOM training loop.
//!
//! [`SomTrainer`] owns the grid, the seeded RNG and the epoch counter. Each
//! call to [`SomTrainer::fit`] draws a sample queue, builds a decay table with
//! one entry per queued sample and presents every queued vector once: winner
//! search, then the neighborhood update, then the epoch counter advances.
//! The table is walked from its first entry on every run; the epoch counter
//! keeps counting across runs.

use crate::config::SomConfig;
use crate::error::{Result, SomError};
use crate::som::coord::GridCoord;
use crate::som::decay::{DecayFn, DecayTable};
use crate::som::map::{check_finite, validate_data, Som};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Lifecycle of a trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingState {
    /// No grid yet; the first `fit` creates it from its data.
    Uninitialized,
    /// A run is in progress.
    Training,
    /// Grid exists and no run is in progress.
    Idle,
}

/// Record of one presented sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingStep {
    /// Epoch counter value used for this step.
    pub epoch: usize,
    /// Position in the run's decay table.
    pub step: usize,
    /// Index into the run's data, or `None` for a vector given to [`SomTrainer::step`].
    pub sample: Option<usize>,
    /// Winning cell.
    pub winner: GridCoord,
    /// Learning rate applied.
    pub alpha: f64,
    /// Neighborhood radius applied.
    pub sigma: f64,
}

/// Draws the sample queue for one run.
///
/// `epochs == 0` gives a shuffled permutation of `0..n`; otherwise `epochs`
/// indices are drawn with replacement. Fails for an empty dataset.
pub fn draw_indices<R: Rng + ?Sized>(n: usize, epochs: usize, rng: &mut R) -> Result<Vec<usize>> {
    if n == 0 {
        return Err(SomError::InvalidInput(
            "Cannot draw samples from an empty dataset".to_string(),
        ));
    }

    if epochs == 0 {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        Ok(indices)
    } else {
        Ok((0..epochs).map(|_| rng.gen_range(0..n)).collect())
    }
}

/// SOM trainer with a persistent epoch counter.
#[derive(Debug)]
pub struct SomTrainer {
    config: SomConfig,
    decay: Box<dyn DecayFn>,
    rng: ChaCha8Rng,
    som: Option<Som>,
    state: TrainingState,
    epoch: usize,
    schedule: Option<DecayTable>,
    cursor: usize,
    steps: Vec<TrainingStep>,
    error: f64,
    history: Vec<f64>,
}

impl SomTrainer {
    /// Creates a new trainer with the given configuration.
    pub fn new(config: SomConfig) -> Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let decay = config.decay.strategy();

        Ok(Self {
            config,
            decay,
            rng,
            som: None,
            state: TrainingState::Uninitialized,
            epoch: 0,
            schedule: None,
            cursor: 0,
            steps: Vec::new(),
            error: 0.0,
            history: Vec::new(),
        })
    }

    /// Replaces the decay strategy used by subsequent runs.
    pub fn with_decay(mut self, decay: Box<dyn DecayFn>) -> Self {
        self.decay = decay;
        self
    }

    /// Starts from an existing grid instead of initializing from data.
    pub fn with_som(mut self, som: Som) -> Result<Self> {
        if som.shape() != (self.config.x, self.config.y) {
            return Err(SomError::Config(format!(
                "Grid is {}x{}, configuration expects {}x{}",
                som.x(),
                som.y(),
                self.config.x,
                self.config.y
            )));
        }
        self.som = Some(som);
        self.state = TrainingState::Idle;
        Ok(self)
    }

    /// The configuration.
    pub fn config(&self) -> &SomConfig {
        &self.config
    }

    /// The trained grid, once initialized.
    pub fn som(&self) -> Option<&Som> {
        self.som.as_ref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Number of samples presented since creation or the last reset.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Sets the epoch counter back to 0.
    pub fn reset_epoch(&mut self) {
        self.epoch = 0;
    }

    /// Decay table of the latest run.
    pub fn schedule(&self) -> Option<&DecayTable> {
        self.schedule.as_ref()
    }

    /// Steps presented during the latest run.
    pub fn steps(&self) -> &[TrainingStep] {
        &self.steps
    }

    /// Reconstruction error after the latest completed run.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Reconstruction error after every completed run.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Trains on `data`.
    ///
    /// With `epochs == 0` every vector is presented once in shuffled order;
    /// otherwise `epochs` vectors are drawn with replacement. `targets` must
    /// match `data` in length and are not used by the training math.
    ///
    /// All input checks run before the grid is touched. The decay table has
    /// exactly one entry per presented sample; step `i` of the run uses
    /// entry `i` while the epoch counter continues from previous runs.
    pub fn fit<V, T>(&mut self, data: &[V], targets: &[T], epochs: usize) -> Result<()>
    where
        V: AsRef<[f64]> + Sync,
    {
        let dim = validate_data(data)?;
        if targets.len() != data.len() {
            return Err(SomError::InvalidInput(format!(
                "Got {} targets for {} data vectors",
                targets.len(),
                data.len()
            )));
        }
        if let Some(som) = &self.som {
            if som.dim() != dim {
                return Err(SomError::DimensionMismatch {
                    expected: som.dim(),
                    found: dim,
                });
            }
        }

        if self.som.is_none() {
            self.som = Some(Som::initialize(&self.config, data, &mut self.rng)?);
            self.state = TrainingState::Idle;
        }

        let indices = draw_indices(data.len(), epochs, &mut self.rng)?;
        let schedule = DecayTable::build(
            indices.len(),
            self.config.alpha_start,
            self.config.initial_sigma(),
            self.decay.as_ref(),
        )?;

        info!(
            "Training SOM: {} steps from epoch {}, {}x{} grid, {} features",
            indices.len(),
            self.epoch,
            self.config.x,
            self.config.y,
            dim
        );

        self.schedule = Some(schedule);
        self.cursor = 0;
        self.steps.clear();
        self.state = TrainingState::Training;

        for &i in &indices {
            if let Err(e) = self.present(data[i].as_ref(), Some(i)) {
                self.state = TrainingState::Idle;
                return Err(e);
            }
        }

        self.state = TrainingState::Idle;

        if let Some(som) = &self.som {
            self.error = som.quantization_error(data)?;
            self.history.push(self.error);
        }

        info!(
            "SOM training completed at epoch {}: reconstruction error {:.6}",
            self.epoch, self.error
        );
        Ok(())
    }

    /// Presents one vector using the next entry of the latest run's decay table.
    ///
    /// Fails with [`SomError::ScheduleExhausted`] once the table is used up,
    /// and with [`SomError::InvalidInput`] for non-finite values. Neither
    /// failure touches the grid.
    pub fn step(&mut self, vector: &[f64]) -> Result<TrainingStep> {
        self.present(vector, None)
    }

    fn present(&mut self, vector: &[f64], sample: Option<usize>) -> Result<TrainingStep> {
        check_finite(vector)?;
        let (alpha, sigma) = match &self.schedule {
            Some(schedule) => schedule.get(self.cursor)?,
            None => {
                return Err(SomError::ScheduleExhausted {
                    step: self.cursor,
                    len: 0,
                })
            }
        };
        let som = self
            .som
            .as_mut()
            .ok_or_else(|| SomError::InvalidInput("SOM is not initialized".to_string()))?;

        let winner = if self.config.parallel_search {
            som.find_winner_parallel(vector)?
        } else {
            som.find_winner(vector)?
        };
        som.apply_update(winner, vector, alpha, sigma)?;

        debug!(
            "Epoch {}; neuron [{}, {}]; sigma: {:.4}; alpha: {:.4}",
            self.epoch, winner.row, winner.col, sigma, alpha
        );

        let step = TrainingStep {
            epoch: self.epoch,
            step: self.cursor,
            sample,
            winner,
            alpha,
            sigma,
        };
        self.steps.push(step);
        self.cursor += 1;
        self.epoch += 1;
        Ok(step)
    }
}
