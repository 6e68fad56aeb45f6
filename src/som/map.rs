//! Self-Organizing Map grid: storage, winner search and the update rule.

use crate::config::SomConfig;
use crate::error::{Result, SomError};
use crate::som::coord::{toroidal_distance, CoordinateIndex, GridCoord};
use crate::som::simd::{argmin, distance_squared};
use log::warn;
use ndarray::{s, Array2, Array3, ArrayView1, ArrayView3, Axis, Zip};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

/// Checks that `data` is a non-empty set of equal-length, finite vectors.
///
/// Returns the shared feature dimension.
pub fn validate_data<V: AsRef<[f64]>>(data: &[V]) -> Result<usize> {
    let first = data
        .first()
        .ok_or_else(|| SomError::InvalidInput("Empty dataset".to_string()))?;
    let dim = first.as_ref().len();
    if dim == 0 {
        return Err(SomError::InvalidInput(
            "Data vectors have no features".to_string(),
        ));
    }

    for (i, vector) in data.iter().enumerate() {
        let vector = vector.as_ref();
        if vector.len() != dim {
            return Err(SomError::InvalidInput(format!(
                "Vector {} has length {}, expected {}",
                i,
                vector.len(),
                dim
            )));
        }
        if let Some(j) = vector.iter().position(|v| !v.is_finite()) {
            return Err(SomError::InvalidInput(format!(
                "Vector {} has non-finite value {} at feature {}",
                i, vector[j], j
            )));
        }
    }

    Ok(dim)
}

/// Rejects a vector holding NaN or an infinity.
pub(crate) fn check_finite(vector: &[f64]) -> Result<()> {
    match vector.iter().position(|v| !v.is_finite()) {
        Some(j) => Err(SomError::InvalidInput(format!(
            "Non-finite value {} at feature {}",
            vector[j], j
        ))),
        None => Ok(()),
    }
}

/// Squared distance between one grid lane and a vector.
#[inline]
fn lane_distance_squared(lane: ArrayView1<'_, f64>, vector: &[f64]) -> f64 {
    match lane.as_slice() {
        Some(weights) => distance_squared(weights, vector),
        None => lane
            .iter()
            .zip(vector)
            .map(|(w, v)| (w - v) * (w - v))
            .sum(),
    }
}

/// A Self-Organizing Map on a toroidal grid.
///
/// The grid holds one weight vector per cell in an `(x, y, d)` array. Cell
/// `(row, col)` lives at `weights[[row, col, ..]]`; flat indices are
/// row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Som {
    weights: Array3<f64>,
    index: CoordinateIndex,
}

impl Som {
    /// Creates a grid sized by `config` with weights drawn from a normal
    /// distribution matching the mean and standard deviation of `data`.
    ///
    /// All values of all vectors are pooled into one mean and one
    /// (population) standard deviation.
    pub fn initialize<V, R>(config: &SomConfig, data: &[V], rng: &mut R) -> Result<Self>
    where
        V: AsRef<[f64]>,
        R: Rng + ?Sized,
    {
        config.validate()?;
        let dim = validate_data(data)?;

        let count = (data.len() * dim) as f64;
        let mean = data
            .iter()
            .flat_map(|v| v.as_ref().iter())
            .sum::<f64>()
            / count;
        let variance = data
            .iter()
            .flat_map(|v| v.as_ref().iter())
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / count;
        let std_dev = variance.sqrt();

        if std_dev == 0.0 {
            warn!("Initialization data has zero variance; every neuron starts at {}", mean);
        }

        let normal = Normal::new(mean, std_dev).map_err(|e| {
            SomError::InvalidInput(format!(
                "Cannot sample N({}, {}): {}",
                mean, std_dev, e
            ))
        })?;

        let weights = Array3::from_shape_fn((config.x, config.y, dim), |_| normal.sample(rng));

        Ok(Self {
            weights,
            index: CoordinateIndex::new(config.x, config.y),
        })
    }

    /// Creates a grid with zero weights.
    pub fn new_zeros(x: usize, y: usize, dim: usize) -> Self {
        Self {
            weights: Array3::zeros((x, y, dim)),
            index: CoordinateIndex::new(x, y),
        }
    }

    /// Creates a grid from existing weights of shape `(x, y, d)`.
    pub fn from_weights(weights: Array3<f64>) -> Result<Self> {
        let (x, y, dim) = weights.dim();
        if x == 0 || y == 0 || dim == 0 {
            return Err(SomError::InvalidInput(format!(
                "Weight grid must be non-empty, got shape ({}, {}, {})",
                x, y, dim
            )));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(SomError::InvalidInput(
                "Weight grid contains non-finite values".to_string(),
            ));
        }

        Ok(Self {
            weights: weights.as_standard_layout().into_owned(),
            index: CoordinateIndex::new(x, y),
        })
    }

    /// Grid width.
    #[inline]
    pub fn x(&self) -> usize {
        self.weights.dim().0
    }

    /// Grid height.
    #[inline]
    pub fn y(&self) -> usize {
        self.weights.dim().1
    }

    /// Feature dimension of every weight vector.
    #[inline]
    pub fn dim(&self) -> usize {
        self.weights.dim().2
    }

    /// `(x, y)` extent, the wrap period of the torus.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.index.shape()
    }

    /// Returns the total number of neurons.
    #[inline]
    pub fn total_neurons(&self) -> usize {
        self.x() * self.y()
    }

    /// Read-only view of the full weight grid.
    pub fn weights(&self) -> ArrayView3<'_, f64> {
        self.weights.view()
    }

    /// The coordinate index of this grid.
    pub fn index(&self) -> &CoordinateIndex {
        &self.index
    }

    /// Weight vector of one cell.
    pub fn cell(&self, coord: GridCoord) -> Result<ArrayView1<'_, f64>> {
        self.check_coord(coord)?;
        Ok(self.weights.slice(s![coord.row, coord.col, ..]))
    }

    /// Overwrites the weight vector of one cell.
    pub fn set_cell(&mut self, coord: GridCoord, weights: &[f64]) -> Result<()> {
        self.check_coord(coord)?;
        self.check_dim(weights)?;
        self.weights
            .slice_mut(s![coord.row, coord.col, ..])
            .assign(&ArrayView1::from(weights));
        Ok(())
    }

    fn check_dim(&self, vector: &[f64]) -> Result<()> {
        if vector.len() != self.dim() {
            return Err(SomError::DimensionMismatch {
                expected: self.dim(),
                found: vector.len(),
            });
        }
        Ok(())
    }

    /// Dimension check plus finiteness, for vectors presented one at a time.
    fn check_vector(&self, vector: &[f64]) -> Result<()> {
        self.check_dim(vector)?;
        check_finite(vector)
    }

    fn check_coord(&self, coord: GridCoord) -> Result<()> {
        if coord.row >= self.x() || coord.col >= self.y() {
            return Err(SomError::InvalidInput(format!(
                "Cell ({}, {}) outside {}x{} grid",
                coord.row,
                coord.col,
                self.x(),
                self.y()
            )));
        }
        Ok(())
    }

    /// Squared distance from `vector` to every cell, row-major.
    fn distances_squared(&self, vector: &[f64]) -> Vec<f64> {
        self.weights
            .lanes(Axis(2))
            .into_iter()
            .map(|lane| lane_distance_squared(lane, vector))
            .collect()
    }

    /// Finds the winner (Best Matching Unit) for `vector`.
    ///
    /// Compares squared Euclidean distances. Ties go to the lowest
    /// row-major flat index.
    pub fn find_winner(&self, vector: &[f64]) -> Result<GridCoord> {
        self.check_vector(vector)?;

        let distances = self.distances_squared(vector);
        let best = argmin(&distances)
            .ok_or_else(|| SomError::InvalidInput("Empty SOM".to_string()))?;

        Ok(GridCoord::from_flat_index(best, self.y()))
    }

    /// Finds the winner in parallel.
    ///
    /// The reduction orders candidates by `(distance, flat index)`, so the
    /// result is identical to [`Som::find_winner`].
    pub fn find_winner_parallel(&self, vector: &[f64]) -> Result<GridCoord> {
        self.check_vector(vector)?;

        let cols = self.y();
        let (_, best) = (0..self.total_neurons())
            .into_par_iter()
            .map(|i| {
                let c = GridCoord::from_flat_index(i, cols);
                let lane = self.weights.slice(s![c.row, c.col, ..]);
                (lane_distance_squared(lane, vector), i)
            })
            .reduce(
                || (f64::INFINITY, usize::MAX),
                |a, b| {
                    if b.0 < a.0 || (b.0 == a.0 && b.1 < a.1) {
                        b
                    } else {
                        a
                    }
                },
            );

        if best == usize::MAX {
            return Err(SomError::InvalidInput("Empty SOM".to_string()));
        }
        Ok(GridCoord::from_flat_index(best, cols))
    }

    /// Moves the whole grid toward `vector` around `winner`.
    ///
    /// Every cell gets `w <- w - h * alpha * (w - vector)` with
    /// `h = exp(-(dist / sigma)^2)` and `dist` the toroidal Manhattan
    /// distance to the winner. One pass, one winner, one (alpha, sigma).
    pub fn apply_update(
        &mut self,
        winner: GridCoord,
        vector: &[f64],
        alpha: f64,
        sigma: f64,
    ) -> Result<()> {
        self.check_vector(vector)?;
        self.check_coord(winner)?;
        if !alpha.is_finite() {
            return Err(SomError::InvalidInput(format!("Non-finite alpha {}", alpha)));
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(SomError::InvalidInput(format!(
                "Neighborhood radius must be positive and finite, got {}",
                sigma
            )));
        }

        let kernel = self
            .index
            .distance_field(winner)
            .mapv(|d| (-(d as f64 / sigma).powi(2)).exp());
        let target = ArrayView1::from(vector);

        Zip::from(self.weights.lanes_mut(Axis(2)))
            .and(&kernel)
            .for_each(|mut lane, &h| {
                let rate = h * alpha;
                lane.zip_mut_with(&target, |w, &v| *w -= rate * (*w - v));
            });

        Ok(())
    }

    /// Euclidean distance from every vector to every neuron.
    ///
    /// Returns shape `(data.len(), x * y)` with neurons in row-major order.
    pub fn transform<V>(&self, data: &[V]) -> Result<Array2<f64>>
    where
        V: AsRef<[f64]> + Sync,
    {
        self.check_batch(data)?;

        let rows: Vec<Vec<f64>> = data
            .par_iter()
            .map(|v| {
                self.distances_squared(v.as_ref())
                    .into_iter()
                    .map(f64::sqrt)
                    .collect()
            })
            .collect();

        let mut out = Array2::zeros((data.len(), self.total_neurons()));
        for (mut row, values) in out.rows_mut().into_iter().zip(rows) {
            row.assign(&ArrayView1::from(&values[..]));
        }
        Ok(out)
    }

    /// Winner coordinate of every vector, in input order.
    pub fn winner_neurons<V>(&self, data: &[V]) -> Result<Vec<GridCoord>>
    where
        V: AsRef<[f64]> + Sync,
    {
        self.check_batch(data)?;
        data.par_iter().map(|v| self.find_winner(v.as_ref())).collect()
    }

    /// Mean Euclidean distance from each vector to its winner.
    pub fn quantization_error<V>(&self, data: &[V]) -> Result<f64>
    where
        V: AsRef<[f64]> + Sync,
    {
        self.check_batch(data)?;

        // Summed in input order so the result does not depend on rayon's splits
        let errors: Vec<f64> = data
            .par_iter()
            .map(|v| {
                self.distances_squared(v.as_ref())
                    .into_iter()
                    .fold(f64::INFINITY, f64::min)
                    .sqrt()
            })
            .collect();

        Ok(errors.iter().sum::<f64>() / data.len() as f64)
    }

    /// U-matrix style distance map.
    ///
    /// Each cell holds the mean Euclidean distance of its weight vector to
    /// all weight vectors of the grid, scaled so the largest value is 1.
    /// A grid of identical neurons maps to all zeros.
    pub fn distance_map(&self) -> Array2<f64> {
        let cells = self.total_neurons();
        let cols = self.y();

        let means: Vec<f64> = (0..cells)
            .into_par_iter()
            .map(|i| {
                let a = GridCoord::from_flat_index(i, cols);
                let lane = self.weights.slice(s![a.row, a.col, ..]);
                let sum: f64 = self
                    .weights
                    .lanes(Axis(2))
                    .into_iter()
                    .map(|other| {
                        lane.iter()
                            .zip(other.iter())
                            .map(|(p, q)| (p - q) * (p - q))
                            .sum::<f64>()
                            .sqrt()
                    })
                    .sum();
                sum / cells as f64
            })
            .collect();

        let max = means.iter().copied().fold(0.0, f64::max);
        Array2::from_shape_fn(self.shape(), |(row, col)| {
            let mean = means[GridCoord::new(row, col).flat_index(cols)];
            if max > 0.0 {
                mean / max
            } else {
                0.0
            }
        })
    }

    /// Indices of the `data` points whose winner lies within toroidal
    /// distance `d` of the winner of `vector`.
    pub fn neighbors<V>(&self, vector: &[f64], data: &[V], d: usize) -> Result<Vec<usize>>
    where
        V: AsRef<[f64]> + Sync,
    {
        let center = self.find_winner(vector)?;
        let shape = self.shape();

        Ok(self
            .winner_neurons(data)?
            .into_iter()
            .enumerate()
            .filter(|&(_, w)| toroidal_distance(w, center, shape) <= d)
            .map(|(i, _)| i)
            .collect())
    }

    fn check_batch<V: AsRef<[f64]>>(&self, data: &[V]) -> Result<()> {
        let dim = validate_data(data)?;
        if dim != self.dim() {
            return Err(SomError::DimensionMismatch {
                expected: self.dim(),
                found: dim,
            });
        }
        Ok(())
    }
}
