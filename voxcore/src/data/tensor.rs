use serde::Serialize;

use crate::error::LabelError;

/// Integer lattice coordinate of one voxel, most significant axis first.
pub type Coord = [i32; 3];

/// A sparse voxel tensor: coordinates with one scalar value each.
///
/// The tensor is an immutable value object; `size` and `value_sum` are
/// computed once at construction.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SparseTensor {
    coords: Vec<Coord>,
    values: Vec<f32>,
    size: usize,
    value_sum: f32,
}

/// The voxels attributed by the simulator to one particle.
pub type VoxelCluster = SparseTensor;

impl SparseTensor {
    /// Constructs a new `SparseTensor`.
    ///
    /// # Arguments
    ///
    /// * `coords` - voxel coordinates, duplicates allowed.
    /// * `values` - one value per coordinate.
    ///
    /// # Errors
    ///
    /// `InputMismatch` if the two arrays differ in length.
    pub fn new(coords: Vec<Coord>, values: Vec<f32>) -> Result<Self, LabelError> {
        if coords.len() != values.len() {
            return Err(LabelError::mismatch(format!(
                "tensor has {} coordinates but {} values",
                coords.len(),
                values.len()
            )));
        }
        let size = coords.len();
        let value_sum = values.iter().sum();
        Ok(SparseTensor { coords, values, size, value_sum })
    }

    pub fn empty() -> Self {
        SparseTensor::default()
    }

    /// Builds a tensor where every voxel carries the same value.
    pub fn filled(coords: Vec<Coord>, value: f32) -> Self {
        let values = vec![value; coords.len()];
        let size = coords.len();
        let value_sum = value * size as f32;
        SparseTensor { coords, values, size, value_sum }
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn value_sum(&self) -> f32 {
        self.value_sum
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Keeps the rows selected by `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> SparseTensor {
        let coords = indices.iter().map(|&i| self.coords[i]).collect();
        let values: Vec<f32> = indices.iter().map(|&i| self.values[i]).collect();
        let size = indices.len();
        let value_sum = values.iter().sum();
        SparseTensor { coords, values, size, value_sum }
    }

    /// Keeps the rows whose value passes `keep`.
    pub fn filter_values<F: Fn(f32) -> bool>(&self, keep: F) -> SparseTensor {
        let indices: Vec<usize> = (0..self.size).filter(|&i| keep(self.values[i])).collect();
        self.select(&indices)
    }
}
