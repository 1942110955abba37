use serde::{Deserialize, Serialize};

use crate::data::tensor::Coord;

/// One labeled voxel of the final training tensor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledVoxel {
    pub coord: Coord,
    pub value: f32,
    pub cluster_id: i64,
    pub group_id: i64,
    pub interaction_id: i64,
    pub semantic_type: i32,
    /// 1 if the voxel belongs to the neutrino interaction, only set when requested.
    pub nu_id: Option<u8>,
}

/// Labeled voxels of one event, sorted by coordinate with no duplicates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledVoxelTensor {
    pub rows: Vec<LabeledVoxel>,
    pub has_nu: bool,
}

impl LabeledVoxelTensor {
    pub fn empty(has_nu: bool) -> Self {
        LabeledVoxelTensor { rows: Vec::new(), has_nu }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn coords(&self) -> Vec<Coord> {
        self.rows.iter().map(|r| r.coord).collect()
    }

    /// Number of feature columns produced by `feature_matrix`.
    pub fn num_features(&self) -> usize {
        if self.has_nu { 6 } else { 5 }
    }

    /// Flattens to `value, cluster_id, group_id, interaction_id, semantic_type[, nu_id]`.
    pub fn feature_matrix(&self) -> Vec<Vec<f32>> {
        self.rows
            .iter()
            .map(|r| {
                let mut row = vec![
                    r.value,
                    r.cluster_id as f32,
                    r.group_id as f32,
                    r.interaction_id as f32,
                    r.semantic_type as f32,
                ];
                if self.has_nu {
                    row.push(r.nu_id.unwrap_or(0) as f32);
                }
                row
            })
            .collect()
    }

    /// Flattens to `value, group_id, interaction_id, semantic_type[, nu_id]`,
    /// the layout where the group replaces the cluster column.
    pub fn extended_matrix(&self) -> Vec<Vec<f32>> {
        self.feature_matrix()
            .into_iter()
            .map(|mut row| {
                row.remove(1);
                row
            })
            .collect()
    }

    /// Keeps only voxels flagged as part of the neutrino interaction.
    pub fn retain_nu(&mut self) {
        self.rows.retain(|r| r.nu_id == Some(1));
    }
}
