//! Assembly of the per-voxel label tensor.
//!
//! Cluster voxels are flattened in particle order, sorted and deduplicated
//! (the lowest cluster id wins a shared voxel), restricted to the reference
//! voxel set and finally joined with group, interaction and semantic labels.

use serde::Serialize;
use tracing::{debug, warn};

use crate::algorithm::alignment::{cross_index, lexsort_unique, AlignedVoxels};
use crate::algorithm::group::ResolvedGroupMap;
use crate::algorithm::interaction::InteractionMap;
use crate::algorithm::neutrino::NeutrinoTagger;
use crate::config::LabelConfig;
use crate::data::event::EventInput;
use crate::data::labels::{LabeledVoxel, LabeledVoxelTensor};
use crate::data::tensor::{Coord, SparseTensor};
use crate::error::LabelError;

/// Bookkeeping of one assembly pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AssemblyStats {
    pub cluster_voxels: usize,
    pub duplicates_dropped: usize,
    pub outside_reference: usize,
    pub semantic_overrides: usize,
    pub semantic_misses: usize,
}

/// Cluster voxels flattened in particle order.
struct FlatClusters {
    coords: Vec<Coord>,
    values: Vec<f32>,
    cluster_ids: Vec<usize>,
}

impl FlatClusters {
    fn new(event: &EventInput) -> Self {
        let n = event.num_voxels();
        let mut flat = FlatClusters {
            coords: Vec::with_capacity(n),
            values: Vec::with_capacity(n),
            cluster_ids: Vec::with_capacity(n),
        };
        for (i, cluster) in event.clusters.iter().enumerate() {
            flat.coords.extend_from_slice(cluster.coords());
            flat.values.extend_from_slice(cluster.values());
            flat.cluster_ids.extend(std::iter::repeat(i).take(cluster.size()));
        }
        flat
    }
}

pub struct LabelAssembler<'a> {
    config: &'a LabelConfig,
}

impl<'a> LabelAssembler<'a> {
    pub fn new(config: &'a LabelConfig) -> Self {
        LabelAssembler { config }
    }

    /// Semantic voxels that are not ghosts, sorted and deduplicated.
    fn clean_semantics(&self, semantics: &SparseTensor) -> AlignedSemantics {
        let ghost = self.config.ghost_label as f32;
        let order: Vec<usize> = lexsort_unique(semantics.coords())
            .into_iter()
            .filter(|&i| semantics.values()[i] < ghost)
            .collect();
        AlignedSemantics {
            coords: order.iter().map(|&i| semantics.coords()[i]).collect(),
            labels: order.iter().map(|&i| semantics.values()[i] as i32).collect(),
        }
    }

    /// Joins every label source into one row per reference voxel.
    pub fn assemble(
        &self,
        event: &EventInput,
        groups: &ResolvedGroupMap,
        interactions: &InteractionMap,
        tagger: &NeutrinoTagger,
    ) -> Result<(LabeledVoxelTensor, AssemblyStats), LabelError> {
        let include_nu = self.config.include_nu;
        let mut stats = AssemblyStats::default();
        if event.is_trivially_empty() {
            return Ok((LabeledVoxelTensor::empty(include_nu), stats));
        }

        let flat = FlatClusters::new(event);
        stats.cluster_voxels = flat.coords.len();

        let unique = AlignedVoxels::new(&flat.coords);
        stats.duplicates_dropped = flat.coords.len() - unique.len();

        let semantics = event.semantics.as_ref().map(|s| self.clean_semantics(s));

        // restrict to the reference voxel set
        let kept: Vec<usize> = match (&event.image, &semantics) {
            (Some(image), _) => self.restrict(&unique, &AlignedVoxels::new(image.coords()).coords)?,
            (None, Some(sem)) => self.restrict(&unique, &sem.coords)?,
            (None, None) => unique.order.clone(),
        };
        stats.outside_reference = unique.len() - kept.len();

        let coords: Vec<Coord> = kept.iter().map(|&i| flat.coords[i]).collect();
        let mut semantic_types: Vec<i32> = kept
            .iter()
            .map(|&i| event.particles[flat.cluster_ids[i]].shape.shape_numeric())
            .collect();

        // independently rasterized semantics take precedence
        if let (true, Some(sem)) = (self.config.override_semantics, &semantics) {
            let matched = cross_index(&coords, &sem.coords);
            for (&row, &s) in matched.candidate.iter().zip(matched.reference.iter()) {
                if semantic_types[row] != sem.labels[s] {
                    stats.semantic_overrides += 1;
                }
                semantic_types[row] = sem.labels[s];
            }
            stats.semantic_misses = coords.len() - matched.len();
            if stats.semantic_misses > 0 {
                warn!(missing = stats.semantic_misses, "labeled voxels without a semantic voxel keep their cluster shape");
            }
        }

        let rows = kept
            .iter()
            .zip(coords)
            .zip(semantic_types)
            .map(|((&i, coord), semantic_type)| {
                let cluster = flat.cluster_ids[i];
                let group_id = groups.group_of(cluster);
                let interaction_id = interactions.interaction_of(group_id);
                LabeledVoxel {
                    coord,
                    value: flat.values[i],
                    cluster_id: cluster as i64,
                    group_id,
                    interaction_id,
                    semantic_type,
                    nu_id: include_nu.then(|| tagger.flag(interaction_id)),
                }
            })
            .collect();

        let mut tensor = LabeledVoxelTensor { rows, has_nu: include_nu };
        if self.config.nu_only {
            tensor.retain_nu();
        }
        debug!(?stats, rows = tensor.len(), "assembled label tensor");
        Ok((tensor, stats))
    }

    /// Rows of `unique` present in the sorted reference set.
    fn restrict(&self, unique: &AlignedVoxels, reference: &[Coord]) -> Result<Vec<usize>, LabelError> {
        let matched = cross_index(&unique.coords, reference);
        if self.config.require_full_coverage && matched.len() < reference.len() {
            return Err(LabelError::mismatch(format!(
                "{} of {} reference voxels are not covered by any cluster",
                reference.len() - matched.len(),
                reference.len()
            )));
        }
        Ok(matched.candidate.into_iter().map(|k| unique.order[k]).collect())
    }
}

struct AlignedSemantics {
    coords: Vec<Coord>,
    labels: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::group::{GroupResolutionPolicy, VetoChainPolicy};
    use crate::algorithm::provenance::ProvenanceGraph;
    use crate::data::particle::{ParticleRecord, Shape};

    fn event() -> EventInput {
        let particles = vec![
            ParticleRecord::new(0, 0, Shape::Track),
            ParticleRecord::new(1, 1, Shape::Michel).with_parent(0),
        ];
        let clusters = vec![
            SparseTensor::new(vec![[1, 0, 0], [0, 0, 0], [2, 2, 2]], vec![1.0, 2.0, 3.0]).unwrap(),
            // shares [1, 0, 0] with cluster 0
            SparseTensor::new(vec![[1, 0, 0], [3, 0, 0]], vec![9.0, 4.0]).unwrap(),
        ];
        EventInput::new(particles, clusters)
    }

    fn assemble(event: &EventInput, config: &LabelConfig) -> Result<(LabeledVoxelTensor, AssemblyStats), LabelError> {
        let graph = ProvenanceGraph::new(event).unwrap();
        let groups = VetoChainPolicy.resolve(&graph).unwrap();
        let interactions = InteractionMap::new(&groups, &|_g: i64| 0i64);
        let tagger = NeutrinoTagger::new(&interactions);
        LabelAssembler::new(config).assemble(event, &groups, &interactions, &tagger)
    }

    #[test]
    fn test_sorted_first_cluster_wins() {
        let (tensor, stats) = assemble(&event(), &LabelConfig::default()).unwrap();
        assert_eq!(tensor.coords(), vec![[0, 0, 0], [1, 0, 0], [2, 2, 2], [3, 0, 0]]);
        assert_eq!(tensor.rows[1].cluster_id, 0);
        assert_eq!(tensor.rows[1].value, 1.0);
        assert_eq!(tensor.rows[3].semantic_type, 2);
        assert_eq!(stats.duplicates_dropped, 1);
    }

    #[test]
    fn test_image_restricts_voxels() {
        let image = SparseTensor::filled(vec![[3, 0, 0], [0, 0, 0], [0, 0, 0]], 1.0);
        let event = event().with_image(image);
        let (tensor, stats) = assemble(&event, &LabelConfig::default()).unwrap();
        assert_eq!(tensor.coords(), vec![[0, 0, 0], [3, 0, 0]]);
        assert_eq!(stats.outside_reference, 2);
    }

    #[test]
    fn test_uncovered_reference_voxel() {
        let image = SparseTensor::filled(vec![[0, 0, 0], [7, 7, 7]], 1.0);
        let event = event().with_image(image);
        let err = assemble(&event, &LabelConfig::default()).unwrap_err();
        assert!(matches!(err, LabelError::InputMismatch(_)));

        let (tensor, _) = assemble(&event, &LabelConfig::permissive()).unwrap();
        assert_eq!(tensor.coords(), vec![[0, 0, 0]]);
    }

    #[test]
    fn test_semantic_override_and_ghosts() {
        // [2, 2, 2] is a ghost: dropped from the reference set
        let semantics = SparseTensor::new(
            vec![[0, 0, 0], [1, 0, 0], [2, 2, 2], [3, 0, 0]],
            vec![0.0, 1.0, 5.0, 2.0],
        )
        .unwrap();
        let event = event().with_semantics(semantics);
        let (tensor, stats) = assemble(&event, &LabelConfig::default()).unwrap();
        assert_eq!(tensor.coords(), vec![[0, 0, 0], [1, 0, 0], [3, 0, 0]]);
        let types: Vec<i32> = tensor.rows.iter().map(|r| r.semantic_type).collect();
        assert_eq!(types, vec![0, 1, 2]);
        assert_eq!(stats.semantic_overrides, 1);
        assert_eq!(stats.semantic_misses, 0);

        let config = LabelConfig { override_semantics: false, ..LabelConfig::default() };
        let (tensor, _) = assemble(&event, &config).unwrap();
        assert_eq!(tensor.rows[0].semantic_type, 1);
    }

    #[test]
    fn test_image_reference_with_semantic_override() {
        let image = SparseTensor::filled(vec![[0, 0, 0], [1, 0, 0], [2, 2, 2], [3, 0, 0]], 1.0);
        // [1, 0, 0] is a ghost in the semantics: no semantic voxel to take over
        let semantics = SparseTensor::new(
            vec![[3, 0, 0], [2, 2, 2], [1, 0, 0], [0, 0, 0]],
            vec![2.0, 4.0, 5.0, 0.0],
        )
        .unwrap();
        let event = event().with_image(image).with_semantics(semantics);
        let (tensor, stats) = assemble(&event, &LabelConfig::default()).unwrap();

        assert_eq!(tensor.coords(), vec![[0, 0, 0], [1, 0, 0], [2, 2, 2], [3, 0, 0]]);
        let types: Vec<i32> = tensor.rows.iter().map(|r| r.semantic_type).collect();
        // the missed voxel keeps the shape of its cluster (track)
        assert_eq!(types, vec![0, 1, 4, 2]);
        assert_eq!(stats.semantic_overrides, 2);
        assert_eq!(stats.semantic_misses, 1);
        assert_eq!(stats.outside_reference, 0);
    }

    #[test]
    fn test_nu_column() {
        let (tensor, _) = assemble(&event(), &LabelConfig::neutrino()).unwrap();
        assert!(tensor.has_nu);
        assert_eq!(tensor.len(), 4);
        assert!(tensor.rows.iter().all(|r| r.nu_id == Some(1)));
    }

    #[test]
    fn test_empty_event() {
        let event = EventInput::new(vec![ParticleRecord::new(0, 0, Shape::Track)], vec![SparseTensor::empty()]);
        let (tensor, _) = assemble(&event, &LabelConfig::default()).unwrap();
        assert!(tensor.is_empty());
    }
}
