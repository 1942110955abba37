use crate::data::particle::ParticleRecord;
use crate::data::tensor::{SparseTensor, VoxelCluster};
use crate::error::LabelError;

/// Everything the labeling engine consumes for one event.
#[derive(Clone, Debug, Default)]
pub struct EventInput {
    /// Dense particle list, `particles[i].id == i`.
    pub particles: Vec<ParticleRecord>,
    /// One cluster per particle, parallel to `particles`.
    pub clusters: Vec<VoxelCluster>,
    /// Reference image; when present only its voxels are labeled.
    pub image: Option<SparseTensor>,
    /// Ground-truth semantic labels rasterized independently of the clusters.
    pub semantics: Option<SparseTensor>,
}

impl EventInput {
    pub fn new(particles: Vec<ParticleRecord>, clusters: Vec<VoxelCluster>) -> Self {
        EventInput { particles, clusters, image: None, semantics: None }
    }

    pub fn with_image(mut self, image: SparseTensor) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_semantics(mut self, semantics: SparseTensor) -> Self {
        self.semantics = Some(semantics);
        self
    }

    pub fn num_voxels(&self) -> usize {
        self.clusters.iter().map(|c| c.size()).sum()
    }

    /// True for events that produce an empty label tensor without further work.
    pub fn is_trivially_empty(&self) -> bool {
        self.particles.is_empty() || self.num_voxels() == 0
    }

    /// Checks the dense, parallel indexing of particles and clusters.
    pub fn validate(&self) -> Result<(), LabelError> {
        if self.particles.len() != self.clusters.len() {
            return Err(LabelError::mismatch(format!(
                "{} particles but {} clusters",
                self.particles.len(),
                self.clusters.len()
            )));
        }
        for (i, p) in self.particles.iter().enumerate() {
            if p.id != i as i64 {
                return Err(LabelError::mismatch(format!(
                    "particle at position {} carries id {}",
                    i, p.id
                )));
            }
        }
        Ok(())
    }
}
