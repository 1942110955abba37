use rustc_hash::FxHashSet;

use crate::data::event::EventInput;
use crate::data::particle::ParticleRecord;
use crate::error::LabelError;

/// Read-only view over the particle ancestry of one event.
///
/// Children lists and voxel counts are computed once at construction.
#[derive(Clone, Debug)]
pub struct ProvenanceGraph<'a> {
    particles: &'a [ParticleRecord],
    children: Vec<Vec<usize>>,
    voxel_counts: Vec<usize>,
}

impl<'a> ProvenanceGraph<'a> {
    /// Builds the graph, checking that particle ids are dense and that there
    /// is exactly one cluster per particle.
    pub fn new(event: &'a EventInput) -> Result<Self, LabelError> {
        event.validate()?;
        let voxel_counts = event.clusters.iter().map(|c| c.size()).collect();
        Ok(Self::from_parts(&event.particles, voxel_counts))
    }

    /// Builds the graph from particles and per-particle voxel counts.
    pub fn from_parts(particles: &'a [ParticleRecord], voxel_counts: Vec<usize>) -> Self {
        let n = particles.len();
        let mut children = vec![Vec::new(); n];
        for (i, p) in particles.iter().enumerate() {
            if p.is_root() {
                continue;
            }
            if let Some(parent) = index_of(p.parent_id, n) {
                children[parent].push(i);
            }
        }
        ProvenanceGraph { particles, children, voxel_counts }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &'a [ParticleRecord] {
        self.particles
    }

    pub fn particle(&self, id: usize) -> &'a ParticleRecord {
        &self.particles[id]
    }

    /// Particles whose parent is `parent_id`, self-parented records excluded.
    pub fn children(&self, parent_id: usize) -> &[usize] {
        self.children.get(parent_id).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn is_root(&self, id: usize) -> bool {
        self.particles[id].is_root()
    }

    /// Number of voxels in the particle's cluster, 0 for empty clusters.
    pub fn voxel_count(&self, id: usize) -> usize {
        self.voxel_counts.get(id).copied().unwrap_or(0)
    }

    /// Maps an id to a particle index if it names a particle of this event.
    pub fn index(&self, id: i64) -> Option<usize> {
        index_of(id, self.len())
    }

    /// Chain of ancestors from `id` (exclusive) up to `stop` (inclusive).
    ///
    /// A cycle, an untracked parent or a root reached before `stop` jump
    /// straight to `stop`.
    pub fn ancestry_until(&self, id: usize, stop: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        seen.insert(id);
        let mut current = id;
        while current != stop {
            let next = match self.index(self.particles[current].parent_id) {
                Some(parent) if !seen.contains(&parent) => parent,
                _ => stop,
            };
            seen.insert(next);
            path.push(next);
            current = next;
        }
        path
    }

    /// Self-parented ancestor of `id`. An untracked parent or a cycle ends
    /// the walk at the last particle reached.
    pub fn root_of(&self, id: usize) -> usize {
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        let mut current = id;
        while seen.insert(current) && !self.is_root(current) {
            match self.index(self.particles[current].parent_id) {
                Some(parent) if !seen.contains(&parent) => current = parent,
                _ => break,
            }
        }
        current
    }

    /// Directed (parent, child) edges, plus (group, particle) edges for roots
    /// that were assigned to another particle's group.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for (i, p) in self.particles.iter().enumerate() {
            if !p.is_root() {
                if let Some(parent) = self.index(p.parent_id) {
                    edges.push((parent, i));
                }
            } else if p.group_id != p.id {
                if let Some(group) = self.index(p.group_id) {
                    edges.push((group, i));
                }
            }
        }
        edges
    }
}

fn index_of(id: i64, n: usize) -> Option<usize> {
    if id >= 0 && (id as usize) < n {
        Some(id as usize)
    } else {
        None
    }
}
