use serde::Serialize;
use tracing::debug;

use crate::algorithm::assembler::{AssemblyStats, LabelAssembler};
use crate::algorithm::group::{policy_for, GroupResolutionPolicy, ResolvedGroupMap};
use crate::algorithm::interaction::{AncestorVertexOracle, InteractionMap, InteractionOracle};
use crate::algorithm::neutrino::NeutrinoTagger;
use crate::algorithm::provenance::ProvenanceGraph;
use crate::config::LabelConfig;
use crate::data::event::EventInput;
use crate::data::labels::LabeledVoxelTensor;
use crate::error::LabelError;

/// Labels and diagnostics produced for one event.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EventLabels {
    pub tensor: LabeledVoxelTensor,
    pub groups: ResolvedGroupMap,
    pub interactions: InteractionMap,
    pub nu_interaction: Option<i64>,
    pub stats: AssemblyStats,
}

/// Stateless per-event labeling pipeline.
///
/// Nothing is carried over between events, so one pipeline can be shared by
/// several threads each labeling its own events.
pub struct LabelPipeline {
    config: LabelConfig,
    policy: Box<dyn GroupResolutionPolicy>,
}

impl LabelPipeline {
    pub fn new(config: LabelConfig) -> Result<Self, LabelError> {
        config.validate()?;
        let policy = policy_for(&config);
        Ok(LabelPipeline { config, policy })
    }

    /// Uses a custom group resolution policy instead of the configured one.
    pub fn with_policy(config: LabelConfig, policy: Box<dyn GroupResolutionPolicy>) -> Result<Self, LabelError> {
        config.validate()?;
        Ok(LabelPipeline { config, policy })
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Labels one event, judging interactions by shared ancestor vertices.
    pub fn label_event(&self, event: &EventInput) -> Result<EventLabels, LabelError> {
        self.run(event, |graph, groups| Box::new(AncestorVertexOracle::new(graph, groups)))
    }

    /// Labels one event with an externally supplied interaction oracle.
    pub fn label_event_with(&self, event: &EventInput, oracle: &dyn InteractionOracle) -> Result<EventLabels, LabelError> {
        self.run(event, |_, _| Box::new(move |g: i64| oracle.interaction_id_of(g)))
    }

    fn run<'o, F>(&self, event: &EventInput, make_oracle: F) -> Result<EventLabels, LabelError>
    where
        F: FnOnce(&ProvenanceGraph, &ResolvedGroupMap) -> Box<dyn InteractionOracle + 'o>,
    {
        let graph = ProvenanceGraph::new(event)?;
        if graph.is_empty() {
            return Ok(EventLabels {
                tensor: LabeledVoxelTensor::empty(self.config.include_nu),
                ..EventLabels::default()
            });
        }

        let groups = self.policy.resolve(&graph)?;
        let oracle = make_oracle(&graph, &groups);
        let interactions = InteractionMap::new(&groups, oracle.as_ref());
        let tagger = NeutrinoTagger::new(&interactions);

        let (tensor, stats) = LabelAssembler::new(&self.config).assemble(event, &groups, &interactions, &tagger)?;
        debug!(
            policy = self.policy.name(),
            particles = graph.len(),
            demoted = groups.num_demoted(),
            interactions = interactions.num_interactions(),
            voxels = tensor.len(),
            "labeled event"
        );

        Ok(EventLabels {
            tensor,
            groups,
            interactions,
            nu_interaction: tagger.nu_interaction(),
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::group::{EarliestNonEmptyPolicy, Verdict};
    use crate::config::PolicyKind;
    use crate::data::particle::{ParticleRecord, Shape};
    use crate::data::tensor::SparseTensor;

    const NU_VTX: [f64; 3] = [1.0, 2.0, 3.0];
    const COSMIC_VTX: [f64; 3] = [-50.0, 0.0, 0.0];

    /// A neutrino interaction (muon track with a delta and a clean shower)
    /// plus a cosmic with a late shower fragment.
    fn event() -> EventInput {
        let particles = vec![
            ParticleRecord::new(0, 0, Shape::Track).with_pdg(13, 0).with_ancestor(NU_VTX),
            ParticleRecord::new(1, 1, Shape::Delta).with_parent(0).with_process("muIoni").with_ancestor(NU_VTX),
            ParticleRecord::new(2, 2, Shape::Shower).with_pdg(11, 0).with_time(1.0).with_ancestor(NU_VTX),
            ParticleRecord::new(3, 2, Shape::Shower).with_parent(2).with_time(2.0).with_ancestor(NU_VTX),
            ParticleRecord::new(4, 4, Shape::Track).with_ancestor(COSMIC_VTX),
            ParticleRecord::new(5, 5, Shape::Shower).with_parent(4).with_time(9.0).with_ancestor(COSMIC_VTX),
            ParticleRecord::new(6, 5, Shape::Shower).with_parent(5).with_time(3.0).with_ancestor(COSMIC_VTX),
        ];
        let clusters = vec![
            SparseTensor::filled(vec![[0, 0, 0], [0, 0, 1], [0, 0, 2]], 1.0),
            SparseTensor::filled(vec![[0, 1, 1]], 0.5),
            SparseTensor::filled(vec![[5, 5, 5], [5, 5, 6]], 2.0),
            SparseTensor::filled(vec![[5, 6, 6]], 1.5),
            SparseTensor::filled(vec![[20, 0, 0], [21, 0, 0]], 1.0),
            SparseTensor::filled(vec![[22, 1, 0]], 1.0),
            SparseTensor::filled(vec![[22, 2, 0]], 1.0),
        ];
        EventInput::new(particles, clusters)
    }

    #[test]
    fn test_full_event() {
        let pipeline = LabelPipeline::new(LabelConfig::extended()).unwrap();
        let labels = pipeline.label_event(&event()).unwrap();

        // the cosmic shower primary is not the earliest member: demoted
        let fresh = labels.groups.group_of(5);
        assert!(fresh >= labels.groups.first_fresh());
        assert_eq!(labels.groups.group_of(6), fresh);
        assert_eq!(labels.groups.decisions().iter().filter(|d| d.verdict == Verdict::NotEarliest).count(), 1);
        assert_eq!(labels.groups.group_of(3), 2);

        assert_eq!(labels.interactions.num_interactions(), 2);
        assert_eq!(labels.nu_interaction, Some(0));

        let tensor = &labels.tensor;
        assert_eq!(tensor.len(), 11);
        assert!(tensor.coords().windows(2).all(|w| w[0] < w[1]));
        for row in &tensor.rows {
            let nu = if row.coord[0] < 20 { 1 } else { 0 };
            assert_eq!(row.nu_id, Some(nu));
            assert_eq!(row.interaction_id, 1 - nu as i64);
        }
    }

    #[test]
    fn test_nu_only_output() {
        let pipeline = LabelPipeline::new(LabelConfig::neutrino()).unwrap();
        let labels = pipeline.label_event(&event()).unwrap();
        assert_eq!(labels.tensor.len(), 7);
        assert!(labels.tensor.rows.iter().all(|r| r.interaction_id == 0));
    }

    #[test]
    fn test_injected_oracle() {
        let pipeline = LabelPipeline::new(LabelConfig::default()).unwrap();
        // everything is one interaction
        let labels = pipeline.label_event_with(&event(), &|_g: i64| 7i64).unwrap();
        assert_eq!(labels.interactions.num_interactions(), 1);
        assert!(labels.tensor.rows.iter().all(|r| r.interaction_id == 0 && r.nu_id.is_none()));
    }

    #[test]
    fn test_custom_policy() {
        let pipeline = LabelPipeline::with_policy(LabelConfig::default(), Box::new(EarliestNonEmptyPolicy)).unwrap();
        assert_eq!(pipeline.policy_name(), "earliest_non_empty");
        let labels = pipeline.label_event(&event()).unwrap();
        // the cosmic shower is handed to its earliest fragment
        assert_eq!(labels.groups.group_of(5), 6);
    }

    #[test]
    fn test_configured_policy() {
        let config = LabelConfig { policy: PolicyKind::AncestorFraction, ..LabelConfig::default() };
        let pipeline = LabelPipeline::new(config).unwrap();
        assert_eq!(pipeline.policy_name(), "ancestor_fraction");
        assert!(pipeline.label_event(&event()).is_ok());
    }

    #[test]
    fn test_malformed_event_fails() {
        let mut event = event();
        event.clusters.pop();
        let pipeline = LabelPipeline::new(LabelConfig::default()).unwrap();
        assert!(matches!(pipeline.label_event(&event), Err(LabelError::InputMismatch(_))));
    }

    #[test]
    fn test_empty_event() {
        let pipeline = LabelPipeline::new(LabelConfig::extended()).unwrap();
        let labels = pipeline.label_event(&EventInput::default()).unwrap();
        assert!(labels.tensor.is_empty());
        assert!(labels.tensor.has_nu);
    }

    #[test]
    fn test_records_without_vertices() {
        // groups 0 and 2, particle 1 descends from 0, particle 2 is its own root
        let particles = vec![
            ParticleRecord::new(0, 0, Shape::Track),
            ParticleRecord::new(1, 0, Shape::Track).with_parent(0),
            ParticleRecord::new(2, 2, Shape::Track),
        ];
        let clusters = vec![
            SparseTensor::filled(vec![[0, 0, 0]], 1.0),
            SparseTensor::filled(vec![[0, 0, 1]], 1.0),
            SparseTensor::filled(vec![[9, 0, 0]], 1.0),
        ];
        let pipeline = LabelPipeline::new(LabelConfig::extended()).unwrap();
        let labels = pipeline.label_event(&EventInput::new(particles, clusters)).unwrap();

        assert_eq!(labels.interactions.num_interactions(), 2);
        assert_eq!(labels.interactions.interaction_of(0), 0);
        assert_eq!(labels.interactions.interaction_of(2), 1);
        assert_eq!(labels.nu_interaction, Some(0));
        let rows: Vec<(i64, i64, Option<u8>)> =
            labels.tensor.rows.iter().map(|r| (r.group_id, r.interaction_id, r.nu_id)).collect();
        assert_eq!(rows, vec![(0, 0, Some(1)), (0, 0, Some(1)), (2, 1, Some(0))]);
    }

    #[test]
    fn test_extreme_parent_pdg_does_not_abort() {
        let particles = vec![ParticleRecord::new(0, 0, Shape::Shower).with_pdg(11, i32::MIN)];
        let clusters = vec![SparseTensor::filled(vec![[0, 0, 0]], 1.0)];
        let pipeline = LabelPipeline::new(LabelConfig::default()).unwrap();
        let labels = pipeline.label_event(&EventInput::new(particles, clusters)).unwrap();
        assert_eq!(labels.groups.group_of(0), 0);
        assert_eq!(labels.tensor.len(), 1);
    }

    #[test]
    fn test_invalid_config() {
        let config = LabelConfig { fraction_threshold: 0.0, ..LabelConfig::default() };
        assert!(LabelPipeline::new(config).is_err());
    }
}
