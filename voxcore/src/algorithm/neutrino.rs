use crate::algorithm::interaction::InteractionMap;

/// Resolved group id reserved for the neutrino-associated primary.
pub const NU_GROUP: i64 = 0;

/// Flags the neutrino interaction of an event.
///
/// The neutrino interaction is the one containing resolved group 0. This is a
/// convention of the training samples, not a physical rule: an event whose
/// group 0 was demoted, or that carries cosmics only, has no neutrino flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeutrinoTagger {
    nu_interaction: Option<i64>,
}

impl NeutrinoTagger {
    pub fn new(interactions: &InteractionMap) -> Self {
        let nu_interaction = if interactions.contains_group(NU_GROUP) {
            Some(interactions.interaction_of(NU_GROUP)).filter(|&i| i >= 0)
        } else {
            None
        };
        NeutrinoTagger { nu_interaction }
    }

    pub fn nu_interaction(&self) -> Option<i64> {
        self.nu_interaction
    }

    pub fn flag(&self, interaction_id: i64) -> u8 {
        match self.nu_interaction {
            Some(nu) if nu == interaction_id => 1,
            _ => 0,
        }
    }

    pub fn flags(&self, interaction_ids: &[i64]) -> Vec<u8> {
        interaction_ids.iter().map(|&i| self.flag(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::group::{GroupResolutionPolicy, VetoChainPolicy};
    use crate::algorithm::provenance::ProvenanceGraph;
    use crate::data::event::EventInput;
    use crate::data::particle::{ParticleRecord, Shape};
    use crate::data::tensor::SparseTensor;

    fn tagger(shape_of_zero: Shape) -> NeutrinoTagger {
        let particles = vec![
            ParticleRecord::new(0, 0, shape_of_zero).with_time(1.0),
            ParticleRecord::new(1, 1, Shape::Track),
            ParticleRecord::new(2, 2, Shape::Track),
        ];
        let clusters = vec![
            SparseTensor::empty(),
            SparseTensor::filled(vec![[1, 0, 0]], 1.0),
            SparseTensor::filled(vec![[2, 0, 0]], 1.0),
        ];
        let event = EventInput::new(particles, clusters);
        let graph = ProvenanceGraph::new(&event).unwrap();
        let groups = VetoChainPolicy.resolve(&graph).unwrap();
        // groups 0 and 2 share a vertex, 1 is on its own
        let interactions = InteractionMap::new(&groups, &|g: i64| if g == 1 { 1i64 } else { 0 });
        NeutrinoTagger::new(&interactions)
    }

    #[test]
    fn test_interaction_of_group_zero_is_flagged() {
        let tagger = tagger(Shape::Track);
        assert_eq!(tagger.nu_interaction(), Some(0));
        assert_eq!(tagger.flags(&[0, 1, 0, -1]), vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_demoted_group_zero_flags_nothing() {
        // an empty shower primary is demoted, so no resolved group 0 remains
        let tagger = tagger(Shape::Shower);
        assert_eq!(tagger.nu_interaction(), None);
        assert_eq!(tagger.flags(&[0, 1, 2]), vec![0, 0, 0]);
    }
}
