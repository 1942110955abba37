use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use voxcore::data::event::EventInput;
use voxcore::data::particle::ParticleRecord;
use voxcore::data::tensor::{Coord, SparseTensor};
use voxcore::{EventLabels, LabelError};

/// Flat tensor row as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TensorRecord {
    pub coords: Vec<Coord>,
    pub values: Vec<f32>,
}

impl TensorRecord {
    pub fn into_tensor(self) -> Result<SparseTensor, LabelError> {
        SparseTensor::new(self.coords, self.values)
    }
}

impl From<&SparseTensor> for TensorRecord {
    fn from(t: &SparseTensor) -> Self {
        TensorRecord {
            coords: t.coords().to_vec(),
            values: t.values().to_vec(),
        }
    }
}

/// One event as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRecord {
    pub particles: Vec<ParticleRecord>,
    pub clusters: Vec<TensorRecord>,
    #[serde(default)]
    pub image: Option<TensorRecord>,
    #[serde(default)]
    pub semantics: Option<TensorRecord>,
}

impl TryFrom<EventRecord> for EventInput {
    type Error = LabelError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let EventRecord {
            particles,
            clusters,
            image,
            semantics,
        } = record;

        let clusters = clusters
            .into_iter()
            .map(TensorRecord::into_tensor)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EventInput {
            particles,
            clusters,
            image: image.map(TensorRecord::into_tensor).transpose()?,
            semantics: semantics.map(TensorRecord::into_tensor).transpose()?,
        })
    }
}

impl From<&EventInput> for EventRecord {
    fn from(event: &EventInput) -> Self {
        EventRecord {
            particles: event.particles.clone(),
            clusters: event.clusters.iter().map(TensorRecord::from).collect(),
            image: event.image.as_ref().map(TensorRecord::from),
            semantics: event.semantics.as_ref().map(TensorRecord::from),
        }
    }
}

/// Labels of one event as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRow {
    pub event: usize,
    pub coords: Vec<Coord>,
    pub features: Vec<Vec<f32>>,
    pub groups: BTreeMap<i64, i64>,
    pub interactions: BTreeMap<i64, i64>,
    pub nu_interaction: Option<i64>,
}

impl LabelRow {
    /// Flattens the labels of event `event`; `extended` drops the cluster column.
    pub fn new(event: usize, labels: &EventLabels, extended: bool) -> Self {
        let features = if extended {
            labels.tensor.extended_matrix()
        } else {
            labels.tensor.feature_matrix()
        };
        LabelRow {
            event,
            coords: labels.tensor.coords(),
            features,
            groups: labels.groups.mapping().clone(),
            interactions: labels.interactions.group_to_interaction().clone(),
            nu_interaction: labels.nu_interaction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxcore::data::particle::Shape;

    #[test]
    fn test_record_to_event() {
        let json = r#"{
            "particles": [{"id": 0, "parent_id": 0, "group_id": 0, "shape": "Shower"}],
            "clusters": [{"coords": [[0, 0, 0], [1, 0, 0]], "values": [1.0, 2.0]}],
            "image": {"coords": [[0, 0, 0]], "values": [1.0]}
        }"#;
        let record: EventRecord = serde_json::from_str(json).unwrap();
        let event = EventInput::try_from(record).unwrap();
        assert_eq!(event.particles[0].shape, Shape::Shower);
        assert_eq!(event.clusters[0].size(), 2);
        assert!(event.image.is_some());
        assert!(event.semantics.is_none());
    }

    #[test]
    fn test_ragged_cluster_is_rejected() {
        let record = EventRecord {
            particles: vec![ParticleRecord::new(0, 0, Shape::Track)],
            clusters: vec![TensorRecord { coords: vec![[0, 0, 0]], values: vec![] }],
            ..EventRecord::default()
        };
        assert!(EventInput::try_from(record).is_err());
    }
}
