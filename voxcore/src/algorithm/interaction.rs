use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::algorithm::group::ResolvedGroupMap;
use crate::algorithm::provenance::ProvenanceGraph;

/// Judges which resolved groups share an interaction vertex.
///
/// Returned ids only need to be equal for groups of the same interaction;
/// they are re-numbered densely afterwards. Negative ids mean "unknown".
pub trait InteractionOracle {
    fn interaction_id_of(&self, resolved_group: i64) -> i64;
}

impl<F: Fn(i64) -> i64> InteractionOracle for F {
    fn interaction_id_of(&self, resolved_group: i64) -> i64 {
        self(resolved_group)
    }
}

/// Where an interaction is anchored: a recorded ancestor vertex, or the
/// provenance root when the simulator recorded none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Anchor {
    Vertex([OrderedFloat<f64>; 3]),
    Root(usize),
}

/// Groups whose representative particles share the same ancestor vertex
/// belong to the same interaction.
///
/// Representatives without a vertex fall back to their provenance root, so
/// every resolved group receives a non-negative interaction id.
#[derive(Clone, Debug, Default)]
pub struct AncestorVertexOracle {
    vertex_of: FxHashMap<i64, i64>,
}

impl AncestorVertexOracle {
    /// The representative of a resolved group is its lowest-id member.
    pub fn new(graph: &ProvenanceGraph, groups: &ResolvedGroupMap) -> Self {
        let representatives: Vec<(i64, Anchor)> = groups
            .members()
            .into_iter()
            .map(|(g, members)| {
                let anchor = match graph.particle(members[0]).ancestor_position {
                    Some([x, y, z]) => Anchor::Vertex([OrderedFloat(x), OrderedFloat(y), OrderedFloat(z)]),
                    None => Anchor::Root(graph.root_of(members[0])),
                };
                (g, anchor)
            })
            .collect();

        // anchors are numbered in sorted order, vertices first
        let mut anchor_ids: BTreeMap<Anchor, i64> = representatives.iter().map(|(_, a)| (*a, 0)).collect();
        for (k, id) in anchor_ids.values_mut().enumerate() {
            *id = k as i64;
        }

        let vertex_of = representatives
            .into_iter()
            .map(|(g, a)| (g, anchor_ids[&a]))
            .collect();
        AncestorVertexOracle { vertex_of }
    }
}

impl InteractionOracle for AncestorVertexOracle {
    fn interaction_id_of(&self, resolved_group: i64) -> i64 {
        self.vertex_of.get(&resolved_group).copied().unwrap_or(-1)
    }
}

/// Interaction id of every resolved group.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InteractionMap {
    group_to_interaction: BTreeMap<i64, i64>,
    num_interactions: usize,
}

impl InteractionMap {
    /// Applies `oracle` to every resolved group in discovery order and
    /// renumbers the raw ids densely from 0, in order of first appearance.
    pub fn new(groups: &ResolvedGroupMap, oracle: &dyn InteractionOracle) -> Self {
        let mut dense: FxHashMap<i64, i64> = FxHashMap::default();
        let mut group_to_interaction = BTreeMap::new();
        for g in groups.discovery_order() {
            let raw = oracle.interaction_id_of(g);
            let id = if raw < 0 {
                -1
            } else {
                let next = dense.len() as i64;
                *dense.entry(raw).or_insert(next)
            };
            group_to_interaction.insert(g, id);
        }
        InteractionMap { group_to_interaction, num_interactions: dense.len() }
    }

    /// Interaction of a resolved group, -1 when unknown.
    pub fn interaction_of(&self, resolved_group: i64) -> i64 {
        self.group_to_interaction.get(&resolved_group).copied().unwrap_or(-1)
    }

    pub fn contains_group(&self, resolved_group: i64) -> bool {
        self.group_to_interaction.contains_key(&resolved_group)
    }

    pub fn num_interactions(&self) -> usize {
        self.num_interactions
    }

    pub fn group_to_interaction(&self) -> &BTreeMap<i64, i64> {
        &self.group_to_interaction
    }

    /// Resolved groups of one interaction.
    pub fn groups_of(&self, interaction: i64) -> Vec<i64> {
        self.group_to_interaction
            .iter()
            .filter(|&(_, &i)| i == interaction)
            .map(|(&g, _)| g)
            .collect()
    }
}
