//! Group resolution.
//!
//! The simulator's declared `group_id` does not always name a clean primary
//! particle. A `GroupResolutionPolicy` decides, for every declared group, which
//! id the group's members finally carry. Demoted groups receive fresh ids
//! above every declared id so they can never collide with a primary.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::debug;

use crate::algorithm::provenance::ProvenanceGraph;
use crate::config::{LabelConfig, PolicyKind};
use crate::error::LabelError;

/// Why a declared group ended up with its resolved id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// Primary is not shower-like, the group is left as declared.
    Exempt,
    /// Primary passed every check.
    Kept,
    /// Primary comes from nuclear activity or a muon.
    ProcessVeto,
    /// Primary deposited no voxels.
    EmptyPrimary,
    /// Another member was created before the primary.
    NotEarliest,
    /// The group was handed to another member or ancestor.
    Reassigned,
    /// No member deposited any voxel.
    NoVoxels,
    /// No ancestor owns enough of the group's voxels.
    WeakParent,
}

impl Verdict {
    pub fn is_demotion(&self) -> bool {
        matches!(
            self,
            Verdict::ProcessVeto | Verdict::EmptyPrimary | Verdict::NotEarliest | Verdict::WeakParent
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupDecision {
    pub declared: i64,
    pub resolved: i64,
    pub verdict: Verdict,
    pub members: Vec<usize>,
}

/// Outcome of group resolution for one event.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResolvedGroupMap {
    mapping: BTreeMap<i64, i64>,
    per_particle: Vec<i64>,
    decisions: Vec<GroupDecision>,
    first_fresh: i64,
}

impl ResolvedGroupMap {
    /// Resolved id of a declared group; ids that are not declared groups
    /// (fresh ids included) resolve to themselves.
    pub fn resolve(&self, declared: i64) -> i64 {
        self.mapping.get(&declared).copied().unwrap_or(declared)
    }

    /// Resolved group of a particle.
    pub fn group_of(&self, particle: usize) -> i64 {
        self.per_particle[particle]
    }

    pub fn per_particle(&self) -> &[i64] {
        &self.per_particle
    }

    pub fn mapping(&self) -> &BTreeMap<i64, i64> {
        &self.mapping
    }

    pub fn decisions(&self) -> &[GroupDecision] {
        &self.decisions
    }

    /// Smallest id a demoted group can receive in this event.
    pub fn first_fresh(&self) -> i64 {
        self.first_fresh
    }

    pub fn num_demoted(&self) -> usize {
        self.decisions.iter().filter(|d| d.verdict.is_demotion()).count()
    }

    /// Members of every resolved group.
    pub fn members(&self) -> BTreeMap<i64, Vec<usize>> {
        let mut out: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, &g) in self.per_particle.iter().enumerate() {
            out.entry(g).or_default().push(i);
        }
        out
    }

    /// Resolved group ids ordered by their lowest particle id.
    pub fn discovery_order(&self) -> Vec<i64> {
        let mut seen = rustc_hash::FxHashSet::default();
        self.per_particle
            .iter()
            .copied()
            .filter(|g| seen.insert(*g))
            .collect()
    }
}

/// Monotonic source of ids for demoted groups, scoped to one event.
#[derive(Clone, Debug)]
pub struct FreshIds {
    next: i64,
}

impl FreshIds {
    pub fn starting_at(first: i64) -> Self {
        FreshIds { next: first }
    }

    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Decides the resolved id of one declared group at a time.
pub trait GroupResolutionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolves the declared group `declared` whose nominal primary is the
    /// particle `primary`. `members` holds the particles declaring the group,
    /// in increasing id order.
    fn resolve_group(
        &self,
        graph: &ProvenanceGraph,
        declared: i64,
        primary: usize,
        members: &[usize],
        fresh: &mut FreshIds,
    ) -> (i64, Verdict);

    /// Resolves every declared group of the event, in increasing declared id.
    fn resolve(&self, graph: &ProvenanceGraph) -> Result<ResolvedGroupMap, LabelError> {
        let n = graph.len();
        let mut declared: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, p) in graph.particles().iter().enumerate() {
            declared.entry(p.group_id).or_default().push(i);
        }

        let max_declared = declared.keys().next_back().copied().unwrap_or(-1);
        let first_fresh = (n as i64).max(max_declared) + 1;
        let mut fresh = FreshIds::starting_at(first_fresh);

        let mut mapping = BTreeMap::new();
        let mut per_particle = vec![0i64; n];
        let mut decisions = Vec::with_capacity(declared.len());

        for (g, members) in declared {
            let primary = graph.index(g).ok_or_else(|| {
                LabelError::mismatch(format!(
                    "group {} declared by particle {} names no particle",
                    g, members[0]
                ))
            })?;

            let (resolved, verdict) = self.resolve_group(graph, g, primary, &members, &mut fresh);
            debug!(policy = self.name(), declared = g, resolved, ?verdict, size = members.len(), "resolved group");

            for &m in &members {
                per_particle[m] = resolved;
            }
            mapping.insert(g, resolved);
            decisions.push(GroupDecision { declared: g, resolved, verdict, members });
        }

        Ok(ResolvedGroupMap { mapping, per_particle, decisions, first_fresh })
    }
}

/// Earliest created particle, the lowest id winning ties.
fn earliest<I: IntoIterator<Item = usize>>(graph: &ProvenanceGraph, ids: I) -> Option<usize> {
    ids.into_iter()
        .min_by_key(|&i| OrderedFloat(graph.particle(i).first_step_time))
}

/// Checks shared by every policy: shape gate and origin veto.
fn gate(graph: &ProvenanceGraph, declared: i64, primary: usize, fresh: &mut FreshIds) -> Option<(i64, Verdict)> {
    let p = graph.particle(primary);
    if !p.shape.is_em_like() {
        return Some((declared, Verdict::Exempt));
    }
    if p.has_vetoed_origin() {
        return Some((fresh.next_id(), Verdict::ProcessVeto));
    }
    None
}

/// Purity-first veto chain: a shower group keeps its declared primary only if
/// that primary has a clean origin, deposited voxels and was created first.
#[derive(Clone, Debug, Default)]
pub struct VetoChainPolicy;

impl GroupResolutionPolicy for VetoChainPolicy {
    fn name(&self) -> &'static str {
        "veto_chain"
    }

    fn resolve_group(
        &self,
        graph: &ProvenanceGraph,
        declared: i64,
        primary: usize,
        members: &[usize],
        fresh: &mut FreshIds,
    ) -> (i64, Verdict) {
        if let Some(outcome) = gate(graph, declared, primary, fresh) {
            return outcome;
        }
        if graph.voxel_count(primary) == 0 {
            return (fresh.next_id(), Verdict::EmptyPrimary);
        }
        match earliest(graph, members.iter().copied()) {
            Some(first) if first == primary => (declared, Verdict::Kept),
            _ => (fresh.next_id(), Verdict::NotEarliest),
        }
    }
}

/// Hands the group to its earliest member that deposited voxels.
#[derive(Clone, Debug, Default)]
pub struct EarliestNonEmptyPolicy;

impl GroupResolutionPolicy for EarliestNonEmptyPolicy {
    fn name(&self) -> &'static str {
        "earliest_non_empty"
    }

    fn resolve_group(
        &self,
        graph: &ProvenanceGraph,
        declared: i64,
        primary: usize,
        members: &[usize],
        fresh: &mut FreshIds,
    ) -> (i64, Verdict) {
        if let Some(outcome) = gate(graph, declared, primary, fresh) {
            return outcome;
        }
        let non_empty = members.iter().copied().filter(|&m| graph.voxel_count(m) > 0);
        match earliest(graph, non_empty) {
            Some(first) if first == primary => (declared, Verdict::Kept),
            Some(first) => (first as i64, Verdict::Reassigned),
            None => (fresh.next_id(), Verdict::NoVoxels),
        }
    }
}

/// Hands the group to the ancestor that parents most of its voxels.
///
/// Every member climbs towards the declared primary and remembers the
/// furthest non-empty ancestor created before itself.
#[derive(Clone, Debug)]
pub struct AncestorFractionPolicy {
    pub threshold: f64,
}

impl Default for AncestorFractionPolicy {
    fn default() -> Self {
        AncestorFractionPolicy { threshold: 0.5 }
    }
}

impl AncestorFractionPolicy {
    fn visible_parent(&self, graph: &ProvenanceGraph, member: usize, primary: usize) -> usize {
        let t = graph.particle(member).first_step_time;
        let mut parent = member;
        for a in graph.ancestry_until(member, primary) {
            if graph.voxel_count(a) > 0 && graph.particle(a).first_step_time < t {
                parent = a;
            }
        }
        parent
    }
}

impl GroupResolutionPolicy for AncestorFractionPolicy {
    fn name(&self) -> &'static str {
        "ancestor_fraction"
    }

    fn resolve_group(
        &self,
        graph: &ProvenanceGraph,
        declared: i64,
        primary: usize,
        members: &[usize],
        fresh: &mut FreshIds,
    ) -> (i64, Verdict) {
        if let Some(outcome) = gate(graph, declared, primary, fresh) {
            return outcome;
        }

        let mut owned: BTreeMap<usize, usize> = BTreeMap::new();
        for &m in members {
            *owned.entry(self.visible_parent(graph, m, primary)).or_default() += graph.voxel_count(m);
        }
        let total: usize = owned.values().sum();
        if total == 0 {
            return (declared, Verdict::NoVoxels);
        }

        // first maximum wins, i.e. the lowest parent id
        let mut best = (primary, 0usize);
        for (&parent, &size) in &owned {
            if size > best.1 {
                best = (parent, size);
            }
        }

        let fraction = best.1 as f64 / total as f64;
        if fraction > self.threshold {
            if best.0 == primary {
                (declared, Verdict::Kept)
            } else {
                (best.0 as i64, Verdict::Reassigned)
            }
        } else {
            (fresh.next_id(), Verdict::WeakParent)
        }
    }
}

/// Instantiates the policy selected by the configuration.
pub fn policy_for(config: &LabelConfig) -> Box<dyn GroupResolutionPolicy> {
    match config.policy {
        PolicyKind::VetoChain => Box::new(VetoChainPolicy),
        PolicyKind::EarliestNonEmpty => Box::new(EarliestNonEmptyPolicy),
        PolicyKind::AncestorFraction => Box::new(AncestorFractionPolicy {
            threshold: config.fraction_threshold,
        }),
    }
}
