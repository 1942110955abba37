use std::fmt;
use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

use crate::constants::{
    shape_label, DELTA_SHP, GHOST_SHP, LOWE_SHP, MICHEL_SHP, MUON_PDG, SHOWER_SHP, TRACK_SHP,
    UNKNOWN_SHP, VETO_PROCESSES,
};

/// Coarse semantic classification of a particle or voxel.
///
/// # Description
///
/// The numeric codes follow the simulator convention (shower = 0 .. ghost = 5).
///
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Shape {
    Shower,
    Track,
    Michel,
    Delta,
    LowEnergy,
    Ghost,
    Unknown,
}

impl Shape {
    /// Returns the `Shape` corresponding to the given simulator code.
    ///
    /// # Arguments
    ///
    /// * `code` - An integer shape code, anything unrecognised maps to `Unknown`.
    ///
    pub fn new(code: i32) -> Shape {
        match code {
            SHOWER_SHP => Shape::Shower,
            TRACK_SHP => Shape::Track,
            MICHEL_SHP => Shape::Michel,
            DELTA_SHP => Shape::Delta,
            LOWE_SHP => Shape::LowEnergy,
            GHOST_SHP => Shape::Ghost,
            _ => Shape::Unknown,
        }
    }

    /// Returns the simulator code of this shape.
    pub fn shape_numeric(&self) -> i32 {
        match self {
            Shape::Shower => SHOWER_SHP,
            Shape::Track => TRACK_SHP,
            Shape::Michel => MICHEL_SHP,
            Shape::Delta => DELTA_SHP,
            Shape::LowEnergy => LOWE_SHP,
            Shape::Ghost => GHOST_SHP,
            Shape::Unknown => UNKNOWN_SHP,
        }
    }

    /// Electromagnetic-like shapes are the only ones subject to primary purity checks.
    pub fn is_em_like(&self) -> bool {
        matches!(self, Shape::Shower | Shape::LowEnergy)
    }
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Unknown
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shape_label(self.shape_numeric()))
    }
}

/// One particle as recorded by the simulator.
///
/// Records are read-only for the lifetime of an event; `id` is expected to be
/// the position of the record in the event's particle list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub id: i64,
    pub parent_id: i64,
    pub group_id: i64,
    pub shape: Shape,
    #[serde(default)]
    pub creation_process: String,
    #[serde(default)]
    pub pdg_code: i32,
    #[serde(default)]
    pub parent_pdg_code: i32,
    #[serde(default)]
    pub first_step_time: f64,
    #[serde(default)]
    pub ancestor_position: Option<[f64; 3]>,
}

impl ParticleRecord {
    /// Creates a self-parented `primary` record with zero creation time.
    pub fn new(id: i64, group_id: i64, shape: Shape) -> Self {
        ParticleRecord {
            id,
            parent_id: id,
            group_id,
            shape,
            creation_process: "primary".to_string(),
            pdg_code: 0,
            parent_pdg_code: 0,
            first_step_time: 0.0,
            ancestor_position: None,
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_process(mut self, process: &str) -> Self {
        self.creation_process = process.to_string();
        self
    }

    pub fn with_time(mut self, first_step_time: f64) -> Self {
        self.first_step_time = first_step_time;
        self
    }

    pub fn with_pdg(mut self, pdg_code: i32, parent_pdg_code: i32) -> Self {
        self.pdg_code = pdg_code;
        self.parent_pdg_code = parent_pdg_code;
        self
    }

    pub fn with_ancestor(mut self, position: [f64; 3]) -> Self {
        self.ancestor_position = Some(position);
        self
    }

    /// True if the record has no tracked physical parent.
    pub fn is_root(&self) -> bool {
        self.parent_id == self.id
    }

    /// True if the particle stems from nuclear activity or from a muon,
    /// which disqualifies it from being a shower primary.
    pub fn has_vetoed_origin(&self) -> bool {
        VETO_PROCESSES.iter().any(|p| self.creation_process.contains(p))
            || self.parent_pdg_code.unsigned_abs() == MUON_PDG as u32
    }
}
