// Purpose: immutable lookup tables shared by the whole labeling engine

// Semantic shape codes as written by the simulator
pub const SHOWER_SHP: i32 = 0;
pub const TRACK_SHP: i32 = 1;
pub const MICHEL_SHP: i32 = 2;
pub const DELTA_SHP: i32 = 3;
pub const LOWE_SHP: i32 = 4;
pub const GHOST_SHP: i32 = 5;
pub const UNKNOWN_SHP: i32 = -1;

pub const SHAPE_LABELS: [(i32, &str); 7] = [
    (SHOWER_SHP, "Shower"),
    (TRACK_SHP, "Track"),
    (MICHEL_SHP, "Michel"),
    (DELTA_SHP, "Delta"),
    (LOWE_SHP, "Low Energy"),
    (GHOST_SHP, "Ghost"),
    (UNKNOWN_SHP, "Unknown"),
];

// Particle identification classes
pub const PID_LABELS: [(i32, &str); 7] = [
    (-1, "None"),
    (0, "Photon"),
    (1, "Electron"),
    (2, "Muon"),
    (3, "Pion"),
    (4, "Proton"),
    (5, "Kaon"),
];

// |PDG code| -> PID class
pub const PDG_TO_PID: [(i32, i32); 6] = [
    (22, 0),
    (11, 1),
    (13, 2),
    (211, 3),
    (2212, 4),
    (321, 5),
];

pub const MUON_PDG: i32 = 13;

// Creation processes that mark a shower as secondary activity
pub const VETO_PROCESSES: [&str; 2] = ["Inelastic", "Capture"];

// Parent id written by the simulator when the parent is not tracked
pub const INVALID_PARENT_ID: i64 = 65535;

/// Looks up the printable label of a shape code.
pub fn shape_label(code: i32) -> &'static str {
    SHAPE_LABELS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or("Unknown")
}

/// Maps a PDG code to its PID class, -1 if the species is not tracked.
pub fn pdg_to_pid(pdg_code: i32) -> i32 {
    let abs_code = pdg_code.unsigned_abs();
    PDG_TO_PID
        .iter()
        .find(|(pdg, _)| pdg.unsigned_abs() == abs_code)
        .map(|(_, pid)| *pid)
        .unwrap_or(-1)
}

pub fn pid_label(pid: i32) -> &'static str {
    PID_LABELS
        .iter()
        .find(|(p, _)| *p == pid)
        .map(|(_, label)| *label)
        .unwrap_or("None")
}
