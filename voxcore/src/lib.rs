// data module
pub mod data {
    pub mod particle;
    pub mod tensor;
    pub mod event;
    pub mod labels;
}

// algorithm module
pub mod algorithm {
    pub mod alignment;
    pub mod provenance;
    pub mod group;
    pub mod interaction;
    pub mod neutrino;
    pub mod assembler;
}

pub mod constants;
pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{LabelConfig, PolicyKind};
pub use error::LabelError;
pub use pipeline::{EventLabels, LabelPipeline};
