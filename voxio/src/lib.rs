// src/lib.rs
pub mod data {
    pub mod record;
    pub mod handle;
}

pub mod batch;
pub mod error;

pub use batch::{process_events, process_records, BatchSummary};
pub use error::EventIoError;
