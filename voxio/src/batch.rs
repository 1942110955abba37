use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use tracing::{info, warn};

use voxcore::data::event::EventInput;
use voxcore::{EventLabels, LabelConfig, LabelError, LabelPipeline};

use crate::data::record::EventRecord;
use crate::error::EventIoError;

/// Labels every event in parallel.
///
/// # Arguments
///
/// * `events` - Events to label, results keep their order.
/// * `config` - Labeling configuration shared by every event.
/// * `num_threads` - Size of the worker pool.
///
/// # Returns
///
/// * One result per event; failures carry the index of their event.
///
pub fn process_events(
    events: &[EventInput],
    config: &LabelConfig,
    num_threads: usize,
) -> Result<Vec<Result<EventLabels, LabelError>>, EventIoError> {
    let pipeline = LabelPipeline::new(config.clone())?;
    let thread_pool = ThreadPoolBuilder::new().num_threads(num_threads).build()?;

    let results = thread_pool.install(|| {
        events
            .par_iter()
            .enumerate()
            .map(|(i, event)| pipeline.label_event(event).map_err(|e| e.in_event(i)))
            .collect()
    });

    Ok(results)
}

/// Same as `process_events`, converting raw records first.
pub fn process_records(
    records: Vec<EventRecord>,
    config: &LabelConfig,
    num_threads: usize,
) -> Result<Vec<Result<EventLabels, LabelError>>, EventIoError> {
    let pipeline = LabelPipeline::new(config.clone())?;
    let thread_pool = ThreadPoolBuilder::new().num_threads(num_threads).build()?;

    let results = thread_pool.install(|| {
        records
            .into_par_iter()
            .enumerate()
            .map(|(i, record)| {
                EventInput::try_from(record)
                    .and_then(|event| pipeline.label_event(&event))
                    .map_err(|e| e.in_event(i))
            })
            .collect()
    });

    Ok(results)
}

/// Counts of one batch run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub events: usize,
    pub labeled: usize,
    pub failed: usize,
    pub voxels: usize,
    pub demoted_groups: usize,
    pub nu_events: usize,
}

impl BatchSummary {
    pub fn new(results: &[Result<EventLabels, LabelError>]) -> Self {
        let mut summary = BatchSummary { events: results.len(), ..BatchSummary::default() };
        for result in results {
            match result {
                Ok(labels) => {
                    summary.labeled += 1;
                    summary.voxels += labels.tensor.len();
                    summary.demoted_groups += labels.groups.num_demoted();
                    if labels.nu_interaction.is_some() {
                        summary.nu_events += 1;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(event = ?e.event_index(), error = %e, "event failed");
                }
            }
        }
        summary
    }

    pub fn log(&self) {
        info!(
            events = self.events,
            labeled = self.labeled,
            failed = self.failed,
            voxels = self.voxels,
            demoted = self.demoted_groups,
            nu_events = self.nu_events,
            "batch finished"
        );
    }
}
