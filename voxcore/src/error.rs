use thiserror::Error;

/// Errors raised while labeling an event.
///
/// Heuristic decisions (demotions, time ties) never produce an error; only
/// structural problems with the inputs do.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LabelError {
    #[error("input mismatch: {0}")]
    InputMismatch(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("event {index}: {source}")]
    Event {
        index: usize,
        #[source]
        source: Box<LabelError>,
    },
}

impl LabelError {
    pub fn mismatch(reason: impl Into<String>) -> Self {
        LabelError::InputMismatch(reason.into())
    }

    /// Tags the error with the index of the event that produced it.
    pub fn in_event(self, index: usize) -> Self {
        match self {
            // keep the innermost index
            LabelError::Event { .. } => self,
            other => LabelError::Event {
                index,
                source: Box::new(other),
            },
        }
    }

    pub fn event_index(&self) -> Option<usize> {
        match self {
            LabelError::Event { index, .. } => Some(*index),
            _ => None,
        }
    }
}
