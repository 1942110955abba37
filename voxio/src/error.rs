use thiserror::Error;
use voxcore::LabelError;

/// Errors raised while reading, labeling or writing event files.
#[derive(Error, Debug)]
pub enum EventIoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Label(#[from] LabelError),
}
