use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::data::record::{EventRecord, LabelRow};
use crate::error::EventIoError;

/// Reader for JSON-lines event files, one `EventRecord` per line.
#[derive(Debug, Clone)]
pub struct EventFileHandle {
    pub path: PathBuf,
}

impl EventFileHandle {
    pub fn open(path: &Path) -> Result<Self, EventIoError> {
        // fail early on missing files
        File::open(path)?;
        Ok(Self { path: path.to_path_buf() })
    }

    /// Reads every event of the file; blank lines are skipped.
    pub fn read_events(&self) -> Result<Vec<EventRecord>, EventIoError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut events = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .map_err(|source| EventIoError::Json { line: i + 1, source })?;
            events.push(record);
        }
        info!(path = %self.path.display(), events = events.len(), "read events");
        Ok(events)
    }
}

/// Writes label rows as JSON lines.
pub fn write_label_rows(path: &Path, rows: &[LabelRow]) -> Result<(), EventIoError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes events as JSON lines.
pub fn write_events(path: &Path, events: &[EventRecord]) -> Result<(), EventIoError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for event in events {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxcore::data::event::EventInput;
    use voxcore::data::particle::{ParticleRecord, Shape};
    use voxcore::data::tensor::SparseTensor;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("voxio-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_events_survive_a_file() {
        let event = EventInput::new(
            vec![ParticleRecord::new(0, 0, Shape::Track).with_time(1.25)],
            vec![SparseTensor::filled(vec![[1, 2, 3]], 4.0)],
        );
        let path = temp_path("events.jsonl");
        write_events(&path, &[EventRecord::from(&event), EventRecord::from(&event)]).unwrap();

        let events = EventFileHandle::open(&path).unwrap().read_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].particles[0].first_step_time, 1.25);
        assert_eq!(events[1].clusters[0].coords, vec![[1, 2, 3]]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let path = temp_path("bad.jsonl");
        std::fs::write(&path, "\n{not json}\n").unwrap();
        let err = EventFileHandle::open(&path).unwrap().read_events().unwrap_err();
        assert!(matches!(err, EventIoError::Json { line: 2, .. }));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        assert!(EventFileHandle::open(&temp_path("missing.jsonl")).is_err());
    }
}
