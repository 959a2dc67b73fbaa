//! Simulated-time-keyed append-only event log (spec.md §6).
//!
//! Distinct from the `log` crate's operational logging (warnings, debug
//! traces about the simulator itself): this is `Log/log.txt`, a narrative
//! of what happened inside the simulated network, keyed by simulated
//! milliseconds rather than wall-clock time. Grounded on
//! `original_source/Simulator.h`'s `log_event`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::OutputError;

pub struct SimLog {
    writer: BufWriter<File>,
}

impl SimLog {
    pub fn open(dir: &Path) -> Result<Self, OutputError> {
        let log_dir = dir.join("Log");
        std::fs::create_dir_all(&log_dir).map_err(|source| OutputError::LogOpen {
            path: log_dir.clone(),
            source,
        })?;
        let path = log_dir.join("log.txt");
        let file = File::create(&path).map_err(|source| OutputError::LogOpen { path, source })?;
        Ok(SimLog {
            writer: BufWriter::new(file),
        })
    }

    /// Appends `[time ms] message` followed by a newline. Write failures are
    /// logged via the `log` crate rather than propagated: a dropped log line
    /// must never abort the simulation.
    pub fn record(&mut self, time: u64, message: impl AsRef<str>) {
        if let Err(err) = writeln!(self.writer, "[{time}] {}", message.as_ref()) {
            log::warn!("failed to write simulation log entry: {err}");
        }
    }

    pub fn flush(&mut self) {
        if let Err(err) = self.writer.flush() {
            log::warn!("failed to flush simulation log: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = SimLog::open(dir.path()).unwrap();
            log.record(42, "hello");
            log.record(43, "world");
            log.flush();
        }
        let contents = std::fs::read_to_string(dir.path().join("Log").join("log.txt")).unwrap();
        assert_eq!(contents, "[42] hello\n[43] world\n");
    }
}
