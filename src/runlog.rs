//! Run-scoped progress log.
//!
//! Every line goes to `run.log` in the output directory and is mirrored to the
//! `log` facade, so console output keeps following `RUST_LOG`.

use chrono::Utc;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::results::timestamp;

pub struct RunLog {
    file: Option<BufWriter<File>>,
}

impl RunLog {
    /// Create (or truncate) the log file at `path`
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            file: Some(BufWriter::new(file)),
        })
    }

    /// A log that only forwards to the `log` facade
    pub fn console_only() -> Self {
        Self { file: None }
    }

    pub fn info(&mut self, message: &str) {
        ::log::info!("{}", message);
        self.write_line("INFO", message);
    }

    pub fn warn(&mut self, message: &str) {
        ::log::warn!("{}", message);
        self.write_line("WARNING", message);
    }

    fn write_line(&mut self, level: &str, message: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let line = format!("{} | {} | {}\n", timestamp(Utc::now()), level, message);
        let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        if let Err(e) = written {
            ::log::error!("Failed to write run log, disabling it: {}", e);
            self.file = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_timestamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let mut log = RunLog::create(&path).unwrap();
        log.info("[1] https://example.com/ -> success");
        log.warn("sitemap was empty");
        drop(log);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" | INFO | [1] https://example.com/ -> success"));
        assert!(lines[1].ends_with(" | WARNING | sitemap was empty"));
        let stamp = lines[0].split(" | ").next().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_console_only_does_not_panic() {
        let mut log = RunLog::console_only();
        log.info("hello");
    }
}
