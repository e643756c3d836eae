use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a single page capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Success,
    Fail,
}

impl CaptureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStatus::Success => "success",
            CaptureStatus::Fail => "fail",
        }
    }
}

/// One manifest entry per attempted page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// URL that was captured
    pub url: String,

    /// Human readable name resolved from the page
    pub page_name: Option<String>,

    /// Title of the page (if available)
    pub title: Option<String>,

    /// Screenshot path relative to the output directory; `None` iff the capture failed
    pub screenshot_file: Option<String>,

    pub status: CaptureStatus,

    /// Failure detail; present iff the capture failed
    pub error: Option<String>,

    /// RFC 3339 UTC timestamp of when the capture started
    pub captured_at: String,
}

impl CaptureRecord {
    /// A successful capture
    pub fn success(
        url: String,
        page_name: String,
        title: String,
        screenshot_file: String,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url,
            page_name: Some(page_name),
            title: Some(title),
            screenshot_file: Some(screenshot_file),
            status: CaptureStatus::Success,
            error: None,
            captured_at: timestamp(captured_at),
        }
    }

    /// A failed capture carrying the failure message
    pub fn failure(url: String, error: String, captured_at: DateTime<Utc>) -> Self {
        Self {
            url,
            page_name: None,
            title: None,
            screenshot_file: None,
            status: CaptureStatus::Fail,
            error: Some(error),
            captured_at: timestamp(captured_at),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CaptureStatus::Success
    }
}

/// Aggregate counts for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Tally the records of a run
    pub fn from_records(records: &[CaptureRecord], elapsed: Duration) -> Self {
        let success = records.iter().filter(|r| r.is_success()).count();
        Self {
            total: records.len(),
            success,
            failed: records.len() - success,
            elapsed,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Everything a finished crawl hands over for persisting
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Capture records in capture order
    pub records: Vec<CaptureRecord>,
    pub summary: RunSummary,
}

impl Manifest {
    pub fn new(records: Vec<CaptureRecord>, elapsed: Duration) -> Self {
        let summary = RunSummary::from_records(&records, elapsed);
        Self { records, summary }
    }
}

/// RFC 3339 form used for every timestamp the crawler writes
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}
