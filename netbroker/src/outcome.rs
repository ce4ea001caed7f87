//! Per-device outcomes and the batch result.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::changes::AppliedChanges;
use crate::error::{DeviceError, ErrorKind};
use crate::resolver::Operation;

/// Timestamp format used in reports.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Successful operation result.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Command output text.
    Output(String),
    /// Configuration text.
    Config(String),
    /// Liveness check result.
    Alive(bool),
    /// Applied change set.
    Changes(AppliedChanges),
}

/// Classified failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<DeviceError> for Failure {
    fn from(err: DeviceError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Wall-clock timing of one device's operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub elapsed: Duration,
}

impl Timing {
    /// Zero-length timing at the current instant.
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            start: now,
            end: now,
            elapsed: Duration::ZERO,
        }
    }

    pub fn start_str(&self) -> String {
        self.start.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Elapsed time with millisecond precision, e.g. `1.234s`.
    pub fn elapsed_str(&self) -> String {
        format!("{:.3}s", self.elapsed.as_secs_f64())
    }
}

/// Result for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub name: String,
    /// Absent when resolution failed before a host was known.
    pub host: Option<String>,
    pub result: Result<Payload, Failure>,
    pub timing: Timing,
}

impl OperationOutcome {
    pub fn success(name: String, host: Option<String>, payload: Payload, timing: Timing) -> Self {
        Self {
            name,
            host,
            result: Ok(payload),
            timing,
        }
    }

    pub fn failure(
        name: String,
        host: Option<String>,
        error: impl Into<Failure>,
        timing: Timing,
    ) -> Self {
        Self {
            name,
            host,
            result: Err(error.into()),
            timing,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Liveness verdict: only a successful check counts as alive.
    pub fn is_alive(&self) -> bool {
        matches!(self.result, Ok(Payload::Alive(true)))
    }

    pub fn error(&self) -> Option<&Failure> {
        self.result.as_ref().err()
    }
}

/// Ordered outcomes for a whole batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub operation: Operation,
    pub outcomes: Vec<OperationOutcome>,
}

impl BatchResult {
    pub fn new(operation: Operation, outcomes: Vec<OperationOutcome>) -> Self {
        Self {
            operation,
            outcomes,
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Whether every device succeeded; for liveness, whether every device is alive.
    pub fn all_succeeded(&self) -> bool {
        match self.operation {
            Operation::IsAlive => self.outcomes.iter().all(OperationOutcome::is_alive),
            _ => self.outcomes.iter().all(OperationOutcome::is_success),
        }
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    /// Process exit status: 0 when everything succeeded, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.all_succeeded() { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timing() -> Timing {
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        Timing {
            start,
            end: start + chrono::Duration::milliseconds(1234),
            elapsed: Duration::from_millis(1234),
        }
    }

    #[test]
    fn test_timing_format() {
        let timing = timing();
        assert_eq!(timing.start_str(), "2024-03-09 07:05:01");
        assert_eq!(timing.end_str(), "2024-03-09 07:05:02");
        assert_eq!(timing.elapsed_str(), "1.234s");
    }

    #[test]
    fn test_exit_code_for_liveness() {
        let alive = OperationOutcome::success("a".into(), None, Payload::Alive(true), timing());
        let down = OperationOutcome::failure(
            "b".into(),
            Some("10.0.0.2".into()),
            DeviceError::Connect("unreachable".into()),
            timing(),
        );

        let batch = BatchResult::new(Operation::IsAlive, vec![alive.clone()]);
        assert_eq!(batch.exit_code(), 0);

        let batch = BatchResult::new(Operation::IsAlive, vec![alive, down]);
        assert_eq!(batch.exit_code(), 1);
        assert_eq!(batch.failed_count(), 1);
    }

    #[test]
    fn test_failure_from_device_error() {
        let failure = Failure::from(DeviceError::Commit("commit failed".into()));
        assert_eq!(failure.kind, ErrorKind::CommitError);
        assert_eq!(failure.message, "commit failed");
    }
}
