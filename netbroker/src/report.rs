//! Rendering a [`BatchResult`] for the caller.
//!
//! A batch of one device prints its bare payload. Larger batches print a JSON
//! array of per-device records in inventory order. Streamed records use the
//! same shape, one compact object per line.

use serde::Serialize;

use crate::changes::ChangeResult;
use crate::error::ErrorKind;
use crate::outcome::{BatchResult, OperationOutcome, Payload};
use crate::resolver::Operation;

/// Rendered output and exit status of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: i32,
}

/// One device's entry in the multi-device report.
#[derive(Debug, Serialize)]
pub struct DeviceRecord<'a> {
    pub name: &'a str,
    pub success: bool,
    pub host: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<&'a [ChangeResult]>,
    pub error: Option<&'a str>,
    pub error_type: Option<ErrorKind>,
    pub start: String,
    pub end: String,
    pub elapsed: String,
}

impl<'a> DeviceRecord<'a> {
    pub fn new(operation: Operation, outcome: &'a OperationOutcome) -> Self {
        let mut record = Self {
            name: &outcome.name,
            success: outcome.is_success(),
            host: outcome.host.as_deref(),
            output: None,
            config: None,
            alive: None,
            changes: None,
            error: None,
            error_type: None,
            start: outcome.timing.start_str(),
            end: outcome.timing.end_str(),
            elapsed: outcome.timing.elapsed_str(),
        };

        match &outcome.result {
            Ok(Payload::Output(text)) => record.output = Some(text.as_str()),
            Ok(Payload::Config(text)) => record.config = Some(text.as_str()),
            Ok(Payload::Alive(alive)) => record.alive = Some(*alive),
            Ok(Payload::Changes(applied)) => {
                record.changes = Some(applied.changes.as_slice());
                record.output = Some(applied.output.as_str());
            }
            Err(failure) => {
                record.error = Some(failure.message.as_str());
                record.error_type = Some(failure.kind);
            }
        }

        if operation == Operation::IsAlive {
            record.alive = Some(outcome.is_alive());
        }
        record
    }
}

/// Render a batch. `pretty` indents JSON output.
pub fn render(batch: &BatchResult, pretty: bool) -> serde_json::Result<Report> {
    let exit_code = batch.exit_code();

    if let [outcome] = batch.outcomes.as_slice() {
        return render_single(batch.operation, outcome, pretty, exit_code);
    }

    let records: Vec<_> = batch
        .outcomes
        .iter()
        .map(|outcome| DeviceRecord::new(batch.operation, outcome))
        .collect();

    Ok(Report {
        stdout: Some(to_json(&records, pretty)?),
        stderr: None,
        exit_code,
    })
}

/// A single device record as one compact JSON line.
pub fn stream_record(operation: Operation, outcome: &OperationOutcome) -> serde_json::Result<String> {
    serde_json::to_string(&DeviceRecord::new(operation, outcome))
}

fn render_single(
    operation: Operation,
    outcome: &OperationOutcome,
    pretty: bool,
    exit_code: i32,
) -> serde_json::Result<Report> {
    if operation == Operation::IsAlive {
        return Ok(Report {
            stdout: Some(outcome.is_alive().to_string()),
            stderr: None,
            exit_code,
        });
    }

    let stdout = match &outcome.result {
        Ok(Payload::Output(text)) | Ok(Payload::Config(text)) => text.clone(),
        Ok(Payload::Alive(alive)) => alive.to_string(),
        Ok(Payload::Changes(applied)) => to_json(&applied.changes, pretty)?,
        Err(failure) => {
            return Ok(Report {
                stdout: None,
                stderr: Some(format!("Error: {}", failure.message)),
                exit_code,
            });
        }
    };

    Ok(Report {
        stdout: Some(stdout),
        stderr: None,
        exit_code,
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
