//! Structured log events for the attempt lifecycle.
//!
//! Each attempt runs inside a `selftagger.attempt` span. Events carry an
//! `event` field so they can be filtered in JSON output
//! (`SELFTAGGER_LOG_FORMAT=json`).

use tracing::{info, warn};

use crate::domain::{InFlight, PublishReceipt, SelectedTag};
use crate::pipeline::AttemptFailure;

/// Span covering one attempt.
pub fn attempt_span(attempt: u32, max_attempts: u32) -> tracing::Span {
    tracing::info_span!("selftagger.attempt", attempt = attempt, max_attempts = max_attempts)
}

pub fn emit_attempt_started(attempt: u32, max_attempts: u32) {
    info!(event = "attempt.started", attempt = attempt, max_attempts = max_attempts);
}

pub fn emit_tag_selected(selected: &SelectedTag) {
    info!(
        event = "tag.selected",
        tag = %selected.tag,
        source = %selected.source,
        quoted = selected.quoted,
    );
}

/// JSON form of an in-flight snapshot; `None` when nothing was produced.
pub fn in_flight_json(in_flight: &InFlight) -> Option<String> {
    if in_flight.is_empty() {
        None
    } else {
        serde_json::to_string(in_flight).ok()
    }
}

/// Logs the failure with whatever data the attempt had in flight.
pub fn emit_attempt_failed(attempt: u32, max_attempts: u32, failure: &AttemptFailure) {
    let in_flight = in_flight_json(&failure.in_flight);
    warn!(
        event = "attempt.failed",
        attempt = attempt,
        max_attempts = max_attempts,
        stage = %failure.stage,
        kind = failure.error.kind(),
        error = %failure.error,
        in_flight = in_flight.as_deref().unwrap_or("none"),
    );
}

pub fn emit_run_succeeded(attempts: u32, receipt: &PublishReceipt) {
    info!(
        event = "run.succeeded",
        attempts = attempts,
        id = %receipt.generated_id,
        tag = %receipt.tag,
    );
}

pub fn emit_run_exhausted(attempts: u32, last_failure: &AttemptFailure) {
    let in_flight = in_flight_json(&last_failure.in_flight);
    tracing::error!(
        event = "run.exhausted",
        attempts = attempts,
        stage = %last_failure.stage,
        error = %last_failure.error,
        in_flight = in_flight.as_deref().unwrap_or("none"),
    );
}
