//! Gateway response formats and their reconciliation into outcomes.

use std::collections::HashMap;

use serde::Deserialize;
use url::form_urlencoded;

use super::outcome::{BatchOutcome, Outcome, Replacement};
use crate::error::PushError;

/// JSON answer to a multi-recipient request
#[derive(Debug, Clone, Deserialize)]
pub struct MulticastResponse {
    pub multicast_id: i64,
    pub success: u64,
    pub failure: u64,
    #[serde(default)]
    pub canonical_ids: u64,
    pub results: Vec<SlotResult>,
}

/// Per-recipient entry of `MulticastResponse::results`, positional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotResult {
    pub message_id: Option<String>,
    pub registration_id: Option<String>,
    pub error: Option<String>,
}

/// Parse newline-delimited `key=value` pairs.
fn parse_form_lines(body: &str) -> HashMap<String, String> {
    body.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .flat_map(|line| form_urlencoded::parse(line.as_bytes()).into_owned())
        .collect()
}

/// Reconcile the answer to a single-recipient (form) request.
pub fn reconcile_form_response(body: &str, recipient: &str) -> Result<Outcome, PushError> {
    let mut fields = parse_form_lines(body);

    if let Some(id) = fields.remove("id") {
        return Ok(match fields.remove("registration_id") {
            Some(replacement) => Outcome::replaced(id, recipient, replacement),
            None => Outcome::delivered(id),
        });
    }

    if let Some(error) = fields.remove("Error") {
        return Ok(Outcome::failed(error));
    }

    Err(PushError::Parse(format!(
        "response has neither id nor Error: {body:?}"
    )))
}

/// Reconcile the answer to one structured request against the identifiers
/// that were submitted in it.
pub fn reconcile_multicast_response(
    body: &str,
    submitted: &[String],
) -> Result<BatchOutcome, PushError> {
    let response: MulticastResponse = serde_json::from_str(body)
        .map_err(|e| PushError::Parse(format!("invalid multicast response: {e}")))?;

    if response.results.len() != submitted.len() {
        return Err(PushError::Parse(format!(
            "gateway returned {} results for {} recipients",
            response.results.len(),
            submitted.len()
        )));
    }

    let mut outcome = BatchOutcome::new();
    outcome.record_batch_id(response.multicast_id);
    outcome.add_successes(response.success);

    for (slot, recipient) in response.results.into_iter().zip(submitted) {
        if let Some(new_recipient_id) = slot.registration_id {
            let gateway_message_id = slot.message_id.ok_or_else(|| {
                PushError::Parse(format!(
                    "replacement for {recipient} is missing its message_id"
                ))
            })?;
            outcome.record_replacement(Replacement {
                gateway_message_id,
                original_recipient_id: recipient.clone(),
                new_recipient_id,
            });
        } else if let Some(error) = slot.error {
            outcome.record_failure(error, recipient.as_str());
        }
    }

    if outcome.failure_count() != response.failure {
        tracing::debug!(
            multicast_id = response.multicast_id,
            reported = response.failure,
            counted = outcome.failure_count(),
            "Gateway failure count differs from per-slot errors"
        );
    }

    Ok(outcome)
}
