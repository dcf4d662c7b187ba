use chrono::{DateTime, Utc};

use crate::error::CjlError;
use crate::event::{self, NormalizedEvent, RawEnvelope};

/// Normalize one page of envelopes, fail-fast: a single undecodable record
/// aborts the run rather than being skipped.
pub fn normalize_page(envelopes: Vec<RawEnvelope>) -> Result<Vec<NormalizedEvent>, CjlError> {
    envelopes.into_iter().map(event::normalize).collect()
}

/// Forced-order mode: sort the fully materialized stream ascending by the
/// decoded message's own `timestamp`. Every event must carry one; an event
/// without it fails the whole run. The sort is stable, so events sharing a
/// timestamp keep their arrival order.
pub fn sort_by_message_timestamp(events: &mut [NormalizedEvent]) -> Result<(), CjlError> {
    if events.iter().any(|e| e.message_timestamp().is_none()) {
        return Err(CjlError::KeyMissing("timestamp"));
    }
    events.sort_by_key(|e| {
        e.message_timestamp()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    });
    Ok(())
}
