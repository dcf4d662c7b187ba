use anyhow::Context;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatchlogs::Client;
use aws_sdk_cloudwatchlogs::types::FilteredLogEvent;

use crate::error::CjlError;
use crate::event::{RawEnvelope, SourceMeta};

/// Everything that goes into one FilterLogEvents query. Time bounds are
/// independently optional; only the log group is always present.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
    pub log_group: String,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub filter_pattern: Option<String>,
    pub interleaved: bool,
}

pub async fn make_client(region: Option<String>, profile: Option<String>) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(r) = region {
        loader = loader.region(Region::new(r));
    }
    if let Some(p) = profile {
        loader = loader.profile_name(p);
    }
    Client::new(&loader.load().await)
}

/// Pull result pages one at a time and hand each page's envelopes to the
/// callback, so events flow out as they arrive instead of waiting for the
/// full result set. Retry, backoff, and credential errors are the SDK's
/// business and surface unchanged.
#[allow(deprecated)] // `interleaved` is deprecated upstream but still part of the request
pub async fn for_each_page<F>(
    client: &Client,
    request: &QueryRequest,
    mut handle: F,
) -> anyhow::Result<()>
where
    F: FnMut(Vec<RawEnvelope>) -> Result<(), CjlError>,
{
    let mut pages = client
        .filter_log_events()
        .log_group_name(&request.log_group)
        .set_start_time(request.start_time)
        .set_end_time(request.end_time)
        .set_filter_pattern(request.filter_pattern.clone())
        .interleaved(request.interleaved)
        .into_paginator()
        .send();
    let mut page_no: usize = 0;
    while let Some(page) = pages.next().await {
        let page = page
            .with_context(|| format!("query failed for log group {}", request.log_group))?;
        page_no += 1;
        let batch: Vec<RawEnvelope> = page
            .events()
            .iter()
            .map(envelope_from)
            .collect::<Result<_, _>>()?;
        log::debug!("page {}: {} events", page_no, batch.len());
        handle(batch)?;
    }
    Ok(())
}

fn envelope_from(event: &FilteredLogEvent) -> Result<RawEnvelope, CjlError> {
    let message = event
        .message()
        .ok_or_else(|| CjlError::Decode {
            preview: String::new(),
            reason: "envelope has no message".to_string(),
        })?
        .to_string();
    Ok(RawEnvelope {
        message,
        source: SourceMeta {
            log_stream_name: event.log_stream_name().map(str::to_string),
            timestamp: event.timestamp(),
            ingestion_time: event.ingestion_time(),
            event_id: event.event_id().map(str::to_string),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_all_metadata() {
        let raw = FilteredLogEvent::builder()
            .log_stream_name("ls1")
            .timestamp(1_577_836_800_000)
            .ingestion_time(1_577_836_801_000)
            .event_id("ev1")
            .message(r#"{"service":"s1"}"#)
            .build();
        let env = envelope_from(&raw).unwrap();
        assert_eq!(env.message, r#"{"service":"s1"}"#);
        assert_eq!(env.source.log_stream_name.as_deref(), Some("ls1"));
        assert_eq!(env.source.timestamp, Some(1_577_836_800_000));
        assert_eq!(env.source.ingestion_time, Some(1_577_836_801_000));
        assert_eq!(env.source.event_id.as_deref(), Some("ev1"));
    }

    #[test]
    fn envelope_without_message_is_a_decode_error() {
        let raw = FilteredLogEvent::builder().timestamp(1).build();
        assert!(envelope_from(&raw).is_err());
    }
}
