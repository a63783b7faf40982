//! Spans for relay calls.
//!
//! Each logical call gets a `relay_call` span with a fresh call ID, so the
//! selection, attempts and fallbacks it triggers correlate in the logs.

use tracing::Span;
use uuid::Uuid;

use crate::transform::LogicalRequest;

/// Span covering one logical call and all its attempts.
pub fn call_span(request: &LogicalRequest) -> Span {
    tracing::info_span!(
        "relay_call",
        call_id = %Uuid::new_v4(),
        method = %request.method,
        path = %request.route(),
    )
}
