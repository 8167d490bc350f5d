//! Dedup-gated delivery of one event name.

use crate::ad::{AdType, EventKind};
use crate::dedup::{DedupScope, EventDedupStore};
use crate::ui::AnalyticsSink;

/// Send the session key, then the page key, for `event_name`.
///
/// Each key is gated independently by the store; a key already present is
/// skipped without affecting the other. `live` is checked before each key
/// so a session disposed mid-delivery neither sends nor consumes keys.
///
/// Returns the keys forwarded to the sink.
pub(crate) fn emit_event(
    store: &EventDedupStore,
    sink: &dyn AnalyticsSink,
    ad_type: &AdType,
    kind: EventKind,
    event_name: &str,
    live: impl Fn() -> bool,
) -> Vec<String> {
    if event_name.is_empty() {
        return Vec::new();
    }

    let mut sent = Vec::with_capacity(DedupScope::ALL.len());
    for scope in DedupScope::ALL {
        if !live() {
            tracing::trace!(ad_type = %ad_type, "Session disposed during delivery");
            break;
        }

        let key = ad_type.event_key(kind, scope, event_name);
        if store.try_emit(scope, &key) {
            tracing::debug!(ad_type = %ad_type, scope = %scope, key = %key, "Event sent");
            sink.send(&key);
            sent.push(key);
        } else {
            tracing::trace!(scope = %scope, key = %key, "Already sent in scope");
        }
    }
    sent
}
