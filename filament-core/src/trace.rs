//! Debug tracing for the dependency graph.
//!
//! Setting the `REACTIVITY_DEBUG` environment variable (to anything other
//! than `0` or the empty string) turns on `tracing` events for the three
//! interesting moments in the runtime: dependency capture, subscriber
//! dispatch, and proxy creation. The variable is read once per process.

use std::sync::OnceLock;

use crate::runtime::DepKey;
use crate::value::ObjId;

static DEBUG: OnceLock<bool> = OnceLock::new();

/// Whether verbose reactivity tracing is enabled.
pub fn enabled() -> bool {
    *DEBUG.get_or_init(|| {
        std::env::var("REACTIVITY_DEBUG")
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false)
    })
}

pub(crate) fn track(kind: &'static str, id: ObjId, key: &DepKey) {
    if enabled() {
        tracing::trace!(target: "filament", kind, id = id.raw(), key = %key, "track");
    }
}

pub(crate) fn trigger(kind: &'static str, id: ObjId, key: &DepKey, subscribers: usize) {
    if enabled() {
        tracing::trace!(
            target: "filament",
            kind,
            id = id.raw(),
            key = %key,
            subscribers,
            "trigger"
        );
    }
}

pub(crate) fn create_proxy(kind: &'static str, raw_id: ObjId, proxy_id: ObjId) {
    if enabled() {
        tracing::trace!(
            target: "filament",
            kind,
            raw_id = raw_id.raw(),
            proxy_id = proxy_id.raw(),
            "create proxy"
        );
    }
}
