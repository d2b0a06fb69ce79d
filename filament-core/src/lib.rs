//! Filament Core
//!
//! This crate implements a fine-grained reactivity runtime over a dynamic
//! value model. It provides:
//!
//! - Observable cells (`ref_`) and observable containers/objects
//!   (`reactive`)
//! - Lazy memoized derived values (`computed`)
//! - Subscribers that re-run when their dependencies change (`effect`,
//!   `watch`, `watch_effect`)
//! - Transparent JSON serialization that unwraps refs
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: The dynamic value model shared by everything else
//! - `runtime`: Dependency graph and the active-subscriber stack
//! - `reactive`: Transparent proxies over raw containers and objects
//! - `refs` / `computed` / `effect` / `watch`: The observable primitives
//! - `json`: Serialization interop
//!
//! # Example
//!
//! ```rust
//! use filament_core::{computed, effect, reactive, Value};
//!
//! let state = reactive(Value::map([("count", 0)]));
//!
//! let doubled = {
//!     let state = state.clone();
//!     computed(move || {
//!         let count = state.get_item("count").unwrap().as_int().unwrap();
//!         Value::Int(count * 2)
//!     })
//! };
//!
//! // Effects run immediately and re-run when their dependencies change.
//! {
//!     let doubled = doubled.clone();
//!     effect(move || {
//!         let _ = doubled.get().unwrap();
//!     });
//! }
//!
//! state.set_item("count", 5).unwrap();
//! assert_eq!(doubled.get().unwrap(), Value::Int(10));
//! ```
//!
//! # Threading
//!
//! The runtime is synchronous and single-threaded cooperative: dependency
//! capture uses a thread-local subscriber stack, and no ordering guarantees
//! are made for concurrent mutation from multiple OS threads.

pub mod computed;
pub mod effect;
pub mod error;
pub mod json;
pub mod reactive;
pub mod refs;
pub mod runtime;
pub mod trace;
pub mod value;
pub mod watch;

pub use computed::{computed, is_computed_ref, is_readonly, ComputedValue};
pub use effect::{effect, Effect, EffectId};
pub use error::{Error, Result};
pub use json::{to_json, to_json_with};
pub use reactive::{
    buffer_view, deep_to_raw, is_marked_raw, is_reactive, mark_raw, reactive, release, to_raw,
    MapItems, MapValues, ReactiveProxy, ValueIter,
};
pub use refs::{deep_unref, is_ref, ref_, unref, RefValue};
pub use runtime::{is_tracking, DepKey};
pub use value::{Key, ObjId, ObjectShape, ObjectShapeBuilder, ObjectValue, Value};
pub use watch::{
    watch, watch_effect, watch_effect_with, watch_many, OnCleanup, StopHandle, WatchCallback,
    WatchOptions, WatchSource,
};

/// Crate version, from the manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
