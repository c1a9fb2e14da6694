//! # Filter Chain System
//!
//! Declarative filter specs from the settings document are resolved through
//! a registry into bound, callable image transforms. A chain is resolved
//! once and then applied per frame.
//!
//! ## Spec grammar
//!
//! ```toml
//! foreground_filters = [
//!     "grayscale",                      # no parameters
//!     ["blur", [3.5]],                  # positional parameters
//!     ["brightness", {factor = 1.2}],   # keyword parameters
//! ]
//! ```
//!
//! Unknown filter names fail resolution immediately; a registered filter
//! with mismatched parameters is dropped from the chain with a warning.

pub mod builtin;
pub mod registry;
pub mod spec;

// Re-exports for convenience
pub use registry::{BoundFilter, FilterFn, FilterRegistry};
pub use spec::{FilterArgs, FilterParams, FilterSpec, ParamValue};

use image::RgbaImage;

/// Apply a resolved chain to a frame, in order
pub fn apply_chain(frame: &mut RgbaImage, chain: &[BoundFilter]) {
    for filter in chain {
        filter.apply(frame);
    }
}
