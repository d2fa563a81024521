//! Result cache decorator.
//!
//! Memoises resolution results keyed by a SHA-256 hash of the catalog
//! fingerprint and the serialized request, optionally persisting them as
//! JSON files for regression comparison.

mod cache;

pub use cache::ResolutionCache;
