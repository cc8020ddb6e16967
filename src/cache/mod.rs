//! Persistent content-addressed cache for rendered card images
//!
//! Keys are derived from everything that affects the rendered bytes:
//! the template identity, a canonical serialization of the props, and
//! the pixel dimensions. Same inputs = same key = same image, so
//! entries are never evicted and concurrent writers may race freely
//! (last write wins, all writers produce identical content).
//!
//! # Cache layout
//!
//! One file per key, raw image bytes, no metadata sidecar:
//!
//! `<root>/<namespace>/<hex-digest>.<ext>`

pub mod key;
pub mod store;

pub use key::{CacheKey, TemplateIdentity};
pub use store::CacheStore;
