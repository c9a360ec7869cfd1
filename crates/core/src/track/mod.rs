//! Track requests and the filesystem-facing names derived from them.
//!
//! Titles and artists come from third-party catalog data, so every value
//! that ends up in a path goes through [`sanitize`] first.

mod sanitize;
mod types;

pub use sanitize::{sanitize, sanitize_or};
pub use types::{AudioFormat, NamingPattern, TrackRequest};
