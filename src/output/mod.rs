//! Rendering of [`FilterResult`](crate::FilterResult) for humans and tools.
//!
//! Results are plain data; these renderers never plot.

mod json;
mod terminal;

pub use json::{to_json, to_json_pretty};
pub use terminal::format_result;
