//! Serialized forms of diff results.

pub mod json;
pub mod json_lines;
