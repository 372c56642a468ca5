//! Outer surfaces: the request facade and the file formats the CLI speaks.

pub mod api;
pub mod csv;
pub mod jsonl;
