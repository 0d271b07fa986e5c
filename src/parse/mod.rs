//! Parsers for the formats found in timeline files.

pub mod json;
