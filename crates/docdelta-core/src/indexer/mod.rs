//! Source discovery, fingerprinting, and per-language symbol extraction.

pub mod extractor;
pub mod filesystem;
pub mod fingerprint;
pub mod languages;
pub mod params;
pub mod pipeline;
pub mod registry;
pub(crate) mod scanner;
