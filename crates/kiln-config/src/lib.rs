#![forbid(unsafe_code)]
//! Parse and validate `kiln.toml`.

pub mod manifest;

pub use manifest::{Manifest, ManifestError, UnitDecl};
