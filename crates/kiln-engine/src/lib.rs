#![forbid(unsafe_code)]
//! The incremental build-task core: the staleness/build/clean contract and
//! its concrete unit kinds, plus the driver that walks the unit graph.

pub mod build;
pub mod copy;
pub mod error;
pub mod launcher;
pub mod native;
pub mod plan;
pub mod task;
pub mod unit;

pub use build::{build, build_units, clean, clean_units, status, status_units, BuildOptions, BuildReport, UnitOutcome, UnitReport};
pub use error::EngineError;
pub use plan::{plan_units, BuildPlan};
pub use task::{BuildTask, StalenessVerdict};
pub use unit::BuildUnit;
