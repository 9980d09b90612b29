//! The staleness/build/clean contract every buildable unit satisfies.

use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::EngineError;

/// The boolean-plus-reason result of asking whether a unit's outputs are
/// current. Produced fresh on every query, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalenessVerdict {
    pub needs_build: bool,
    pub reason: String,
}

impl StalenessVerdict {
    /// The unit must be rebuilt.
    pub fn stale(reason: impl Into<String>) -> Self {
        Self {
            needs_build: true,
            reason: reason.into(),
        }
    }

    /// The unit's outputs are current.
    pub fn up_to_date(reason: impl Into<String>) -> Self {
        Self {
            needs_build: false,
            reason: reason.into(),
        }
    }
}

/// The contract every buildable unit implements.
///
/// The host orchestrator queries `needs_build` with the newest modification
/// time among the unit's upstream inputs, invokes `build` on a stale verdict,
/// and propagates `newest_output` to dependents. `clean` runs on explicit
/// request or before a forced rebuild. Concurrent calls on the same unit are
/// not supported; the caller serializes them.
pub trait BuildTask {
    /// The unit's declared name.
    fn name(&self) -> &str;

    /// Declared output paths, fixed at manifest load. Used both to test
    /// existence and to report the newest output to dependents.
    fn outputs(&self) -> Vec<PathBuf>;

    /// Decide whether the unit must be rebuilt. A pure query: reads the
    /// filesystem, never writes it.
    ///
    /// # Errors
    /// Returns an error only for failures unrelated to the staleness
    /// question itself; an unreadable output is a stale verdict, not an
    /// error.
    fn needs_build(&self, newest_input: Option<SystemTime>)
        -> Result<StalenessVerdict, EngineError>;

    /// Produce all declared outputs. After a successful build a subsequent
    /// `needs_build` reports up to date.
    ///
    /// # Errors
    /// Returns an error if any step fails; the unit is then not recorded as
    /// built.
    fn build(&self) -> Result<(), EngineError>;

    /// Remove outputs and intermediate state so that `needs_build` reports
    /// stale. `for_build` marks a clean that precedes an imminent rebuild;
    /// implementations may skip redundant steps but correctness must not
    /// depend on it. Absent targets are not an error.
    ///
    /// # Errors
    /// Returns an error if existing state cannot be removed.
    fn clean(&self, for_build: bool) -> Result<(), EngineError>;

    /// Newest modification time among declared outputs that exist.
    fn newest_output(&self) -> Option<SystemTime> {
        self.outputs().iter().filter_map(|p| kiln_util::fs::mtime(p)).max()
    }
}

/// Generic timestamp-based staleness check over declared outputs.
///
/// Stale when any output is missing or older than `newest_input`. An output
/// whose metadata cannot be read counts as missing (fail-open toward
/// rebuilding).
pub fn check_outputs(outputs: &[PathBuf], newest_input: Option<SystemTime>) -> StalenessVerdict {
    for path in outputs {
        let Some(mtime) = kiln_util::fs::mtime(path) else {
            return StalenessVerdict::stale(format!("{} does not exist", path.display()));
        };
        if let Some(input) = newest_input {
            if mtime < input {
                return StalenessVerdict::stale(format!(
                    "{} is older than its inputs",
                    path.display()
                ));
            }
        }
    }
    StalenessVerdict::up_to_date("up to date")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::time::{Duration, SystemTime};

    use super::*;

    #[test]
    fn missing_output_is_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("out.bin");

        let verdict = check_outputs(&[missing.clone()], None);
        assert!(verdict.needs_build);
        assert!(verdict.reason.contains("does not exist"));
    }

    #[test]
    fn existing_output_without_inputs_is_current() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out.bin");
        fs::write(&out, b"built").unwrap();

        let verdict = check_outputs(&[out], None);
        assert!(!verdict.needs_build);
        assert_eq!(verdict.reason, "up to date");
    }

    #[test]
    fn output_older_than_input_is_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out.bin");
        fs::write(&out, b"built").unwrap();

        let future = SystemTime::now() + Duration::from_secs(3600);
        let verdict = check_outputs(&[out], Some(future));
        assert!(verdict.needs_build);
        assert!(verdict.reason.contains("older than its inputs"));
    }

    #[test]
    fn output_newer_than_input_is_current() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out.bin");
        fs::write(&out, b"built").unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        let verdict = check_outputs(&[out], Some(past));
        assert!(!verdict.needs_build);
    }

    #[test]
    fn first_missing_output_names_the_path() {
        let tmp = tempfile::tempdir().unwrap();
        let present = tmp.path().join("a.bin");
        fs::write(&present, b"x").unwrap();
        let missing = tmp.path().join("b.bin");

        let verdict = check_outputs(&[present, missing.clone()], None);
        assert!(verdict.needs_build);
        assert!(verdict.reason.contains("b.bin"));
    }

    #[test]
    fn verdict_constructors() {
        let stale = StalenessVerdict::stale("x does not exist");
        assert!(stale.needs_build);
        let fresh = StalenessVerdict::up_to_date("up to date");
        assert!(!fresh.needs_build);
    }
}
