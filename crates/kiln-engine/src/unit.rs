//! The closed set of buildable unit kinds.
//!
//! Unit kinds are tagged variants selected at manifest-load time; all of
//! them speak the same staleness/build/clean contract.

use std::path::PathBuf;
use std::time::SystemTime;

use crate::copy::CopyTask;
use crate::error::EngineError;
use crate::launcher::LauncherTask;
use crate::native::NativeLibraryTask;
use crate::task::{BuildTask, StalenessVerdict};

/// A declared buildable unit of any kind.
#[derive(Debug, Clone)]
pub enum BuildUnit {
    Launcher(LauncherTask),
    Native(NativeLibraryTask),
    Copy(CopyTask),
}

impl BuildUnit {
    fn task(&self) -> &dyn BuildTask {
        match self {
            Self::Launcher(t) => t,
            Self::Native(t) => t,
            Self::Copy(t) => t,
        }
    }

    /// Names of the unit's declared upstream dependencies, in order.
    pub fn deps(&self) -> &[String] {
        match self {
            Self::Launcher(t) => t.deps(),
            Self::Native(t) => t.deps(),
            Self::Copy(t) => t.deps(),
        }
    }

    /// The directory this unit contributes to dependents: launchers and
    /// copies expose their output directory, native libraries their install
    /// directory.
    pub fn output_root(&self) -> PathBuf {
        match self {
            Self::Launcher(t) => t.output_dir().to_path_buf(),
            Self::Native(t) => t.install_dir().to_path_buf(),
            Self::Copy(t) => t.output_dir().to_path_buf(),
        }
    }
}

impl BuildTask for BuildUnit {
    fn name(&self) -> &str {
        self.task().name()
    }

    fn outputs(&self) -> Vec<PathBuf> {
        self.task().outputs()
    }

    fn needs_build(
        &self,
        newest_input: Option<SystemTime>,
    ) -> Result<StalenessVerdict, EngineError> {
        self.task().needs_build(newest_input)
    }

    fn build(&self) -> Result<(), EngineError> {
        self.task().build()
    }

    fn clean(&self, for_build: bool) -> Result<(), EngineError> {
        self.task().clean(for_build)
    }
}
