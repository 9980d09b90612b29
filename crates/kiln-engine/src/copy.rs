//! File-tree copy units with plain timestamp staleness.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use kiln_util::fs;

use crate::error::EngineError;
use crate::task::{check_outputs, BuildTask, StalenessVerdict};

/// A buildable unit copying a source tree verbatim into an output directory.
#[derive(Debug, Clone)]
pub struct CopyTask {
    name: String,
    deps: Vec<String>,
    source_dir: PathBuf,
    output_dir: PathBuf,
}

impl CopyTask {
    pub fn new(
        name: impl Into<String>,
        deps: Vec<String>,
        source_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            deps,
            source_dir,
            output_dir,
        }
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl BuildTask for CopyTask {
    fn name(&self) -> &str {
        &self.name
    }

    /// The mirrored path of every source file. Falls back to the output
    /// directory itself when the source tree cannot be enumerated, so the
    /// generic check still has something to test.
    fn outputs(&self) -> Vec<PathBuf> {
        match fs::walk_files(&self.source_dir) {
            Ok(files) if !files.is_empty() => files
                .iter()
                .filter_map(|f| f.strip_prefix(&self.source_dir).ok())
                .map(|rel| self.output_dir.join(rel))
                .collect(),
            _ => vec![self.output_dir.clone()],
        }
    }

    fn needs_build(
        &self,
        newest_input: Option<SystemTime>,
    ) -> Result<StalenessVerdict, EngineError> {
        // The source tree is an input too; fold its newest mtime into the
        // orchestrator-supplied one.
        let newest_source = fs::newest_mtime(&self.source_dir)?;
        let newest = match (newest_input, newest_source) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        Ok(check_outputs(&self.outputs(), newest))
    }

    fn build(&self) -> Result<(), EngineError> {
        // Recreate rather than overlay, so removals in the source propagate.
        fs::remove_dir_all_if_exists(&self.output_dir)?;
        fs::copy_tree(&self.source_dir, &self.output_dir)?;
        Ok(())
    }

    fn clean(&self, _for_build: bool) -> Result<(), EngineError> {
        fs::remove_dir_all_if_exists(&self.output_dir)?;
        Ok(())
    }
}
