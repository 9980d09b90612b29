//! Generated launcher scripts with content-compare staleness.
//!
//! A launcher's expected bytes derive from the current build configuration
//! (dependency locations, JVM arguments, debug flags, an environment toggle),
//! not from any upstream file's timestamp. The byte-for-byte comparison
//! against the on-disk script is the entire staleness oracle, so rebuilds
//! trigger on semantic configuration drift even when no mtime changed.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use kiln_jdk::args;
use kiln_jdk::Jdk;
use kiln_util::{fs, shell};

use crate::error::EngineError;
use crate::task::{check_outputs, BuildTask, StalenessVerdict};

/// Everything needed to compute a launcher script's expected bytes.
#[derive(Debug, Clone)]
pub struct LauncherSpec {
    /// Directory the scripts are generated into; owned by this unit and
    /// deleted wholesale on clean.
    pub output_dir: PathBuf,
    /// Script names to generate under `output_dir`.
    pub launchers: Vec<String>,
    pub main_class: String,
    /// Classpath entries, in declared dependency order.
    pub classpath: Vec<PathBuf>,
    /// Debug-attach arguments resolved from the environment at plan time.
    pub debug_args: Vec<String>,
    /// Home property name and directory, e.g.
    /// `("org.example.home", "build/home")`.
    pub home: Option<(String, PathBuf)>,
    /// Repository property name and path.
    pub repository: Option<(String, PathBuf)>,
    pub options: Vec<String>,
    /// Flag announcing the script's own path, e.g. `--launcher` emits
    /// `--launcher=<script path>`.
    pub launcher_flag: Option<String>,
    pub disable_flags: Vec<String>,
    /// Environment variable whose presence appends the flag. Read on every
    /// content computation.
    pub toggle: Option<(String, String)>,
}

/// A buildable unit generating one or more launcher scripts.
#[derive(Debug, Clone)]
pub struct LauncherTask {
    name: String,
    deps: Vec<String>,
    spec: LauncherSpec,
    jdk: Jdk,
}

impl LauncherTask {
    pub fn new(name: impl Into<String>, deps: Vec<String>, spec: LauncherSpec, jdk: Jdk) -> Self {
        Self {
            name: name.into(),
            deps,
            spec,
            jdk,
        }
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    pub fn output_dir(&self) -> &Path {
        &self.spec.output_dir
    }

    fn launcher_paths(&self) -> Vec<PathBuf> {
        self.spec
            .launchers
            .iter()
            .map(|l| self.spec.output_dir.join(l))
            .collect()
    }

    /// Expected content of the launcher at `result`, recomputed from the
    /// current configuration on every call.
    pub fn contents(&self, result: &Path) -> String {
        let mut command: Vec<String> = vec![self.jdk.java.display().to_string()];

        command.extend(args::classpath_args(&self.spec.classpath));

        if !self.spec.debug_args.is_empty() {
            command.extend(self.spec.debug_args.iter().cloned());
            command.push("-ea".to_owned());
            command.push("-esa".to_owned());
        }

        if let Some((property, dir)) = &self.spec.home {
            command.push(args::property_arg(property, &dir.display().to_string()));
        }
        if let Some((property, path)) = &self.spec.repository {
            command.push(args::property_arg(property, &path.display().to_string()));
        }

        command.push(self.spec.main_class.clone());
        command.extend(self.spec.options.iter().cloned());
        if let Some(flag) = &self.spec.launcher_flag {
            command.push(format!("{flag}={}", result.display()));
        }
        command.extend(self.spec.disable_flags.iter().cloned());
        if let Some((var, flag)) = &self.spec.toggle {
            if std::env::var_os(var).is_some() {
                command.push(flag.clone());
            }
        }

        format!("#!/usr/bin/env bash\nexec {} \"$@\"\n", shell::join(&command))
    }
}

impl BuildTask for LauncherTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn outputs(&self) -> Vec<PathBuf> {
        self.launcher_paths()
    }

    fn needs_build(
        &self,
        newest_input: Option<SystemTime>,
    ) -> Result<StalenessVerdict, EngineError> {
        // The generic timestamp check short-circuits; expected content is
        // only computed when timestamps alone say nothing.
        let generic = check_outputs(&self.launcher_paths(), newest_input);
        if generic.needs_build {
            return Ok(generic);
        }

        for result in self.launcher_paths() {
            let Ok(on_disk) = std::fs::read(&result) else {
                // Unreadable output: rebuild rather than trust it.
                return Ok(StalenessVerdict::stale(format!(
                    "{} cannot be read",
                    result.display()
                )));
            };
            if on_disk != self.contents(&result).into_bytes() {
                let name = result
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| result.display().to_string());
                return Ok(StalenessVerdict::stale(format!(
                    "command line changed for {name}"
                )));
            }
        }

        Ok(StalenessVerdict::up_to_date("up to date"))
    }

    fn build(&self) -> Result<(), EngineError> {
        fs::ensure_dir(&self.spec.output_dir)?;
        for result in self.launcher_paths() {
            std::fs::write(&result, self.contents(&result)).map_err(|source| EngineError::Io {
                path: result.display().to_string(),
                source,
            })?;
            fs::set_executable(&result)?;
        }
        Ok(())
    }

    fn clean(&self, _for_build: bool) -> Result<(), EngineError> {
        fs::remove_dir_all_if_exists(&self.spec.output_dir)?;
        Ok(())
    }
}
