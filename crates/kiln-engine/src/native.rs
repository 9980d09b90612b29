//! Native libraries built from vendored upstream source.
//!
//! The actual compilation is delegated to the upstream project's
//! configure/make/install toolchain; this unit only sequences the phases and
//! keeps rebuilds deterministic. There is no incremental native
//! recompilation: every build starts from a pristine staged copy of the
//! source.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use kiln_platform::Platform;
use kiln_util::fs;
use kiln_util::process::ProcessCommand;

use crate::error::EngineError;
use crate::task::{BuildTask, StalenessVerdict};

/// Directory roles and external-tool arguments for one native library build.
#[derive(Debug, Clone)]
pub struct NativeBuildSpec {
    /// Pristine vendored source; staged (copied, never moved) into
    /// `build_dir` on every build so it stays reusable.
    pub source_dir: PathBuf,
    /// Where configure and make run; recreated every build.
    pub build_dir: PathBuf,
    /// Final artifact location; `install_dir/lib/<lib name>` is the install
    /// marker.
    pub install_dir: PathBuf,
    /// Library base name; `ssl` installs `lib/libssl.<suffix>`.
    pub library: String,
    /// Configure program, resolved inside `build_dir` (e.g. `./Configure`).
    pub configure: String,
    /// Fixed feature flags passed to configure.
    pub configure_args: Vec<String>,
    /// Auxiliary data directory installed next to `lib`, e.g. `ssl` adds
    /// `--ssldir=<install_dir>/ssl`.
    pub data_subdir: Option<String>,
    /// Install targets passed to one make invocation.
    pub install_targets: Vec<String>,
    /// Make program; overridable for tests and exotic hosts.
    pub make: String,
}

/// A buildable unit wrapping an external multi-phase native build.
#[derive(Debug, Clone)]
pub struct NativeLibraryTask {
    name: String,
    deps: Vec<String>,
    spec: NativeBuildSpec,
    platform: Platform,
}

impl NativeLibraryTask {
    pub fn new(
        name: impl Into<String>,
        deps: Vec<String>,
        spec: NativeBuildSpec,
        platform: Platform,
    ) -> Self {
        Self {
            name: name.into(),
            deps,
            spec,
            platform,
        }
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    pub fn install_dir(&self) -> &Path {
        &self.spec.install_dir
    }

    /// The installed library file whose existence is the staleness oracle.
    pub fn library_path(&self) -> PathBuf {
        self.spec
            .install_dir
            .join("lib")
            .join(self.platform.lib_filename(&self.spec.library))
    }

    /// The full configure argument list: install prefix, data directory,
    /// `--libdir=lib`, the fixed feature flags, and the Linux-only rpath.
    pub fn configure_argv(&self) -> Vec<String> {
        let mut args = vec![format!("--prefix={}", self.spec.install_dir.display())];
        if let Some(subdir) = &self.spec.data_subdir {
            args.push(format!(
                "--{subdir}dir={}",
                self.spec.install_dir.join(subdir).display()
            ));
        }
        args.push("--libdir=lib".to_owned());
        args.extend(self.spec.configure_args.iter().cloned());
        if self.platform.needs_origin_rpath() {
            // The $$ survives into the generated Makefile, where make
            // collapses it to a literal $ORIGIN for the linker.
            args.push("-Wl,-rpath,'$$ORIGIN/../lib'".to_owned());
        }
        args
    }

    fn run_step(&self, step: &str, command: &ProcessCommand) -> Result<(), EngineError> {
        let exit = command.stream()?;
        if !exit.success {
            return Err(EngineError::StepFailed {
                unit: self.name.clone(),
                step: step.to_owned(),
                code: exit.exit_code,
            });
        }
        Ok(())
    }
}

impl BuildTask for NativeLibraryTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.library_path()]
    }

    /// Existence-only oracle: the installed library file is sufficient
    /// evidence of "already built". Timestamps and content are deliberately
    /// ignored; reconfiguring a large third-party codebase is too expensive
    /// to trigger from mtime noise. The trade-off: a changed vendored source
    /// tree is not detected without an explicit clean.
    fn needs_build(
        &self,
        _newest_input: Option<SystemTime>,
    ) -> Result<StalenessVerdict, EngineError> {
        let library = self.library_path();
        if library.exists() {
            Ok(StalenessVerdict::up_to_date(format!(
                "{} is built",
                library.display()
            )))
        } else {
            Ok(StalenessVerdict::stale(format!(
                "{} does not exist",
                library.display()
            )))
        }
    }

    fn build(&self) -> Result<(), EngineError> {
        // Rebuild-from-scratch policy: any pre-existing build/install state
        // goes first.
        self.clean(true)?;

        fs::copy_tree(&self.spec.source_dir, &self.spec.build_dir)?;

        let configure = ProcessCommand::new(&self.spec.configure)
            .args(self.configure_argv())
            .cwd(&self.spec.build_dir);
        self.run_step("configure", &configure)?;

        // Low-verbosity compile; upstream builds log thousands of lines
        // otherwise.
        let make = ProcessCommand::new(&self.spec.make)
            .arg("--quiet")
            .cwd(&self.spec.build_dir);
        self.run_step("make", &make)?;

        // The install marker (the library file) is written here, last; a
        // failure anywhere above leaves it absent and the unit stays stale.
        let install = ProcessCommand::new(&self.spec.make)
            .args(self.spec.install_targets.iter().cloned())
            .cwd(&self.spec.build_dir);
        self.run_step("install", &install)?;

        Ok(())
    }

    fn clean(&self, _for_build: bool) -> Result<(), EngineError> {
        fs::remove_dir_all_if_exists(&self.spec.build_dir)?;
        fs::remove_dir_all_if_exists(&self.spec.install_dir)?;
        Ok(())
    }
}
