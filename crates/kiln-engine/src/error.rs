//! Error types for kiln-engine.

/// Errors produced by build planning and execution.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] kiln_util::error::UtilError),

    /// A manifest operation failed.
    #[error("{0}")]
    Manifest(#[from] kiln_config::ManifestError),

    /// JDK detection failed.
    #[error("{0}")]
    Jdk(#[from] kiln_jdk::JdkError),

    /// The host platform is unsupported.
    #[error("{0}")]
    Platform(#[from] kiln_platform::PlatformError),

    /// Unit declarations form a dependency cycle.
    #[error("dependency cycle between units: {cycle}")]
    DependencyCycle { cycle: String },

    /// A named unit does not exist in the manifest.
    #[error("no unit named `{name}` in kiln.toml")]
    UnknownUnit { name: String },

    /// An external build step exited non-zero or could not run.
    ///
    /// The step's own stdout/stderr is the build log; nothing is captured
    /// here beyond the exit code.
    #[error("unit `{unit}`: {step} step failed{}", exit_suffix(.code))]
    StepFailed {
        unit: String,
        step: String,
        code: Option<i32>,
    },
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {code})"),
        None => " (killed by signal)".to_owned(),
    }
}
