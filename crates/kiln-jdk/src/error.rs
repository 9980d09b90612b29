//! Error types for kiln-jdk.

use std::path::PathBuf;

/// Errors produced by JDK detection.
#[derive(Debug, thiserror::Error)]
pub enum JdkError {
    /// No java binary was found on the system.
    #[error("java not found — install a JDK and add it to PATH, or set JAVA_HOME")]
    NotFound,

    /// java was found but is not executable.
    #[error("java found at {path} but is not executable — check file permissions")]
    NotExecutable { path: PathBuf },

    /// Failed to execute java.
    #[error("cannot execute java: {source}")]
    Exec { source: std::io::Error },

    /// `java -version` returned an unexpected format.
    #[error("cannot parse java version from output: {output}")]
    VersionParse { output: String },

    /// The detected JDK is older than the manifest requires.
    #[error("JDK {found} is too old — building requires JDK {required} or newer")]
    VersionTooOld { found: u32, required: u32 },

    /// Cannot compute the fingerprint of the java binary.
    #[error("cannot fingerprint java binary at {path}: {source}")]
    Fingerprint {
        path: PathBuf,
        source: kiln_util::error::UtilError,
    },
}
