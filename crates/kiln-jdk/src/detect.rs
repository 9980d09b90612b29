//! JDK detection and version parsing.

use std::path::{Path, PathBuf};

use kiln_util::process::ProcessCommand;

use crate::error::JdkError;

/// A detected JDK installation.
#[derive(Debug, Clone)]
pub struct Jdk {
    /// Absolute path to the `java` executable.
    pub java: PathBuf,
    /// Major version (8, 17, 21, ...).
    pub version: u32,
    /// SHA-256 hex digest of the `java` binary, used for toolchain identity.
    pub fingerprint: String,
}

/// Locate `java` and determine its version and fingerprint.
///
/// Resolution order:
/// 1. `JAVA_HOME` environment variable (`$JAVA_HOME/bin/java`)
/// 2. `PATH` lookup via `which`
///
/// # Errors
/// Returns an error if `java` is not found, is not executable, reports an
/// unparseable version, is older than `min_version`, or cannot be
/// fingerprinted.
pub fn detect_jdk(min_version: u32) -> Result<Jdk, JdkError> {
    let java = resolve_java_path()?;
    check_executable(&java)?;
    let raw = query_version(&java)?;
    let version = parse_major_version(&raw).ok_or(JdkError::VersionParse { output: raw })?;
    if version < min_version {
        return Err(JdkError::VersionTooOld {
            found: version,
            required: min_version,
        });
    }
    let fingerprint = kiln_util::hash::sha256_file(&java).map_err(|source| JdkError::Fingerprint {
        path: java.clone(),
        source,
    })?;

    Ok(Jdk {
        java,
        version,
        fingerprint,
    })
}

/// Parse the major version from raw `java -version` output.
///
/// Handles formats like:
/// - `openjdk version "17.0.2" 2022-01-18`
/// - `java version "1.8.0_292"`
/// - `openjdk version "23-ea" 2024-09-17`
pub fn parse_major_version(raw: &str) -> Option<u32> {
    // The version string is the first double-quoted token.
    let quoted = raw.split('"').nth(1)?;

    // Legacy "1.x" scheme: the major version is the second component.
    let trimmed = quoted.strip_prefix("1.").unwrap_or(quoted);

    let major: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    major.parse().ok()
}

fn resolve_java_path() -> Result<PathBuf, JdkError> {
    if let Ok(home) = std::env::var("JAVA_HOME") {
        let p = PathBuf::from(home).join("bin").join("java");
        if p.exists() {
            return Ok(p);
        }
        return Err(JdkError::NotFound);
    }

    which_java().ok_or(JdkError::NotFound)
}

fn which_java() -> Option<PathBuf> {
    let output = ProcessCommand::new("which").arg("java").capture().ok()?;
    if output.success {
        let trimmed = output.stdout.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(PathBuf::from(trimmed))
    } else {
        None
    }
}

fn check_executable(path: &Path) -> Result<(), JdkError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path).map_err(|_| JdkError::NotExecutable {
            path: path.to_path_buf(),
        })?;
        // Check user/group/other execute bits
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(JdkError::NotExecutable {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

fn query_version(path: &Path) -> Result<String, JdkError> {
    let output = ProcessCommand::new(path)
        .arg("-version")
        .capture()
        .map_err(|e| match e {
            kiln_util::error::UtilError::CommandExec { source, .. } => JdkError::Exec { source },
            other => JdkError::Exec {
                source: std::io::Error::other(other.to_string()),
            },
        })?;

    // java prints its version banner to stderr.
    let raw = if output.stderr.trim().is_empty() {
        output.stdout.trim().to_owned()
    } else {
        output.stderr.trim().to_owned()
    };

    Ok(raw)
}
