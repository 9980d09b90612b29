//! JVM argument assembly for generated launchers.
//!
//! Arguments are built as explicit lists; quoting happens only when a list is
//! rendered into a launcher script.

use std::path::PathBuf;

/// Environment variable enabling debug-attach arguments in generated
/// launchers. An empty value selects the default port; otherwise the value
/// is the port.
pub const DEBUG_ENV: &str = "KILN_JAVA_DEBUG";

const DEFAULT_DEBUG_PORT: &str = "8000";

/// Classpath arguments for the given entries, in declared order.
///
/// Returns an empty list when there are no entries, so callers can always
/// `extend` unconditionally.
pub fn classpath_args(entries: &[PathBuf]) -> Vec<String> {
    if entries.is_empty() {
        return Vec::new();
    }
    let joined = entries
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(":");
    vec!["-cp".to_owned(), joined]
}

/// A `-Dname=value` system property argument.
pub fn property_arg(name: &str, value: &str) -> String {
    format!("-D{name}={value}")
}

/// Debug-attach arguments from the current environment.
///
/// Present `KILN_JAVA_DEBUG` yields a JDWP agent argument listening on the
/// configured port; absence yields an empty list.
pub fn debug_args() -> Vec<String> {
    match std::env::var(DEBUG_ENV) {
        Ok(port) => jdwp_args(&port),
        Err(_) => Vec::new(),
    }
}

/// JDWP agent arguments for the given port; an empty port selects the
/// default.
pub fn jdwp_args(port: &str) -> Vec<String> {
    let port = if port.is_empty() { DEFAULT_DEBUG_PORT } else { port };
    vec![format!(
        "-agentlib:jdwp=transport=dt_socket,server=y,suspend=y,address={port}"
    )]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn classpath_empty_is_empty() {
        assert!(classpath_args(&[]).is_empty());
    }

    #[test]
    fn classpath_joins_with_colon() {
        let entries = vec![PathBuf::from("/opt/a.jar"), PathBuf::from("/opt/b.jar")];
        assert_eq!(
            classpath_args(&entries),
            ["-cp", "/opt/a.jar:/opt/b.jar"]
        );
    }

    #[test]
    fn classpath_single_entry() {
        let entries = vec![PathBuf::from("/opt/a.jar")];
        assert_eq!(classpath_args(&entries), ["-cp", "/opt/a.jar"]);
    }

    #[test]
    fn property_arg_formats() {
        assert_eq!(
            property_arg("org.example.home", "/opt/home"),
            "-Dorg.example.home=/opt/home"
        );
    }

    #[test]
    fn jdwp_default_port() {
        let args = jdwp_args("");
        assert_eq!(args.len(), 1);
        assert!(args.first().unwrap().ends_with("address=8000"));
    }

    #[test]
    fn jdwp_explicit_port() {
        let args = jdwp_args("5005");
        assert!(args.first().unwrap().ends_with("address=5005"));
    }
}
