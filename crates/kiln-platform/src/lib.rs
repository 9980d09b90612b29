#![forbid(unsafe_code)]
//! Host platform detection and native artifact naming for Kiln.

use std::fmt;

/// Operating systems Kiln can build on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Macos,
}

/// CPU architectures Kiln can build on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    Aarch64,
}

/// The host platform a build runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Detect the host platform.
    ///
    /// # Errors
    /// Returns an error if the current OS/arch is not a supported build host.
    pub fn host() -> Result<Self, PlatformError> {
        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::Macos,
            other => {
                return Err(PlatformError::UnsupportedHost {
                    os: other.to_owned(),
                    arch: std::env::consts::ARCH.to_owned(),
                })
            }
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => Arch::X86_64,
            "aarch64" => Arch::Aarch64,
            other => {
                return Err(PlatformError::UnsupportedHost {
                    os: std::env::consts::OS.to_owned(),
                    arch: other.to_owned(),
                })
            }
        };
        Ok(Self { os, arch })
    }

    /// Platform-specific file name of a shared library (e.g. `ssl` becomes
    /// `libssl.so` on Linux and `libssl.dylib` on macOS).
    pub fn lib_filename(&self, name: &str) -> String {
        match self.os {
            Os::Linux => format!("lib{name}.so"),
            Os::Macos => format!("lib{name}.dylib"),
        }
    }

    /// Whether shared libraries need a relative runtime search path baked in.
    ///
    /// Only Linux dynamic loading honors `$ORIGIN`-relative rpaths; macOS
    /// uses install names instead.
    pub fn needs_origin_rpath(&self) -> bool {
        self.os == Os::Linux
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = match self.os {
            Os::Linux => "linux",
            Os::Macos => "macos",
        };
        let arch = match self.arch {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
        };
        write!(f, "{os}-{arch}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("unsupported host: {os}/{arch} — Kiln only builds on Linux and macOS")]
    UnsupportedHost { os: String, arch: String },
}
