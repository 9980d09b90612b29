//! The `kiln.toml` suite manifest: project metadata, toolchain requirements,
//! and the declarative list of buildable units.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The `kiln.toml` suite manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub project: Project,
    #[serde(default)]
    pub toolchain: Toolchain,
    #[serde(default)]
    pub units: Vec<UnitDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Toolchain {
    /// Minimum JDK major version required to build launchers.
    #[serde(default = "default_java_version")]
    pub java_version: u32,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            java_version: default_java_version(),
        }
    }
}

fn default_java_version() -> u32 {
    17
}

/// One buildable unit, selected by its `kind` field at manifest-load time.
///
/// The set of kinds is closed: a launcher script generator, a native library
/// built from vendored source, or a plain file-tree copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum UnitDecl {
    /// A generated launcher script whose content derives from the current
    /// build configuration.
    #[serde(rename_all = "kebab-case")]
    Launcher {
        name: String,
        #[serde(default)]
        deps: Vec<String>,
        output_dir: PathBuf,
        /// Script names to generate under `output_dir`.
        launchers: Vec<String>,
        main_class: String,
        /// Dependency unit whose output directory becomes the home property
        /// value.
        #[serde(default)]
        home_dep: Option<String>,
        #[serde(default)]
        home_property: Option<String>,
        #[serde(default)]
        repository_property: Option<String>,
        #[serde(default)]
        options: Vec<String>,
        /// Flag announcing the script's own path to the launched runtime,
        /// e.g. `--launcher` emits `--launcher=<script path>`.
        #[serde(default)]
        launcher_flag: Option<String>,
        #[serde(default)]
        disable_flags: Vec<String>,
        /// Environment variable whose presence appends `toggle_flag`.
        #[serde(default)]
        toggle_env: Option<String>,
        #[serde(default)]
        toggle_flag: Option<String>,
    },

    /// A native library built from vendored upstream source via
    /// configure/make/install.
    #[serde(rename_all = "kebab-case")]
    Native {
        name: String,
        #[serde(default)]
        deps: Vec<String>,
        /// Pristine vendored source, staged into `build_dir` on every build.
        source_dir: PathBuf,
        build_dir: PathBuf,
        install_dir: PathBuf,
        /// Library base name; `ssl` installs `lib/libssl.<suffix>`.
        library: String,
        #[serde(default = "default_configure")]
        configure: String,
        #[serde(default)]
        configure_args: Vec<String>,
        /// Auxiliary data directory, e.g. `ssl` adds `--ssldir=<install>/ssl`.
        #[serde(default)]
        data_subdir: Option<String>,
        #[serde(default = "default_install_targets")]
        install_targets: Vec<String>,
        #[serde(default = "default_make")]
        make: String,
    },

    /// A file tree copied verbatim into an output directory.
    #[serde(rename_all = "kebab-case")]
    Copy {
        name: String,
        #[serde(default)]
        deps: Vec<String>,
        source_dir: PathBuf,
        output_dir: PathBuf,
    },
}

fn default_configure() -> String {
    "./Configure".to_owned()
}

fn default_install_targets() -> Vec<String> {
    vec!["install".to_owned()]
}

fn default_make() -> String {
    "make".to_owned()
}

impl UnitDecl {
    /// The unit's declared name.
    pub fn name(&self) -> &str {
        match self {
            Self::Launcher { name, .. } | Self::Native { name, .. } | Self::Copy { name, .. } => {
                name
            }
        }
    }

    /// Names of the unit's declared upstream dependencies, in order.
    pub fn deps(&self) -> &[String] {
        match self {
            Self::Launcher { deps, .. } | Self::Native { deps, .. } | Self::Copy { deps, .. } => {
                deps
            }
        }
    }
}

impl Manifest {
    /// Read, parse, and validate a `kiln.toml` from the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&content, &path.display().to_string())
    }

    /// Parse and validate manifest content.
    ///
    /// # Errors
    /// Returns an error on invalid TOML or failed validation.
    pub fn from_str(content: &str, origin: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content).map_err(|e| ManifestError::Parse {
            path: origin.to_owned(),
            source: e,
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize the manifest back to TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        toml::to_string_pretty(self).map_err(|e| ManifestError::Serialize {
            message: e.to_string(),
        })
    }

    /// Look up a unit declaration by name.
    pub fn unit(&self, name: &str) -> Option<&UnitDecl> {
        self.units.iter().find(|u| u.name() == name)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for unit in &self.units {
            if !seen.insert(unit.name()) {
                return Err(ManifestError::DuplicateUnit {
                    name: unit.name().to_owned(),
                });
            }
        }

        for unit in &self.units {
            for dep in unit.deps() {
                if !seen.contains(dep.as_str()) {
                    return Err(ManifestError::UnknownDependency {
                        unit: unit.name().to_owned(),
                        dep: dep.clone(),
                    });
                }
                if dep == unit.name() {
                    return Err(ManifestError::SelfDependency {
                        unit: unit.name().to_owned(),
                    });
                }
            }

            if let UnitDecl::Launcher {
                name,
                deps,
                launchers,
                home_dep,
                ..
            } = unit
            {
                if launchers.is_empty() {
                    return Err(ManifestError::NoLaunchers { unit: name.clone() });
                }
                if let Some(home) = home_dep {
                    if !deps.contains(home) {
                        return Err(ManifestError::HomeNotADep {
                            unit: name.clone(),
                            home: home.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid kiln.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("cannot serialize manifest: {message}")]
    Serialize { message: String },

    #[error("duplicate unit name `{name}` — unit names must be unique")]
    DuplicateUnit { name: String },

    #[error("unit `{unit}` depends on unknown unit `{dep}`")]
    UnknownDependency { unit: String, dep: String },

    #[error("unit `{unit}` depends on itself")]
    SelfDependency { unit: String },

    #[error("launcher unit `{unit}` declares no launcher scripts")]
    NoLaunchers { unit: String },

    #[error("launcher unit `{unit}` names `{home}` as home-dep but does not depend on it")]
    HomeNotADep { unit: String, home: String },
}
