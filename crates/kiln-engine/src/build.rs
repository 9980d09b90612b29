//! The build driver: walk the unit graph in dependency order, query
//! staleness, build what is stale, and propagate newest-output timestamps.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

use kiln_config::Manifest;
use kiln_jdk::{detect_jdk, Jdk};
use kiln_platform::Platform;

use crate::error::EngineError;
use crate::plan::plan_units;
use crate::task::{BuildTask, StalenessVerdict};

/// Options controlling a build invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Clean and rebuild every selected unit, bypassing staleness checks.
    pub force: bool,
    /// Also report units that were already up to date.
    pub verbose: bool,
    /// Restrict the build to one unit and its transitive dependencies.
    pub only: Option<String>,
}

/// Whether a unit was rebuilt or already current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Built,
    UpToDate,
}

/// Per-unit result of a build invocation.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub name: String,
    pub outcome: UnitOutcome,
    /// The staleness reason that triggered (or skipped) the build.
    pub reason: String,
}

/// Result of a successful build invocation.
#[derive(Debug)]
pub struct BuildReport {
    /// Per-unit outcomes in completion order.
    pub units: Vec<UnitReport>,
    pub duration: Duration,
}

impl BuildReport {
    /// Number of units that were rebuilt.
    pub fn built_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.outcome == UnitOutcome::Built)
            .count()
    }
}

/// Run a full build: read `kiln.toml`, detect the JDK, and build all units.
///
/// # Errors
/// Returns an error if the manifest is invalid, the JDK is missing or too
/// old, or any unit fails to build.
pub fn build(root: &Path, options: &BuildOptions) -> Result<BuildReport, EngineError> {
    let manifest = Manifest::from_path(&root.join("kiln.toml"))?;
    let jdk = detect_jdk(manifest.toolchain.java_version)?;
    build_units(root, &manifest, &jdk, options)
}

/// Build all units of a parsed manifest with an explicitly provided JDK.
///
/// Units whose dependencies live in the same level never share a level;
/// within a level, independent units build in parallel. Operations on one
/// unit stay strictly sequential.
///
/// # Errors
/// Returns the first unit failure; remaining units of the level may already
/// have started, but no later level is entered.
pub fn build_units(
    root: &Path,
    manifest: &Manifest,
    jdk: &Jdk,
    options: &BuildOptions,
) -> Result<BuildReport, EngineError> {
    let start = Instant::now();
    let platform = Platform::host()?;
    let plan = plan_units(root, manifest, jdk, &platform)?;

    let selected = match &options.only {
        Some(name) => Some(plan.closure(name)?),
        None => None,
    };

    let mut newest_outputs: HashMap<String, SystemTime> = HashMap::new();
    let mut reports: Vec<UnitReport> = Vec::new();

    for level in plan.levels() {
        let results: Vec<Result<Option<(UnitReport, Option<SystemTime>)>, EngineError>> = level
            .par_iter()
            .map(|unit| {
                if let Some(selection) = &selected {
                    if !selection.contains(unit.name()) {
                        return Ok(None);
                    }
                }

                let newest_input = unit
                    .deps()
                    .iter()
                    .filter_map(|d| newest_outputs.get(d))
                    .copied()
                    .max();

                let verdict = if options.force {
                    StalenessVerdict::stale("forced rebuild")
                } else {
                    unit.needs_build(newest_input)?
                };

                let outcome = if verdict.needs_build {
                    if options.force {
                        unit.clean(true)?;
                    }
                    eprintln!("    Building {} ({})", unit.name(), verdict.reason);
                    unit.build()?;
                    UnitOutcome::Built
                } else {
                    if options.verbose {
                        eprintln!("    {} is up to date ({})", unit.name(), verdict.reason);
                    }
                    UnitOutcome::UpToDate
                };

                let report = UnitReport {
                    name: unit.name().to_owned(),
                    outcome,
                    reason: verdict.reason,
                };
                Ok(Some((report, unit.newest_output())))
            })
            .collect();

        // Record outputs for the next level, propagating the first error.
        for result in results {
            let Some((report, newest)) = result? else {
                continue;
            };
            if let Some(time) = newest {
                newest_outputs.insert(report.name.clone(), time);
            }
            reports.push(report);
        }
    }

    Ok(BuildReport {
        units: reports,
        duration: start.elapsed(),
    })
}

/// Clean one unit, or all units in reverse dependency order.
///
/// # Errors
/// Returns an error if the manifest is invalid, the JDK is missing, the
/// named unit does not exist, or removal fails.
pub fn clean(root: &Path, unit: Option<&str>) -> Result<(), EngineError> {
    let manifest = Manifest::from_path(&root.join("kiln.toml"))?;
    let jdk = detect_jdk(manifest.toolchain.java_version)?;
    clean_units(root, &manifest, &jdk, unit)
}

/// Clean with an explicitly provided JDK.
///
/// # Errors
/// See [`clean`].
pub fn clean_units(
    root: &Path,
    manifest: &Manifest,
    jdk: &Jdk,
    unit: Option<&str>,
) -> Result<(), EngineError> {
    let platform = Platform::host()?;
    let plan = plan_units(root, manifest, jdk, &platform)?;

    match unit {
        Some(name) => {
            let Some(found) = plan.unit(name) else {
                return Err(EngineError::UnknownUnit {
                    name: name.to_owned(),
                });
            };
            found.clean(false)
        }
        None => {
            for found in plan.units.iter().rev() {
                found.clean(false)?;
            }
            Ok(())
        }
    }
}

/// Query every unit's staleness verdict without building anything.
///
/// # Errors
/// Returns an error if the manifest is invalid or the JDK is missing.
pub fn status(root: &Path) -> Result<Vec<(String, StalenessVerdict)>, EngineError> {
    let manifest = Manifest::from_path(&root.join("kiln.toml"))?;
    let jdk = detect_jdk(manifest.toolchain.java_version)?;
    status_units(root, &manifest, &jdk)
}

/// Staleness verdicts with an explicitly provided JDK.
///
/// # Errors
/// See [`status`].
pub fn status_units(
    root: &Path,
    manifest: &Manifest,
    jdk: &Jdk,
) -> Result<Vec<(String, StalenessVerdict)>, EngineError> {
    let platform = Platform::host()?;
    let plan = plan_units(root, manifest, jdk, &platform)?;

    let mut verdicts = Vec::new();
    for unit in &plan.units {
        let newest_input = unit
            .deps()
            .iter()
            .filter_map(|d| plan.unit(d).and_then(BuildTask::newest_output))
            .max();
        let verdict = unit.needs_build(newest_input)?;
        verdicts.push((unit.name().to_owned(), verdict));
    }
    Ok(verdicts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    fn fake_jdk() -> Jdk {
        Jdk {
            java: PathBuf::from("/usr/bin/java"),
            version: 17,
            fingerprint: "test".to_owned(),
        }
    }

    const SUITE: &str = r#"
[project]
name = "suite"

[[units]]
name = "home"
kind = "copy"
source-dir = "home"
output-dir = "build/home"

[[units]]
name = "launcher"
kind = "launcher"
deps = ["home"]
output-dir = "build/launcher"
launchers = ["minivm"]
main-class = "org.example.Main"
home-dep = "home"
home-property = "org.example.home"
launcher-flag = "--launcher"
disable-flags = ["--disable-gems"]
"#;

    fn seed(root: &Path) -> Manifest {
        fs::create_dir_all(root.join("home")).unwrap();
        fs::write(root.join("home").join("core.rb"), "core").unwrap();
        Manifest::from_str(SUITE, "kiln.toml").unwrap()
    }

    #[test]
    fn first_build_builds_everything_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());

        let report =
            build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();

        assert_eq!(report.built_count(), 2);
        let names: Vec<&str> = report.units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["home", "launcher"]);

        let script = tmp.path().join("build").join("launcher").join("minivm");
        let content = fs::read_to_string(&script).unwrap();
        assert!(content.starts_with("#!/usr/bin/env bash\nexec /usr/bin/java "));
        assert!(content.contains("--disable-gems"));
        assert!(content.ends_with("\"$@\"\n"));
    }

    #[test]
    fn second_build_is_fully_up_to_date() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());
        build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();

        let report =
            build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();
        assert_eq!(report.built_count(), 0);
        assert!(report
            .units
            .iter()
            .all(|u| u.outcome == UnitOutcome::UpToDate));
    }

    #[test]
    fn changed_dependency_cascades_to_launcher() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());
        build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(tmp.path().join("home").join("core.rb"), "changed").unwrap();

        let report =
            build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();
        assert_eq!(report.built_count(), 2);
        let launcher = report.units.iter().find(|u| u.name == "launcher").unwrap();
        assert!(launcher.reason.contains("older than its inputs"));
    }

    #[test]
    fn config_drift_rebuilds_only_the_launcher() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());
        build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();

        // Same manifest with one extra disable flag: the script content
        // changes while no file timestamp did.
        let drifted = Manifest::from_str(
            &SUITE.replace(
                "disable-flags = [\"--disable-gems\"]",
                "disable-flags = [\"--disable-gems\", \"--disable-rubyopt\"]",
            ),
            "kiln.toml",
        )
        .unwrap();

        let report =
            build_units(tmp.path(), &drifted, &fake_jdk(), &BuildOptions::default()).unwrap();
        assert_eq!(report.built_count(), 1);
        let launcher = report.units.iter().find(|u| u.name == "launcher").unwrap();
        assert_eq!(launcher.outcome, UnitOutcome::Built);
        assert!(launcher.reason.contains("command line changed for minivm"));
    }

    #[test]
    fn force_rebuilds_after_clean() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());
        build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();

        let options = BuildOptions {
            force: true,
            ..BuildOptions::default()
        };
        let report = build_units(tmp.path(), &manifest, &fake_jdk(), &options).unwrap();
        assert_eq!(report.built_count(), 2);

        // Forced rebuilds of an unchanged configuration converge: the next
        // plain build sees everything current.
        let report =
            build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();
        assert_eq!(report.built_count(), 0);
    }

    #[test]
    fn only_restricts_to_closure() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());

        let options = BuildOptions {
            only: Some("home".to_owned()),
            ..BuildOptions::default()
        };
        let report = build_units(tmp.path(), &manifest, &fake_jdk(), &options).unwrap();

        let names: Vec<&str> = report.units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["home"]);
        assert!(!tmp.path().join("build").join("launcher").exists());
    }

    #[test]
    fn only_unknown_unit_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());

        let options = BuildOptions {
            only: Some("ghost".to_owned()),
            ..BuildOptions::default()
        };
        let result = build_units(tmp.path(), &manifest, &fake_jdk(), &options);
        assert!(matches!(result, Err(EngineError::UnknownUnit { .. })));
    }

    #[test]
    fn clean_all_removes_every_output() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());
        build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();

        clean_units(tmp.path(), &manifest, &fake_jdk(), None).unwrap();
        assert!(!tmp.path().join("build").join("home").exists());
        assert!(!tmp.path().join("build").join("launcher").exists());
    }

    #[test]
    fn clean_single_unit_leaves_the_rest() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());
        build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();

        clean_units(tmp.path(), &manifest, &fake_jdk(), Some("launcher")).unwrap();
        assert!(tmp.path().join("build").join("home").exists());
        assert!(!tmp.path().join("build").join("launcher").exists());
    }

    #[test]
    fn clean_unknown_unit_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());
        let result = clean_units(tmp.path(), &manifest, &fake_jdk(), Some("ghost"));
        assert!(matches!(result, Err(EngineError::UnknownUnit { .. })));
    }

    #[test]
    fn status_reports_stale_then_current() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = seed(tmp.path());

        let verdicts = status_units(tmp.path(), &manifest, &fake_jdk()).unwrap();
        assert!(verdicts.iter().all(|(_, v)| v.needs_build));

        build_units(tmp.path(), &manifest, &fake_jdk(), &BuildOptions::default()).unwrap();
        let verdicts = status_units(tmp.path(), &manifest, &fake_jdk()).unwrap();
        assert!(verdicts.iter().all(|(_, v)| !v.needs_build));
    }
}
