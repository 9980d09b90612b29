//! Unit graph construction: topological ordering, cycle detection, and
//! parallel levels.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use kiln_config::{Manifest, UnitDecl};
use kiln_jdk::Jdk;
use kiln_platform::Platform;

use crate::copy::CopyTask;
use crate::error::EngineError;
use crate::launcher::{LauncherSpec, LauncherTask};
use crate::native::{NativeBuildSpec, NativeLibraryTask};
use crate::unit::BuildUnit;

/// All declared units in topological order, dependencies first.
#[derive(Debug)]
pub struct BuildPlan {
    pub units: Vec<BuildUnit>,
}

impl BuildPlan {
    /// Find a unit by name.
    pub fn unit(&self, name: &str) -> Option<&BuildUnit> {
        use crate::task::BuildTask;
        self.units.iter().find(|u| u.name() == name)
    }

    /// Group units into levels: every unit's dependencies sit in an earlier
    /// level, so units within one level are independent and may build in
    /// parallel.
    pub fn levels(&self) -> Vec<Vec<&BuildUnit>> {
        use crate::task::BuildTask;

        let mut depth: HashMap<&str, usize> = HashMap::new();
        let mut levels: Vec<Vec<&BuildUnit>> = Vec::new();

        // Topological order guarantees dependencies are assigned first.
        for unit in &self.units {
            let level = unit
                .deps()
                .iter()
                .filter_map(|d| depth.get(d.as_str()))
                .max()
                .map_or(0, |d| d + 1);
            depth.insert(unit.name(), level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            if let Some(slot) = levels.get_mut(level) {
                slot.push(unit);
            }
        }

        levels
    }

    /// The named unit plus its transitive dependencies.
    ///
    /// # Errors
    /// Returns an error if no unit has that name.
    pub fn closure(&self, name: &str) -> Result<HashSet<String>, EngineError> {
        if self.unit(name).is_none() {
            return Err(EngineError::UnknownUnit {
                name: name.to_owned(),
            });
        }

        let mut selected: HashSet<String> = HashSet::new();
        let mut queue = vec![name.to_owned()];
        while let Some(current) = queue.pop() {
            if !selected.insert(current.clone()) {
                continue;
            }
            if let Some(unit) = self.unit(&current) {
                queue.extend(unit.deps().iter().cloned());
            }
        }
        Ok(selected)
    }
}

/// Construct build units from the manifest, in topological order.
///
/// Relative paths in declarations resolve against `root`. Launcher units
/// resolve their classpath and home directory from the output roots of their
/// dependencies, which is why construction follows dependency order.
///
/// # Errors
/// Returns an error if the declarations form a dependency cycle.
pub fn plan_units(
    root: &Path,
    manifest: &Manifest,
    jdk: &Jdk,
    platform: &Platform,
) -> Result<BuildPlan, EngineError> {
    let order = topological_order(manifest)?;

    let mut units: Vec<BuildUnit> = Vec::new();
    let mut output_roots: HashMap<String, PathBuf> = HashMap::new();

    for name in &order {
        let Some(decl) = manifest.unit(name) else {
            continue; // unreachable: order only contains declared names
        };
        let unit = construct_unit(root, decl, &output_roots, jdk, platform);
        output_roots.insert(name.clone(), unit.output_root());
        units.push(unit);
    }

    Ok(BuildPlan { units })
}

/// Topological sort of unit names via three-color DFS, dependencies first.
fn topological_order(manifest: &Manifest) -> Result<Vec<String>, EngineError> {
    // 0 = unvisited, 1 = in stack (gray), 2 = done (black).
    let mut color: HashMap<String, u8> = HashMap::new();
    let mut topo: Vec<String> = Vec::new();

    for decl in &manifest.units {
        dfs(decl.name(), manifest, &mut color, &mut topo, &mut Vec::new())?;
    }

    Ok(topo)
}

fn dfs(
    name: &str,
    manifest: &Manifest,
    color: &mut HashMap<String, u8>,
    topo: &mut Vec<String>,
    stack: &mut Vec<String>,
) -> Result<(), EngineError> {
    match color.get(name).copied().unwrap_or(0) {
        2 => return Ok(()),
        1 => {
            // Gray: the name is already on the stack, so we closed a cycle.
            stack.push(name.to_owned());
            let start = stack.iter().position(|n| n == name).unwrap_or(0);
            let cycle = stack.get(start..).unwrap_or(stack.as_slice()).join(" -> ");
            return Err(EngineError::DependencyCycle { cycle });
        }
        _ => {}
    }

    let Some(decl) = manifest.unit(name) else {
        return Ok(()); // unknown deps are rejected at manifest load
    };

    color.insert(name.to_owned(), 1);
    stack.push(name.to_owned());

    for dep in decl.deps() {
        dfs(dep, manifest, color, topo, stack)?;
    }

    color.insert(name.to_owned(), 2);
    stack.pop();
    topo.push(name.to_owned());

    Ok(())
}

fn construct_unit(
    root: &Path,
    decl: &UnitDecl,
    output_roots: &HashMap<String, PathBuf>,
    jdk: &Jdk,
    platform: &Platform,
) -> BuildUnit {
    match decl {
        UnitDecl::Launcher {
            name,
            deps,
            output_dir,
            launchers,
            main_class,
            home_dep,
            home_property,
            repository_property,
            options,
            launcher_flag,
            disable_flags,
            toggle_env,
            toggle_flag,
        } => {
            // Classpath entries come from dependency output roots, in
            // declared order.
            let classpath: Vec<PathBuf> = deps
                .iter()
                .filter_map(|d| output_roots.get(d).cloned())
                .collect();

            let home = match (home_property, home_dep) {
                (Some(property), Some(dep)) => output_roots
                    .get(dep)
                    .map(|dir| (property.clone(), dir.clone())),
                _ => None,
            };
            let repository = repository_property
                .as_ref()
                .map(|property| (property.clone(), root.to_path_buf()));
            let toggle = match (toggle_env, toggle_flag) {
                (Some(var), Some(flag)) => Some((var.clone(), flag.clone())),
                _ => None,
            };

            let spec = LauncherSpec {
                output_dir: resolve(root, output_dir),
                launchers: launchers.clone(),
                main_class: main_class.clone(),
                classpath,
                debug_args: kiln_jdk::args::debug_args(),
                home,
                repository,
                options: options.clone(),
                launcher_flag: launcher_flag.clone(),
                disable_flags: disable_flags.clone(),
                toggle,
            };
            BuildUnit::Launcher(LauncherTask::new(name, deps.clone(), spec, jdk.clone()))
        }

        UnitDecl::Native {
            name,
            deps,
            source_dir,
            build_dir,
            install_dir,
            library,
            configure,
            configure_args,
            data_subdir,
            install_targets,
            make,
        } => {
            let spec = NativeBuildSpec {
                source_dir: resolve(root, source_dir),
                build_dir: resolve(root, build_dir),
                install_dir: resolve(root, install_dir),
                library: library.clone(),
                configure: configure.clone(),
                configure_args: configure_args.clone(),
                data_subdir: data_subdir.clone(),
                install_targets: install_targets.clone(),
                make: make.clone(),
            };
            BuildUnit::Native(NativeLibraryTask::new(name, deps.clone(), spec, *platform))
        }

        UnitDecl::Copy {
            name,
            deps,
            source_dir,
            output_dir,
        } => BuildUnit::Copy(CopyTask::new(
            name,
            deps.clone(),
            resolve(root, source_dir),
            resolve(root, output_dir),
        )),
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::task::BuildTask;

    fn fake_jdk() -> Jdk {
        Jdk {
            java: PathBuf::from("/usr/bin/java"),
            version: 17,
            fingerprint: "test".to_owned(),
        }
    }

    fn host() -> Platform {
        Platform::host().unwrap()
    }

    fn manifest(content: &str) -> Manifest {
        Manifest::from_str(content, "kiln.toml").unwrap()
    }

    const CHAIN: &str = r#"
[project]
name = "suite"

[[units]]
name = "launcher"
kind = "launcher"
deps = ["jars", "home"]
output-dir = "build/launcher"
launchers = ["minivm"]
main-class = "Main"
home-dep = "home"
home-property = "org.example.home"

[[units]]
name = "home"
kind = "copy"
source-dir = "home"
output-dir = "build/home"

[[units]]
name = "jars"
kind = "copy"
deps = ["home"]
source-dir = "jars"
output-dir = "build/jars"
"#;

    #[test]
    fn topological_order_puts_deps_first() {
        let tmp = tempfile::tempdir().unwrap();
        let plan = plan_units(tmp.path(), &manifest(CHAIN), &fake_jdk(), &host()).unwrap();

        let names: Vec<&str> = plan.units.iter().map(BuildTask::name).collect();
        assert_eq!(names, ["home", "jars", "launcher"]);
    }

    #[test]
    fn levels_group_independent_units() {
        let tmp = tempfile::tempdir().unwrap();
        let plan = plan_units(tmp.path(), &manifest(CHAIN), &fake_jdk(), &host()).unwrap();

        let levels = plan.levels();
        assert_eq!(levels.len(), 3);
        let names: Vec<Vec<&str>> = levels
            .iter()
            .map(|level| level.iter().map(|u| u.name()).collect())
            .collect();
        assert_eq!(names, [vec!["home"], vec!["jars"], vec!["launcher"]]);
    }

    #[test]
    fn launcher_resolves_classpath_from_dep_output_roots() {
        let tmp = tempfile::tempdir().unwrap();
        let plan = plan_units(tmp.path(), &manifest(CHAIN), &fake_jdk(), &host()).unwrap();

        let Some(BuildUnit::Launcher(task)) = plan.unit("launcher") else {
            unreachable!("launcher unit must exist");
        };
        let script = tmp.path().join("build").join("launcher").join("minivm");
        let content = task.contents(&script);
        // Classpath in declared order: jars first, then home.
        let jars = tmp.path().join("build").join("jars").display().to_string();
        let home = tmp.path().join("build").join("home").display().to_string();
        assert!(content.contains(&format!("-cp {jars}:{home}")));
        assert!(content.contains(&format!("-Dorg.example.home={home}")));
    }

    #[test]
    fn cycle_is_detected() {
        let content = r#"
[project]
name = "suite"

[[units]]
name = "a"
kind = "copy"
deps = ["b"]
source-dir = "a"
output-dir = "build/a"

[[units]]
name = "b"
kind = "copy"
deps = ["a"]
source-dir = "b"
output-dir = "build/b"
"#;
        let tmp = tempfile::tempdir().unwrap();
        let result = plan_units(tmp.path(), &manifest(content), &fake_jdk(), &host());
        match result {
            Err(EngineError::DependencyCycle { cycle }) => {
                assert!(cycle.contains("->"), "cycle should show the path: {cycle}");
            }
            other => unreachable!("expected DependencyCycle, got {other:?}"),
        }
    }

    #[test]
    fn closure_selects_unit_and_transitive_deps() {
        let tmp = tempfile::tempdir().unwrap();
        let plan = plan_units(tmp.path(), &manifest(CHAIN), &fake_jdk(), &host()).unwrap();

        let selected = plan.closure("jars").unwrap();
        assert_eq!(selected.len(), 2);
        assert!(selected.contains("jars"));
        assert!(selected.contains("home"));
        assert!(!selected.contains("launcher"));
    }

    #[test]
    fn closure_of_unknown_unit_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let plan = plan_units(tmp.path(), &manifest(CHAIN), &fake_jdk(), &host()).unwrap();
        assert!(matches!(
            plan.closure("ghost"),
            Err(EngineError::UnknownUnit { .. })
        ));
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let tmp = tempfile::tempdir().unwrap();
        let plan = plan_units(tmp.path(), &manifest(CHAIN), &fake_jdk(), &host()).unwrap();

        let Some(home) = plan.unit("home") else {
            unreachable!("home unit must exist");
        };
        assert_eq!(home.output_root(), tmp.path().join("build").join("home"));
    }
}
