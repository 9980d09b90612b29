#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "kiln", about = "Incremental build tasks for a managed-runtime distribution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build all stale units
    Build {
        /// Clean and rebuild every unit, bypassing staleness checks
        #[arg(long)]
        force: bool,
        /// Also report units that were already up to date
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Build only this unit and its dependencies
        #[arg(long)]
        only: Option<String>,
    },
    /// Remove build outputs
    Clean {
        /// Clean only this unit; all units when omitted
        unit: Option<String>,
    },
    /// Report each unit's staleness verdict without building
    Status,
    /// Check environment and toolchain setup
    Doctor,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Build {
            force,
            verbose,
            only,
        } => cmd_build(force, verbose, only),
        Command::Clean { unit } => cmd_clean(unit.as_deref()),
        Command::Status => cmd_status(),
        Command::Doctor => cmd_doctor(),
    };

    if let Err(msg) = result {
        eprintln!("error: {msg}");
        process::exit(1);
    }
}

/// Find the suite root by looking for `kiln.toml` in the current directory.
fn suite_root() -> Result<PathBuf, Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    let manifest = cwd.join("kiln.toml");
    if !manifest.exists() {
        return Err("no kiln.toml found in current directory".into());
    }
    Ok(cwd)
}

fn cmd_build(force: bool, verbose: bool, only: Option<String>) -> CliResult {
    let root = suite_root()?;
    let options = kiln_engine::BuildOptions {
        force,
        verbose,
        only,
    };

    let report = kiln_engine::build(&root, &options)?;

    let built = report.built_count();
    let current = report.units.len() - built;
    eprintln!(
        "    Finished {built} built, {current} up to date in {:.2}s",
        report.duration.as_secs_f64()
    );
    Ok(())
}

fn cmd_clean(unit: Option<&str>) -> CliResult {
    let root = suite_root()?;
    kiln_engine::clean(&root, unit)?;
    match unit {
        Some(name) => eprintln!("    Cleaned {name}"),
        None => eprintln!("    Cleaned all units"),
    }
    Ok(())
}

fn cmd_status() -> CliResult {
    let root = suite_root()?;
    let verdicts = kiln_engine::status(&root)?;

    for (name, verdict) in &verdicts {
        let state = if verdict.needs_build { "stale" } else { "ok" };
        eprintln!("    {state:<5} {name}  ({})", verdict.reason);
    }

    let stale = verdicts.iter().filter(|(_, v)| v.needs_build).count();
    if stale == 0 {
        eprintln!("    All {} units up to date", verdicts.len());
    } else {
        eprintln!("    {stale} of {} units need a build", verdicts.len());
    }
    Ok(())
}

fn cmd_doctor() -> CliResult {
    let platform = kiln_platform::Platform::host()?;
    eprintln!("    Platform: {platform}");

    let root = suite_root()?;
    let manifest = kiln_config::Manifest::from_path(&root.join("kiln.toml"))?;
    eprintln!("    Suite: {} ({} units)", manifest.project.name, manifest.units.len());

    let jdk = kiln_jdk::detect_jdk(manifest.toolchain.java_version)?;
    let fingerprint = jdk.fingerprint.get(..12).unwrap_or(&jdk.fingerprint);
    eprintln!(
        "    JDK {}: {} [{fingerprint}]",
        jdk.version,
        jdk.java.display()
    );

    // Native units shell out to make; check it answers.
    let make = kiln_util::process::ProcessCommand::new("make")
        .arg("--version")
        .capture();
    match make {
        Ok(output) if output.success => {
            let banner = output.stdout.lines().next().unwrap_or("make");
            eprintln!("    Make: {banner}");
        }
        _ => eprintln!("    Make: not found (native library units will fail)"),
    }

    Ok(())
}
