//! `dependency-owners` command entry point.
//!
//! # Responsibility
//! - Map flags onto `DependencyOwnersOptions` for the process working directory.
//! - Print the ownership report as JSON; report failures on stderr.
//!
//! # Exit status
//! - `0` on success.
//! - `1` when the lookup fails.
//! - `2` with `--check` when any dependency has no owner.

use clap::Parser;
use dependency_owners_core::loader::resolver::LoaderResolver;
use dependency_owners_core::{
    core_version, init_logging, DependencyOwnersOptions, DependencyOwnersService, LoaderRef,
    OwnershipReport, DEFAULT_CONFIG_FILE, DEFAULT_DEPENDENCY_FILE,
};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Loader directory searched when no `--loader-dir` is given.
const DEFAULT_LOADER_DIR: &str = ".dependency-owners/loaders";

const EXIT_FAILURE: u8 = 1;
const EXIT_UNOWNED: u8 = 2;

/// Find the owners of a project's dependencies.
#[derive(Parser, Debug)]
#[command(name = "dependency-owners")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the dependency file.
    #[arg(value_name = "DEPENDENCY_FILE", default_value = DEFAULT_DEPENDENCY_FILE)]
    dependency_file: PathBuf,

    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// List of dependencies to check.
    #[arg(short, long = "dependency", value_name = "NAME")]
    dependencies: Vec<String>,

    /// Loader to use for loading dependencies (name or manifest path).
    #[arg(short, long)]
    loader: Option<String>,

    /// Directory searched for installed loader manifests.
    #[arg(long = "loader-dir", value_name = "DIR")]
    loader_dirs: Vec<PathBuf>,

    /// Exit with status 2 when any dependency has no owner.
    #[arg(long)]
    check: bool,

    /// Log level (trace, debug, info, warn, error); logging is off when unset.
    #[arg(long, env = "DEPENDENCY_OWNERS_LOG")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files instead of stderr.
    #[arg(long, requires = "log_level")]
    log_dir: Option<String>,
}

impl Cli {
    fn options(&self, cwd: &Path) -> DependencyOwnersOptions {
        let mut options = DependencyOwnersOptions::new()
            .dependency_file(cwd.join(&self.dependency_file))
            .config_file(cwd.join(&self.config))
            .dependencies(self.dependencies.iter().cloned());
        if let Some(loader) = &self.loader {
            options = options.loader(LoaderRef::from(loader.as_str()));
        }
        options
    }

    fn resolver(&self, cwd: &Path) -> LoaderResolver {
        let resolver = LoaderResolver::new(cwd);
        if self.loader_dirs.is_empty() {
            resolver.with_loader_dirs([cwd.join(DEFAULT_LOADER_DIR)])
        } else {
            resolver.with_loader_dirs(self.loader_dirs.iter().cloned())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(message) => {
            print_error(&message);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, String> {
    if let Some(level) = &cli.log_level {
        init_logging(level, cli.log_dir.as_deref())?;
        info!(
            "event=cli_start module=cli status=ok core_version={}",
            core_version()
        );
    }

    let cwd = std::env::current_dir()
        .map_err(|err| format!("failed to determine working directory: {err}"))?;
    let service = DependencyOwnersService::with_resolver(cli.resolver(&cwd));
    let report = service
        .compute_ownership(&cli.options(&cwd))
        .map_err(|err| err.to_string())?;

    print_report(&report)?;

    if cli.check {
        let unowned = report.unowned_dependencies();
        if !unowned.is_empty() {
            print_error(&format!("unowned dependencies: {}", unowned.join(", ")));
            return Ok(ExitCode::from(EXIT_UNOWNED));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &OwnershipReport) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(report)
        .map_err(|err| format!("failed to serialize report: {err}"))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}").map_err(|err| format!("failed to write report: {err}"))
}

fn print_error(message: &str) {
    eprintln!("\x1B[1m\x1B[31m{message}\x1B[39m\x1B[22m");
}
