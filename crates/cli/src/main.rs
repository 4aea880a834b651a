//! linkguard: scenario dispatch for device-link naming verification.
//!
//! - `linkguard run <scenario>`: one scenario with pre/post checks
//! - `linkguard list`: registered scenarios
//! - `linkguard check`: settle and validate the namespace once
//! - `linkguard init-config`: write the commented default config
//!
//! Exit codes: 0 pass, 1 scenario failure or violations, 2 usage, config or
//! dispatch error (nothing was mutated).

mod commands;
mod format;
mod parse;

use std::process;

use linkguard_core::{HarnessConfig, HarnessError};
use linkguard_scenarios::{Environment, Orchestrator, ResultMarker, ScenarioRegistry};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_check, format_error, format_list, format_result, OutputMode};
use parse::{apply_run_overrides, load_config, matches_to_action, CliAction};

const EXIT_PASS: i32 = 0;
const EXIT_FAIL: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    let matches = build_cli().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let action = match matches_to_action(&matches) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(EXIT_USAGE);
        }
    };

    // Handle `init-config` before loading any config.
    if let CliAction::InitConfig { path } = &action {
        match HarnessConfig::write_default_if_missing(path) {
            Ok(()) => {
                println!("{}", path.display());
                process::exit(EXIT_PASS);
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                process::exit(EXIT_USAGE);
            }
        }
    }

    let mut config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(EXIT_USAGE);
        }
    };
    apply_run_overrides(&mut config, &action);
    debug!(
        target: "linkguard::cli",
        namespace_root = %config.namespace_root.display(),
        seed = ?config.seed,
        "Loaded configuration"
    );

    let exit_code = match action {
        CliAction::Run { scenario, .. } => run_scenario(config, &scenario, mode),
        CliAction::List => {
            let registry = ScenarioRegistry::standard(&config);
            println!("{}", format_list(&registry.describe(), mode));
            EXIT_PASS
        }
        CliAction::Check { settle } => run_check(config, settle, mode),
        CliAction::InitConfig { .. } => EXIT_PASS,
    };
    process::exit(exit_code);
}

fn run_scenario(config: HarnessConfig, scenario: &str, mode: OutputMode) -> i32 {
    let registry = ScenarioRegistry::standard(&config);
    let marker = config.marker_dir.clone().map(ResultMarker::new);
    let mut orchestrator = Orchestrator::new(Environment::system(config), registry);
    if let Some(marker) = marker {
        orchestrator = orchestrator.with_marker(marker);
    }

    match orchestrator.run(scenario) {
        Ok(result) => {
            println!("{}", format_result(&result, mode));
            if result.is_pass() {
                EXIT_PASS
            } else {
                EXIT_FAIL
            }
        }
        Err(e @ HarnessError::UnknownScenario { .. }) => {
            eprintln!("{}", format_error(&e, mode));
            EXIT_USAGE
        }
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            EXIT_FAIL
        }
    }
}

fn run_check(config: HarnessConfig, settle: bool, mode: OutputMode) -> i32 {
    let env = Environment::system(config);
    if settle {
        if let Err(e) = env.settle() {
            eprintln!("{}", format_error(&e, mode));
            return EXIT_FAIL;
        }
    }
    let outcome = env.checker().check_all(env.namespace_root());
    println!("{}", format_check(&outcome, mode));
    if outcome.is_ok() {
        EXIT_PASS
    } else {
        EXIT_FAIL
    }
}
