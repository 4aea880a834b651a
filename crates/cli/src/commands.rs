//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("linkguard")
        .about("Verify block device link naming under topology churn and multipath failover")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Config file (default: ./linkguard.toml if present)")
                .global(true),
        )
        .arg(
            Arg::new("namespace-root")
                .long("namespace-root")
                .help("Device link namespace root (default: /dev/disk)")
                .global(true),
        )
        .arg(
            Arg::new("dev-root")
                .long("dev-root")
                .help("Directory canonical device names resolve against (default: /dev)")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Debug logging (RUST_LOG overrides)")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(build_run())
        .subcommand(build_list())
        .subcommand(build_check())
        .subcommand(build_init_config())
}

fn build_run() -> Command {
    Command::new("run")
        .about("Run one scenario with pre- and post-checks")
        .arg(
            Arg::new("scenario")
                .required(true)
                .help("Scenario name (see `linkguard list`)"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .help("Seed for randomized choices (default: fresh, logged)"),
        )
        .arg(
            Arg::new("marker-dir")
                .long("marker-dir")
                .help("Write testok/failed result markers into this directory"),
        )
        .arg(
            Arg::new("device")
                .long("device")
                .help("Target device for the churn scenario"),
        )
}

fn build_list() -> Command {
    Command::new("list").about("List registered scenarios")
}

fn build_check() -> Command {
    Command::new("check")
        .about("Settle and validate every device link once")
        .arg(
            Arg::new("no-settle")
                .long("no-settle")
                .help("Skip the settle barrier")
                .action(ArgAction::SetTrue),
        )
}

fn build_init_config() -> Command {
    Command::new("init-config")
        .about("Write a commented default config file if none exists")
        .arg(Arg::new("path").help("Destination (default: ./linkguard.toml)"))
}
