//! ArgMatches → CliAction conversion and config overrides.

use std::path::{Path, PathBuf};

use clap::ArgMatches;
use linkguard_core::{HarnessConfig, HarnessError, Result, CONFIG_FILE_NAME};

/// The result of parsing the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Run one scenario through the orchestrator.
    Run {
        scenario: String,
        seed: Option<u64>,
        marker_dir: Option<PathBuf>,
        device: Option<PathBuf>,
    },
    /// List registered scenarios.
    List,
    /// One settle (unless skipped) plus a full check.
    Check { settle: bool },
    /// Write the default config file.
    InitConfig { path: PathBuf },
}

/// Translate clap matches into an action.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction> {
    match matches.subcommand() {
        Some(("run", sub)) => Ok(CliAction::Run {
            scenario: sub
                .get_one::<String>("scenario")
                .cloned()
                .ok_or_else(|| HarnessError::invalid_input("missing scenario name"))?,
            seed: sub.get_one::<u64>("seed").copied(),
            marker_dir: sub.get_one::<String>("marker-dir").map(PathBuf::from),
            device: sub.get_one::<String>("device").map(PathBuf::from),
        }),
        Some(("list", _)) => Ok(CliAction::List),
        Some(("check", sub)) => Ok(CliAction::Check {
            settle: !sub.get_flag("no-settle"),
        }),
        Some(("init-config", sub)) => Ok(CliAction::InitConfig {
            path: sub
                .get_one::<String>("path")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
        }),
        Some((other, _)) => Err(HarnessError::invalid_input(format!("unknown command '{}'", other))),
        None => Err(HarnessError::invalid_input("no command given")),
    }
}

/// Load the config named by `--config`, or `./linkguard.toml` when present,
/// then apply the global command line overrides.
pub fn load_config(matches: &ArgMatches) -> Result<HarnessConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => HarnessConfig::from_file(Path::new(path))?,
        None => HarnessConfig::load_or_default(Path::new(CONFIG_FILE_NAME))?,
    };
    if let Some(root) = matches.get_one::<String>("namespace-root") {
        config.namespace_root = PathBuf::from(root);
    }
    if let Some(root) = matches.get_one::<String>("dev-root") {
        config.dev_root = PathBuf::from(root);
    }
    config.validate()?;
    Ok(config)
}

/// Fold the `run` options into the config.
pub fn apply_run_overrides(config: &mut HarnessConfig, action: &CliAction) {
    if let CliAction::Run {
        seed,
        marker_dir,
        device,
        ..
    } = action
    {
        if seed.is_some() {
            config.seed = *seed;
        }
        if marker_dir.is_some() {
            config.marker_dir = marker_dir.clone();
        }
        if device.is_some() {
            config.churn.device = device.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_cli;

    fn parse(args: &[&str]) -> CliAction {
        let matches = build_cli().try_get_matches_from(args).unwrap();
        matches_to_action(&matches).unwrap()
    }

    #[test]
    fn test_run_action() {
        assert_eq!(
            parse(&["linkguard", "run", "churn", "--seed", "7", "--device", "/dev/sdb"]),
            CliAction::Run {
                scenario: "churn".to_string(),
                seed: Some(7),
                marker_dir: None,
                device: Some(PathBuf::from("/dev/sdb")),
            }
        );
    }

    #[test]
    fn test_check_action() {
        assert_eq!(parse(&["linkguard", "check"]), CliAction::Check { settle: true });
        assert_eq!(
            parse(&["linkguard", "check", "--no-settle"]),
            CliAction::Check { settle: false }
        );
    }

    #[test]
    fn test_init_config_default_path() {
        assert_eq!(
            parse(&["linkguard", "init-config"]),
            CliAction::InitConfig {
                path: PathBuf::from(CONFIG_FILE_NAME)
            }
        );
    }

    #[test]
    fn test_overrides_win_over_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("linkguard.toml");
        std::fs::write(&path, "seed = 1\nnamespace_root = \"/from/file\"\n").unwrap();
        let path = path.to_str().unwrap();

        let matches = build_cli()
            .try_get_matches_from([
                "linkguard",
                "--config",
                path,
                "--namespace-root",
                "/from/flag",
                "run",
                "symlink_check",
                "--seed",
                "9",
            ])
            .unwrap();
        let mut config = load_config(&matches).unwrap();
        let action = matches_to_action(&matches).unwrap();
        apply_run_overrides(&mut config, &action);

        assert_eq!(config.namespace_root, PathBuf::from("/from/flag"));
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let matches = build_cli()
            .try_get_matches_from(["linkguard", "--config", "/nonexistent/linkguard.toml", "list"])
            .unwrap();
        assert!(matches!(load_config(&matches), Err(HarnessError::Config(_))));
    }
}
