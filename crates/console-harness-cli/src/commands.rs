//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use console_harness::{HarnessConfig, ResourceKind};
use std::path::PathBuf;

/// Operator tool for the console end-to-end harness
#[derive(Parser, Debug)]
#[command(name = "console-harness")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Overrides on top of the environment configuration
    #[command(flatten)]
    pub target: TargetArgs,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Console endpoints and credential.
///
/// Each flag falls back to its environment variable; when both are unset the
/// harness default applies.
#[derive(Args, Debug, Default, Clone)]
pub struct TargetArgs {
    /// UI base URL
    #[arg(long, global = true, env = "CONSOLE_UI_URL")]
    pub ui_url: Option<String>,

    /// REST base URL
    #[arg(long, global = true, env = "CONSOLE_REST_URL")]
    pub rest_url: Option<String>,

    /// Bootstrap organization
    #[arg(long, global = true, env = "CONSOLE_ADMIN_ORGANIZATION")]
    pub organization: Option<String>,

    /// Bootstrap user
    #[arg(long, global = true, env = "CONSOLE_ADMIN_USER")]
    pub user: Option<String>,

    /// Bootstrap password
    #[arg(long, global = true, env = "CONSOLE_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Screenshot root
    #[arg(long, global = true, env = "CONSOLE_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,
}

impl TargetArgs {
    /// Apply the flags that were given
    #[must_use]
    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(url) = &self.ui_url {
            config.ui_url.clone_from(url);
        }
        if let Some(url) = &self.rest_url {
            config.rest_url.clone_from(url);
        }
        if let Some(organization) = &self.organization {
            config.admin_organization.clone_from(organization);
        }
        if let Some(user) = &self.user {
            config.admin_user.clone_from(user);
        }
        if let Some(password) = &self.password {
            config.admin_password.clone_from(password);
        }
        if let Some(dir) = &self.results_dir {
            config.results_dir.clone_from(dir);
        }
        config
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the resolved configuration (password masked)
    Config(ConfigArgs),

    /// Wait until the REST backend accepts connections
    WaitBackend(WaitBackendArgs),

    /// List backend resources
    List(ListArgs),

    /// Delete every backend resource except the bootstrap user
    Cleanup(CleanupArgs),
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the wait-backend command
#[derive(Parser, Debug)]
pub struct WaitBackendArgs {
    /// Retries after the first connection attempt
    #[arg(long, default_value = "9")]
    pub attempts: u32,

    /// Pause between attempts in milliseconds
    #[arg(long, default_value = "500")]
    pub delay_ms: u64,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only this kind
    #[arg(short, long)]
    pub kind: Option<KindArg>,
}

/// Arguments for the cleanup command
#[derive(Parser, Debug)]
pub struct CleanupArgs {
    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,
}

/// Resource kind argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    /// Users
    Users,
    /// Projects
    Projects,
    /// Databases
    Databases,
    /// Backups
    Backups,
}

impl From<KindArg> for ResourceKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Users => Self::Users,
            KindArg::Projects => Self::Projects,
            KindArg::Databases => Self::Databases,
            KindArg::Backups => Self::Backups,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_cli_is_consistent() {
            use clap::CommandFactory;
            Cli::command().debug_assert();
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = Cli::try_parse_from([
                "console-harness",
                "list",
                "--kind",
                "databases",
                "--rest-url",
                "http://cp:8081",
                "-vv",
            ])
            .unwrap();
            assert_eq!(cli.verbose, 2);
            assert_eq!(cli.target.rest_url.as_deref(), Some("http://cp:8081"));
            match cli.command {
                Commands::List(args) => assert_eq!(args.kind, Some(KindArg::Databases)),
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_unknown_kind_rejected() {
            assert!(Cli::try_parse_from(["console-harness", "list", "--kind", "tables"]).is_err());
        }

        #[test]
        fn test_wait_backend_defaults() {
            let cli = Cli::try_parse_from(["console-harness", "wait-backend"]).unwrap();
            match cli.command {
                Commands::WaitBackend(args) => {
                    assert_eq!(args.attempts, 9);
                    assert_eq!(args.delay_ms, 500);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    mod target_tests {
        use super::*;

        #[test]
        fn test_apply_overrides_only_given_flags() {
            let target = TargetArgs {
                rest_url: Some("http://cp".into()),
                password: Some("s3cret".into()),
                ..TargetArgs::default()
            };
            let config = target.apply(HarnessConfig::default());
            assert_eq!(config.rest_url, "http://cp");
            assert_eq!(config.admin_password, "s3cret");
            assert_eq!(config.ui_url, HarnessConfig::default().ui_url);
        }

        #[test]
        fn test_kind_conversion() {
            assert_eq!(ResourceKind::from(KindArg::Backups), ResourceKind::Backups);
        }
    }
}
