//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Manage MLB.tv session credentials.
///
/// Logs in with cookie-based authentication, derives the API keys and tokens
/// the streaming endpoints require, and caches everything on disk so repeat
/// runs reuse prior credentials instead of re-authenticating.
#[derive(Parser, Debug)]
#[command(name = "mlbtv-session")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory for session state and cookies (defaults to the platform
    /// config directory)
    #[arg(short, long, env = "MLBTV_DIR")]
    pub dir: Option<PathBuf>,

    /// MLB.com account email address
    #[arg(short, long, env = "MLBTV_USERNAME")]
    pub username: Option<String>,

    /// MLB.com account password
    #[arg(short, long, env = "MLBTV_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and persist the session cookies
    Login,
    /// Print a valid bearer access token, running the credential chain as
    /// needed
    Token,
    /// Show which credentials are currently cached
    Status,
    /// Delete all persisted session state and cookies
    Destroy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_login_subcommand_parses() {
        let args = Args::try_parse_from(["mlbtv-session", "login"]).unwrap();
        assert!(matches!(args.command, Command::Login));
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.dir.is_none());
    }

    #[test]
    fn test_cli_token_subcommand_parses() {
        let args = Args::try_parse_from(["mlbtv-session", "token"]).unwrap();
        assert!(matches!(args.command, Command::Token));
    }

    #[test]
    fn test_cli_status_and_destroy_parse() {
        let args = Args::try_parse_from(["mlbtv-session", "status"]).unwrap();
        assert!(matches!(args.command, Command::Status));

        let args = Args::try_parse_from(["mlbtv-session", "destroy"]).unwrap();
        assert!(matches!(args.command, Command::Destroy));
    }

    #[test]
    fn test_cli_missing_subcommand_is_error() {
        let result = Args::try_parse_from(["mlbtv-session"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingSubcommand
        );
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["mlbtv-session", "-v", "token"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["mlbtv-session", "-vv", "token"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["mlbtv-session", "-q", "token"]).unwrap();
        assert!(args.quiet);

        let args = Args::try_parse_from(["mlbtv-session", "--quiet", "token"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_credentials_and_dir_flags() {
        let args = Args::try_parse_from([
            "mlbtv-session",
            "--username",
            "user@example.com",
            "--password",
            "secret",
            "--dir",
            "/tmp/mlbtv",
            "login",
        ])
        .unwrap();
        assert_eq!(args.username.as_deref(), Some("user@example.com"));
        assert_eq!(args.password.as_deref(), Some("secret"));
        assert_eq!(args.dir.as_deref(), Some(std::path::Path::new("/tmp/mlbtv")));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        // --help causes early exit, so we check it returns an error with Help kind
        let result = Args::try_parse_from(["mlbtv-session", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["mlbtv-session", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["mlbtv-session", "--invalid-flag", "token"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
