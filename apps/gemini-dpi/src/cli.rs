//! Command-line flags of the plugin binary.

use clap::Parser;
use std::path::PathBuf;

/// Gemini protocol plugin for a DPI-speaking browser.
///
/// Reads host tags on stdin and writes pages on stdout. Logs go to stderr;
/// set `RUST_LOG` to change the filter.
#[derive(Parser, Debug)]
#[command(name = "gemini-dpi")]
#[command(version, about)]
pub struct Cli {
    /// Configuration file (defaults to `~/.dillo/gemini/config.toml` when present).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Pinned certificate store to read and update.
    #[arg(long, value_name = "PATH")]
    pub trust_store: Option<PathBuf>,

    /// Connect and read timeout for each request.
    #[arg(long, value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn parses_overrides() {
        let cli = match Cli::try_parse_from([
            "gemini-dpi",
            "--trust-store",
            "/tmp/pinned",
            "--timeout-secs",
            "5",
        ]) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(cli.trust_store, Some(PathBuf::from("/tmp/pinned")));
        assert_eq!(cli.timeout_secs, Some(5));
        assert_eq!(cli.config, None);
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        assert!(Cli::try_parse_from(["gemini-dpi", "--timeout-secs", "soon"]).is_err());
    }
}
