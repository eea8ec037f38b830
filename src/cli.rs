use std::time::Duration;

use clap::Parser;

use crate::error::PlexError;

/// Plex MCP server over stdio.
#[derive(Debug, Parser)]
#[command(name = "plexbox", version, about)]
pub struct Cli {
    /// Base URL of the Plex Media Server (e.g. http://192.168.1.10:32400)
    #[arg(long, env = "PLEX_URL")]
    pub url: String,
    /// X-Plex-Token used for every request
    #[arg(long, env = "PLEX_TOKEN", hide_env_values = true)]
    pub token: String,
    /// Verify TLS certificates (disable for self-signed servers)
    #[arg(
        long,
        env = "PLEX_VERIFY_SSL",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub verify_ssl: bool,
    /// Per-request timeout in seconds
    #[arg(long, env = "PLEX_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
}

/// Validated connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlexConfig {
    /// No trailing slash.
    pub base_url: String,
    pub token: String,
    pub verify_ssl: bool,
    pub timeout: Duration,
}

impl Cli {
    pub fn into_config(self) -> Result<PlexConfig, PlexError> {
        let base_url = self.url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PlexError::Config(format!(
                "PLEX_URL must start with http:// or https:// (got '{}')",
                self.url
            )));
        }
        let token = self.token.trim().to_string();
        if token.is_empty() {
            return Err(PlexError::Config("PLEX_TOKEN is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(PlexError::Config(
                "PLEX_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        Ok(PlexConfig {
            base_url,
            token,
            verify_ssl: self.verify_ssl,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["plexbox"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn config_trims_trailing_slash_and_defaults() {
        let config = parse(&["--url", "http://plex.local:32400/", "--token", "abc"])
            .into_config()
            .unwrap();
        assert_eq!(config.base_url, "http://plex.local:32400");
        assert_eq!(config.token, "abc");
        assert!(config.verify_ssl);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn verify_ssl_can_be_disabled() {
        let config = parse(&[
            "--url",
            "https://plex.local",
            "--token",
            "abc",
            "--verify-ssl",
            "false",
        ])
        .into_config()
        .unwrap();
        assert!(!config.verify_ssl);
    }

    #[test]
    fn rejects_url_without_scheme() {
        let err = parse(&["--url", "plex.local:32400", "--token", "abc"])
            .into_config()
            .unwrap_err();
        assert!(matches!(err, PlexError::Config(_)));
    }

    #[test]
    fn rejects_blank_token() {
        let err = parse(&["--url", "http://plex.local", "--token", "  "])
            .into_config()
            .unwrap_err();
        assert!(err.to_string().contains("PLEX_TOKEN"));
    }
}
