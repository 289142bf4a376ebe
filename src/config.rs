use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::account::MailboxIdentity;

/// Account settings from any source. Every field is optional so sources
/// can be layered.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub mailbox: Option<String>,
    pub host: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("mailbox", &self.mailbox)
            .field("host", &self.host)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Fields set on `self` win; gaps are filled from `fallback`.
    pub fn merged_over(self, fallback: Config) -> Config {
        Config {
            mailbox: self.mailbox.or(fallback.mailbox),
            host: self.host.or(fallback.host),
            password: self.password.or(fallback.password),
        }
    }

    /// Validates the merged settings. A missing password is looked up with
    /// `stored_password`, keyed by mailbox.
    pub fn into_identity(
        self,
        stored_password: impl FnOnce(&str) -> Result<Option<String>>,
    ) -> Result<MailboxIdentity> {
        let mailbox = non_empty(self.mailbox)
            .ok_or_else(|| anyhow!("mailbox not set (--mailbox, MCP_MAILBOX or config file)"))?;
        let host = non_empty(self.host)
            .ok_or_else(|| anyhow!("host not set (--host, MCP_HOST or config file)"))?;
        let password = match self.password {
            Some(p) => p,
            None => stored_password(&mailbox)?.ok_or_else(|| {
                anyhow!("no password for {mailbox} (MCP_PASSWORD, config file or `set-password`)")
            })?,
        };
        Ok(MailboxIdentity::new(mailbox, host, password))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join("mcp_imap"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config file; a missing file is an empty config.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config =
        toml::from_str(&s).map_err(|e| anyhow!("invalid config {}: {e}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mailbox: Option<&str>, host: Option<&str>, password: Option<&str>) -> Config {
        Config {
            mailbox: mailbox.map(str::to_string),
            host: host.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn command_line_wins_over_file() {
        let cli = config(Some("ada"), None, None);
        let file = config(Some("grace"), Some("imap.example.com"), Some("secret"));
        assert_eq!(
            cli.merged_over(file),
            config(Some("ada"), Some("imap.example.com"), Some("secret"))
        );
    }

    #[test]
    fn password_falls_back_to_store() {
        let identity = config(Some("ada"), Some("imap.example.com"), None)
            .into_identity(|mailbox| {
                assert_eq!(mailbox, "ada");
                Ok(Some("from-keyring".to_string()))
            })
            .unwrap();
        assert_eq!(identity.password, "from-keyring");
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(
            config(None, Some("h"), Some("p"))
                .into_identity(|_| Ok(None))
                .is_err()
        );
        assert!(
            config(Some("ada"), Some("  "), Some("p"))
                .into_identity(|_| Ok(None))
                .is_err()
        );
        assert!(
            config(Some("ada"), Some("h"), None)
                .into_identity(|_| Ok(None))
                .is_err()
        );
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", config(Some("ada"), None, Some("hunter2")));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn reads_toml_file() {
        let path = std::env::temp_dir().join(format!("mcp_imap_config_{}.toml", std::process::id()));
        fs::write(&path, "mailbox = \"ada\"\nhost = \"imap.example.com\"\n").unwrap();
        let cfg = load_config_from(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(cfg, config(Some("ada"), Some("imap.example.com"), None));
    }

    #[test]
    fn missing_file_is_empty_config() {
        let cfg = load_config_from(Path::new("/nonexistent/mcp_imap/config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }
}
