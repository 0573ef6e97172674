use std::fmt;
use std::path::PathBuf;

use tracing::debug;
use url::Url;

use crate::error::Error;

/// Environment variables checked for a token, in priority order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Overrides the directory holding `config.yml`.
pub const CONFIG_DIR_ENV: &str = "WT_CONFIG_DIR";

/// Overrides the GitHub API base URL.
pub const API_URL_ENV: &str = "WT_API_URL";

/// Tracing filter for diagnostic logs.
pub const LOG_ENV: &str = "WT_LOG";

pub const CONFIG_FILE_NAME: &str = "config.yml";
pub const REPO_NAME_PREFIX: &str = "wt-";
pub const DEFAULT_TEMPLATE_OWNER: &str = "wildlife-dynamics";
pub const DEFAULT_TEMPLATE_NAME: &str = "wt-template";
pub const DEFAULT_RULESET_URL: &str = "https://raw.githubusercontent.com/wildlife-dynamics/wt-template/main/repo-setup/ecoscope_main_branch_rules.json";

/// A repository used as the scaffold for new repositories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub owner: String,
    pub name: String,
}

impl Default for TemplateRef {
    fn default() -> Self {
        Self {
            owner: DEFAULT_TEMPLATE_OWNER.to_string(),
            name: DEFAULT_TEMPLATE_NAME.to_string(),
        }
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Runtime settings for a `wt` invocation
#[derive(Debug, Clone)]
pub struct Settings {
    /// Location of the stored credential
    pub config_path: PathBuf,
    /// GitHub API base URL; `None` means api.github.com
    pub api_base: Option<String>,
    pub template: TemplateRef,
    pub ruleset_source: String,
    pub name_prefix: String,
}

impl Settings {
    /// Build settings from defaults and `WT_*` environment overrides
    pub fn from_env() -> Result<Self, Error> {
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_config_dir()?,
        };

        let api_base = match std::env::var(API_URL_ENV) {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_api_base(&raw)?),
            _ => None,
        };

        let settings = Self {
            api_base,
            ..Self::with_config_dir(config_dir)
        };
        debug!(config_path = %settings.config_path.display(), api_base = ?settings.api_base, "Resolved settings");
        Ok(settings)
    }

    /// Default settings rooted at the given config directory
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_dir.into().join(CONFIG_FILE_NAME),
            api_base: None,
            template: TemplateRef::default(),
            ruleset_source: DEFAULT_RULESET_URL.to_string(),
            name_prefix: REPO_NAME_PREFIX.to_string(),
        }
    }
}

/// `~/.config/wt` on every platform
fn default_config_dir() -> Result<PathBuf, Error> {
    dirs::home_dir()
        .map(|home| home.join(".config").join("wt"))
        .ok_or_else(|| Error::Config("could not determine the home directory".to_string()))
}

fn parse_api_base(raw: &str) -> Result<String, Error> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("{} is not a valid URL: {}", API_URL_ENV, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!("{} must be an http(s) URL", API_URL_ENV)));
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        let template = TemplateRef::default();
        assert_eq!(template.owner, "wildlife-dynamics");
        assert_eq!(template.name, "wt-template");
        assert_eq!(template.to_string(), "wildlife-dynamics/wt-template");
    }

    #[test]
    fn test_with_config_dir_defaults() {
        let settings = Settings::with_config_dir("/tmp/wt-test");
        assert_eq!(settings.config_path, PathBuf::from("/tmp/wt-test/config.yml"));
        assert_eq!(settings.template, TemplateRef::default());
        assert_eq!(settings.ruleset_source, DEFAULT_RULESET_URL);
        assert_eq!(settings.name_prefix, "wt-");
        assert!(settings.api_base.is_none());
    }

    #[test]
    fn test_parse_api_base() {
        assert_eq!(parse_api_base("http://127.0.0.1:8080/").unwrap(), "http://127.0.0.1:8080");
        assert!(parse_api_base("ftp://example.com").is_err());
        assert!(parse_api_base("not a url").is_err());
    }
}
