//! User configuration — `~/.config/repofleet/config.toml`, overridable by
//! environment variables and CLI flags (SPEC_FULL.md §1, "Configuration").

use std::path::{Path, PathBuf};

use etcetera::base_strategy::{BaseStrategy, choose_base_strategy};
use serde::{Deserialize, Serialize};

use crate::planlist::Visibility;

fn default_script() -> String {
    "run.sh".to_string()
}

fn default_forge_host() -> String {
    "github.com".to_string()
}

/// On-disk shape of `config.toml`. All fields are optional; an absent file
/// is equivalent to every field being unset.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(rename = "default-visibility", default)]
    pub default_visibility: Option<String>,

    #[serde(rename = "default-script", default = "default_script_opt")]
    pub default_script: Option<String>,

    #[serde(rename = "forge-host", default = "default_forge_host_opt")]
    pub forge_host: Option<String>,

    #[serde(rename = "github-token-env", default)]
    pub github_token_env: Option<String>,
}

fn default_script_opt() -> Option<String> {
    Some(default_script())
}

fn default_forge_host_opt() -> Option<String> {
    Some(default_forge_host())
}

impl UserConfig {
    /// Load from `path` if it exists; an absent file is not an error (spec
    /// behavior: config is entirely optional).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
        let config: UserConfig = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn visibility(&self) -> Visibility {
        match self.default_visibility.as_deref() {
            Some("public") => Visibility::Public,
            Some("private") => Visibility::Private,
            _ => Visibility::Unset,
        }
    }

    pub fn script(&self) -> String {
        self.default_script.clone().unwrap_or_else(default_script)
    }

    pub fn forge_host(&self) -> String {
        self.forge_host.clone().unwrap_or_else(default_forge_host)
    }
}

/// Resolve the default config-file path: `$XDG_CONFIG_HOME/repofleet/config.toml`
/// on Linux/macOS, the platform equivalent elsewhere (spec.md §6 is silent on
/// this file's location beyond naming it ambient state; this follows the
/// teacher's own `config::user::get_config_path` resolution strategy).
pub fn default_config_path() -> Option<PathBuf> {
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("repofleet").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = UserConfig::load(Path::new("/nonexistent/repofleet-config-test.toml")).unwrap();
        assert_eq!(config.script(), "run.sh");
        assert_eq!(config.forge_host(), "github.com");
        assert_eq!(config.visibility(), Visibility::Unset);
    }

    #[test]
    fn parses_toml_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "default-visibility = \"public\"\ndefault-script = \"bootstrap.sh\"\n",
        )
        .unwrap();
        let config = UserConfig::load(&path).unwrap();
        assert_eq!(config.visibility(), Visibility::Public);
        assert_eq!(config.script(), "bootstrap.sh");
    }
}
