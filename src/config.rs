//! Configuration
//!
//! Loaded from YAML; every field has a default so `Config::default()` needs
//! no file at all.
//!
//! ```yaml
//! fetch_timeout_secs: 20
//! notify_timeout_ms: 3000
//! components:
//!   - name: avatar
//!     aliases:
//!       name: initials
//!   - name: chip
//!     default_text_key: label
//! ```
//!
//! Entries under `components:` replace the built-in profile with the same
//! name, or are appended after the built-ins.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::component::ComponentProfile;
use crate::error::BindError;

/// Environment variable naming a config file for the CLI
pub const CONFIG_ENV: &str = "TAGBIND_CONFIG";

const DEFAULT_USER_AGENT: &str = "tagbind/0.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Profiles layered over the built-ins
    pub components: Vec<ComponentProfile>,

    /// Image fetch timeout; no timeout when unset
    pub fetch_timeout_secs: Option<u64>,

    pub user_agent: String,

    /// Auto-dismiss delay for the success toast
    pub notify_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            fetch_timeout_secs: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            notify_timeout_ms: None,
        }
    }
}

impl Config {
    /// Load from an explicit path; a missing file is an error
    pub fn load(path: &Path) -> Result<Self, BindError> {
        let content = fs::read_to_string(path).map_err(|e| BindError::Config {
            reason: format!("failed to read '{}': {}", path.display(), e),
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, BindError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), BindError> {
        if let Some(profile) = self.components.iter().find(|p| p.name.trim().is_empty()) {
            return Err(BindError::Config {
                reason: format!("component profile with empty name (tag: {:?})", profile.tag),
            });
        }
        if self.fetch_timeout_secs == Some(0) {
            return Err(BindError::Config {
                reason: "fetch_timeout_secs must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Built-ins with configured overrides applied, in detection order
    pub fn profiles(&self) -> Vec<ComponentProfile> {
        let mut profiles = ComponentProfile::builtins();
        for custom in &self.components {
            match profiles.iter_mut().find(|p| p.name.eq_ignore_ascii_case(&custom.name)) {
                Some(existing) => *existing = custom.clone(),
                None => profiles.push(custom.clone()),
            }
        }
        profiles
    }

    /// Profile for a component type name (case-insensitive)
    pub fn profile(&self, name: &str) -> Result<ComponentProfile, BindError> {
        let profiles = self.profiles();
        profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
            .cloned()
            .ok_or_else(|| BindError::UnknownComponentType {
                name: name.to_string(),
                known: profiles.iter().map(|p| p.name.clone()).collect(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_has_builtins() {
        let config = Config::default();
        let names: Vec<_> = config.profiles().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["button", "avatar"]);
        assert_eq!(config.user_agent, "tagbind/0.1");
        assert!(config.fetch_timeout_secs.is_none());
    }

    #[test]
    fn override_replaces_builtin_in_place() {
        let config = Config::from_yaml(
            r#"
components:
  - name: avatar
    aliases:
      name: initials
"#,
        )
        .unwrap();

        let profiles = config.profiles();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].name, "avatar");
        assert_eq!(profiles[1].aliases.get("name").map(String::as_str), Some("initials"));
    }

    #[test]
    fn custom_profile_is_appended() {
        let config = Config::from_yaml("components:\n  - name: chip\n").unwrap();
        assert_eq!(config.profiles().last().map(|p| p.name.as_str()), Some("chip"));
        assert_eq!(config.profile("CHIP").unwrap().tag_name(), "Chip");
    }

    #[test]
    fn unknown_profile_lists_known() {
        let err = Config::default().profile("card").unwrap_err();
        match err {
            BindError::UnknownComponentType { known, .. } => {
                assert_eq!(known, vec!["button", "avatar"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = Config::from_yaml("fetch_timeout_secs: 0").unwrap_err();
        assert!(err.to_string().contains("TAG-060"));
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "notify_timeout_ms: 2500\nuser_agent: test-agent").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.notify_timeout_ms, Some(2500));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn missing_file_is_error() {
        let err = Config::load(Path::new("/nonexistent/tagbind.yaml")).unwrap_err();
        assert!(matches!(err, BindError::Config { .. }));
    }
}
