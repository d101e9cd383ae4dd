//! Error types with fix suggestions

use thiserror::Error;

use crate::host::HostError;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum BindError {
    // ─────────────────────────────────────────────────────────────
    // Request errors (TAG-001 to TAG-002)
    // ─────────────────────────────────────────────────────────────

    #[error("TAG-001: Please paste Storybook code first")]
    EmptyMarkup,

    #[error("TAG-002: Please select a component type")]
    MissingComponentType,

    // ─────────────────────────────────────────────────────────────
    // Not found (TAG-010 to TAG-012)
    // ─────────────────────────────────────────────────────────────

    #[error("TAG-010: No {tag} component found in the pasted code")]
    TagNotFound { tag: String, example: String },

    #[error("TAG-011: Component '{name}' not found in this document")]
    ContainerNotFound { name: String, available: Vec<String> },

    #[error("TAG-012: Unknown component type '{name}'")]
    UnknownComponentType { name: String, known: Vec<String> },

    // ─────────────────────────────────────────────────────────────
    // Asset errors (TAG-050 to TAG-053)
    // ─────────────────────────────────────────────────────────────

    #[error("TAG-050: Request to '{url}' failed: {reason}")]
    FetchTransport { url: String, reason: String },

    #[error("TAG-051: '{url}' answered HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("TAG-052: '{url}' is not an http(s) URL")]
    UnsupportedUrl { url: String },

    #[error("TAG-053: HTTP client could not be built: {reason}")]
    HttpClient { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Config and IO
    // ─────────────────────────────────────────────────────────────

    #[error("TAG-060: Config error: {reason}")]
    Config { reason: String },

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

impl BindError {
    /// Errors that mean "nothing to do here", as opposed to a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BindError::TagNotFound { .. }
                | BindError::ContainerNotFound { .. }
                | BindError::UnknownComponentType { .. }
        )
    }
}

impl FixSuggestion for BindError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            BindError::EmptyMarkup => Some("Paste a single component tag such as <Avatar name=\"Jo\" />"),
            BindError::MissingComponentType => Some("Pass --component or include a known tag in the code"),
            BindError::TagNotFound { example, .. } => Some(example.as_str()),
            BindError::ContainerNotFound { .. } => {
                Some("Open a file that contains the component, or check its name")
            }
            BindError::UnknownComponentType { .. } => {
                Some("Add a profile for it under `components:` in the config file")
            }
            BindError::FetchTransport { .. } => Some("Check the image URL and your network connection"),
            BindError::FetchStatus { .. } => Some("Make sure the image URL is publicly reachable"),
            BindError::UnsupportedUrl { .. } => Some("Use an http:// or https:// image URL"),
            BindError::HttpClient { .. } => None,
            BindError::Config { .. } => Some("Check the config file path and YAML syntax"),
            BindError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            BindError::Io(_) => Some("Check file path and permissions"),
            BindError::Host(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_codes() {
        let err = BindError::TagNotFound {
            tag: "Avatar".into(),
            example: "<Avatar />".into(),
        };
        assert!(err.to_string().starts_with("TAG-010"));
        assert!(err.to_string().contains("Avatar"));
    }

    #[test]
    fn tag_not_found_suggests_example() {
        let err = BindError::TagNotFound {
            tag: "Button".into(),
            example: "<Button>Go</Button>".into(),
        };
        assert_eq!(err.fix_suggestion(), Some("<Button>Go</Button>"));
    }

    #[test]
    fn not_found_classification() {
        assert!(BindError::ContainerNotFound {
            name: "Avatar".into(),
            available: vec![],
        }
        .is_not_found());
        assert!(!BindError::EmptyMarkup.is_not_found());
    }
}
