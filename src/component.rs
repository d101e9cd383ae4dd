//! Component profiles
//!
//! A profile carries everything that is specific to one component type:
//! the tag to look for, the host component it binds to, attribute renames,
//! embedded-element flags, resolver aliases and the example shown when the
//! tag is missing. `avatar` and `button` are built in; the config file can
//! add more or override them by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::markup::extract::has_open_tag;

/// Key used for inner text when a profile does not name one
pub const DEFAULT_TEXT_KEY: &str = "children";

/// Per-component decode and resolve rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentProfile {
    /// Lowercase type name as selected in the form (`avatar`, `button`)
    pub name: String,

    /// Tag searched for in the markup (defaults to the capitalized name)
    #[serde(default)]
    pub tag: Option<String>,

    /// Host component name (defaults to the tag)
    #[serde(default)]
    pub component: Option<String>,

    /// Property key receiving the tag's inner text
    #[serde(default = "default_text_key")]
    pub default_text_key: String,

    /// Attribute name → semantic name (`variant` → `type`)
    #[serde(default)]
    pub renames: BTreeMap<String, String>,

    /// Embedded-element attributes turned into boolean flags (`iconL` → `icon L`)
    #[serde(default)]
    pub element_flags: BTreeMap<String, String>,

    /// Semantic name → target property name, used by the resolver
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    /// Example snippet shown when the tag cannot be found
    #[serde(default)]
    pub example: Option<String>,
}

fn default_text_key() -> String {
    DEFAULT_TEXT_KEY.to_string()
}

impl ComponentProfile {
    /// Bare profile with no remaps
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: None,
            component: None,
            default_text_key: default_text_key(),
            renames: BTreeMap::new(),
            element_flags: BTreeMap::new(),
            aliases: BTreeMap::new(),
            example: None,
        }
    }

    /// Built-in `avatar` profile
    pub fn avatar() -> Self {
        Self {
            example: Some(r#"<Avatar name="John Doe" size="large" />"#.to_string()),
            ..Self::new("avatar")
        }
    }

    /// Built-in `button` profile
    pub fn button() -> Self {
        Self {
            default_text_key: "✏️ label".to_string(),
            renames: BTreeMap::from([("variant".to_string(), "type".to_string())]),
            element_flags: BTreeMap::from([
                ("iconL".to_string(), "icon L".to_string()),
                ("iconR".to_string(), "icon R".to_string()),
            ]),
            example: Some(r#"<Button size="m" variant="contained">Button</Button>"#.to_string()),
            ..Self::new("button")
        }
    }

    /// Built-in profiles in detection order
    pub fn builtins() -> Vec<Self> {
        vec![Self::button(), Self::avatar()]
    }

    pub fn tag_name(&self) -> String {
        self.tag.clone().unwrap_or_else(|| capitalize(&self.name))
    }

    pub fn component_name(&self) -> String {
        self.component.clone().unwrap_or_else(|| self.tag_name())
    }

    pub fn example_snippet(&self) -> String {
        self.example
            .clone()
            .unwrap_or_else(|| format!("<{} />", self.tag_name()))
    }

    /// Semantic name for a raw attribute name
    pub fn rename<'a>(&'a self, attribute: &'a str) -> &'a str {
        self.renames
            .get(attribute)
            .map(String::as_str)
            .unwrap_or(attribute)
    }

    /// Flag key for an embedded-element attribute, if this profile flags it
    pub fn element_flag(&self, attribute: &str) -> Option<&str> {
        self.element_flags.get(attribute).map(String::as_str)
    }
}

/// Uppercase the first character (`avatar` → `Avatar`)
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Detect the component type from pasted code
///
/// Profiles are checked in order; the first whose opening tag appears
/// (`<Tag `, `<Tag>` or `<Tag/>`) wins.
pub fn detect<'a>(markup: &str, profiles: &'a [ComponentProfile]) -> Option<&'a ComponentProfile> {
    profiles
        .iter()
        .find(|profile| has_open_tag(markup, &profile.tag_name()))
}
