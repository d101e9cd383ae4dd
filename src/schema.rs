//! Target schema resolution
//!
//! Maps semantic property names from a [`PropertyBag`] onto the identifiers a
//! host component actually declares. Host identifiers are decorated
//! (`✏️ initials#262:0`), so matching falls back to a normalized comparison
//! after the exact one fails.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::markup::{PropertyBag, PropertyValue};

/// Leading decoration: anything before the first letter, digit or underscore
static LEADING_DECORATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\p{L}\p{N}_]+").unwrap());

/// Trailing `#<id>` suffix added by the host
static ID_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[^#]*$").unwrap());

/// Declared property kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyKind {
    Text,
    Boolean,
    Variant,
    InstanceSwap,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Text => write!(f, "TEXT"),
            PropertyKind::Boolean => write!(f, "BOOLEAN"),
            PropertyKind::Variant => write!(f, "VARIANT"),
            PropertyKind::InstanceSwap => write!(f, "INSTANCE_SWAP"),
        }
    }
}

/// A property slot as declared by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPropertyDescriptor {
    pub identifier: String,
    pub kind: PropertyKind,
}

impl TargetPropertyDescriptor {
    pub fn new(identifier: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
        }
    }
}

/// Where a resolved assignment is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Batched property call on the instance
    Simple,
    /// Written into a text layer by the binder
    FreeText,
}

/// One bag entry matched to a live descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAssignment {
    /// Semantic key from the bag
    pub key: String,
    /// Declared identifier on the target
    pub target_identifier: String,
    /// Value coerced to the descriptor kind
    pub value: PropertyValue,
    pub classification: Classification,
}

/// A key matched to a descriptor whose kind cannot hold its value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedKey {
    pub key: String,
    pub target_identifier: String,
    pub reason: String,
}

/// Resolver output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub simple: Vec<ResolvedAssignment>,
    pub free_text: Vec<ResolvedAssignment>,
    /// Keys with no matching descriptor, in bag order
    pub unresolved: Vec<String>,
    pub rejected: Vec<RejectedKey>,
}

impl Resolution {
    /// Simple assignments as `(identifier, value)` pairs for one host call
    pub fn simple_batch(&self) -> Vec<(String, PropertyValue)> {
        self.simple
            .iter()
            .map(|a| (a.target_identifier.clone(), a.value.clone()))
            .collect()
    }
}

/// Strip decoration and `#id` suffix, then lowercase
///
/// `"✏️ initials#262:0"` → `"initials"`
pub fn normalize_identifier(identifier: &str) -> String {
    let without_suffix = ID_SUFFIX.replace(identifier, "");
    let without_prefix = LEADING_DECORATION.replace(&without_suffix, "");
    without_prefix.trim().to_lowercase()
}

/// Find the descriptor for a (possibly aliased) property name
pub fn match_descriptor<'a>(
    name: &str,
    schema: &'a [TargetPropertyDescriptor],
) -> Option<&'a TargetPropertyDescriptor> {
    if let Some(exact) = schema.iter().find(|d| d.identifier == name) {
        return Some(exact);
    }

    let wanted = normalize_identifier(name);
    if wanted.is_empty() {
        return None;
    }
    schema
        .iter()
        .find(|d| normalize_identifier(&d.identifier) == wanted)
}

/// Coerce a decoded value into what a descriptor of `kind` accepts
pub fn coerce(value: &PropertyValue, kind: PropertyKind) -> Result<PropertyValue, String> {
    match (kind, value) {
        (PropertyKind::Text, PropertyValue::String(_)) => Ok(value.clone()),
        (PropertyKind::Text, other) => Ok(PropertyValue::String(other.to_string())),

        (PropertyKind::Boolean, PropertyValue::Boolean(_)) => Ok(value.clone()),
        (PropertyKind::Boolean, PropertyValue::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(PropertyValue::Boolean(true)),
            "false" => Ok(PropertyValue::Boolean(false)),
            _ => Err(format!("'{}' is not a boolean", s)),
        },
        (PropertyKind::Boolean, other) => Err(format!("{} value cannot set a BOOLEAN property", other.kind_name())),

        (PropertyKind::Variant, PropertyValue::String(_)) => Ok(value.clone()),
        (PropertyKind::Variant, PropertyValue::Number(_) | PropertyValue::Boolean(_)) => {
            Ok(PropertyValue::String(value.to_string()))
        }
        (PropertyKind::Variant, PropertyValue::ElementRef(_)) => {
            Err("element value cannot select a variant".to_string())
        }

        (PropertyKind::InstanceSwap, PropertyValue::String(_) | PropertyValue::ElementRef(_)) => Ok(value.clone()),
        (PropertyKind::InstanceSwap, other) => {
            Err(format!("{} value cannot swap an instance", other.kind_name()))
        }
    }
}

/// Resolve every bag entry against the live schema
///
/// `aliases` maps semantic names to target names; names missing from it map
/// to themselves. Keys listed in `skip` (e.g. an image URL consumed
/// elsewhere) are neither resolved nor reported.
pub fn resolve(
    bag: &PropertyBag,
    schema: &[TargetPropertyDescriptor],
    aliases: &BTreeMap<String, String>,
    skip: &[&str],
) -> Resolution {
    let mut resolution = Resolution::default();

    for (key, value) in bag.iter() {
        if skip.contains(&key) {
            continue;
        }

        let target_name = aliases.get(key).map(String::as_str).unwrap_or(key);

        let Some(descriptor) = match_descriptor(target_name, schema) else {
            debug!(key, target = target_name, "no matching target property");
            resolution.unresolved.push(key.to_string());
            continue;
        };

        let value = match coerce(value, descriptor.kind) {
            Ok(v) => v,
            Err(reason) => {
                resolution.rejected.push(RejectedKey {
                    key: key.to_string(),
                    target_identifier: descriptor.identifier.clone(),
                    reason,
                });
                continue;
            }
        };

        let classification = match descriptor.kind {
            PropertyKind::Text => Classification::FreeText,
            PropertyKind::Boolean | PropertyKind::Variant | PropertyKind::InstanceSwap => Classification::Simple,
        };

        let assignment = ResolvedAssignment {
            key: key.to_string(),
            target_identifier: descriptor.identifier.clone(),
            value,
            classification,
        };

        debug!(key, target = %assignment.target_identifier, ?classification, "resolved property");

        match classification {
            Classification::Simple => resolution.simple.push(assignment),
            Classification::FreeText => resolution.free_text.push(assignment),
        }
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(identifier: &str, kind: PropertyKind) -> TargetPropertyDescriptor {
        TargetPropertyDescriptor::new(identifier, kind)
    }

    fn bag(entries: &[(&str, PropertyValue)]) -> PropertyBag {
        entries.iter().cloned().collect()
    }

    fn no_aliases() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    #[test]
    fn normalize_strips_decoration_and_suffix() {
        assert_eq!(normalize_identifier("✏️ initials#262:0"), "initials");
        assert_eq!(normalize_identifier("🔁 Icon L#12:3"), "icon l");
        assert_eq!(normalize_identifier("Size"), "size");
        assert_eq!(normalize_identifier("✏️ label"), "label");
        assert_eq!(normalize_identifier("#1:2"), "");
    }

    #[test]
    fn decorated_identifier_resolves_from_semantic_key() {
        let schema = vec![d("✏️ initials#262:0", PropertyKind::Text)];
        let found = match_descriptor("initials", &schema).unwrap();
        assert_eq!(found.identifier, "✏️ initials#262:0");
        assert!(match_descriptor("INITIALS", &schema).is_some());
    }

    #[test]
    fn exact_match_wins_over_normalized() {
        let schema = vec![d("Size#1:0", PropertyKind::Variant), d("size", PropertyKind::Variant)];
        assert_eq!(match_descriptor("size", &schema).unwrap().identifier, "size");
    }

    #[test]
    fn first_normalized_match_in_schema_order() {
        let schema = vec![d("⭐ size#1:0", PropertyKind::Variant), d("Size#9:9", PropertyKind::Variant)];
        assert_eq!(match_descriptor("size", &schema).unwrap().identifier, "⭐ size#1:0");
    }

    #[test]
    fn classification_by_kind() {
        let schema = vec![
            d("size", PropertyKind::Variant),
            d("✏️ initials#1", PropertyKind::Text),
            d("showStatus#3:1", PropertyKind::Boolean),
        ];
        let props = bag(&[
            ("size", "large".into()),
            ("initials", "JD".into()),
            ("showStatus", true.into()),
        ]);

        let r = resolve(&props, &schema, &no_aliases(), &[]);
        assert_eq!(r.simple.len(), 2);
        assert_eq!(r.free_text.len(), 1);
        assert_eq!(r.free_text[0].target_identifier, "✏️ initials#1");
        assert_eq!(r.free_text[0].classification, Classification::FreeText);
        assert!(r.unresolved.is_empty());
    }

    #[test]
    fn unmatched_key_is_unresolved_not_fatal() {
        let schema = vec![d("size", PropertyKind::Variant), d("✏️ initials#1", PropertyKind::Text)];
        let props = bag(&[("name", "Jo".into()), ("size", "large".into())]);

        let r = resolve(&props, &schema, &no_aliases(), &[]);
        assert_eq!(r.unresolved, vec!["name".to_string()]);
        assert_eq!(r.simple_batch(), vec![("size".to_string(), PropertyValue::from("large"))]);
        assert!(r.free_text.is_empty());
    }

    #[test]
    fn alias_routes_key_to_decorated_target() {
        let schema = vec![d("size", PropertyKind::Variant), d("✏️ initials#1", PropertyKind::Text)];
        let props = bag(&[("name", "Jo".into())]);
        let aliases = BTreeMap::from([("name".to_string(), "initials".to_string())]);

        let r = resolve(&props, &schema, &aliases, &[]);
        assert_eq!(r.free_text.len(), 1);
        assert_eq!(r.free_text[0].key, "name");
        assert_eq!(r.free_text[0].value, PropertyValue::from("Jo"));
    }

    #[test]
    fn decorated_bag_key_reaches_decorated_target() {
        let schema = vec![d("✏️ label#12:0", PropertyKind::Text)];
        let props = bag(&[("✏️ label", "Go".into())]);
        let r = resolve(&props, &schema, &no_aliases(), &[]);
        assert_eq!(r.free_text[0].target_identifier, "✏️ label#12:0");
    }

    #[test]
    fn incompatible_value_is_rejected() {
        let schema = vec![d("disabled", PropertyKind::Boolean)];
        let props = bag(&[("disabled", PropertyValue::Number(3.0))]);
        let r = resolve(&props, &schema, &no_aliases(), &[]);
        assert!(r.simple.is_empty());
        assert_eq!(r.rejected.len(), 1);
        assert_eq!(r.rejected[0].key, "disabled");
    }

    #[test]
    fn skipped_keys_are_not_reported() {
        let props = bag(&[("src", "https://example.com/a.png".into())]);
        let r = resolve(&props, &[], &no_aliases(), &["src"]);
        assert!(r.unresolved.is_empty());
    }

    #[test]
    fn coercions() {
        assert_eq!(
            coerce(&"TRUE".into(), PropertyKind::Boolean),
            Ok(PropertyValue::Boolean(true))
        );
        assert!(coerce(&"maybe".into(), PropertyKind::Boolean).is_err());
        assert_eq!(
            coerce(&PropertyValue::Number(2.0), PropertyKind::Variant),
            Ok(PropertyValue::from("2"))
        );
        assert_eq!(
            coerce(&PropertyValue::Boolean(false), PropertyKind::Text),
            Ok(PropertyValue::from("false"))
        );
        assert!(coerce(&PropertyValue::ElementRef("X".into()), PropertyKind::Variant).is_err());
        assert!(coerce(&PropertyValue::ElementRef("X".into()), PropertyKind::InstanceSwap).is_ok());
    }
}
