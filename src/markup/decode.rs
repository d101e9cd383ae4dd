//! Attribute decoding
//!
//! Turns a lexed attribute list into a [`PropertyBag`] through a fixed,
//! ordered pipeline of passes. A key set by an earlier pass is never
//! overwritten by a later one; inside a single pass the last occurrence wins.

use std::collections::HashMap;

use tracing::debug;

use crate::component::ComponentProfile;
use crate::markup::extract::TagMatch;
use crate::markup::lexer::{tokenize, Attribute, RawValue};
use crate::markup::value::{PropertyBag, PropertyValue};

/// Decode passes in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pass {
    InnerText,
    Quoted,
    Element,
    Boolean,
    Numeric,
}

impl Pass {
    pub const ORDER: [Pass; 5] = [
        Pass::InnerText,
        Pass::Quoted,
        Pass::Element,
        Pass::Boolean,
        Pass::Numeric,
    ];

    /// Key/value this pass produces for an attribute, if the attribute belongs to it
    fn accept(self, attribute: &Attribute, profile: &ComponentProfile) -> Option<(String, PropertyValue)> {
        let key = || profile.rename(&attribute.name).to_string();

        match (self, &attribute.value) {
            (Pass::Quoted, RawValue::Quoted(v)) => Some((key(), PropertyValue::String(v.clone()))),
            (Pass::Element, RawValue::Element(ident)) => match profile.element_flag(&attribute.name) {
                Some(flag) => Some((flag.to_string(), PropertyValue::Boolean(true))),
                None => Some((key(), PropertyValue::ElementRef(ident.clone()))),
            },
            (Pass::Boolean, RawValue::Bool(b)) => Some((key(), PropertyValue::Boolean(*b))),
            (Pass::Boolean, RawValue::Bare) => Some((key(), PropertyValue::Boolean(true))),
            (Pass::Numeric, RawValue::Number(n)) => Some((key(), PropertyValue::Number(*n))),
            _ => None,
        }
    }
}

/// Decode an extracted tag for the given component profile
pub fn decode_tag(tag: &TagMatch, profile: &ComponentProfile) -> PropertyBag {
    decode(&tag.attribute_source, tag.inner_text.as_deref(), profile)
}

/// Decode an attribute source plus optional inner text into a property bag
pub fn decode(attribute_source: &str, inner_text: Option<&str>, profile: &ComponentProfile) -> PropertyBag {
    let attributes = tokenize(attribute_source);
    let mut bag = PropertyBag::new();
    let mut origin: HashMap<String, Pass> = HashMap::new();

    for attribute in &attributes {
        if let RawValue::Expression(expr) = &attribute.value {
            debug!(attribute = %attribute.name, expression = %expr, "skipping unsupported attribute expression");
        }
    }

    for pass in Pass::ORDER {
        let produced: Vec<(String, PropertyValue)> = match pass {
            Pass::InnerText => inner_text
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(|text| (profile.default_text_key.clone(), PropertyValue::String(text.to_string())))
                .into_iter()
                .collect(),
            _ => attributes
                .iter()
                .filter_map(|attribute| pass.accept(attribute, profile))
                .collect(),
        };

        for (key, value) in produced {
            match origin.get(&key) {
                Some(set_by) if *set_by < pass => {
                    debug!(key = %key, ?pass, earlier = ?set_by, "keeping value from earlier pass");
                }
                _ => {
                    origin.insert(key.clone(), pass);
                    bag.insert(key, value);
                }
            }
        }
    }

    debug!(component = %profile.name, props = bag.len(), "decoded tag attributes");
    bag
}
