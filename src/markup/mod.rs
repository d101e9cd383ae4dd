//! Markup Module - pseudo-JSX tag parsing
//!
//! - `extract`: locate one tag, split attributes and inner text
//! - `lexer`: attribute source → explicit attribute list
//! - `decode`: ordered decode passes → `PropertyBag`
//! - `value`: `PropertyValue` / `PropertyBag`
//!
//! Data flow:
//! ```text
//! pasted code → extract_tag → TagMatch
//!                               ↓
//!                        tokenize (lexer)
//!                               ↓
//!                     decode passes (profile)
//!                               ↓
//!                          PropertyBag
//! ```

pub mod decode;
pub mod extract;
pub mod lexer;
pub mod value;

pub use decode::{decode, decode_tag, Pass};
pub use extract::{extract_tag, TagMatch};
pub use value::{PropertyBag, PropertyValue};

use crate::component::ComponentProfile;

/// Extract and decode in one step; `None` when the profile's tag is absent
pub fn parse_component(markup: &str, profile: &ComponentProfile) -> Option<PropertyBag> {
    extract_tag(markup, &profile.tag_name()).map(|tag| decode_tag(&tag, profile))
}
