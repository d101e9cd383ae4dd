//! Tag extraction
//!
//! Locates the first `<Tag ...>` occurrence in pasted code and splits it into
//! the raw attribute source and the optional inner text. Manual scanning
//! instead of a single regex so that `>` inside quotes or inside `{...}`
//! (e.g. `icon={<Plus />}`) never ends the attribute region.

/// Result of a successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    /// Everything between the tag name and the closing `>` / `/>`, trimmed
    pub attribute_source: String,
    /// Trimmed body of `<Tag ...>body</Tag>`; `None` for self-closing or empty bodies
    pub inner_text: Option<String>,
}

/// How the attribute region ended
enum RegionEnd {
    /// `/>` at `attrs_end`
    SelfClosing { attrs_end: usize },
    /// `>` at `attrs_end`, body starts right after
    Open { attrs_end: usize, body_start: usize },
}

/// Extract the first occurrence of `tag_name` (ASCII case-insensitive)
///
/// Returns `None` when no such tag exists. This is an expected outcome, not
/// an error.
pub fn extract_tag(source: &str, tag_name: &str) -> Option<TagMatch> {
    if tag_name.is_empty() {
        return None;
    }

    let mut from = 0;
    while let Some(start) = find_open_tag(source, tag_name, from) {
        let attrs_start = start + 1 + tag_name.len();

        match scan_region(source, attrs_start) {
            Some(RegionEnd::SelfClosing { attrs_end }) => {
                return Some(TagMatch {
                    attribute_source: source[attrs_start..attrs_end].trim().to_string(),
                    inner_text: None,
                });
            }
            Some(RegionEnd::Open {
                attrs_end,
                body_start,
            }) => {
                let inner_text = find_closing_tag(source, tag_name, body_start)
                    .map(|end| source[body_start..end].trim())
                    .filter(|body| !body.is_empty())
                    .map(str::to_string);

                return Some(TagMatch {
                    attribute_source: source[attrs_start..attrs_end].trim().to_string(),
                    inner_text,
                });
            }
            // Unterminated opening tag: keep looking after it
            None => from = attrs_start,
        }
    }

    None
}

/// Whether `source` contains an opening `<tag_name`
///
/// Same boundary rule as [`extract_tag`]: the name ends at whitespace, `>`
/// or `/>`, so whatever is detected can also be extracted.
pub fn has_open_tag(source: &str, tag_name: &str) -> bool {
    !tag_name.is_empty() && find_open_tag(source, tag_name, 0).is_some()
}

/// Byte offset of the next `<tag_name` whose name ends at whitespace, `>` or `/>`
fn find_open_tag(source: &str, tag_name: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = from;

    while i < bytes.len() {
        if bytes[i] == b'<' {
            let name_end = i + 1 + tag_name.len();
            let matches_name = source
                .get(i + 1..name_end)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag_name));

            if matches_name {
                let rest = &source[name_end..];
                if rest.starts_with(char::is_whitespace)
                    || rest.starts_with('>')
                    || rest.starts_with("/>")
                {
                    return Some(i);
                }
            }
        }
        i += 1;
    }

    None
}

/// Scan the attribute region starting at `start`, honoring quotes and braces
fn scan_region(source: &str, start: usize) -> Option<RegionEnd> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut chars = source[start..].char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        let i = start + offset;

        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 && chars.peek().map(|(_, c)| *c) == Some('>') => {
                return Some(RegionEnd::SelfClosing { attrs_end: i });
            }
            '>' if depth == 0 => {
                return Some(RegionEnd::Open {
                    attrs_end: i,
                    body_start: i + 1,
                });
            }
            _ => {}
        }
    }

    None
}

/// Byte offset of the `</tag_name>` closing the body that starts at `from`
fn find_closing_tag(source: &str, tag_name: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = from;

    while i + 1 < bytes.len() {
        if bytes[i] == b'<' && bytes[i + 1] == b'/' {
            let name_end = i + 2 + tag_name.len();
            let matches_name = source
                .get(i + 2..name_end)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag_name));

            if matches_name && source[name_end..].trim_start().starts_with('>') {
                return Some(i);
            }
        }
        i += 1;
    }

    None
}
