//! Attribute lexer
//!
//! Tokenizes an attribute source (`name="Jo" active size={3} icon={<Plus />}`)
//! into an explicit attribute list in one left-to-right pass. Every character
//! belongs to at most one attribute, so a bare word inside a quoted value can
//! never be mistaken for a boolean attribute.

use std::iter::Peekable;
use std::str::CharIndices;

/// Raw attribute as written in the source, before any component remapping
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: RawValue,
}

/// Attribute value shapes recognized by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// `name="v"`, `name='v'` or `name={"v"}`
    Quoted(String),
    /// `name={<Ident ... />}` (stores `Ident`)
    Element(String),
    /// `name={true}` / `name={false}`
    Bool(bool),
    /// `name={123}`, `name={-1.5}`
    Number(f64),
    /// `name` alone
    Bare,
    /// Anything else inside braces or unquoted; not supported, kept for logging
    Expression(String),
}

type Chars<'a> = Peekable<CharIndices<'a>>;

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-'
}

/// Tokenize an attribute source into attributes, in source order
pub fn tokenize(source: &str) -> Vec<Attribute> {
    let mut attributes = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if !is_name_char(ch) {
            // Whitespace, stray `/`, `>` or garbage between attributes
            chars.next();
            continue;
        }

        let name = read_name(&mut chars, source, start);
        skip_whitespace(&mut chars);

        let value = if chars.peek().map(|(_, c)| *c) == Some('=') {
            chars.next();
            skip_whitespace(&mut chars);
            read_value(&mut chars, source)
        } else {
            RawValue::Bare
        };

        attributes.push(Attribute { name, value });
    }

    attributes
}

fn read_name(chars: &mut Chars<'_>, source: &str, start: usize) -> String {
    let mut end = start;
    while let Some(&(i, ch)) = chars.peek() {
        if !is_name_char(ch) {
            break;
        }
        end = i + ch.len_utf8();
        chars.next();
    }
    source[start..end].to_string()
}

fn skip_whitespace(chars: &mut Chars<'_>) {
    while chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
        chars.next();
    }
}

fn read_value(chars: &mut Chars<'_>, source: &str) -> RawValue {
    match chars.peek().copied() {
        Some((i, q @ ('"' | '\''))) => {
            chars.next();
            RawValue::Quoted(read_until_quote(chars, source, i + 1, q))
        }
        Some((i, '{')) => {
            chars.next();
            let inner = read_braced(chars, source, i + 1);
            classify_braced(inner.trim())
        }
        Some((i, _)) => {
            // Unquoted value: runs until whitespace
            let mut end = i;
            while let Some(&(j, ch)) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                end = j + ch.len_utf8();
                chars.next();
            }
            RawValue::Expression(source[i..end].to_string())
        }
        None => RawValue::Expression(String::new()),
    }
}

/// Read up to (and consume) the closing quote; an unterminated quote runs to the end
fn read_until_quote(chars: &mut Chars<'_>, source: &str, start: usize, quote: char) -> String {
    for (i, ch) in chars.by_ref() {
        if ch == quote {
            return source[start..i].to_string();
        }
    }
    source[start..].to_string()
}

/// Read a balanced `{...}` body (opening brace already consumed)
fn read_braced<'a>(chars: &mut Chars<'_>, source: &'a str, start: usize) -> &'a str {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;

    for (i, ch) in chars.by_ref() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &source[start..i];
                }
            }
            _ => {}
        }
    }

    &source[start..]
}

fn classify_braced(inner: &str) -> RawValue {
    match inner {
        "true" => return RawValue::Bool(true),
        "false" => return RawValue::Bool(false),
        _ => {}
    }

    if let Some(element) = inner.strip_prefix('<') {
        let ident: String = element
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
            .collect();
        if !ident.is_empty() {
            return RawValue::Element(ident);
        }
    }

    if let Some(literal) = string_literal(inner) {
        return RawValue::Quoted(literal.to_string());
    }

    if looks_numeric(inner) {
        if let Ok(n) = inner.parse::<f64>() {
            return RawValue::Number(n);
        }
    }

    RawValue::Expression(inner.to_string())
}

fn string_literal(inner: &str) -> Option<&str> {
    ['"', '\'', '`'].iter().find_map(|&q| {
        inner
            .strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
            .filter(|body| !body.contains(q))
    })
}

/// Digits with an optional leading sign and a single decimal point
fn looks_numeric(inner: &str) -> bool {
    let digits = inner.strip_prefix(['-', '+']).unwrap_or(inner);
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1
}
