//! Manifest header clause parsing.
//!
//! OSGi headers such as `Export-Package` or `Require-Capability` share one
//! grammar:
//!
//! ```text
//! header    ::= clause ( ',' clause )*
//! clause    ::= path ( ';' path )* ( ';' parameter )*
//! parameter ::= name '=' value | name ':' type '=' value | name ':=' value
//! ```
//!
//! Values may be double-quoted, in which case they can contain `,` and `;`.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::version::Version;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("unterminated quoted string in '{0}'")]
    UnterminatedQuote(String),
    #[error("clause without path in '{0}'")]
    MissingPath(String),
    #[error("empty parameter name in '{0}'")]
    EmptyName(String),
    #[error("duplicate {kind} '{name}' in clause '{clause}'")]
    Duplicate {
        kind: &'static str,
        name: String,
        clause: String,
    },
    #[error("cannot convert '{value}' to {ty}")]
    InvalidTypedValue { value: String, ty: String },
    #[error("unknown attribute type '{0}'")]
    UnknownType(String),
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Long(i64),
    Double(f64),
    Version(Version),
    String(String),
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Convert a raw, possibly quoted, value according to an OSGi attribute
    /// type name. List items are split on unescaped commas.
    pub fn typed(raw: &str, ty: &str) -> Result<Self, HeaderError> {
        let ty = ty.trim();
        let Some(element) = ty.strip_prefix("List") else {
            return AttrValue::scalar(unquote(raw.trim()), ty);
        };
        let element = element
            .trim()
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .unwrap_or("String");

        let raw = raw.trim();
        let inner = raw
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(raw);
        split_list(inner)
            .iter()
            .map(|item| {
                let item = item.trim();
                let text = if item.starts_with('"') {
                    unquote(item)
                } else {
                    unescape(item)
                };
                AttrValue::scalar(text, element)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(AttrValue::List)
    }

    fn scalar(value: String, ty: &str) -> Result<Self, HeaderError> {
        let invalid = || HeaderError::InvalidTypedValue {
            value: value.clone(),
            ty: ty.to_string(),
        };

        match ty.trim() {
            "String" => Ok(AttrValue::String(value.clone())),
            "Long" => value.trim().parse().map(AttrValue::Long).map_err(|_| invalid()),
            "Double" => value.trim().parse().map(AttrValue::Double).map_err(|_| invalid()),
            "Version" => Version::parse(&value)
                .map(AttrValue::Version)
                .map_err(|_| invalid()),
            other => Err(HeaderError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Long(v) => write!(f, "{v}"),
            AttrValue::Double(v) => write!(f, "{v}"),
            AttrValue::Version(v) => write!(f, "{v}"),
            AttrValue::String(v) => write!(f, "{v}"),
            AttrValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", rendered.join(","))
            }
        }
    }
}

/// One clause of a manifest header
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Clause {
    pub paths: Vec<String>,
    pub attributes: BTreeMap<String, AttrValue>,
    pub directives: BTreeMap<String, String>,
}

impl Clause {
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives.get(name).map(String::as_str)
    }
}

/// Parse a full header value into its clauses
pub fn parse_header(value: &str) -> Result<Vec<Clause>, HeaderError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    if has_unterminated_quote(value) {
        return Err(HeaderError::UnterminatedQuote(value.to_string()));
    }

    split_outside_quotes(value, ',')
        .into_iter()
        .filter(|clause| !clause.trim().is_empty())
        .map(|clause| parse_clause(&clause))
        .collect()
}

fn parse_clause(raw: &str) -> Result<Clause, HeaderError> {
    let mut clause = Clause::default();

    for piece in split_outside_quotes(raw, ';') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }

        let Some(eq) = find_outside_quotes(piece, '=') else {
            if !clause.attributes.is_empty() || !clause.directives.is_empty() {
                return Err(HeaderError::MissingPath(raw.to_string()));
            }
            clause.paths.push(piece.to_string());
            continue;
        };

        let (key, value) = (&piece[..eq], piece[eq + 1..].trim());
        if let Some(name) = key.trim_end().strip_suffix(':') {
            let name = checked_name(name, raw)?;
            if clause.directives.insert(name.clone(), unquote(value)).is_some() {
                return Err(duplicate("directive", name, raw));
            }
        } else {
            let (name, typed) = match key.split_once(':') {
                Some((name, ty)) => (name, AttrValue::typed(value, ty)?),
                None => (key, AttrValue::String(unquote(value))),
            };
            let name = checked_name(name, raw)?;
            if clause.attributes.insert(name.clone(), typed).is_some() {
                return Err(duplicate("attribute", name, raw));
            }
        }
    }

    if clause.paths.is_empty() {
        return Err(HeaderError::MissingPath(raw.to_string()));
    }
    Ok(clause)
}

fn checked_name(name: &str, clause: &str) -> Result<String, HeaderError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HeaderError::EmptyName(clause.to_string()));
    }
    Ok(name.to_string())
}

fn duplicate(kind: &'static str, name: String, clause: &str) -> HeaderError {
    HeaderError::Duplicate {
        kind,
        name,
        clause: clause.trim().to_string(),
    }
}

fn has_unterminated_quote(value: &str) -> bool {
    let mut in_quotes = false;
    let mut escaped = false;
    for c in value.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ => {}
        }
    }
    in_quotes
}

/// Split on `separator`, ignoring separators inside double quotes
fn split_outside_quotes(value: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in value.chars() {
        if escaped {
            escaped = false;
            current.push(c);
            continue;
        }
        match c {
            '\\' if in_quotes => {
                escaped = true;
                current.push(c);
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c == separator && !in_quotes => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn find_outside_quotes(value: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (index, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == target && !in_quotes => return Some(index),
            _ => {}
        }
    }
    None
}

/// Split a list value on commas not preceded by `\`, keeping escapes and
/// quotes in the items
fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' => items.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    items.push(current);
    items
}

/// Strip surrounding double quotes and resolve `\` escapes
fn unquote(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => unescape(inner),
        None => value.to_string(),
    }
}

fn unescape(inner: &str) -> String {
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(c);
        }
    }
    result
}
