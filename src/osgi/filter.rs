//! LDAP-style filters (RFC 1960) as used in OSGi requirement directives.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::header::AttrValue;
use super::version::Version;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid filter '{filter}' at position {position}: {reason}")]
pub struct FilterError {
    pub filter: String,
    pub position: usize,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Present(String),
    Compare { attr: String, op: Op, value: String },
    Substring { attr: String, parts: Vec<String> },
}

/// A parsed filter expression that keeps its source text for messages
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    source: String,
    root: Node,
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let mut parser = Parser {
            source: input,
            chars: input.trim().chars().collect(),
            pos: 0,
        };
        let root = parser.node()?;
        if parser.pos != parser.chars.len() {
            return Err(parser.error("unexpected trailing characters"));
        }
        Ok(Self {
            source: input.trim().to_string(),
            root,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate the filter against a set of capability attributes
    pub fn matches(&self, attributes: &BTreeMap<String, AttrValue>) -> bool {
        eval(&self.root, attributes)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &'static str) -> FilterError {
        FilterError {
            filter: self.source.to_string(),
            position: self.pos,
            reason,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char, reason: &'static str) -> Result<(), FilterError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn node(&mut self) -> Result<Node, FilterError> {
        self.skip_whitespace();
        self.expect('(', "expected '('")?;
        self.skip_whitespace();

        let node = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Node::And(self.children()?)
            }
            Some('|') => {
                self.pos += 1;
                Node::Or(self.children()?)
            }
            Some('!') => {
                self.pos += 1;
                Node::Not(Box::new(self.node()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };

        self.skip_whitespace();
        self.expect(')', "expected ')'")?;
        Ok(node)
    }

    fn children(&mut self) -> Result<Vec<Node>, FilterError> {
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('(') => children.push(self.node()?),
                _ if children.is_empty() => return Err(self.error("empty filter list")),
                _ => return Ok(children),
            }
        }
    }

    fn item(&mut self) -> Result<Node, FilterError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '<' | '>' | '~' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let attr: String = self.chars[start..self.pos].iter().collect();
        let attr = attr.trim().to_string();
        if attr.is_empty() {
            return Err(self.error("missing attribute name"));
        }

        let op = match self.peek() {
            Some('=') => Op::Equal,
            Some('~') => Op::Approx,
            Some('>') => Op::GreaterEq,
            Some('<') => Op::LessEq,
            _ => return Err(self.error("missing operator")),
        };
        self.pos += 1;
        if op != Op::Equal {
            self.expect('=', "expected '=' after operator")?;
        }

        let (value, wildcards) = self.value()?;
        if op != Op::Equal || wildcards.is_empty() {
            return Ok(Node::Compare { attr, op, value });
        }
        if value == "*" && wildcards == [0] {
            return Ok(Node::Present(attr));
        }

        let mut parts = Vec::new();
        let mut last = 0;
        for index in wildcards {
            parts.push(value[last..index].to_string());
            last = index + 1;
        }
        parts.push(value[last..].to_string());
        Ok(Node::Substring { attr, parts })
    }

    /// Read a value up to the closing paren, returning the unescaped text and
    /// the byte offsets of unescaped `*` characters
    fn value(&mut self) -> Result<(String, Vec<usize>), FilterError> {
        let mut value = String::new();
        let mut wildcards = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(')') => return Ok((value, wildcards)),
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    value.push(escaped);
                    self.pos += 1;
                }
                Some('*') => {
                    wildcards.push(value.len());
                    value.push('*');
                    self.pos += 1;
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}

fn eval(node: &Node, attributes: &BTreeMap<String, AttrValue>) -> bool {
    match node {
        Node::And(children) => children.iter().all(|c| eval(c, attributes)),
        Node::Or(children) => children.iter().any(|c| eval(c, attributes)),
        Node::Not(child) => !eval(child, attributes),
        Node::Present(attr) => attributes.contains_key(attr),
        Node::Compare { attr, op, value } => attributes
            .get(attr)
            .is_some_and(|actual| compare(actual, *op, value)),
        Node::Substring { attr, parts } => attributes
            .get(attr)
            .is_some_and(|actual| substring(actual, parts)),
    }
}

fn compare(actual: &AttrValue, op: Op, literal: &str) -> bool {
    match actual {
        AttrValue::List(items) => items.iter().any(|item| compare(item, op, literal)),
        AttrValue::Long(v) => literal
            .trim()
            .parse::<i64>()
            .is_ok_and(|lit| ordered(v.cmp(&lit), op)),
        AttrValue::Double(v) => literal
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|lit| v.partial_cmp(&lit))
            .is_some_and(|ord| ordered(ord, op)),
        AttrValue::Version(v) => {
            Version::parse(literal).is_ok_and(|lit| ordered(v.cmp(&lit), op))
        }
        AttrValue::String(s) => match op {
            Op::Equal => s == literal,
            Op::Approx => normalize(s) == normalize(literal),
            Op::GreaterEq | Op::LessEq => match (Version::parse(s), Version::parse(literal)) {
                (Ok(a), Ok(b)) => ordered(a.cmp(&b), op),
                _ => ordered(s.as_str().cmp(literal), op),
            },
        },
    }
}

fn ordered(ordering: std::cmp::Ordering, op: Op) -> bool {
    match op {
        Op::Equal | Op::Approx => ordering.is_eq(),
        Op::GreaterEq => ordering.is_ge(),
        Op::LessEq => ordering.is_le(),
    }
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn substring(actual: &AttrValue, parts: &[String]) -> bool {
    if let AttrValue::List(items) = actual {
        return items.iter().any(|item| substring(item, parts));
    }

    let text = actual.to_string();
    let (Some(first), Some(last)) = (parts.first(), parts.last()) else {
        return false;
    };
    if !text.starts_with(first.as_str()) {
        return false;
    }

    let mut rest = &text[first.len()..];
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle.as_str()) {
            Some(index) => rest = &rest[index + middle.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttrValue)]) -> BTreeMap<String, AttrValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_equality_and_presence() {
        let a = attrs(&[("osgi.extender", AttrValue::String("osgi.component".into()))]);
        assert!(Filter::parse("(osgi.extender=osgi.component)").unwrap().matches(&a));
        assert!(Filter::parse("(osgi.extender=*)").unwrap().matches(&a));
        assert!(!Filter::parse("(other=*)").unwrap().matches(&a));
    }

    #[test]
    fn test_composite_with_versions() {
        let a = attrs(&[
            ("osgi.extender", AttrValue::String("osgi.component".into())),
            ("version", AttrValue::Version(Version::new(1, 4, 0))),
        ]);
        let filter =
            Filter::parse("(&(osgi.extender=osgi.component)(version>=1.3)(!(version>=2.0)))")
                .unwrap();
        assert!(filter.matches(&a));

        let too_old = Filter::parse("(&(osgi.extender=osgi.component)(version>=1.5))").unwrap();
        assert!(!too_old.matches(&a));
    }

    #[test]
    fn test_list_and_long_attributes() {
        let a = attrs(&[
            (
                "version",
                AttrValue::List(vec![
                    AttrValue::Version(Version::new(1, 8, 0)),
                    AttrValue::Version(Version::new(11, 0, 0)),
                ]),
            ),
            ("ranking", AttrValue::Long(10)),
        ]);
        assert!(Filter::parse("(version=11)").unwrap().matches(&a));
        assert!(Filter::parse("(|(ranking<=5)(ranking>=10))").unwrap().matches(&a));
        assert!(!Filter::parse("(ranking=abc)").unwrap().matches(&a));
    }

    #[test]
    fn test_substring_and_approx() {
        let a = attrs(&[("name", AttrValue::String("org.apache.sling.api".into()))]);
        assert!(Filter::parse("(name=org.apache*)").unwrap().matches(&a));
        assert!(Filter::parse("(name=*sling*)").unwrap().matches(&a));
        assert!(Filter::parse("(name=org*sling*api)").unwrap().matches(&a));
        assert!(!Filter::parse("(name=*felix*)").unwrap().matches(&a));
        assert!(Filter::parse("(name~=ORG.apache.SLING.api)").unwrap().matches(&a));
    }

    #[test]
    fn test_string_ordering_uses_versions() {
        let a = attrs(&[("version", AttrValue::String("1.10".into()))]);
        assert!(Filter::parse("(version>=1.8)").unwrap().matches(&a));
    }

    #[test]
    fn test_escaped_value() {
        let a = attrs(&[("path", AttrValue::String("a(b)*".into()))]);
        assert!(Filter::parse(r"(path=a\(b\)\*)").unwrap().matches(&a));
    }

    #[test]
    fn test_invalid_filters() {
        assert!(Filter::parse("osgi.ee=JavaSE").is_err());
        assert!(Filter::parse("(&)").is_err());
        assert!(Filter::parse("(a=b").is_err());
        assert!(Filter::parse("(=b)").is_err());
        assert!(Filter::parse("(a=b))").is_err());
        assert!(Filter::parse("(a>b)").is_err());
    }

    #[test]
    fn test_display_keeps_source() {
        let filter = Filter::parse(" (a=b) ").unwrap();
        assert_eq!(filter.to_string(), "(a=b)");
    }
}
