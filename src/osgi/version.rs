//! OSGi versions and version ranges.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid version '{0}'")]
    InvalidVersion(String),
    #[error("invalid version range '{0}'")]
    InvalidRange(String),
}

/// An OSGi version: `major.minor.micro.qualifier`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
}

impl Version {
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Parse a version; an empty string is `0.0.0`
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let invalid = || VersionError::InvalidVersion(input.to_string());
        let mut parts = trimmed.splitn(4, '.');
        let mut numbers = [0u64; 3];

        for (index, slot) in numbers.iter_mut().enumerate() {
            match parts.next() {
                Some(part) => {
                    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(invalid());
                    }
                    *slot = part.parse().map_err(|_| invalid())?;
                }
                None if index > 0 => break,
                None => return Err(invalid()),
            }
        }

        let qualifier = match parts.next() {
            Some("") => return Err(invalid()),
            Some(qualifier) => qualifier.to_string(),
            None => String::new(),
        };
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid());
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            micro: numbers[2],
            qualifier,
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.micro.cmp(&other.micro))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

/// An OSGi version range.
///
/// A bare version such as `1.2` means "at least 1.2"; the interval forms
/// `[1,2)`, `(1,2]` and so on bound both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    pub left: Version,
    pub left_inclusive: bool,
    pub right: Option<Version>,
    pub right_inclusive: bool,
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::at_least(Version::default())
    }
}

impl VersionRange {
    pub fn at_least(version: Version) -> Self {
        Self {
            left: version,
            left_inclusive: true,
            right: None,
            right_inclusive: false,
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let invalid = || VersionError::InvalidRange(input.to_string());

        let left_inclusive = match trimmed.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Version::parse(trimmed).map(Self::at_least).map_err(|_| invalid()),
        };
        let right_inclusive = match trimmed.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid()),
        };

        let inner = &trimmed[1..trimmed.len() - 1];
        let (left, right) = inner.split_once(',').ok_or_else(invalid)?;
        let left = Version::parse(left).map_err(|_| invalid())?;
        let right = Version::parse(right).map_err(|_| invalid())?;
        if left > right {
            return Err(invalid());
        }

        Ok(Self {
            left,
            left_inclusive,
            right: Some(right),
            right_inclusive,
        })
    }

    pub fn includes(&self, version: &Version) -> bool {
        let above_left = if self.left_inclusive {
            version >= &self.left
        } else {
            version > &self.left
        };
        let below_right = match &self.right {
            None => true,
            Some(right) if self.right_inclusive => version <= right,
            Some(right) => version < right,
        };
        above_left && below_right
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.right {
            None => write!(f, "{}", self.left),
            Some(right) => write!(
                f,
                "{}{},{}{}",
                if self.left_inclusive { '[' } else { '(' },
                self.left,
                right,
                if self.right_inclusive { ']' } else { ')' }
            ),
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(value: VersionRange) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_versions() {
        assert_eq!(Version::parse("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(Version::parse("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(Version::parse("").unwrap(), Version::new(0, 0, 0));
    }

    #[test]
    fn test_parse_qualifier() {
        let v = Version::parse("2.4.1.SNAPSHOT").unwrap();
        assert_eq!(v.micro, 1);
        assert_eq!(v.qualifier, "SNAPSHOT");
        assert_eq!(v.to_string(), "2.4.1.SNAPSHOT");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Version::parse("a.b").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("1.2.3.q!").is_err());
        assert!(Version::parse("-1").is_err());
        assert!(Version::parse("1.2.3.").is_err());
        assert!(Version::parse("1.2.").is_err());
    }

    #[test]
    fn test_ordering() {
        let a = Version::parse("1.2.3").unwrap();
        let b = Version::parse("1.10").unwrap();
        let c = Version::parse("1.2.3.beta").unwrap();
        assert!(a < b);
        assert!(a < c);
    }

    #[test]
    fn test_range_bare_version_is_lower_bound() {
        let range = VersionRange::parse("1.5").unwrap();
        assert!(range.includes(&Version::parse("1.5").unwrap()));
        assert!(range.includes(&Version::parse("99").unwrap()));
        assert!(!range.includes(&Version::parse("1.4.9").unwrap()));
    }

    #[test]
    fn test_range_interval() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(range.includes(&Version::parse("1.0").unwrap()));
        assert!(range.includes(&Version::parse("1.9.9").unwrap()));
        assert!(!range.includes(&Version::parse("2.0").unwrap()));

        let exclusive = VersionRange::parse("(1.0,2.0]").unwrap();
        assert!(!exclusive.includes(&Version::parse("1.0").unwrap()));
        assert!(exclusive.includes(&Version::parse("2.0").unwrap()));
        assert_eq!(exclusive.to_string(), "(1.0.0,2.0.0]");
    }

    #[test]
    fn test_range_invalid() {
        assert!(VersionRange::parse("[1.0,2.0").is_err());
        assert!(VersionRange::parse("[2.0,1.0]").is_err());
        assert!(VersionRange::parse("[1.0]").is_err());
    }
}
