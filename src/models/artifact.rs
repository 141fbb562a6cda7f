use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed characters in a coordinate segment
static SEGMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("invalid SEGMENT_PATTERN regex"));

/// Versions additionally allow `+` build metadata
static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-+]+$").expect("invalid VERSION_PATTERN regex"));

const DEFAULT_TYPE: &str = "jar";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactIdError {
    #[error("invalid artifact id '{0}': expected group:artifact[:type[:classifier]]:version")]
    WrongSegmentCount(String),
    #[error("invalid artifact id '{id}': bad {segment} '{value}'")]
    InvalidSegment {
        id: String,
        segment: &'static str,
        value: String,
    },
}

/// Maven-style coordinates of an artifact.
///
/// The textual form is `group:artifact:version`, `group:artifact:type:version`
/// or `group:artifact:type:classifier:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId {
    group: String,
    artifact: String,
    version: String,
    kind: String,
    classifier: Option<String>,
}

impl ArtifactId {
    pub fn new(group: &str, artifact: &str, version: &str) -> Result<Self, ArtifactIdError> {
        Self::parse(&format!("{group}:{artifact}:{version}"))
    }

    pub fn parse(input: &str) -> Result<Self, ArtifactIdError> {
        let segments: Vec<&str> = input.trim().split(':').collect();
        let (group, artifact, kind, classifier, version) = match segments.as_slice() {
            [g, a, v] => (*g, *a, DEFAULT_TYPE, None, *v),
            [g, a, t, v] => (*g, *a, *t, None, *v),
            [g, a, t, c, v] => (*g, *a, *t, Some(*c), *v),
            _ => return Err(ArtifactIdError::WrongSegmentCount(input.to_string())),
        };

        Ok(Self {
            group: checked(input, "group", group, &SEGMENT_PATTERN)?,
            artifact: checked(input, "artifact", artifact, &SEGMENT_PATTERN)?,
            version: checked(input, "version", version, &VERSION_PATTERN)?,
            kind: checked(input, "type", kind, &SEGMENT_PATTERN)?,
            classifier: classifier
                .map(|c| checked(input, "classifier", c, &SEGMENT_PATTERN))
                .transpose()?,
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// Relative path of the artifact inside a Maven-layout repository
    pub fn repository_path(&self) -> PathBuf {
        let mut path: PathBuf = self.group.split('.').collect();
        path.push(&self.artifact);
        path.push(&self.version);

        let file_name = match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact, self.version, classifier, self.kind
            ),
            None => format!("{}-{}.{}", self.artifact, self.version, self.kind),
        };
        path.push(file_name);
        path
    }
}

fn checked(
    id: &str,
    segment: &'static str,
    value: &str,
    pattern: &Regex,
) -> Result<String, ArtifactIdError> {
    if pattern.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(ArtifactIdError::InvalidSegment {
            id: id.to_string(),
            segment,
            value: value.to_string(),
        })
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(classifier) => write!(
                f,
                "{}:{}:{}:{}:{}",
                self.group, self.artifact, self.kind, classifier, self.version
            ),
            None if self.kind != DEFAULT_TYPE => write!(
                f,
                "{}:{}:{}:{}",
                self.group, self.artifact, self.kind, self.version
            ),
            None => write!(f, "{}:{}:{}", self.group, self.artifact, self.version),
        }
    }
}

impl FromStr for ArtifactId {
    type Err = ArtifactIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = ArtifactIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ArtifactId> for String {
    fn from(value: ArtifactId) -> Self {
        value.to_string()
    }
}
