use std::collections::BTreeMap;
use std::fmt;

use crate::osgi::{AttrValue, Clause, Filter, FilterError, Version, VersionError, VersionRange};

/// Directive value marking an optional requirement or import
const RESOLUTION_OPTIONAL: &str = "optional";

/// A capability offered in some namespace
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Capability {
    pub namespace: String,
    pub attributes: BTreeMap<String, AttrValue>,
    pub directives: BTreeMap<String, String>,
}

impl Capability {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// One capability per path of a `Provide-Capability` clause
    pub fn from_clause(clause: &Clause) -> Vec<Self> {
        clause
            .paths
            .iter()
            .map(|namespace| Self {
                namespace: namespace.clone(),
                attributes: clause.attributes.clone(),
                directives: clause.directives.clone(),
            })
            .collect()
    }
}

/// A requirement on a capability, optionally narrowed by a filter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Requirement {
    pub namespace: String,
    pub filter: Option<Filter>,
    pub directives: BTreeMap<String, String>,
}

impl Requirement {
    pub fn new(
        namespace: impl Into<String>,
        directives: BTreeMap<String, String>,
    ) -> Result<Self, FilterError> {
        let filter = directives
            .get("filter")
            .map(String::as_str)
            .map(Filter::parse)
            .transpose()?;
        Ok(Self {
            namespace: namespace.into(),
            filter,
            directives,
        })
    }

    /// One requirement per path of a `Require-Capability` clause
    pub fn from_clause(clause: &Clause) -> Result<Vec<Self>, FilterError> {
        clause
            .paths
            .iter()
            .map(|namespace| Self::new(namespace.clone(), clause.directives.clone()))
            .collect()
    }

    pub fn is_optional(&self) -> bool {
        self.directives.get("resolution").map(String::as_str) == Some(RESOLUTION_OPTIONAL)
    }

    /// Only requirements effective at resolve time take part in resolution
    pub fn is_resolve_time(&self) -> bool {
        self.directives
            .get("effective")
            .is_none_or(|effective| effective == "resolve")
    }

    pub fn matches(&self, capability: &Capability) -> bool {
        self.namespace == capability.namespace
            && self
                .filter
                .as_ref()
                .is_none_or(|filter| filter.matches(&capability.attributes))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{};filter:=\"{}\"", self.namespace, filter),
            None => f.write_str(&self.namespace),
        }
    }
}

/// A package exported by a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageExport {
    pub name: String,
    pub version: Version,
}

/// A package imported by a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageImport {
    pub name: String,
    pub range: VersionRange,
    pub optional: bool,
}

impl PackageExport {
    /// Parse `Export-Package` clauses; `specification-version` is honoured
    /// when `version` is absent
    pub fn from_clauses(clauses: &[Clause]) -> Result<Vec<Self>, VersionError> {
        let mut exports = Vec::new();
        for clause in clauses {
            let version = match clause
                .attribute("version")
                .or_else(|| clause.attribute("specification-version"))
            {
                Some(AttrValue::Version(v)) => v.clone(),
                Some(other) => Version::parse(&other.to_string())?,
                None => Version::default(),
            };
            exports.extend(clause.paths.iter().map(|name| PackageExport {
                name: name.clone(),
                version: version.clone(),
            }));
        }
        Ok(exports)
    }
}

impl PackageImport {
    pub fn from_clauses(clauses: &[Clause]) -> Result<Vec<Self>, VersionError> {
        let mut imports = Vec::new();
        for clause in clauses {
            let range = match clause.attribute("version") {
                Some(value) => VersionRange::parse(&value.to_string())?,
                None => VersionRange::default(),
            };
            let optional = clause.directive("resolution") == Some(RESOLUTION_OPTIONAL);
            imports.extend(clause.paths.iter().map(|name| PackageImport {
                name: name.clone(),
                range: range.clone(),
                optional,
            }));
        }
        Ok(imports)
    }
}
