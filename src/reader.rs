//! Feature document loading.
//!
//! A feature is read from JSON in three steps: the raw document is checked
//! against a schema derived from the raw model (so every structural problem
//! is reported at once), deserialized, and finally converted into the domain
//! [`Feature`] with parsed artifact ids, filters and substituted variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::{ArtifactId, ArtifactIdError, Capability, Feature, FeatureBundle, Requirement};
use crate::osgi::{AttrValue, FilterError, HeaderError};

/// Pattern to match ${name} variable references
static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("invalid VARIABLE_PATTERN regex")
});

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("failed to read feature file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid feature JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("feature document does not match the schema: {}", .0.join("; "))]
    Schema(Vec<String>),
    #[error(transparent)]
    InvalidArtifactId(#[from] ArtifactIdError),
    #[error("invalid start order '{value}' for bundle {bundle}")]
    InvalidStartOrder { bundle: String, value: String },
    #[error("unknown variable '{name}' referenced by framework property '{property}'")]
    UnknownVariable { name: String, property: String },
    #[error("invalid requirement in namespace '{namespace}': {source}")]
    InvalidFilter {
        namespace: String,
        #[source]
        source: FilterError,
    },
    #[error("invalid capability attribute '{attribute}': {source}")]
    InvalidAttribute {
        attribute: String,
        #[source]
        source: HeaderError,
    },
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
struct RawFeature {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
    #[serde(default)]
    framework_properties: BTreeMap<String, String>,
    #[serde(default)]
    bundles: Vec<RawBundle>,
    #[serde(default)]
    requirements: Vec<RawRequirement>,
    #[serde(default)]
    capabilities: Vec<RawCapability>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(untagged)]
enum RawBundle {
    Id(String),
    Entry {
        id: String,
        #[serde(default, rename = "start-order")]
        start_order: Option<RawStartOrder>,
    },
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(untagged)]
enum RawStartOrder {
    Number(u32),
    Text(String),
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RawRequirement {
    namespace: String,
    #[serde(default)]
    directives: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RawCapability {
    namespace: String,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
    #[serde(default)]
    directives: BTreeMap<String, String>,
}

/// Read and convert a feature file
pub async fn read_feature(path: &Path) -> Result<Feature, FeatureError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FeatureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Read feature document from {:?}", path);
    parse_feature(&content)
}

/// Parse a feature from its JSON text
pub fn parse_feature(json: &str) -> Result<Feature, FeatureError> {
    let document: Value = serde_json::from_str(json)?;

    let violations = schema_violations(&document)?;
    if !violations.is_empty() {
        return Err(FeatureError::Schema(violations));
    }

    let raw: RawFeature = serde_json::from_value(document)?;
    convert(raw)
}

fn schema_violations(document: &Value) -> Result<Vec<String>, FeatureError> {
    let schema = serde_json::to_value(schemars::schema_for!(RawFeature))?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| FeatureError::Schema(vec![format!("unusable feature schema: {e}")]))?;

    Ok(validator
        .iter_errors(document)
        .map(|error| {
            let location = error.instance_path.to_string();
            if location.is_empty() {
                error.to_string()
            } else {
                format!("{location}: {error}")
            }
        })
        .collect())
}

fn convert(raw: RawFeature) -> Result<Feature, FeatureError> {
    let mut feature = Feature::new(ArtifactId::parse(&raw.id)?);
    feature.title = raw.title;
    feature.description = raw.description;

    for (property, value) in &raw.framework_properties {
        let resolved = substitute(property, value, &raw.variables)?;
        feature.framework_properties.insert(property.clone(), resolved);
    }
    feature.variables = raw.variables;

    for bundle in raw.bundles {
        feature.bundles.push(convert_bundle(bundle)?);
    }

    for requirement in raw.requirements {
        let namespace = requirement.namespace.clone();
        let parsed = Requirement::new(requirement.namespace, requirement.directives)
            .map_err(|source| FeatureError::InvalidFilter { namespace, source })?;
        feature.requirements.push(parsed);
    }

    for capability in raw.capabilities {
        let mut parsed = Capability::new(capability.namespace);
        parsed.directives = capability.directives;
        for (key, value) in &capability.attributes {
            let (name, typed) = attribute(key, value)?;
            parsed.attributes.insert(name, typed);
        }
        feature.capabilities.push(parsed);
    }

    Ok(feature)
}

fn convert_bundle(raw: RawBundle) -> Result<FeatureBundle, FeatureError> {
    let (id, start_order) = match raw {
        RawBundle::Id(id) => (id, None),
        RawBundle::Entry { id, start_order } => (id, start_order),
    };

    let start_order = match start_order {
        None => 0,
        Some(RawStartOrder::Number(n)) => n,
        Some(RawStartOrder::Text(text)) => {
            text.trim()
                .parse::<u32>()
                .map_err(|_| FeatureError::InvalidStartOrder {
                    bundle: id.clone(),
                    value: text.clone(),
                })?
        }
    };

    Ok(FeatureBundle::new(ArtifactId::parse(&id)?).with_start_order(start_order))
}

fn substitute(
    property: &str,
    value: &str,
    variables: &BTreeMap<String, String>,
) -> Result<String, FeatureError> {
    if let Some(missing) = VARIABLE_PATTERN
        .captures_iter(value)
        .map(|caps| caps[1].to_string())
        .find(|name| !variables.contains_key(name))
    {
        return Err(FeatureError::UnknownVariable {
            name: missing,
            property: property.to_string(),
        });
    }

    Ok(VARIABLE_PATTERN
        .replace_all(value, |caps: &Captures| {
            variables.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned())
}

/// Convert a JSON attribute, honouring `name:Type` keys
fn attribute(key: &str, value: &Value) -> Result<(String, AttrValue), FeatureError> {
    if let Some((name, ty)) = key.split_once(':') {
        let raw = match value {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map_or_else(|| item.to_string(), String::from))
                .map(|item| item.replace('\\', "\\\\").replace(',', "\\,"))
                .collect::<Vec<_>>()
                .join(","),
            other => other.to_string(),
        };
        let typed = AttrValue::typed(&raw, ty).map_err(|source| FeatureError::InvalidAttribute {
            attribute: key.to_string(),
            source,
        })?;
        return Ok((name.to_string(), typed));
    }
    Ok((key.to_string(), json_value(value)))
}

fn json_value(value: &Value) -> AttrValue {
    match value {
        Value::String(s) => AttrValue::String(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(long) => AttrValue::Long(long),
            None => AttrValue::Double(n.as_f64().unwrap_or_default()),
        },
        Value::Array(items) => AttrValue::List(items.iter().map(json_value).collect()),
        Value::Bool(b) => AttrValue::String(b.to_string()),
        Value::Null => AttrValue::String(String::new()),
        Value::Object(_) => AttrValue::String(value.to_string()),
    }
}
