//! `META-INF/MANIFEST.MF` parsing and bundle descriptor derivation.

use std::collections::BTreeMap;

use crate::models::{
    ArtifactId, BundleDescriptor, Capability, PackageExport, PackageImport, Requirement,
};
use crate::osgi::{Version, parse_header};

use super::ScanError;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

pub const BUNDLE_SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
pub const BUNDLE_VERSION: &str = "Bundle-Version";
pub const BUNDLE_MANIFEST_VERSION: &str = "Bundle-ManifestVersion";
pub const EXPORT_PACKAGE: &str = "Export-Package";
pub const IMPORT_PACKAGE: &str = "Import-Package";
pub const REQUIRE_CAPABILITY: &str = "Require-Capability";
pub const PROVIDE_CAPABILITY: &str = "Provide-Capability";

/// Parse the main section of a manifest.
///
/// Lines starting with a single space continue the previous header; the main
/// section ends at the first blank line. Continuations are joined on raw bytes
/// since writers wrap at 72 bytes, which may split a UTF-8 sequence.
pub fn parse_manifest(bytes: &[u8]) -> Result<BTreeMap<String, String>, String> {
    let mut logical: Vec<(usize, Vec<u8>)> = Vec::new();

    for (number, line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            break;
        }

        if let Some(continuation) = line.strip_prefix(b" ") {
            match logical.last_mut() {
                Some((_, value)) => value.extend_from_slice(continuation),
                None => return Err(format!("line {}: continuation without header", number + 1)),
            }
            continue;
        }
        logical.push((number + 1, line.to_vec()));
    }

    let mut headers = BTreeMap::new();
    for (number, raw) in logical {
        let line = String::from_utf8(raw)
            .map_err(|_| format!("line {number}: header is not valid UTF-8"))?;
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| format!("line {number}: missing ':' in '{line}'"))?;
        if name.trim().is_empty() {
            return Err(format!("line {number}: empty header name"));
        }
        let value = value.strip_prefix(' ').unwrap_or(value);
        headers.insert(name.to_string(), value.to_string());
    }
    Ok(headers)
}

/// Look up a header by name, ignoring ASCII case as JAR manifests do
pub fn header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a String> {
    headers.get(name).or_else(|| {
        headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

/// Build a descriptor from main-section manifest headers
pub fn describe(
    artifact: ArtifactId,
    headers: BTreeMap<String, String>,
) -> Result<BundleDescriptor, ScanError> {
    let invalid = |header: &str, message: String| ScanError::Manifest {
        artifact: artifact.clone(),
        message: format!("{header}: {message}"),
    };
    let header_value = |name: &str| header(&headers, name);
    let clauses = |header: &str| {
        header_value(header)
            .map(|value| parse_header(value).map_err(|e| invalid(header, e.to_string())))
            .transpose()
            .map(Option::unwrap_or_default)
    };

    let symbolic_name = clauses(BUNDLE_SYMBOLIC_NAME)?
        .first()
        .and_then(|clause| clause.paths.first().cloned());
    let bundle_version = header_value(BUNDLE_VERSION)
        .map(|value| Version::parse(value).map_err(|e| invalid(BUNDLE_VERSION, e.to_string())))
        .transpose()?;

    let exported_packages = PackageExport::from_clauses(&clauses(EXPORT_PACKAGE)?)
        .map_err(|e| invalid(EXPORT_PACKAGE, e.to_string()))?;
    let imported_packages = PackageImport::from_clauses(&clauses(IMPORT_PACKAGE)?)
        .map_err(|e| invalid(IMPORT_PACKAGE, e.to_string()))?;

    let mut requirements = Vec::new();
    for clause in clauses(REQUIRE_CAPABILITY)? {
        requirements.extend(
            Requirement::from_clause(&clause)
                .map_err(|e| invalid(REQUIRE_CAPABILITY, e.to_string()))?,
        );
    }
    let capabilities = clauses(PROVIDE_CAPABILITY)?
        .iter()
        .flat_map(Capability::from_clause)
        .collect();

    let mut descriptor = BundleDescriptor::new(artifact.clone());
    descriptor.symbolic_name = symbolic_name;
    descriptor.bundle_version = bundle_version;
    descriptor.manifest_version = header_value(BUNDLE_MANIFEST_VERSION).cloned();
    descriptor.exported_packages = exported_packages;
    descriptor.imported_packages = imported_packages;
    descriptor.requirements = requirements;
    descriptor.capabilities = capabilities;
    descriptor.manifest = headers;
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "Manifest-Version: 1.0\r\n\
Bundle-ManifestVersion: 2\r\n\
Bundle-SymbolicName: org.example.core;singleton:=true\r\n\
Bundle-Version: 1.2.0\r\n\
Export-Package: org.example.core;version=\"1.2\",org.example.core.s\r\n \
pi;version=\"1.0\"\r\n\
Import-Package: org.slf4j;version=\"[1.7,2)\",javax.annotation;resoluti\r\n \
on:=optional\r\n\
Require-Capability: osgi.ee;filter:=\"(&(osgi.ee=JavaSE)(version=1.8))\"\r\n\
\r\n\
Name: org/example/core/Thing.class\r\n\
SHA-256-Digest: abc\r\n";

    #[test]
    fn test_parse_manifest_continuations() {
        let headers = parse_manifest(MANIFEST.as_bytes()).unwrap();
        assert_eq!(headers["Bundle-ManifestVersion"], "2");
        assert_eq!(
            headers["Export-Package"],
            "org.example.core;version=\"1.2\",org.example.core.spi;version=\"1.0\""
        );
        assert!(!headers.contains_key("Name"), "stops at the main section");
    }

    #[test]
    fn test_parse_manifest_errors() {
        assert!(parse_manifest(b" orphan\n").is_err());
        assert!(parse_manifest(b"NoColonHere\n").is_err());
        assert!(parse_manifest(b"Bundle-Name: \xFF\n").is_err());
        assert!(parse_manifest(b"").unwrap().is_empty());
    }

    #[test]
    fn test_parse_manifest_joins_split_utf8() {
        // 'é' is C3 A9, wrapped between its two bytes
        let headers = parse_manifest(b"Bundle-Name: Caf\xC3\r\n \xA9 Bundle\r\n\r\n").unwrap();
        assert_eq!(headers["Bundle-Name"], "Caf\u{e9} Bundle");
    }

    #[test]
    fn test_describe_bundle() {
        let id = ArtifactId::parse("org.example:core:1.2.0").unwrap();
        let descriptor = describe(id.clone(), parse_manifest(MANIFEST.as_bytes()).unwrap()).unwrap();

        assert_eq!(descriptor.artifact, id);
        assert_eq!(descriptor.symbolic_name.as_deref(), Some("org.example.core"));
        assert_eq!(descriptor.bundle_version, Some(Version::new(1, 2, 0)));
        assert_eq!(descriptor.manifest_version.as_deref(), Some("2"));
        assert_eq!(descriptor.exported_packages.len(), 2);
        assert_eq!(descriptor.imported_packages.len(), 2);
        assert!(descriptor.imported_packages[1].optional);
        assert_eq!(descriptor.requirements.len(), 1);
        assert_eq!(descriptor.requirements[0].namespace, "osgi.ee");
        assert!(descriptor.is_bundle());
    }

    #[test]
    fn test_describe_ignores_header_case() {
        let id = ArtifactId::parse("org.example:lower:1.0").unwrap();
        let headers = parse_manifest(
            b"bundle-manifestversion: 2\nbundle-symbolicname: org.x\nBUNDLE-VERSION: 1.0\n\
export-package: org.x.api;version=1.0\n",
        )
        .unwrap();
        let descriptor = describe(id, headers).unwrap();

        assert_eq!(descriptor.symbolic_name.as_deref(), Some("org.x"));
        assert_eq!(descriptor.bundle_version, Some(Version::new(1, 0, 0)));
        assert_eq!(descriptor.manifest_version.as_deref(), Some("2"));
        assert_eq!(descriptor.exported_packages.len(), 1);
        assert_eq!(descriptor.header("Export-Package"), Some("org.x.api;version=1.0"));
        assert!(descriptor.manifest.contains_key("bundle-symbolicname"));
    }

    #[test]
    fn test_describe_plain_jar() {
        let id = ArtifactId::parse("org.example:plain:1.0").unwrap();
        let descriptor = describe(id, BTreeMap::new()).unwrap();
        assert!(!descriptor.is_bundle());
        assert!(descriptor.exported_packages.is_empty());
    }

    #[test]
    fn test_describe_rejects_malformed_headers() {
        let id = ArtifactId::parse("org.example:broken:1.0").unwrap();
        let mut headers = BTreeMap::new();
        headers.insert(IMPORT_PACKAGE.to_string(), "org.a;version=\"[2,1]\"".to_string());
        assert!(matches!(
            describe(id, headers),
            Err(ScanError::Manifest { .. })
        ));
    }
}
