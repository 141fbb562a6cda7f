mod artifact;
mod capability;
mod descriptor;
mod feature;

pub use artifact::{ArtifactId, ArtifactIdError};
pub use capability::{Capability, PackageExport, PackageImport, Requirement};
pub use descriptor::{BundleDescriptor, FeatureDescriptor};
pub use feature::{Feature, FeatureBundle};
