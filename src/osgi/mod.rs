//! OSGi metadata primitives used by the scanner and the analyser tasks.

mod filter;
mod header;
mod version;

pub use filter::{Filter, FilterError};
pub use header::{AttrValue, Clause, HeaderError, parse_header};
pub use version::{Version, VersionError, VersionRange};
