//! Mirror selection and download redirection for archlinux.de.
//!
//! A download request names a file below the mirror root. The file is
//! classified as a package, an ISO image or something else, the time it was
//! published is looked up, and a mirror that synced after that time is chosen,
//! preferring mirrors in the client's country.

#![deny(missing_docs)]

pub mod artifact;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod freshness;
pub mod geoip;
pub mod logging;
pub mod redirect;
pub mod selector;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use artifact::{build_artifact_pattern, ArtifactClassification, ArtifactPattern, ArtifactRequest};
pub use catalog::{Catalog, Mirror, MirrorFilter, MirrorStatus, Protocol};
pub use config::SiteConfig;
pub use error::{MirrorError, MirrorResult};
pub use freshness::{FreshnessRequirement, FreshnessResolver};
pub use redirect::{build_redirect, MirrorRedirector, ResolvedTarget};
pub use selector::MirrorSelector;
