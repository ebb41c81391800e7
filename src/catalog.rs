//! Read access to the package and mirror catalog.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MirrorError, MirrorResult};
use crate::freshness::FreshnessRequirement;

/// Transport a mirror serves files over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
    /// rsync.
    Rsync,
}

impl Protocol {
    /// Name as stored in the catalog.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Rsync => "rsync",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "rsync" => Ok(Protocol::Rsync),
            other => Err(MirrorError::Configuration(format!(
                "Unknown mirror protocol: {}",
                other
            ))),
        }
    }
}

/// A mirror as recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mirror {
    /// Base URL of the mirror, ending in `/`.
    pub url: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
    /// Transport protocol.
    pub protocol: Protocol,
    /// Unix time of the last successful sync from upstream.
    pub lastsync: i64,
}

/// Constraints for a mirror query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorFilter {
    /// Mirrors must have synced strictly after this floor.
    pub freshness: FreshnessRequirement,
    /// Restrict to mirrors located in this country.
    pub country_code: Option<String>,
    /// Required protocol.
    pub protocol: Protocol,
}

impl MirrorFilter {
    /// Whether `mirror` satisfies this filter.
    pub fn matches(&self, mirror: &Mirror) -> bool {
        self.freshness.is_satisfied_by(mirror.lastsync)
            && mirror.protocol == self.protocol
            && self
                .country_code
                .as_deref()
                .map_or(true, |country| mirror.country_code == country)
    }
}

/// Row of the public mirror status listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorStatus {
    /// Base URL of the mirror.
    pub url: String,
    /// Country name.
    pub country: String,
    /// Average response time in seconds, if measured.
    pub duration_avg: Option<f64>,
    /// Sync delay in seconds, if measured.
    pub delay: Option<i64>,
    /// Unix time of the last sync, if known.
    pub lastsync: Option<i64>,
}

/// Read-only queries against the package and mirror database.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Modification time of a package in the given repository and architecture.
    async fn package_mtime(
        &self,
        repository: &str,
        architecture: &str,
        name: &str,
    ) -> MirrorResult<Option<i64>>;

    /// Creation time of an available release.
    async fn release_created(&self, version: &str) -> MirrorResult<Option<i64>>;

    /// Mirrors matching `filter`.
    async fn mirrors(&self, filter: &MirrorFilter) -> MirrorResult<Vec<Mirror>>;

    /// Status of every known mirror.
    async fn mirror_status(&self) -> MirrorResult<Vec<MirrorStatus>>;
}
