//! Minimum sync time a mirror needs to serve a requested file.

use std::sync::Arc;
use tracing::debug;

use crate::artifact::{ArtifactClassification, ArtifactPattern, ArtifactRequest};
use crate::catalog::Catalog;
use crate::error::{MirrorError, MirrorResult};

/// Freshness floor for files that are neither packages nor ISO images.
pub const GENERIC_FRESHNESS_WINDOW: i64 = 60 * 60 * 24;

/// Mirrors must have synced strictly after this Unix time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FreshnessRequirement(pub i64);

impl FreshnessRequirement {
    /// Unix time of the floor.
    pub fn timestamp(&self) -> i64 {
        self.0
    }

    /// Whether a mirror last synced at `lastsync` is fresh enough.
    pub fn is_satisfied_by(&self, lastsync: i64) -> bool {
        lastsync > self.0
    }
}

/// Looks up when the requested file was published.
#[derive(Clone)]
pub struct FreshnessResolver {
    pattern: Arc<ArtifactPattern>,
    catalog: Arc<dyn Catalog>,
}

impl FreshnessResolver {
    /// Create a resolver classifying paths with `pattern`.
    pub fn new(pattern: Arc<ArtifactPattern>, catalog: Arc<dyn Catalog>) -> Self {
        Self { pattern, catalog }
    }

    /// Resolve the freshness floor for `request` at the current time.
    pub async fn resolve(&self, request: &ArtifactRequest) -> MirrorResult<FreshnessRequirement> {
        self.resolve_at(request, chrono::Utc::now().timestamp())
            .await
    }

    /// Resolve the freshness floor for `request`, taking `now` as the current Unix time.
    pub async fn resolve_at(
        &self,
        request: &ArtifactRequest,
        now: i64,
    ) -> MirrorResult<FreshnessRequirement> {
        let timestamp = match self.pattern.classify(request.path()) {
            ArtifactClassification::Package(package) => self
                .catalog
                .package_mtime(&package.repository, &package.architecture, &package.name)
                .await?
                .ok_or_else(|| MirrorError::NotFound("Package was not found".to_string()))?,
            ArtifactClassification::IsoImage(iso) => self
                .catalog
                .release_created(&iso.version)
                .await?
                .ok_or_else(|| MirrorError::NotFound("ISO image was not found".to_string()))?,
            ArtifactClassification::Other => now - GENERIC_FRESHNESS_WINDOW,
        };

        debug!("{} needs mirrors synced after {}", request.path(), timestamp);
        Ok(FreshnessRequirement(timestamp))
    }
}
