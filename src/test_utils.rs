//! Test utilities for code built on top of the catalog.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::catalog::{Catalog, Mirror, MirrorFilter, MirrorStatus};
use crate::error::MirrorResult;

#[derive(Debug, Clone)]
struct Release {
    created: i64,
    available: bool,
}

/// Catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    packages: HashMap<(String, String, String), i64>,
    releases: HashMap<String, Release>,
    mirrors: Vec<Mirror>,
    countries: HashMap<String, String>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package built at `mtime`.
    pub fn with_package(
        mut self,
        repository: &str,
        architecture: &str,
        name: &str,
        mtime: i64,
    ) -> Self {
        self.packages.insert(
            (
                repository.to_string(),
                architecture.to_string(),
                name.to_string(),
            ),
            mtime,
        );
        self
    }

    /// Add a release created at `created`.
    pub fn with_release(mut self, version: &str, created: i64, available: bool) -> Self {
        self.releases
            .insert(version.to_string(), Release { created, available });
        self
    }

    /// Add a mirror.
    pub fn with_mirror(mut self, mirror: Mirror) -> Self {
        self.mirrors.push(mirror);
        self
    }

    /// Name the country with code `code`.
    pub fn with_country(mut self, code: &str, name: &str) -> Self {
        self.countries.insert(code.to_string(), name.to_string());
        self
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn package_mtime(
        &self,
        repository: &str,
        architecture: &str,
        name: &str,
    ) -> MirrorResult<Option<i64>> {
        Ok(self
            .packages
            .get(&(
                repository.to_string(),
                architecture.to_string(),
                name.to_string(),
            ))
            .copied())
    }

    async fn release_created(&self, version: &str) -> MirrorResult<Option<i64>> {
        Ok(self
            .releases
            .get(version)
            .filter(|release| release.available)
            .map(|release| release.created))
    }

    async fn mirrors(&self, filter: &MirrorFilter) -> MirrorResult<Vec<Mirror>> {
        Ok(self
            .mirrors
            .iter()
            .filter(|mirror| filter.matches(mirror))
            .cloned()
            .collect())
    }

    async fn mirror_status(&self) -> MirrorResult<Vec<MirrorStatus>> {
        let mut status: Vec<MirrorStatus> = self
            .mirrors
            .iter()
            .filter_map(|mirror| {
                let country = self.countries.get(&mirror.country_code)?;
                Some(MirrorStatus {
                    url: mirror.url.clone(),
                    country: country.clone(),
                    duration_avg: None,
                    delay: None,
                    lastsync: Some(mirror.lastsync),
                })
            })
            .collect();
        status.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(status)
    }
}
