//! Turning a download request into a mirror URL.

use std::sync::Arc;
use tracing::debug;

use crate::artifact::{build_artifact_pattern, ArtifactPattern, ArtifactRequest};
use crate::catalog::{Catalog, Mirror};
use crate::config::SiteConfig;
use crate::error::MirrorResult;
use crate::freshness::{FreshnessRequirement, FreshnessResolver};
use crate::geoip::GeoLookup;
use crate::selector::MirrorSelector;

/// Absolute URL a download is redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Target URL.
    pub url: String,
}

/// Append the requested path to the mirror's base URL.
pub fn build_redirect(mirror: &Mirror, path: &str) -> ResolvedTarget {
    ResolvedTarget {
        url: format!("{}{}", mirror.url, path),
    }
}

/// Resolves download requests to mirror URLs.
#[derive(Clone)]
pub struct MirrorRedirector {
    resolver: FreshnessResolver,
    selector: MirrorSelector,
}

impl MirrorRedirector {
    /// Create a redirector from its collaborators.
    pub fn new(
        pattern: ArtifactPattern,
        catalog: Arc<dyn Catalog>,
        geoip: Arc<dyn GeoLookup>,
        default_country: String,
    ) -> Self {
        Self {
            resolver: FreshnessResolver::new(Arc::new(pattern), catalog.clone()),
            selector: MirrorSelector::new(catalog, geoip, default_country),
        }
    }

    /// Create a redirector for the repositories and country in `config`.
    pub fn from_config(
        config: &SiteConfig,
        catalog: Arc<dyn Catalog>,
        geoip: Arc<dyn GeoLookup>,
    ) -> MirrorResult<Self> {
        let pattern = build_artifact_pattern(
            &config.packages.repository_names(),
            &config.packages.architectures(),
        )?;
        Ok(Self::new(
            pattern,
            catalog,
            geoip,
            config.mirrors.country.clone(),
        ))
    }

    /// Resolve `request` to a mirror URL.
    pub async fn redirect(&self, request: &ArtifactRequest) -> MirrorResult<ResolvedTarget> {
        let freshness = self.resolver.resolve(request).await?;
        self.redirect_with(request, freshness).await
    }

    /// Resolve `request` to a mirror URL, taking `now` as the current Unix time.
    pub async fn redirect_at(
        &self,
        request: &ArtifactRequest,
        now: i64,
    ) -> MirrorResult<ResolvedTarget> {
        let freshness = self.resolver.resolve_at(request, now).await?;
        self.redirect_with(request, freshness).await
    }

    async fn redirect_with(
        &self,
        request: &ArtifactRequest,
        freshness: FreshnessRequirement,
    ) -> MirrorResult<ResolvedTarget> {
        let mirror = self
            .selector
            .select(freshness, request.client_address())
            .await?;
        let target = build_redirect(&mirror, request.path());
        debug!("Redirecting {} to {}", request.path(), target.url);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Protocol;
    use crate::config::GeoIpRange;
    use crate::error::MirrorError;
    use crate::geoip::StaticGeoLookup;
    use crate::test_utils::InMemoryCatalog;

    const NOW: i64 = 1_700_000_000;

    fn mirror(url: &str, country_code: &str, lastsync: i64) -> Mirror {
        Mirror {
            url: url.to_string(),
            country_code: country_code.to_string(),
            protocol: Protocol::Https,
            lastsync,
        }
    }

    fn redirector(catalog: InMemoryCatalog) -> MirrorRedirector {
        let mut config = SiteConfig::default();
        config.packages.repositories.clear();
        config
            .packages
            .repositories
            .insert("core".to_string(), vec!["x86_64".to_string()]);
        config.geoip = vec![
            GeoIpRange {
                network: "198.51.100.0/24".parse().unwrap(),
                country: "DE".to_string(),
            },
            GeoIpRange {
                network: "203.0.113.0/24".parse().unwrap(),
                country: "US".to_string(),
            },
        ];
        let geoip = StaticGeoLookup::new(&config.geoip);
        MirrorRedirector::from_config(&config, Arc::new(catalog), Arc::new(geoip)).unwrap()
    }

    fn request(path: &str) -> ArtifactRequest {
        ArtifactRequest::new(path, "198.51.100.7").unwrap()
    }

    #[test]
    fn test_build_redirect_concatenates() {
        let target = build_redirect(
            &mirror("https://mirror.example.org/archlinux/", "DE", 0),
            "iso/2023.05.01/archlinux-x86_64.iso",
        );
        assert_eq!(
            target.url,
            "https://mirror.example.org/archlinux/iso/2023.05.01/archlinux-x86_64.iso"
        );
    }

    #[tokio::test]
    async fn test_package_in_client_country() {
        let redirector = redirector(
            InMemoryCatalog::new()
                .with_package("core", "x86_64", "bash", 1000)
                .with_mirror(mirror("https://m1.example.de/", "DE", 1500))
                .with_mirror(mirror("https://m2.example.com/", "US", 1500)),
        );

        let target = redirector
            .redirect_at(&request("core/os/x86_64/bash-5.0-1-x86_64.pkg.tar.xz"), NOW)
            .await
            .unwrap();
        assert_eq!(
            target.url,
            "https://m1.example.de/core/os/x86_64/bash-5.0-1-x86_64.pkg.tar.xz"
        );
    }

    #[tokio::test]
    async fn test_package_falls_back_to_any_country() {
        let redirector = redirector(
            InMemoryCatalog::new()
                .with_package("core", "x86_64", "bash", 1000)
                .with_mirror(mirror("https://m1.example.de/", "DE", 1000))
                .with_mirror(mirror("https://m2.example.com/", "US", 1500)),
        );

        let target = redirector
            .redirect_at(&request("core/os/x86_64/bash-5.0-1-x86_64.pkg.tar.xz"), NOW)
            .await
            .unwrap();
        assert!(target.url.starts_with("https://m2.example.com/"));
    }

    #[tokio::test]
    async fn test_missing_package() {
        let redirector = redirector(
            InMemoryCatalog::new().with_mirror(mirror("https://m1.example.de/", "DE", 1500)),
        );

        let result = redirector
            .redirect_at(&request("core/os/x86_64/bash-5.0-1-x86_64.pkg.tar.xz"), NOW)
            .await;
        assert!(matches!(result, Err(MirrorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_other_file_needs_recent_sync() {
        let redirector = redirector(
            InMemoryCatalog::new()
                .with_mirror(mirror("https://old.example.de/", "DE", NOW - 86400))
                .with_mirror(mirror("https://new.example.com/", "US", NOW - 60)),
        );

        let target = redirector
            .redirect_at(&request("robots.txt"), NOW)
            .await
            .unwrap();
        assert_eq!(target.url, "https://new.example.com/robots.txt");
    }
}
