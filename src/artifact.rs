//! Classification of requested download paths.
//!
//! A path is either a package built for one of the configured repositories, an
//! ISO image of a dated release, or anything else below the mirror root.

use regex::Regex;

use crate::error::{MirrorError, MirrorResult};

/// Maximum accepted path length.
pub const MAX_PATH_LENGTH: usize = 255;

/// Wildcard architecture used by architecture independent packages.
pub const ANY_ARCHITECTURE: &str = "any";

/// A validated request for a file below the mirror root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    path: String,
    client_address: String,
}

impl ArtifactRequest {
    /// Validate `path` and build a request for it.
    ///
    /// Paths may only contain alphanumerics and `.-+_/:`, must be between 1
    /// and [`MAX_PATH_LENGTH`] characters long and must not contain `..`. A
    /// single leading slash is dropped.
    pub fn new(path: &str, client_address: &str) -> MirrorResult<Self> {
        if path.len() > MAX_PATH_LENGTH
            || !lazy_regex::regex_is_match!(r"^[a-zA-Z0-9.\-+_/:]+$", path)
            || path.contains("..")
        {
            return Err(MirrorError::InvalidPath(path.to_string()));
        }

        let path = path.strip_prefix('/').unwrap_or(path);
        if path.is_empty() {
            return Err(MirrorError::InvalidPath("/".to_string()));
        }

        Ok(Self {
            path: path.to_string(),
            client_address: client_address.to_string(),
        })
    }

    /// Path relative to the mirror root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Address of the requesting client.
    pub fn client_address(&self) -> &str {
        &self.client_address
    }
}

/// Package file identified by its location in the repository tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageArtifact {
    /// Repository name, e.g. `core`.
    pub repository: String,
    /// Architecture directory the file lives in.
    pub architecture: String,
    /// Package name.
    pub name: String,
    /// Upstream version.
    pub version: String,
    /// Package release.
    pub release: String,
}

/// ISO image of a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoArtifact {
    /// Release version in `YYYY.MM.DD` form.
    pub version: String,
}

/// What a requested path refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactClassification {
    /// A package file.
    Package(PackageArtifact),
    /// A file of a release's ISO tree.
    IsoImage(IsoArtifact),
    /// Anything else.
    Other,
}

/// Compiled patterns for classifying paths.
///
/// Built once from the repository configuration and shared between requests.
#[derive(Debug, Clone)]
pub struct ArtifactPattern {
    package: Option<Regex>,
}

fn alternation(names: &[String]) -> String {
    names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|")
}

/// Build the package pattern for the given repositories and architectures.
///
/// The package name is everything before the trailing
/// `-<version>-<release>-<arch>.pkg.tar.{gz,xz}` segments, where the final
/// architecture may also be `any`.
pub fn build_artifact_pattern(
    repositories: &[String],
    architectures: &[String],
) -> MirrorResult<ArtifactPattern> {
    if repositories.is_empty() || architectures.is_empty() {
        return Ok(ArtifactPattern { package: None });
    }

    let repositories = alternation(repositories);
    let architectures = alternation(architectures);
    let pattern = format!(
        r"^({repositories})/os/({architectures})/([^-]+.*)-([^-]+)-([^-]+)-(?:{architectures}|{any})\.pkg\.tar\.(?:g|x)z$",
        any = ANY_ARCHITECTURE,
    );

    let package = Regex::new(&pattern).map_err(|e| {
        MirrorError::Configuration(format!("Failed to build package pattern: {}", e))
    })?;

    Ok(ArtifactPattern {
        package: Some(package),
    })
}

impl ArtifactPattern {
    /// Classify a path relative to the mirror root.
    pub fn classify(&self, path: &str) -> ArtifactClassification {
        if let Some(captures) = self.package.as_ref().and_then(|p| p.captures(path)) {
            return ArtifactClassification::Package(PackageArtifact {
                repository: captures[1].to_string(),
                architecture: captures[2].to_string(),
                name: captures[3].to_string(),
                version: captures[4].to_string(),
                release: captures[5].to_string(),
            });
        }

        if let Some((_, version)) =
            lazy_regex::regex_captures!(r"^iso/([0-9]{4}\.[0-9]{2}\.[0-9]{2})/", path)
        {
            return ArtifactClassification::IsoImage(IsoArtifact {
                version: version.to_string(),
            });
        }

        ArtifactClassification::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn pattern() -> ArtifactPattern {
        build_artifact_pattern(
            &names(&["core", "extra", "multilib"]),
            &names(&["i686", "x86_64"]),
        )
        .unwrap()
    }

    #[test]
    fn test_request_validation() {
        assert!(ArtifactRequest::new("core/os/x86_64/core.db", "127.0.0.1").is_ok());
        assert!(ArtifactRequest::new("robots.txt", "127.0.0.1").is_ok());

        for path in [
            "",
            "/",
            "core/../etc/passwd",
            "foo bar",
            "foo?bar",
            "foo%2Fbar",
            "iso/latest/*",
        ] {
            assert!(
                matches!(
                    ArtifactRequest::new(path, "127.0.0.1"),
                    Err(MirrorError::InvalidPath(_))
                ),
                "{} should be rejected",
                path
            );
        }

        let too_long = "a".repeat(MAX_PATH_LENGTH + 1);
        assert!(ArtifactRequest::new(&too_long, "127.0.0.1").is_err());
        let longest = "a".repeat(MAX_PATH_LENGTH);
        assert!(ArtifactRequest::new(&longest, "127.0.0.1").is_ok());
    }

    #[test]
    fn test_leading_slash_is_stripped() {
        let request = ArtifactRequest::new("/iso/2023.05.01/sha1sums.txt", "::1").unwrap();
        assert_eq!(request.path(), "iso/2023.05.01/sha1sums.txt");
        assert_eq!(request.client_address(), "::1");
    }

    #[test]
    fn test_classify_package() {
        assert_eq!(
            pattern().classify("core/os/x86_64/linux-5.10.1-1-x86_64.pkg.tar.xz"),
            ArtifactClassification::Package(PackageArtifact {
                repository: "core".to_string(),
                architecture: "x86_64".to_string(),
                name: "linux".to_string(),
                version: "5.10.1".to_string(),
                release: "1".to_string(),
            })
        );
    }

    #[test]
    fn test_classify_package_with_hyphenated_name() {
        match pattern().classify("multilib/os/x86_64/lib32-glibc-2.33-4-x86_64.pkg.tar.gz") {
            ArtifactClassification::Package(package) => {
                assert_eq!(package.repository, "multilib");
                assert_eq!(package.name, "lib32-glibc");
                assert_eq!(package.version, "2.33");
                assert_eq!(package.release, "4");
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_classify_any_package() {
        match pattern().classify("extra/os/i686/python-setuptools-1:51.0.0-1-any.pkg.tar.xz") {
            ArtifactClassification::Package(package) => {
                assert_eq!(package.architecture, "i686");
                assert_eq!(package.name, "python-setuptools");
                assert_eq!(package.version, "1:51.0.0");
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_repository_or_extension_is_other() {
        let pattern = pattern();
        for path in [
            "testing/os/x86_64/linux-5.10.1-1-x86_64.pkg.tar.xz",
            "core/os/armv7h/linux-5.10.1-1-armv7h.pkg.tar.xz",
            "core/os/x86_64/linux-5.10.1-1-x86_64.pkg.tar.zst",
            "core/os/x86_64/linux-5.10.1-1-x86_64.pkg.tar.xz.sig",
            "core/os/x86_64/core.db.tar.gz",
            "core/os/x86_64/linux-x86_64.pkg.tar.xz",
        ] {
            assert_eq!(pattern.classify(path), ArtifactClassification::Other, "{}", path);
        }
    }

    #[test]
    fn test_repository_names_are_escaped() {
        let pattern = build_artifact_pattern(&names(&["c.re"]), &names(&["x86_64"])).unwrap();
        assert_eq!(
            pattern.classify("core/os/x86_64/bash-5.0-1-x86_64.pkg.tar.xz"),
            ArtifactClassification::Other
        );
        assert!(matches!(
            pattern.classify("c.re/os/x86_64/bash-5.0-1-x86_64.pkg.tar.xz"),
            ArtifactClassification::Package(_)
        ));
    }

    #[test]
    fn test_empty_configuration_never_matches_packages() {
        let pattern = build_artifact_pattern(&[], &names(&["x86_64"])).unwrap();
        assert_eq!(
            pattern.classify("core/os/x86_64/bash-5.0-1-x86_64.pkg.tar.xz"),
            ArtifactClassification::Other
        );
    }

    #[test]
    fn test_classify_iso() {
        assert_eq!(
            pattern().classify("iso/2023.05.01/archlinux-x86_64.iso"),
            ArtifactClassification::IsoImage(IsoArtifact {
                version: "2023.05.01".to_string()
            })
        );
        assert_eq!(
            pattern().classify("iso/latest/archlinux-x86_64.iso"),
            ArtifactClassification::Other
        );
        assert_eq!(
            pattern().classify("iso/2023.05.01"),
            ArtifactClassification::Other
        );
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(pattern().classify("robots.txt"), ArtifactClassification::Other);
    }
}
