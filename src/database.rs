//! PostgreSQL backed catalog.
//!
//! Reads the tables maintained by the package and mirror update jobs:
//! `packages`, `repositories`, `architectures`, `releng_releases`, `mirrors`
//! and `countries`. Timestamps are stored as Unix seconds.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, warn};

use crate::catalog::{Catalog, Mirror, MirrorFilter, MirrorStatus, Protocol};
use crate::config::DatabaseConfig;
use crate::error::MirrorResult;

/// Catalog reading from PostgreSQL.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Create a catalog on top of an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the database configuration.
    ///
    /// The pool connects lazily so the service can start before the database
    /// is reachable.
    pub fn connect_lazy(config: &DatabaseConfig) -> MirrorResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_lazy(&config.url)?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn package_mtime(
        &self,
        repository: &str,
        architecture: &str,
        name: &str,
    ) -> MirrorResult<Option<i64>> {
        debug!(
            "Querying mtime of {} in {}/{}",
            name, repository, architecture
        );

        let query = r#"
            SELECT packages.mtime
            FROM packages
                JOIN repositories ON packages.repository = repositories.id
                JOIN architectures ON repositories.arch = architectures.id
            WHERE packages.name = $1
              AND repositories.name = $2
              AND architectures.name = $3
            ORDER BY packages.mtime DESC
            LIMIT 1
        "#;

        let mtime = sqlx::query_scalar::<_, i64>(query)
            .bind(name)
            .bind(repository)
            .bind(architecture)
            .fetch_optional(&self.pool)
            .await?;

        Ok(mtime)
    }

    async fn release_created(&self, version: &str) -> MirrorResult<Option<i64>> {
        debug!("Querying creation time of release {}", version);

        let created = sqlx::query_scalar::<_, i64>(
            "SELECT created FROM releng_releases WHERE version = $1 AND available LIMIT 1",
        )
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;

        Ok(created)
    }

    async fn mirrors(&self, filter: &MirrorFilter) -> MirrorResult<Vec<Mirror>> {
        let query = r#"
            SELECT url, country_code, protocol, lastsync
            FROM mirrors
            WHERE lastsync > $1
              AND protocol = $2
              AND ($3::text IS NULL OR country_code = $3)
            ORDER BY url
        "#;

        let rows = sqlx::query(query)
            .bind(filter.freshness.timestamp())
            .bind(filter.protocol.as_str())
            .bind(filter.country_code.as_deref())
            .fetch_all(&self.pool)
            .await?;

        let mut mirrors = Vec::with_capacity(rows.len());
        for row in rows {
            let url: String = row.try_get("url")?;
            let protocol: String = row.try_get("protocol")?;
            let protocol = match protocol.parse::<Protocol>() {
                Ok(protocol) => protocol,
                Err(e) => {
                    warn!("Skipping mirror {}: {}", url, e);
                    continue;
                }
            };
            mirrors.push(Mirror {
                url,
                country_code: row.try_get("country_code")?,
                protocol,
                lastsync: row.try_get("lastsync")?,
            });
        }

        debug!(
            "Found {} mirrors synced after {} (country: {:?})",
            mirrors.len(),
            filter.freshness.timestamp(),
            filter.country_code
        );
        Ok(mirrors)
    }

    async fn mirror_status(&self) -> MirrorResult<Vec<MirrorStatus>> {
        let query = r#"
            SELECT
                mirrors.url,
                countries.name AS country,
                mirrors.duration_avg,
                mirrors.delay,
                mirrors.lastsync
            FROM mirrors
                JOIN countries ON mirrors.country_code = countries.code
            ORDER BY mirrors.url
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let status = rows
            .into_iter()
            .map(|row| {
                Ok(MirrorStatus {
                    url: row.try_get("url")?,
                    country: row.try_get("country")?,
                    duration_avg: row.try_get("duration_avg")?,
                    delay: row.try_get("delay")?,
                    lastsync: row.try_get("lastsync")?,
                })
            })
            .collect::<MirrorResult<Vec<_>>>()?;

        Ok(status)
    }
}
