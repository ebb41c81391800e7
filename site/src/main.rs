//! Mirror redirector service entry point.

use anyhow::Result;
use archportal::database::PgCatalog;
use archportal::geoip::{GeoLookup, NoGeoLookup, StaticGeoLookup};
use archportal::logging::{init_logging, LoggingArgs};
use archportal::SiteConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use archportal_site::app::{create_app, AppState};

#[derive(Parser, Debug)]
#[command(name = "archportal-site", version, about = "Redirect downloads to archlinux.de mirrors")]
struct Args {
    /// Configuration file path.
    #[arg(short, long, default_value = "archportal.json")]
    config: PathBuf,

    /// Address to listen on, overriding the configured one.
    #[arg(short, long, value_name = "ADDRESS")]
    bind: Option<String>,

    /// Database connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(flatten)]
    logging: LoggingArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_exists = args.config.exists();
    let mut config = if config_exists {
        SiteConfig::from_file(&args.config)?
    } else {
        SiteConfig::default()
    };
    if let Some(database_url) = args.database_url {
        config.database.url = database_url;
    }
    args.logging.apply(&mut config.logging);

    init_logging(&config.logging)?;

    if config_exists {
        info!("Loaded configuration from {:?}", args.config);
    } else {
        warn!("Configuration file {:?} not found, using defaults", args.config);
    }
    info!(
        "Serving {} repositories, default mirror country {}",
        config.packages.repositories.len(),
        config.mirrors.country
    );

    let lookup = StaticGeoLookup::new(&config.geoip);
    let geoip: Arc<dyn GeoLookup> = if lookup.is_empty() {
        warn!("No geoip ranges configured, every client uses the default country");
        Arc::new(NoGeoLookup)
    } else {
        info!("Locating clients with {} geoip ranges", lookup.len());
        Arc::new(lookup)
    };

    let catalog = Arc::new(PgCatalog::connect_lazy(&config.database)?);

    let listen_address = args
        .bind
        .clone()
        .unwrap_or_else(|| config.server.listen_address());

    let state = AppState::new(config, catalog, geoip)?;
    let app = create_app(state);

    let listener = TcpListener::bind(&listen_address).await?;
    info!("Server listening on {}", listen_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
