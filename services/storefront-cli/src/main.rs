//! Storefront session CLI
//!
//! Drives the session layer against a live storefront backend:
//! 1. Loads config and seeds the token cookies from the environment
//! 2. Hydrates the cached profile and verifies it (refreshing if needed)
//! 3. Runs one command and prints the result as JSON

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use storefront_auth::{
    AccessToken, AuthClient, CredentialStore, FileStore, MemoryCookieJar, RefreshToken,
};
use storefront_products::{ProductService, SellerCatalog};
use storefront_session::{Navigator, Route, SessionManager, SessionSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const USAGE: &str = "usage: storefront [--config PATH] <whoami|products|catalog|delete ID|logout>";

/// Commands accepted on the command line
#[derive(Debug, PartialEq)]
enum Command {
    WhoAmI,
    Products,
    Catalog,
    Delete(String),
    Logout,
}

/// Split `args` (without the program name) into the `--config` value and the command.
fn parse_args(args: &[String]) -> Result<(Option<&str>, Command)> {
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().context("--config requires a path")?;
            config_path = Some(path.as_str());
        } else {
            positional.push(arg.as_str());
        }
    }

    let command = match positional.as_slice() {
        ["whoami"] => Command::WhoAmI,
        ["products"] => Command::Products,
        ["catalog"] => Command::Catalog,
        ["delete", id] => Command::Delete((*id).to_owned()),
        ["logout"] => Command::Logout,
        _ => bail!("{USAGE}"),
    };
    Ok((config_path, command))
}

/// Logs where the session layer wants to send the user.
struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        info!(route = route.name(), path = route.path(), "redirect");
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cli_config_path, command) = parse_args(&args)?;

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.backend.base_url,
        timeout_secs = config.backend.timeout_secs,
        cache_file = %config.session.cache_file.display(),
        "configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.backend.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let store = FileStore::load(config.session.cache_file.clone())
        .await
        .context("failed to open profile cache")?;
    let jar = Arc::new(MemoryCookieJar::new());
    let credentials = CredentialStore::new(Arc::new(store), jar)
        .with_cache_key(config.session.cache_key.clone());

    if let Some(token) = &config.session.access_token {
        credentials.write_access_token_cookie(
            &AccessToken::new(token.expose().as_str()),
            config.session.access_token_ttl_secs,
        );
    }
    if let Some(token) = &config.session.refresh_token {
        credentials.write_refresh_token_cookie(
            &RefreshToken::new(token.expose().as_str()),
            config.session.refresh_token_ttl_secs,
        );
    }

    let session = Arc::new(SessionManager::new(
        credentials,
        AuthClient::new(http.clone(), config.backend.base_url.as_str()),
        Arc::new(LogNavigator),
        SessionSettings {
            access_token_ttl_secs: config.session.access_token_ttl_secs,
        },
    ));
    session.hydrate().await;

    let service = ProductService::new(http, config.backend.base_url.as_str(), session.clone());

    match command {
        Command::WhoAmI => {
            session.fetch_user_data().await;
            print_json(&session.snapshot())?;
        }
        Command::Products => {
            let products = service
                .fetch_public_products()
                .await
                .context("failed to fetch products")?;
            print_json(&products)?;
        }
        Command::Catalog => {
            let catalog = SellerCatalog::new(service);
            catalog.load_seller_products().await;
            print_json(&catalog.view().await)?;
        }
        Command::Delete(id) => {
            service
                .delete_product(&id)
                .await
                .with_context(|| format!("failed to delete product {id}"))?;
            info!(product_id = %id, "product deleted");
        }
        Command::Logout => {
            session.logout_user().await;
            print_json(&session.snapshot())?;
        }
    }

    Ok(())
}
