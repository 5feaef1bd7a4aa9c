//! db-keyserver - provisioning server
//!
//! Usage:
//!   cargo run --bin db-keyserver -- <LOGIN> <PASSWORD>
//!   curl http://localhost:5000/                                  # new database + key
//!   curl -X PUT -d db=<name> http://localhost:5000/get_key       # another key

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use db_keyserver::cloudant::CloudantClient;
use db_keyserver::config::{Args, ServerConfig};
use db_keyserver::logging::init_tracing;
use db_keyserver::provision::Provisioner;
use db_keyserver::rest::create_router;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional; clap reads KEYSERVER_* after it is loaded
    let dotenv = dotenvy::dotenv();
    let config = ServerConfig::from(Args::parse());
    let _log_guard = init_tracing(&config.log)?;
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "ignoring unreadable .env"),
    }

    info!(
        login = config.remote.admin.login(),
        account_url = %config.remote.account_url,
        api_url = %config.remote.api_url,
        max_create_attempts = config.max_create_attempts,
        "db-keyserver starting"
    );

    let client = CloudantClient::new(config.remote.clone())?;
    let provisioner = Provisioner::new(Arc::new(client), config.max_create_attempts);
    let app = create_router(provisioner);

    let listener = TcpListener::bind(config.bind).await?;
    info!(bind = %config.bind, "listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed; running until killed");
        std::future::pending::<()>().await;
    }
}
