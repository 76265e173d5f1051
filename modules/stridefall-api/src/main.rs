use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use stridefall_common::{Config, Profile};
use stridefall_engine::{Authenticator, ClaimService, MemoryStore, RecordingNotifier, TerritoryStore};

mod routes;

pub struct AppState {
    pub service: ClaimService,
    pub store: Arc<dyn TerritoryStore>,
    pub authenticator: Arc<dyn Authenticator>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stridefall=info".parse()?))
        .init();

    let config = Config::from_env();

    // In-memory backend for local play; a durable store plugs in through
    // the same traits.
    let store = Arc::new(MemoryStore::new());
    seed_dev_users(&store);

    let state = Arc::new(AppState {
        service: ClaimService::new(store.clone(), Arc::new(RecordingNotifier::new())),
        store: store.clone(),
        authenticator: store,
    });

    let app = routes::router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Stridefall API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// DEV_USERS="token:username,token2:username2" seeds local accounts.
fn seed_dev_users(store: &MemoryStore) {
    let Ok(raw) = std::env::var("DEV_USERS") else {
        return;
    };
    for entry in raw.split(',') {
        let Some((token, username)) = entry.split_once(':') else {
            continue;
        };
        let id = Uuid::new_v4();
        store.insert_profile(Profile {
            id,
            username: username.trim().to_string(),
            total_points: 0,
            season_points: 0,
            historical_points: 0,
            total_territories: 0,
            total_distance: 0.0,
            shield_charges: 0,
        });
        store.insert_token(token.trim(), id);
        info!(username = username.trim(), "seeded dev user");
    }
}
