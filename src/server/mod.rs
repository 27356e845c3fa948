use anyhow::Result;
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

mod rooms;
mod session;

pub use rooms::LocalRooms;
pub use session::websocket_handler;

use crate::bus::{BusListener, EventPublisher, RoomBroadcaster};
use crate::config::Config;
use crate::game::EngineLauncher;
use crate::lobby::{GameLauncher, LobbyCoordinator};
use crate::protocol::room_codes;
use crate::registry::UserRegistry;
use crate::store::{keys, SharedStore};

/// One server process: every process-scope service, constructed once at
/// startup and shared by reference with the transport handlers.
pub struct Replica {
    pub config: Arc<Config>,
    pub store: Arc<dyn SharedStore>,
    pub publisher: EventPublisher,
    pub registry: UserRegistry,
    pub lobby: LobbyCoordinator,
    pub rooms: Arc<LocalRooms>,
    pub instance_name: String,
}

impl Replica {
    #[must_use]
    pub fn new(config: Arc<Config>, store: Arc<dyn SharedStore>) -> Arc<Self> {
        let instance_name = room_codes::generate_instance_name();
        let publisher = EventPublisher::new(Arc::clone(&store), config.server.channel.clone());
        let registry = UserRegistry::new(Arc::clone(&store), publisher.clone());
        let launcher: Arc<dyn GameLauncher> = Arc::new(EngineLauncher::new(
            Arc::clone(&store),
            publisher.clone(),
            config.game.timers(),
            config.game.pool_config(),
        ));
        let lobby = LobbyCoordinator::new(
            instance_name.clone(),
            Arc::clone(&store),
            config.server.min_players,
            launcher,
        );

        Arc::new(Self {
            config,
            store,
            publisher,
            registry,
            lobby,
            rooms: Arc::new(LocalRooms::new()),
            instance_name,
        })
    }

    /// Build the HTTP router: WebSocket endpoint, health check, and the
    /// static web client as the fallback.
    #[must_use]
    pub fn router(self: &Arc<Self>) -> Router {
        use tower_http::trace::TraceLayer;

        Router::new()
            .route("/ws", get(session::websocket_handler))
            .route("/health", get(health_check))
            .fallback_service(ServeDir::new(&self.config.server.static_dir))
            .layer(cors_layer(&self.config.server.cors_origins))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(self))
    }

    /// Start this replica's single bus subscription, pumping broadcasts to
    /// locally-joined clients until the subscription closes.
    pub fn spawn_bus_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let listener = BusListener::new(
            Arc::clone(&self.store),
            self.config.server.channel.clone(),
            Arc::clone(&self.rooms) as Arc<dyn RoomBroadcaster>,
        );
        tokio::spawn(async move {
            if let Err(error) = listener.run().await {
                tracing::error!(%error, "bus listener stopped");
            }
        })
    }

    /// Clear the admission cells left behind by a previous run. Only called
    /// in single-replica mode; in a fleet this would clobber another
    /// replica's election.
    pub async fn reset_election_state(&self) -> Result<()> {
        self.store.del(keys::NEXT_GAME_ROOM).await?;
        self.store.del(keys::NEXT_GAME_SERVER).await?;
        tracing::info!("cleared next-game cells (single-replica mode)");
        Ok(())
    }

    /// Liveness of the shared store connection.
    pub async fn health_check(&self) -> bool {
        self.store.get(keys::NEXT_GAME_ROOM).await.is_ok()
    }
}

async fn health_check(
    State(replica): State<Arc<Replica>>,
) -> axum::response::Result<&'static str> {
    if replica.health_check().await {
        Ok("OK")
    } else {
        Err(axum::http::StatusCode::SERVICE_UNAVAILABLE.into())
    }
}

/// Cross-origin policy for the configured origin list. `*`, a blank list,
/// or a list where nothing parses as a header value all degrade to the
/// permissive policy (the latter with a warning).
fn cors_layer(configured: &str) -> tower_http::cors::CorsLayer {
    use tower_http::cors::{Any, CorsLayer};

    if configured.trim() == "*" {
        return CorsLayer::permissive();
    }

    let allowed: Vec<axum::http::HeaderValue> = configured
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| origin.parse().ok())
        .collect();

    match allowed.len() {
        0 => {
            tracing::warn!(configured, "no usable CORS origins, falling back to permissive");
            CorsLayer::permissive()
        }
        _ => CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_replica_construction_and_health() {
        let config = Arc::new(Config::default());
        let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
        let replica = Replica::new(config, store);

        assert!(replica.instance_name.starts_with("SERVER"));
        assert!(replica.health_check().await);
    }

    #[tokio::test]
    async fn test_reset_election_state_clears_cells() {
        let config = Arc::new(Config::default());
        let store = Arc::new(MemoryStore::new());
        store.set_if_absent(keys::NEXT_GAME_ROOM, "room-x").await.unwrap();
        store
            .set_if_absent(keys::NEXT_GAME_SERVER, "SERVER-x")
            .await
            .unwrap();

        let replica = Replica::new(config, Arc::clone(&store) as _);
        replica.reset_election_state().await.unwrap();

        assert!(store.get(keys::NEXT_GAME_ROOM).await.unwrap().is_none());
        assert!(store.get(keys::NEXT_GAME_SERVER).await.unwrap().is_none());
    }
}
