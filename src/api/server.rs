//! HTTP API server with SSE support

use crate::error::{RegistryError, Result};
use crate::notify::{BroadcastNotifier, Notification, NotificationKind};
use axum::{
    extract::{Query, State},
    response::{
        sse::{Event as SseEvent, KeepAlive},
        Sse,
    },
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, net::SocketAddr};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt as _,
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8080).into(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    notifier: BroadcastNotifier,
    instance_id: String,
}

/// Optional narrowing of the notification stream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    pub kind: Option<NotificationKind>,
    /// Only resources whose name starts with this
    pub prefix: Option<String>,
}

impl NotificationQuery {
    fn accepts(&self, notification: &Notification) -> bool {
        self.kind.map_or(true, |kind| kind == notification.kind)
            && self
                .prefix
                .as_deref()
                .map_or(true, |prefix| notification.resource.starts_with(prefix))
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    notifier: BroadcastNotifier,
    instance_id: String,
}

impl ApiServer {
    /// Create new API server publishing what `notifier` receives
    pub fn new(config: ApiServerConfig, notifier: BroadcastNotifier) -> Self {
        let instance_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
        Self {
            config,
            notifier,
            instance_id,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Routes with middleware applied
    pub fn router(&self) -> Router {
        Self::build_router(AppState {
            notifier: self.notifier.clone(),
            instance_id: self.instance_id.clone(),
        })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/v1/notifications", get(notifications_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` is cancelled
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| {
                RegistryError::Unavailable(format!("cannot bind {}: {}", self.config.addr, e))
            })?;
        info!(
            "API server [{}] listening on http://{}",
            self.instance_id, self.config.addr
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        info!("API server [{}] stopped", self.instance_id);
        Ok(())
    }
}

/// Live change notifications as Server-Sent Events
///
/// Each event carries the JSON notification, its kind as the event name and
/// its id. Subscribers that fall behind skip what they missed.
async fn notifications_handler(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> Sse<impl tokio_stream::Stream<Item = std::result::Result<SseEvent, Infallible>>> {
    debug!("New SSE client connected: {:?}", query);
    let rx = state.notifier.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(notification) if query.accepts(&notification) => {
            let data = serde_json::to_string(&notification).ok()?;
            Some(Ok(SseEvent::default()
                .event(notification.kind.to_string())
                .data(data)
                .id(notification.id)))
        }
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            debug!("SSE client lagged, {} notifications dropped", missed);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance_id: String,
    pub subscribers: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.clone(),
        subscribers: state.notifier.subscriber_count(),
    })
}
