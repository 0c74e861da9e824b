//! HTTP + Server-Sent Events transport.
//!
//! A client opens `GET /sse` and receives an `endpoint` event naming the URL
//! to post messages to (`/messages?session_id=<uuid>`). Each posted JSON-RPC
//! message is acknowledged with 202 and its response is delivered on the
//! session's event stream as a `message` event.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures_util::Stream;
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, warn};
use uuid::Uuid;

use gcal_mcp_protocol::{JsonRpcError, JsonRpcResponse};

use crate::config::SseConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::McpHandler;
use crate::signals::ShutdownHandle;

/// Open sessions and the channels feeding their event streams.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, mpsc::Sender<JsonRpcResponse>>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<JsonRpcResponse>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a session, or returns `None` when the limit is reached.
    fn open(
        self: &Arc<Self>,
        buffer: usize,
    ) -> Option<(SessionGuard, mpsc::Receiver<JsonRpcResponse>)> {
        let mut sessions = self.lock();
        if sessions.len() >= self.max_sessions {
            return None;
        }
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(buffer);
        sessions.insert(id, tx);

        let guard = SessionGuard {
            id,
            registry: Arc::clone(self),
        };
        Some((guard, rx))
    }

    fn sender(&self, id: &Uuid) -> Option<mpsc::Sender<JsonRpcResponse>> {
        self.lock().get(id).cloned()
    }

    fn remove(&self, id: &Uuid) {
        self.lock().remove(id);
    }

    /// Drops every session's sender so the streams end.
    pub fn close_all(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unregisters its session when the event stream is dropped.
struct SessionGuard {
    id: Uuid,
    registry: Arc<SessionRegistry>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
        debug!(session_id = %self.id, "SSE session closed");
    }
}

/// Shared state of the SSE router.
#[derive(Clone)]
pub struct SseState {
    handler: McpHandler,
    sessions: Arc<SessionRegistry>,
    session_buffer: usize,
}

impl SseState {
    pub fn new(handler: McpHandler, config: &SseConfig) -> Self {
        Self {
            handler,
            sessions: Arc::new(SessionRegistry::new(config.max_sessions)),
            session_buffer: config.session_buffer,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Uuid,
}

/// Builds the `/sse` + `/messages` router.
pub fn router(state: SseState) -> Router {
    Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(post_message))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .with_state(state)
}

async fn open_stream(
    State(state): State<SseState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Response> {
    let Some((guard, mut rx)) = state.sessions.open(state.session_buffer) else {
        warn!(max = state.sessions.max_sessions, "SSE session limit reached");
        return Err((StatusCode::SERVICE_UNAVAILABLE, "too many open sessions").into_response());
    };
    let id = guard.id;
    info!(session_id = %id, "SSE session opened");

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default()
            .event("endpoint")
            .data(format!("/messages?session_id={id}")));

        while let Some(response) = rx.recv().await {
            match serde_json::to_string(&response) {
                Ok(data) => yield Ok(Event::default().event("message").data(data)),
                Err(e) => warn!(session_id = %id, error = %e, "cannot encode response"),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(tx) = state.sessions.sender(&query.session_id) else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };

    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            debug!(session_id = %query.session_id, error = %e, "unparseable message");
            let response = JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string()));
            let _ = tx.send(response).await;
            return (StatusCode::BAD_REQUEST, "invalid JSON").into_response();
        }
    };

    let handler = state.handler.clone();
    let session_id = query.session_id;
    tokio::spawn(async move {
        if let Some(response) = handler.handle_value(value).await
            && tx.send(response).await.is_err()
        {
            debug!(session_id = %session_id, "session closed before the response was sent");
        }
    });

    StatusCode::ACCEPTED.into_response()
}

/// Serves MCP over HTTP/SSE on `config.host:config.port` until shutdown.
pub async fn serve_sse(
    config: SseConfig,
    handler: McpHandler,
    shutdown: ShutdownHandle,
) -> ServerResult<()> {
    config.validate()?;
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::bind(&addr, e))?;

    run(listener, SseState::new(handler, &config), shutdown).await
}

async fn run(listener: TcpListener, state: SseState, shutdown: ShutdownHandle) -> ServerResult<()> {
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "SSE transport listening");

    let sessions = state.sessions.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.wait().await;
            info!(open = sessions.len(), "shutdown requested, closing SSE sessions");
            sessions.close_all();
        })
        .await?;

    info!("SSE transport stopped");
    Ok(())
}
