use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        ConnectInfo, DefaultBodyLimit, Query, State, WebSocketUpgrade,
    },
    http::Method,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use orbit_shared::constants::WS_PATH;
use orbit_shared::{ChatMessage, NewChatMessage, NewSearchQuery, SearchQuery};
use orbit_store::{MessageStore, SearchQueryStore};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::gateway::ChatGateway;
use crate::hub::BroadcastHub;
use crate::search::{self, SearchResult};
use crate::translate;

#[derive(Clone)]
pub struct AppState {
    pub messages: Arc<dyn MessageStore>,
    pub searches: Arc<dyn SearchQueryStore>,
    pub hub: BroadcastHub,
    pub gateway: ChatGateway,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        messages: Arc<dyn MessageStore>,
        searches: Arc<dyn SearchQueryStore>,
    ) -> Self {
        let gateway = ChatGateway::new(Arc::clone(&messages), BroadcastHub::new());
        let hub = gateway.hub().clone();
        Self {
            messages,
            searches,
            hub,
            gateway,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/api/chat/messages", get(list_messages).post(create_message))
        .route("/api/search", post(run_search))
        .route("/api/search/queries", get(list_search_queries))
        .route("/api/translate", post(translate_text))
        .route(WS_PATH, get(ws_upgrade))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    connections: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    history_limit: usize,
    max_retained: Option<usize>,
}

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Serialize)]
struct SearchResponse {
    query: SearchQuery,
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest {
    text: String,
    from_lang: String,
    to_lang: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    original_text: String,
    translated_text: String,
    from_lang: String,
    to_lang: String,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        connections: state.hub.channel_count().await,
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    let max_retained = state.config.max_retained_messages;
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        history_limit: state.config.chat_history_limit,
        max_retained: (max_retained > 0).then_some(max_retained),
    })
}

/// Recent chat history, oldest first. Never pushes anything to channels.
async fn list_messages(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<ChatMessage>>, ServerError> {
    let Query(params) =
        params.map_err(|_| ServerError::BadRequest("Invalid limit".to_string()))?;

    let limit = match params.limit {
        Some(n) => usize::try_from(n).unwrap_or(0),
        None => state.config.chat_history_limit,
    };

    let messages = state.messages.list_messages(limit)?;
    Ok(Json(messages))
}

/// Store a message without broadcasting it. Other clients see it on their
/// next history fetch.
async fn create_message(
    State(state): State<AppState>,
    payload: Result<Json<NewChatMessage>, JsonRejection>,
) -> Result<Json<ChatMessage>, ServerError> {
    let Json(new_message) = payload.map_err(|e| {
        debug!(error = %e, "Rejected chat message body");
        invalid_message()
    })?;

    if let Err(e) = new_message.validate() {
        debug!(error = %e, "Rejected chat message");
        return Err(invalid_message());
    }

    let message = state.messages.create_message(new_message)?;
    info!(id = %message.id, user = %message.user_id, "Chat message created via HTTP");
    Ok(Json(message))
}

fn invalid_message() -> ServerError {
    ServerError::BadRequest("Invalid message data".to_string())
}

async fn run_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ServerError> {
    let Json(req) =
        payload.map_err(|_| ServerError::BadRequest("Invalid search request".to_string()))?;

    let results = search::simulate(&req.query, &req.kind);
    let encoded = serde_json::to_string(&results)
        .map_err(|e| ServerError::Internal(format!("Failed to encode results: {e}")))?;

    let query = state.searches.create_query(NewSearchQuery {
        query: req.query,
        kind: req.kind,
        results: encoded,
    })?;

    debug!(id = %query.id, kind = %query.kind, hits = results.len(), "Search recorded");
    Ok(Json(SearchResponse { query, results }))
}

/// Recorded searches, newest first.
async fn list_search_queries(
    State(state): State<AppState>,
) -> Result<Json<Vec<SearchQuery>>, ServerError> {
    let queries = state
        .searches
        .list_queries(state.config.search_history_limit)?;
    Ok(Json(queries))
}

async fn translate_text(
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, ServerError> {
    let Json(req) = payload
        .map_err(|_| ServerError::BadRequest("Invalid translation request".to_string()))?;

    let translated_text = translate::translate(&req.text, &req.from_lang, &req.to_lang);
    Ok(Json(TranslateResponse {
        original_text: req.text,
        translated_text,
        from_lang: req.from_lang,
        to_lang: req.to_lang,
    }))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| state.gateway.serve_socket(socket, addr))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
