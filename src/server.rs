//! Webhook mode: Telegram pushes updates over HTTP, next to a few status routes.

use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::State,
    http::{header::HOST, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Url;
use serde_json::{json, Value};
use teloxide::{
    dispatching::{DefaultKey, Dispatcher},
    error_handlers::LoggingErrorHandler,
    prelude::*,
    update_listeners::webhooks::{self, Options},
    RequestError,
};
use thiserror::Error;

pub const WEBHOOK_PATH: &str = "/webhook";
const SET_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);
const SECRET_LEN: usize = 32;
const STATUS_TEXT: &str = "Naino Academy Bot is running!";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid public url {0}")]
    Url(String),
    #[error("failed to register webhook: {0}")]
    Register(#[from] RequestError),
    #[error("failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

#[derive(Clone)]
struct ServerState {
    bot: Bot,
    secret_token: String,
}

pub struct WebhookConfig {
    pub port: u16,
    /// Public base url, e.g. `https://example.onrender.com`.
    pub public_url: Url,
    pub secret_token: Option<String>,
}

/// Registers the webhook, serves HTTP on `0.0.0.0:port` and feeds updates
/// into `dispatcher` until it is stopped.
pub async fn serve(
    bot: Bot,
    mut dispatcher: Dispatcher<Bot, RequestError, DefaultKey>,
    config: WebhookConfig,
) -> Result<(), ServerError> {
    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let url = webhook_url(&config.public_url)?;
    let secret_token = config.secret_token.unwrap_or_else(random_secret);

    let (listener, stop_flag, webhook_router) = webhooks::axum_to_router(
        bot.clone(),
        Options::new(address, url.clone()).secret_token(secret_token.clone()),
    )
    .await?;
    log::info!("Webhook registered at {url}");

    let app = webhook_router.merge(routes(ServerState { bot, secret_token }));
    let tcp = tokio::net::TcpListener::bind(address).await?;
    log::info!("Listening on {address}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(tcp, app).with_graceful_shutdown(stop_flag).await {
            log::error!("HTTP server error: {e}");
        }
    });

    dispatcher
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;
    Ok(())
}

fn routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/set_webhook", get(set_webhook))
        .with_state(state)
}

async fn index() -> Json<Value> {
    Json(json!({ "status": STATUS_TEXT, "webhook": true }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Local::now().to_rfc3339(),
    }))
}

/// Points the webhook at whatever host this request reached us on.
async fn set_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    match register_for_host(&state, headers.get(HOST).and_then(|h| h.to_str().ok())).await {
        Ok(url) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "webhook_url": url.as_str() })),
        ),
        Err(message) => {
            log::error!("Set webhook error: {message}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": message })),
            )
        }
    }
}

async fn register_for_host(state: &ServerState, host: Option<&str>) -> Result<Url, String> {
    let host = host.ok_or("request has no Host header")?;
    let url = webhook_url_for_host(host)?;
    tokio::time::timeout(
        SET_WEBHOOK_TIMEOUT,
        state
            .bot
            .set_webhook(url.clone())
            .secret_token(state.secret_token.clone())
            .send(),
    )
    .await
    .map_err(|_| "timed out waiting for Telegram".to_string())?
    .map_err(|e| e.to_string())?;
    Ok(url)
}

/// `<public_url>/webhook`, keeping any path prefix of the public url.
pub fn webhook_url(public_url: &Url) -> Result<Url, ServerError> {
    let base = public_url.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}{WEBHOOK_PATH}")).map_err(|e| ServerError::Url(e.to_string()))
}

pub fn webhook_url_for_host(host: &str) -> Result<Url, String> {
    Url::parse(&format!("https://{host}{WEBHOOK_PATH}")).map_err(|e| e.to_string())
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}
