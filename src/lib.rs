//! Poultry Farm API Library
//!
//! Feed inventory ledger, FIFO-by-freshness consumption recording and the
//! flock registry behind a JSON API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Extension, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::{AuthConfig, AuthRouterExt, AuthService};
use crate::db::DbPool;
use crate::services::{
    activity_log::ActivityLogService, consumption_recorder::ConsumptionRecorder,
    feed_ledger::FeedInventoryService, flocks::FlockService,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub feed_inventory: FeedInventoryService,
    pub consumption_recorder: ConsumptionRecorder,
    pub flocks: FlockService,
    pub activity_log: ActivityLogService,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wires every service over one pool and event channel.
    pub fn new(db: Arc<DbPool>, config: config::AppConfig, event_sender: events::EventSender) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config)));
        Self {
            feed_inventory: FeedInventoryService::new(db.clone(), event_sender.clone()),
            consumption_recorder: ConsumptionRecorder::new(
                db.clone(),
                event_sender.clone(),
                config.consumption_timeout(),
            ),
            flocks: FlockService::new(db.clone(), event_sender.clone()),
            activity_log: ActivityLogService::new(db.clone()),
            auth,
            db,
            config,
            event_sender,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    /// Attaches a user-facing status message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}


// Versioned API routes
pub fn api_v1_routes() -> Router<AppState> {
    // Feed routes with permission gating
    let feed_read = Router::new()
        .route("/feed/stock", get(handlers::feed::stock_summary))
        .route("/feed/stock/:feed_type", get(handlers::feed::stock_for_type))
        .route("/feed/consumption", get(handlers::feed::list_consumption))
        .route("/feed/consumption/:id", get(handlers::feed::get_consumption))
        .with_permission(perm::FEED_READ);

    let feed_receive = Router::new()
        .route("/feed/batches", post(handlers::feed::receive_batch))
        .with_permission(perm::FEED_RECEIVE);

    let feed_consume = Router::new()
        .route("/feed/consumption", post(handlers::feed::record_consumption))
        .with_permission(perm::FEED_CONSUME);

    // Flock routes with permission gating
    let flocks_read = Router::new()
        .route("/flocks", get(handlers::flocks::list_flocks))
        .route("/flocks/:id", get(handlers::flocks::get_flock))
        .with_permission(perm::FLOCKS_READ);

    let flocks_write = Router::new()
        .route("/flocks", post(handlers::flocks::create_flock))
        .with_permission(perm::FLOCKS_WRITE);

    Router::new()
        .merge(feed_read)
        .merge(feed_receive)
        .merge(feed_consume)
        .merge(flocks_read)
        .merge(flocks_write)
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.should_allow_permissive_cors() {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    base.allow_origin(origins)
}

/// Full application router with middleware applied.
pub fn app(state: AppState) -> Router {
    let auth = state.auth.clone();
    let max_body_size = state.config.max_body_size;
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(Extension(auth))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
