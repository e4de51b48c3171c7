#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use poultry_farm_api::{
    auth::ADMIN_ROLE,
    config::AppConfig,
    db::{self, DbConfig, DbPool},
    entities::{
        consumption_deduction::Entity as ConsumptionDeduction,
        feed_batch::{self, Entity as FeedBatch},
        feed_consumption::Entity as FeedConsumption,
        flock,
    },
    events::{self, EventHandler},
    services::{
        activity_log::ActivityLogService, consumption_recorder::ConsumptionRecorder,
        feed_ledger::NewFeedBatch, flocks::NewFlock,
    },
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Statement};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "k7Qp2vX9mR4tW8zB1nC6yH3jL5sD0fGa";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        TEST_JWT_SECRET.to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    cfg.cors_allow_any_origin = true;
    cfg
}

/// Fresh, migrated in-memory database.
pub async fn setup_db() -> Arc<DbPool> {
    let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
        .await
        .expect("failed to create test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations in tests");
    Arc::new(pool)
}

/// Helper harness for an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub user_id: Uuid,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let db_arc = setup_db().await;

        let (event_sender, event_rx) = events::channel(cfg.event_channel_capacity);
        let activity_log: Arc<dyn EventHandler> =
            Arc::new(ActivityLogService::new(db_arc.clone()));
        let event_task = tokio::spawn(events::process_events(event_rx, vec![activity_log]));

        let state = AppState::new(db_arc, cfg, event_sender);
        let router = poultry_farm_api::app(state.clone());

        let user_id = Uuid::new_v4();
        let token = state
            .auth
            .issue_token(
                user_id,
                Some("Farm Manager".to_string()),
                vec![ADMIN_ROLE.to_string()],
                vec![],
            )
            .expect("issue admin token");

        Self {
            router,
            state,
            user_id,
            token,
            _event_task: event_task,
        }
    }

    /// Bearer token for an admin user.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Bearer token for a non-admin user holding exactly `permissions`.
    pub fn token_with_permissions(&self, permissions: &[&str]) -> String {
        self.state
            .auth
            .issue_token(
                Uuid::new_v4(),
                Some("Farm Hand".to_string()),
                vec!["worker".to_string()],
                permissions.iter().map(|p| p.to_string()).collect(),
            )
            .expect("issue scoped token")
    }

    /// Recorder over the same database with a custom transaction bound.
    pub fn recorder_with_timeout(&self, timeout: Duration) -> ConsumptionRecorder {
        ConsumptionRecorder::new(
            self.state.db.clone(),
            self.state.event_sender.clone(),
            timeout,
        )
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn seed_flock(&self, name: &str) -> flock::Model {
        self.state
            .flocks
            .create_flock(
                NewFlock {
                    name: name.to_string(),
                    breed: Some("ISA Brown".to_string()),
                    bird_count: 500,
                },
                self.user_id,
            )
            .await
            .expect("seed flock")
    }

    pub async fn seed_batch(
        &self,
        feed_type: &str,
        quantity: Decimal,
        purchase_date: NaiveDate,
        expiry_date: NaiveDate,
    ) -> feed_batch::Model {
        self.state
            .feed_inventory
            .receive_batch(
                NewFeedBatch {
                    feed_type: feed_type.to_string(),
                    quantity,
                    purchase_date,
                    expiry_date,
                    supplier: Some("Valley Mills".to_string()),
                    unit_cost: None,
                },
                self.user_id,
            )
            .await
            .expect("seed feed batch")
    }

    pub async fn batch(&self, id: i32) -> feed_batch::Model {
        FeedBatch::find_by_id(id)
            .one(self.state.db.as_ref())
            .await
            .expect("load batch")
            .expect("batch exists")
    }

    pub async fn consumption_count(&self) -> u64 {
        FeedConsumption::find()
            .count(self.state.db.as_ref())
            .await
            .expect("count consumption")
    }

    pub async fn deduction_count(&self) -> u64 {
        ConsumptionDeduction::find()
            .count(self.state.db.as_ref())
            .await
            .expect("count deductions")
    }

    pub async fn execute_sql(&self, sql: &str) {
        let db = self.state.db.as_ref();
        db.execute(Statement::from_string(
            db.get_database_backend(),
            sql.to_string(),
        ))
        .await
        .expect("execute raw sql");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}
