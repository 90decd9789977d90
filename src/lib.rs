pub mod appresult;
pub mod auth;
pub mod chats;
pub mod config;
pub mod contacts;
pub mod db;
pub mod hospitals;
pub mod sms;
pub mod triage;

use std::time::Duration;

use axum::{extract::FromRef, Router};
use serde_json::Value;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult, JsonBody};

use auth::TokenKeys;
use config::Config;
use hospitals::locator::HospitalLocator;
use sms::SmsGateway;
use triage::{Escalation, LanguageModel};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub keys: TokenKeys,
    pub llm: LanguageModel,
    pub locator: HospitalLocator,
    pub sms: SmsGateway,
    pub upstream_timeout: Duration,
}

impl AppState {
    /// Wires every upstream from `config`; all of them share one HTTP client
    /// carrying the upstream timeout.
    pub fn new(db_pool: SqlitePool, config: &Config) -> AppResult<AppState> {
        let http_client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()?;

        Ok(AppState {
            db_pool,
            keys: TokenKeys::from_secret(&config.jwt_secret),
            llm: LanguageModel::new(http_client.clone(), &config.chat),
            locator: HospitalLocator::new(http_client.clone(), config.overpass_url.clone()),
            sms: SmsGateway::new(http_client, &config.twilio),
            upstream_timeout: config.upstream_timeout,
        })
    }

    pub fn escalation(&self) -> Escalation<'_> {
        Escalation {
            db_pool: &self.db_pool,
            locator: &self.locator,
            sms: &self.sms,
            timeout: self.upstream_timeout,
        }
    }
}

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/api", chats::router())
        .nest("/api/emergency-contacts", contacts::router())
        .nest("/api/hospitals", hospitals::router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
}

impl GetField for Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or_else(|| AppError::upstream(format!("expected {field} in {self}")))?
            .as_str()
            .ok_or_else(|| AppError::upstream(format!("expected {field} in {self} to be string")))?
            .to_owned()
        )
    }
}
