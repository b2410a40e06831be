pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;
pub mod tmdb;
pub mod wiki;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::MemoryStore;

use crate::{config::Config, store::Store, tmdb::TmdbClient, wiki::WikiClient};

pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub sessions: MemoryStore,
    pub tmdb: TmdbClient,
    pub wiki: WikiClient,
}

impl AppState {
    pub fn new(config: Config, db: DatabaseConnection) -> anyhow::Result<Arc<Self>> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("movie-explorer/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("building HTTP client")?;

        let tmdb = TmdbClient::new(
            http.clone(),
            config.tmdb_api_key.clone(),
            config.tmdb_base_url.clone(),
            config.tmdb_image_base_url.clone(),
        );
        let wiki =
            WikiClient::new(http, config.wiki_api_url.clone(), config.wiki_fallback_url.clone());

        Ok(Arc::new(Self {
            config: Arc::new(config),
            store: Store::new(db),
            sessions: MemoryStore::default(),
            tmdb,
            wiki,
        }))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);
    let sessions = auth::session_layer(state.sessions.clone(), &state.config);

    Router::new()
        .route("/", get(routes::home))
        .route("/home", get(routes::home))
        .route("/signup", post(routes::signup))
        .route("/login", post(routes::login))
        .route("/logout", post(routes::logout))
        .route("/check-auth", get(routes::check_auth))
        .route("/comments", get(routes::list_comments).post(routes::submit_comment))
        .route("/comments/{id}", put(routes::update_comment).delete(routes::delete_comment))
        .with_state(state)
        .layer(sessions)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Cookies only cross origins with an explicit allowed origin; otherwise any origin
/// may call the API without credentials.
fn cors_layer(config: &Config) -> CorsLayer {
    let origin = config.cors_origin.as_deref().map(|o| (o, HeaderValue::from_str(o)));

    match origin {
        Some((_, Ok(origin))) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
        Some((raw, Err(_))) => {
            tracing::warn!(origin = raw, "ignoring invalid CORS_ORIGIN");
            CorsLayer::new().allow_origin(Any).allow_headers(Any)
        },
        None => CorsLayer::new().allow_origin(Any).allow_headers(Any),
    }
}
