#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU16, AtomicUsize, Ordering},
    },
};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use movie_explorer::{AppState, config::Config, db, router};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

pub const WIKI_FALLBACK: &str = "https://en.wikipedia.org/wiki/Main_Page";

/// Stand-in for TMDB and the Wikipedia API, served on a loopback port.
#[derive(Clone, Default)]
pub struct Upstream {
    pub tmdb_hits: Arc<AtomicUsize>,
    pub wiki_hits: Arc<AtomicUsize>,
    tmdb_status: Arc<AtomicU16>,
    wiki_status: Arc<AtomicU16>,
}

impl Upstream {
    pub fn fail_tmdb(&self, status: StatusCode) {
        self.tmdb_status.store(status.as_u16(), Ordering::SeqCst);
    }

    pub fn fail_wiki(&self, status: StatusCode) {
        self.wiki_status.store(status.as_u16(), Ordering::SeqCst);
    }

    fn status(slot: &AtomicU16) -> StatusCode {
        match slot.load(Ordering::SeqCst) {
            0 => StatusCode::OK,
            code => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    async fn serve(self) -> SocketAddr {
        let app = Router::new()
            .route("/3/movie/{id}", get(fake_movie))
            .route("/w/api.php", get(fake_wiki))
            .with_state(self);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        addr
    }
}

async fn fake_movie(
    State(upstream): State<Upstream>,
    Path(id): Path<i32>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    upstream.tmdb_hits.fetch_add(1, Ordering::SeqCst);

    let status = Upstream::status(&upstream.tmdb_status);
    if !status.is_success() {
        return (status, Json(json!({ "status_message": "nope" }))).into_response();
    }
    if params.get("api_key").map(String::as_str) != Some("test-key") {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(json!({
        "id": id,
        "title": "Shrek: The Localized Cut",
        "original_title": "Shrek",
        "tagline": "The greatest fairy tale never told.",
        "genres": [{"id": 16, "name": "Animation"}, {"id": 35, "name": "Comedy"}],
        "poster_path": "/shrek.jpg"
    }))
    .into_response()
}

async fn fake_wiki(
    State(upstream): State<Upstream>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    upstream.wiki_hits.fetch_add(1, Ordering::SeqCst);

    let status = Upstream::status(&upstream.wiki_status);
    if !status.is_success() {
        return status.into_response();
    }

    let title = params.get("titles").cloned().unwrap_or_default();
    Json(json!({
        "batchcomplete": true,
        "query": {"pages": [{
            "title": title,
            "fullurl": format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_"))
        }]}
    }))
    .into_response()
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub upstream: Upstream,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let upstream = Upstream::default();
        let addr = upstream.clone().serve().await;

        let dir = tempfile::tempdir().unwrap();
        let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        let mut config = Config {
            database_url,
            tmdb_api_key: "test-key".to_string(),
            tmdb_base_url: format!("http://{addr}/3"),
            wiki_api_url: format!("http://{addr}/w/api.php"),
            wiki_fallback_url: WIKI_FALLBACK.to_string(),
            movie_ids: vec![808],
            http_timeout_secs: 5,
            ..Config::default()
        };
        tweak(&mut config);

        let db = db::connect_and_migrate(&config.database_url).await.unwrap();
        let state = AppState::new(config, db).unwrap();

        Self { router: router(state.clone()), state, upstream, _dir: dir }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        self.dispatch(req).await
    }

    pub async fn dispatch(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body =
            if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };

        TestResponse { status, headers, body }
    }

    pub async fn signup(&self, username: &str) -> TestResponse {
        self.send(Method::POST, "/signup", None, Some(json!({ "username": username }))).await
    }

    pub async fn login(&self, username: &str) -> TestResponse {
        self.send(Method::POST, "/login", None, Some(json!({ "username": username }))).await
    }

    /// Signs up and logs in, returning the `Cookie` header value for the session.
    pub async fn user(&self, username: &str) -> String {
        assert_eq!(self.signup(username).await.status, StatusCode::CREATED);
        let resp = self.login(username).await;
        assert_eq!(resp.status, StatusCode::OK);
        session_cookie(&resp.headers).expect("login sets a session cookie")
    }

    pub async fn rate(
        &self,
        cookie: &str,
        movie_id: i32,
        rating: i32,
        comment: &str,
    ) -> TestResponse {
        self.send(
            Method::POST,
            "/comments",
            Some(cookie),
            Some(json!({ "movie_id": movie_id, "rating": rating, "comment": comment })),
        )
        .await
    }

    pub async fn comments(&self) -> Vec<Value> {
        let resp = self.send(Method::GET, "/comments", None, None).await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.body.as_array().cloned().unwrap_or_default()
    }
}

/// `session=<token>` from the response's `Set-Cookie` header, if a live session was set.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with("session=") && pair.len() > "session=".len())
        .map(str::to_string)
}
