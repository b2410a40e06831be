use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use rand::seq::IndexedRandom;
use serde_json::{Value, json};
use tower_sessions::Session;

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult},
    models::{
        Credentials, HomeResponse, MovieDetails, RatingSubmission, RatingUpdate, RatingView,
        UserView,
    },
};

const MAX_USERNAME_CHARS: usize = 80;

pub async fn home(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<HomeResponse>> {
    let movie_id = *state
        .config
        .movie_ids
        .choose(&mut rand::rng())
        .ok_or_else(|| anyhow::anyhow!("movie catalog is empty"))?;

    tracing::debug!(user_id = user.id, movie_id, "serving home movie");

    let Some(meta) = state.tmdb.fetch_movie(movie_id).await? else {
        return Err(AppError::UpstreamUnavailable(format!("movie {movie_id} not available")));
    };

    let (wiki_url, ratings) =
        tokio::join!(state.wiki.fetch_link(&meta.title), state.store.ratings_for_movie(movie_id));

    Ok(Json(HomeResponse {
        movie: MovieDetails::new(meta, wiki_url),
        ratings: ratings?.into_iter().map(RatingView::from).collect(),
    }))
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let creds = json_body(payload)?;
    let username = creds.username.trim();

    if username.is_empty() {
        return Err(AppError::bad_input("Username cannot be empty"));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(AppError::bad_input(format!(
            "Username cannot be longer than {MAX_USERNAME_CHARS} characters"
        )));
    }

    let user = state.store.create_user(username).await?;
    tracing::info!(user_id = user.id, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Signup successful! Please login.",
            "user": UserView::from(user),
        })),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let creds = json_body(payload)?;
    let username = creds.username.trim();
    if username.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let user = auth::authenticate(&state.store, &session, username).await?;

    Ok(Json(json!({
        "message": "Login successful!",
        "username": user.username,
        "user_id": user.id,
    })))
}

pub async fn logout(session: Session) -> Json<Value> {
    if let Err(err) = auth::end_session(&session).await {
        tracing::warn!(error = %err, "failed to end session");
    }
    Json(json!({ "message": "Logged out" }))
}

pub async fn check_auth(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = match auth::current_user(&session).await? {
        Some(user_id) => state.store.find_user(user_id).await?,
        None => None,
    };

    let body = match user {
        Some(user) => json!({
            "authenticated": true,
            "username": user.username,
            "user_id": user.id,
        }),
        None => json!({ "authenticated": false }),
    };
    Ok(Json(body))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<RatingView>>> {
    let ratings = state.store.all_ratings().await?;
    Ok(Json(ratings.into_iter().map(RatingView::from).collect()))
}

pub async fn submit_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<RatingSubmission>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let sub = json_body(payload)?;
    check_rating(&state, sub.rating)?;
    let comment = sub.comment.as_deref().map(str::trim).unwrap_or_default().to_string();

    let (stored, created) =
        state.store.upsert_rating(user.id, sub.movie_id, sub.rating, comment).await?;

    tracing::info!(
        user_id = user.id,
        movie_id = sub.movie_id,
        rating_id = stored.0.id,
        created,
        "rating saved"
    );

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(json!({
            "message": "Your rating has been saved!",
            "rating": RatingView::from(stored),
        })),
    ))
}

pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    rating_id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<RatingUpdate>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let rating_id = path_id(rating_id)?;
    let update = json_body(payload)?;
    check_rating(&state, update.rating)?;
    let comment = update.comment.map(|c| c.trim().to_string());

    let stored = state.store.update_rating(user.id, rating_id, update.rating, comment).await?;
    tracing::info!(user_id = user.id, rating_id, "rating updated");

    Ok(Json(json!({
        "message": "Rating updated",
        "rating": RatingView::from(stored),
    })))
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    rating_id: Result<Path<i32>, PathRejection>,
) -> AppResult<Json<Value>> {
    let rating_id = path_id(rating_id)?;
    state.store.delete_rating(user.id, rating_id).await?;
    tracing::info!(user_id = user.id, rating_id, "rating deleted");

    Ok(Json(json!({ "message": "Rating deleted" })))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| AppError::BadInput(rejection.body_text()))
}

fn path_id(id: Result<Path<i32>, PathRejection>) -> AppResult<i32> {
    id.map(|Path(id)| id).map_err(|_| AppError::bad_input("rating id must be an integer"))
}

fn check_rating(state: &AppState, value: i32) -> AppResult<()> {
    let range = match (state.config.rating_min, state.config.rating_max) {
        _ if state.config.rating_in_range(value) => return Ok(()),
        (Some(min), Some(max)) => format!("between {min} and {max}"),
        (Some(min), None) => format!("at least {min}"),
        (None, Some(max)) => format!("at most {max}"),
        (None, None) => return Ok(()),
    };
    Err(AppError::bad_input(format!("rating must be {range}")))
}
