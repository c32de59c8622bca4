use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use super::pages;
use super::AppState;
use crate::auth::{session_cookie, CurrentSession};
use crate::profile::{self, canonical_userslug, ProfilePage, SlugLookup};
use crate::topics::{LatestTopicsOptions, RecentTopics};
use crate::{now_ms, Cid};

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/:userslug", get(user_profile))
        .route("/healthz", get(health))
        .route("/api/user/:userslug", get(api_user_profile))
        .route("/api/topics/latest", get(api_latest_topics))
        .route("/api/category/:cid/recent", get(api_category_recent))
}

// ========== Profiles ==========

/// Assemble the profile for `userslug`, persisting the session it touched.
async fn load_profile(
    state: &AppState,
    userslug: &str,
    session: &mut CurrentSession,
) -> Result<Option<ProfilePage>> {
    let Some(user) = state.forum.users.get_user_by_userslug(userslug).await? else {
        return Ok(None);
    };

    let uid = session.uid();
    let page = profile::build_profile(
        &state.forum,
        &state.config,
        uid,
        user,
        &mut session.data,
        now_ms(),
    )
    .await?;

    if let Some(token) = &session.token {
        state.sessions.save(token, &session.data).await?;
    }

    Ok(Some(page))
}

/// Refresh the session cookie so active sessions keep rolling forward.
fn with_session_cookie(state: &AppState, session: &CurrentSession, response: Response) -> Response {
    match &session.token {
        Some(token) => {
            let cookie = session_cookie(
                token,
                &state.config.relative_path,
                state.config.session_cookie_secure,
            );
            ([(header::SET_COOKIE, cookie)], response).into_response()
        }
        None => response,
    }
}

async fn user_profile(
    State(state): State<AppState>,
    Path(userslug): Path<String>,
    session: CurrentSession,
) -> Response {
    profile_response(&state, &userslug, session, false).await
}

async fn api_user_profile(
    State(state): State<AppState>,
    Path(userslug): Path<String>,
    session: CurrentSession,
) -> Response {
    profile_response(&state, &userslug, session, true).await
}

/// Shared by the page and its JSON twin; only browsers get redirected.
async fn profile_response(
    state: &AppState,
    requested: &str,
    mut session: CurrentSession,
    is_api: bool,
) -> Response {
    let userslug = match canonical_userslug(requested, is_api, &state.config.relative_path) {
        SlugLookup::Slug(slug) => slug,
        SlugLookup::Redirect(url) => {
            return (StatusCode::FOUND, [(header::LOCATION, url)]).into_response();
        }
    };

    let page = match load_profile(state, &userslug, &mut session).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, "User not found").into_response();
        }
        Err(e) => {
            tracing::error!("Failed to load profile {userslug}: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let response = if is_api {
        Json(page).into_response()
    } else {
        Html(pages::render_profile(&page, &state.config.relative_path).into_string())
            .into_response()
    };
    with_session_cookie(state, &session, response)
}

// ========== Topics ==========

#[derive(Debug, Deserialize)]
pub struct LatestTopicsParams {
    term: Option<String>,
    start: Option<i64>,
    stop: Option<i64>,
}

async fn api_latest_topics(
    State(state): State<AppState>,
    Query(params): Query<LatestTopicsParams>,
    session: CurrentSession,
) -> Response {
    let options = LatestTopicsOptions {
        uid: session.uid(),
        start: params.start.unwrap_or(0),
        stop: params.stop.unwrap_or(19),
        term: params.term.unwrap_or_default(),
    };

    match state.forum.topics.get_latest_topics(&options).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch latest topics: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRecentParams {
    start: Option<i64>,
    stop: Option<i64>,
    #[serde(default)]
    filter: String,
}

async fn api_category_recent(
    State(state): State<AppState>,
    Path(cid): Path<Cid>,
    Query(params): Query<CategoryRecentParams>,
    session: CurrentSession,
) -> Response {
    let result = state
        .forum
        .topics
        .get_recent_topics(
            cid,
            session.uid(),
            params.start.unwrap_or(0),
            params.stop.unwrap_or(19),
            &params.filter,
        )
        .await;

    match result {
        Ok(page) => Json(page).into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch recent topics for category {cid}: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

async fn health() -> &'static str {
    "OK"
}
