//! Login and logout routes

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;

use crate::error::Result;
use crate::state::AppState;
use crate::templates::Flash;

/// Submitted login form. Missing fields count as empty, which never authenticates.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Create the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(login_page).post(login))
        .route("/logout", get(logout))
}

/// GET /
async fn login_page(State(state): State<AppState>) -> Result<Html<String>> {
    Ok(Html(state.templates().login(&[])?))
}

/// POST /
async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    if state
        .credentials()
        .verify(&form.username, &form.password)
        .await?
    {
        tracing::info!(username = %form.username, "Login succeeded");
        let jar = state.sessions().start_session(jar, &form.username);
        return Ok((jar, Redirect::to("/upload")).into_response());
    }

    tracing::warn!(username = %form.username, "Login failed");
    let page = state
        .templates()
        .login(&[Flash::error("Invalid credentials")])?;
    Ok(Html(page).into_response())
}

/// GET /logout
async fn logout(State(state): State<AppState>, jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    if let Some(username) = state.sessions().current_user(&jar) {
        tracing::info!(username = %username, "Logged out");
    }
    (state.sessions().end_session(jar), Redirect::to("/"))
}
