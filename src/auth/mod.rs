//! Browser sign-in through the OpenID Connect provider
//!
//! `/login` starts an authorization code flow with PKCE, `/callback`
//! finishes it and stores the token and profile in the session, `/logout`
//! clears the session and signs out at the provider too.

pub mod identity;

pub use identity::{IdentityGateway, PendingLogin, StoredToken};

use std::sync::Arc;

use anyhow::anyhow;
use axum::extract::{Form, Query, State};
use axum::response::{IntoResponse, Redirect};
use axum::{Router, routing::get};
use serde::Deserialize;
use tracing::{info, warn};

use crate::session::{Session, UserSession};
use crate::web::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback_query).post(callback_form))
        .route("/logout", get(logout))
}

fn gateway(state: &AppState) -> Result<&Arc<IdentityGateway>, AppError> {
    state
        .identity
        .as_ref()
        .ok_or_else(|| anyhow!("Identity provider is not configured").into())
}

async fn login(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<impl IntoResponse, AppError> {
    let (auth_url, pending) = gateway(&state)?.build_authorization_url();
    session.data.pending_login = Some(pending);
    let cookie = session.save().await?;

    Ok((cookie, Redirect::to(&auth_url)))
}

async fn callback_query(
    state: State<AppState>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, AppError> {
    callback(state, session, params).await
}

async fn callback_form(
    state: State<AppState>,
    session: Session,
    Form(params): Form<CallbackParams>,
) -> Result<impl IntoResponse, AppError> {
    callback(state, session, params).await
}

async fn callback(
    State(state): State<AppState>,
    mut session: Session,
    params: CallbackParams,
) -> Result<impl IntoResponse, AppError> {
    let gateway = gateway(&state)?;

    if let Some(error) = params.error {
        warn!("Provider rejected login: {}", error);
        return Err(anyhow!(
            "Login failed: {}",
            params.error_description.unwrap_or(error)
        )
        .into());
    }
    let (Some(code), Some(csrf_state)) = (params.code, params.state) else {
        return Err(anyhow!("Callback is missing code or state").into());
    };

    let pending = session.data.pending_login.take();
    let token = gateway.complete_login(pending, &code, &csrf_state).await?;
    let userinfo = gateway.fetch_userinfo(&token).await?;

    session.data.user = Some(UserSession { token, userinfo });
    let cookie = session.save().await?;
    info!("User signed in");

    Ok((cookie, Redirect::to("/home")))
}

async fn logout(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let cookie = session.clear().await?;
    let destination = match &state.identity {
        Some(gateway) => {
            let return_to = format!("{}/", state.config.server.public_url.trim_end_matches('/'));
            gateway.logout_url(&return_to)?
        }
        None => "/home".to_string(),
    };

    Ok((cookie, Redirect::to(&destination)))
}
