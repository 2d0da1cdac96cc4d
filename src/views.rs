//! Server-rendered pages
//!
//! Templates live in `templates/` and are compiled in by askama, which
//! escapes every value for HTML. Script values go through the `json` filter.

use askama::Template;
use axum::{Router, extract::State, response::Html, routing::get};

use crate::session::Session;
use crate::web::{AppError, AppState};

#[derive(Template)]
#[template(path = "welcome.html")]
pub struct WelcomeTemplate {
    pub pretty: String,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub given_name: String,
    pub google_maps_key: String,
    pub pretty: String,
}

#[derive(Template)]
#[template(path = "directions.html")]
pub struct DirectionsTemplate {
    pub google_maps_key: String,
    pub start: String,
    pub end: String,
}

fn render_html<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/home", get(home))
        .route("/directions", get(directions))
}

fn pretty_user(session: &Session) -> String {
    session
        .data
        .user
        .as_ref()
        .and_then(|user| serde_json::to_string_pretty(user).ok())
        .unwrap_or_else(|| "null".to_string())
}

fn maps_key(state: &AppState) -> String {
    state.config.google.api_key.clone().unwrap_or_default()
}

async fn welcome(session: Session) -> Result<Html<String>, AppError> {
    render_html(&WelcomeTemplate {
        pretty: pretty_user(&session),
    })
}

async fn home(State(state): State<AppState>, session: Session) -> Result<Html<String>, AppError> {
    let given_name = session
        .data
        .user
        .as_ref()
        .and_then(|user| user.given_name())
        .unwrap_or_default()
        .to_string();

    render_html(&HomeTemplate {
        given_name,
        google_maps_key: maps_key(&state),
        pretty: pretty_user(&session),
    })
}

async fn directions(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    render_html(&DirectionsTemplate {
        google_maps_key: maps_key(&state),
        start: session.data.start.clone().unwrap_or_default(),
        end: session.data.end.clone().unwrap_or_default(),
    })
}
