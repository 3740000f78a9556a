//! HTTP endpoints for the dashboard

use crate::deep_link::{self, DeepLinkState};
use crate::dispatch::{Dispatcher, SearchEvent};
use crate::mirror::{MatchRow, MirrorView};
use crate::page;
use crate::params::SearchForm;
use crate::resolve::{ResultOutcome, ResultResolver};
use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// API state
pub struct ApiState {
    pub dispatcher: Dispatcher,
    pub resolver: ResultResolver,
}

/// Query of the results endpoint
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ResultsQuery {
    /// Empty when missing, which resolves like an unknown task
    pub task: String,
    /// Only the exact string "True" enables the analog report
    pub analog: bool,
}

impl ResultsQuery {
    /// Parse a raw query string. A repeated key keeps its first value and
    /// nothing here is rejected.
    pub fn parse(raw: &str) -> Self {
        let mut task = None;
        let mut analog = None;
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "task" if task.is_none() => task = Some(value.into_owned()),
                "analog" if analog.is_none() => analog = Some(value == "True"),
                _ => {}
            }
        }
        Self {
            task: task.unwrap_or_default(),
            analog: analog.unwrap_or(false),
        }
    }
}

/// Query of the deep link state endpoint
#[derive(Debug, Deserialize)]
pub struct StateQuery {
    /// Raw `location.hash` of the page
    #[serde(default)]
    pub hash: String,
}

/// Current form values the share links are built from
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinksQuery {
    pub usi1: String,
    pub peaks: String,
    pub precursor_mz: String,
}

/// Share links for the current form values
#[derive(Debug, Serialize)]
pub struct LinksResponse {
    /// Dashboard link that restores the form
    pub query_link: String,
    /// Public FASST search for the USI
    pub masst_link: String,
}

/// Mirror plot request
#[derive(Debug, Deserialize)]
pub struct MirrorRequest {
    #[serde(default)]
    pub usi1: String,
    /// Selected table row, if any
    #[serde(default)]
    pub row: Option<serde_json::Value>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Create the API router
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/microbiomemasst", get(dashboard_page))
        .route("/microbiomemasst/", get(dashboard_page))
        .route("/microbiomemasst/results", get(results))
        .route("/microbiomemasst/search/{event}", post(search))
        .route("/microbiomemasst/state", get(deep_link_state))
        .route("/microbiomemasst/links", get(share_links))
        .route("/microbiomemasst/mirror", post(mirror_plot))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Dashboard page
async fn dashboard_page() -> Html<String> {
    Html(page::render_dashboard())
}

/// Resolved document for a task. Always 200: failures are documents too.
async fn results(
    State(state): State<Arc<ApiState>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let ResultsQuery { task, analog } = ResultsQuery::parse(raw.as_deref().unwrap_or_default());

    let outcome = state.resolver.resolve(&task, analog).await;
    match &outcome {
        ResultOutcome::Error { exit: Some(exit) } => {
            info!(task, analog, exit = ?exit, "Task resolved to error document");
        }
        _ => debug!(task, analog, outcome = outcome.kind(), "Resolved task"),
    }

    let body = state.resolver.document(&outcome).await;
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Run a search and return the viewer fragment
async fn search(
    State(state): State<Arc<ApiState>>,
    Path(event): Path<SearchEvent>,
    Form(form): Form<SearchForm>,
) -> Result<Html<String>, (StatusCode, String)> {
    info!(event = ?event, "Search requested");
    match state.dispatcher.dispatch(event, &form).await {
        Ok(report) => Ok(Html(page::render_dispatch_report(&report))),
        Err(e) => {
            warn!(error = %e, "Search dispatch failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Form values encoded in a page fragment
async fn deep_link_state(Query(query): Query<StateQuery>) -> Json<DeepLinkState> {
    Json(deep_link::decode(&query.hash))
}

/// Copy Link target and external MASST link
async fn share_links(headers: HeaderMap, Query(query): Query<LinksQuery>) -> Json<LinksResponse> {
    let state = DeepLinkState {
        usi1: query.usi1,
        peaks: query.peaks,
        precursor_mz: query.precursor_mz,
    };
    Json(LinksResponse {
        query_link: deep_link::query_link(&base_url(&headers), &state),
        masst_link: deep_link::fasst_link(&state.usi1),
    })
}

/// Mirror plot panel for the selected row
async fn mirror_plot(Json(request): Json<MirrorRequest>) -> Html<String> {
    let row = request
        .row
        .and_then(|value| serde_json::from_value::<MatchRow>(value).ok());
    Html(MirrorView::for_selection(&request.usi1, row.as_ref()).to_html())
}

fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{scheme}://{host}")
}
