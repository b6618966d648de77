use crate::models::{decimal_from_f64, format_brl, BudgetLine, Dataset, MatchResult, SearchQuery};
use crate::service::{budget_csv_bytes, CandidateExtractor, MatchingEngine, Session, SessionError};
use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared state: the loaded dataset, the extractor and the estimator's session
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub engine: MatchingEngine,
    pub extractor: Arc<CandidateExtractor>,
    pub session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(dataset: Arc<Dataset>, extractor: CandidateExtractor) -> Self {
        Self {
            dataset,
            engine: MatchingEngine::default(),
            extractor: Arc::new(extractor),
            session: Arc::new(Mutex::new(Session::new())),
        }
    }
}

/// Response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

/// Request body: a page of drawing text
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub page: u32,
    pub text: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub index: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionSearchRequest {
    #[serde(default)]
    pub term: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    pub candidate_index: usize,
    #[serde(default)]
    pub quantity: Option<f64>,
}

/// Session snapshot returned by every session endpoint
#[derive(Debug, Serialize)]
pub struct SessionView<'a> {
    #[serde(flatten)]
    pub session: &'a Session,
    pub page_done: bool,
    pub search_status: Option<String>,
}

impl<'a> From<&'a Session> for SessionView<'a> {
    fn from(session: &'a Session) -> Self {
        Self {
            session,
            page_done: session.is_page_done(),
            search_status: session.last_search().map(MatchResult::status_message),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BudgetView<'a> {
    pub lines: &'a [BudgetLine],
    pub total: BigDecimal,
    pub total_display: String,
}

fn respond<T: Serialize>(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Response {
    let response = ApiResponse {
        success: status.is_success(),
        message: message.into(),
        data,
    };
    (status, Json(response)).into_response()
}

fn session_error(e: SessionError) -> Response {
    let status = match e {
        SessionError::IndexOutOfRange { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    respond::<()>(status, format!("Error: {}", e), None)
}

/// Runs a session transition; the stored session only changes when it succeeds
async fn transition<F>(state: &AppState, message: &str, f: F) -> Response
where
    F: FnOnce(&Session) -> Result<Session, SessionError>,
{
    let mut session = state.session.lock().await;
    match f(&session) {
        Ok(next) => {
            *session = next;
            respond(StatusCode::OK, message, Some(SessionView::from(&*session)))
        }
        Err(e) => session_error(e),
    }
}

/// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

/// Stateless lookup against the loaded dataset
pub async fn search(State(state): State<AppState>, Json(query): Json<SearchQuery>) -> Response {
    let result = state.engine.match_query(&query, &state.dataset);
    (StatusCode::OK, Json(result)).into_response()
}

/// Extracts services from a page and makes them the pending queue
pub async fn extract_page(State(state): State<AppState>, Json(req): Json<ExtractRequest>) -> Response {
    let extraction = state
        .extractor
        .extract(req.page, &req.text, req.api_key.as_deref())
        .await;

    let mut session = state.session.lock().await;
    *session = session.load_page(req.page, extraction.candidates);

    let view = SessionView::from(&*session);
    match extraction.error {
        None => respond(
            StatusCode::OK,
            format!("Page {}: {} services", req.page, session.pending().len()),
            Some(view),
        ),
        Some(reason) => respond(StatusCode::BAD_GATEWAY, format!("Error: {}", reason), Some(view)),
    }
}

pub async fn get_session(State(state): State<AppState>) -> Response {
    let session = state.session.lock().await;
    respond(StatusCode::OK, "Session", Some(SessionView::from(&*session)))
}

pub async fn select_service(State(state): State<AppState>, Json(req): Json<SelectRequest>) -> Response {
    transition(&state, "Service selected", |s| s.select(req.index)).await
}

pub async fn search_selected(
    State(state): State<AppState>,
    body: Option<Json<SessionSearchRequest>>,
) -> Response {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let dataset = Arc::clone(&state.dataset);
    let engine = state.engine;
    transition(&state, "Search finished", |s| {
        s.search(req.term.as_deref(), &engine, &dataset)
    })
    .await
}

pub async fn accept_candidate(State(state): State<AppState>, Json(req): Json<AcceptRequest>) -> Response {
    let quantity = match req.quantity {
        Some(q) => match decimal_from_f64(q) {
            Some(d) => Some(d),
            None => return session_error(SessionError::InvalidQuantity(q.to_string())),
        },
        None => None,
    };
    transition(&state, "Composition added to budget", |s| {
        s.accept(req.candidate_index, quantity)
    })
    .await
}

pub async fn skip_service(State(state): State<AppState>) -> Response {
    transition(&state, "Service skipped", Session::skip).await
}

pub async fn get_budget(State(state): State<AppState>) -> Response {
    let session = state.session.lock().await;
    let ledger = session.ledger();
    let total = ledger.total();
    let view = BudgetView {
        lines: ledger.lines(),
        total_display: format_brl(&total),
        total,
    };
    respond(StatusCode::OK, format!("{} lines", ledger.len()), Some(view))
}

pub async fn clear_budget(State(state): State<AppState>) -> Response {
    transition(&state, "Budget cleared", |s| Ok(s.clear_budget())).await
}

pub async fn remove_budget_line(State(state): State<AppState>, Path(index): Path<usize>) -> Response {
    transition(&state, "Line removed", |s| s.remove_line(index)).await
}

/// Budget as a `;`-separated download
pub async fn export_budget(State(state): State<AppState>) -> Response {
    let session = state.session.lock().await;
    match budget_csv_bytes(session.ledger()) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"orcamento_final.csv\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Budget export failed: {}", e);
            respond::<()>(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e), None)
        }
    }
}
