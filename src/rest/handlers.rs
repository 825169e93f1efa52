use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::{
    service::query::{FilterOutcome, QueryService},
    storage::Storage,
    types::{FilterParams, QuotePatch, QuotesError, ValidationError},
    validation::rating_from_json,
};

use super::{
    models::{
        CountResponse, CreateQuoteRequest, ErrorResponse, HealthResponse, MessageResponse,
        NoMatchesResponse, UpdateQuoteRequest,
    },
    AppState,
};

pub async fn health<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            uptime_secs,
        }),
    )
}

pub async fn list_quotes<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> Response {
    match state.quotes.get_all() {
        Ok(quotes) => Json(quotes).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn list_author_quotes<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Response {
    let author_id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };
    match state.quotes.get_by_author(author_id) {
        Ok(quotes) => Json(quotes).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn get_quote<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Response {
    let result = parse_id(&id).and_then(|id| state.quotes.get_by_id(id));
    match result {
        Ok(quote) => Json(quote).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn count_quotes<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> Response {
    match state.quotes.count() {
        Ok(count) => Json(CountResponse { count }).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn random_quote<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> Response {
    match state.quotes.pick_random() {
        Ok(quote) => Json(quote).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn create_quote<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Response {
    let req: CreateQuoteRequest = match parse_body(&body) {
        Ok(req) => req,
        Err(err) => return error_response(err),
    };
    let rating = req.rating.as_ref().map(rating_from_json);

    match state.quotes.create(
        req.author.as_deref().unwrap_or_default(),
        req.text.as_deref().unwrap_or_default(),
        rating.as_deref(),
    ) {
        Ok(quote) => (StatusCode::CREATED, Json(quote)).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn update_quote<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let req: UpdateQuoteRequest = match parse_body(&body) {
        Ok(req) => req,
        Err(err) => return error_response(err),
    };
    // A present null is kept as an empty value so validation rejects it.
    let patch = QuotePatch {
        author: req.author.map(Option::unwrap_or_default),
        text: req.text.map(Option::unwrap_or_default),
        rating: req.rating.as_ref().map(rating_from_json),
    };
    let result = parse_id(&id).and_then(|id| state.quotes.update(id, &patch));
    match result {
        Ok(quote) => Json(quote).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn delete_quote<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Response {
    let result = parse_id(&id).and_then(|id| state.quotes.delete(id).map(|()| id));
    match result {
        Ok(id) => Json(MessageResponse {
            message: format!("Quote with id {id} is deleted."),
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn filter_quotes<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    Query(params): Query<FilterParams>,
) -> Response {
    match QueryService::new(&state.quotes).run(&params) {
        Ok(FilterOutcome::Matches(quotes)) => Json(quotes).into_response(),
        Ok(FilterOutcome::NoMatches { filters_applied }) => Json(NoMatchesResponse {
            message: "No quotes found matching the given filters".to_string(),
            filters_applied,
            quotes: Vec::new(),
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "endpoint not found".to_string(),
        }),
    )
}

fn parse_id(raw: &str) -> Result<i64, QuotesError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidId(raw.to_string()).into())
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, QuotesError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::MalformedBody("request body is empty".to_string()).into());
    }
    serde_json::from_slice(body).map_err(|err| ValidationError::MalformedBody(err.to_string()).into())
}

fn error_response(err: QuotesError) -> Response {
    let (status, message) = match &err {
        QuotesError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
        QuotesError::Validation(reason) => {
            log::warn!("Rejected request: {}", reason);
            (StatusCode::BAD_REQUEST, reason.to_string())
        }
        QuotesError::Persistence(cause) => {
            log::error!("Storage failure: {:?}", cause);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal storage error".to_string(),
            )
        }
    };
    (status, Json(ErrorResponse { message })).into_response()
}
