use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "parcels": state.dataset.parcel_count(),
        "dataset_loaded_at": state.loaded_at.to_rfc3339(),
    }))
}

/// Serve the merged FeatureCollection bytes, serialized once at startup and
/// shared by every request.
pub async fn get_parcels(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if if_none_match_matches(&headers, &state.etag) {
        return not_modified_response("public, max-age=60", Some(state.etag.as_str()));
    }
    json_bytes_response(
        state.dataset.json.clone(),
        "public, max-age=60",
        Some(state.etag.as_str()),
    )
}

pub async fn get_parcel(
    State(state): State<AppState>,
    Path(ain): Path<String>,
) -> impl IntoResponse {
    match state.dataset.feature_json(&ain) {
        Some(feature) => json_bytes_response(Bytes::from(feature), "public, max-age=60", None),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "unknown parcel", "ain": ain })),
        )
            .into_response(),
    }
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}

/// Strip a weak-validator prefix; byte-range caching is not in play here.
fn normalize_etag(etag: &str) -> &str {
    etag.strip_prefix("W/").unwrap_or(etag)
}
