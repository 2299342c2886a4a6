//! Route handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::payments::types::{ErrorBody, PaymentRequest};

/// `POST /api/send`: execute one split payment.
pub async fn submit_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Response {
    let request_id = request_id(&headers);

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let status = rejection_status(&rejection);
            tracing::warn!(request_id = %request_id, error = %rejection, "Malformed payment request");
            metrics::record_http_request(status.as_u16());
            return (status, Json(ErrorBody::new(rejection.body_text()))).into_response();
        }
    };

    tracing::info!(
        request_id = %request_id,
        recipient = %request.recipient_address,
        amount = %request.amount.as_text(),
        "Payment requested"
    );

    let response = match state.processor.submit_payment(&request).await {
        Ok(outcome) => outcome.into_response(),
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Payment failed before broadcast");
            e.into_response()
        }
    };

    metrics::record_http_request(response.status().as_u16());
    response
}

/// Status for a body that could not be read as a payment request.
///
/// Any body that fails to deserialize is a bad request. A missing JSON
/// content type stays 415 and an oversized body stays 413.
pub fn rejection_status(rejection: &JsonRejection) -> StatusCode {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        JsonRejection::BytesRejection(_) => rejection.status(),
        _ => StatusCode::BAD_REQUEST,
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub network: String,
    pub sender: String,
}

/// `GET /health`: liveness of the relay process itself.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "operational",
        version: env!("CARGO_PKG_VERSION"),
        network: state.processor.network().to_string(),
        sender: state.processor.sender().to_string(),
    })
}
