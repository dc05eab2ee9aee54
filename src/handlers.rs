use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use log::{error, info};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::dispatch::dispatch_batch;
use crate::error::AppError;
use crate::twilio::SmsSender;
use crate::types::{parse_messages, OutgoingMessage};

/// Provider access, present only when every credential was configured.
pub struct Provider {
    pub sender: Arc<dyn SmsSender>,
    pub from: String,
}

pub struct AppState {
    pub provider: Option<Provider>,
    pub max_messages: usize,
}

/// Single entry point for every path. Checks run in a fixed order and the
/// first failure ends the request before anything is dispatched.
pub async fn send_sms(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> Result<Response, AppError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }
    if method != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let Some(provider) = state.provider.as_ref() else {
        error!("Rejecting send: Twilio credentials are not configured");
        return Err(AppError::Configuration);
    };

    let items = parse_messages(&body).ok_or(AppError::MalformedRequest)?;
    if items.len() > state.max_messages {
        info!(
            "Rejecting batch of {} messages (max {})",
            items.len(),
            state.max_messages
        );
        return Err(AppError::TooManyItems {
            max: state.max_messages,
        });
    }

    let messages = items.into_iter().map(OutgoingMessage::from_value).collect();
    let response = dispatch_batch(provider.sender.as_ref(), &provider.from, messages).await;
    Ok((StatusCode::OK, Json(response)).into_response())
}

pub fn router(state: Arc<AppState>, allowed_origin: &str) -> anyhow::Result<Router> {
    let origin = HeaderValue::from_str(allowed_origin)?;

    Ok(Router::new()
        .fallback(send_sms)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            origin,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
        .with_state(state))
}
