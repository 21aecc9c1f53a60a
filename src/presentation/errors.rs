// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::ScrapeError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// API错误
///
/// 将抓取错误变体映射到HTTP语义：熔断拒绝带Retry-After的429，
/// 浏览器基础设施故障503，队列超时504，上游抓取失败502。
#[derive(Debug)]
pub struct ApiError(pub ScrapeError);

impl From<ScrapeError> for ApiError {
    fn from(err: ScrapeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            ScrapeError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ScrapeError::CircuitOpen { .. } => (StatusCode::TOO_MANY_REQUESTS, "circuit_open"),
            ScrapeError::QueueTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "queue_timeout"),
            ScrapeError::BrowserMissing | ScrapeError::BrowserLaunchFailed(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "browser_unavailable")
            }
            ScrapeError::Navigation(_)
            | ScrapeError::Network(_)
            | ScrapeError::UpstreamStatus(_) => (StatusCode::BAD_GATEWAY, "fetch_failed"),
            ScrapeError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        let body = Json(json!({
            "error": self.0.to_string(),
            "kind": kind,
        }));

        if let ScrapeError::CircuitOpen { retry_after_ms, .. } = &self.0 {
            let retry_after_secs = retry_after_ms.div_ceil(1000).max(1);
            return (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                body,
            )
                .into_response();
        }

        (status, body).into_response()
    }
}
