// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_request::ScrapeRequest;
use crate::domain::models::scrape_result::ScrapeResult;
use crate::presentation::errors::ApiError;
use crate::presentation::routes::AppState;
use axum::extract::State;
use axum::Json;

/// 执行一次按需抓取
///
/// 请求体为目标URL、模块列表与可选的认证配置；
/// 响应为稀疏结果对象，缺席字段表示该模块无结果。
pub async fn scrape(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> Result<Json<ScrapeResult>, ApiError> {
    let result = state.service.scrape(request).await?;
    Ok(Json(result))
}
