// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::presentation::routes::AppState;
use axum::extract::State;

/// 以Prometheus文本格式导出指标
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
