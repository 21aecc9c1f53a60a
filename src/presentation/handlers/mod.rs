// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 健康检查处理器
pub mod health_handler;

/// 指标导出处理器
pub mod metrics_handler;

/// 抓取处理器
pub mod scrape_handler;
