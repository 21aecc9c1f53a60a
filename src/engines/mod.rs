// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 浏览器抓取引擎
pub mod browser_engine;

/// 主机级熔断器
pub mod circuit_breaker;

/// 原始HTTP抓取引擎
pub mod fetch_engine;

/// 抓取编排服务
pub mod orchestrator;

/// 引擎共享类型与错误
pub mod traits;
