// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// API错误映射
pub mod errors;

/// 请求处理器
pub mod handlers;

/// 路由装配
pub mod routes;
