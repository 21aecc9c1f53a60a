// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据归一化工具
pub mod normalizer;

/// 重试策略
pub mod retry_policy;

/// Robots.txt检查器
pub mod robots;

/// 站点地图发现
pub mod sitemap;

/// 遥测初始化
pub mod telemetry;

/// URL工具函数
pub mod url_utils;
