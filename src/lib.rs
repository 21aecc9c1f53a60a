// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体和站点适配服务
pub mod domain;

/// 引擎模块
///
/// 实现浏览器抓取、无浏览器回退抓取与请求编排
pub mod engines;

/// 提取模块
///
/// 针对各数据模块的启发式提取策略
pub mod extract;

/// 基础设施模块
///
/// 提供外部服务集成，如远程重任务后端
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由、处理器和错误映射
pub mod presentation;

/// 队列模块
///
/// 实现有界并发的准入队列
pub mod queue;

/// 工具模块
///
/// 提供重试策略、robots/站点地图发现、归一化等辅助功能
pub mod utils;
