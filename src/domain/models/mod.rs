// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 抓取请求模型
pub mod scrape_request;

/// 抓取结果模型
pub mod scrape_result;
