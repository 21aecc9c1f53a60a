// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::retry_policy;
use thiserror::Error;

/// 抓取错误类型
///
/// 每种故障形态有独立变体，调用方按变体分流：
/// 瞬态错误进入重试，基础设施错误触发无浏览器回退，
/// 熔断拒绝直接向上返回。
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// 浏览器二进制不存在或未配置
    #[error("浏览器不可用")]
    BrowserMissing,

    /// 浏览器启动失败
    #[error("浏览器启动失败: {0}")]
    BrowserLaunchFailed(String),

    /// 准入队列等待超时
    #[error("队列等待超时: 已等待{waited_ms}ms")]
    QueueTimeout {
        /// 实际等待毫秒数
        waited_ms: u64,
    },

    /// 主机熔断器处于打开状态
    #[error("主机{host}熔断中, {retry_after_ms}ms后重试")]
    CircuitOpen {
        /// 被熔断的主机
        host: String,
        /// 建议的重试等待毫秒数
        retry_after_ms: u64,
    },

    /// 页面导航失败
    #[error("导航失败: {0}")]
    Navigation(String),

    /// 网络请求失败
    #[error("网络错误: {0}")]
    Network(#[from] reqwest::Error),

    /// 上游返回错误状态码
    #[error("上游状态码: {0}")]
    UpstreamStatus(u16),

    /// 请求参数无效
    #[error("无效请求: {0}")]
    InvalidRequest(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ScrapeError {
    /// 判断错误是否为瞬态，值得重试
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Network(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err
                        .status()
                        .map(|s| s.as_u16() == 429 || s.is_server_error())
                        .unwrap_or(false)
            }
            ScrapeError::UpstreamStatus(code) => {
                *code == 429 || (500..=504).contains(code)
            }
            ScrapeError::Navigation(message) => retry_policy::is_transient_text(message),
            ScrapeError::Internal(message) => retry_policy::is_transient_text(message),
            _ => false,
        }
    }

    /// 判断错误是否源于浏览器基础设施本身
    ///
    /// 这类错误不重试，直接切换到无浏览器回退路径
    pub fn is_browser_infrastructure(&self) -> bool {
        matches!(
            self,
            ScrapeError::BrowserMissing | ScrapeError::BrowserLaunchFailed(_)
        )
    }
}

/// 抓取到的页面
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// 页面HTML
    pub html: String,
    /// 重定向后的最终URL
    pub final_url: String,
    /// base64编码的截图，仅浏览器路径且请求截图时存在
    pub screenshot: Option<String>,
    /// 是否经浏览器渲染
    pub used_browser: bool,
}
