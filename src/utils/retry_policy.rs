// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::future::Future;
use std::time::Duration;

/// 重试策略配置
///
/// 有界指数退避加均匀抖动，由调用方提供的分类器决定错误是否瞬态
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 初始退避时间
    pub base_delay: Duration,
    /// 最大退避时间
    pub max_delay: Duration,
    /// 抖动比例 (0.0-1.0)，抖动取自 [0, ratio * 指数退避]
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(900),
            max_delay: Duration::from_millis(8000),
            jitter_ratio: 0.25,
        }
    }
}

impl RetryPolicy {
    /// 计算第attempt次失败后的退避时间
    ///
    /// # 参数
    ///
    /// * `attempt` - 已失败的尝试序号（从1开始）
    ///
    /// # 返回值
    ///
    /// 退避时间，含抖动
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponential =
            self.base_delay.as_secs_f64() * 2f64.powi(attempt.saturating_sub(1) as i32);
        let capped = exponential.min(self.max_delay.as_secs_f64());

        let jitter_range = capped * self.jitter_ratio;
        let jitter = if jitter_range > 0.0 {
            rand::random_range(0.0..jitter_range)
        } else {
            0.0
        };

        Duration::from_secs_f64(capped + jitter)
    }

    /// 在重试策略下执行操作
    ///
    /// 分类器返回false（非瞬态错误）时立即传播；最后一次尝试失败后无论分类如何均传播。
    ///
    /// # 参数
    ///
    /// * `op` - 每次尝试生成一个新future的闭包
    /// * `is_transient` - 瞬态错误分类器
    ///
    /// # 返回值
    ///
    /// * `Ok(T)` - 某次尝试成功的结果
    /// * `Err(E)` - 最终失败的错误
    pub async fn execute<T, E, F, Fut>(
        &self,
        mut op: F,
        is_transient: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= self.max_attempts || !is_transient(&e) {
                        return Err(e);
                    }
                    let backoff = self.calculate_backoff(attempt);
                    tracing::warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

/// 根据错误文本判断是否瞬态
///
/// 匹配超时、DNS/连接异常、通用网络失败及嵌入的429/5xx状态标记；
/// 下划线视同空格，以覆盖Chromium的net::ERR_*错误码
pub fn is_transient_text(message: &str) -> bool {
    let lower = message.to_lowercase().replace('_', " ");

    let transient_patterns = [
        "timeout",
        "timed out",
        "dns",
        "connection refused",
        "connection reset",
        "network",
        "unreachable",
        "broken pipe",
        "429",
        "500",
        "502",
        "503",
        "504",
    ];

    transient_patterns.iter().any(|&p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            jitter_ratio: 0.0,
        }
    }

    #[test]
    fn test_calculate_backoff_exponential() {
        let policy = RetryPolicy {
            jitter_ratio: 0.0,
            ..Default::default()
        };

        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(900));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(1800));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(3600));
    }

    #[test]
    fn test_calculate_backoff_max_limit() {
        let policy = RetryPolicy {
            jitter_ratio: 0.0,
            ..Default::default()
        };

        assert_eq!(policy.calculate_backoff(10), Duration::from_millis(8000));
    }

    #[test]
    fn test_calculate_backoff_jitter_bounds() {
        let policy = RetryPolicy::default();

        for _ in 0..20 {
            let backoff = policy.calculate_backoff(2);
            assert!(backoff >= Duration::from_millis(1800));
            assert!(backoff <= Duration::from_millis(1800 + 450));
        }
    }

    #[tokio::test]
    async fn test_non_transient_aborts_after_one_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = fast_policy()
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("invalid request".to_string()) }
                },
                |_| false,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_retried_max_attempts_times() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = fast_policy()
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("connection reset".to_string()) }
                },
                |e| is_transient_text(e),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = fast_policy()
            .execute(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err("timeout".to_string())
                        } else {
                            Ok(42)
                        }
                    }
                },
                |e| is_transient_text(e),
            )
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_is_transient_text() {
        assert!(is_transient_text("operation timed out"));
        assert!(is_transient_text("dns error: no such host"));
        assert!(is_transient_text("HTTP status 503 Service Unavailable"));
        assert!(is_transient_text("net::ERR_CONNECTION_RESET"));
        assert!(!is_transient_text("invalid selector"));
    }
}
