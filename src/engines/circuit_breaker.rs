// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::ScrapeError;
use metrics::{counter, gauge};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// 熔断器配置
#[derive(Clone, Debug)]
pub struct BreakerConfig {
    /// 连续失败阈值
    pub failure_threshold: u32,
    /// 打开状态持续时间
    pub open_duration: Duration,
    /// 空闲条目存活时间，不低于打开时长
    pub entry_ttl: Duration,
    /// 半开探测许可的有效期，超时未回报则视为放弃
    pub probe_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 4,
            open_duration: Duration::from_secs(120),
            entry_ttl: Duration::from_secs(30 * 60),
            probe_timeout: Duration::from_secs(60),
        }
    }
}

impl BreakerConfig {
    /// 生效的条目TTL：打开时长与配置TTL的较大者
    fn effective_ttl(&self) -> Duration {
        self.entry_ttl.max(self.open_duration)
    }
}

/// 单主机的熔断状态
///
/// 条目在首次失败时创建，成功后整体删除；健康主机不占用内存。
#[derive(Clone, Debug)]
struct HostState {
    /// 连续失败计数
    consecutive_failures: u32,
    /// 打开时刻，None表示关闭
    opened_at: Option<Instant>,
    /// 半开探测的放行时刻，超过有效期的认领作废
    probe_claimed_at: Option<Instant>,
    /// 最近一次活动时刻，供TTL清理
    last_touch: Instant,
}

impl HostState {
    fn new() -> Self {
        Self {
            consecutive_failures: 0,
            opened_at: None,
            probe_claimed_at: None,
            last_touch: Instant::now(),
        }
    }
}

/// 主机级熔断器
///
/// 按目标主机维护连续失败计数。达到阈值后打开，打开期间
/// 对该主机的请求立即拒绝并携带剩余等待时间。打开时长过后
/// 放行单个探测请求，探测成功则完全恢复，失败则重新打开。
#[derive(Clone)]
pub struct HostCircuitBreaker {
    states: Arc<RwLock<HashMap<String, HostState>>>,
    config: BreakerConfig,
}

impl Default for HostCircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

impl HostCircuitBreaker {
    /// 创建新的熔断器实例
    ///
    /// # 参数
    ///
    /// * `config` - 熔断配置
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// 请求前检查
    ///
    /// # 参数
    ///
    /// * `host` - 目标主机
    ///
    /// # 返回值
    ///
    /// 允许请求时返回Ok；熔断中返回CircuitOpen，携带剩余等待毫秒数
    ///
    /// 对未跟踪的主机只读放行，不创建条目；被拒绝的请求
    /// 不刷新last_touch，避免高频重试让条目永不过期。
    pub fn before_request(&self, host: &str) -> Result<(), ScrapeError> {
        let mut states = self.states.write().unwrap();
        let Some(state) = states.get_mut(host) else {
            return Ok(());
        };

        let Some(opened_at) = state.opened_at else {
            state.last_touch = Instant::now();
            return Ok(());
        };

        let elapsed = opened_at.elapsed();
        if elapsed < self.config.open_duration {
            let retry_after = self.config.open_duration - elapsed;
            counter!("breaker_rejected_total", "host" => host.to_string()).increment(1);
            return Err(ScrapeError::CircuitOpen {
                host: host.to_string(),
                retry_after_ms: retry_after.as_millis() as u64,
            });
        }

        // Open duration elapsed: exactly one probe goes through. A claim
        // whose holder never reported back lapses after probe_timeout.
        if let Some(claimed_at) = state.probe_claimed_at {
            if claimed_at.elapsed() < self.config.probe_timeout {
                counter!("breaker_rejected_total", "host" => host.to_string()).increment(1);
                return Err(ScrapeError::CircuitOpen {
                    host: host.to_string(),
                    retry_after_ms: 1000,
                });
            }
            tracing::debug!(host, "stale probe claim expired, admitting new probe");
        }

        state.probe_claimed_at = Some(Instant::now());
        state.last_touch = Instant::now();
        gauge!("breaker_status", "host" => host.to_string()).set(0.5);
        tracing::debug!(host, "circuit breaker half-open, probe admitted");
        Ok(())
    }

    /// 记录请求成功
    ///
    /// 单次成功即完全恢复，主机条目整体删除
    pub fn record_success(&self, host: &str) {
        let mut states = self.states.write().unwrap();
        if let Some(state) = states.remove(host) {
            if state.opened_at.is_some() {
                tracing::info!(host, "circuit breaker closed after successful probe");
                gauge!("breaker_status", "host" => host.to_string()).set(0.0);
            }
        }
    }

    /// 记录请求失败
    pub fn record_failure(&self, host: &str) {
        let mut states = self.states.write().unwrap();
        let state = states
            .entry(host.to_string())
            .or_insert_with(HostState::new);
        state.last_touch = Instant::now();
        counter!("breaker_failures_total", "host" => host.to_string()).increment(1);

        if state.probe_claimed_at.take().is_some() {
            // Probe failure restarts the full open window
            state.opened_at = Some(Instant::now());
            tracing::warn!(host, "circuit breaker probe failed, reopening");
            gauge!("breaker_status", "host" => host.to_string()).set(1.0);
            return;
        }

        state.consecutive_failures += 1;
        if state.opened_at.is_none()
            && state.consecutive_failures >= self.config.failure_threshold
        {
            state.opened_at = Some(Instant::now());
            tracing::warn!(
                host,
                failures = state.consecutive_failures,
                "circuit breaker opened"
            );
            gauge!("breaker_status", "host" => host.to_string()).set(1.0);
        }
    }

    /// 清理空闲超过TTL的主机条目
    ///
    /// # 返回值
    ///
    /// 被移除的条目数
    pub fn sweep(&self) -> usize {
        let ttl = self.config.effective_ttl();
        let mut states = self.states.write().unwrap();
        let before = states.len();
        states.retain(|_, state| state.last_touch.elapsed() < ttl);
        before - states.len()
    }

    /// 当前跟踪的主机数
    pub fn tracked_hosts(&self) -> usize {
        self.states.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(open_ms: u64) -> HostCircuitBreaker {
        breaker_with_probe_timeout(open_ms, 60_000)
    }

    fn breaker_with_probe_timeout(open_ms: u64, probe_ms: u64) -> HostCircuitBreaker {
        HostCircuitBreaker::new(BreakerConfig {
            failure_threshold: 4,
            open_duration: Duration::from_millis(open_ms),
            entry_ttl: Duration::from_millis(open_ms),
            probe_timeout: Duration::from_millis(probe_ms),
        })
    }

    #[test]
    fn test_opens_after_threshold() {
        let breaker = breaker(120_000);
        for _ in 0..3 {
            breaker.record_failure("a.com");
            assert!(breaker.before_request("a.com").is_ok());
        }
        breaker.record_failure("a.com");
        let err = breaker.before_request("a.com").unwrap_err();
        match err {
            ScrapeError::CircuitOpen { host, retry_after_ms } => {
                assert_eq!(host, "a.com");
                assert!(retry_after_ms > 0 && retry_after_ms <= 120_000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hosts_are_independent() {
        let breaker = breaker(120_000);
        for _ in 0..4 {
            breaker.record_failure("a.com");
        }
        assert!(breaker.before_request("a.com").is_err());
        assert!(breaker.before_request("b.com").is_ok());
    }

    #[test]
    fn test_success_deletes_entry() {
        let breaker = breaker(120_000);
        for _ in 0..3 {
            breaker.record_failure("a.com");
        }
        breaker.record_success("a.com");
        assert_eq!(breaker.tracked_hosts(), 0);
        for _ in 0..3 {
            breaker.record_failure("a.com");
        }
        assert!(breaker.before_request("a.com").is_ok());
    }

    #[test]
    fn test_clean_hosts_are_not_tracked() {
        let breaker = breaker(120_000);
        assert!(breaker.before_request("clean.com").is_ok());
        assert_eq!(breaker.tracked_hosts(), 0);
    }

    #[test]
    fn test_single_probe_after_open_duration() {
        let breaker = breaker(0);
        for _ in 0..4 {
            breaker.record_failure("a.com");
        }
        // Zero open duration: first caller becomes the probe
        assert!(breaker.before_request("a.com").is_ok());
        // Second caller is rejected while the probe is in flight
        assert!(breaker.before_request("a.com").is_err());
        // Probe success fully rehabilitates the host
        breaker.record_success("a.com");
        assert!(breaker.before_request("a.com").is_ok());
    }

    #[test]
    fn test_probe_failure_reopens() {
        let breaker = breaker(0);
        for _ in 0..4 {
            breaker.record_failure("a.com");
        }
        assert!(breaker.before_request("a.com").is_ok());
        breaker.record_failure("a.com");
        // Reopened with a fresh window; zero duration admits a new probe
        assert!(breaker.before_request("a.com").is_ok());
        assert!(breaker.before_request("a.com").is_err());
    }

    #[test]
    fn test_abandoned_probe_claim_expires() {
        let breaker = breaker_with_probe_timeout(0, 2);
        for _ in 0..4 {
            breaker.record_failure("a.com");
        }
        // Probe admitted but its holder never reports back
        assert!(breaker.before_request("a.com").is_ok());
        std::thread::sleep(Duration::from_millis(5));
        // The stale claim lapses and a new probe is admitted
        assert!(breaker.before_request("a.com").is_ok());
    }

    #[test]
    fn test_rejected_requests_do_not_keep_entry_alive() {
        let breaker = breaker(50);
        for _ in 0..4 {
            breaker.record_failure("a.com");
        }
        std::thread::sleep(Duration::from_millis(30));
        assert!(breaker.before_request("a.com").is_err());
        std::thread::sleep(Duration::from_millis(25));
        // last_touch dates from the final failure, not the rejected call
        assert_eq!(breaker.sweep(), 1);
    }

    #[test]
    fn test_sweep_removes_idle_entries() {
        let breaker = breaker(0);
        breaker.record_failure("a.com");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(breaker.sweep(), 1);
        assert_eq!(breaker.tracked_hosts(), 0);
    }
}
