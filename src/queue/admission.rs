// Copyright (c) 2025 Harvestrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::ScrapeError;
use metrics::{counter, gauge};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// 准入队列
///
/// 限制同时执行的抓取任务数。等待者按到达顺序获得许可
/// （tokio信号量的公平性保证），超过最大等待时间的请求
/// 被拒绝且不会再被执行。
#[derive(Clone)]
pub struct AdmissionQueue {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    max_wait: Duration,
}

impl AdmissionQueue {
    /// 创建新的准入队列
    ///
    /// # 参数
    ///
    /// * `max_concurrent` - 最大并发任务数
    /// * `max_wait` - 许可的最大等待时间，0表示满载即拒绝
    pub fn new(max_concurrent: usize, max_wait: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            max_wait,
        }
    }

    /// 在许可保护下执行任务
    ///
    /// # 参数
    ///
    /// * `task` - 待执行的异步任务
    ///
    /// # 返回值
    ///
    /// 任务结果；等待超时返回QueueTimeout，任务不会被执行
    pub async fn run<T, F>(&self, task: F) -> Result<T, ScrapeError>
    where
        F: Future<Output = T>,
    {
        let started = Instant::now();
        gauge!("admission_queue_waiting").increment(1.0);

        let acquired = if self.max_wait.is_zero() {
            self.semaphore.try_acquire().map_err(|_| ())
        } else {
            match tokio::time::timeout(self.max_wait, self.semaphore.acquire()).await {
                Ok(Ok(permit)) => Ok(permit),
                _ => Err(()),
            }
        };
        gauge!("admission_queue_waiting").decrement(1.0);

        let _permit = match acquired {
            Ok(permit) => permit,
            Err(()) => {
                counter!("admission_queue_timeouts_total").increment(1);
                return Err(ScrapeError::QueueTimeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
        };

        counter!("admission_queue_admitted_total").increment(1);
        Ok(task.await)
    }

    /// 当前可用许可数
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 配置的最大并发数
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
