// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 重试策略配置
///
/// 指数退避：第 n 次失败后等待 `min(initial_backoff * 2^(n-1), max_backoff)`。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数（含第一次）
    pub max_attempts: u32,
    /// 初始退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// 计算第 `attempt` 次失败后的退避时间（attempt 从1开始）
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .initial_backoff
            .saturating_mul(1u32 << (attempt.saturating_sub(1)).min(16));
        exp.min(self.max_backoff)
    }
}

/// 带重试地执行一个异步操作
///
/// 只有 `is_transient` 判定为瞬态的错误才会触发重试；
/// 其余错误立即返回。耗尽尝试次数后返回最后一次的错误。
///
/// # 参数
///
/// * `policy` - 重试策略
/// * `is_transient` - 错误是否值得重试
/// * `operation` - 每次尝试都会重新调用的操作
pub async fn with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_transient: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt: u32 = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_transient(&e) => {
                let backoff = policy.backoff(attempt);
                warn!(
                    attempt = attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Transient failure, retrying: {}",
                    e
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
