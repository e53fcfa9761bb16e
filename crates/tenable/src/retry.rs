//! 요청 재시도 정책
//!
//! - 429: `Retry-After`(초) 만큼, 헤더가 없으면 기본 대기 시간만큼 쉰 뒤 재시도
//! - 500/504: 즉시 재시도, 첫 시도 포함 최대 3회 (전체 예산보다 작을 때)
//! - 그 외: 즉시 실패
//!
//! 전체 시도 횟수는 `max_attempts`를 넘지 않습니다.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use scangraph_core::metrics as m;
use tracing::info;

use crate::error::{ErrorKind, TenableError};

/// 500/504 응답에 허용되는 최대 시도 횟수 (첫 시도 포함)
pub const TRANSIENT_MAX_ATTEMPTS: u32 = 3;

/// 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 첫 시도를 포함한 최대 시도 횟수
    pub max_attempts: u32,
    /// 429 응답에 `Retry-After`가 없을 때 대기 시간
    pub rate_limit_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            rate_limit_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, rate_limit_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            rate_limit_delay,
        }
    }

    /// 작업을 정책에 따라 실행합니다.
    ///
    /// `label`은 로그에만 사용됩니다 (보통 요청 경로).
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, TenableError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TenableError>>,
    {
        let mut state = RetryState::new(*self);
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let Some(delay) = state.on_error(&err) else {
                return Err(err);
            };

            counter!(m::API_RETRIES_TOTAL, m::LABEL_REASON => err.kind().to_string())
                .increment(1);
            info!(
                path = label,
                error = %err,
                attempt = state.attempt,
                attempts_remaining = state.remaining(),
                retry_delay_ms = delay.as_millis() as u64,
                "encountered retryable API response, retrying"
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// 한 요청의 재시도 진행 상태
///
/// 500/504를 한 번이라도 받으면 이후 전체 한도가 [`TRANSIENT_MAX_ATTEMPTS`]로 줄어듭니다.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    /// 지금까지 실패한 시도 수
    attempt: u32,
    limit: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            limit: policy.max_attempts.max(1),
        }
    }

    /// 실패를 기록하고, 재시도해야 하면 대기 시간을 반환합니다.
    pub fn on_error(&mut self, err: &TenableError) -> Option<Duration> {
        self.attempt += 1;
        let delay = match err.kind() {
            ErrorKind::RateLimited => err.retry_after().unwrap_or(self.policy.rate_limit_delay),
            ErrorKind::TransientServer => {
                self.limit = self.limit.min(TRANSIENT_MAX_ATTEMPTS);
                Duration::ZERO
            }
            ErrorKind::Forbidden | ErrorKind::NotFound | ErrorKind::Fatal => return None,
        };
        if self.attempt >= self.limit {
            return None;
        }
        Some(delay)
    }

    /// 남은 시도 횟수
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.attempt)
    }
}
