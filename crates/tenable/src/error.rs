//! API 클라이언트 에러 타입
//!
//! 모든 HTTP 실패는 전송 경계에서 한 번만 [`ErrorKind`]로 분류됩니다.
//! 상위 계층(재시도, 엔드포인트별 허용 규칙, 동기화 엔진)은 문자열 대신
//! 이 태그를 `match`로 소비합니다.
//!
//! `From<TenableError> for ScangraphError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.

use std::time::Duration;

use scangraph_core::error::{ApiError, ConfigError, ScangraphError};

/// HTTP 실패 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 403: 특정 엔드포인트(스캔 상세)에서는 건너뛰기 대상
    Forbidden,
    /// 404: 특정 엔드포인트(호스트 취약점, asset 취약점 정보)에서는 빈 결과
    NotFound,
    /// 429: `Retry-After`만큼 대기 후 재시도
    RateLimited,
    /// 500/504: 즉시 재시도, 최대 3회
    TransientServer,
    /// 그 외: 즉시 중단
    Fatal,
}

impl ErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500 | 504 => Self::TransientServer,
            _ => Self::Fatal,
        }
    }

    /// 재시도 정책이 다시 시도할 수 있는 분류인지 여부
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientServer)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::TransientServer => "transient_server",
            Self::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// API 클라이언트 에러
#[derive(Debug, thiserror::Error)]
pub enum TenableError {
    /// 비정상 HTTP 응답 (`code`는 `TENABLE_CLIENT_API_{status}_ERROR`)
    #[error("{code}: {message}")]
    Api {
        kind: ErrorKind,
        status: u16,
        code: String,
        message: String,
        /// 429 응답의 `Retry-After` 값
        retry_after: Option<Duration>,
    },

    /// 연결/전송 실패
    #[error("transport error: {method} {path}: {reason}")]
    Transport {
        method: String,
        path: String,
        reason: String,
    },

    /// 응답 본문 디코딩 실패
    #[error("failed to decode response from {path}: {reason}")]
    Decode { path: String, reason: String },

    /// 클라이언트 설정 에러
    #[error("client config error: {field}: {reason}")]
    Config { field: String, reason: String },
}

impl TenableError {
    /// HTTP 응답 상태로부터 에러를 생성합니다.
    ///
    /// 메시지 형식: `{reason}: {status} {method} {path}`
    pub fn from_response(
        status: u16,
        reason: &str,
        method: &str,
        path: &str,
        retry_after: Option<Duration>,
    ) -> Self {
        Self::Api {
            kind: ErrorKind::from_status(status),
            status,
            code: format!("TENABLE_CLIENT_API_{status}_ERROR"),
            message: format!("{reason}: {status} {method} {path}"),
            retry_after,
        }
    }

    /// 에러 분류. HTTP 응답이 아닌 실패는 모두 `Fatal`입니다.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { kind, .. } => *kind,
            Self::Transport { .. } | Self::Decode { .. } | Self::Config { .. } => ErrorKind::Fatal,
        }
    }

    /// HTTP 상태 코드 (응답이 있는 경우)
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<TenableError> for ScangraphError {
    fn from(err: TenableError) -> Self {
        match err {
            TenableError::Api {
                status,
                code,
                message,
                ..
            } => ScangraphError::Api(ApiError::Request {
                code,
                status,
                message,
            }),
            TenableError::Transport {
                method,
                path,
                reason,
            } => ScangraphError::Api(ApiError::Transport(format!("{method} {path}: {reason}"))),
            TenableError::Decode { path, reason } => {
                ScangraphError::Api(ApiError::Decode(format!("{path}: {reason}")))
            }
            TenableError::Config { field, reason } => {
                ScangraphError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
