//! 에러 타입 -- 도메인별 에러 정의

/// scangraph 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ScangraphError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스캐닝 플랫폼 API 에러
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// 동기화 실행 에러
    #[error("sync error: {0}")]
    Sync(#[from] SyncRunError),

    /// 그래프 싱크 에러
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// API 자격 증명 누락
    #[error("missing credentials: {field} must not be empty")]
    MissingCredentials { field: String },
}

/// API 호출 에러
///
/// HTTP 응답 상태가 있는 경우 `status`에 담기며, 메시지에는 항상 상태 코드가 포함됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 비정상 HTTP 응답
    #[error("{code}: {message}")]
    Request {
        code: String,
        status: u16,
        message: String,
    },

    /// 연결/전송 실패
    #[error("transport failed: {0}")]
    Transport(String),

    /// 응답 본문 디코딩 실패
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// 동기화 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum SyncRunError {
    /// export 작업이 ERROR/CANCELLED로 종료됨
    #[error("{kind} export {export_uuid} ended in state {state}")]
    ExportFailed {
        kind: String,
        export_uuid: String,
        state: String,
    },

    /// FINISHED이지만 실패/취소된 청크가 있음
    #[error("{kind} export {export_uuid} finished with {failed} failed and {cancelled} cancelled chunks")]
    IncompleteExport {
        kind: String,
        export_uuid: String,
        failed: usize,
        cancelled: usize,
    },

    /// 자격 증명 검증 실패
    #[error("authentication failed: {0}")]
    Authentication(String),
}

/// 그래프 싱크 에러
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// 동일한 `_key`가 이미 존재함
    #[error("duplicate graph key: {key}")]
    DuplicateKey { key: String },

    /// 싱크 기록 실패
    #[error("sink write failed: {0}")]
    Write(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_contains_status() {
        let err = ApiError::Request {
            code: "TENABLE_CLIENT_API_401_ERROR".to_owned(),
            status: 401,
            message: "Unauthorized: 401 GET /scans".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("TENABLE_CLIENT_API_401_ERROR"));
    }

    #[test]
    fn nested_errors_convert_into_top_level() {
        let err: ScangraphError = SinkError::DuplicateKey {
            key: "tenable_scan_1".to_owned(),
        }
        .into();
        assert!(matches!(err, ScangraphError::Sink(_)));
        assert!(err.to_string().contains("tenable_scan_1"));

        let err: ScangraphError = ConfigError::MissingCredentials {
            field: "tenable.access_key".to_owned(),
        }
        .into();
        assert!(err.to_string().starts_with("config error"));
    }

    #[test]
    fn export_failed_display() {
        let err = SyncRunError::ExportFailed {
            kind: "vulnerabilities".to_owned(),
            export_uuid: "e-1".to_owned(),
            state: "ERROR".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "vulnerabilities export e-1 ended in state ERROR"
        );
    }
}
