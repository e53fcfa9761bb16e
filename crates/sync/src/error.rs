//! 동기화 에러 타입
//!
//! [`SyncError`]는 동기화 한 번의 실행을 중단시키는 실패를 나타냅니다.
//! 엔드포인트별로 허용되는 실패(403 스캔 상세, 404 호스트 취약점)는
//! 클라이언트에서 이미 결과 값으로 바뀌어 여기까지 오지 않습니다.

use scangraph_core::error::{ConfigError, ScangraphError, SinkError, SyncRunError};
use scangraph_tenable::{ExportStatus, TenableError};

use crate::export::ExportKind;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// API 호출 실패 (재시도 소진 또는 재시도 불가)
    #[error("api error: {0}")]
    Client(#[from] TenableError),

    /// export 작업이 ERROR/CANCELLED로 종료됨
    #[error("{kind} export {export_uuid} ended in state {state}")]
    ExportFailed {
        kind: ExportKind,
        export_uuid: String,
        state: ExportStatus,
    },

    /// export가 FINISHED로 끝났지만 일부 청크가 실패/취소됨 (부분 캐시는 만들지 않음)
    #[error("{kind} export {export_uuid} finished with {failed} failed and {cancelled} cancelled chunks")]
    IncompleteExport {
        kind: ExportKind,
        export_uuid: String,
        failed: usize,
        cancelled: usize,
    },

    /// 자격 증명 검증 실패
    #[error("authentication failed: {source}")]
    Authentication {
        #[source]
        source: TenableError,
    },

    /// 그래프 싱크 기록 실패
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// 설정 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<SyncError> for ScangraphError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Client(e) => e.into(),
            SyncError::ExportFailed {
                kind,
                export_uuid,
                state,
            } => ScangraphError::Sync(SyncRunError::ExportFailed {
                kind: kind.to_string(),
                export_uuid,
                state: state.as_str().to_owned(),
            }),
            SyncError::IncompleteExport {
                kind,
                export_uuid,
                failed,
                cancelled,
            } => ScangraphError::Sync(SyncRunError::IncompleteExport {
                kind: kind.to_string(),
                export_uuid,
                failed,
                cancelled,
            }),
            SyncError::Authentication { source } => {
                ScangraphError::Sync(SyncRunError::Authentication(source.to_string()))
            }
            SyncError::Sink(e) => ScangraphError::Sink(e),
            SyncError::Config(e) => ScangraphError::Config(e),
        }
    }
}
