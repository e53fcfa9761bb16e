//! # scangraph-tenable
//!
//! 스캐닝 플랫폼(Tenable.io) REST API 클라이언트입니다.
//!
//! - [`TenableApi`]: 동기화 엔진이 의존하는 API trait
//! - [`HttpTenableClient`]: reqwest 기반 구현 (인증 헤더, 재시도, 에러 분류)
//! - [`RetryPolicy`]: 429/500/504 재시도 규칙
//! - [`ErrorKind`]: 전송 경계에서 한 번 분류된 에러 태그
//!
//! # 사용 예시
//!
//! ```no_run
//! # async fn example() -> Result<(), scangraph_tenable::TenableError> {
//! use scangraph_tenable::{HttpTenableClient, TenableApi, TenableClientConfigBuilder};
//!
//! let config = TenableClientConfigBuilder::new()
//!     .credentials("access", "secret")
//!     .build()?;
//! let client = HttpTenableClient::new(config)?;
//! let scans = client.fetch_scans().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::{HttpTenableClient, TenableApi, TenableClientConfig, TenableClientConfigBuilder};
pub use error::{ErrorKind, TenableError};
pub use retry::{RetryPolicy, TRANSIENT_MAX_ATTEMPTS};
pub use types::{
    AssetExport, AssetVulnerabilityInfo, Container, ContainerReport, ExportAssetsOptions,
    ExportStartResponse, ExportStatus, ExportStatusResponse, ExportVulnerabilitiesFilters,
    ExportVulnerabilitiesOptions, ScanDetail, ScanDetailOutcome, ScanHost, ScanHostVulnerability,
    ScanStatus, ScanSummary, ScanVulnerabilitySummary, SessionInfo, User, VulnerabilityExport,
    VulnerabilityState,
};
