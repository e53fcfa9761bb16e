//! Export 캐시 빌더 -- 비동기 bulk export 작업을 끝까지 구동합니다.
//!
//! # 프로토콜
//!
//! 1. POST 시작 → export UUID
//! 2. `FINISHED`/`ERROR`/`CANCELLED`가 될 때까지 상태 폴링
//! 3. `chunks_available`의 각 청크를 순서대로 조회하여 캐시에 색인
//!
//! 폴링 간격은 `[100ms, 60s]` 범위로 고정되며 이 계층에는 전체 타임아웃이 없습니다.
//! 청크 하나라도 실패하면 캐시 전체가 실패합니다 (부분 캐시를 반환하지 않음).

use std::fmt;
use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, info, warn};

use scangraph_core::config::{ExportConfig, MAX_POLL_INTERVAL_MS, MIN_POLL_INTERVAL_MS};
use scangraph_core::metrics as m;
use scangraph_tenable::{
    ExportAssetsOptions, ExportStatus, ExportStatusResponse, ExportVulnerabilitiesFilters,
    ExportVulnerabilitiesOptions, TenableApi, TenableError, VulnerabilityState,
};

use crate::error::SyncError;
use crate::index::{AssetExportCache, VulnerabilityExportCache};

/// 폴링 간격 하한
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(MIN_POLL_INTERVAL_MS);
/// 폴링 간격 상한
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(MAX_POLL_INTERVAL_MS);

/// export 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Assets,
    Vulnerabilities,
}

impl ExportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Vulnerabilities => "vulnerabilities",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// export 요청 (종류 + 옵션)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportRequest {
    Assets(ExportAssetsOptions),
    Vulnerabilities(ExportVulnerabilitiesOptions),
}

impl ExportRequest {
    pub fn kind(&self) -> ExportKind {
        match self {
            Self::Assets(_) => ExportKind::Assets,
            Self::Vulnerabilities(_) => ExportKind::Vulnerabilities,
        }
    }
}

/// 완성된 export 캐시
#[derive(Debug)]
pub enum ExportCache {
    Assets(AssetExportCache),
    Vulnerabilities(VulnerabilityExportCache),
}

impl ExportCache {
    pub fn kind(&self) -> ExportKind {
        match self {
            Self::Assets(_) => ExportKind::Assets,
            Self::Vulnerabilities(_) => ExportKind::Vulnerabilities,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Assets(cache) => cache.len(),
            Self::Vulnerabilities(cache) => cache.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 설정의 `[export]` 섹션에서 asset export 옵션을 만듭니다.
pub fn asset_options_from_core(config: &ExportConfig) -> ExportAssetsOptions {
    ExportAssetsOptions {
        chunk_size: config.asset_chunk_size,
    }
}

/// 설정의 `[export]` 섹션에서 취약점 export 옵션을 만듭니다.
///
/// 알 수 없는 상태 문자열은 설정 검증에서 이미 걸러지므로 여기서는 건너뜁니다.
pub fn vulnerability_options_from_core(config: &ExportConfig) -> ExportVulnerabilitiesOptions {
    ExportVulnerabilitiesOptions {
        num_assets: config.vuln_num_assets,
        filters: ExportVulnerabilitiesFilters {
            first_found: Some(config.vuln_first_found),
            state: config
                .vuln_states
                .iter()
                .filter_map(|s| VulnerabilityState::from_str_loose(s))
                .collect(),
        },
    }
}

/// 폴링 간격을 허용 범위로 고정합니다.
pub fn clamp_poll_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
}

/// export 캐시 빌더
///
/// API 클라이언트를 빌려 쓰며, 캐시 하나를 만들 때마다 export 작업 하나를 구동합니다.
pub struct ExportCacheBuilder<'a, A: TenableApi> {
    api: &'a A,
    poll_interval: Duration,
}

impl<'a, A: TenableApi> ExportCacheBuilder<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            poll_interval: Duration::from_secs(1),
        }
    }

    /// 폴링 간격을 설정합니다. `[100ms, 60s]` 범위로 고정됩니다.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = clamp_poll_interval(interval);
        self
    }

    pub fn current_poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// 요청 종류에 맞는 캐시를 만듭니다.
    pub async fn build_export_cache(&self, request: &ExportRequest) -> Result<ExportCache, SyncError> {
        match request {
            ExportRequest::Assets(options) => {
                self.build_asset_cache(options).await.map(ExportCache::Assets)
            }
            ExportRequest::Vulnerabilities(options) => self
                .build_vulnerability_cache(options)
                .await
                .map(ExportCache::Vulnerabilities),
        }
    }

    pub async fn build_asset_cache(
        &self,
        options: &ExportAssetsOptions,
    ) -> Result<AssetExportCache, SyncError> {
        let kind = ExportKind::Assets;
        let started = self.api.export_assets(options).await?;
        let export_uuid = started.export_uuid;
        info!(%kind, %export_uuid, chunk_size = options.chunk_size, "export started");

        let status = self
            .wait_for_export(kind, &export_uuid, || {
                self.api.fetch_assets_export_status(&export_uuid)
            })
            .await?;

        let mut cache = AssetExportCache::new();
        for &chunk_id in &status.chunks_available {
            let records = self
                .api
                .fetch_assets_export_chunk(&export_uuid, chunk_id)
                .await?;
            debug!(%kind, %export_uuid, chunk_id, records = records.len(), "chunk fetched");
            counter!(m::EXPORT_CHUNKS_FETCHED_TOTAL, m::LABEL_EXPORT_KIND => kind.as_str())
                .increment(1);
            for asset in records {
                cache.insert(asset);
            }
        }

        report_cache(kind, &export_uuid, cache.len(), cache.duplicate_keys());
        Ok(cache)
    }

    pub async fn build_vulnerability_cache(
        &self,
        options: &ExportVulnerabilitiesOptions,
    ) -> Result<VulnerabilityExportCache, SyncError> {
        let kind = ExportKind::Vulnerabilities;
        let started = self.api.export_vulnerabilities(options).await?;
        let export_uuid = started.export_uuid;
        info!(%kind, %export_uuid, num_assets = options.num_assets, "export started");

        let status = self
            .wait_for_export(kind, &export_uuid, || {
                self.api.fetch_vulnerabilities_export_status(&export_uuid)
            })
            .await?;

        let mut cache = VulnerabilityExportCache::new();
        for &chunk_id in &status.chunks_available {
            let records = self
                .api
                .fetch_vulnerabilities_export_chunk(&export_uuid, chunk_id)
                .await?;
            debug!(%kind, %export_uuid, chunk_id, records = records.len(), "chunk fetched");
            counter!(m::EXPORT_CHUNKS_FETCHED_TOTAL, m::LABEL_EXPORT_KIND => kind.as_str())
                .increment(1);
            for vulnerability in records {
                cache.insert(vulnerability);
            }
        }

        report_cache(kind, &export_uuid, cache.len(), cache.duplicate_keys());
        Ok(cache)
    }

    /// 상태가 종료 상태가 될 때까지 폴링합니다.
    ///
    /// 첫 조회는 즉시 수행하고, 이후 조회 사이에는 항상 폴링 간격만큼 대기합니다.
    async fn wait_for_export<F, Fut>(
        &self,
        kind: ExportKind,
        export_uuid: &str,
        mut fetch_status: F,
    ) -> Result<ExportStatusResponse, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ExportStatusResponse, TenableError>>,
    {
        let mut polls: u32 = 0;
        loop {
            let status = fetch_status().await?;
            polls += 1;
            counter!(m::EXPORT_POLLS_TOTAL, m::LABEL_EXPORT_KIND => kind.as_str()).increment(1);

            match status.status {
                ExportStatus::Finished => {
                    if !status.chunks_failed.is_empty() || !status.chunks_cancelled.is_empty() {
                        warn!(
                            %kind,
                            export_uuid,
                            chunks_failed = ?status.chunks_failed,
                            chunks_cancelled = ?status.chunks_cancelled,
                            "export finished with missing chunks"
                        );
                        return Err(SyncError::IncompleteExport {
                            kind,
                            export_uuid: export_uuid.to_owned(),
                            failed: status.chunks_failed.len(),
                            cancelled: status.chunks_cancelled.len(),
                        });
                    }
                    info!(
                        %kind,
                        export_uuid,
                        polls,
                        chunks = status.chunks_available.len(),
                        "export finished"
                    );
                    return Ok(status);
                }
                ExportStatus::Error | ExportStatus::Cancelled => {
                    warn!(%kind, export_uuid, state = %status.status, "export did not finish");
                    return Err(SyncError::ExportFailed {
                        kind,
                        export_uuid: export_uuid.to_owned(),
                        state: status.status,
                    });
                }
                ExportStatus::Queued | ExportStatus::Processing | ExportStatus::Unknown => {
                    debug!(
                        %kind,
                        export_uuid,
                        state = %status.status,
                        chunks = status.chunks_available.len(),
                        "export in progress"
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

fn report_cache(kind: ExportKind, export_uuid: &str, records: usize, duplicates: usize) {
    if duplicates > 0 {
        warn!(
            %kind,
            export_uuid,
            duplicates,
            "export contained duplicate keys, later records replaced earlier ones"
        );
    }
    info!(%kind, export_uuid, records, "export cache built");
}
