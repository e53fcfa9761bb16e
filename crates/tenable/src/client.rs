//! API 클라이언트 -- [`TenableApi`] trait과 reqwest 기반 구현
//!
//! 동기화 엔진은 [`TenableApi`]에만 의존하므로 테스트에서는 mock으로 교체할 수 있습니다.
//!
//! ```text
//! ┌────────────┐     ┌─────────────┐     ┌──────────────────┐
//! │ SyncEngine │ ──▶ │ TenableApi  │ ◀── │ HttpTenableClient│
//! └────────────┘     │  (trait)    │     │  + RetryPolicy   │
//!                    └─────────────┘     └──────────────────┘
//! ```
//!
//! 엔드포인트별 허용 규칙은 구현 안에서 처리됩니다.
//! - 스캔 상세 403 → [`ScanDetailOutcome::Forbidden`]
//! - 호스트 취약점 404 → 빈 목록
//! - asset 취약점 정보 404, 재시도 소진된 500 → `None`

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER,
};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use scangraph_core::config::{DEFAULT_BASE_URL, TenableConfig};
use scangraph_core::metrics as m;

use crate::error::{ErrorKind, TenableError};
use crate::retry::RetryPolicy;
use crate::types::{
    AssetExport, AssetVulnerabilityInfo, AssetVulnerabilityResponse, Container, ContainerReport,
    ExportAssetsOptions, ExportStartResponse, ExportStatusResponse, ExportVulnerabilitiesOptions,
    ScanDetail, ScanDetailOutcome, ScanHostVulnerabilitiesResponse, ScanHostVulnerability,
    ScanSummary, ScansResponse, SessionInfo, User, UsersResponse, VulnerabilityExport,
};

/// 스캐닝 플랫폼 API 추상화
///
/// 모든 메서드는 `Send` future를 반환하여 tokio 멀티스레드 런타임에서 사용할 수 있습니다.
pub trait TenableApi: Send + Sync + 'static {
    /// 현재 자격 증명의 세션 권한 조회 (`/session`)
    fn fetch_user_permissions(
        &self,
    ) -> impl Future<Output = Result<SessionInfo, TenableError>> + Send;

    fn fetch_users(&self) -> impl Future<Output = Result<Vec<User>, TenableError>> + Send;

    fn fetch_scans(&self) -> impl Future<Output = Result<Vec<ScanSummary>, TenableError>> + Send;

    /// 스캔 상세 조회. 403은 `Forbidden`으로 반환됩니다.
    fn fetch_scan_detail(
        &self,
        scan_id: u64,
    ) -> impl Future<Output = Result<ScanDetailOutcome, TenableError>> + Send;

    /// 호스트별 취약점 조회. 404는 빈 목록으로 반환됩니다.
    fn fetch_scan_host_vulnerabilities(
        &self,
        scan_id: u64,
        host_id: u64,
    ) -> impl Future<Output = Result<Vec<ScanHostVulnerability>, TenableError>> + Send;

    /// asset 단위 취약점 상세 조회. 404와 소진된 500은 `None`입니다.
    fn fetch_asset_vulnerability_info(
        &self,
        asset_uuid: &str,
        plugin_id: u64,
    ) -> impl Future<Output = Result<Option<AssetVulnerabilityInfo>, TenableError>> + Send;

    fn export_assets(
        &self,
        options: &ExportAssetsOptions,
    ) -> impl Future<Output = Result<ExportStartResponse, TenableError>> + Send;

    fn fetch_assets_export_status(
        &self,
        export_uuid: &str,
    ) -> impl Future<Output = Result<ExportStatusResponse, TenableError>> + Send;

    fn fetch_assets_export_chunk(
        &self,
        export_uuid: &str,
        chunk_id: u64,
    ) -> impl Future<Output = Result<Vec<AssetExport>, TenableError>> + Send;

    fn export_vulnerabilities(
        &self,
        options: &ExportVulnerabilitiesOptions,
    ) -> impl Future<Output = Result<ExportStartResponse, TenableError>> + Send;

    fn fetch_vulnerabilities_export_status(
        &self,
        export_uuid: &str,
    ) -> impl Future<Output = Result<ExportStatusResponse, TenableError>> + Send;

    fn fetch_vulnerabilities_export_chunk(
        &self,
        export_uuid: &str,
        chunk_id: u64,
    ) -> impl Future<Output = Result<Vec<VulnerabilityExport>, TenableError>> + Send;

    fn fetch_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<Container>, TenableError>> + Send;

    fn fetch_report_by_image_digest(
        &self,
        digest: &str,
    ) -> impl Future<Output = Result<ContainerReport, TenableError>> + Send;
}

// =============================================================================
// 클라이언트 설정
// =============================================================================

/// HTTP 클라이언트 설정
///
/// 생성 후 변경되지 않으며, 클라이언트 생성자에 값으로 전달됩니다.
#[derive(Clone)]
pub struct TenableClientConfig {
    pub access_key: String,
    pub secret_key: String,
    /// API 호스트 (끝의 `/` 없이)
    pub base_url: String,
    /// 첫 시도를 포함한 최대 시도 횟수
    pub retry_max_attempts: u32,
    pub request_timeout: Duration,
    /// 429 응답에 `Retry-After`가 없을 때 대기 시간
    pub rate_limit_delay: Duration,
}

// 자격 증명이 로그에 찍히지 않도록 Debug를 직접 구현
impl std::fmt::Debug for TenableClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenableClientConfig")
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("request_timeout", &self.request_timeout)
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish()
    }
}

impl Default for TenableClientConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            retry_max_attempts: 10,
            request_timeout: Duration::from_secs(60),
            rate_limit_delay: Duration::from_secs(1),
        }
    }
}

impl TenableClientConfig {
    /// core의 `TenableConfig`에서 클라이언트 설정을 생성합니다.
    pub fn from_core(core: &TenableConfig) -> Self {
        Self {
            access_key: core.access_key.clone(),
            secret_key: core.secret_key.clone(),
            base_url: core.base_url.trim_end_matches('/').to_owned(),
            retry_max_attempts: core.retry_max_attempts,
            request_timeout: Duration::from_secs(core.request_timeout_secs),
            rate_limit_delay: Duration::from_millis(core.rate_limit_delay_ms),
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// 자격 증명이 비어 있으면 네트워크 호출 전에 실패합니다.
    pub fn validate(&self) -> Result<(), TenableError> {
        if self.access_key.trim().is_empty() {
            return Err(TenableError::Config {
                field: "access_key".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.secret_key.trim().is_empty() {
            return Err(TenableError::Config {
                field: "secret_key".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(TenableError::Config {
                field: "base_url".to_owned(),
                reason: format!("'{}' is not an http(s) url", self.base_url),
            });
        }
        if self.retry_max_attempts == 0 {
            return Err(TenableError::Config {
                field: "retry_max_attempts".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts, self.rate_limit_delay)
    }
}

/// [`TenableClientConfig`] 빌더
#[derive(Debug, Default)]
pub struct TenableClientConfigBuilder {
    config: TenableClientConfig,
}

impl TenableClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credentials(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.config.access_key = access_key.into();
        self.config.secret_key = secret_key.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn retry_max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry_max_attempts = attempts;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn rate_limit_delay(mut self, delay: Duration) -> Self {
        self.config.rate_limit_delay = delay;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<TenableClientConfig, TenableError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// HTTP 구현
// =============================================================================

/// 자격 증명 헤더 (`accessKey=...; secretKey=...;`)
const API_KEYS_HEADER: &str = "x-apikeys";

/// reqwest 기반 API 클라이언트
pub struct HttpTenableClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpTenableClient {
    /// 클라이언트를 생성합니다.
    ///
    /// 자격 증명이 비어 있으면 `TenableError::Config`를 반환합니다.
    pub fn new(config: TenableClientConfig) -> Result<Self, TenableError> {
        config.validate()?;

        let api_keys = format!(
            "accessKey={}; secretKey={};",
            config.access_key, config.secret_key
        );
        let mut api_keys = HeaderValue::from_str(&api_keys).map_err(|e| TenableError::Config {
            field: "access_key".to_owned(),
            reason: format!("credentials are not a valid header value: {e}"),
        })?;
        api_keys.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(HeaderName::from_static(API_KEYS_HEADER), api_keys);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TenableError::Config {
                field: "http_client".to_owned(),
                reason: e.to_string(),
            })?;

        info!(base_url = %config.base_url, "tenable client initialized");

        Ok(Self {
            http,
            retry: config.retry_policy(),
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TenableError> {
        self.retry
            .run(path, || self.send_once::<T, ()>(Method::GET, path, None))
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TenableError> {
        self.retry
            .run(path, || self.send_once(Method::POST, path, Some(body)))
            .await
    }

    /// 요청 1회를 보내고 응답을 분류합니다. 재시도는 호출자가 담당합니다.
    async fn send_once<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, TenableError> {
        debug!(method = %method, path, "fetching data");
        counter!(m::API_REQUESTS_TOTAL).increment(1);

        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| TenableError::Transport {
            method: method.to_string(),
            path: path.to_owned(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let retry_after = parse_retry_after(response.headers());
            return Err(TenableError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status"),
                method.as_str(),
                path,
                retry_after,
            ));
        }

        let text = response.text().await.map_err(|e| TenableError::Transport {
            method: method.to_string(),
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| TenableError::Decode {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }
}

/// `Retry-After` 헤더를 초 단위 정수로 해석합니다.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

impl TenableApi for HttpTenableClient {
    async fn fetch_user_permissions(&self) -> Result<SessionInfo, TenableError> {
        let session: SessionInfo = self.get("/session").await?;
        info!(permissions = ?session.permissions, "fetched user permissions");
        Ok(session)
    }

    async fn fetch_users(&self) -> Result<Vec<User>, TenableError> {
        let response: UsersResponse = self.get("/users").await?;
        info!(users = response.users.len(), "fetched users");
        Ok(response.users)
    }

    async fn fetch_scans(&self) -> Result<Vec<ScanSummary>, TenableError> {
        let response: ScansResponse = self.get("/scans").await?;
        let scans = response.scans.unwrap_or_default();
        info!(scans = scans.len(), "fetched scans");
        Ok(scans)
    }

    async fn fetch_scan_detail(&self, scan_id: u64) -> Result<ScanDetailOutcome, TenableError> {
        match self.get::<ScanDetail>(&format!("/scans/{scan_id}")).await {
            Ok(detail) => {
                info!(
                    scan_id,
                    hosts = detail.hosts.as_ref().map_or(0, Vec::len),
                    vulnerabilities = detail.vulnerabilities.as_ref().map_or(0, Vec::len),
                    "fetched scan details"
                );
                Ok(ScanDetailOutcome::Found(detail))
            }
            Err(err) => match err.kind() {
                ErrorKind::Forbidden => {
                    warn!(scan_id, error = %err, "scan details forbidden");
                    Ok(ScanDetailOutcome::Forbidden)
                }
                ErrorKind::NotFound
                | ErrorKind::RateLimited
                | ErrorKind::TransientServer
                | ErrorKind::Fatal => Err(err),
            },
        }
    }

    async fn fetch_scan_host_vulnerabilities(
        &self,
        scan_id: u64,
        host_id: u64,
    ) -> Result<Vec<ScanHostVulnerability>, TenableError> {
        let path = format!("/scans/{scan_id}/hosts/{host_id}");
        match self.get::<ScanHostVulnerabilitiesResponse>(&path).await {
            Ok(response) => {
                info!(
                    scan_id,
                    host_id,
                    vulnerabilities = response.vulnerabilities.len(),
                    "fetched scan host vulnerabilities"
                );
                Ok(response.vulnerabilities)
            }
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    info!(scan_id, host_id, error = %err, "host vulnerabilities not found");
                    Ok(Vec::new())
                }
                ErrorKind::Forbidden
                | ErrorKind::RateLimited
                | ErrorKind::TransientServer
                | ErrorKind::Fatal => Err(err),
            },
        }
    }

    async fn fetch_asset_vulnerability_info(
        &self,
        asset_uuid: &str,
        plugin_id: u64,
    ) -> Result<Option<AssetVulnerabilityInfo>, TenableError> {
        let path = format!("/workbenches/assets/{asset_uuid}/vulnerabilities/{plugin_id}/info");
        match self.get::<AssetVulnerabilityResponse>(&path).await {
            Ok(response) => {
                info!(asset_uuid, plugin_id, "fetched asset vulnerability info");
                Ok(response.info)
            }
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    info!(asset_uuid, plugin_id, error = %err, "asset vulnerability info not found");
                    Ok(None)
                }
                ErrorKind::TransientServer if err.status() == Some(500) => {
                    warn!(
                        asset_uuid,
                        plugin_id,
                        error = %err,
                        "internal server error for asset vulnerability info"
                    );
                    Ok(None)
                }
                ErrorKind::TransientServer
                | ErrorKind::Forbidden
                | ErrorKind::RateLimited
                | ErrorKind::Fatal => Err(err),
            },
        }
    }

    async fn export_assets(
        &self,
        options: &ExportAssetsOptions,
    ) -> Result<ExportStartResponse, TenableError> {
        let response: ExportStartResponse = self.post("/assets/export", options).await?;
        info!(
            export_uuid = %response.export_uuid,
            chunk_size = options.chunk_size,
            "started assets export"
        );
        Ok(response)
    }

    async fn fetch_assets_export_status(
        &self,
        export_uuid: &str,
    ) -> Result<ExportStatusResponse, TenableError> {
        let status: ExportStatusResponse = self
            .get(&format!("/assets/export/{export_uuid}/status"))
            .await?;
        debug!(
            export_uuid,
            status = status.status.as_str(),
            chunks = status.chunks_available.len(),
            "fetched assets export status"
        );
        Ok(status)
    }

    async fn fetch_assets_export_chunk(
        &self,
        export_uuid: &str,
        chunk_id: u64,
    ) -> Result<Vec<AssetExport>, TenableError> {
        let assets: Vec<AssetExport> = self
            .get(&format!("/assets/export/{export_uuid}/chunks/{chunk_id}"))
            .await?;
        info!(export_uuid, chunk_id, assets = assets.len(), "fetched assets export chunk");
        Ok(assets)
    }

    async fn export_vulnerabilities(
        &self,
        options: &ExportVulnerabilitiesOptions,
    ) -> Result<ExportStartResponse, TenableError> {
        let response: ExportStartResponse = self.post("/vulns/export", options).await?;
        info!(
            export_uuid = %response.export_uuid,
            num_assets = options.num_assets,
            "started vulnerabilities export"
        );
        Ok(response)
    }

    async fn fetch_vulnerabilities_export_status(
        &self,
        export_uuid: &str,
    ) -> Result<ExportStatusResponse, TenableError> {
        let status: ExportStatusResponse = self
            .get(&format!("/vulns/export/{export_uuid}/status"))
            .await?;
        debug!(
            export_uuid,
            status = status.status.as_str(),
            chunks = status.chunks_available.len(),
            "fetched vulnerabilities export status"
        );
        Ok(status)
    }

    async fn fetch_vulnerabilities_export_chunk(
        &self,
        export_uuid: &str,
        chunk_id: u64,
    ) -> Result<Vec<VulnerabilityExport>, TenableError> {
        let vulns: Vec<VulnerabilityExport> = self
            .get(&format!("/vulns/export/{export_uuid}/chunks/{chunk_id}"))
            .await?;
        info!(
            export_uuid,
            chunk_id,
            vulnerabilities = vulns.len(),
            "fetched vulnerabilities export chunk"
        );
        Ok(vulns)
    }

    async fn fetch_containers(&self) -> Result<Vec<Container>, TenableError> {
        let containers: Vec<Container> = self
            .get("/container-security/api/v1/container/list")
            .await?;
        info!(containers = containers.len(), "fetched containers");
        Ok(containers)
    }

    async fn fetch_report_by_image_digest(
        &self,
        digest: &str,
    ) -> Result<ContainerReport, TenableError> {
        let report: ContainerReport = self
            .get(&format!(
                "/container-security/api/v1/reports/by_image_digest?image_digest={digest}"
            ))
            .await?;
        info!(
            digest,
            findings = report.findings.len(),
            malware = report.malware.len(),
            unwanted_programs = report.potentially_unwanted_programs.len(),
            "fetched container report"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_missing_credentials() {
        let err = TenableClientConfigBuilder::new().build().unwrap_err();
        assert!(matches!(err, TenableError::Config { ref field, .. } if field == "access_key"));

        let err = TenableClientConfigBuilder::new()
            .credentials("ak", "")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("secret_key"));
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let config = TenableClientConfigBuilder::new()
            .credentials("ak", "sk")
            .base_url("http://127.0.0.1:8080/")
            .build()
            .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn from_core_maps_all_fields() {
        let core = TenableConfig {
            access_key: "ak".to_owned(),
            secret_key: "sk".to_owned(),
            base_url: "https://example.test/".to_owned(),
            retry_max_attempts: 4,
            request_timeout_secs: 5,
            rate_limit_delay_ms: 250,
        };
        let config = TenableClientConfig::from_core(&core);
        assert_eq!(config.base_url, "https://example.test");
        assert_eq!(config.retry_max_attempts, 4);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.retry_policy().rate_limit_delay, Duration::from_millis(250));
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let config = TenableClientConfigBuilder::new()
            .credentials("my-access", "my-secret")
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("my-access"));
        assert!(!debug.contains("my-secret"));
    }

    #[test]
    fn client_new_fails_before_network_without_credentials() {
        let result = HttpTenableClient::new(TenableClientConfig::default());
        assert!(matches!(result, Err(TenableError::Config { .. })));
    }

    #[test]
    fn retry_after_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
