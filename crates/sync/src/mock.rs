//! 테스트용 Mock API 클라이언트와 레코드 fixture
//!
//! 응답은 빌더로 미리 설정하며, 호출 기록으로 어떤 요청이 나갔는지 확인할 수 있습니다.
//! 상태 코드로 설정한 실패는 실제 클라이언트의 엔드포인트별 규칙을 그대로 따릅니다
//! (스캔 상세 403 → Forbidden, 호스트 취약점 404 → 빈 목록).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::json;

use scangraph_tenable::{
    AssetExport, AssetVulnerabilityInfo, Container, ContainerReport, ExportAssetsOptions,
    ExportStartResponse, ExportStatus, ExportStatusResponse, ExportVulnerabilitiesOptions,
    ScanDetail, ScanDetailOutcome, ScanHost, ScanHostVulnerability, ScanStatus, ScanSummary,
    SessionInfo, TenableApi, TenableError, User, VulnerabilityExport,
};

/// 미리 설정된 응답 (성공 값 또는 HTTP 상태 코드)
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Status(u16),
}

fn status_error(status: u16, method: &str, path: &str) -> TenableError {
    let reason = match status {
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        504 => "Gateway Timeout",
        _ => "Error",
    };
    TenableError::from_response(status, reason, method, path, None)
}

#[derive(Debug, Default)]
struct Calls {
    session: u32,
    scan_details: Vec<u64>,
    host_vulnerabilities: Vec<(u64, u64)>,
    asset_status_polls: u32,
    vuln_status_polls: u32,
    asset_chunks: Vec<u64>,
    vuln_chunks: Vec<u64>,
    reports: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MockTenableApi {
    session: Option<u16>,
    session_info: Option<SessionInfo>,
    users: Vec<User>,
    scans: Vec<ScanSummary>,
    scan_details: HashMap<u64, Reply<ScanDetail>>,
    host_vulnerabilities: HashMap<(u64, u64), Reply<Vec<ScanHostVulnerability>>>,
    asset_statuses: Mutex<VecDeque<ExportStatusResponse>>,
    asset_chunks: HashMap<u64, Reply<Vec<AssetExport>>>,
    vuln_statuses: Mutex<VecDeque<ExportStatusResponse>>,
    vuln_chunks: HashMap<u64, Reply<Vec<VulnerabilityExport>>>,
    containers: Vec<Container>,
    reports: HashMap<String, ContainerReport>,
    calls: Mutex<Calls>,
}

impl MockTenableApi {
    pub fn builder() -> MockTenableApiBuilder {
        MockTenableApiBuilder::default()
    }

    pub fn session_calls(&self) -> u32 {
        self.calls.lock().unwrap().session
    }

    pub fn scan_detail_requests(&self) -> Vec<u64> {
        self.calls.lock().unwrap().scan_details.clone()
    }

    pub fn host_vulnerability_requests(&self) -> Vec<(u64, u64)> {
        self.calls.lock().unwrap().host_vulnerabilities.clone()
    }

    pub fn asset_status_polls(&self) -> u32 {
        self.calls.lock().unwrap().asset_status_polls
    }

    pub fn vuln_status_polls(&self) -> u32 {
        self.calls.lock().unwrap().vuln_status_polls
    }

    pub fn fetched_asset_chunks(&self) -> Vec<u64> {
        self.calls.lock().unwrap().asset_chunks.clone()
    }

    pub fn fetched_vuln_chunks(&self) -> Vec<u64> {
        self.calls.lock().unwrap().vuln_chunks.clone()
    }

    pub fn report_requests(&self) -> Vec<String> {
        self.calls.lock().unwrap().reports.clone()
    }
}

/// 남은 상태가 하나뿐이면 계속 그 상태를 반환합니다. 설정이 없으면 청크 없는 FINISHED입니다.
fn next_status(queue: &Mutex<VecDeque<ExportStatusResponse>>) -> ExportStatusResponse {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        return queue.pop_front().unwrap();
    }
    queue.front().cloned().unwrap_or(ExportStatusResponse {
        status: ExportStatus::Finished,
        chunks_available: Vec::new(),
        chunks_failed: Vec::new(),
        chunks_cancelled: Vec::new(),
    })
}

fn chunk<T: Clone>(
    chunks: &HashMap<u64, Reply<Vec<T>>>,
    chunk_id: u64,
    path: String,
) -> Result<Vec<T>, TenableError> {
    match chunks.get(&chunk_id) {
        Some(Reply::Ok(records)) => Ok(records.clone()),
        Some(Reply::Status(status)) => Err(status_error(*status, "GET", &path)),
        None => Ok(Vec::new()),
    }
}

impl TenableApi for MockTenableApi {
    async fn fetch_user_permissions(&self) -> Result<SessionInfo, TenableError> {
        self.calls.lock().unwrap().session += 1;
        match self.session {
            Some(status) => Err(status_error(status, "GET", "/session")),
            None => Ok(self.session_info.clone().unwrap_or(SessionInfo {
                id: Some(1),
                username: Some("admin@example.com".to_owned()),
                permissions: Some(64),
                container_uuid: None,
            })),
        }
    }

    async fn fetch_users(&self) -> Result<Vec<User>, TenableError> {
        Ok(self.users.clone())
    }

    async fn fetch_scans(&self) -> Result<Vec<ScanSummary>, TenableError> {
        Ok(self.scans.clone())
    }

    async fn fetch_scan_detail(&self, scan_id: u64) -> Result<ScanDetailOutcome, TenableError> {
        self.calls.lock().unwrap().scan_details.push(scan_id);
        match self.scan_details.get(&scan_id) {
            Some(Reply::Ok(detail)) => Ok(ScanDetailOutcome::Found(detail.clone())),
            Some(Reply::Status(403)) => Ok(ScanDetailOutcome::Forbidden),
            Some(Reply::Status(status)) => {
                Err(status_error(*status, "GET", &format!("/scans/{scan_id}")))
            }
            None => Ok(ScanDetailOutcome::Found(ScanDetail::default())),
        }
    }

    async fn fetch_scan_host_vulnerabilities(
        &self,
        scan_id: u64,
        host_id: u64,
    ) -> Result<Vec<ScanHostVulnerability>, TenableError> {
        self.calls
            .lock()
            .unwrap()
            .host_vulnerabilities
            .push((scan_id, host_id));
        match self.host_vulnerabilities.get(&(scan_id, host_id)) {
            Some(Reply::Ok(vulns)) => Ok(vulns.clone()),
            Some(Reply::Status(404)) | None => Ok(Vec::new()),
            Some(Reply::Status(status)) => Err(status_error(
                *status,
                "GET",
                &format!("/scans/{scan_id}/hosts/{host_id}"),
            )),
        }
    }

    async fn fetch_asset_vulnerability_info(
        &self,
        _asset_uuid: &str,
        _plugin_id: u64,
    ) -> Result<Option<AssetVulnerabilityInfo>, TenableError> {
        Ok(None)
    }

    async fn export_assets(
        &self,
        _options: &ExportAssetsOptions,
    ) -> Result<ExportStartResponse, TenableError> {
        Ok(ExportStartResponse {
            export_uuid: "asset-export-1".to_owned(),
        })
    }

    async fn fetch_assets_export_status(
        &self,
        _export_uuid: &str,
    ) -> Result<ExportStatusResponse, TenableError> {
        self.calls.lock().unwrap().asset_status_polls += 1;
        Ok(next_status(&self.asset_statuses))
    }

    async fn fetch_assets_export_chunk(
        &self,
        export_uuid: &str,
        chunk_id: u64,
    ) -> Result<Vec<AssetExport>, TenableError> {
        self.calls.lock().unwrap().asset_chunks.push(chunk_id);
        chunk(
            &self.asset_chunks,
            chunk_id,
            format!("/assets/export/{export_uuid}/chunks/{chunk_id}"),
        )
    }

    async fn export_vulnerabilities(
        &self,
        _options: &ExportVulnerabilitiesOptions,
    ) -> Result<ExportStartResponse, TenableError> {
        Ok(ExportStartResponse {
            export_uuid: "vuln-export-1".to_owned(),
        })
    }

    async fn fetch_vulnerabilities_export_status(
        &self,
        _export_uuid: &str,
    ) -> Result<ExportStatusResponse, TenableError> {
        self.calls.lock().unwrap().vuln_status_polls += 1;
        Ok(next_status(&self.vuln_statuses))
    }

    async fn fetch_vulnerabilities_export_chunk(
        &self,
        export_uuid: &str,
        chunk_id: u64,
    ) -> Result<Vec<VulnerabilityExport>, TenableError> {
        self.calls.lock().unwrap().vuln_chunks.push(chunk_id);
        chunk(
            &self.vuln_chunks,
            chunk_id,
            format!("/vulns/export/{export_uuid}/chunks/{chunk_id}"),
        )
    }

    async fn fetch_containers(&self) -> Result<Vec<Container>, TenableError> {
        Ok(self.containers.clone())
    }

    async fn fetch_report_by_image_digest(
        &self,
        digest: &str,
    ) -> Result<ContainerReport, TenableError> {
        self.calls.lock().unwrap().reports.push(digest.to_owned());
        self.reports.get(digest).cloned().ok_or_else(|| {
            status_error(
                404,
                "GET",
                &format!(
                    "/container-security/api/v1/reports/by_image_digest?image_digest={digest}"
                ),
            )
        })
    }
}

#[derive(Debug, Default)]
pub struct MockTenableApiBuilder {
    api: MockTenableApi,
}

impl MockTenableApiBuilder {
    pub fn session_status(mut self, status: u16) -> Self {
        self.api.session = Some(status);
        self
    }

    pub fn session_info(mut self, info: SessionInfo) -> Self {
        self.api.session_info = Some(info);
        self
    }

    pub fn users(mut self, users: Vec<User>) -> Self {
        self.api.users = users;
        self
    }

    pub fn scans(mut self, scans: Vec<ScanSummary>) -> Self {
        self.api.scans = scans;
        self
    }

    pub fn scan_detail(mut self, scan_id: u64, detail: ScanDetail) -> Self {
        self.api.scan_details.insert(scan_id, Reply::Ok(detail));
        self
    }

    pub fn scan_detail_status(mut self, scan_id: u64, status: u16) -> Self {
        self.api.scan_details.insert(scan_id, Reply::Status(status));
        self
    }

    pub fn host_vulnerabilities(
        mut self,
        scan_id: u64,
        host_id: u64,
        vulns: Vec<ScanHostVulnerability>,
    ) -> Self {
        self.api
            .host_vulnerabilities
            .insert((scan_id, host_id), Reply::Ok(vulns));
        self
    }

    pub fn host_vulnerabilities_status(mut self, scan_id: u64, host_id: u64, status: u16) -> Self {
        self.api
            .host_vulnerabilities
            .insert((scan_id, host_id), Reply::Status(status));
        self
    }

    pub fn asset_export_statuses(mut self, statuses: Vec<ExportStatusResponse>) -> Self {
        self.api.asset_statuses = Mutex::new(statuses.into());
        self
    }

    pub fn asset_chunk(mut self, chunk_id: u64, records: Vec<AssetExport>) -> Self {
        self.api.asset_chunks.insert(chunk_id, Reply::Ok(records));
        self
    }

    pub fn asset_chunk_status(mut self, chunk_id: u64, status: u16) -> Self {
        self.api.asset_chunks.insert(chunk_id, Reply::Status(status));
        self
    }

    pub fn vuln_export_statuses(mut self, statuses: Vec<ExportStatusResponse>) -> Self {
        self.api.vuln_statuses = Mutex::new(statuses.into());
        self
    }

    pub fn vuln_chunk(mut self, chunk_id: u64, records: Vec<VulnerabilityExport>) -> Self {
        self.api.vuln_chunks.insert(chunk_id, Reply::Ok(records));
        self
    }

    pub fn containers(mut self, containers: Vec<Container>) -> Self {
        self.api.containers = containers;
        self
    }

    pub fn report(mut self, digest: &str, report: ContainerReport) -> Self {
        self.api.reports.insert(digest.to_owned(), report);
        self
    }

    pub fn build(self) -> MockTenableApi {
        self.api
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn finished(chunks: &[u64]) -> ExportStatusResponse {
    ExportStatusResponse {
        status: ExportStatus::Finished,
        chunks_available: chunks.to_vec(),
        chunks_failed: Vec::new(),
        chunks_cancelled: Vec::new(),
    }
}

pub fn user(id: u64, username: &str) -> User {
    serde_json::from_value(json!({"id": id, "username": username})).unwrap()
}

pub fn scan(id: u64, status: ScanStatus) -> ScanSummary {
    serde_json::from_value(json!({
        "id": id,
        "uuid": format!("scan-uuid-{id}"),
        "status": status.as_str(),
    }))
    .unwrap()
}

pub fn scan_host(host_id: u64, uuid: Option<&str>) -> ScanHost {
    serde_json::from_value(json!({"host_id": host_id, "uuid": uuid})).unwrap()
}

pub fn host_vuln(plugin_id: u64) -> ScanHostVulnerability {
    serde_json::from_value(json!({"plugin_id": plugin_id})).unwrap()
}

/// `detail.hosts`만 채운 스캔 상세
pub fn detail_with_hosts(hosts: Vec<ScanHost>) -> ScanDetail {
    ScanDetail {
        hosts: Some(hosts),
        ..ScanDetail::default()
    }
}

pub fn asset(id: &str) -> AssetExport {
    serde_json::from_value(json!({"id": id})).unwrap()
}

pub fn vuln_export(asset_uuid: &str, plugin_id: u64) -> VulnerabilityExport {
    serde_json::from_value(json!({
        "asset": {"uuid": asset_uuid},
        "plugin": {"id": plugin_id},
    }))
    .unwrap()
}

pub fn container(id: &str, digest: Option<&str>) -> Container {
    serde_json::from_value(json!({"id": id, "name": format!("image-{id}"), "digest": digest}))
        .unwrap()
}

pub fn container_report() -> ContainerReport {
    serde_json::from_value(json!({
        "id": "report-1",
        "image_name": "nginx",
        "tag": "1.21",
        "findings": [{
            "nvd_finding": {"reference_id": "CVE-2021-3711", "cve": "CVE-2021-3711", "severity": "High"},
            "packages": [{"name": "openssl", "version": "1.1.1k"}],
        }],
        "malware": [{"infected_file": "/usr/bin/miner", "sha256": "deadbeef"}],
        "potentially_unwanted_programs": [{"file": "/opt/tool", "md5": "cafe"}],
    }))
    .unwrap()
}
