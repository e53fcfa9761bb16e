//! API 응답/요청 타입
//!
//! 플랫폼 응답의 대부분 필드는 선택적이므로 `Option`과 `#[serde(default)]`로 받습니다.
//! 그래프의 원본 데이터(`_rawData`)로 보존할 레코드는 알 수 없는 필드를 `extra`에 담습니다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// 세션 / 사용자
// =============================================================================

/// `/session` 응답 -- 자격 증명 검증에 사용
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
    pub id: Option<u64>,
    pub username: Option<String>,
    pub permissions: Option<u32>,
    pub container_uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub uuid: Option<String>,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "type")]
    pub user_type: Option<String>,
    #[serde(default)]
    pub permissions: Option<u32>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub last_login: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UsersResponse {
    #[serde(default)]
    pub users: Vec<User>,
}

// =============================================================================
// 스캔
// =============================================================================

/// 스캔 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Completed,
    Running,
    Pending,
    Paused,
    Canceled,
    Aborted,
    Imported,
    Empty,
    #[serde(other)]
    Other,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Running => "running",
            Self::Pending => "pending",
            Self::Paused => "paused",
            Self::Canceled => "canceled",
            Self::Aborted => "aborted",
            Self::Imported => "imported",
            Self::Empty => "empty",
            Self::Other => "other",
        }
    }
}

/// `/scans` 목록의 스캔 요약
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub id: u64,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub status: ScanStatus,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub legacy: Option<bool>,
    #[serde(default)]
    pub permissions: Option<u32>,
    #[serde(default, rename = "type")]
    pub scan_type: Option<String>,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub last_modification_date: Option<i64>,
    #[serde(default)]
    pub creation_date: Option<i64>,
    #[serde(default)]
    pub shared: Option<bool>,
    #[serde(default)]
    pub user_permissions: Option<u32>,
    #[serde(default)]
    pub schedule_uuid: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub rrules: Option<String>,
    #[serde(default)]
    pub starttime: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub control: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ScansResponse {
    #[serde(default)]
    pub scans: Option<Vec<ScanSummary>>,
}

/// 스캔 상세의 `info` 블록
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanInfo {
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub status: Option<String>,
    pub hostcount: Option<u32>,
    pub scan_start: Option<i64>,
    pub scan_end: Option<i64>,
    pub is_archived: Option<bool>,
}

/// `/scans/{id}` 응답
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanDetail {
    pub info: ScanInfo,
    pub hosts: Option<Vec<ScanHost>>,
    pub vulnerabilities: Option<Vec<ScanVulnerabilitySummary>>,
}

impl ScanDetail {
    pub fn is_archived(&self) -> bool {
        self.info.is_archived.unwrap_or(false)
    }
}

/// 스캔 상세 조회 결과
///
/// 403은 에러가 아니라 "접근 불가" 결과로 표현됩니다.
#[derive(Debug, Clone)]
pub enum ScanDetailOutcome {
    Found(ScanDetail),
    Forbidden,
}

/// 스캔이 발견한 호스트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanHost {
    pub host_id: u64,
    /// asset export 캐시와 연결되는 asset UUID (없을 수 있음)
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub critical: Option<u32>,
    #[serde(default)]
    pub high: Option<u32>,
    #[serde(default)]
    pub medium: Option<u32>,
    #[serde(default)]
    pub low: Option<u32>,
    #[serde(default)]
    pub info: Option<u32>,
}

/// 스캔 단위 취약점 요약
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanVulnerabilitySummary {
    pub plugin_id: u64,
    #[serde(default)]
    pub plugin_name: Option<String>,
    #[serde(default)]
    pub plugin_family: Option<String>,
    #[serde(default)]
    pub severity: Option<u8>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub vuln_index: Option<u64>,
}

/// 한 스캔에서 한 호스트에 대해 보고된 플러그인 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanHostVulnerability {
    pub plugin_id: u64,
    #[serde(default)]
    pub host_id: Option<u64>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub plugin_name: Option<String>,
    #[serde(default)]
    pub plugin_family: Option<String>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub vuln_index: Option<u64>,
    #[serde(default)]
    pub severity_index: Option<u64>,
    #[serde(default)]
    pub severity: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ScanHostVulnerabilitiesResponse {
    #[serde(default)]
    pub vulnerabilities: Vec<ScanHostVulnerability>,
}

// =============================================================================
// Bulk export
// =============================================================================

/// export 작업 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportStatus {
    Queued,
    Processing,
    Finished,
    Error,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ExportStatus {
    /// 더 이상 폴링할 필요가 없는 상태인지 여부
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Processing => "PROCESSING",
            Self::Finished => "FINISHED",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// export 시작 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportStartResponse {
    pub export_uuid: String,
}

/// export 상태 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportStatusResponse {
    pub status: ExportStatus,
    #[serde(default)]
    pub chunks_available: Vec<u64>,
    #[serde(default)]
    pub chunks_failed: Vec<u64>,
    #[serde(default)]
    pub chunks_cancelled: Vec<u64>,
}

/// asset export 요청 옵션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportAssetsOptions {
    pub chunk_size: u32,
}

impl Default for ExportAssetsOptions {
    fn default() -> Self {
        Self { chunk_size: 100 }
    }
}

/// 취약점 export 요청 옵션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportVulnerabilitiesOptions {
    pub num_assets: u32,
    pub filters: ExportVulnerabilitiesFilters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportVulnerabilitiesFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_found: Option<u64>,
    pub state: Vec<VulnerabilityState>,
}

impl Default for ExportVulnerabilitiesOptions {
    fn default() -> Self {
        Self {
            num_assets: 50,
            filters: ExportVulnerabilitiesFilters {
                first_found: Some(1_009_861_200),
                state: vec![
                    VulnerabilityState::Open,
                    VulnerabilityState::Reopened,
                    VulnerabilityState::Fixed,
                ],
            },
        }
    }
}

/// 취약점 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VulnerabilityState {
    Open,
    Reopened,
    Fixed,
}

impl VulnerabilityState {
    /// 설정 문자열을 변환합니다. 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "reopened" => Some(Self::Reopened),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }
}

/// asset export 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetExport {
    /// 플랫폼 asset UUID
    pub id: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub has_agent: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub first_seen: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub ipv4s: Vec<String>,
    #[serde(default)]
    pub ipv6s: Vec<String>,
    #[serde(default)]
    pub fqdns: Vec<String>,
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub mac_addresses: Vec<String>,
    #[serde(default)]
    pub operating_systems: Vec<String>,
    #[serde(default)]
    pub agent_uuid: Option<String>,
    #[serde(default)]
    pub bios_uuid: Option<String>,
    #[serde(default)]
    pub aws_ec2_instance_id: Option<String>,
    #[serde(default)]
    pub azure_vm_id: Option<String>,
    #[serde(default)]
    pub gcp_instance_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssetExport {
    /// 캐시 조회에 사용하는 자연 키 (`uuid`가 있으면 `uuid`, 없으면 `id`)
    pub fn natural_key(&self) -> &str {
        self.uuid.as_deref().unwrap_or(&self.id)
    }
}

/// 취약점 export 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityExport {
    pub asset: VulnerabilityExportAsset,
    pub plugin: VulnerabilityExportPlugin,
    #[serde(default)]
    pub port: Option<VulnerabilityExportPort>,
    #[serde(default)]
    pub scan: Option<VulnerabilityExportScan>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub severity_id: Option<u8>,
    #[serde(default)]
    pub first_found: Option<String>,
    #[serde(default)]
    pub last_found: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityExportAsset {
    pub uuid: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub fqdn: Option<String>,
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub operating_system: Vec<String>,
    #[serde(default)]
    pub device_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityExportPlugin {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default)]
    pub cve: Vec<String>,
    #[serde(default)]
    pub cvss_base_score: Option<f64>,
    #[serde(default)]
    pub cvss3_base_score: Option<f64>,
    #[serde(default)]
    pub risk_factor: Option<String>,
    #[serde(default)]
    pub see_also: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityExportPort {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityExportScan {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub schedule_uuid: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

// =============================================================================
// Workbench
// =============================================================================

/// `/workbenches/assets/{uuid}/vulnerabilities/{plugin_id}/info`의 `info` 블록
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetVulnerabilityInfo {
    pub count: Option<u32>,
    pub vuln_count: Option<u32>,
    pub description: Option<String>,
    pub synopsis: Option<String>,
    pub solution: Option<String>,
    pub severity: Option<u8>,
    pub plugin_details: Option<PluginDetails>,
    pub discovery: Option<Discovery>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginDetails {
    pub family: Option<String>,
    pub name: Option<String>,
    pub severity: Option<u8>,
    #[serde(rename = "type")]
    pub plugin_type: Option<String>,
    pub version: Option<String>,
    pub publication_date: Option<String>,
    pub modification_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Discovery {
    pub seen_first: Option<String>,
    pub seen_last: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AssetVulnerabilityResponse {
    #[serde(default)]
    pub info: Option<AssetVulnerabilityInfo>,
}

// =============================================================================
// 컨테이너 보안
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub repo_id: Option<String>,
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub number_of_vulnerabilities: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 이미지 digest 기준 컨테이너 리포트
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerReport {
    pub id: Option<String>,
    pub image_name: Option<String>,
    pub repository: Option<String>,
    pub tag: Option<String>,
    pub sha256: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub risk_score: Option<f64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub findings: Vec<ContainerFinding>,
    pub malware: Vec<ContainerMalware>,
    pub potentially_unwanted_programs: Vec<ContainerUnwantedProgram>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerFinding {
    pub nvd_finding: NvdFinding,
    pub packages: Vec<ContainerPackage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NvdFinding {
    pub reference_id: Option<String>,
    pub cve: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub modified_date: Option<String>,
    pub cvss_score: Option<String>,
    pub severity: Option<String>,
    pub remediation: Option<String>,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerPackage {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub package_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerMalware {
    pub infected_file: Option<String>,
    pub file_type: Option<String>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerUnwantedProgram {
    pub file: Option<String>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scan_status_unknown_value_maps_to_other() {
        let scan: ScanSummary = serde_json::from_value(json!({
            "id": 5,
            "status": "processing-in-some-new-way",
        }))
        .unwrap();
        assert_eq!(scan.status, ScanStatus::Other);
    }

    #[test]
    fn scan_summary_keeps_unknown_fields() {
        let scan: ScanSummary = serde_json::from_value(json!({
            "id": 17,
            "status": "completed",
            "owner": "alice@example.com",
            "folder_id": 3,
        }))
        .unwrap();
        assert_eq!(scan.status, ScanStatus::Completed);
        assert_eq!(scan.extra.get("folder_id"), Some(&json!(3)));
    }

    #[test]
    fn scan_detail_archived_flag() {
        let detail: ScanDetail = serde_json::from_value(json!({
            "info": {"is_archived": true},
            "hosts": [{"host_id": 1, "uuid": "u1"}],
        }))
        .unwrap();
        assert!(detail.is_archived());
        assert!(detail.vulnerabilities.is_none());
        assert_eq!(detail.hosts.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn export_status_parses_uppercase() {
        let status: ExportStatusResponse = serde_json::from_value(json!({
            "status": "FINISHED",
            "chunks_available": [0, 1],
        }))
        .unwrap();
        assert_eq!(status.status, ExportStatus::Finished);
        assert!(status.status.is_terminal());
        assert_eq!(status.chunks_available, vec![0, 1]);

        let status: ExportStatusResponse =
            serde_json::from_value(json!({"status": "QUEUED"})).unwrap();
        assert!(!status.status.is_terminal());
        assert!(status.chunks_available.is_empty());
    }

    #[test]
    fn vuln_export_options_default_body() {
        let body = serde_json::to_value(ExportVulnerabilitiesOptions::default()).unwrap();
        assert_eq!(
            body,
            json!({
                "num_assets": 50,
                "filters": {
                    "first_found": 1009861200,
                    "state": ["open", "reopened", "fixed"],
                }
            })
        );
    }

    #[test]
    fn asset_natural_key_prefers_uuid() {
        let asset: AssetExport = serde_json::from_value(json!({"id": "a1"})).unwrap();
        assert_eq!(asset.natural_key(), "a1");
        let asset: AssetExport =
            serde_json::from_value(json!({"id": "a1", "uuid": "u1"})).unwrap();
        assert_eq!(asset.natural_key(), "u1");
    }

    #[test]
    fn vulnerability_state_loose_parse() {
        assert_eq!(
            VulnerabilityState::from_str_loose("REOPENED"),
            Some(VulnerabilityState::Reopened)
        );
        assert_eq!(VulnerabilityState::from_str_loose("closed"), None);
    }
}
