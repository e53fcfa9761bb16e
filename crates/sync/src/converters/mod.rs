//! API 레코드 → 그래프 객체 변환
//!
//! 변환 함수는 순수 함수이며 네트워크나 싱크에 접근하지 않습니다.
//! 키는 모두 [`generate_entity_key`](scangraph_core::generate_entity_key)로 결정되므로
//! 같은 입력은 실행마다 같은 키를 만듭니다.

pub mod account;
pub mod assets;
pub mod containers;
pub mod findings;
pub mod scans;
pub mod users;
pub mod vulnerabilities;

use chrono::DateTime;

pub use account::{
    account_key, create_account_asset_relationship, create_account_container_relationship,
    create_account_entity, create_account_user_relationship,
};
pub use assets::{asset_key, create_asset_entity, create_asset_host_relationships};
pub use containers::{
    container_key, create_container_entity, create_container_finding_entity, create_container_malware_entity,
    create_container_report_entity, create_container_report_relationship,
    create_container_unwanted_program_entity, create_report_identified_relationship,
};
pub use findings::{
    FindingSource, create_finding_vulnerability_relationship, create_scan_finding_relationship,
    create_vulnerability_finding_entity, finding_key,
};
pub use scans::{create_scan_entity, create_scan_vulnerability_relationship, scan_key};
pub use users::{create_user_entity, create_user_scan_relationship, user_key};
pub use vulnerabilities::{
    create_asset_vulnerability_relationship, create_exported_vulnerability_entity,
    create_host_vulnerability_entity, create_scan_vulnerability_entity,
    create_vulnerability_cve_relationships, vulnerability_key,
};

/// 엔티티 `_type` 값
pub mod entities {
    pub const ACCOUNT: &str = "tenable_account";
    pub const SCAN: &str = "tenable_scan";
    pub const USER: &str = "tenable_user";
    pub const ASSET: &str = "tenable_asset";
    pub const FINDING: &str = "tenable_vulnerability_finding";
    pub const VULNERABILITY: &str = "tenable_vulnerability";
    pub const CONTAINER: &str = "tenable_container";
    pub const CONTAINER_REPORT: &str = "tenable_container_report";
    pub const CONTAINER_FINDING: &str = "tenable_container_finding";
    pub const CONTAINER_MALWARE: &str = "tenable_container_malware";
    pub const CONTAINER_UNWANTED_PROGRAM: &str = "tenable_container_unwanted_program";
}

/// 관계 `_type` 값
pub mod relationships {
    pub const ACCOUNT_HAS_USER: &str = "tenable_account_has_user";
    pub const ACCOUNT_HAS_ASSET: &str = "tenable_account_has_asset";
    pub const ACCOUNT_HAS_CONTAINER: &str = "tenable_account_has_container";
    pub const ASSET_HAS_VULNERABILITY: &str = "tenable_asset_has_vulnerability";
    pub const ASSET_IS_HOST: &str = "tenable_asset_is_host";
    pub const VULNERABILITY_IS_CVE: &str = "tenable_vulnerability_is_cve";
    pub const USER_OWNS_SCAN: &str = "tenable_user_owns_scan";
    pub const SCAN_IDENTIFIED_FINDING: &str = "tenable_scan_identified_finding";
    pub const SCAN_IDENTIFIED_VULNERABILITY: &str = "tenable_scan_identified_vulnerability";
    pub const FINDING_IS_VULNERABILITY: &str = "tenable_finding_is_vulnerability";
    pub const CONTAINER_HAS_REPORT: &str = "tenable_container_has_report";
    pub const REPORT_IDENTIFIED_FINDING: &str = "tenable_container_report_identified_finding";
    pub const REPORT_IDENTIFIED_MALWARE: &str = "tenable_container_report_identified_malware";
    pub const REPORT_IDENTIFIED_UNWANTED_PROGRAM: &str =
        "tenable_container_report_identified_unwanted_program";
}

/// 관계 `_class` 값
pub mod classes {
    pub const HAS: &str = "HAS";
    pub const IDENTIFIED: &str = "IDENTIFIED";
    pub const IS: &str = "IS";
    pub const OWNS: &str = "OWNS";
}

/// 매핑 관계 대상 `_type` 값 (다른 통합이 소유하는 엔티티)
pub mod targets {
    pub const CVE: &str = "cve";
    pub const AWS_INSTANCE: &str = "aws_instance";
    pub const AZURE_VM: &str = "azure_vm";
    pub const GCP_INSTANCE: &str = "google_compute_instance";
}

/// `_rawData` 항목 이름
pub mod raw {
    pub const DEFAULT: &str = "default";
    pub const ASSET_EXPORT: &str = "asset-export";
    pub const VULNERABILITY_EXPORT: &str = "vulnerability-export";
}

/// epoch 초 → epoch 밀리초
pub fn epoch_seconds_to_millis(seconds: Option<i64>) -> Option<i64> {
    seconds.and_then(|s| s.checked_mul(1000))
}

/// RFC 3339 문자열 → epoch 밀리초. 해석할 수 없으면 `None`입니다.
pub fn parse_timestamp(value: Option<&str>) -> Option<i64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .ok()
}

/// 비어 있는 목록은 속성으로 기록하지 않습니다.
pub(crate) fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_are_converted_to_millis() {
        assert_eq!(epoch_seconds_to_millis(Some(1_600_000_000)), Some(1_600_000_000_000));
        assert_eq!(epoch_seconds_to_millis(None), None);
    }

    #[test]
    fn rfc3339_timestamps_are_parsed() {
        assert_eq!(
            parse_timestamp(Some("2020-09-13T12:26:40Z")),
            Some(1_600_000_000_000)
        );
        assert_eq!(
            parse_timestamp(Some("2020-09-13T12:26:40.250+00:00")),
            Some(1_600_000_000_250)
        );
        assert_eq!(parse_timestamp(Some("yesterday")), None);
        assert_eq!(parse_timestamp(Some("")), None);
        assert_eq!(parse_timestamp(None), None);
    }
}
