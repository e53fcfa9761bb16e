//! 스캔 엔티티와 스캔 단위 취약점 관계

use scangraph_core::{Entity, Relationship, generate_entity_key};
use scangraph_tenable::{ScanSummary, ScanVulnerabilitySummary};

use super::{classes, entities, epoch_seconds_to_millis, raw, relationships, vulnerability_key};

pub fn scan_key(scan_id: u64) -> String {
    generate_entity_key(entities::SCAN, scan_id)
}

pub fn create_scan_entity(scan: &ScanSummary) -> Entity {
    Entity::new(scan_key(scan.id), entities::SCAN, &["Assessment", "Service"])
        .with_raw_data(raw::DEFAULT, scan)
        .with_property("id", scan.id.to_string())
        .with_property("name", scan.name.as_deref())
        .with_property("displayName", scan.name.as_deref())
        .with_property("legacy", scan.legacy)
        .with_property("permissions", scan.permissions)
        .with_property("type", scan.scan_type.as_deref())
        .with_property("read", scan.read)
        .with_property(
            "lastModificationDate",
            epoch_seconds_to_millis(scan.last_modification_date),
        )
        .with_property("creationDate", epoch_seconds_to_millis(scan.creation_date))
        .with_property("status", scan.status.as_str())
        .with_property("uuid", scan.uuid.as_deref())
        .with_property("shared", scan.shared)
        .with_property("userPermissions", scan.user_permissions)
        .with_property("owner", scan.owner.as_deref())
        .with_property("scheduleUuid", scan.schedule_uuid.as_deref())
        .with_property("timezone", scan.timezone.as_deref())
        .with_property("rrules", scan.rrules.as_deref())
        .with_property("starttime", scan.starttime.as_deref())
        .with_property("enabled", scan.enabled)
        .with_property("control", scan.control)
}

/// 스캔 → 취약점 (`IDENTIFIED`), 스캔 상세의 취약점 요약 한 건당 하나
pub fn create_scan_vulnerability_relationship(
    scan: &ScanSummary,
    vulnerability: &ScanVulnerabilitySummary,
) -> Relationship {
    Relationship::new(
        relationships::SCAN_IDENTIFIED_VULNERABILITY,
        classes::IDENTIFIED,
        scan_key(scan.id),
        vulnerability_key(vulnerability.plugin_id),
    )
    .with_raw_data(raw::DEFAULT, vulnerability)
    .with_property("scanId", scan.id)
    .with_property("scanUuid", scan.uuid.as_deref())
    .with_property("pluginId", vulnerability.plugin_id)
    .with_property("pluginName", vulnerability.plugin_name.as_deref())
    .with_property("pluginFamily", vulnerability.plugin_family.as_deref())
    .with_property("severity", vulnerability.severity)
    .with_property("count", vulnerability.count)
    .with_property("vulnIndex", vulnerability.vuln_index)
}
