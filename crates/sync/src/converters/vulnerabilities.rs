//! 플러그인 단위 취약점 엔티티와 관계
//!
//! 취약점 엔티티는 플러그인 하나당 하나입니다. 취약점 export 레코드가 있으면
//! 플러그인 상세(설명, CVE, CVSS)로 만들고, 없으면 스캔 결과의 플러그인 요약으로 만듭니다.
//! 어느 쪽이든 키는 `tenable_vulnerability_{plugin_id}`로 같습니다.

use scangraph_core::{Entity, Relationship, TargetEntity, generate_entity_key};
use scangraph_tenable::types::VulnerabilityExportPlugin;
use scangraph_tenable::{ScanHostVulnerability, ScanVulnerabilitySummary, VulnerabilityExport};

use super::{
    asset_key, classes, entities, non_empty, parse_timestamp, raw, relationships, targets,
};

const NVD_DETAIL_URL: &str = "https://nvd.nist.gov/vuln/detail";

/// `tenable_vulnerability_{plugin_id}`
pub fn vulnerability_key(plugin_id: u64) -> String {
    generate_entity_key(entities::VULNERABILITY, plugin_id)
}

fn plugin_entity(
    plugin_id: u64,
    plugin_name: Option<&str>,
    plugin_family: Option<&str>,
    numeric_severity: Option<u8>,
) -> Entity {
    let name = plugin_name.map_or_else(|| format!("Plugin {plugin_id}"), str::to_owned);
    Entity::new(
        vulnerability_key(plugin_id),
        entities::VULNERABILITY,
        &["Vulnerability"],
    )
    .with_property("id", plugin_id.to_string())
    .with_property("name", name.as_str())
    .with_property("displayName", name)
    .with_property("pluginId", plugin_id)
    .with_property("pluginFamily", plugin_family)
    .with_property("numericSeverity", numeric_severity)
}

/// 취약점 export 레코드의 플러그인 상세로 만든 취약점 엔티티
pub fn create_exported_vulnerability_entity(export: &VulnerabilityExport) -> Entity {
    let plugin = &export.plugin;
    plugin_entity(
        plugin.id,
        plugin.name.as_deref(),
        plugin.family.as_deref(),
        export.severity_id,
    )
    .with_raw_data(raw::DEFAULT, plugin)
    .with_property("severity", export.severity.as_deref())
    .with_property("description", plugin.description.as_deref())
    .with_property("synopsis", plugin.synopsis.as_deref())
    .with_property("solution", plugin.solution.as_deref())
    .with_property("cve", non_empty(&plugin.cve))
    .with_property("references", non_empty(&plugin.see_also))
    .with_property("cvssBaseScore", plugin.cvss_base_score)
    .with_property("cvss3BaseScore", plugin.cvss3_base_score)
    .with_property("riskFactor", plugin.risk_factor.as_deref())
}

pub fn create_host_vulnerability_entity(vulnerability: &ScanHostVulnerability) -> Entity {
    plugin_entity(
        vulnerability.plugin_id,
        vulnerability.plugin_name.as_deref(),
        vulnerability.plugin_family.as_deref(),
        vulnerability.severity,
    )
    .with_raw_data(raw::DEFAULT, vulnerability)
}

pub fn create_scan_vulnerability_entity(vulnerability: &ScanVulnerabilitySummary) -> Entity {
    plugin_entity(
        vulnerability.plugin_id,
        vulnerability.plugin_name.as_deref(),
        vulnerability.plugin_family.as_deref(),
        vulnerability.severity,
    )
    .with_raw_data(raw::DEFAULT, vulnerability)
}

/// asset → 취약점 (`HAS`), 취약점 export 레코드 한 건당 하나
pub fn create_asset_vulnerability_relationship(export: &VulnerabilityExport) -> Relationship {
    let port = export.port.as_ref();
    Relationship::new(
        relationships::ASSET_HAS_VULNERABILITY,
        classes::HAS,
        asset_key(&export.asset.uuid),
        vulnerability_key(export.plugin.id),
    )
    .with_raw_data(raw::VULNERABILITY_EXPORT, export)
    .with_property("severity", export.severity.as_deref())
    .with_property("numericSeverity", export.severity_id)
    .with_property("state", export.state.as_deref())
    .with_property("firstFoundOn", parse_timestamp(export.first_found.as_deref()))
    .with_property("lastFoundOn", parse_timestamp(export.last_found.as_deref()))
    .with_property("port", port.and_then(|p| p.port))
    .with_property("protocol", port.and_then(|p| p.protocol.as_deref()))
}

/// 취약점 → CVE 매핑 관계 (`IS`)
///
/// CVE 엔티티 키는 소문자 CVE ID입니다. 빈 값과 중복 ID는 건너뜁니다.
pub fn create_vulnerability_cve_relationships(
    plugin: &VulnerabilityExportPlugin,
) -> Vec<Relationship> {
    let source_key = vulnerability_key(plugin.id);
    let mut seen = Vec::new();
    plugin
        .cve
        .iter()
        .map(|cve| cve.trim().to_ascii_uppercase())
        .filter(|cve| !cve.is_empty())
        .filter(|cve| {
            let first = !seen.contains(cve);
            if first {
                seen.push(cve.clone());
            }
            first
        })
        .map(|cve| {
            let target = TargetEntity::new(
                targets::CVE,
                "Vulnerability",
                "_key",
                cve.to_ascii_lowercase(),
            )
            .with_property("name", cve.as_str())
            .with_property("displayName", cve.as_str())
            .with_property("webLink", format!("{NVD_DETAIL_URL}/{cve}"));
            Relationship::mapped(
                relationships::VULNERABILITY_IS_CVE,
                classes::IS,
                source_key.as_str(),
                target,
            )
            .with_raw_data(raw::DEFAULT, plugin)
        })
        .collect()
}
