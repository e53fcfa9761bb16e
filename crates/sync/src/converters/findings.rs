//! 취약점 Finding 엔티티와 관계
//!
//! Finding 하나는 (스캔, asset, 플러그인) 조합 하나를 나타냅니다.
//! export 캐시 적중 여부와 관계없이 항상 만들어지며,
//! 적중하지 않은 데이터셋의 필드만 빠집니다.

use scangraph_core::{Entity, Relationship, generate_entity_key};
use scangraph_tenable::{
    AssetExport, ScanHost, ScanHostVulnerability, ScanSummary, VulnerabilityExport,
};

use super::{
    classes, entities, non_empty, parse_timestamp, raw, relationships, scan_key, vulnerability_key,
};

/// Finding 변환 입력
#[derive(Debug, Clone, Copy)]
pub struct FindingSource<'a> {
    pub scan: &'a ScanSummary,
    pub host: &'a ScanHost,
    /// 호스트에서 결정된 asset 식별자
    pub asset_uuid: &'a str,
    pub asset: Option<&'a AssetExport>,
    pub vulnerability: &'a ScanHostVulnerability,
    pub export: Option<&'a VulnerabilityExport>,
}

/// `tenable_vulnerability_finding_{scan_id}_{asset_uuid}_{plugin_id}`
pub fn finding_key(scan_id: u64, asset_uuid: &str, plugin_id: u64) -> String {
    generate_entity_key(
        entities::FINDING,
        format!("{scan_id}_{asset_uuid}_{plugin_id}"),
    )
}

pub fn create_vulnerability_finding_entity(source: &FindingSource<'_>) -> Entity {
    let FindingSource {
        scan,
        host,
        asset_uuid,
        asset,
        vulnerability,
        export,
    } = *source;

    let name = vulnerability
        .plugin_name
        .clone()
        .unwrap_or_else(|| format!("Plugin {}", vulnerability.plugin_id));

    let mut entity = Entity::new(
        finding_key(scan.id, asset_uuid, vulnerability.plugin_id),
        entities::FINDING,
        &["Finding"],
    )
    .with_raw_data(raw::DEFAULT, vulnerability)
    .with_property("name", name.as_str())
    .with_property("displayName", name)
    .with_property("scanId", scan.id)
    .with_property("scanUuid", scan.uuid.as_deref())
    .with_property("assetUuid", asset_uuid)
    .with_property("hostId", host.host_id)
    .with_property(
        "hostname",
        vulnerability
            .hostname
            .as_deref()
            .or(host.hostname.as_deref()),
    )
    .with_property("pluginId", vulnerability.plugin_id)
    .with_property("pluginName", vulnerability.plugin_name.as_deref())
    .with_property("pluginFamily", vulnerability.plugin_family.as_deref())
    .with_property("numericSeverity", vulnerability.severity)
    .with_property("severityIndex", vulnerability.severity_index)
    .with_property("vulnIndex", vulnerability.vuln_index)
    .with_property("count", vulnerability.count)
    .with_property("open", true);

    if let Some(asset) = asset {
        entity = entity
            .with_raw_data(raw::ASSET_EXPORT, asset)
            .with_property("ipAddress", asset.ipv4s.first().map(String::as_str))
            .with_property("fqdn", asset.fqdns.first().map(String::as_str))
            .with_property("operatingSystems", non_empty(&asset.operating_systems))
            .with_property("agentUuid", asset.agent_uuid.as_deref())
            .with_property("hasAgent", asset.has_agent);
    }

    if let Some(export) = export {
        let plugin = &export.plugin;
        let port = export.port.as_ref();
        entity = entity
            .with_raw_data(raw::VULNERABILITY_EXPORT, export)
            .with_property("severity", export.severity.as_deref())
            .with_property("numericSeverity", export.severity_id.or(vulnerability.severity))
            .with_property("state", export.state.as_deref())
            .with_property("open", !is_fixed(export.state.as_deref()))
            .with_property("firstFoundOn", parse_timestamp(export.first_found.as_deref()))
            .with_property("lastFoundOn", parse_timestamp(export.last_found.as_deref()))
            .with_property("description", plugin.description.as_deref())
            .with_property("synopsis", plugin.synopsis.as_deref())
            .with_property("solution", plugin.solution.as_deref())
            .with_property("cve", non_empty(&plugin.cve))
            .with_property("references", non_empty(&plugin.see_also))
            .with_property("cvssBaseScore", plugin.cvss_base_score)
            .with_property("cvss3BaseScore", plugin.cvss3_base_score)
            .with_property("riskFactor", plugin.risk_factor.as_deref())
            .with_property("port", port.and_then(|p| p.port))
            .with_property("protocol", port.and_then(|p| p.protocol.as_deref()))
            .with_property("service", port.and_then(|p| p.service.as_deref()))
            .with_property("output", export.output.as_deref());
    }

    entity
}

fn is_fixed(state: Option<&str>) -> bool {
    state.is_some_and(|s| s.eq_ignore_ascii_case("fixed"))
}

/// Finding 입력 레코드를 관계의 `_rawData`로 붙입니다.
fn with_finding_sources(relationship: Relationship, source: &FindingSource<'_>) -> Relationship {
    let mut relationship = relationship.with_raw_data(raw::DEFAULT, source.vulnerability);
    if let Some(asset) = source.asset {
        relationship = relationship.with_raw_data(raw::ASSET_EXPORT, asset);
    }
    if let Some(export) = source.export {
        relationship = relationship.with_raw_data(raw::VULNERABILITY_EXPORT, export);
    }
    relationship
}

/// 스캔 → Finding (`IDENTIFIED`)
pub fn create_scan_finding_relationship(
    source: &FindingSource<'_>,
    finding_key: &str,
) -> Relationship {
    with_finding_sources(
        Relationship::new(
            relationships::SCAN_IDENTIFIED_FINDING,
            classes::IDENTIFIED,
            scan_key(source.scan.id),
            finding_key,
        ),
        source,
    )
}

/// Finding → 취약점 (`IS`)
pub fn create_finding_vulnerability_relationship(
    source: &FindingSource<'_>,
    finding_key: &str,
) -> Relationship {
    let plugin_id = source.vulnerability.plugin_id;
    with_finding_sources(
        Relationship::new(
            relationships::FINDING_IS_VULNERABILITY,
            classes::IS,
            finding_key,
            vulnerability_key(plugin_id),
        ),
        source,
    )
    .with_property("pluginId", plugin_id)
}
