use scangraph_core::{Entity, Relationship, TargetEntity, generate_entity_key};
use scangraph_tenable::AssetExport;

use super::{classes, entities, non_empty, parse_timestamp, raw, relationships, targets};

pub fn asset_key(asset_id: &str) -> String {
    generate_entity_key(entities::ASSET, asset_id)
}

pub fn create_asset_entity(asset: &AssetExport) -> Entity {
    let display_name = asset
        .hostnames
        .first()
        .or(asset.fqdns.first())
        .or(asset.ipv4s.first())
        .map_or(asset.id.as_str(), String::as_str);

    Entity::new(asset_key(&asset.id), entities::ASSET, &["Host"])
    .with_raw_data(raw::DEFAULT, asset)
    .with_property("id", asset.id.as_str())
    .with_property("uuid", asset.uuid.as_deref())
    .with_property("name", display_name)
    .with_property("displayName", display_name)
    .with_property("hasAgent", asset.has_agent)
    .with_property("createdOn", parse_timestamp(asset.created_at.as_deref()))
    .with_property("updatedOn", parse_timestamp(asset.updated_at.as_deref()))
    .with_property("firstSeenOn", parse_timestamp(asset.first_seen.as_deref()))
    .with_property("lastSeenOn", parse_timestamp(asset.last_seen.as_deref()))
    .with_property("hostname", asset.hostnames.first().map(String::as_str))
    .with_property("ipAddress", asset.ipv4s.first().map(String::as_str))
    .with_property("ipv4s", non_empty(&asset.ipv4s))
    .with_property("ipv6s", non_empty(&asset.ipv6s))
    .with_property("fqdns", non_empty(&asset.fqdns))
    .with_property("hostnames", non_empty(&asset.hostnames))
    .with_property("macAddresses", non_empty(&asset.mac_addresses))
    .with_property("operatingSystems", non_empty(&asset.operating_systems))
    .with_property("agentUuid", asset.agent_uuid.as_deref())
    .with_property("biosUuid", asset.bios_uuid.as_deref())
    .with_property("awsEc2InstanceId", asset.aws_ec2_instance_id.as_deref())
    .with_property("azureVmId", asset.azure_vm_id.as_deref())
    .with_property("gcpInstanceId", asset.gcp_instance_id.as_deref())
}

/// asset → 클라우드 호스트 매핑 관계 (`IS`)
///
/// AWS, Azure, GCP 인스턴스 ID 하나당 하나이며, 대상 호스트는 해당 클라우드 통합이 만듭니다.
/// Azure VM 키는 소문자 리소스 ID입니다.
pub fn create_asset_host_relationships(asset: &AssetExport) -> Vec<Relationship> {
    let non_blank = |id: &Option<String>| {
        id.as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
    };

    let mut hosts = Vec::new();
    if let Some(id) = non_blank(&asset.aws_ec2_instance_id) {
        hosts.push(TargetEntity::new(targets::AWS_INSTANCE, "Host", "instanceId", id));
    }
    if let Some(id) = non_blank(&asset.azure_vm_id) {
        hosts.push(
            TargetEntity::new(targets::AZURE_VM, "Host", "_key", id.to_ascii_lowercase())
                .with_property("id", id),
        );
    }
    if let Some(id) = non_blank(&asset.gcp_instance_id) {
        hosts.push(TargetEntity::new(targets::GCP_INSTANCE, "Host", "id", id));
    }

    let source_key = asset_key(&asset.id);
    hosts
        .into_iter()
        .map(|target| {
            Relationship::mapped(
                relationships::ASSET_IS_HOST,
                classes::IS,
                source_key.as_str(),
                target.skip_creation(true),
            )
            .with_raw_data(raw::DEFAULT, asset)
        })
        .collect()
}
