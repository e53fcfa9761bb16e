//! 컨테이너 보안 엔티티
//!
//! 리포트 안의 finding/malware/unwanted program은 자체 식별자가 없을 수 있으며,
//! 키를 만들 수 없는 항목은 `None`으로 건너뜁니다.

use scangraph_core::{Entity, Relationship, generate_entity_key};
use scangraph_tenable::types::{
    Container, ContainerFinding, ContainerMalware, ContainerReport, ContainerUnwantedProgram,
};

use super::{classes, entities, non_empty, parse_timestamp, raw, relationships};

pub fn container_key(container_id: &str) -> String {
    generate_entity_key(entities::CONTAINER, container_id)
}

pub fn create_container_entity(container: &Container) -> Entity {
    Entity::new(container_key(&container.id), entities::CONTAINER, &["Image"])
    .with_raw_data(raw::DEFAULT, container)
    .with_property("id", container.id.as_str())
    .with_property("name", container.name.as_deref())
    .with_property(
        "displayName",
        container.name.as_deref().unwrap_or(&container.id),
    )
    .with_property("digest", container.digest.as_deref())
    .with_property("repoId", container.repo_id.as_deref())
    .with_property("repoName", container.repo_name.as_deref())
    .with_property("score", container.score.as_deref())
    .with_property("status", container.status.as_deref())
    .with_property("size", container.size.as_deref())
    .with_property(
        "numberOfVulnerabilities",
        container.number_of_vulnerabilities.as_deref(),
    )
    .with_property("platform", container.platform.as_deref())
    .with_property("createdOn", parse_timestamp(container.created_at.as_deref()))
    .with_property("updatedOn", parse_timestamp(container.updated_at.as_deref()))
}

/// 리포트 키는 리포트 `id`, 없으면 조회에 쓴 digest입니다.
pub fn create_container_report_entity(report: &ContainerReport, digest: &str) -> Entity {
    let id = report.id.as_deref().unwrap_or(digest);
    let name = report.image_name.as_deref().unwrap_or(digest);
    Entity::new(
        generate_entity_key(entities::CONTAINER_REPORT, id),
        entities::CONTAINER_REPORT,
        &["Assessment"],
    )
    .with_raw_data(raw::DEFAULT, &report_summary(report))
    .with_property("id", id)
    .with_property("name", name)
    .with_property("displayName", name)
    .with_property("digest", digest)
    .with_property("repository", report.repository.as_deref())
    .with_property("tag", report.tag.as_deref())
    .with_property("sha256", report.sha256.as_deref())
    .with_property("os", report.os.as_deref())
    .with_property("osVersion", report.os_version.as_deref())
    .with_property("riskScore", report.risk_score)
    .with_property("createdOn", parse_timestamp(report.created_at.as_deref()))
    .with_property("updatedOn", parse_timestamp(report.updated_at.as_deref()))
}

/// 하위 목록을 뺀 리포트 원본 (목록 항목은 각자의 엔티티에 보존됩니다)
fn report_summary(report: &ContainerReport) -> ContainerReport {
    ContainerReport {
        findings: Vec::new(),
        malware: Vec::new(),
        potentially_unwanted_programs: Vec::new(),
        ..report.clone()
    }
}

pub fn create_container_finding_entity(finding: &ContainerFinding) -> Option<Entity> {
    let nvd = &finding.nvd_finding;
    let id = nvd.reference_id.as_deref().or(nvd.cve.as_deref())?;
    let packages: Vec<String> = finding
        .packages
        .iter()
        .filter_map(|p| match (&p.name, &p.version) {
            (Some(name), Some(version)) => Some(format!("{name}@{version}")),
            (Some(name), None) => Some(name.clone()),
            _ => None,
        })
        .collect();

    Some(
        Entity::new(
            generate_entity_key(entities::CONTAINER_FINDING, id),
            entities::CONTAINER_FINDING,
            &["Finding"],
        )
        .with_raw_data(raw::DEFAULT, finding)
        .with_property("id", id)
        .with_property("name", nvd.cve.as_deref().unwrap_or(id))
        .with_property("displayName", nvd.cve.as_deref().unwrap_or(id))
        .with_property("cve", nvd.cve.as_deref())
        .with_property("description", nvd.description.as_deref())
        .with_property("publishedOn", parse_timestamp(nvd.published_date.as_deref()))
        .with_property("modifiedOn", parse_timestamp(nvd.modified_date.as_deref()))
        .with_property("cvssScore", nvd.cvss_score.as_deref())
        .with_property("severity", nvd.severity.as_deref())
        .with_property("remediation", nvd.remediation.as_deref())
        .with_property("references", non_empty(&nvd.references))
        .with_property("packages", non_empty(&packages)),
    )
}

pub fn create_container_malware_entity(malware: &ContainerMalware) -> Option<Entity> {
    let id = malware.sha256.as_deref().or(malware.md5.as_deref())?;
    let name = malware.infected_file.as_deref().unwrap_or(id);
    Some(
        Entity::new(
            generate_entity_key(entities::CONTAINER_MALWARE, id),
            entities::CONTAINER_MALWARE,
            &["Problem"],
        )
        .with_raw_data(raw::DEFAULT, malware)
        .with_property("name", name)
        .with_property("displayName", name)
        .with_property("infectedFile", malware.infected_file.as_deref())
        .with_property("fileType", malware.file_type.as_deref())
        .with_property("md5", malware.md5.as_deref())
        .with_property("sha256", malware.sha256.as_deref()),
    )
}

pub fn create_container_unwanted_program_entity(
    program: &ContainerUnwantedProgram,
) -> Option<Entity> {
    let id = program.sha256.as_deref().or(program.md5.as_deref())?;
    let name = program.file.as_deref().unwrap_or(id);
    Some(
        Entity::new(
            generate_entity_key(entities::CONTAINER_UNWANTED_PROGRAM, id),
            entities::CONTAINER_UNWANTED_PROGRAM,
            &["Problem"],
        )
        .with_raw_data(raw::DEFAULT, program)
        .with_property("name", name)
        .with_property("displayName", name)
        .with_property("file", program.file.as_deref())
        .with_property("md5", program.md5.as_deref())
        .with_property("sha256", program.sha256.as_deref()),
    )
}

/// 대상 엔티티의 원본 레코드를 관계의 `_rawData`로 씁니다.
fn with_target_raw_data(mut relationship: Relationship, target: &Entity) -> Relationship {
    relationship.raw_data = target.raw_data.clone();
    relationship
}

/// 컨테이너 → 리포트 (`HAS`)
pub fn create_container_report_relationship(container: &Entity, report: &Entity) -> Relationship {
    with_target_raw_data(
        Relationship::new(
            relationships::CONTAINER_HAS_REPORT,
            classes::HAS,
            container.key.as_str(),
            report.key.as_str(),
        ),
        report,
    )
}

/// 리포트 → finding/malware/unwanted program (`IDENTIFIED`)
///
/// 관계 `_type`은 대상 엔티티 종류에서 정해집니다.
pub fn create_report_identified_relationship(report: &Entity, target: &Entity) -> Relationship {
    let relationship_type = match target.entity_type.as_str() {
        entities::CONTAINER_MALWARE => relationships::REPORT_IDENTIFIED_MALWARE,
        entities::CONTAINER_UNWANTED_PROGRAM => relationships::REPORT_IDENTIFIED_UNWANTED_PROGRAM,
        _ => relationships::REPORT_IDENTIFIED_FINDING,
    };
    with_target_raw_data(
        Relationship::new(
            relationship_type,
            classes::IDENTIFIED,
            report.key.as_str(),
            target.key.as_str(),
        ),
        target,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{container, container_report};
    use serde_json::json;

    #[test]
    fn container_entity_key_and_class() {
        let entity = create_container_entity(&container("c1", Some("sha256:abc")));
        assert_eq!(entity.key, "tenable_container_c1");
        assert_eq!(entity.class, vec!["Image"]);
        assert_eq!(entity.property("digest"), Some(&json!("sha256:abc")));
    }

    #[test]
    fn report_falls_back_to_digest_key() {
        let mut report = container_report();
        report.id = None;
        let entity = create_container_report_entity(&report, "sha256:abc");
        assert_eq!(entity.key, "tenable_container_report_sha256:abc");
        assert_eq!(entity.raw_data[0].raw_data["findings"], json!([]));
    }

    #[test]
    fn report_children_are_keyed_by_identifiers() {
        let report = container_report();
        let finding = create_container_finding_entity(&report.findings[0]).unwrap();
        assert_eq!(finding.key, "tenable_container_finding_CVE-2021-3711");
        assert_eq!(finding.property("packages"), Some(&json!(["openssl@1.1.1k"])));

        let malware = create_container_malware_entity(&report.malware[0]).unwrap();
        assert_eq!(malware.class, vec!["Problem"]);
        assert!(malware.key.starts_with("tenable_container_malware_"));

        let report_entity = create_container_report_entity(&report, "sha256:abc");
        let rel = create_report_identified_relationship(&report_entity, &malware);
        assert_eq!(rel.relationship_type, "tenable_container_report_identified_malware");
        assert_eq!(rel.raw_data, malware.raw_data);

        let container_entity = create_container_entity(&container("c1", Some("sha256:abc")));
        let has = create_container_report_relationship(&container_entity, &report_entity);
        assert_eq!(has.key, "tenable_container_c1|has|tenable_container_report_report-1");
        assert!(!has.raw_data.is_empty());
    }

    #[test]
    fn items_without_identifiers_are_skipped() {
        assert!(create_container_finding_entity(&ContainerFinding::default()).is_none());
        assert!(create_container_malware_entity(&ContainerMalware::default()).is_none());
        assert!(
            create_container_unwanted_program_entity(&ContainerUnwantedProgram::default())
                .is_none()
        );
    }
}
